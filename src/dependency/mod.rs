//! Dependency handling
//!
//! This module provides functionality to:
//! - Scan `#Requires` directives into raw declarations
//! - Merge repeated declarations into one spec per module
//! - Convert bounds into install range expressions
//! - Install merged dependencies in order

mod install;
mod merge;
pub mod range;
mod requires;

pub use install::{install_all, InstalledModule, ModuleInstaller, ModuleSearchPath, PwshInstaller};
pub use merge::merge;
pub use requires::{scan, RequiresScan};

//! shipmod - Script module packager and release version resolver
//!
//! This library provides the building blocks of the `shipmod` CLI:
//! - Collecting module sources and scanning `#Requires` statements
//! - Merging dependency declarations and installing them
//! - Reading and writing PowerShell data-file manifests
//! - Resolving the next release version from a pull-request event
//! - Publishing to a module registry and creating VCS releases

pub mod channel;
pub mod cli;
pub mod config;
pub mod dependency;
pub mod domain;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod pwsh;
pub mod release;
pub mod retry;
pub mod source;

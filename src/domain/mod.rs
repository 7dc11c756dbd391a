//! Core domain models for shipmod
//!
//! This module contains the fundamental types used throughout the application:
//! - Semantic versions with tag prefixes and bump kinds
//! - Dotted bound versions and version bounds for dependencies
//! - Dependency declarations and merged dependency specifications
//! - Host editions and compatibility constraints

mod bound;
mod dependency;
mod edition;
mod version;

pub use bound::{BoundVersion, VersionBound};
pub use dependency::{DeclKind, DependencyBounds, DependencySpec, RawDeclaration};
pub use edition::{Compatibility, Edition, DESKTOP_CEILING};
pub use version::{BumpKind, SemVer};

//! Dependency declarations and merged dependency specifications

use super::{BoundVersion, VersionBound};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Bounds attached to one structured declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyBounds {
    /// Required (exact) version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<BoundVersion>,
    /// Minimum version, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<BoundVersion>,
    /// Maximum version, inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<BoundVersion>,
}

impl DependencyBounds {
    /// True when none of the three bounds is set
    pub fn is_empty(&self) -> bool {
        self.exact.is_none() && self.minimum.is_none() && self.maximum.is_none()
    }
}

/// One dependency declaration as found in a source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeclKind {
    /// Bare module name, any version
    Name { name: String },
    /// Module name with version bounds
    Spec {
        name: String,
        bounds: DependencyBounds,
    },
}

impl DeclKind {
    /// Bare name declaration
    pub fn name(name: impl Into<String>) -> Self {
        DeclKind::Name { name: name.into() }
    }

    /// Structured declaration
    pub fn spec(name: impl Into<String>, bounds: DependencyBounds) -> Self {
        DeclKind::Spec {
            name: name.into(),
            bounds,
        }
    }

    /// The declared module name
    pub fn module_name(&self) -> &str {
        match self {
            DeclKind::Name { name } | DeclKind::Spec { name, .. } => name,
        }
    }

    /// Bounds of a structured declaration
    pub fn bounds(&self) -> Option<&DependencyBounds> {
        match self {
            DeclKind::Name { .. } => None,
            DeclKind::Spec { bounds, .. } => Some(bounds),
        }
    }
}

/// A declaration together with the file it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDeclaration {
    pub kind: DeclKind,
    pub source: Option<PathBuf>,
    pub line: usize,
}

impl RawDeclaration {
    pub fn new(kind: DeclKind) -> Self {
        Self {
            kind,
            source: None,
            line: 0,
        }
    }

    /// Record where the declaration came from
    pub fn at(mut self, source: impl Into<PathBuf>, line: usize) -> Self {
        self.source = Some(source.into());
        self.line = line;
        self
    }
}

/// One canonical dependency entry after merging all declarations of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact: Option<BoundVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<BoundVersion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<BoundVersion>,
}

impl DependencySpec {
    /// A dependency without any bound
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exact: None,
            minimum: None,
            maximum: None,
        }
    }

    /// True when no bound was ever declared
    pub fn is_bare(&self) -> bool {
        self.exact.is_none() && self.minimum.is_none() && self.maximum.is_none()
    }

    /// The effective bound; `exact` hides `minimum`/`maximum`
    pub fn bound(&self) -> VersionBound {
        VersionBound::from_parts(
            self.minimum.clone(),
            self.maximum.clone(),
            self.exact.clone(),
        )
    }

    /// Install constraint in range notation, `None` for any version
    pub fn range_expression(&self) -> Option<String> {
        self.bound().range_expression()
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.range_expression() {
            Some(range) => write!(f, "{} {}", self.name, range),
            None => write!(f, "{}", self.name),
        }
    }
}

//! Host editions and compatibility constraints

use super::BoundVersion;
use crate::error::ConfigConflictError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Last host version shipped with the Desktop edition
pub const DESKTOP_CEILING: &str = "5.1";

/// Host edition a module declares compatibility with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Edition {
    Core,
    Desktop,
}

impl Edition {
    /// Parse an edition name, case-insensitively
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "core" => Some(Edition::Core),
            "desktop" => Some(Edition::Desktop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Edition::Core => "Core",
            Edition::Desktop => "Desktop",
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn desktop_ceiling() -> BoundVersion {
    BoundVersion::parse(DESKTOP_CEILING).expect("constant is a valid version")
}

/// Declared editions and minimum host version of one module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compatibility {
    pub editions: Vec<Edition>,
    pub minimum_host_version: Option<BoundVersion>,
}

impl Compatibility {
    pub fn new(editions: Vec<Edition>, minimum_host_version: Option<BoundVersion>) -> Self {
        let mut editions = editions;
        editions.sort();
        editions.dedup();
        Self {
            editions,
            minimum_host_version,
        }
    }

    fn requires_newer_than_desktop(&self) -> bool {
        self.minimum_host_version
            .as_ref()
            .is_some_and(|v| *v > desktop_ceiling())
    }

    /// Editions written to the manifest.
    ///
    /// Declared editions are used as-is. Without a declaration the module
    /// targets `Core` only when the minimum host version is above the
    /// Desktop ceiling, and both editions otherwise.
    pub fn resolved_editions(&self) -> Vec<Edition> {
        if !self.editions.is_empty() {
            return self.editions.clone();
        }
        if self.requires_newer_than_desktop() {
            vec![Edition::Core]
        } else {
            vec![Edition::Core, Edition::Desktop]
        }
    }

    /// Fail when a Desktop-only module requires a host newer than Desktop ships
    pub fn check(&self) -> Result<(), ConfigConflictError> {
        if self.editions == [Edition::Desktop] && self.requires_newer_than_desktop() {
            let version = self
                .minimum_host_version
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_default();
            return Err(ConfigConflictError::new(
                "CompatiblePSEditions",
                "PowerShellVersion",
                format!(
                    "Desktop edition cannot satisfy minimum host version {} (Desktop ends at {})",
                    version, DESKTOP_CEILING
                ),
            ));
        }
        Ok(())
    }
}

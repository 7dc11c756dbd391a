//! Configuration file support
//!
//! `shipmod.toml` at the project root holds the module metadata and the
//! release options. Every key is optional:
//!
//! ```toml
//! [module]
//! name = "Sample"
//! source = "src"
//! output = "output"
//! author = "Jane"
//! tags = ["tools"]
//!
//! [release]
//! version_prefix = "v"
//! minor_labels = ["minor", "feature"]
//! date_prerelease_format = "%Y%m%d"
//!
//! [retry]
//! attempts = 5
//! delay_secs = 10
//!
//! [registry]
//! repository = "PSGallery"
//! ```

use crate::domain::Edition;
use crate::error::{AppError, ConfigConflictError, ConfigError};
use crate::retry::{RetryPolicy, DEFAULT_ATTEMPTS, DEFAULT_DELAY};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file name looked up in the project directory
pub const CONFIG_FILE: &str = "shipmod.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub module: ModuleConfig,
    pub release: ReleaseConfig,
    pub retry: RetryConfig,
    pub registry: RegistryConfig,
}

/// Module metadata and layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Module name; defaults to the project directory name
    pub name: Option<String>,
    /// Source directory, relative to the project
    pub source: PathBuf,
    /// Build output directory, relative to the project
    pub output: PathBuf,
    pub guid: Option<String>,
    pub author: Option<String>,
    pub company_name: Option<String>,
    pub copyright: Option<String>,
    pub description: Option<String>,
    /// Declared editions; empty lets the build decide
    pub compatible_editions: Vec<Edition>,
    /// Minimum host version, raised by `#Requires -Version`
    pub powershell_version: Option<String>,
    pub tags: Vec<String>,
    pub license_uri: Option<String>,
    pub project_uri: Option<String>,
    pub icon_uri: Option<String>,
    pub release_notes: Option<String>,
    pub cmdlets_to_export: Vec<String>,
    pub variables_to_export: Vec<String>,
    pub aliases_to_export: Vec<String>,
    /// Install merged dependencies during `build`
    pub install_dependencies: bool,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: None,
            source: PathBuf::from("src"),
            output: PathBuf::from("output"),
            guid: None,
            author: None,
            company_name: None,
            copyright: None,
            description: None,
            compatible_editions: Vec::new(),
            powershell_version: None,
            tags: Vec::new(),
            license_uri: None,
            project_uri: None,
            icon_uri: None,
            release_notes: None,
            cmdlets_to_export: Vec::new(),
            variables_to_export: Vec::new(),
            aliases_to_export: Vec::new(),
            install_dependencies: true,
        }
    }
}

/// Release resolution options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// Delete a branch's prereleases once its pull request is closed
    pub auto_cleanup: bool,
    /// Bump the patch version when no bump label matches
    pub auto_patching: bool,
    /// chrono `strftime` format appended to prerelease identifiers; empty disables
    pub date_prerelease_format: String,
    /// Append a zero-padded sequence number to prerelease identifiers
    pub incremental_prerelease: bool,
    /// Prefix of release tags
    pub version_prefix: String,
    /// Log external mutations instead of performing them
    pub what_if: bool,
    #[serde(deserialize_with = "string_or_list")]
    pub ignore_labels: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub major_labels: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub minor_labels: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub patch_labels: Vec<String>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            auto_cleanup: true,
            auto_patching: true,
            date_prerelease_format: String::new(),
            incremental_prerelease: true,
            version_prefix: "v".to_string(),
            what_if: false,
            ignore_labels: vec!["NoRelease".to_string()],
            major_labels: vec!["major".to_string(), "breaking".to_string()],
            minor_labels: vec!["minor".to_string(), "feature".to_string()],
            patch_labels: vec!["patch".to_string(), "fix".to_string()],
        }
    }
}

impl ReleaseConfig {
    fn label_sets(&self) -> [(&'static str, &[String]); 4] {
        [
            ("ignore_labels", self.ignore_labels.as_slice()),
            ("major_labels", self.major_labels.as_slice()),
            ("minor_labels", self.minor_labels.as_slice()),
            ("patch_labels", self.patch_labels.as_slice()),
        ]
    }

    /// Fail when one label belongs to two label sets
    pub fn check_labels(&self) -> Result<(), ConfigConflictError> {
        let sets = self.label_sets();
        for (i, (first_key, first)) in sets.iter().enumerate() {
            for (second_key, second) in &sets[i + 1..] {
                if let Some(label) = first
                    .iter()
                    .find(|a| second.iter().any(|b| a.eq_ignore_ascii_case(b)))
                {
                    return Err(ConfigConflictError::new(
                        *first_key,
                        *second_key,
                        format!("label '{}' is in both sets", label),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Fail when the date format contains an unknown specifier
    pub fn check_date_format(&self) -> Result<(), ConfigError> {
        let mut items = StrftimeItems::new(&self.date_prerelease_format);
        if items.any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidValue {
                key: "date_prerelease_format".to_string(),
                value: self.date_prerelease_format.clone(),
                message: "not a valid strftime format".to_string(),
            });
        }
        Ok(())
    }
}

/// Retry options for channel lookups, publishing and installs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay_secs: DEFAULT_DELAY.as_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.attempts, Duration::from_secs(self.delay_secs))
    }
}

/// Package registry options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registered PSResourceGet repository to publish to
    pub repository: String,
    /// NuGet v3 flat container URL used for version lookups instead of PSResourceGet
    pub feed_url: Option<String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            repository: "PSGallery".to_string(),
            feed_url: None,
        }
    }
}

impl Config {
    /// Load `shipmod.toml` from `dir`, or defaults when it does not exist
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load a specific configuration file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e: toml::de::Error| e.message().to_string())
    }

    /// Check option combinations that cannot work together
    pub fn validate(&self) -> Result<(), AppError> {
        self.release.check_labels()?;
        self.release.check_date_format()?;
        if self.retry.attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retry.attempts".to_string(),
                value: "0".to_string(),
                message: "at least one attempt is required".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Module name, falling back to the project directory name
    pub fn module_name(&self, project_dir: &Path) -> Result<String, ConfigError> {
        if let Some(name) = self.module.name.as_ref().filter(|n| !n.trim().is_empty()) {
            return Ok(name.trim().to_string());
        }
        project_dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ConfigError::MissingValue {
                key: "module.name".to_string(),
            })
    }
}

/// Accept `key = "a"` as well as `key = ["a", "b"]`
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(label) => vec![label],
        OneOrMany::Many(labels) => labels,
    })
}

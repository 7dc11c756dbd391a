//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConflictError: contradictory dependency version bounds
//! - ConfigConflictError: incompatible configuration settings
//! - ManifestError: reading, parsing or writing the module manifest
//! - RequiresError: malformed `#Requires` directives in module sources
//! - ChannelError: registry and release-list communication
//! - InstallError: dependency installation failures
//! - EventError: pull-request event payload problems
//! - ConfigError: configuration file and option problems
//! - IoError: file system operation failures

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Contradictory dependency bounds
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// Incompatible configuration settings
    #[error(transparent)]
    ConfigConflict(#[from] ConfigConflictError),

    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// `#Requires` directive errors
    #[error(transparent)]
    Requires(#[from] RequiresError),

    /// Registry / release channel errors
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Dependency installation errors
    #[error(transparent)]
    Install(#[from] InstallError),

    /// Pull-request event errors
    #[error(transparent)]
    Event(#[from] EventError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A version that cannot be bumped or parsed
    #[error(transparent)]
    Version(#[from] VersionParseError),

    /// IO related errors
    #[error(transparent)]
    Io(#[from] IoError),
}

/// A version string that could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version '{input}': {message}")]
pub struct VersionParseError {
    pub input: String,
    pub message: String,
}

impl VersionParseError {
    pub fn new(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Contradictory version bounds declared for one dependency
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    /// More than one distinct required (exact) version
    #[error("dependency '{name}': multiple required versions ({versions})")]
    MultipleRequired { name: String, versions: String },

    /// The exact version is lower than the merged minimum
    #[error("dependency '{name}': minimum exceeds required ({minimum} > {required})")]
    MinimumExceedsRequired {
        name: String,
        minimum: String,
        required: String,
    },

    /// The merged minimum is higher than the merged maximum
    #[error("dependency '{name}': minimum exceeds maximum ({minimum} > {maximum})")]
    MinimumExceedsMaximum {
        name: String,
        minimum: String,
        maximum: String,
    },

    /// The exact version is higher than the merged maximum
    #[error("dependency '{name}': required exceeds maximum ({required} > {maximum})")]
    RequiredExceedsMaximum {
        name: String,
        required: String,
        maximum: String,
    },
}

impl ConflictError {
    /// Name of the dependency whose bounds conflict
    pub fn dependency(&self) -> &str {
        match self {
            ConflictError::MultipleRequired { name, .. }
            | ConflictError::MinimumExceedsRequired { name, .. }
            | ConflictError::MinimumExceedsMaximum { name, .. }
            | ConflictError::RequiredExceedsMaximum { name, .. } => name,
        }
    }
}

/// Two configuration settings that cannot hold at the same time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("conflicting configuration '{first}' and '{second}': {message}")]
pub struct ConfigConflictError {
    pub first: String,
    pub second: String,
    pub message: String,
}

impl ConfigConflictError {
    pub fn new(
        first: impl Into<String>,
        second: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            message: message.into(),
        }
    }
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Data file syntax error
    #[error("failed to parse data file at {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    /// Data file syntax error in a known file
    #[error("failed to parse {path}: {source}")]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<ManifestError>,
    },

    /// A manifest key holds a value of the wrong shape
    #[error("invalid value for manifest key '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Malformed `#Requires` directive
#[derive(Error, Debug)]
#[error("invalid #Requires directive in {path}:{line}: {message}")]
pub struct RequiresError {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

/// Errors related to registry and release-list communication
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Subject (module or release) not found
    #[error("'{subject}' not found in {channel}")]
    NotFound { subject: String, channel: String },

    /// Network request failed
    #[error("request for '{subject}' to {channel} failed: {message}")]
    NetworkError {
        subject: String,
        channel: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {channel}")]
    RateLimitExceeded { channel: String },

    /// Invalid response body
    #[error("invalid response from {channel} for '{subject}': {message}")]
    InvalidResponse {
        subject: String,
        channel: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while requesting '{subject}' from {channel}")]
    Timeout { subject: String, channel: String },

    /// Authentication error
    #[error("authentication failed for {channel}: {message}")]
    AuthenticationError { channel: String, message: String },

    /// Publishing was rejected; the message is the registry's own error text
    #[error("failed to publish '{module}': {message}")]
    PublishFailed { module: String, message: String },

    /// The channel cannot be used without more configuration
    #[error("{channel} is not configured: {message}")]
    NotConfigured { channel: String, message: String },
}

impl ChannelError {
    /// Create a NotFound error
    pub fn not_found(subject: impl Into<String>, channel: impl Into<String>) -> Self {
        ChannelError::NotFound {
            subject: subject.into(),
            channel: channel.into(),
        }
    }

    /// Create a NetworkError
    pub fn network_error(
        subject: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ChannelError::NetworkError {
            subject: subject.into(),
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create an InvalidResponse error
    pub fn invalid_response(
        subject: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ChannelError::InvalidResponse {
            subject: subject.into(),
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChannelError::NetworkError { .. }
                | ChannelError::RateLimitExceeded { .. }
                | ChannelError::Timeout { .. }
                | ChannelError::InvalidResponse { .. }
                | ChannelError::PublishFailed { .. }
        )
    }
}

/// Errors related to dependency installation
#[derive(Error, Debug)]
pub enum InstallError {
    /// The install command ran but reported failure
    #[error("failed to install '{name}' ({command}): {message}")]
    CommandFailed {
        name: String,
        command: String,
        message: String,
    },

    /// The install command could not be started
    #[error("failed to run '{command}' for '{name}': {source}")]
    Spawn {
        name: String,
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The module search path could not be exported to the install process
    #[error("invalid module search path entry: {message}")]
    SearchPath { message: String },
}

/// Errors related to the pull-request event payload
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to read the event file
    #[error("failed to read event file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Event payload is not valid JSON or misses required fields
    #[error("failed to parse event payload: {message}")]
    ParseError { message: String },

    /// Event payload does not describe a pull request
    #[error("event payload does not contain a pull request")]
    NotPullRequest,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("failed to read configuration file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for the schema
    #[error("failed to parse configuration file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// An option holds an unusable value
    #[error("invalid value '{value}' for '{key}': {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },

    /// A required option is missing
    #[error("missing required option '{key}'")]
    MissingValue { key: String },
}

/// Errors related to IO operations
#[derive(Error, Debug)]
pub enum IoError {
    /// Directory not found
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Generic IO error
    #[error("IO error at {path}: {source}")]
    Generic {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ManifestError {
    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Attaches the file path to a parse error
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        ManifestError::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

impl IoError {
    /// Creates a new DirectoryNotFound error
    pub fn directory_not_found(path: impl Into<PathBuf>) -> Self {
        IoError::DirectoryNotFound { path: path.into() }
    }

    /// Creates a new Generic IO error
    pub fn generic(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        IoError::Generic {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_error_names_dependency() {
        let err = ConflictError::MinimumExceedsRequired {
            name: "Pester".to_string(),
            minimum: "2.0.0".to_string(),
            required: "1.0.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Pester"));
        assert!(msg.contains("minimum exceeds required"));
        assert_eq!(err.dependency(), "Pester");
    }

    #[test]
    fn test_conflict_error_multiple_required() {
        let err = ConflictError::MultipleRequired {
            name: "PSReadLine".to_string(),
            versions: "1.0.0, 2.0.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("multiple required versions"));
        assert!(msg.contains("1.0.0, 2.0.0"));
    }

    #[test]
    fn test_config_conflict_error_names_keys() {
        let err = ConfigConflictError::new("major_labels", "ignore_labels", "label 'x' in both");
        let msg = err.to_string();
        assert!(msg.contains("major_labels"));
        assert!(msg.contains("ignore_labels"));
    }

    #[test]
    fn test_manifest_parse_error_position() {
        let err = ManifestError::ParseError {
            line: 3,
            column: 7,
            message: "expected '='".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse data file at 3:7: expected '='"
        );
    }

    #[test]
    fn test_manifest_error_in_file() {
        let err = ManifestError::ParseError {
            line: 1,
            column: 1,
            message: "expected '@{'".to_string(),
        }
        .in_file("/out/Mod.psd1");
        let msg = err.to_string();
        assert!(msg.contains("Mod.psd1"));
    }

    #[test]
    fn test_channel_error_transient() {
        assert!(ChannelError::network_error("Mod", "PSGallery", "refused").is_transient());
        assert!(ChannelError::Timeout {
            subject: "Mod".to_string(),
            channel: "PSGallery".to_string()
        }
        .is_transient());
        assert!(!ChannelError::not_found("Mod", "PSGallery").is_transient());
        assert!(!ChannelError::AuthenticationError {
            channel: "GitHub".to_string(),
            message: "bad token".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_install_error_names_dependency() {
        let err = InstallError::CommandFailed {
            name: "Pester".to_string(),
            command: "Save-PSResource".to_string(),
            message: "no match".to_string(),
        };
        assert!(err.to_string().contains("'Pester'"));
    }

    #[test]
    fn test_app_error_from_conflict() {
        let err: AppError = ConflictError::MultipleRequired {
            name: "X".to_string(),
            versions: "1, 2".to_string(),
        }
        .into();
        assert!(err.to_string().contains("dependency 'X'"));
    }

    #[test]
    fn test_app_error_from_io_error() {
        let io_err = IoError::directory_not_found("/missing");
        let app_err: AppError = io_err.into();
        assert!(app_err.to_string().contains("directory not found"));
    }
}

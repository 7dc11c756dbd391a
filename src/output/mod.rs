//! Output formatting for command results
//!
//! This module provides:
//! - Text output for human-readable display
//! - JSON output for machine processing

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::orchestrator::{BuildReport, ReleaseReport, Report};
use std::io::Write;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for machine processing
    Json,
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Minimal output
    Quiet,
    /// Normal output
    #[default]
    Normal,
    /// Detailed output with additional information
    Verbose,
}

/// Configuration for output formatting
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    /// Whether external changes were only logged
    pub what_if: bool,
    /// Whether to use colors (when supported)
    pub color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            verbosity: Verbosity::default(),
            what_if: false,
            color: true,
        }
    }
}

impl OutputConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(json: bool, verbose: bool, quiet: bool, what_if: bool) -> Self {
        let format = if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        };

        let verbosity = if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        };

        Self {
            format,
            verbosity,
            what_if,
            color: true,
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter {
    /// Format and write a build result
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Format and write a resolve or publish result
    fn format_release(&self, report: &ReleaseReport, writer: &mut dyn Write)
        -> std::io::Result<()>;

    /// Format and write any command result
    fn format(&self, report: &Report, writer: &mut dyn Write) -> std::io::Result<()> {
        match report {
            Report::Build(build) => self.format_build(build, writer),
            Report::Resolve(release) | Report::Publish(release) => {
                self.format_release(release, writer)
            }
        }
    }
}

/// Create an output formatter based on configuration
pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(
            config.verbosity,
            config.what_if,
            config.color,
        )),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}

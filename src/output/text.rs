//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Build summary with dependencies and install results
//! - Release decision with the versions it was derived from
//! - Skip reasons and cleanup targets

use crate::domain::BumpKind;
use crate::orchestrator::{BuildReport, ReleaseReport};
use crate::output::{OutputFormatter, Verbosity};
use crate::release::{BumpSource, Resolution};
use colored::Colorize;
use std::io::Write;

/// Colored label for a bump kind
fn colored_bump(kind: BumpKind) -> String {
    match kind {
        BumpKind::Major => "major".red().bold().to_string(),
        BumpKind::Minor => "minor".yellow().to_string(),
        BumpKind::Patch => "patch".green().to_string(),
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    /// Whether external changes were only logged
    what_if: bool,
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity, what_if: bool) -> Self {
        Self {
            verbosity,
            what_if,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, what_if: bool, color: bool) -> Self {
        Self {
            verbosity,
            what_if,
            color,
        }
    }

    fn what_if_prefix(&self) -> String {
        match (self.what_if, self.color) {
            (false, _) => String::new(),
            (true, true) => format!("{} ", "(what-if)".cyan()),
            (true, false) => "(what-if) ".to_string(),
        }
    }

    fn dim(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn bump_label(&self, kind: BumpKind) -> String {
        if self.color {
            colored_bump(kind)
        } else {
            kind.to_string()
        }
    }

    /// Write a list under a heading, one item per line
    fn write_list(
        &self,
        heading: &str,
        items: &[String],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        writeln!(writer, "  {}", self.dim(&format!("{}:", heading)))?;
        for item in items {
            writeln!(writer, "    {}", item)?;
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity == Verbosity::Quiet {
            return writeln!(writer, "{}", report.module_dir.display());
        }

        writeln!(
            writer,
            "{}Built {} {} {} {}",
            self.what_if_prefix(),
            self.bold(&report.module),
            report.version,
            self.dim("→"),
            report.module_dir.display()
        )?;

        let editions: Vec<&str> = report.editions.iter().map(|e| e.as_str()).collect();
        let host = report
            .powershell_version
            .as_ref()
            .map(|v| format!(", PowerShell {}", v))
            .unwrap_or_default();
        writeln!(writer, "  {} {}{}", self.dim("Editions:"), editions.join(", "), host)?;

        let dependencies: Vec<String> = report.dependencies.iter().map(|d| d.to_string()).collect();
        if dependencies.is_empty() {
            writeln!(writer, "  {}", self.dim("No dependencies"))?;
        } else {
            self.write_list("Dependencies", &dependencies, writer)?;
        }

        if !report.installed.is_empty() {
            let simulated = report.installed.iter().filter(|m| m.simulated).count();
            let installed = report.installed.len() - simulated;
            writeln!(
                writer,
                "  {} {} installed, {} simulated",
                self.dim("Install:"),
                installed,
                simulated
            )?;
        }

        if self.verbosity == Verbosity::Verbose {
            self.write_list("Functions", &report.functions, writer)?;
            self.write_list("Files", &report.files, writer)?;
            if report.root_module_generated {
                writeln!(writer, "  {}", self.dim("Root module generated"))?;
            }
        } else {
            writeln!(
                writer,
                "  {} functions, {} files",
                report.functions.len(),
                report.files.len()
            )?;
        }

        if !report.manifest_changed {
            writeln!(writer, "  {}", self.dim("Manifest unchanged"))?;
        }
        Ok(())
    }

    fn format_release(
        &self,
        report: &ReleaseReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let decision = &report.decision;

        if self.verbosity == Verbosity::Quiet {
            return match decision.version() {
                Some(version) => writeln!(writer, "{}", version),
                None => Ok(()),
            };
        }

        let prefix = self.what_if_prefix();
        match &decision.outcome {
            Resolution::Release {
                version,
                is_prerelease,
            } => {
                let kind = if *is_prerelease { "Prerelease" } else { "Release" };
                let version = version.to_string();
                let version = if self.color {
                    version.bright_white().bold().to_string()
                } else {
                    version
                };
                let bump = match (decision.bump, &decision.bump_source) {
                    (Some(bump), Some(BumpSource::Label(label))) => {
                        format!(" [{} via '{}']", self.bump_label(bump), label)
                    }
                    (Some(bump), _) => format!(" [{}]", self.bump_label(bump)),
                    (None, _) => String::new(),
                };
                writeln!(
                    writer,
                    "{}{} {} {} {}{}",
                    prefix,
                    kind,
                    self.bold(&report.module),
                    version,
                    self.dim(&format!("(from {})", decision.latest)),
                    bump
                )?;
            }
            Resolution::Skip { reason } => {
                let skipped = if self.color {
                    "Skipped".yellow().to_string()
                } else {
                    "Skipped".to_string()
                };
                writeln!(
                    writer,
                    "{}{} {}: {}",
                    prefix,
                    skipped,
                    self.bold(&report.module),
                    reason
                )?;
            }
        }

        writeln!(
            writer,
            "  {} registry {}, releases {}",
            self.dim("Latest:"),
            report.registry_latest,
            report.vcs_latest
        )?;
        if self.verbosity == Verbosity::Verbose {
            if let Some(manifest) = &report.manifest_version {
                writeln!(writer, "  {} {}", self.dim("Manifest:"), manifest)?;
            }
            writeln!(writer, "  {} #{}", self.dim("Pull request:"), report.pull_request)?;
        }

        if report.published {
            writeln!(writer, "  {}", self.dim("Published to the registry"))?;
        }
        if let Some(url) = &report.release_url {
            writeln!(writer, "  {} {}", self.dim("Release:"), url)?;
        }
        if report.deleted.is_empty() {
            self.write_list("Cleanup", &report.cleanup_targets, writer)?;
        } else {
            self.write_list("Deleted", &report.deleted, writer)?;
        }
        Ok(())
    }
}

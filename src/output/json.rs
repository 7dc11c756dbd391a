//! JSON output formatter for machine processing
//!
//! The objects are flat so workflow steps can read fields such as
//! `.version` or `.outcome` directly.

use crate::orchestrator::{BuildReport, ReleaseReport};
use crate::output::{OutputFormatter, Verbosity};
use crate::release::Resolution;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn verbose(&self) -> bool {
        self.verbosity == Verbosity::Verbose
    }
}

#[derive(Serialize)]
struct JsonDependency {
    name: String,
    /// Range expression, absent for any version
    #[serde(skip_serializing_if = "Option::is_none")]
    range: Option<String>,
}

#[derive(Serialize)]
struct JsonBuild<'a> {
    command: &'static str,
    module: &'a str,
    version: &'a str,
    module_dir: String,
    manifest: String,
    manifest_changed: bool,
    editions: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    powershell_version: Option<String>,
    dependencies: Vec<JsonDependency>,
    installed: usize,
    functions: &'a [String],
    /// Only in verbose mode
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<&'a [String]>,
    what_if: bool,
}

#[derive(Serialize)]
struct JsonRelease<'a> {
    module: &'a str,
    pull_request: u64,
    /// `release`, `prerelease` or `skip`
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bump: Option<String>,
    latest: String,
    registry_latest: String,
    vcs_latest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    manifest_version: Option<&'a str>,
    cleanup: &'a [String],
    deleted: &'a [String],
    published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    release_url: Option<&'a str>,
    what_if: bool,
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}

impl OutputFormatter for JsonFormatter {
    fn format_build(&self, report: &BuildReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonBuild {
            command: "build",
            module: &report.module,
            version: &report.version,
            module_dir: report.module_dir.display().to_string(),
            manifest: report.manifest_path.display().to_string(),
            manifest_changed: report.manifest_changed,
            editions: report.editions.iter().map(|e| e.as_str()).collect(),
            powershell_version: report.powershell_version.as_ref().map(|v| v.to_string()),
            dependencies: report
                .dependencies
                .iter()
                .map(|d| JsonDependency {
                    name: d.name.clone(),
                    range: d.range_expression(),
                })
                .collect(),
            installed: report.installed.iter().filter(|m| !m.simulated).count(),
            functions: &report.functions,
            files: self.verbose().then_some(report.files.as_slice()),
            what_if: report.what_if,
        };
        write_json(&output, writer)
    }

    fn format_release(
        &self,
        report: &ReleaseReport,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let decision = &report.decision;
        let (outcome, version, tag, skip_reason) = match &decision.outcome {
            Resolution::Release {
                version,
                is_prerelease,
            } => (
                if *is_prerelease { "prerelease" } else { "release" },
                Some(version.version_string()),
                Some(version.to_string()),
                None,
            ),
            Resolution::Skip { reason } => ("skip", None, None, Some(reason.to_string())),
        };

        let output = JsonRelease {
            module: &report.module,
            pull_request: report.pull_request,
            outcome,
            version,
            tag,
            skip_reason,
            bump: decision.bump.map(|b| b.to_string()),
            latest: decision.latest.version_string(),
            registry_latest: report.registry_latest.version_string(),
            vcs_latest: report.vcs_latest.version_string(),
            manifest_version: report.manifest_version.as_deref(),
            cleanup: &report.cleanup_targets,
            deleted: &report.deleted,
            published: report.published,
            release_url: report.release_url.as_deref(),
            what_if: report.what_if,
        };
        write_json(&output, writer)
    }
}

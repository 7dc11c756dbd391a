//! Dependency installation
//!
//! Merged dependencies are installed one at a time, in merge order. Each
//! install is retried with the shared retry policy; an install that still
//! fails after the last attempt aborts the whole run. Successful installs
//! append their destination to the module search path, which only ever
//! grows during a run.

use crate::domain::DependencySpec;
use crate::error::InstallError;
use crate::pwsh::{quote_arg, PwshRunner};
use crate::retry::{with_retry, RetryPolicy};
use async_trait::async_trait;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable holding the module search path
pub const MODULE_PATH_VAR: &str = "PSModulePath";

/// Append-only list of directories searched for modules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSearchPath {
    entries: Vec<PathBuf>,
}

impl ModuleSearchPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the current process environment
    pub fn from_env() -> Self {
        let entries = std::env::var_os(MODULE_PATH_VAR)
            .map(|value| std::env::split_paths(&value).collect())
            .unwrap_or_default();
        Self { entries }
    }

    /// Append a directory; entries already present are not repeated
    pub fn append(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.entries.contains(&path) {
            self.entries.push(path);
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Value for the module path environment variable
    pub fn to_env_value(&self) -> Result<OsString, InstallError> {
        std::env::join_paths(&self.entries).map_err(|e| InstallError::SearchPath {
            message: e.to_string(),
        })
    }
}

/// Installs one module into a destination directory
#[async_trait]
pub trait ModuleInstaller: Send + Sync {
    /// Returns the name of the installer
    fn installer_name(&self) -> &'static str;

    /// Install `spec` into `destination`
    async fn install(
        &self,
        spec: &DependencySpec,
        destination: &Path,
        search_path: &ModuleSearchPath,
    ) -> Result<(), InstallError>;
}

/// Installs modules with `Save-PSResource`
#[derive(Debug, Clone, Default)]
pub struct PwshInstaller {
    runner: PwshRunner,
    repository: Option<String>,
}

impl PwshInstaller {
    pub fn new(runner: PwshRunner) -> Self {
        Self {
            runner,
            repository: None,
        }
    }

    /// Install from a named repository instead of the default one
    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Script that saves `spec` into `destination`
    pub fn install_script(&self, spec: &DependencySpec, destination: &Path) -> String {
        let mut script = format!("Save-PSResource -Name {}", quote_arg(&spec.name));
        if let Some(range) = spec.range_expression() {
            script.push_str(&format!(" -Version {}", quote_arg(&range)));
        }
        script.push_str(&format!(
            " -Path {} -TrustRepository -ErrorAction Stop",
            quote_arg(&destination.display().to_string())
        ));
        if let Some(repository) = &self.repository {
            script.push_str(&format!(" -Repository {}", quote_arg(repository)));
        }
        script
    }
}

#[async_trait]
impl ModuleInstaller for PwshInstaller {
    fn installer_name(&self) -> &'static str {
        "Save-PSResource"
    }

    async fn install(
        &self,
        spec: &DependencySpec,
        destination: &Path,
        search_path: &ModuleSearchPath,
    ) -> Result<(), InstallError> {
        let script = self.install_script(spec, destination);
        let env = [(MODULE_PATH_VAR, search_path.to_env_value()?)];
        let output = self
            .runner
            .run(&script, &env)
            .await
            .map_err(|source| InstallError::Spawn {
                name: spec.name.clone(),
                command: self.runner.program().to_string(),
                source,
            })?;

        if output.success {
            Ok(())
        } else {
            Err(InstallError::CommandFailed {
                name: spec.name.clone(),
                command: self.installer_name().to_string(),
                message: output.failure_message(),
            })
        }
    }
}

/// Outcome of installing one dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledModule {
    /// The dependency as installed (`name range`)
    pub spec: String,
    /// Number of attempts used
    pub attempts: u32,
    /// Whether the install was only simulated (WhatIf)
    pub simulated: bool,
}

/// Install every spec in order, stopping at the first exhausted retry loop
pub async fn install_all(
    installer: &dyn ModuleInstaller,
    specs: &[DependencySpec],
    destination: &Path,
    search_path: &mut ModuleSearchPath,
    policy: RetryPolicy,
    what_if: bool,
) -> Result<Vec<InstalledModule>, InstallError> {
    let mut installed = Vec::with_capacity(specs.len());

    for spec in specs {
        if what_if {
            info!(dependency = %spec, "what-if: would install");
            installed.push(InstalledModule {
                spec: spec.to_string(),
                attempts: 0,
                simulated: true,
            });
            continue;
        }

        info!(dependency = %spec, installer = installer.installer_name(), "installing");
        let mut used = 0;
        let current_path = search_path.clone();
        with_retry(policy, |attempt| {
            used = attempt;
            installer.install(spec, destination, &current_path)
        })
        .await?;

        search_path.append(destination);
        installed.push(InstalledModule {
            spec: spec.to_string(),
            attempts: used,
            simulated: false,
        });
    }

    Ok(installed)
}

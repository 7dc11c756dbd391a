//! Integration tests for shipmod
//!
//! These tests verify:
//! - Building a module with a recording installer
//! - Resolving releases against in-memory channels
//! - Publishing, release creation and prerelease cleanup

use async_trait::async_trait;
use shipmod::channel::{RegistryChannel, ReleaseChannel, ReleaseRequest, VcsRelease};
use shipmod::config::{Config, ModuleConfig, RetryConfig};
use shipmod::dependency::{ModuleInstaller, ModuleSearchPath};
use shipmod::domain::DependencySpec;
use shipmod::error::{AppError, ChannelError, ConfigError, InstallError};
use shipmod::manifest::{read_document, ManifestInfo};
use shipmod::orchestrator::Orchestrator;
use shipmod::release::{PullRequestEvent, Resolution, SkipReason};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    for (relative, content) in files {
        let path = dir.path().join("src").join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn sample_project() -> TempDir {
    project(&[
        (
            "private/helper.ps1",
            "#Requires -Modules Pester\nfunction helper {}\n",
        ),
        (
            "public/Get-Thing.ps1",
            "#Requires -Modules @{ ModuleName = 'PSReadLine'; ModuleVersion = '2.0' }\n\
             function Get-Thing { 'thing' }\n",
        ),
    ])
}

fn config() -> Config {
    Config {
        module: ModuleConfig {
            name: Some("Sample".to_string()),
            ..Default::default()
        },
        retry: RetryConfig {
            attempts: 2,
            delay_secs: 0,
        },
        ..Default::default()
    }
}

fn manifest_path(dir: &TempDir) -> PathBuf {
    dir.path().join("output/Sample/Sample.psd1")
}

fn manifest_version(dir: &TempDir) -> Option<String> {
    let doc = read_document(&manifest_path(dir)).unwrap();
    ManifestInfo::from_document(&doc).unwrap().full_version()
}

/// Installer that records every call and can fail the first attempts
#[derive(Default)]
struct RecordingInstaller {
    calls: Mutex<Vec<String>>,
    failures_left: Mutex<u32>,
}

impl RecordingInstaller {
    fn failing(times: u32) -> Self {
        Self {
            failures_left: Mutex::new(times),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModuleInstaller for RecordingInstaller {
    fn installer_name(&self) -> &'static str {
        "recording"
    }

    async fn install(
        &self,
        spec: &DependencySpec,
        _destination: &Path,
        _search_path: &ModuleSearchPath,
    ) -> Result<(), InstallError> {
        self.calls.lock().unwrap().push(spec.to_string());
        let mut failures = self.failures_left.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(InstallError::CommandFailed {
                name: spec.name.clone(),
                command: "Save-PSResource".to_string(),
                message: "repository unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Registry holding a fixed version list
#[derive(Default)]
struct MemoryRegistry {
    versions: Vec<String>,
    unreachable: bool,
    published: Mutex<Vec<PathBuf>>,
}

impl MemoryRegistry {
    fn with_versions(versions: &[&str]) -> Self {
        Self {
            versions: versions.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    fn published(&self) -> Vec<PathBuf> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegistryChannel for MemoryRegistry {
    fn channel_name(&self) -> &'static str {
        "memory-registry"
    }

    async fn fetch_versions(&self, module: &str) -> Result<Vec<String>, ChannelError> {
        if self.unreachable {
            return Err(ChannelError::NetworkError {
                subject: module.to_string(),
                channel: "memory-registry".to_string(),
                message: "connection refused".to_string(),
            });
        }
        if self.versions.is_empty() {
            return Err(ChannelError::NotFound {
                subject: module.to_string(),
                channel: "memory-registry".to_string(),
            });
        }
        Ok(self.versions.clone())
    }

    async fn publish(&self, module_path: &Path, api_key: &str) -> Result<(), ChannelError> {
        assert_eq!(api_key, "secret");
        self.published.lock().unwrap().push(module_path.to_path_buf());
        Ok(())
    }
}

/// Release list kept in memory
#[derive(Default)]
struct MemoryReleases {
    releases: Mutex<Vec<VcsRelease>>,
    created: Mutex<Vec<ReleaseRequest>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryReleases {
    fn with_tags(tags: &[(&str, bool)]) -> Self {
        Self {
            releases: Mutex::new(
                tags.iter()
                    .map(|(tag, prerelease)| VcsRelease::new(*tag, *prerelease))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn created(&self) -> Vec<ReleaseRequest> {
        self.created.lock().unwrap().clone()
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReleaseChannel for MemoryReleases {
    fn channel_name(&self) -> &'static str {
        "memory-releases"
    }

    async fn list_releases(&self) -> Result<Vec<VcsRelease>, ChannelError> {
        Ok(self.releases.lock().unwrap().clone())
    }

    async fn create_release(&self, request: &ReleaseRequest) -> Result<String, ChannelError> {
        self.created.lock().unwrap().push(request.clone());
        self.releases
            .lock()
            .unwrap()
            .push(VcsRelease::new(request.tag.clone(), request.prerelease));
        Ok(format!("https://example.test/releases/{}", request.tag))
    }

    async fn delete_release(&self, tag: &str) -> Result<(), ChannelError> {
        self.deleted.lock().unwrap().push(tag.to_string());
        self.releases.lock().unwrap().retain(|r| r.tag_name != tag);
        Ok(())
    }
}

fn merged_event(labels: &[&str]) -> PullRequestEvent {
    PullRequestEvent {
        number: 12,
        labels: labels.iter().map(|l| l.to_string()).collect(),
        merged: true,
        closed: true,
        base_branch: "main".to_string(),
        head_branch: "feature/foo-bar".to_string(),
        default_branch: "main".to_string(),
    }
}

fn open_event(labels: &[&str]) -> PullRequestEvent {
    PullRequestEvent {
        merged: false,
        closed: false,
        ..merged_event(labels)
    }
}

mod build {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_build_installs_merged_dependencies_in_order() {
        let dir = sample_project();
        let installer = RecordingInstaller::default();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let report = orchestrator.build_with(&installer).await.unwrap();

        assert_eq!(installer.calls(), vec!["Pester", "PSReadLine [2.0,)"]);
        assert_eq!(report.installed.len(), 2);
        assert!(report.installed.iter().all(|m| !m.simulated));
        assert!(dir.path().join("output/dependencies").is_dir());
        assert_eq!(manifest_version(&dir).as_deref(), Some("999.0.0"));

        let doc = read_document(&manifest_path(&dir)).unwrap();
        let required: Vec<String> = ManifestInfo::from_document(&doc)
            .unwrap()
            .required_modules
            .iter()
            .map(|d| d.module_name().to_string())
            .collect();
        assert_eq!(required, vec!["Pester", "PSReadLine"]);
        assert_eq!(report.functions, vec!["Get-Thing"]);
    }

    #[tokio::test]
    async fn test_build_retries_failed_install() {
        let dir = sample_project();
        let installer = RecordingInstaller::failing(1);
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let report = orchestrator.build_with(&installer).await.unwrap();

        assert_eq!(installer.calls(), vec!["Pester", "Pester", "PSReadLine [2.0,)"]);
        assert_eq!(report.installed[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_build_fails_after_retries_exhausted() {
        let dir = sample_project();
        let installer = RecordingInstaller::failing(5);
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let result = orchestrator.build_with(&installer).await;
        assert!(matches!(result, Err(AppError::Install(_))));
        assert_eq!(installer.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_build_what_if_simulates_installs() {
        let dir = sample_project();
        let installer = RecordingInstaller::default();
        let mut config = config();
        config.release.what_if = true;
        let orchestrator = Orchestrator::new(dir.path(), config).unwrap();

        let report = orchestrator.build_with(&installer).await.unwrap();

        assert!(installer.calls().is_empty());
        assert!(report.installed.iter().all(|m| m.simulated));
        assert!(report.what_if);
        assert!(manifest_path(&dir).exists());
    }

    #[tokio::test]
    async fn test_build_conflicting_requirements_fail() {
        let dir = project(&[
            ("a.ps1", "#Requires -Modules @{ ModuleName = 'Az'; RequiredVersion = '1.0' }\n"),
            ("b.ps1", "#Requires -Modules @{ ModuleName = 'Az'; RequiredVersion = '2.0' }\n"),
        ]);
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let result = orchestrator.build_with(&RecordingInstaller::default()).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert!(!manifest_path(&dir).exists());
    }

    #[tokio::test]
    async fn test_build_keeps_existing_root_module() {
        let dir = project(&[
            ("Sample.psm1", "Export-ModuleMember -Function *\n"),
            ("public/Get-Thing.ps1", "function Get-Thing {}\n"),
        ]);
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let report = orchestrator
            .build_with(&RecordingInstaller::default())
            .await
            .unwrap();
        assert!(!report.root_module_generated);
        let root = fs::read_to_string(dir.path().join("output/Sample/Sample.psm1")).unwrap();
        assert_eq!(root, "Export-ModuleMember -Function *\n");
    }
}

mod resolve {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_merged_minor_release() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();
        let registry = MemoryRegistry::with_versions(&["1.2.0", "1.1.0"]);
        let releases = MemoryReleases::with_tags(&[("v1.3.0", false), ("v1.0.0", false)]);

        let report = orchestrator
            .resolve_with(&merged_event(&["feature"]), &registry, &releases)
            .await
            .unwrap();

        assert_eq!(report.decision.version().map(|v| v.to_string()).as_deref(), Some("v1.4.0"));
        assert!(!report.decision.is_prerelease());
        assert_eq!(report.registry_latest.version_string(), "1.2.0");
        assert_eq!(report.vcs_latest.version_string(), "1.3.0");
        assert_eq!(report.manifest_version, None);
        assert!(registry.published().is_empty());
        assert!(releases.created().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_registry_counts_as_unpublished() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();
        let registry = MemoryRegistry {
            unreachable: true,
            ..Default::default()
        };

        let report = orchestrator
            .resolve_with(&merged_event(&["feature"]), &registry, &MemoryReleases::default())
            .await
            .unwrap();

        assert_eq!(report.decision.version().map(|v| v.to_string()).as_deref(), Some("v0.1.0"));
    }

    #[tokio::test]
    async fn test_open_prerelease_numbering() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();
        let registry = MemoryRegistry::with_versions(&["1.0.0", "1.1.0-featurefoobar002"]);
        let releases =
            MemoryReleases::with_tags(&[("v1.0.0", false), ("v1.1.0-featurefoobar001", true)]);

        let report = orchestrator
            .resolve_with(&open_event(&["feature", "prerelease"]), &registry, &releases)
            .await
            .unwrap();

        assert_eq!(
            report.decision.version().map(|v| v.to_string()).as_deref(),
            Some("v1.1.0-featurefoobar003")
        );
        assert!(report.decision.is_prerelease());
        assert!(report.cleanup_targets.is_empty());
    }

    #[tokio::test]
    async fn test_closed_pr_selects_cleanup_targets() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();
        let releases = MemoryReleases::with_tags(&[
            ("v1.0.0", false),
            ("v1.1.0-featurefoobar001", true),
            ("v1.1.0-featurefoobar002", true),
            ("v1.1.0-other001", true),
        ]);
        let event = PullRequestEvent {
            merged: false,
            ..merged_event(&["feature"])
        };

        let report = orchestrator
            .resolve_with(&event, &MemoryRegistry::default(), &releases)
            .await
            .unwrap();

        assert_eq!(
            report.decision.outcome,
            Resolution::Skip {
                reason: SkipReason::ClosedWithoutMerge
            }
        );
        assert_eq!(
            report.cleanup_targets,
            vec!["v1.1.0-featurefoobar001", "v1.1.0-featurefoobar002"]
        );
        assert!(releases.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_reads_built_manifest_version() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();
        orchestrator
            .build_with(&RecordingInstaller::default())
            .await
            .unwrap();

        let report = orchestrator
            .resolve_with(
                &merged_event(&["NoRelease"]),
                &MemoryRegistry::default(),
                &MemoryReleases::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.manifest_version.as_deref(), Some("999.0.0"));
        assert_eq!(
            report.decision.outcome,
            Resolution::Skip {
                reason: SkipReason::IgnoreLabel("NoRelease".to_string())
            }
        );
    }
}

mod publish {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn built(config: Config) -> (TempDir, Orchestrator) {
        let dir = sample_project();
        let builder = Orchestrator::new(dir.path(), self::super::config()).unwrap();
        builder
            .build_with(&RecordingInstaller::default())
            .await
            .unwrap();
        let orchestrator = Orchestrator::new(dir.path(), config).unwrap();
        (dir, orchestrator)
    }

    #[tokio::test]
    async fn test_publish_release_and_cleanup() {
        let (dir, orchestrator) = built(config()).await;
        let registry = MemoryRegistry::with_versions(&["1.2.0"]);
        let releases = MemoryReleases::with_tags(&[
            ("v1.2.0", false),
            ("v1.3.0-featurefoobar001", true),
            ("v1.3.0-featurefoobar002", true),
        ]);

        let report = orchestrator
            .publish_with(&merged_event(&["minor"]), &registry, &releases, Some("secret"))
            .await
            .unwrap();

        assert_eq!(manifest_version(&dir).as_deref(), Some("1.3.0"));
        assert_eq!(registry.published(), vec![dir.path().join("output/Sample")]);
        assert!(report.published);

        let created = releases.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].tag, "v1.3.0");
        assert_eq!(created[0].target, "main");
        assert!(!created[0].prerelease);
        assert_eq!(
            report.release_url.as_deref(),
            Some("https://example.test/releases/v1.3.0")
        );

        assert_eq!(
            releases.deleted(),
            vec!["v1.3.0-featurefoobar001", "v1.3.0-featurefoobar002"]
        );
        assert_eq!(report.deleted, releases.deleted());
    }

    #[tokio::test]
    async fn test_publish_prerelease_targets_head_branch() {
        let (dir, orchestrator) = built(config()).await;
        let registry = MemoryRegistry::with_versions(&["1.2.0"]);
        let releases = MemoryReleases::default();

        orchestrator
            .publish_with(&open_event(&["fix", "prerelease"]), &registry, &releases, Some("secret"))
            .await
            .unwrap();

        assert_eq!(manifest_version(&dir).as_deref(), Some("1.2.1-featurefoobar001"));
        let created = releases.created();
        assert_eq!(created[0].tag, "v1.2.1-featurefoobar001");
        assert_eq!(created[0].target, "feature/foo-bar");
        assert!(created[0].prerelease);
        assert!(releases.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_publish_what_if_changes_nothing() {
        let mut what_if = config();
        what_if.release.what_if = true;
        let (dir, orchestrator) = built(what_if).await;
        let before = fs::read_to_string(manifest_path(&dir)).unwrap();
        let registry = MemoryRegistry::with_versions(&["1.2.0"]);
        let releases = MemoryReleases::with_tags(&[("v1.3.0-featurefoobar001", true)]);

        let report = orchestrator
            .publish_with(&merged_event(&["major"]), &registry, &releases, None)
            .await
            .unwrap();

        assert_eq!(report.decision.version().map(|v| v.to_string()).as_deref(), Some("v2.0.0"));
        assert_eq!(fs::read_to_string(manifest_path(&dir)).unwrap(), before);
        assert!(registry.published().is_empty());
        assert!(releases.created().is_empty());
        assert!(releases.deleted().is_empty());
        assert_eq!(report.cleanup_targets, vec!["v1.3.0-featurefoobar001"]);
        assert!(report.deleted.is_empty());
        assert!(!report.published);
    }

    #[tokio::test]
    async fn test_publish_requires_api_key() {
        let (dir, orchestrator) = built(config()).await;
        let before = fs::read_to_string(manifest_path(&dir)).unwrap();

        let result = orchestrator
            .publish_with(
                &merged_event(&["patch"]),
                &MemoryRegistry::default(),
                &MemoryReleases::default(),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::MissingValue { .. }))
        ));
        assert_eq!(fs::read_to_string(manifest_path(&dir)).unwrap(), before);
    }

    #[tokio::test]
    async fn test_publish_requires_built_manifest() {
        let dir = sample_project();
        let orchestrator = Orchestrator::new(dir.path(), config()).unwrap();

        let result = orchestrator
            .publish_with(
                &merged_event(&["patch"]),
                &MemoryRegistry::default(),
                &MemoryReleases::default(),
                Some("secret"),
            )
            .await;

        assert!(matches!(result, Err(AppError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_skip_still_cleans_up() {
        let (_dir, orchestrator) = built(config()).await;
        let registry = MemoryRegistry::default();
        let releases = MemoryReleases::with_tags(&[("v0.1.0-featurefoobar001", true)]);

        let report = orchestrator
            .publish_with(&merged_event(&["NoRelease"]), &registry, &releases, None)
            .await
            .unwrap();

        assert_eq!(report.decision.version(), None);
        assert!(registry.published().is_empty());
        assert!(releases.created().is_empty());
        assert_eq!(releases.deleted(), vec!["v0.1.0-featurefoobar001"]);
    }
}

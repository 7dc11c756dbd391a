//! Workflow orchestrator
//!
//! This module coordinates the three commands:
//! - build: collect → scan → merge → install → copy → synthesize → write
//! - resolve: event → gather → resolve (read-only)
//! - publish: resolve → stamp version → publish → create release → cleanup
//!
//! Collaborators (installer, registry, release list) are passed in as trait
//! objects so every workflow can run against fakes.

use crate::channel::{
    FeedRegistry, GalleryRegistry, GitHubReleases, HttpClient, PwshPublisher, RegistryChannel,
    ReleaseChannel, ReleaseRequest,
};
use crate::cli::{Command, PublishArgs, ReleaseArgs};
use crate::config::Config;
use crate::dependency::{
    install_all, merge, scan, InstalledModule, ModuleInstaller, ModuleSearchPath, PwshInstaller,
    RequiresScan,
};
use crate::domain::{BoundVersion, Compatibility, DependencySpec, Edition, SemVer};
use crate::error::{AppError, ChannelError, ConfigError, IoError, ManifestError};
use crate::manifest::{
    read_document, set_release_version, DataMap, ManifestInfo, ManifestWriter, ModuleManifest,
};
use crate::progress::Progress;
use crate::pwsh::PwshRunner;
use crate::release::{
    cleanup_targets, gather, resolve, PullRequestEvent, ReleaseContext, ReleaseDecision,
    Resolution,
};
use crate::retry::with_retry_if;
use crate::source::{collect_sources, root_module_script};
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory below the output root that receives installed dependencies
pub const DEPENDENCY_DIR: &str = "dependencies";

/// Result of `build`
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub module: String,
    pub module_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub version: String,
    pub dependencies: Vec<DependencySpec>,
    pub installed: Vec<InstalledModule>,
    pub editions: Vec<Edition>,
    pub powershell_version: Option<BoundVersion>,
    pub functions: Vec<String>,
    pub files: Vec<String>,
    pub root_module_generated: bool,
    /// Whether the manifest differs from the previous build
    pub manifest_changed: bool,
    pub what_if: bool,
}

/// Result of `resolve` and `publish`
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseReport {
    pub module: String,
    pub pull_request: u64,
    pub decision: ReleaseDecision,
    pub registry_latest: SemVer,
    pub vcs_latest: SemVer,
    /// Version in the built manifest, for comparison only
    pub manifest_version: Option<String>,
    /// Prerelease tags selected for deletion
    pub cleanup_targets: Vec<String>,
    pub published: bool,
    pub release_url: Option<String>,
    /// Tags actually deleted
    pub deleted: Vec<String>,
    pub what_if: bool,
}

/// Result of any command
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Report {
    Build(BuildReport),
    Resolve(ReleaseReport),
    Publish(ReleaseReport),
}

/// Resolution plus the manifest it was computed against
struct Prepared {
    report: ReleaseReport,
    manifest_path: PathBuf,
    manifest: Option<DataMap>,
}

/// Orchestrator for coordinating the workflows
pub struct Orchestrator {
    /// Project directory
    project: PathBuf,
    config: Config,
    show_progress: bool,
}

impl Orchestrator {
    /// Create an orchestrator; the configuration is validated first
    pub fn new(project: impl Into<PathBuf>, config: Config) -> Result<Self, AppError> {
        config.validate()?;
        Ok(Self {
            project: project.into(),
            config,
            show_progress: false,
        })
    }

    /// Show spinners for blocking steps
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn what_if(&self) -> bool {
        self.config.release.what_if
    }

    fn output_root(&self) -> PathBuf {
        self.project.join(&self.config.module.output)
    }

    fn manifest_path(&self, module: &str) -> PathBuf {
        self.output_root()
            .join(module)
            .join(format!("{}.psd1", module))
    }

    /// Run one CLI command with the real collaborators
    pub async fn run(&self, command: &Command) -> Result<Report, AppError> {
        match command {
            Command::Build(_) => Ok(Report::Build(self.build().await?)),
            Command::Resolve(args) => Ok(Report::Resolve(self.resolve(args).await?)),
            Command::Publish(args) => Ok(Report::Publish(self.publish(args).await?)),
        }
    }

    /// The registry channel selected by the configuration
    pub fn registry_channel(&self) -> Result<Box<dyn RegistryChannel>, AppError> {
        let registry = &self.config.registry;
        let channel: Box<dyn RegistryChannel> = match &registry.feed_url {
            Some(url) => Box::new(FeedRegistry::new(
                HttpClient::new()?,
                url.clone(),
                PwshPublisher::new(PwshRunner::new(), registry.repository.clone()),
            )),
            None => Box::new(GalleryRegistry::new(
                PwshRunner::new(),
                registry.repository.clone(),
            )),
        };
        Ok(channel)
    }

    /// Build with PSResourceGet as installer
    pub async fn build(&self) -> Result<BuildReport, AppError> {
        let installer = PwshInstaller::new(PwshRunner::new())
            .with_repository(self.config.registry.repository.clone());
        self.build_with(&installer).await
    }

    /// Build the module into `<output>/<Name>`
    pub async fn build_with(
        &self,
        installer: &dyn ModuleInstaller,
    ) -> Result<BuildReport, AppError> {
        let module = self.config.module_name(&self.project)?;
        let source_dir = self.project.join(&self.config.module.source);
        let module_dir = self.output_root().join(&module);
        info!(module = %module, source = %source_dir.display(), "building module");

        let mut sources = collect_sources(&source_dir)?;
        let manifest_name = format!("{}.psd1", module);
        let declared = match sources.remove(Path::new(&manifest_name)) {
            Some(file) => {
                debug!(path = %file.path.display(), "reading source manifest");
                Some(ManifestInfo::from_document(&read_document(&file.path)?)?)
            }
            None => None,
        };

        let scripts = sources.read_scripts()?;
        let scanned = scan(
            scripts
                .iter()
                .map(|(path, content)| (path.as_path(), content.as_str())),
        )?;
        let from_manifest = declared.iter().flat_map(|m| m.required_modules.iter());
        let dependencies = merge(from_manifest.chain(scanned.kinds()))?;
        debug!(count = dependencies.len(), "dependencies merged");

        let compatibility = self.compatibility(&scanned, declared.as_ref())?;
        compatibility.check()?;

        let installed = self.install(installer, &dependencies).await?;

        let manifest_path = module_dir.join(&manifest_name);
        let previous = fs::read_to_string(&manifest_path).ok();
        if module_dir.exists() {
            fs::remove_dir_all(&module_dir).map_err(|e| IoError::generic(&module_dir, e))?;
        }
        fs::create_dir_all(&module_dir).map_err(|e| IoError::generic(&module_dir, e))?;

        let mut files = sources.copy_to(&module_dir)?;
        let functions = sources.public_functions();
        let root_module = format!("{}.psm1", module);
        let root_module_generated = !sources.contains(Path::new(&root_module));
        if root_module_generated {
            let path = module_dir.join(&root_module);
            let script = root_module_script(&sources.dot_sourced_scripts(), &functions);
            fs::write(&path, script).map_err(|e| IoError::generic(&path, e))?;
            files.push(root_module);
        }
        files.push(manifest_name);
        files.sort();

        let manifest = self.manifest(
            &module,
            &compatibility,
            dependencies.clone(),
            files.clone(),
            functions.clone(),
        );
        let written =
            ManifestWriter::new(false).write_document(&manifest_path, &manifest.to_document())?;
        let manifest_changed = previous.as_deref() != Some(written.content.as_str());
        info!(path = %manifest_path.display(), changed = manifest_changed, "manifest written");

        Ok(BuildReport {
            module,
            module_dir,
            manifest_path,
            version: manifest.module_version,
            dependencies,
            installed,
            editions: manifest.compatible_editions,
            powershell_version: manifest.powershell_version,
            functions,
            files,
            root_module_generated,
            manifest_changed,
            what_if: self.what_if(),
        })
    }

    /// Editions: first non-empty of configuration, `#Requires -PSEdition`,
    /// source manifest. Host version: highest of all three.
    fn compatibility(
        &self,
        scanned: &RequiresScan,
        declared: Option<&ManifestInfo>,
    ) -> Result<Compatibility, ConfigError> {
        let module = &self.config.module;
        let declared_editions = declared
            .map(|m| m.compatibility.editions.clone())
            .unwrap_or_default();
        let editions = [
            module.compatible_editions.clone(),
            scanned.editions.clone(),
            declared_editions,
        ]
        .into_iter()
        .find(|e| !e.is_empty())
        .unwrap_or_default();

        let configured = module
            .powershell_version
            .as_deref()
            .map(|raw| {
                BoundVersion::parse(raw).map_err(|e| ConfigError::InvalidValue {
                    key: "module.powershell_version".to_string(),
                    value: raw.to_string(),
                    message: e.message,
                })
            })
            .transpose()?;
        let minimum = [
            configured,
            scanned.minimum_host_version.clone(),
            declared.and_then(|m| m.compatibility.minimum_host_version.clone()),
        ]
        .into_iter()
        .flatten()
        .max();

        Ok(Compatibility::new(editions, minimum))
    }

    async fn install(
        &self,
        installer: &dyn ModuleInstaller,
        dependencies: &[DependencySpec],
    ) -> Result<Vec<InstalledModule>, AppError> {
        if !self.config.module.install_dependencies || dependencies.is_empty() {
            return Ok(Vec::new());
        }

        let destination = self.output_root().join(DEPENDENCY_DIR);
        if !self.what_if() {
            fs::create_dir_all(&destination).map_err(|e| IoError::generic(&destination, e))?;
        }
        let mut search_path = ModuleSearchPath::from_env();

        let mut progress = Progress::new(self.show_progress);
        progress.spinner(&format!("Installing {} dependencies...", dependencies.len()));
        let result = install_all(
            installer,
            dependencies,
            &destination,
            &mut search_path,
            self.config.retry.policy(),
            self.what_if(),
        )
        .await;
        progress.finish_and_clear();

        Ok(result?)
    }

    fn manifest(
        &self,
        name: &str,
        compatibility: &Compatibility,
        required_modules: Vec<DependencySpec>,
        file_list: Vec<String>,
        functions_to_export: Vec<String>,
    ) -> ModuleManifest {
        let module = &self.config.module;
        ModuleManifest {
            compatible_editions: compatibility.resolved_editions(),
            guid: module.guid.clone(),
            author: module.author.clone(),
            company_name: module.company_name.clone(),
            copyright: module.copyright.clone(),
            description: module.description.clone(),
            powershell_version: compatibility.minimum_host_version.clone(),
            required_modules,
            file_list,
            functions_to_export,
            cmdlets_to_export: module.cmdlets_to_export.clone(),
            variables_to_export: module.variables_to_export.clone(),
            aliases_to_export: module.aliases_to_export.clone(),
            tags: module.tags.clone(),
            license_uri: module.license_uri.clone(),
            project_uri: module.project_uri.clone(),
            icon_uri: module.icon_uri.clone(),
            release_notes: module.release_notes.clone(),
            ..ModuleManifest::new(name)
        }
    }

    /// Resolve against the configured registry and GitHub releases
    pub async fn resolve(&self, args: &ReleaseArgs) -> Result<ReleaseReport, AppError> {
        let event = PullRequestEvent::from_path(&args.event)?;
        let registry = self.registry_channel()?;
        let vcs = release_channel(args)?;
        self.resolve_with(&event, registry.as_ref(), &vcs).await
    }

    /// Compute the next release without changing anything
    pub async fn resolve_with(
        &self,
        event: &PullRequestEvent,
        registry: &dyn RegistryChannel,
        vcs: &dyn ReleaseChannel,
    ) -> Result<ReleaseReport, AppError> {
        Ok(self.prepare(event, registry, vcs).await?.report)
    }

    /// Publish against the configured registry and GitHub releases
    pub async fn publish(&self, args: &PublishArgs) -> Result<ReleaseReport, AppError> {
        let event = PullRequestEvent::from_path(&args.release.event)?;
        let registry = self.registry_channel()?;
        let vcs = release_channel(&args.release)?;
        self.publish_with(&event, registry.as_ref(), &vcs, args.api_key.as_deref())
            .await
    }

    /// Resolve, then publish, create the release and clean up
    pub async fn publish_with(
        &self,
        event: &PullRequestEvent,
        registry: &dyn RegistryChannel,
        vcs: &dyn ReleaseChannel,
        api_key: Option<&str>,
    ) -> Result<ReleaseReport, AppError> {
        let what_if = self.what_if();
        let policy = self.config.retry.policy();
        let Prepared {
            mut report,
            manifest_path,
            manifest,
        } = self.prepare(event, registry, vcs).await?;

        if let Resolution::Release {
            version,
            is_prerelease,
        } = report.decision.outcome.clone()
        {
            let mut doc = manifest.ok_or_else(|| ManifestError::NotFound {
                path: manifest_path.clone(),
            })?;
            let api_key = match api_key.filter(|k| !k.is_empty()) {
                Some(key) => Some(key),
                None if what_if => None,
                None => {
                    return Err(ConfigError::MissingValue {
                        key: "PSGALLERY_API_KEY".to_string(),
                    }
                    .into())
                }
            };

            set_release_version(&mut doc, &version);
            ManifestWriter::new(what_if).write_document(&manifest_path, &doc)?;

            let module_dir = manifest_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            match api_key {
                Some(key) if !what_if => {
                    info!(%version, registry = registry.channel_name(), "publishing");
                    with_retry_if(policy, ChannelError::is_transient, |_| {
                        registry.publish(&module_dir, key)
                    })
                    .await?;
                    report.published = true;
                }
                _ => info!(%version, "what-if: would publish"),
            }

            let tag = version.to_string();
            let request = ReleaseRequest {
                tag: tag.clone(),
                title: tag.clone(),
                target: if is_prerelease {
                    event.head_branch.clone()
                } else {
                    event.base_branch.clone()
                },
                prerelease: is_prerelease,
                notes: None,
            };
            if what_if {
                info!(%tag, "what-if: would create release");
            } else {
                let url = with_retry_if(policy, ChannelError::is_transient, |_| {
                    vcs.create_release(&request)
                })
                .await?;
                info!(%tag, %url, "release created");
                report.release_url = Some(url);
            }
        }

        for tag in report.cleanup_targets.clone() {
            if what_if {
                info!(%tag, "what-if: would delete prerelease");
                continue;
            }
            with_retry_if(policy, ChannelError::is_transient, |_| vcs.delete_release(&tag)).await?;
            info!(%tag, "prerelease deleted");
            report.deleted.push(tag);
        }

        Ok(report)
    }

    async fn prepare(
        &self,
        event: &PullRequestEvent,
        registry: &dyn RegistryChannel,
        vcs: &dyn ReleaseChannel,
    ) -> Result<Prepared, AppError> {
        let module = self.config.module_name(&self.project)?;
        let manifest_path = self.manifest_path(&module);
        let manifest = match read_document(&manifest_path) {
            Ok(doc) => Some(doc),
            Err(ManifestError::NotFound { .. }) => None,
            Err(e) => return Err(e.into()),
        };
        let info = manifest
            .as_ref()
            .map(ManifestInfo::from_document)
            .transpose()?;

        let compatibility = match &info {
            Some(info) => info.compatibility.clone(),
            None => self.compatibility(&RequiresScan::default(), None)?,
        };
        let manifest_version = info.as_ref().and_then(ManifestInfo::full_version);
        let parsed_manifest_version = manifest_version
            .as_deref()
            .and_then(|v| SemVer::parse(v).ok());

        let mut progress = Progress::new(self.show_progress);
        progress.spinner("Looking up published versions...");
        let gathered = gather(registry, vcs, &module, self.config.retry.policy()).await;
        progress.finish_and_clear();

        let ctx = ReleaseContext {
            registry: &gathered.registry,
            vcs: &gathered.vcs,
            manifest_version: parsed_manifest_version.as_ref(),
            event,
            config: &self.config.release,
            compatibility: &compatibility,
            now: Utc::now(),
        };
        let decision = resolve(&ctx)?;
        let targets = decision
            .cleanup
            .as_deref()
            .map(|id| cleanup_targets(&gathered.releases, id))
            .unwrap_or_default();

        Ok(Prepared {
            report: ReleaseReport {
                module,
                pull_request: event.number,
                decision,
                registry_latest: gathered.registry.latest,
                vcs_latest: gathered.vcs.latest,
                manifest_version,
                cleanup_targets: targets,
                published: false,
                release_url: None,
                deleted: Vec::new(),
                what_if: self.what_if(),
            },
            manifest_path,
            manifest,
        })
    }
}

/// GitHub releases channel for the repository named on the command line
pub fn release_channel(args: &ReleaseArgs) -> Result<GitHubReleases, AppError> {
    let repository = args
        .repository
        .clone()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingValue {
            key: "GITHUB_REPOSITORY".to_string(),
        })?;
    let mut client = HttpClient::new()?;
    if let Some(token) = &args.token {
        client = client.with_token(token.clone());
    }
    Ok(GitHubReleases::new(client, repository).with_api_url(args.api_url.clone()))
}

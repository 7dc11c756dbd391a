//! Registry channels
//!
//! - [`GalleryRegistry`] asks PSResourceGet (`Find-PSResource`) for the
//!   versions of a module in a registered repository such as PSGallery.
//! - [`FeedRegistry`] reads a NuGet v3 flat container
//!   (`{base}/{id}/index.json`) over HTTP, for private feeds.
//!
//! Both publish through `Publish-PSResource`.

use super::{HttpClient, RegistryChannel};
use crate::error::ChannelError;
use crate::pwsh::{quote_arg, PwshRunner};
use async_trait::async_trait;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Environment variable carrying the API key into the publish process
pub const API_KEY_VAR: &str = "SHIPMOD_API_KEY";

/// Default repository name
pub const DEFAULT_REPOSITORY: &str = "PSGallery";

/// Publishes module directories with `Publish-PSResource`
#[derive(Debug, Clone)]
pub struct PwshPublisher {
    runner: PwshRunner,
    repository: String,
}

impl PwshPublisher {
    pub fn new(runner: PwshRunner, repository: impl Into<String>) -> Self {
        Self {
            runner,
            repository: repository.into(),
        }
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// The publish script; the key is read from the environment, never inlined
    pub fn publish_script(&self, module_path: &Path) -> String {
        format!(
            "Publish-PSResource -Path {} -Repository {} -ApiKey $env:{} -ErrorAction Stop",
            quote_arg(&module_path.display().to_string()),
            quote_arg(&self.repository),
            API_KEY_VAR
        )
    }

    pub async fn publish(&self, module_path: &Path, api_key: &str) -> Result<(), ChannelError> {
        let module = module_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let script = self.publish_script(module_path);
        let env = [(API_KEY_VAR, OsString::from(api_key))];

        let output = self.runner.run(&script, &env).await.map_err(|e| {
            ChannelError::network_error(&module, &self.repository, e.to_string())
        })?;
        if output.success {
            Ok(())
        } else {
            Err(ChannelError::PublishFailed {
                module,
                message: output.failure_message(),
            })
        }
    }
}

/// Registry lookups through PSResourceGet
#[derive(Debug, Clone)]
pub struct GalleryRegistry {
    runner: PwshRunner,
    publisher: PwshPublisher,
}

impl GalleryRegistry {
    pub fn new(runner: PwshRunner, repository: impl Into<String>) -> Self {
        Self {
            publisher: PwshPublisher::new(runner.clone(), repository),
            runner,
        }
    }

    /// Script printing one `version[-prerelease]` per line
    pub fn find_script(&self, module: &str) -> String {
        format!(
            "Find-PSResource -Name {} -Version '*' -Prerelease -Repository {} -ErrorAction Stop | \
             ForEach-Object {{ if ($_.Prerelease) {{ \"$($_.Version)-$($_.Prerelease)\" }} \
             else {{ \"$($_.Version)\" }} }}",
            quote_arg(module),
            quote_arg(self.publisher.repository())
        )
    }
}

impl Default for GalleryRegistry {
    fn default() -> Self {
        Self::new(PwshRunner::new(), DEFAULT_REPOSITORY)
    }
}

/// Non-empty trimmed lines of command output
fn version_lines(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl RegistryChannel for GalleryRegistry {
    fn channel_name(&self) -> &'static str {
        "PSResourceGet"
    }

    async fn fetch_versions(&self, module: &str) -> Result<Vec<String>, ChannelError> {
        let script = self.find_script(module);
        let output = self.runner.run(&script, &[]).await.map_err(|e| {
            ChannelError::network_error(module, self.channel_name(), e.to_string())
        })?;

        if !output.success {
            let message = output.failure_message();
            if message.to_ascii_lowercase().contains("could not be found") {
                return Err(ChannelError::not_found(module, self.channel_name()));
            }
            return Err(ChannelError::network_error(module, self.channel_name(), message));
        }

        let versions = version_lines(&output.stdout);
        debug!(module, count = versions.len(), "registry versions");
        Ok(versions)
    }

    async fn publish(&self, module_path: &Path, api_key: &str) -> Result<(), ChannelError> {
        self.publisher.publish(module_path, api_key).await
    }
}

/// NuGet v3 flat container response
#[derive(Debug, Deserialize)]
struct FlatContainerIndex {
    versions: Vec<String>,
}

/// Registry lookups against a NuGet v3 flat container
#[derive(Clone)]
pub struct FeedRegistry {
    client: HttpClient,
    base_url: String,
    publisher: PwshPublisher,
}

impl FeedRegistry {
    pub fn new(client: HttpClient, base_url: impl Into<String>, publisher: PwshPublisher) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            publisher,
        }
    }

    /// Build the index URL; package ids are lower-cased in flat containers
    fn build_url(&self, module: &str) -> String {
        format!(
            "{}/{}/index.json",
            self.base_url.trim_end_matches('/'),
            module.to_lowercase()
        )
    }
}

#[async_trait]
impl RegistryChannel for FeedRegistry {
    fn channel_name(&self) -> &'static str {
        "NuGet feed"
    }

    async fn fetch_versions(&self, module: &str) -> Result<Vec<String>, ChannelError> {
        let url = self.build_url(module);
        let index: FlatContainerIndex = self
            .client
            .get_json(&url, module, self.channel_name())
            .await?;
        debug!(module, count = index.versions.len(), "feed versions");
        Ok(index.versions)
    }

    async fn publish(&self, module_path: &Path, api_key: &str) -> Result<(), ChannelError> {
        self.publisher.publish(module_path, api_key).await
    }
}

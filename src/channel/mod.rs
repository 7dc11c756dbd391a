//! Release channels: where published versions live
//!
//! This module provides:
//! - HTTP client shared foundation
//! - Registry channels (PowerShell Gallery through PSResourceGet, NuGet v3 feeds)
//! - The GitHub releases channel
//!
//! Channels only report and mutate remote state. Retrying and degrading
//! failed lookups to `0.0.0` happen in [`crate::release::gather`].

mod client;
mod gallery;
mod github;

pub use client::HttpClient;
pub use gallery::{FeedRegistry, GalleryRegistry, PwshPublisher, API_KEY_VAR};
pub use github::{GitHubReleases, DEFAULT_API_URL};

use crate::error::ChannelError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A package registry holding published module versions
#[async_trait]
pub trait RegistryChannel: Send + Sync {
    /// Get the channel name
    fn channel_name(&self) -> &'static str;

    /// All published versions of a module, releases and prereleases
    async fn fetch_versions(&self, module: &str) -> Result<Vec<String>, ChannelError>;

    /// Publish the built module directory
    async fn publish(&self, module_path: &Path, api_key: &str) -> Result<(), ChannelError>;
}

/// A source-control release list
#[async_trait]
pub trait ReleaseChannel: Send + Sync {
    /// Get the channel name
    fn channel_name(&self) -> &'static str;

    /// All releases, newest first as reported by the host
    async fn list_releases(&self) -> Result<Vec<VcsRelease>, ChannelError>;

    /// Create a release and return its URL
    async fn create_release(&self, request: &ReleaseRequest) -> Result<String, ChannelError>;

    /// Delete a release and its tag
    async fn delete_release(&self, tag: &str) -> Result<(), ChannelError>;
}

/// One release as reported by the release channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsRelease {
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    /// Marked as the latest release by the host
    #[serde(default)]
    pub latest: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl VcsRelease {
    pub fn new(tag_name: impl Into<String>, prerelease: bool) -> Self {
        Self {
            tag_name: tag_name.into(),
            prerelease,
            ..Default::default()
        }
    }
}

/// Parameters of a release to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRequest {
    /// Tag to create, including the version prefix
    pub tag: String,
    pub title: String,
    /// Branch or commit the tag points at
    pub target: String,
    pub prerelease: bool,
    pub notes: Option<String>,
}

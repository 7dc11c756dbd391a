//! GitHub releases channel
//!
//! API endpoints:
//! - `GET  /repos/{repo}/releases?per_page=100&page={n}`
//! - `GET  /repos/{repo}/releases/latest`
//! - `POST /repos/{repo}/releases`
//! - `GET  /repos/{repo}/releases/tags/{tag}`, then
//!   `DELETE /repos/{repo}/releases/{id}` and `DELETE /repos/{repo}/git/refs/tags/{tag}`

use super::{HttpClient, ReleaseChannel, ReleaseRequest, VcsRelease};
use crate::error::ChannelError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public GitHub API
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Page size for release listing
const PER_PAGE: usize = 100;

/// Release object as returned by the API
#[derive(Debug, Deserialize)]
struct GitHubRelease {
    id: u64,
    tag_name: String,
    name: Option<String>,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    prerelease: bool,
    created_at: Option<DateTime<Utc>>,
    published_at: Option<DateTime<Utc>>,
    html_url: Option<String>,
}

impl GitHubRelease {
    fn into_release(self, latest_tag: Option<&str>) -> VcsRelease {
        VcsRelease {
            latest: latest_tag == Some(self.tag_name.as_str()),
            tag_name: self.tag_name,
            name: self.name,
            prerelease: self.prerelease,
            created_at: self.created_at,
            published_at: self.published_at,
            html_url: self.html_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateReleaseBody<'a> {
    tag_name: &'a str,
    name: &'a str,
    target_commitish: &'a str,
    prerelease: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<&'a str>,
    generate_release_notes: bool,
}

/// Releases of one GitHub repository
#[derive(Clone)]
pub struct GitHubReleases {
    client: HttpClient,
    api_url: String,
    repository: String,
}

impl GitHubReleases {
    /// `repository` is `owner/name`
    pub fn new(client: HttpClient, repository: impl Into<String>) -> Self {
        Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            repository: repository.into(),
        }
    }

    /// Use a different API root (GitHub Enterprise)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_url, self.repository, path)
    }

    async fn latest_tag(&self) -> Result<Option<String>, ChannelError> {
        let url = self.repo_url("releases/latest");
        match self
            .client
            .get_json::<GitHubRelease>(&url, "latest release", self.channel_name())
            .await
        {
            Ok(release) => Ok(Some(release.tag_name)),
            Err(ChannelError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl ReleaseChannel for GitHubReleases {
    fn channel_name(&self) -> &'static str {
        "GitHub releases"
    }

    async fn list_releases(&self) -> Result<Vec<VcsRelease>, ChannelError> {
        let latest = self.latest_tag().await?;
        let mut releases = Vec::new();

        for page in 1.. {
            let url = self.repo_url(&format!("releases?per_page={}&page={}", PER_PAGE, page));
            let batch: Vec<GitHubRelease> = self
                .client
                .get_json(&url, &self.repository, self.channel_name())
                .await?;
            let last_page = batch.len() < PER_PAGE;
            releases.extend(
                batch
                    .into_iter()
                    .filter(|r| !r.draft)
                    .map(|r| r.into_release(latest.as_deref())),
            );
            if last_page {
                break;
            }
        }

        debug!(repository = %self.repository, count = releases.len(), "releases listed");
        Ok(releases)
    }

    async fn create_release(&self, request: &ReleaseRequest) -> Result<String, ChannelError> {
        let body = CreateReleaseBody {
            tag_name: &request.tag,
            name: &request.title,
            target_commitish: &request.target,
            prerelease: request.prerelease,
            body: request.notes.as_deref(),
            generate_release_notes: request.notes.is_none(),
        };
        let created: GitHubRelease = self
            .client
            .post_json(&self.repo_url("releases"), &body, &request.tag, self.channel_name())
            .await?;
        created.html_url.ok_or_else(|| {
            ChannelError::invalid_response(
                &request.tag,
                self.channel_name(),
                "release without html_url",
            )
        })
    }

    async fn delete_release(&self, tag: &str) -> Result<(), ChannelError> {
        let release: GitHubRelease = self
            .client
            .get_json(
                &self.repo_url(&format!("releases/tags/{}", tag)),
                tag,
                self.channel_name(),
            )
            .await?;
        self.client
            .delete(
                &self.repo_url(&format!("releases/{}", release.id)),
                tag,
                self.channel_name(),
            )
            .await?;
        self.client
            .delete(
                &self.repo_url(&format!("git/refs/tags/{}", tag)),
                tag,
                self.channel_name(),
            )
            .await
    }
}

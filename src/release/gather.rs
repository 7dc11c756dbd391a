//! Collect version state from the registry and the release list
//!
//! A lookup that keeps failing after the retry policy is exhausted degrades
//! to an empty channel (`0.0.0`, no prereleases) instead of failing the run.

use crate::channel::{RegistryChannel, ReleaseChannel, VcsRelease};
use crate::domain::SemVer;
use crate::error::ChannelError;
use crate::retry::{with_retry_if, RetryPolicy};
use serde::Serialize;
use tracing::{debug, warn};

/// What one channel knows about published versions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelState {
    /// Highest release version, `0.0.0` when none
    pub latest: SemVer,
    pub prereleases: Vec<SemVer>,
}

impl ChannelState {
    /// Build from raw version strings; unparseable entries are skipped
    pub fn from_version_strings<'a, I>(versions: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = Self::default();
        for raw in versions {
            match SemVer::parse(raw) {
                Ok(version) => state.add(version),
                Err(e) => debug!(%e, "skipping version"),
            }
        }
        state
    }

    /// Build from release tags; the host's own prerelease flag is honoured
    pub fn from_releases(releases: &[VcsRelease]) -> Self {
        let mut state = Self::default();
        for release in releases {
            match SemVer::parse(&release.tag_name) {
                Ok(version) if release.prerelease && !version.is_prerelease() => {
                    debug!(tag = %release.tag_name, "prerelease without identifier ignored");
                }
                Ok(version) => state.add(version),
                Err(e) => debug!(%e, "skipping release tag"),
            }
        }
        state
    }

    fn add(&mut self, version: SemVer) {
        if version.is_prerelease() {
            self.prereleases.push(version);
        } else if version > self.latest {
            self.latest = version;
        }
    }
}

/// State of both channels plus the raw release list used for cleanup
#[derive(Debug, Clone, Default)]
pub struct Gathered {
    pub registry: ChannelState,
    pub vcs: ChannelState,
    pub releases: Vec<VcsRelease>,
}

fn degrade<T: Default>(result: Result<T, ChannelError>, channel: &str) -> T {
    match result {
        Ok(value) => value,
        Err(ChannelError::NotFound { subject, .. }) => {
            debug!(channel, %subject, "nothing published yet");
            T::default()
        }
        Err(e) => {
            warn!(channel, error = %e, "lookup failed, assuming 0.0.0");
            T::default()
        }
    }
}

/// Query both channels, one after the other
pub async fn gather(
    registry: &dyn RegistryChannel,
    vcs: &dyn ReleaseChannel,
    module: &str,
    policy: RetryPolicy,
) -> Gathered {
    let versions = with_retry_if(policy, ChannelError::is_transient, |_| {
        registry.fetch_versions(module)
    })
    .await;
    let versions = degrade(versions, registry.channel_name());
    let registry_state = ChannelState::from_version_strings(versions.iter().map(String::as_str));

    let releases = with_retry_if(policy, ChannelError::is_transient, |_| vcs.list_releases()).await;
    let releases = degrade(releases, vcs.channel_name());
    let vcs_state = ChannelState::from_releases(&releases);

    debug!(
        registry = %registry_state.latest,
        vcs = %vcs_state.latest,
        "channel state gathered"
    );

    Gathered {
        registry: registry_state,
        vcs: vcs_state,
        releases,
    }
}

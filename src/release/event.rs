//! Pull-request event payload
//!
//! Read from the JSON file GitHub Actions points `GITHUB_EVENT_PATH` at.

use crate::error::EventError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The parts of a pull-request event the resolver needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub number: u64,
    pub labels: Vec<String>,
    pub merged: bool,
    pub closed: bool,
    /// Branch the pull request targets
    pub base_branch: String,
    /// Branch the changes come from
    pub head_branch: String,
    pub default_branch: String,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    pull_request: Option<RawPullRequest>,
    repository: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawPullRequest {
    number: u64,
    #[serde(default)]
    state: String,
    #[serde(default)]
    merged: bool,
    #[serde(default)]
    labels: Vec<RawLabel>,
    base: RawRef,
    head: RawRef,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    name: String,
    repo: Option<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    default_branch: Option<String>,
}

impl PullRequestEvent {
    /// Parse an event payload
    pub fn from_json(json: &str) -> Result<Self, EventError> {
        let raw: RawEvent = serde_json::from_str(json).map_err(|e| EventError::ParseError {
            message: e.to_string(),
        })?;
        let pr = raw.pull_request.ok_or(EventError::NotPullRequest)?;

        let default_branch = raw
            .repository
            .and_then(|r| r.default_branch)
            .or_else(|| pr.base.repo.as_ref().and_then(|r| r.default_branch.clone()))
            .ok_or_else(|| EventError::ParseError {
                message: "missing repository default_branch".to_string(),
            })?;

        Ok(Self {
            number: pr.number,
            labels: pr.labels.into_iter().map(|l| l.name).collect(),
            merged: pr.merged,
            closed: pr.state.eq_ignore_ascii_case("closed"),
            base_branch: pr.base.name,
            head_branch: pr.head.name,
            default_branch,
        })
    }

    /// Read and parse an event file
    pub fn from_path(path: &Path) -> Result<Self, EventError> {
        let content = std::fs::read_to_string(path).map_err(|e| EventError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Merged into the repository's default branch
    pub fn merged_into_default(&self) -> bool {
        self.merged && self.base_branch == self.default_branch
    }

    pub fn is_open(&self) -> bool {
        !self.closed && !self.merged
    }

    /// Case-insensitive label lookup
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }
}

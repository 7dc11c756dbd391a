//! Release version resolution
//!
//! Given the pull-request event, the state of the registry and the release
//! list, and the release options, decide whether to release and which
//! version to use:
//!
//! 1. classify labels (ignore > major > minor > patch > auto-patch)
//! 2. take the higher of both channels' latest release
//! 3. bump it once
//! 4. for open pull requests with the `prerelease` label, append a branch
//!    identifier and the next free sequence number
//!
//! Skipping is a normal outcome, not an error.

mod event;
mod gather;
mod labels;
mod prerelease;

pub use event::PullRequestEvent;
pub use gather::{gather, ChannelState, Gathered};
pub use labels::{classify, BumpSource, LabelClass};
pub use prerelease::{branch_identifier, PRERELEASE_LABEL};

use crate::channel::VcsRelease;
use crate::config::ReleaseConfig;
use crate::domain::{BumpKind, Compatibility, SemVer};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Everything one resolution run looks at
#[derive(Debug, Clone)]
pub struct ReleaseContext<'a> {
    pub registry: &'a ChannelState,
    pub vcs: &'a ChannelState,
    /// Version in the built manifest; logged, never used for the result
    pub manifest_version: Option<&'a SemVer>,
    pub event: &'a PullRequestEvent,
    pub config: &'a ReleaseConfig,
    pub compatibility: &'a Compatibility,
    pub now: DateTime<Utc>,
}

/// Why no version was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "label", rename_all = "snake_case")]
pub enum SkipReason {
    /// An ignore label is present
    IgnoreLabel(String),
    /// No bump label and automatic patching is disabled
    NoBumpLabel,
    /// Merged into a branch other than the default branch
    NotDefaultBranch,
    ClosedWithoutMerge,
    /// Open without the prerelease label
    NoReleaseTrigger,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::IgnoreLabel(label) => write!(f, "ignore label '{}'", label),
            SkipReason::NoBumpLabel => write!(f, "no bump label"),
            SkipReason::NotDefaultBranch => write!(f, "not merged into the default branch"),
            SkipReason::ClosedWithoutMerge => write!(f, "closed without merge"),
            SkipReason::NoReleaseTrigger => write!(f, "no release trigger"),
        }
    }
}

/// Result of a resolution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Skip { reason: SkipReason },
    Release { version: SemVer, is_prerelease: bool },
}

/// Resolution outcome plus what the caller should clean up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseDecision {
    pub outcome: Resolution,
    /// Branch identifier whose prereleases should be deleted
    pub cleanup: Option<String>,
    pub bump: Option<BumpKind>,
    pub bump_source: Option<BumpSource>,
    /// Higher of the two channels' latest releases
    pub latest: SemVer,
}

impl ReleaseDecision {
    fn skip(reason: SkipReason, cleanup: Option<String>, latest: SemVer) -> Self {
        Self {
            outcome: Resolution::Skip { reason },
            cleanup,
            bump: None,
            bump_source: None,
            latest,
        }
    }

    /// The version to release, if any
    pub fn version(&self) -> Option<&SemVer> {
        match &self.outcome {
            Resolution::Release { version, .. } => Some(version),
            Resolution::Skip { .. } => None,
        }
    }

    pub fn is_prerelease(&self) -> bool {
        matches!(
            self.outcome,
            Resolution::Release {
                is_prerelease: true,
                ..
            }
        )
    }
}

/// Decide the next release
pub fn resolve(ctx: &ReleaseContext<'_>) -> Result<ReleaseDecision, AppError> {
    let config = ctx.config;
    let event = ctx.event;
    config.check_labels()?;
    ctx.compatibility.check()?;

    let latest = std::cmp::max(&ctx.registry.latest, &ctx.vcs.latest)
        .clone()
        .with_prefix(config.version_prefix.clone());
    if let Some(manifest) = ctx.manifest_version {
        debug!(manifest = %manifest, latest = %latest, "manifest version is informational");
    }

    let cleanup = (config.auto_cleanup && event.closed)
        .then(|| branch_identifier(&event.head_branch));

    let (kind, source) = match classify(&event.labels, config) {
        LabelClass::Ignore(label) => {
            return Ok(ReleaseDecision::skip(
                SkipReason::IgnoreLabel(label),
                cleanup,
                latest,
            ))
        }
        LabelClass::NoMatch => {
            return Ok(ReleaseDecision::skip(
                SkipReason::NoBumpLabel,
                cleanup,
                latest,
            ))
        }
        LabelClass::Bump { kind, source } => (kind, source),
    };

    let mut next = latest.clone();
    next.bump(kind)?;

    let outcome = if event.merged_into_default() {
        Resolution::Release {
            version: next,
            is_prerelease: false,
        }
    } else if event.merged {
        Resolution::Skip {
            reason: SkipReason::NotDefaultBranch,
        }
    } else if event.closed {
        Resolution::Skip {
            reason: SkipReason::ClosedWithoutMerge,
        }
    } else if event.has_label(PRERELEASE_LABEL) {
        let id =
            prerelease::identifier(&event.head_branch, &config.date_prerelease_format, ctx.now)?;
        let pre = if config.incremental_prerelease {
            let number = prerelease::next_number(&[ctx.registry, ctx.vcs], &next, &id);
            prerelease::numbered(&id, number)
        } else {
            id
        };
        Resolution::Release {
            version: next.with_prerelease(pre),
            is_prerelease: true,
        }
    } else {
        Resolution::Skip {
            reason: SkipReason::NoReleaseTrigger,
        }
    };

    match &outcome {
        Resolution::Release { version, .. } => info!(%version, bump = %kind, "release resolved"),
        Resolution::Skip { reason } => info!(%reason, "release skipped"),
    }

    Ok(ReleaseDecision {
        outcome,
        cleanup,
        bump: Some(kind),
        bump_source: Some(source),
        latest,
    })
}

/// Tags of prerelease releases created from the branch `identifier`
pub fn cleanup_targets(releases: &[VcsRelease], identifier: &str) -> Vec<String> {
    releases
        .iter()
        .filter(|r| r.prerelease)
        .filter(|r| {
            SemVer::parse(&r.tag_name)
                .is_ok_and(|v| prerelease::belongs_to(&v.prerelease, identifier))
        })
        .map(|r| r.tag_name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoundVersion, Edition};
    use crate::error::ConfigConflictError;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn event(labels: &[&str], merged: bool, closed: bool) -> PullRequestEvent {
        PullRequestEvent {
            number: 1,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            merged,
            closed,
            base_branch: "main".to_string(),
            head_branch: "feature/Foo-Bar!".to_string(),
            default_branch: "main".to_string(),
        }
    }

    fn states(registry: &[&str], vcs: &[&str]) -> (ChannelState, ChannelState) {
        (
            ChannelState::from_version_strings(registry.iter().copied()),
            ChannelState::from_version_strings(vcs.iter().copied()),
        )
    }

    fn run(
        registry: &ChannelState,
        vcs: &ChannelState,
        event: &PullRequestEvent,
        config: &ReleaseConfig,
    ) -> Result<ReleaseDecision, AppError> {
        let compatibility = Compatibility::default();
        let ctx = ReleaseContext {
            registry,
            vcs,
            manifest_version: None,
            event,
            config,
            compatibility: &compatibility,
            now: Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap(),
        };
        resolve(&ctx)
    }

    #[test]
    fn test_merged_minor_bumps_highest_channel() {
        let (registry, vcs) = states(&["1.2.0"], &["1.3.0"]);
        let decision = run(
            &registry,
            &vcs,
            &event(&["minor"], true, true),
            &ReleaseConfig::default(),
        )
        .unwrap();
        assert_eq!(decision.version().map(|v| v.to_string()), Some("v1.4.0".to_string()));
        assert!(!decision.is_prerelease());
        assert_eq!(decision.bump, Some(BumpKind::Minor));
        assert_eq!(decision.latest.core_string(), "1.3.0");
        assert_eq!(decision.cleanup.as_deref(), Some("featurefoobar"));
    }

    #[test]
    fn test_prerelease_number_continues_across_channels() {
        let (registry, vcs) = states(
            &["1.2.0", "1.3.0-featurefoobar001"],
            &["1.2.0", "1.3.0-featurefoobar002"],
        );
        let decision = run(
            &registry,
            &vcs,
            &event(&["minor", "prerelease"], false, false),
            &ReleaseConfig::default(),
        )
        .unwrap();
        let version = decision.version().unwrap();
        assert_eq!(version.prerelease, "featurefoobar003");
        assert_eq!(version.to_string(), "v1.3.0-featurefoobar003");
        assert!(decision.is_prerelease());
        assert_eq!(decision.cleanup, None);
    }

    #[test]
    fn test_prerelease_without_numbering() {
        let (registry, vcs) = states(&[], &[]);
        let config = ReleaseConfig {
            incremental_prerelease: false,
            date_prerelease_format: "%Y%m%d".to_string(),
            ..Default::default()
        };
        let decision = run(&registry, &vcs, &event(&["fix", "Prerelease"], false, false), &config)
            .unwrap();
        assert_eq!(
            decision.version().unwrap().to_string(),
            "v0.0.1-featurefoobar20240517"
        );
    }

    #[test]
    fn test_ignore_label_skips_even_with_major() {
        let (registry, vcs) = states(&["1.0.0"], &[]);
        let decision = run(
            &registry,
            &vcs,
            &event(&["major", "NoRelease"], true, true),
            &ReleaseConfig::default(),
        )
        .unwrap();
        assert_eq!(
            decision.outcome,
            Resolution::Skip {
                reason: SkipReason::IgnoreLabel("NoRelease".to_string())
            }
        );
        assert_eq!(decision.bump, None);
    }

    #[test]
    fn test_no_bump_label_without_auto_patch() {
        let (registry, vcs) = states(&[], &[]);
        let config = ReleaseConfig {
            auto_patching: false,
            ..Default::default()
        };
        let decision = run(&registry, &vcs, &event(&["docs"], true, true), &config).unwrap();
        assert_eq!(
            decision.outcome,
            Resolution::Skip {
                reason: SkipReason::NoBumpLabel
            }
        );
    }

    #[test]
    fn test_closed_without_merge_cleans_up() {
        let (registry, vcs) = states(&["1.0.0"], &[]);
        let decision = run(
            &registry,
            &vcs,
            &event(&["prerelease"], false, true),
            &ReleaseConfig::default(),
        )
        .unwrap();
        assert_eq!(
            decision.outcome,
            Resolution::Skip {
                reason: SkipReason::ClosedWithoutMerge
            }
        );
        assert_eq!(decision.cleanup.as_deref(), Some("featurefoobar"));
    }

    #[test]
    fn test_cleanup_disabled() {
        let (registry, vcs) = states(&[], &[]);
        let config = ReleaseConfig {
            auto_cleanup: false,
            ..Default::default()
        };
        let decision = run(&registry, &vcs, &event(&[], false, true), &config).unwrap();
        assert_eq!(decision.cleanup, None);
    }

    #[test]
    fn test_open_without_prerelease_label() {
        let (registry, vcs) = states(&[], &[]);
        let decision = run(
            &registry,
            &vcs,
            &event(&["minor"], false, false),
            &ReleaseConfig::default(),
        )
        .unwrap();
        assert_eq!(
            decision.outcome,
            Resolution::Skip {
                reason: SkipReason::NoReleaseTrigger
            }
        );
    }

    #[test]
    fn test_merged_into_other_branch() {
        let (registry, vcs) = states(&[], &[]);
        let mut pr = event(&["minor"], true, true);
        pr.base_branch = "release/1.x".to_string();
        let decision = run(&registry, &vcs, &pr, &ReleaseConfig::default()).unwrap();
        assert_eq!(
            decision.outcome,
            Resolution::Skip {
                reason: SkipReason::NotDefaultBranch
            }
        );
    }

    #[test]
    fn test_empty_channels_start_from_zero() {
        let (registry, vcs) = states(&[], &[]);
        let config = ReleaseConfig {
            version_prefix: String::new(),
            ..Default::default()
        };
        let decision = run(&registry, &vcs, &event(&[], true, true), &config).unwrap();
        assert_eq!(decision.version().unwrap().to_string(), "0.0.1");
        assert_eq!(decision.bump_source, Some(BumpSource::AutoPatch));
    }

    #[test]
    fn test_overlapping_labels_conflict() {
        let (registry, vcs) = states(&[], &[]);
        let config = ReleaseConfig {
            minor_labels: vec!["Feature".to_string()],
            patch_labels: vec!["feature".to_string()],
            ..Default::default()
        };
        let err = run(&registry, &vcs, &event(&[], true, true), &config).unwrap_err();
        match err {
            AppError::ConfigConflict(ConfigConflictError { first, second, .. }) => {
                assert_eq!(first, "minor_labels");
                assert_eq!(second, "patch_labels");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_bump_past_largest_version_fails() {
        let (registry, vcs) = states(&["18446744073709551615.0.0"], &[]);
        let result = run(
            &registry,
            &vcs,
            &event(&["major"], true, true),
            &ReleaseConfig::default(),
        );
        assert!(matches!(result, Err(AppError::Version(_))));
    }

    #[test]
    fn test_desktop_only_with_new_host_conflicts() {
        let (registry, vcs) = states(&[], &[]);
        let compatibility = Compatibility::new(
            vec![Edition::Desktop],
            Some(BoundVersion::parse("7.2").unwrap()),
        );
        let config = ReleaseConfig::default();
        let pr = event(&["minor"], true, true);
        let ctx = ReleaseContext {
            registry: &registry,
            vcs: &vcs,
            manifest_version: None,
            event: &pr,
            config: &config,
            compatibility: &compatibility,
            now: Utc::now(),
        };
        assert!(matches!(resolve(&ctx), Err(AppError::ConfigConflict(_))));
    }

    #[test]
    fn test_cleanup_targets() {
        let releases = vec![
            VcsRelease::new("v1.3.0", false),
            VcsRelease::new("v1.3.0-featurefoobar001", true),
            VcsRelease::new("v1.4.0-FeatureFooBar20240517", true),
            VcsRelease::new("v1.3.0-other001", true),
        ];
        assert_eq!(
            cleanup_targets(&releases, "featurefoobar"),
            vec![
                "v1.3.0-featurefoobar001".to_string(),
                "v1.4.0-FeatureFooBar20240517".to_string()
            ]
        );
    }

    #[test]
    fn test_cleanup_targets_skip_longer_branch_names() {
        let releases = vec![
            VcsRelease::new("v1.3.0-featurefoobar001", true),
            VcsRelease::new("v1.3.0-feature001", true),
            VcsRelease::new("v1.3.0-feature", true),
            VcsRelease::new("v1.3.0-featurex20240517", true),
        ];
        assert_eq!(
            cleanup_targets(&releases, "feature"),
            vec!["v1.3.0-feature001".to_string(), "v1.3.0-feature".to_string()]
        );
    }
}

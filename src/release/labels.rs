//! Pull-request label classification

use crate::config::ReleaseConfig;
use crate::domain::BumpKind;
use serde::Serialize;

/// Why a bump kind was chosen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "label", rename_all = "snake_case")]
pub enum BumpSource {
    /// A configured label matched
    Label(String),
    /// No label matched and automatic patching is on
    AutoPatch,
}

/// Result of classifying a label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelClass {
    /// An ignore label is present; nothing else matters
    Ignore(String),
    Bump { kind: BumpKind, source: BumpSource },
    /// No bump label and automatic patching is off
    NoMatch,
}

fn find<'a>(labels: &'a [String], set: &[String]) -> Option<&'a String> {
    labels
        .iter()
        .find(|label| set.iter().any(|s| s.eq_ignore_ascii_case(label)))
}

/// Classify labels with priority ignore > major > minor > patch > auto-patch
pub fn classify(labels: &[String], config: &ReleaseConfig) -> LabelClass {
    if let Some(label) = find(labels, &config.ignore_labels) {
        return LabelClass::Ignore(label.clone());
    }

    let ranked = [
        (BumpKind::Major, &config.major_labels),
        (BumpKind::Minor, &config.minor_labels),
        (BumpKind::Patch, &config.patch_labels),
    ];
    for (kind, set) in ranked {
        if let Some(label) = find(labels, set) {
            return LabelClass::Bump {
                kind,
                source: BumpSource::Label(label.clone()),
            };
        }
    }

    if config.auto_patching {
        LabelClass::Bump {
            kind: BumpKind::Patch,
            source: BumpSource::AutoPatch,
        }
    } else {
        LabelClass::NoMatch
    }
}

//! Semantic version with a tag prefix
//!
//! Release tags look like `v1.2.3` or `v1.3.0-featurefoobar001`. The prefix
//! is carried along for rendering but never takes part in comparisons.

use crate::error::VersionParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which version component a release increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    /// Breaking change: major + 1, minor and patch reset
    Major,
    /// Feature: minor + 1, patch reset
    Minor,
    /// Fix: patch + 1
    Patch,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
        };
        write!(f, "{}", label)
    }
}

/// A semantic version with an optional tag prefix (e.g. `v`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemVer {
    pub prefix: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: String,
}

impl SemVer {
    /// Create a release version without prefix
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            prefix: String::new(),
            major,
            minor,
            patch,
            prerelease: String::new(),
        }
    }

    /// The `0.0.0` sentinel used when a channel knows no release
    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Parse a version or tag.
    ///
    /// Everything before the first ASCII digit is the prefix. Missing minor
    /// and patch components are treated as zero (`v2` is `v2.0.0`). Build
    /// metadata is accepted and dropped.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let trimmed = input.trim();
        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| VersionParseError::new(input, "no numeric component"))?;
        let (prefix, rest) = trimmed.split_at(split);

        let parsed = semver::Version::parse(rest)
            .or_else(|_| semver::Version::parse(&pad_core(rest)))
            .map_err(|e| VersionParseError::new(input, e.to_string()))?;

        Ok(Self {
            prefix: prefix.to_string(),
            major: parsed.major,
            minor: parsed.minor,
            patch: parsed.patch,
            prerelease: parsed.pre.as_str().to_string(),
        })
    }

    /// Set the tag prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the prerelease identifier
    pub fn with_prerelease(mut self, prerelease: impl Into<String>) -> Self {
        self.prerelease = prerelease.into();
        self
    }

    /// True when a prerelease identifier is set
    pub fn is_prerelease(&self) -> bool {
        !self.prerelease.is_empty()
    }

    /// The numeric triple used for ordering
    pub fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// `major.minor.patch` without prefix or prerelease
    pub fn core_string(&self) -> String {
        format!("{}.{}.{}", self.major, self.minor, self.patch)
    }

    /// The version without its prefix (`1.2.3-beta001`)
    pub fn version_string(&self) -> String {
        if self.prerelease.is_empty() {
            self.core_string()
        } else {
            format!("{}-{}", self.core_string(), self.prerelease)
        }
    }

    /// Apply one bump in place; any prerelease identifier is cleared.
    ///
    /// Fails without touching `self` when the bumped component would overflow.
    pub fn bump(&mut self, kind: BumpKind) -> Result<(), VersionParseError> {
        let component = match kind {
            BumpKind::Major => self.major,
            BumpKind::Minor => self.minor,
            BumpKind::Patch => self.patch,
        };
        let bumped = component.checked_add(1).ok_or_else(|| {
            VersionParseError::new(self.version_string(), format!("{} component overflows", kind))
        })?;
        match kind {
            BumpKind::Major => {
                self.major = bumped;
                self.minor = 0;
                self.patch = 0;
            }
            BumpKind::Minor => {
                self.minor = bumped;
                self.patch = 0;
            }
            BumpKind::Patch => {
                self.patch = bumped;
            }
        }
        self.prerelease.clear();
        Ok(())
    }
}

/// `1.2` -> `1.2.0`, `3` -> `3.0.0`, keeping any `-pre`/`+build` tail
fn pad_core(rest: &str) -> String {
    let tail_at = rest.find(['-', '+']).unwrap_or(rest.len());
    let (core, tail) = rest.split_at(tail_at);
    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    format!("{}{}", parts.join("."), tail)
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match (semver::Prerelease::new(a), semver::Prerelease::new(b)) {
            (Ok(pa), Ok(pb)) => pa.cmp(&pb),
            _ => a.cmp(b),
        },
    }
}

impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core()
            .cmp(&other.core())
            .then_with(|| compare_prerelease(&self.prerelease, &other.prerelease))
    }
}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemVer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemVer {}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix, self.version_string())
    }
}

impl std::str::FromStr for SemVer {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SemVer::parse(s)
    }
}

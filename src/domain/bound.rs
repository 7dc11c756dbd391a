//! Dependency bound versions and version bounds
//!
//! Module versions in `#Requires` directives and manifests are dotted
//! numeric versions with one to four components (`5.1`, `1.0.0`,
//! `1.0.0.12`). They compare numerically with implicit zero padding, so
//! `1.0 == 1.0.0`. The raw text is kept so it can be written back unchanged.

use crate::dependency::range;
use crate::error::VersionParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Maximum number of dotted components
const MAX_COMPONENTS: usize = 4;

/// A dotted numeric version used as a dependency bound
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoundVersion {
    raw: String,
    parts: Vec<u64>,
}

impl BoundVersion {
    /// Parse a dotted numeric version
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(VersionParseError::new(input, "empty version"));
        }

        let parts = raw
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionParseError::new(input, "components must be numeric"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if parts.len() > MAX_COMPONENTS {
            return Err(VersionParseError::new(
                input,
                format!("at most {} components allowed", MAX_COMPONENTS),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// The version as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn component(&self, index: usize) -> u64 {
        self.parts.get(index).copied().unwrap_or(0)
    }

    /// Total order that also separates equal versions spelled differently.
    ///
    /// Used wherever a single representative must be picked regardless of
    /// input order.
    pub fn cmp_canonical(&self, other: &Self) -> Ordering {
        self.cmp(other).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl Ord for BoundVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (0..MAX_COMPONENTS)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for BoundVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for BoundVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for BoundVersion {}

impl fmt::Display for BoundVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl TryFrom<String> for BoundVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BoundVersion::parse(&value)
    }
}

impl From<BoundVersion> for String {
    fn from(value: BoundVersion) -> Self {
        value.raw
    }
}

impl std::str::FromStr for BoundVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BoundVersion::parse(s)
    }
}

/// The constraint one dependency places on acceptable versions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionBound {
    /// Any version
    Unconstrained,
    /// Exactly this version
    Exact { version: BoundVersion },
    /// This version or newer
    Minimum { version: BoundVersion },
    /// This version or older
    Maximum { version: BoundVersion },
    /// Inclusive range
    Between {
        minimum: BoundVersion,
        maximum: BoundVersion,
    },
}

impl VersionBound {
    /// Build a bound from optional parts; `exact` wins over the other two
    pub fn from_parts(
        minimum: Option<BoundVersion>,
        maximum: Option<BoundVersion>,
        exact: Option<BoundVersion>,
    ) -> Self {
        match (exact, minimum, maximum) {
            (Some(version), _, _) => VersionBound::Exact { version },
            (None, Some(minimum), Some(maximum)) => VersionBound::Between { minimum, maximum },
            (None, Some(version), None) => VersionBound::Minimum { version },
            (None, None, Some(version)) => VersionBound::Maximum { version },
            (None, None, None) => VersionBound::Unconstrained,
        }
    }

    /// True when no bound applies
    pub fn is_unconstrained(&self) -> bool {
        matches!(self, VersionBound::Unconstrained)
    }

    /// Canonical range expression understood by the install mechanism
    pub fn range_expression(&self) -> Option<String> {
        match self {
            VersionBound::Unconstrained => None,
            VersionBound::Exact { version } => range::convert(None, None, Some(version.as_str())),
            VersionBound::Minimum { version } => range::convert(Some(version.as_str()), None, None),
            VersionBound::Maximum { version } => range::convert(None, Some(version.as_str()), None),
            VersionBound::Between { minimum, maximum } => {
                range::convert(Some(minimum.as_str()), Some(maximum.as_str()), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(s: &str) -> BoundVersion {
        BoundVersion::parse(s).unwrap()
    }

    #[test]
    fn test_parse_components() {
        assert_eq!(b("5.1").as_str(), "5.1");
        assert_eq!(b(" 1.0.0.12 ").as_str(), "1.0.0.12");
        assert!(BoundVersion::parse("").is_err());
        assert!(BoundVersion::parse("1.x").is_err());
        assert!(BoundVersion::parse("1.2.3.4.5").is_err());
        assert!(BoundVersion::parse("1.0.0-beta").is_err());
    }

    #[test]
    fn test_zero_padding_equality() {
        assert_eq!(b("1.0"), b("1.0.0"));
        assert_eq!(b("2"), b("2.0.0.0"));
        assert_ne!(b("1.0.1"), b("1.0"));
    }

    #[test]
    fn test_numeric_ordering() {
        assert!(b("1.10.0") > b("1.9.0"));
        assert!(b("5.1") < b("7.0"));
        assert!(b("1.0.0.1") > b("1.0"));
    }

    #[test]
    fn test_canonical_order_breaks_spelling_ties() {
        assert_eq!(b("1.0").cmp_canonical(&b("1.0.0")), Ordering::Less);
        assert_eq!(b("1.0.0").cmp_canonical(&b("1.0")), Ordering::Greater);
    }

    #[test]
    fn test_from_parts_exact_wins() {
        let bound = VersionBound::from_parts(Some(b("1.0")), Some(b("3.0")), Some(b("2.0")));
        assert_eq!(bound, VersionBound::Exact { version: b("2.0") });
    }

    #[test]
    fn test_from_parts_variants() {
        assert!(VersionBound::from_parts(None, None, None).is_unconstrained());
        assert_eq!(
            VersionBound::from_parts(Some(b("1.0")), None, None),
            VersionBound::Minimum { version: b("1.0") }
        );
        assert_eq!(
            VersionBound::from_parts(None, Some(b("2.0")), None),
            VersionBound::Maximum { version: b("2.0") }
        );
    }

    #[test]
    fn test_range_expression() {
        let bound = VersionBound::from_parts(Some(b("1.0")), Some(b("2.0")), None);
        assert_eq!(bound.range_expression().as_deref(), Some("[1.0,2.0]"));
        assert_eq!(VersionBound::Unconstrained.range_expression(), None);
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&b("1.2.3")).unwrap();
        assert_eq!(json, "\"1.2.3\"");
        let parsed: BoundVersion = serde_json::from_str("\"4.5\"").unwrap();
        assert_eq!(parsed.as_str(), "4.5");
        assert!(serde_json::from_str::<BoundVersion>("\"x\"").is_err());
    }
}

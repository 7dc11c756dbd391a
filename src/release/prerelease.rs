//! Prerelease identifiers and sequence numbers

use super::gather::ChannelState;
use crate::domain::SemVer;
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Trigger label for prerelease builds of open pull requests
pub const PRERELEASE_LABEL: &str = "prerelease";

/// Width of the zero-padded sequence number
const NUMBER_WIDTH: usize = 3;

fn sanitize(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The branch part of an identifier: `feature/Foo-Bar!` -> `featurefoobar`
pub fn branch_identifier(branch: &str) -> String {
    let id = sanitize(branch);
    if id.is_empty() {
        PRERELEASE_LABEL.to_string()
    } else {
        id
    }
}

/// Branch identifier with the formatted date appended when `date_format` is set
pub fn identifier(
    branch: &str,
    date_format: &str,
    now: DateTime<Utc>,
) -> Result<String, ConfigError> {
    let mut id = branch_identifier(branch);
    if !date_format.is_empty() {
        let mut stamp = String::new();
        write!(stamp, "{}", now.format(date_format)).map_err(|_| ConfigError::InvalidValue {
            key: "date_prerelease_format".to_string(),
            value: date_format.to_string(),
            message: "not a valid strftime format".to_string(),
        })?;
        id.push_str(&sanitize(&stamp));
    }
    Ok(id)
}

/// What follows `identifier` in `prerelease`, ignoring ASCII case
fn tail<'a>(prerelease: &'a str, identifier: &str) -> Option<&'a str> {
    let head = prerelease.get(..identifier.len())?;
    head.eq_ignore_ascii_case(identifier)
        .then(|| &prerelease[identifier.len()..])
}

/// Whether `prerelease` was built from the branch `identifier`.
///
/// The identifier must be followed by nothing or by a digit, so `feature`
/// does not claim `featurefoobar001`.
pub fn belongs_to(prerelease: &str, identifier: &str) -> bool {
    tail(prerelease, identifier)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Sequence number of `prerelease` if it is `identifier` followed by digits
fn sequence_number(prerelease: &str, identifier: &str) -> Option<u64> {
    let rest = tail(prerelease, identifier)?;
    if rest.is_empty() || !rest.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}

/// Highest sequence number one channel holds for `core` and `identifier`
pub fn highest_number(state: &ChannelState, core: &SemVer, identifier: &str) -> Option<u64> {
    state
        .prereleases
        .iter()
        .filter(|v| v.core() == core.core())
        .filter_map(|v| sequence_number(&v.prerelease, identifier))
        .max()
}

/// Next sequence number: the maximum over all channels plus one.
///
/// Each channel is filtered on its own and only the maxima are combined.
pub fn next_number(channels: &[&ChannelState], core: &SemVer, identifier: &str) -> u64 {
    channels
        .iter()
        .filter_map(|state| highest_number(state, core, identifier))
        .max()
        .map_or(1, |n| n + 1)
}

/// `identifier` with the zero-padded sequence number appended
pub fn numbered(identifier: &str, number: u64) -> String {
    format!("{}{:0width$}", identifier, number, width = NUMBER_WIDTH)
}

//! Conversion of legacy bound parameters into one range expression
//!
//! Interval notation as understood by the module installer:
//! - `[1.0]`       exactly 1.0
//! - `[1.0,2.0]`   1.0 ≤ v ≤ 2.0
//! - `[1.0,)`      1.0 ≤ v
//! - `(,2.0]`      v ≤ 2.0

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Convert minimum/maximum/exact parameters into a range expression.
///
/// `exact` takes precedence over the other two. Empty strings count as
/// absent. Returns `None` when nothing constrains the version.
pub fn convert(
    minimum: Option<&str>,
    maximum: Option<&str>,
    exact: Option<&str>,
) -> Option<String> {
    if let Some(exact) = present(exact) {
        return Some(format!("[{}]", exact));
    }

    match (present(minimum), present(maximum)) {
        (Some(min), Some(max)) => Some(format!("[{},{}]", min, max)),
        (Some(min), None) => Some(format!("[{},)", min)),
        (None, Some(max)) => Some(format!("(,{}]", max)),
        (None, None) => None,
    }
}

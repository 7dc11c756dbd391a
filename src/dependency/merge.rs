//! Merging of repeated dependency declarations
//!
//! Declarations are grouped by exact (case-sensitive) module name. Each
//! group collapses into one [`DependencySpec`]:
//! - at most one distinct required version,
//! - the highest declared minimum,
//! - the lowest declared maximum,
//!
//! and the result is validated so contradictory bounds never reach the
//! install step or the manifest.

use crate::domain::{BoundVersion, DeclKind, DependencySpec};
use crate::error::ConflictError;
use std::collections::HashMap;

/// Merge declarations into one spec per module name.
///
/// Output order is the order in which each name was first declared.
pub fn merge<'a, I>(declarations: I) -> Result<Vec<DependencySpec>, ConflictError>
where
    I: IntoIterator<Item = &'a DeclKind>,
{
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&DeclKind>> = HashMap::new();

    for decl in declarations {
        let name = decl.module_name();
        groups
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(decl);
    }

    order
        .into_iter()
        .map(|name| merge_group(name, &groups[name]))
        .collect()
}

fn merge_group(name: &str, group: &[&DeclKind]) -> Result<DependencySpec, ConflictError> {
    let bounds: Vec<_> = group.iter().filter_map(|decl| decl.bounds()).collect();

    let mut exacts: Vec<&BoundVersion> = bounds.iter().filter_map(|b| b.exact.as_ref()).collect();
    exacts.sort_by(|a, b| a.cmp_canonical(b));
    exacts.dedup_by(|later, earlier| later == earlier);
    if exacts.len() > 1 {
        return Err(ConflictError::MultipleRequired {
            name: name.to_string(),
            versions: exacts
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    let exact = exacts.first().map(|v| (*v).clone());

    let minimum = bounds
        .iter()
        .filter_map(|b| b.minimum.as_ref())
        .max_by(|a, b| a.cmp_canonical(b))
        .cloned();
    let maximum = bounds
        .iter()
        .filter_map(|b| b.maximum.as_ref())
        .min_by(|a, b| a.cmp_canonical(b))
        .cloned();

    if let (Some(exact), Some(minimum)) = (&exact, &minimum) {
        if exact < minimum {
            return Err(ConflictError::MinimumExceedsRequired {
                name: name.to_string(),
                minimum: minimum.to_string(),
                required: exact.to_string(),
            });
        }
    }
    if let (Some(minimum), Some(maximum)) = (&minimum, &maximum) {
        if minimum > maximum {
            return Err(ConflictError::MinimumExceedsMaximum {
                name: name.to_string(),
                minimum: minimum.to_string(),
                maximum: maximum.to_string(),
            });
        }
    }
    if let (Some(exact), Some(maximum)) = (&exact, &maximum) {
        if exact > maximum {
            return Err(ConflictError::RequiredExceedsMaximum {
                name: name.to_string(),
                required: exact.to_string(),
                maximum: maximum.to_string(),
            });
        }
    }

    Ok(DependencySpec {
        name: name.to_string(),
        exact,
        minimum,
        maximum,
    })
}

//! Composite, set-aware derivations.
//!
//! These cannot be computed per cell: they read the whole in-progress
//! record set and run as a second pass, after every per-cell rule.

pub mod baseline;
pub mod sequence;
pub mod studyday;

use std::cmp::Ordering;

/// Order two collected values: numerically when both parse as numbers,
/// otherwise as strings. Canonical ISO dates order correctly as strings.
pub(crate) fn value_order(left: &str, right: &str) -> Ordering {
    match (left.trim().parse::<f64>(), right.trim().parse::<f64>()) {
        (Ok(l), Ok(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => left.cmp(right),
    }
}

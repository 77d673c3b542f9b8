//! Study day offset from a reference date.
//!
//! Day 1 is the reference date itself; days before it are negative.
//! There is no day 0: the value jumps from -1 to 1 across the reference.

use chrono::NaiveDate;
use sdtm_expr::complete_date;

/// Study day for an event date against a reference date.
pub fn study_day(event: NaiveDate, reference: NaiveDate) -> i64 {
    let days = (event - reference).num_days();
    if days >= 0 { days + 1 } else { days }
}

/// Study day from canonical date strings.
///
/// Empty when either value is missing, partial, or not a canonical date;
/// both sides need day precision for the offset to mean anything.
pub fn study_day_from_strings(event: &str, reference: &str) -> Option<i64> {
    let event = complete_date(event)?;
    let reference = complete_date(reference)?;
    Some(study_day(event, reference))
}

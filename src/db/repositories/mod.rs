pub mod sessions;
pub mod stats;

use crate::models::DateRange;

use super::helpers::format_datetime;

/// Stored-text bounds for `range`; `None` on both sides for an unbounded range.
/// Queries filter with `(?1 IS NULL OR timestamp >= ?1) AND (?2 IS NULL OR timestamp <= ?2)`.
pub(crate) fn range_params(range: &DateRange) -> (Option<String>, Option<String>) {
    match range.bounds() {
        Some((start, end)) => (Some(format_datetime(&start)), Some(format_datetime(&end))),
        None => (None, None),
    }
}

pub(crate) const RANGE_FILTER: &str =
    "(?1 IS NULL OR timestamp >= ?1) AND (?2 IS NULL OR timestamp <= ?2)";

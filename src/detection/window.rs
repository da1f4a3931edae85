//! Forward and lookback distance checks between chain links.
//!
//! Distances count trading-day bars on the series with both endpoints
//! included, so adjacent bars are 2 apart. A bound left at `None` is
//! unconstrained.

use chrono::NaiveDate;

use crate::{series::Series, BlockDetection};

#[inline]
fn within(distance: usize, min: Option<usize>, max: Option<usize>) -> bool {
    min.map_or(true, |min| distance >= min) && max.map_or(true, |max| distance <= max)
}

/// Bars from the predecessor's start to the candidate, both included, must
/// lie in `[min, max]`. Fails when either date is absent or the candidate precedes
/// the predecessor.
pub fn check_forward(
    series: &Series,
    predecessor_start: NaiveDate,
    candidate: NaiveDate,
    min: Option<usize>,
    max: Option<usize>,
) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    series
        .span_len(predecessor_start, candidate)
        .is_some_and(|distance| within(distance, min, max))
}

/// Looking back from the candidate, the inclusive bar count to the
/// predecessor's start must lie in `[min, max]`. An absent predecessor passes.
pub fn check_lookback(
    series: &Series,
    candidate: NaiveDate,
    predecessor_start: Option<NaiveDate>,
    min: Option<usize>,
    max: Option<usize>,
) -> bool {
    let Some(start) = predecessor_start else {
        return true;
    };
    if min.is_none() && max.is_none() {
        return true;
    }
    series
        .span_len(start, candidate)
        .is_some_and(|count| within(count, min, max))
}

/// [`check_lookback`] against a finalized block.
pub fn check_lookback_block(
    series: &Series,
    candidate: NaiveDate,
    predecessor: Option<&BlockDetection>,
    min: Option<usize>,
    max: Option<usize>,
) -> bool {
    check_lookback(series, candidate, predecessor.map(|p| p.started_at), min, max)
}

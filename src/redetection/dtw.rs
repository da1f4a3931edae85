//! Dynamic time warping distance.

use crate::{BlockError, Result};

/// DTW distance between two sequences with absolute-difference cost,
/// divided by the longer length so it reads as a mean per-step deviation.
///
/// Runs the standard O(m·n) recurrence keeping two rows.
///
/// # Errors
/// `Validation` on an empty or non-finite input.
pub fn dtw_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.is_empty() || b.is_empty() {
        return Err(BlockError::Validation("DTW of an empty sequence".into()));
    }
    if a.iter().chain(b).any(|v| !v.is_finite()) {
        return Err(BlockError::Validation("DTW of a non-finite value".into()));
    }

    let m = b.len();
    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for &x in a {
        curr[0] = f64::INFINITY;
        for (j, &y) in b.iter().enumerate() {
            let best = prev[j].min(prev[j + 1]).min(curr[j]);
            curr[j + 1] = (x - y).abs() + best;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    Ok(prev[m] / a.len().max(m) as f64)
}

//! Common price predicates shared by the entry/exit evaluator.

use crate::OHLCV;

/// Percent change from `from` to `to`. None if `from` is not positive.
#[inline]
pub fn pct_change(from: f64, to: f64) -> Option<f64> {
    (from > f64::EPSILON).then(|| (to - from) / from * 100.0)
}

/// `value` scaled by `percent` / 100.
#[inline]
pub fn percent_of(value: f64, percent: f64) -> f64 {
    value * percent / 100.0
}

/// Bearish engulfing: a black candle whose body engulfs the previous white
/// candle's body. At most one end of the bodies may coincide.
#[inline]
pub fn is_bearish_engulfing<T: OHLCV>(prev: &T, curr: &T) -> bool {
    // close >= open counts as white
    let prev_white = prev.close() >= prev.open();
    let curr_black = curr.close() < curr.open();
    if !(prev_white && curr_black) {
        return false;
    }
    let case_a = curr.open() >= prev.close() && curr.close() < prev.open();
    let case_b = curr.open() > prev.close() && curr.close() <= prev.open();
    case_a || case_b
}

//! Read-only cursor over one ticker's daily bars.
//!
//! All distances in this crate are counted in bars of a [`Series`], never in
//! calendar days: non-trading days are simply absent from the data.

use chrono::NaiveDate;

use crate::{detection::helpers::pct_change, Bar, BlockError, OHLCVExt, Result, OHLCV};

/// Ordered trading-day bars for a single ticker.
#[derive(Debug, Clone)]
pub struct Series {
    ticker: String,
    bars: Vec<Bar>,
}

impl Series {
    /// Create a series. Dates must be strictly increasing.
    pub fn new(ticker: impl Into<String>, bars: Vec<Bar>) -> Result<Self> {
        for (i, pair) in bars.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(BlockError::InvalidBar {
                    index: i + 1,
                    reason: "dates not strictly increasing",
                });
            }
        }
        Ok(Self {
            ticker: ticker.into(),
            bars,
        })
    }

    /// Check every bar for OHLCV consistency.
    pub fn validate(&self) -> Result<()> {
        for (i, bar) in self.bars.iter().enumerate() {
            bar.validate().map_err(|e| match e {
                BlockError::InvalidBar { reason, .. } => BlockError::InvalidBar { index: i, reason },
                other => other,
            })?;
        }
        Ok(())
    }

    #[inline]
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    #[inline]
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    #[inline]
    pub fn date_at(&self, index: usize) -> Option<NaiveDate> {
        self.bars.get(index).map(|b| b.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Position of `date` in the series, if it is a trading day of it.
    pub fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.bars.binary_search_by(|b| b.date.cmp(&date)).ok()
    }

    /// Like [`index_of`](Self::index_of) but fails with `UnknownDate`.
    pub fn require_index(&self, date: NaiveDate) -> Result<usize> {
        self.index_of(date).ok_or(BlockError::UnknownDate(date))
    }

    /// Bars elapsed from `from` to `to`: the later endpoint is counted, the
    /// earlier one is not, so consecutive trading days are 1 apart.
    ///
    /// `None` when either date is missing or `to` precedes `from`.
    pub fn candles_between(&self, from: NaiveDate, to: NaiveDate) -> Option<usize> {
        let a = self.index_of(from)?;
        let b = self.index_of(to)?;
        b.checked_sub(a)
    }

    /// Trading day immediately before `date`.
    pub fn previous_trading_day(&self, date: NaiveDate) -> Option<NaiveDate> {
        let index = self.index_of(date)?;
        index.checked_sub(1).and_then(|i| self.date_at(i))
    }

    /// Number of bars from `start` to `end`, both included.
    pub fn span_len(&self, start: NaiveDate, end: NaiveDate) -> Option<usize> {
        self.candles_between(start, end).map(|n| n + 1)
    }

    /// Rolling view anchored at `index`.
    pub fn context_at(&self, index: usize) -> RollingContext<'_> {
        debug_assert!(index < self.bars.len());
        RollingContext {
            series: self,
            index,
        }
    }
}

// ============================================================
// ROLLING CONTEXT
// ============================================================

/// Moving averages and historical extremes as seen from one bar.
///
/// Windows that reach before the first bar fail with `InsufficientData`.
#[derive(Debug, Clone, Copy)]
pub struct RollingContext<'a> {
    series: &'a Series,
    index: usize,
}

impl<'a> RollingContext<'a> {
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn series(&self) -> &'a Series {
        self.series
    }

    #[inline]
    pub fn bar(&self) -> &'a Bar {
        &self.series.bars[self.index]
    }

    /// The bar before the current one.
    #[inline]
    pub fn previous(&self) -> Option<&'a Bar> {
        self.index.checked_sub(1).map(|i| &self.series.bars[i])
    }

    fn insufficient(&self, need: usize) -> BlockError {
        BlockError::InsufficientData {
            index: self.index,
            need,
            got: self.index + 1,
        }
    }

    /// Simple moving average of closes over `period` bars ending at the
    /// current bar (inclusive).
    pub fn sma_close(&self, period: usize) -> Result<f64> {
        if period == 0 || self.index + 1 < period {
            return Err(self.insufficient(period));
        }
        let start = self.index + 1 - period;
        let sum: f64 = self.series.bars[start..=self.index]
            .iter()
            .map(|b| b.close())
            .sum();
        Ok(sum / period as f64)
    }

    /// Highest high over the `days` bars before the current one.
    pub fn prior_max_high(&self, days: usize) -> Result<f64> {
        self.prior_max(days, |b| b.high())
    }

    /// Highest volume over the `days` bars before the current one.
    pub fn prior_max_volume(&self, days: usize) -> Result<f64> {
        self.prior_max(days, |b| b.volume())
    }

    fn prior_max(&self, days: usize, value: impl Fn(&Bar) -> f64) -> Result<f64> {
        if days == 0 || self.index < days {
            return Err(self.insufficient(days + 1));
        }
        let start = self.index - days;
        Ok(self.series.bars[start..self.index]
            .iter()
            .map(value)
            .fold(f64::NEG_INFINITY, f64::max))
    }

    /// Percent change of the close versus the previous close.
    pub fn close_change_pct(&self) -> Result<f64> {
        let prev = self.previous().ok_or_else(|| self.insufficient(2))?;
        pct_change(prev.close(), self.bar().close()).ok_or_else(|| self.insufficient(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    fn ramp(n: usize) -> Series {
        series_from((0..n).map(|i| flat(i, 100.0 + i as f64)).collect())
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let bars = vec![flat(1, 100.0), flat(0, 100.0)];
        assert!(matches!(
            Series::new("X", bars),
            Err(BlockError::InvalidBar { index: 1, .. })
        ));
        let dup = vec![flat(0, 100.0), flat(0, 100.0)];
        assert!(Series::new("X", dup).is_err());
    }

    #[test]
    fn test_candles_between() {
        let s = ramp(10);
        assert_eq!(s.candles_between(day(2), day(7)), Some(5));
        assert_eq!(s.candles_between(day(7), day(7)), Some(0));
        assert_eq!(s.candles_between(day(7), day(2)), None);
        assert_eq!(s.candles_between(day(2), day(40)), None);
        assert_eq!(s.span_len(day(2), day(7)), Some(6));
    }

    #[test]
    fn test_gaps_in_calendar_are_not_counted() {
        // Every other calendar day is a trading day.
        let bars: Vec<Bar> = (0..6).map(|i| flat(i * 2, 100.0)).collect();
        let s = series_from(bars);
        assert_eq!(s.candles_between(day(0), day(10)), Some(5));
        assert_eq!(s.previous_trading_day(day(4)), Some(day(2)));
        assert_eq!(s.previous_trading_day(day(0)), None);
        assert_eq!(s.index_of(day(3)), None);
        assert_eq!(s.require_index(day(3)), Err(BlockError::UnknownDate(day(3))));
    }

    #[test]
    fn test_sma_close() {
        let s = ramp(10);
        let ctx = s.context_at(4);
        assert!((ctx.sma_close(5).unwrap() - 102.0).abs() < 1e-9);
        assert!(matches!(
            ctx.sma_close(6),
            Err(BlockError::InsufficientData { index: 4, need: 6, got: 5 })
        ));
    }

    #[test]
    fn test_prior_extremes_exclude_current_bar() {
        let s = ramp(10);
        let ctx = s.context_at(5);
        assert_eq!(ctx.prior_max_high(3).unwrap(), 104.5);
        assert_eq!(ctx.prior_max_volume(5).unwrap(), 1_000.0);
        assert!(ctx.prior_max_high(6).is_err());
    }

    #[test]
    fn test_close_change_pct() {
        let s = series_from(vec![flat(0, 100.0), flat(1, 110.0)]);
        assert!((s.context_at(1).close_change_pct().unwrap() - 10.0).abs() < 1e-9);
        assert!(s.context_at(0).close_change_pct().is_err());
    }
}

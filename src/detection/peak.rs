//! Running peak of an open block.

use crate::{series::Series, Bar, BlockDetection, BlockId, BlockLevel, ExitReason, OHLCV};

/// Running max high / max volume since the block opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakState {
    pub peak_price: f64,
    pub peak_volume: f64,
    /// Bar index of the price peak (first occurrence).
    pub peak_index: usize,
}

impl PeakState {
    pub fn open<T: OHLCV>(index: usize, bar: &T) -> Self {
        Self {
            peak_price: bar.high(),
            peak_volume: bar.volume(),
            peak_index: index,
        }
    }

    /// Fold one more bar in. Never shrinks.
    #[must_use]
    pub fn update<T: OHLCV>(self, index: usize, bar: &T) -> Self {
        let (peak_price, peak_index) = if bar.high() > self.peak_price {
            (bar.high(), index)
        } else {
            (self.peak_price, self.peak_index)
        };
        let next = Self {
            peak_price,
            peak_volume: self.peak_volume.max(bar.volume()),
            peak_index,
        };
        debug_assert!(next.peak_price >= self.peak_price && next.peak_volume >= self.peak_volume);
        next
    }
}

/// A block between its entry bar and finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenBlock {
    pub id: BlockId,
    pub level: BlockLevel,
    pub start_index: usize,
    /// Copy of the entry bar.
    pub entry: Bar,
    pub peak: PeakState,
    pub predecessor: Option<BlockId>,
}

impl OpenBlock {
    pub fn open(
        id: BlockId,
        level: BlockLevel,
        index: usize,
        bar: &Bar,
        predecessor: Option<BlockId>,
    ) -> Self {
        Self {
            id,
            level,
            start_index: index,
            entry: *bar,
            peak: PeakState::open(index, bar),
            predecessor,
        }
    }

    /// Update the peak with the bar at `index`.
    pub fn track(&mut self, index: usize, bar: &Bar) {
        debug_assert!(index > self.start_index);
        self.peak = self.peak.update(index, bar);
    }

    /// Freeze into a record ending at `end_index`.
    pub fn finalize(self, series: &Series, end_index: usize, exit_reason: ExitReason) -> BlockDetection {
        debug_assert!(end_index >= self.start_index);
        let bars = series.bars();
        BlockDetection {
            id: self.id,
            ticker: series.ticker().to_string(),
            level: self.level,
            started_at: self.entry.date,
            ended_at: bars[end_index].date,
            peak_price: self.peak.peak_price,
            peak_volume: self.peak.peak_volume,
            peak_date: bars[self.peak.peak_index].date,
            entry_close: self.entry.close,
            entry_volume: self.entry.volume,
            exit_reason,
            predecessor_id: self.predecessor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;

    #[test]
    fn test_update_is_monotonic() {
        let b0 = Bar::new(day(0), 10.0, 12.0, 9.0, 11.0, 500.0);
        let b1 = Bar::new(day(1), 11.0, 11.5, 10.0, 10.5, 800.0);
        let b2 = Bar::new(day(2), 10.5, 13.0, 10.0, 12.5, 100.0);

        let s0 = PeakState::open(0, &b0);
        let s1 = s0.update(1, &b1);
        assert_eq!(s1.peak_price, 12.0);
        assert_eq!(s1.peak_volume, 800.0);
        assert_eq!(s1.peak_index, 0);

        let s2 = s1.update(2, &b2);
        assert_eq!(s2.peak_price, 13.0);
        assert_eq!(s2.peak_volume, 800.0);
        assert_eq!(s2.peak_index, 2);
    }

    #[test]
    fn test_equal_high_keeps_first_peak() {
        let b0 = Bar::new(day(0), 10.0, 12.0, 9.0, 11.0, 1.0);
        let b1 = Bar::new(day(1), 10.0, 12.0, 9.0, 11.0, 1.0);
        assert_eq!(PeakState::open(0, &b0).update(1, &b1).peak_index, 0);
    }

    #[test]
    fn test_finalize() {
        let bars: Vec<Bar> = (0..5).map(|i| flat(i, 100.0 + i as f64)).collect();
        let series = series_from(bars);
        let mut block = OpenBlock::open(BlockId(7), BlockLevel::Block2, 1, &series.bars()[1], Some(BlockId(3)));
        for i in 2..=3 {
            block.track(i, &series.bars()[i]);
        }
        let record = block.finalize(&series, 3, ExitReason::MaBreak);
        assert_eq!(record.id, BlockId(7));
        assert_eq!(record.started_at, day(1));
        assert_eq!(record.ended_at, day(3));
        assert_eq!(record.peak_price, 103.5);
        assert_eq!(record.peak_date, day(3));
        assert_eq!(record.entry_close, 101.0);
        assert_eq!(record.predecessor_id, Some(BlockId(3)));
        assert_eq!(record.ticker, "TEST");
    }
}

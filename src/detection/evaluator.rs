//! Entry and exit predicates.
//!
//! Both evaluators are pure functions of the bar, its rolling context and
//! the level's [`BlockCondition`]. A threshold left at `None` is skipped.

use crate::{
    condition::BlockCondition, series::RollingContext, ExitReason, OHLCVExt, Result, OHLCV,
};

use super::{
    helpers::{is_bearish_engulfing, percent_of},
    peak::OpenBlock,
};

/// What an entry candidate needs to know about the block it would follow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Predecessor {
    pub start_index: usize,
    pub entry_volume: f64,
    pub peak_price: f64,
}

impl From<&OpenBlock> for Predecessor {
    fn from(block: &OpenBlock) -> Self {
        Self {
            start_index: block.start_index,
            entry_volume: block.entry.volume,
            peak_price: block.peak.peak_price,
        }
    }
}

/// Level-relational inputs of an entry check.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EntryLink {
    /// Block the candidate would attach to. `None` for Block1.
    pub predecessor: Option<Predecessor>,
    /// Bar index of the previous start of the candidate's level.
    pub last_start: Option<usize>,
}

/// True when every configured entry threshold holds at `ctx`.
///
/// # Errors
/// `InsufficientData` when a configured window reaches before the first bar.
/// Callers treat that as "not fired".
pub fn evaluate_entry(ctx: &RollingContext<'_>, condition: &BlockCondition, link: &EntryLink) -> Result<bool> {
    let bar = ctx.bar();

    if let (Some(min), Some(last)) = (condition.min_start_interval_days, link.last_start) {
        if ctx.index().saturating_sub(last) < min {
            return Ok(false);
        }
    }

    if let Some(rate) = condition.entry_surge_rate {
        if ctx.close_change_pct()? < rate {
            return Ok(false);
        }
    }

    if let Some(period) = condition.entry_ma_period {
        let ma = ctx.sma_close(period.get())?;
        if bar.close() < ma {
            return Ok(false);
        }
        if let Some(max_deviation) = condition.entry_max_deviation {
            if ma > 0.0 && bar.close() / ma * 100.0 > max_deviation {
                return Ok(false);
            }
        }
    }

    if let Some(min_value) = condition.min_trading_value {
        if bar.trading_value() < min_value {
            return Ok(false);
        }
    }

    if let Some(days) = condition.volume_high_days {
        if bar.volume() <= ctx.prior_max_volume(days.get())? {
            return Ok(false);
        }
    }

    if let Some(days) = condition.price_high_days {
        if bar.high() <= ctx.prior_max_high(days.get())? {
            return Ok(false);
        }
    }

    if let Some(pred) = link.predecessor {
        if let Some(ratio) = condition.volume_ratio {
            if bar.volume() < percent_of(pred.entry_volume, ratio) {
                return Ok(false);
            }
        }
        if let Some(margin) = condition.low_price_margin {
            if bar.low() < pred.peak_price - percent_of(pred.peak_price, margin) {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// First exit reason that holds at `ctx`, in fixed precedence:
/// moving-average break, bearish engulfing reversal, body midpoint breach.
///
/// An exit MA that needs more history than exists is skipped.
pub fn evaluate_exit(ctx: &RollingContext<'_>, open: &OpenBlock, condition: &BlockCondition) -> Option<ExitReason> {
    let bar = ctx.bar();

    if let Some(period) = condition.exit_ma_period {
        if let Ok(ma) = ctx.sma_close(period.get()) {
            if bar.close() < ma {
                return Some(ExitReason::MaBreak);
            }
        }
    }

    if condition.exit_on_reversal {
        if let Some(prev) = ctx.previous() {
            if is_bearish_engulfing(prev, bar) {
                return Some(ExitReason::Reversal);
            }
        }
    }

    if condition.exit_on_body_mid && bar.close() < open.entry.body_mid() {
        return Some(ExitReason::BodyMidBreach);
    }

    None
}

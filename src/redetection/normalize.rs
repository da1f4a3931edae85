//! Level-free shape of a chain.
//!
//! Each block's closes are divided by its entry close and its volumes by its
//! entry volume, so every sequence starts at 1.0. Lengths are kept as is.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{series::Series, Bar, BlockError, BlockLevel, Chain, Result, SeedId, OHLCV};

/// Normalized sequences of one block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockShape {
    pub level: BlockLevel,
    /// Bars from the chain's first bar to this block's first bar.
    pub offset: usize,
    pub prices: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl BlockShape {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Shape of a seed chain, read-only for the duration of a redetection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedShape {
    pub seed_id: SeedId,
    pub ticker: String,
    pub blocks: Vec<BlockShape>,
    /// Bars from the root's start to the chain's last end, inclusive.
    pub duration: usize,
}

/// Shape of `chain` as found in `series`.
///
/// # Errors
/// `UnknownDate` when a block date is not in `series`; `Validation` when the
/// series belongs to another ticker or an entry bar has no price or volume.
pub fn normalize(chain: &Chain, series: &Series) -> Result<SeedShape> {
    if chain.ticker != series.ticker() {
        return Err(BlockError::Validation(format!(
            "chain of {} normalized against {}",
            chain.ticker,
            series.ticker()
        )));
    }
    chain.check_structure()?;

    let (first, last) = chain.span();
    let root = series.require_index(first)?;
    let end = series.require_index(last)?;

    let mut blocks = Vec::with_capacity(chain.depth());
    for block in &chain.blocks {
        let start = series.require_index(block.started_at)?;
        let stop = series.require_index(block.ended_at)?;
        let offset = start
            .checked_sub(root)
            .ok_or_else(|| BlockError::Validation(format!("{} starts before the root", block.level)))?;
        let (prices, volumes) = normalize_segment(&series.bars()[start..=stop])?;
        blocks.push(BlockShape {
            level: block.level,
            offset,
            prices,
            volumes,
        });
    }

    Ok(SeedShape {
        seed_id: chain.seed_id(),
        ticker: chain.ticker.clone(),
        blocks,
        duration: end - root + 1,
    })
}

/// Split `len` bars from `start` into the seed's block layout, scaling each
/// block's offset and length by `len / duration` (rounded).
pub fn window_layout(start: usize, len: usize, seed: &SeedShape) -> Result<Vec<(BlockLevel, Range<usize>)>> {
    let duration = seed.duration;
    if duration == 0 || len == 0 {
        return Err(BlockError::Validation("empty window".into()));
    }
    let scale = |bars: usize| (bars * len + duration / 2) / duration;

    seed.blocks
        .iter()
        .map(|block| {
            let from = start + scale(block.offset);
            let to = (start + scale(block.offset + block.len())).min(start + len);
            if to <= from {
                return Err(BlockError::Validation(format!(
                    "{} collapses in a window of {len} bars",
                    block.level
                )));
            }
            Ok((block.level, from..to))
        })
        .collect()
}

/// Normalize the window `start..start + len` of `series` in the seed's
/// block layout.
pub fn normalize_window(series: &Series, start: usize, len: usize, seed: &SeedShape) -> Result<Vec<BlockShape>> {
    if start + len > series.len() {
        return Err(BlockError::Validation(format!(
            "window {start}+{len} past the end of {} bars",
            series.len()
        )));
    }
    window_layout(start, len, seed)?
        .into_iter()
        .map(|(level, range)| {
            let offset = range.start - start;
            let (prices, volumes) = normalize_segment(&series.bars()[range])?;
            Ok(BlockShape {
                level,
                offset,
                prices,
                volumes,
            })
        })
        .collect()
}

fn normalize_segment(bars: &[Bar]) -> Result<(Vec<f64>, Vec<f64>)> {
    let entry = bars
        .first()
        .ok_or_else(|| BlockError::Validation("empty segment".into()))?;
    if entry.close() <= 0.0 {
        return Err(BlockError::Validation(format!("non-positive entry close on {}", entry.date)));
    }
    if entry.volume() <= 0.0 {
        return Err(BlockError::Validation(format!("zero entry volume on {}", entry.date)));
    }
    let prices = bars.iter().map(|b| b.close() / entry.close()).collect();
    let volumes = bars.iter().map(|b| b.volume() / entry.volume()).collect();
    Ok((prices, volumes))
}

//! Similarity scoring and match selection.

use std::cmp::Ordering;

use tracing::{debug, info, trace};

use crate::{
    condition::{ConditionSet, ToleranceConfig},
    detection::{check_forward, check_lookback, evaluate_entry, EntryLink, OpenBlock, Predecessor},
    series::Series,
    BlockError, BlockId, BlockLevel, Chain, ExitReason, Provenance, Result,
};

use super::{
    dtw::dtw_distance,
    normalize::{normalize_window, window_layout, BlockShape, SeedShape},
};

/// Components of a candidate's similarity to the seed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub price_distance: f64,
    pub volume_distance: f64,
    pub timing_penalty: f64,
    /// In [0, 1], 1.0 for an identical shape.
    pub score: f64,
}

impl Similarity {
    /// Score threshold plus the per-dimension hard gates.
    pub fn passes(&self, tolerance: &ToleranceConfig) -> bool {
        self.score >= tolerance.min_similarity_score.get()
            && self.price_distance <= tolerance.price_range
            && self.volume_distance <= tolerance.volume_range
    }
}

/// Score a candidate of `len` bars, already normalized in the seed's block
/// layout. Per-block DTW distances are averaged weighted by the seed block
/// lengths.
pub fn score_shapes(
    seed: &SeedShape,
    candidate: &[BlockShape],
    len: usize,
    tolerance: &ToleranceConfig,
) -> Result<Similarity> {
    if candidate.len() != seed.blocks.len() {
        return Err(BlockError::Validation(format!(
            "candidate has {} blocks, seed has {}",
            candidate.len(),
            seed.blocks.len()
        )));
    }

    let (mut price_sum, mut volume_sum, mut weight) = (0.0, 0.0, 0.0);
    for (s, c) in seed.blocks.iter().zip(candidate) {
        let w = s.len() as f64;
        price_sum += w * dtw_distance(&s.prices, &c.prices)?;
        volume_sum += w * dtw_distance(&s.volumes, &c.volumes)?;
        weight += w;
    }
    if weight == 0.0 {
        return Err(BlockError::Validation("seed shape has no bars".into()));
    }
    let price_distance = price_sum / weight;
    let volume_distance = volume_sum / weight;

    let delta = tolerance.allowed_delta(seed.duration);
    let timing_penalty = if delta == 0 {
        0.0
    } else {
        (len.abs_diff(seed.duration) as f64 / delta as f64).min(1.0)
    };

    let penalty = tolerance.weight_price.get() * price_distance
        + tolerance.weight_volume.get() * volume_distance
        + tolerance.weight_timing.get() * timing_penalty;

    Ok(Similarity {
        price_distance,
        volume_distance,
        timing_penalty,
        score: (1.0 - penalty).clamp(0.0, 1.0),
    })
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize,
    len: usize,
    similarity: Similarity,
}

impl Candidate {
    fn end(&self) -> usize {
        self.start + self.len
    }

    fn overlaps(&self, other: &Candidate) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// Searches a series for windows shaped like one seed chain.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatcher<'a> {
    seed: &'a Chain,
    shape: &'a SeedShape,
    tolerance: &'a ToleranceConfig,
    entry: Option<&'a ConditionSet>,
}

impl<'a> SimilarityMatcher<'a> {
    pub fn new(seed: &'a Chain, shape: &'a SeedShape, tolerance: &'a ToleranceConfig) -> Self {
        Self {
            seed,
            shape,
            tolerance,
            entry: None,
        }
    }

    /// Only consider windows whose blocks satisfy `conditions`: the Block1
    /// entry at the window start, and each deeper level's entry and window
    /// bounds at its block's first bar, linked to the block before it.
    pub fn with_entry_conditions(mut self, conditions: &'a ConditionSet) -> Self {
        self.entry = Some(conditions);
        self
    }

    /// Accepted matches in `series`, ordered by start.
    ///
    /// Every start is tried with each length within the allowed deviation
    /// from the seed duration; a start keeps its best passing length. Then
    /// candidates are accepted by descending score (earlier start first on a
    /// tie) as long as they overlap no accepted window and start at least
    /// `min_detection_interval_days` bars away from every accepted start.
    ///
    /// # Errors
    /// Config errors from the tolerance or the entry conditions. A candidate
    /// that fails to normalize is skipped.
    pub fn find_matches(&self, series: &Series) -> Result<Vec<Chain>> {
        self.tolerance.validate()?;
        if let Some(entry) = self.entry {
            entry.validate()?;
        }
        let duration = self.shape.duration;
        if series.is_empty() || duration == 0 {
            return Ok(Vec::new());
        }
        if let Some(entry) = self.entry {
            entry.validate_against(series.len())?;
        }

        let delta = self.tolerance.allowed_delta(duration);
        let lengths = duration.saturating_sub(delta).max(1)..=duration + delta;
        let excluded = self.seed_range(series);

        let mut candidates = Vec::new();
        for start in 0..series.len() {
            if !self.entry_allows(series, start) {
                continue;
            }
            let mut best: Option<Candidate> = None;
            for len in lengths.clone() {
                if start + len > series.len() {
                    break;
                }
                if let Some((lo, hi)) = excluded {
                    if start <= hi && lo < start + len {
                        continue;
                    }
                }
                let similarity = match self.score_window(series, start, len) {
                    Ok(Some(similarity)) => similarity,
                    Ok(None) => continue,
                    Err(e) if e.is_local() => {
                        trace!(start, len, error = %e, "candidate skipped");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if !similarity.passes(self.tolerance) {
                    continue;
                }
                if best.map_or(true, |b| similarity.score > b.similarity.score) {
                    best = Some(Candidate { start, len, similarity });
                }
            }
            candidates.extend(best);
        }

        let accepted = self.select(candidates);
        let chains = self.build_chains(series, &accepted)?;
        info!(
            ticker = series.ticker(),
            seed = %self.shape.seed_id.0,
            matches = chains.len(),
            "redetection finished"
        );
        Ok(chains)
    }

    fn entry_allows(&self, series: &Series, start: usize) -> bool {
        let Some(condition) = self.entry.and_then(|set| set.get(BlockLevel::Block1)) else {
            return true;
        };
        match evaluate_entry(&series.context_at(start), condition, &EntryLink::default()) {
            Ok(fired) => fired,
            Err(e) => {
                trace!(start, error = %e, "entry gate skipped");
                false
            }
        }
    }

    /// Bar range of the seed itself when `series` is the seed's ticker.
    fn seed_range(&self, series: &Series) -> Option<(usize, usize)> {
        if series.ticker() != self.seed.ticker {
            return None;
        }
        let (first, last) = self.seed.span();
        Some((series.index_of(first)?, series.index_of(last)?))
    }

    /// `None` when a successor level's entry conditions reject the window.
    fn score_window(&self, series: &Series, start: usize, len: usize) -> Result<Option<Similarity>> {
        if !self.successors_allow(series, start, len)? {
            return Ok(None);
        }
        let candidate = normalize_window(series, start, len, self.shape)?;
        score_shapes(self.shape, &candidate, len, self.tolerance).map(Some)
    }

    fn successors_allow(&self, series: &Series, start: usize, len: usize) -> Result<bool> {
        let Some(set) = self.entry.filter(|set| set.depth() > 1) else {
            return Ok(true);
        };
        let bars = series.bars();
        let mut previous: Option<Predecessor> = None;
        for (level, range) in window_layout(start, len, self.shape)? {
            if let (Some(pred), Some(condition)) = (previous, set.get(level)) {
                let date = bars[range.start].date;
                let pred_start = bars[pred.start_index].date;
                let link = EntryLink {
                    predecessor: Some(pred),
                    last_start: None,
                };
                let fires = check_forward(
                    series,
                    pred_start,
                    date,
                    condition.min_candles_after,
                    condition.max_candles_after,
                ) && check_lookback(series, date, Some(pred_start), condition.lookback_min, condition.lookback_max)
                    && evaluate_entry(&series.context_at(range.start), condition, &link).unwrap_or(false);
                if !fires {
                    trace!(%level, start, len, "successor entry rejected");
                    return Ok(false);
                }
            }
            let mut block = OpenBlock::open(BlockId(0), level, range.start, &bars[range.start], None);
            for index in range.start + 1..range.end {
                block.track(index, &bars[index]);
            }
            previous = Some(Predecessor::from(&block));
        }
        Ok(true)
    }

    fn select(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| {
            b.similarity
                .score
                .partial_cmp(&a.similarity.score)
                .unwrap_or(Ordering::Equal)
                .then(a.start.cmp(&b.start))
        });

        let interval = self.tolerance.min_detection_interval_days;
        let mut accepted: Vec<Candidate> = Vec::new();
        for candidate in candidates {
            let clear = accepted
                .iter()
                .all(|a| !a.overlaps(&candidate) && a.start.abs_diff(candidate.start) >= interval);
            if clear {
                debug!(
                    start = candidate.start,
                    len = candidate.len,
                    score = candidate.similarity.score,
                    "match accepted"
                );
                accepted.push(candidate);
            }
        }
        accepted.sort_by_key(|c| c.start);
        accepted
    }

    fn build_chains(&self, series: &Series, accepted: &[Candidate]) -> Result<Vec<Chain>> {
        let bars = series.bars();
        let seed_id = self.seed.seed_id();
        let mut next_id = 0;
        let mut chains = Vec::with_capacity(accepted.len());

        for candidate in accepted {
            let layout = window_layout(candidate.start, candidate.len, self.shape)?;
            let mut blocks = Vec::with_capacity(layout.len());
            let mut predecessor = None;
            for (i, (level, range)) in layout.into_iter().enumerate() {
                let id = BlockId(next_id);
                next_id += 1;
                let mut open = OpenBlock::open(id, level, range.start, &bars[range.start], predecessor);
                for index in range.start + 1..range.end {
                    open.track(index, &bars[index]);
                }
                let reason = match self.seed.blocks.get(i).map(|b| b.exit_reason) {
                    Some(ExitReason::SuccessorStarted) => ExitReason::SuccessorStarted,
                    _ => ExitReason::MatchEnd,
                };
                blocks.push(open.finalize(series, range.end - 1, reason));
                predecessor = Some(id);
            }
            chains.push(Chain {
                ticker: series.ticker().to_string(),
                blocks,
                provenance: Provenance::redetection(candidate.similarity.score, seed_id.clone()),
            });
        }
        Ok(chains)
    }
}

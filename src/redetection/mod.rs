//! Redetection: find chains elsewhere in history shaped like a seed chain.
//!
//! - [`normalize`]: seed chain to a level-free [`SeedShape`]
//! - [`dtw`]: elastic distance between normalized sequences
//! - [`matcher`]: candidate windows, scoring and non-overlapping selection

pub mod dtw;
pub mod matcher;
pub mod normalize;

pub use dtw::dtw_distance;
pub use matcher::{score_shapes, Similarity, SimilarityMatcher};
pub use normalize::{normalize, normalize_window, window_layout, BlockShape, SeedShape};

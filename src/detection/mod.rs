//! Seed detection
//!
//! Building blocks of the per-ticker scan, leaves first:
//!
//! - **helpers**: small price predicates shared by the evaluator
//! - **peak**: running maxima of an open block
//! - **evaluator**: entry/exit predicates for one bar
//! - **window**: forward and lookback candle-distance gates between links
//! - **chain**: the per-level state machine producing seed chains

pub mod helpers;

pub mod chain;
pub mod evaluator;
pub mod peak;
pub mod window;

pub use chain::ChainDetector;
pub use evaluator::{evaluate_entry, evaluate_exit, EntryLink, Predecessor};
pub use peak::{OpenBlock, PeakState};
pub use window::{check_forward, check_lookback, check_lookback_block};

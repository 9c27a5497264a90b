//! Data and statistics: the dataset model and per-stratum summaries.
//!
//! This module holds the first stage of the pipeline:
//!
//! - **Dataset**: columns of numeric, categorical or logical values plus
//!   side-channel `Metadata` (labels, units, level order)
//! - **Statistics**: raw summaries (`ContinuousStats`, `CategoricalStats`)
//! - **Formatting**: the rounding pass producing a `StatMap` of display strings
//!
//! ## Example
//!
//! ```rust
//! use tableonelib::data::{ContinuousStats, StatFormatter, StatKey};
//!
//! let stats = ContinuousStats::compute(&[Some(1.0), Some(2.0), None]);
//! let map = StatFormatter::new(3).continuous(&stats);
//! assert_eq!(map.get(StatKey::Mean), "1.50");
//! assert_eq!(map.get(StatKey::Nmiss), "1");
//! ```

pub mod dataset;
pub mod format;
pub mod stats;

pub use dataset::{
    Column, ColumnData, ColumnMetadata, Dataset, Metadata, Values, VariableKind, VariableSpec,
    LOGICAL_LEVELS,
};
pub use format::{format_decimals, round_signif, signif_pad};
pub use stats::{
    missing_stats, quantile, CategoricalStats, ContinuousStats, LevelStats, PercentMode,
    StatFormatter, StatKey, StatMap,
};

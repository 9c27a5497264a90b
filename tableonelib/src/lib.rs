//! # tableonelib
//!
//! Stratified descriptive statistics tables, the "Table 1" of clinical and
//! epidemiological reports.
//!
//! ## Overview
//!
//! Given a dataset, a list of variables and one or two grouping variables,
//! the library computes summary statistics of every variable within every
//! stratum and assembles them into a renderer-agnostic [`TableModel`]:
//!
//! - **Continuous** variables: mean (SD), median [min, max], or any
//!   combination of N, NMISS, MEAN, SD, CV, GMEAN, GCV, MEDIAN, MIN, MAX,
//!   IQR, Q1, Q2, Q3
//! - **Categorical** and logical variables: frequency (percentage) per level
//! - **Missing** values are counted and shown as their own row
//!
//! ## Features
//!
//! - **Significant-digit rounding**: one `digits` setting for every statistic
//! - **Abbreviated codes**: templates such as `"Mean (CV%)"` compiled into
//!   render functions
//! - **Render overrides**: per variable, per kind, or for everything
//! - **Nested strata**: two grouping variables with spanning headers
//! - **Extra columns**: functions that see all strata at once (p-values)
//! - **Transposition**: swap rows and columns
//!
//! ## Example
//!
//! ```rust
//! use tableonelib::{
//!     build_table, ColumnMetadata, Dataset, Metadata, Overall, TableOptions, TableRequest,
//! };
//!
//! let ds = Dataset::new()
//!     .numeric("age", vec![Some(20.0), Some(25.0), Some(30.0), Some(40.0)])
//!     .unwrap()
//!     .text("arm", &[Some("A"), Some("A"), Some("B"), Some("B")])
//!     .unwrap();
//! let meta = Metadata::new().with("age", ColumnMetadata::new().label("Age").units("years"));
//!
//! let table = build_table(
//!     &ds,
//!     &meta,
//!     &TableRequest::new(["age"]).by("arm"),
//!     &TableOptions::new().overall(Overall::default()),
//! )
//! .unwrap();
//!
//! assert_eq!(table.rows[0].label, "Age (years)");
//! assert_eq!(table.columns[0].n, Some(2));
//! assert_eq!(table.get("Median [Min, Max]", "B"), Some("35.0 [30.0, 40.0]"));
//! ```

pub mod data;
pub mod error;
pub mod output;
pub mod query;
pub mod render;

pub use data::{
    ColumnData, ColumnMetadata, ContinuousStats, Dataset, Metadata, PercentMode, StatFormatter,
    StatKey, StatMap, Values, VariableKind, VariableSpec,
};
pub use error::TableOneError;
pub use output::{
    build_table, HeaderCell, HeaderGroup, HeaderKind, TableBuilder, TableModel, TableRequest,
};
pub use query::{
    build_strata, CustomStrata, ExtraColumn, ExtraInput, Overall, Placement, Strata, StrataSource,
    TableOptions,
};
pub use render::{
    compile, AbbrevCode, RenderConfig, RenderDispatcher, RenderInput, RenderSpec, StatRow,
};

/// Result type for tableonelib operations
pub type Result<T> = std::result::Result<T, TableOneError>;

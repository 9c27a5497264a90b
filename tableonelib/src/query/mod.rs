//! Query processing: what to tabulate and how to split it.
//!
//! This module handles the second stage of the pipeline - turning a table
//! request into strata. It provides:
//!
//! - **Options**: Table configuration (`TableOptions`, `Overall`, `ExtraColumn`)
//! - **Strata**: Partitioning of records into columns (`build_strata`)
//!
//! ## Example
//!
//! ```rust
//! use tableonelib::data::{Dataset, Metadata};
//! use tableonelib::query::{build_strata, Overall, StrataSource};
//!
//! let ds = Dataset::new()
//!     .text("arm", &[Some("A"), Some("B"), Some("A")])
//!     .unwrap();
//! let strata = build_strata(
//!     &ds,
//!     &Metadata::new(),
//!     &StrataSource::by("arm"),
//!     Some(&Overall::default()),
//! )
//! .unwrap();
//! let names: Vec<_> = strata.strata.iter().map(|s| s.name.as_str()).collect();
//! assert_eq!(names, ["A", "B", "Overall"]);
//! ```

pub mod options;
pub mod strata;

pub use options::{
    ExtraColumn, ExtraInput, Overall, Placement, TableOptions, DEFAULT_MISSING_LABEL,
    DEFAULT_OVERALL_LABEL,
};
pub use strata::{
    build_strata, CustomStrata, Strata, StrataSource, Stratum, StratumGroup, StratumKind,
};

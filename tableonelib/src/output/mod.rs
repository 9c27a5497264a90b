//! Output: assemble the finished table.
//!
//! This module handles the last stage of the pipeline - turning rendered
//! statistics into a presentation-ready model. It provides:
//!
//! - **TableBuilder**: zips per-stratum rows into one table (`build_table`)
//! - **TableModel**: headers, spans and a matrix of formatted cells
//! - **transpose**: swaps rows and columns
//!
//! TableModel is a pure data structure - it performs no markup generation.
//! Renderers (HTML, terminal, JSON) consume it as-is.
//!
//! ## Example
//!
//! ```rust
//! use tableonelib::data::{Dataset, Metadata};
//! use tableonelib::output::{build_table, TableRequest};
//! use tableonelib::query::TableOptions;
//!
//! let ds = Dataset::new()
//!     .logical("smoker", vec![Some(true), Some(false), Some(true), None])
//!     .unwrap();
//! let table = build_table(
//!     &ds,
//!     &Metadata::new(),
//!     &TableRequest::new(["smoker"]),
//!     &TableOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(table.get("Yes", "Overall"), Some("2 (66.7%)"));
//! assert_eq!(table.get("Missing", "Overall"), Some("1 (25.0%)"));
//! ```

pub mod builder;
pub mod table;
pub mod transpose;

pub use builder::{build_table, TableBuilder, TableRequest};
pub use table::{HeaderCell, HeaderGroup, HeaderKind, TableModel};
pub use transpose::transpose;

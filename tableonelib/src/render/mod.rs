//! Rendering: turn a variable's values in a stratum into labelled rows.
//!
//! - **Abbreviated codes**: `compile(&[(".", "Mean (SD)")])` builds a
//!   renderer from keyword templates
//! - **Dispatch**: `RenderDispatcher` picks the per-variable, unified,
//!   per-kind or default renderer
//!
//! ## Example
//!
//! ```rust
//! use tableonelib::render::{RenderConfig, RenderSpec};
//!
//! let config = RenderConfig::new()
//!     .continuous(RenderSpec::abbrev(&[("", "MEAN (SD)")]))
//!     .variable("wt", RenderSpec::abbrev(&[(".", "GMEAN (GCV%)")]));
//! assert!(config.variables.contains_key("wt"));
//! ```

pub mod abbrev;
pub mod dispatch;

pub use abbrev::{
    compile, AbbrevCode, CompiledCode, Segment, CODE_AS_LABEL, DEFAULT_UNDEFINED_LABEL,
};
pub use dispatch::{
    default_render, render_missing, RenderConfig, RenderDispatcher, RenderFn, RenderInput,
    RenderSource, RenderSpec, Renderer, StatBlock, StatRow, DEFAULT_CATEGORICAL,
    DEFAULT_CONTINUOUS, MISSING_CODE,
};

//! Input options for building a table.
//!
//! This module contains the configuration types that control stratification,
//! rounding, rendering and the table decorations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{PercentMode, StatFormatter, Values, VariableSpec};
use crate::error::TableOneError;
use crate::render::{RenderConfig, DEFAULT_UNDEFINED_LABEL};
use crate::Result;

/// Default label of the overall column.
pub const DEFAULT_OVERALL_LABEL: &str = "Overall";

/// Default label of the missing row.
pub const DEFAULT_MISSING_LABEL: &str = "Missing";

/// Edge of the table where the overall column goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    Left,
    #[default]
    Right,
}

impl FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "left" | "first" => Ok(Placement::Left),
            "right" | "last" => Ok(Placement::Right),
            _ => Err(format!("Unknown placement: {}", s)),
        }
    }
}

/// The overall column: every record, whatever its stratum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overall {
    pub label: String,
    #[serde(default)]
    pub placement: Placement,
}

impl Default for Overall {
    fn default() -> Self {
        Self {
            label: DEFAULT_OVERALL_LABEL.to_string(),
            placement: Placement::Right,
        }
    }
}

impl Overall {
    pub fn left(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            placement: Placement::Left,
        }
    }

    pub fn right(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            placement: Placement::Right,
        }
    }
}

/// What an extra column function receives for one variable: the values of
/// every leaf stratum at once (the overall column is not included).
#[derive(Debug, Clone, Copy)]
pub struct ExtraInput<'a> {
    pub variable: &'a VariableSpec,
    /// `(stratum name, values)` in column order
    pub strata: &'a [(String, Values<'a>)],
    /// Number of rows the variable occupies; the function must return this many values
    pub rows: usize,
    pub formatter: StatFormatter,
}

impl<'a> ExtraInput<'a> {
    /// Values of a stratum by name.
    pub fn get(&self, stratum: &str) -> Option<&'a Values<'a>> {
        self.strata
            .iter()
            .find(|(name, _)| name == stratum)
            .map(|(_, values)| values)
    }
}

type ExtraFn = dyn Fn(&ExtraInput<'_>) -> Vec<String> + Send + Sync;

/// A named column computed from all strata of a variable at once,
/// e.g. a p-value.
#[derive(Clone)]
pub struct ExtraColumn {
    pub name: String,
    f: Arc<ExtraFn>,
}

impl ExtraColumn {
    /// The function returns one value per row of the variable.
    pub fn new(
        name: impl Into<String>,
        f: impl Fn(&ExtraInput<'_>) -> Vec<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// The function returns a single value, shown on the variable's label
    /// row; the other rows are left blank.
    pub fn label_row(
        name: impl Into<String>,
        f: impl Fn(&ExtraInput<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        Self::new(name, move |input| {
            let mut values = vec![String::new(); input.rows.max(1)];
            values[0] = f(input);
            values
        })
    }

    pub fn call(&self, input: &ExtraInput<'_>) -> Vec<String> {
        (self.f)(input)
    }
}

impl fmt::Debug for ExtraColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraColumn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Options for building a table.
#[derive(Debug, Clone)]
pub struct TableOptions {
    /// Overall column (none by default)
    pub overall: Option<Overall>,
    /// Significant digits for continuous statistics
    pub digits: usize,
    /// Decimal places for percentages
    pub digits_pct: usize,
    /// Percentage normalization for categorical variables
    pub percent_mode: PercentMode,
    /// Annotate stratum headers with their record count
    pub show_n: bool,
    /// Label of the missing row
    pub missing_label: String,
    /// Placeholder for undefined statistics beside defined ones
    pub undefined_label: String,
    /// Render overrides
    pub render: RenderConfig,
    /// Extra columns appended after the strata
    pub extra_columns: Vec<ExtraColumn>,
    /// Swap rows and columns
    pub transpose: bool,
    /// Opaque style hint passed to renderers
    pub topclass: Option<String>,
    pub caption: Option<String>,
    pub footnote: Option<String>,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            overall: None,
            digits: 3,
            digits_pct: 1,
            percent_mode: PercentMode::Column,
            show_n: true,
            missing_label: DEFAULT_MISSING_LABEL.to_string(),
            undefined_label: DEFAULT_UNDEFINED_LABEL.to_string(),
            render: RenderConfig::default(),
            extra_columns: Vec::new(),
            transpose: false,
            topclass: None,
            caption: None,
            footnote: None,
        }
    }
}

impl TableOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include an overall column.
    pub fn overall(mut self, overall: Overall) -> Self {
        self.overall = Some(overall);
        self
    }

    pub fn digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }

    pub fn digits_pct(mut self, digits_pct: usize) -> Self {
        self.digits_pct = digits_pct;
        self
    }

    pub fn percent_mode(mut self, mode: PercentMode) -> Self {
        self.percent_mode = mode;
        self
    }

    /// Hide the record counts under stratum headers.
    pub fn without_n(mut self) -> Self {
        self.show_n = false;
        self
    }

    pub fn missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = label.into();
        self
    }

    /// Text for undefined keywords, e.g. the SD of a single value in `MEAN (SD)`.
    pub fn undefined_label(mut self, label: impl Into<String>) -> Self {
        self.undefined_label = label.into();
        self
    }

    pub fn render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn extra_column(mut self, column: ExtraColumn) -> Self {
        self.extra_columns.push(column);
        self
    }

    pub fn transpose(mut self, transpose: bool) -> Self {
        self.transpose = transpose;
        self
    }

    pub fn topclass(mut self, topclass: impl Into<String>) -> Self {
        self.topclass = Some(topclass.into());
        self
    }

    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn footnote(mut self, footnote: impl Into<String>) -> Self {
        self.footnote = Some(footnote.into());
        self
    }

    /// The rounding configuration, validated.
    pub fn formatter(&self) -> Result<StatFormatter> {
        if self.digits == 0 {
            return Err(TableOneError::InvalidDigits(self.digits));
        }
        Ok(StatFormatter::new(self.digits).digits_pct(self.digits_pct))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let options = TableOptions::default();
        assert!(options.overall.is_none());
        assert_eq!(options.digits, 3);
        assert_eq!(options.digits_pct, 1);
        assert!(options.show_n);
        assert!(!options.transpose);
        assert_eq!(options.missing_label, "Missing");
        assert_eq!(options.undefined_label, "NA");
        assert_eq!(options.percent_mode, PercentMode::Column);
    }

    #[test]
    fn test_options_builder() {
        let options = TableOptions::new()
            .overall(Overall::left("Total"))
            .digits(4)
            .without_n()
            .caption("Table 1")
            .footnote("* p < 0.05")
            .topclass("Rtable1-zebra")
            .transpose(true);
        assert_eq!(options.overall, Some(Overall::left("Total")));
        assert_eq!(options.digits, 4);
        assert!(!options.show_n);
        assert_eq!(options.caption.as_deref(), Some("Table 1"));
        assert_eq!(options.footnote.as_deref(), Some("* p < 0.05"));
        assert_eq!(options.topclass.as_deref(), Some("Rtable1-zebra"));
        assert!(options.transpose);
    }

    #[test]
    fn test_zero_digits_rejected() {
        let err = TableOptions::new().digits(0).formatter().unwrap_err();
        assert_eq!(err, TableOneError::InvalidDigits(0));
    }

    #[test]
    fn test_overall_default() {
        let overall = Overall::default();
        assert_eq!(overall.label, "Overall");
        assert_eq!(overall.placement, Placement::Right);
    }

    #[test]
    fn test_placement_from_str() {
        assert_eq!(Placement::from_str("left").unwrap(), Placement::Left);
        assert_eq!(Placement::from_str("Right").unwrap(), Placement::Right);
        assert!(Placement::from_str("middle").is_err());
    }

    #[test]
    fn test_label_row_pads() {
        use crate::data::{Dataset, Metadata};

        let ds = Dataset::new().numeric("x", vec![Some(1.0)]).unwrap();
        let var = VariableSpec::resolve(&ds, &Metadata::new(), "x").unwrap();
        let strata = vec![("all".to_string(), var.subset(&[0]))];
        let input = ExtraInput {
            variable: &var,
            strata: &strata,
            rows: 3,
            formatter: StatFormatter::default(),
        };
        let column = ExtraColumn::label_row("p", |_| "0.05".to_string());
        assert_eq!(column.call(&input), vec!["0.05", "", ""]);
        assert!(input.get("all").is_some());
        assert!(input.get("none").is_none());
    }
}

//! The finished table, independent of any markup.
//!
//! `TableModel` is a presentation-ready structure that renderers consume
//! directly or serialize to JSON. Every cell is already a formatted string.
//!
//! The layout is symmetric so that transposition is a pure swap: columns and
//! rows are both lists of [`HeaderCell`]s, each optionally grouped by
//! [`HeaderGroup`] spans, and `cells[row][column]` holds the values.

use serde::{Deserialize, Serialize};

use crate::error::TableOneError;
use crate::Result;

/// What a header cell stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderKind {
    /// A leaf stratum
    Stratum,
    /// The overall column
    Overall,
    /// An extra column (e.g. a p-value)
    Extra,
    /// A variable's label row
    Variable,
    /// A statistic row under a variable (rendered indented)
    Statistic,
}

/// One column or row header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderCell {
    pub label: String,
    /// Record count shown under a stratum label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<usize>,
    pub kind: HeaderKind,
}

impl HeaderCell {
    pub fn new(label: impl Into<String>, kind: HeaderKind) -> Self {
        Self {
            label: label.into(),
            n: None,
            kind,
        }
    }

    pub fn with_n(mut self, n: usize) -> Self {
        self.n = Some(n);
        self
    }

    /// Whether the row is a statistic row to be shown indented.
    pub fn is_indented(&self) -> bool {
        self.kind == HeaderKind::Statistic
    }
}

/// A spanning header over adjacent columns (or rows).
///
/// `None` leaves the span without a caption cell at all; `Some("")` draws an
/// empty spanning cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderGroup {
    pub label: Option<String>,
    pub span: usize,
}

impl HeaderGroup {
    pub fn new(label: impl Into<String>, span: usize) -> Self {
        Self {
            label: Some(label.into()),
            span,
        }
    }

    /// An uncaptioned span.
    pub fn blank(span: usize) -> Self {
        Self { label: None, span }
    }
}

/// Table-ready output of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footnote: Option<String>,
    /// Opaque style hint for renderers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topclass: Option<String>,
    pub columns: Vec<HeaderCell>,
    /// Spans above `columns`; empty when there is a single header level
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub column_groups: Vec<HeaderGroup>,
    pub rows: Vec<HeaderCell>,
    /// Spans beside `rows`, one per variable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub row_groups: Vec<HeaderGroup>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<String>>,
    /// Whether rows hold strata and columns hold statistics
    #[serde(default)]
    pub transposed: bool,
}

impl TableModel {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.cells.get(row)?.get(column).map(String::as_str)
    }

    /// Index of the first column with this label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.label == label)
    }

    /// Index of the first row with this label.
    pub fn row_index(&self, label: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.label == label)
    }

    /// Cell by row and column label.
    pub fn get(&self, row: &str, column: &str) -> Option<&str> {
        self.cell(self.row_index(row)?, self.column_index(column)?)
    }

    /// Check that the cell matrix matches the headers and that group spans
    /// cover the headers exactly.
    pub fn validate(&self) -> Result<()> {
        let bad_row = self.cells.iter().find(|r| r.len() != self.columns.len());
        if self.cells.len() != self.rows.len() || bad_row.is_some() {
            return Err(TableOneError::ShapeMismatch {
                rows: self.rows.len(),
                columns: self.columns.len(),
                found_rows: self.cells.len(),
                found_columns: bad_row.map_or(self.columns.len(), Vec::len),
            });
        }
        check_spans(&self.column_groups, self.columns.len())?;
        check_spans(&self.row_groups, self.rows.len())
    }
}

fn check_spans(groups: &[HeaderGroup], len: usize) -> Result<()> {
    if groups.is_empty() {
        return Ok(());
    }
    let covered: usize = groups.iter().map(|g| g.span).sum();
    if covered != len {
        return Err(TableOneError::GroupSpanMismatch {
            expected: len,
            found: covered,
        });
    }
    Ok(())
}

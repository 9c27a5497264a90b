//! Error types for tableonelib

use thiserror::Error;

/// Configuration errors that abort a table build.
///
/// Statistics that are mathematically undefined (a standard deviation of one
/// value, a geometric mean of non-positive data) are not errors; they are
/// carried as empty cells.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableOneError {
    /// A variable or grouping variable is not a column of the dataset
    #[error("variable not found in dataset: '{0}'")]
    VariableNotFound(String),

    /// More than two grouping variables were requested
    #[error("at most two grouping variables are supported, got {0}")]
    TooManyGroupingVariables(usize),

    /// Grouping variables must be categorical or logical
    #[error("grouping variable '{0}' is not categorical")]
    GroupingVariableNotCategorical(String),

    /// A render function produced a different number of rows for one stratum
    #[error("'{variable}' rendered {found} rows in stratum '{stratum}', expected {expected}")]
    RowCountMismatch {
        variable: String,
        stratum: String,
        expected: usize,
        found: usize,
    },

    /// An extra column function returned a row count that does not match the variable
    #[error("extra column '{column}' returned {found} rows for '{variable}', expected {expected}")]
    ExtraColumnRowMismatch {
        column: String,
        variable: String,
        expected: usize,
        found: usize,
    },

    /// Explicit group spans do not add up to the number of strata
    #[error("group spans cover {found} strata, expected {expected}")]
    GroupSpanMismatch { expected: usize, found: usize },

    /// Group labels and group spans have different lengths
    #[error("{spans} group spans given with {labels} group labels")]
    GroupLabelMismatch { spans: usize, labels: usize },

    /// A custom stratum references a record outside the dataset
    #[error("stratum '{stratum}' references record {index}, dataset has {len} records")]
    StratumIndexOutOfRange {
        stratum: String,
        index: usize,
        len: usize,
    },

    /// A column does not have as many values as the dataset has records
    #[error("column '{column}' has {found} values, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Two columns share a name
    #[error("duplicate column: '{0}'")]
    DuplicateColumn(String),

    /// Two strata share a name, e.g. a level called like the overall column
    #[error("duplicate stratum: '{0}'")]
    DuplicateStratum(String),

    /// A categorical value is not one of the declared levels
    #[error("value '{value}' is not a declared level of column '{column}'")]
    UnknownLevel { column: String, value: String },

    /// The cell matrix of a table does not match its headers
    #[error("cell matrix is {found_rows}x{found_columns}, headers declare {rows}x{columns}")]
    ShapeMismatch {
        rows: usize,
        columns: usize,
        found_rows: usize,
        found_columns: usize,
    },

    /// Significant digits must be at least one
    #[error("invalid number of significant digits: {0}")]
    InvalidDigits(usize),
}

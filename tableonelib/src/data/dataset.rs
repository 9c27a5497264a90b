//! Column-oriented dataset and side-channel column metadata.
//!
//! A `Dataset` is an ordered set of records stored column by column. Labels,
//! units and preferred level orderings live in a separate `Metadata` map that
//! is passed alongside the dataset; they are never attached to the values.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::TableOneError;
use crate::Result;

/// Level labels used for logical columns, in display order.
pub const LOGICAL_LEVELS: [&str; 2] = ["Yes", "No"];

/// Values of a single column. `None` marks a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnData {
    /// Continuous numeric values
    Numeric(Vec<Option<f64>>),
    /// Categorical values stored as indices into `levels`
    Categorical {
        levels: Vec<String>,
        codes: Vec<Option<usize>>,
    },
    /// Logical values, treated as a two-level categorical (`Yes`, `No`)
    Logical(Vec<Option<bool>>),
}

impl ColumnData {
    /// Number of values (records) in the column.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Categorical { codes, .. } => codes.len(),
            ColumnData::Logical(v) => v.len(),
        }
    }

    /// Check if the column holds no values
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the value at `row` is missing.
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v.get(row).is_none_or(|x| x.is_none_or(f64::is_nan)),
            ColumnData::Categorical { codes, .. } => codes.get(row).is_none_or(Option::is_none),
            ColumnData::Logical(v) => v.get(row).is_none_or(Option::is_none),
        }
    }

    /// Number of missing values in the whole column.
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&row| self.is_missing(row)).count()
    }

    /// Semantic kind implied by the storage.
    pub fn kind(&self) -> VariableKind {
        match self {
            ColumnData::Numeric(_) => VariableKind::Continuous,
            ColumnData::Categorical { .. } | ColumnData::Logical(_) => VariableKind::Categorical,
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

/// An ordered collection of records, stored as equally long columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
    len: usize,
}

impl Dataset {
    /// Create an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column. The first column fixes the record count.
    pub fn with_column(mut self, name: impl Into<String>, data: ColumnData) -> Result<Self> {
        let name = name.into();
        if self.column(&name).is_some() {
            return Err(TableOneError::DuplicateColumn(name));
        }
        if self.columns.is_empty() {
            self.len = data.len();
        } else if data.len() != self.len {
            return Err(TableOneError::ColumnLengthMismatch {
                column: name,
                expected: self.len,
                found: data.len(),
            });
        }
        self.columns.push(Column { name, data });
        Ok(self)
    }

    /// Add a numeric column.
    pub fn numeric(self, name: impl Into<String>, values: Vec<Option<f64>>) -> Result<Self> {
        self.with_column(name, ColumnData::Numeric(values))
    }

    /// Add a logical column.
    pub fn logical(self, name: impl Into<String>, values: Vec<Option<bool>>) -> Result<Self> {
        self.with_column(name, ColumnData::Logical(values))
    }

    /// Add a categorical column with explicitly declared levels.
    ///
    /// Every non-missing value must be one of `levels`.
    pub fn categorical<S: AsRef<str>>(
        self,
        name: impl Into<String>,
        levels: Vec<String>,
        values: &[Option<S>],
    ) -> Result<Self> {
        let name = name.into();
        let codes = values
            .iter()
            .map(|value| match value {
                None => Ok(None),
                Some(v) => levels
                    .iter()
                    .position(|l| l == v.as_ref())
                    .map(Some)
                    .ok_or_else(|| TableOneError::UnknownLevel {
                        column: name.clone(),
                        value: v.as_ref().to_string(),
                    }),
            })
            .collect::<Result<Vec<_>>>()?;
        self.with_column(name, ColumnData::Categorical { levels, codes })
    }

    /// Add a categorical column whose levels are the sorted distinct values.
    pub fn text<S: AsRef<str>>(
        self,
        name: impl Into<String>,
        values: &[Option<S>],
    ) -> Result<Self> {
        let levels: Vec<String> = values
            .iter()
            .flatten()
            .map(|v| v.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        self.categorical(name, levels, values)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the dataset has no records
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column by name, failing with `VariableNotFound`.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| TableOneError::VariableNotFound(name.to_string()))
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Label, units and level ordering attached to one column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Display label (defaults to the column name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Unit string shown after the label, e.g. "years"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// Preferred category order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<String>>,
}

impl ColumnMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn levels(mut self, levels: Vec<String>) -> Self {
        self.levels = Some(levels);
        self
    }
}

/// Metadata for the columns of a dataset, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata {
    columns: BTreeMap<String, ColumnMetadata>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: attach metadata to a column.
    pub fn with(mut self, column: impl Into<String>, meta: ColumnMetadata) -> Self {
        self.columns.insert(column.into(), meta);
        self
    }

    pub fn get(&self, column: &str) -> Option<&ColumnMetadata> {
        self.columns.get(column)
    }
}

/// Semantic kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Continuous,
    Categorical,
}

/// A resolved variable: column data plus display metadata.
///
/// Categorical data is normalized to codes over `levels` in the declared
/// display order, whatever the storage (categorical or logical).
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub kind: VariableKind,
    pub label: String,
    pub units: Option<String>,
    pub levels: Vec<String>,
    values: VariableValues,
}

#[derive(Debug, Clone, PartialEq)]
enum VariableValues {
    Continuous(Vec<Option<f64>>),
    Categorical(Vec<Option<usize>>),
}

impl VariableSpec {
    /// Resolve a column and its metadata into a variable.
    pub fn resolve(dataset: &Dataset, metadata: &Metadata, name: &str) -> Result<Self> {
        let column = dataset.require(name)?;
        let meta = metadata.get(name).cloned().unwrap_or_default();

        let (levels, values) = match &column.data {
            ColumnData::Numeric(v) => (
                Vec::new(),
                VariableValues::Continuous(
                    v.iter().map(|x| x.filter(|x| !x.is_nan())).collect(),
                ),
            ),
            ColumnData::Categorical { levels, codes } => {
                let (order, remap) = reorder_levels(levels, meta.levels.as_deref());
                let codes = codes
                    .iter()
                    .map(|c| c.and_then(|c| remap.get(c).copied()))
                    .collect();
                (order, VariableValues::Categorical(codes))
            }
            ColumnData::Logical(v) => {
                let levels: Vec<String> = LOGICAL_LEVELS.iter().map(|s| s.to_string()).collect();
                let (order, remap) = reorder_levels(&levels, meta.levels.as_deref());
                let codes = v
                    .iter()
                    .map(|b| b.and_then(|b| remap.get(usize::from(!b)).copied()))
                    .collect();
                (order, VariableValues::Categorical(codes))
            }
        };

        Ok(Self {
            name: name.to_string(),
            kind: column.data.kind(),
            label: meta.label.unwrap_or_else(|| name.to_string()),
            units: meta.units,
            levels,
            values,
        })
    }

    /// Label shown on the variable's first row: `label (units)`.
    pub fn display_label(&self) -> String {
        match &self.units {
            Some(units) => format!("{} ({})", self.label, units),
            None => self.label.clone(),
        }
    }

    /// Whether any record has a missing value for this variable.
    pub fn has_missing(&self) -> bool {
        match &self.values {
            VariableValues::Continuous(v) => v.iter().any(Option::is_none),
            VariableValues::Categorical(v) => v.iter().any(Option::is_none),
        }
    }

    /// Level codes of every record, or `None` for a continuous variable.
    pub fn codes(&self) -> Option<&[Option<usize>]> {
        match &self.values {
            VariableValues::Categorical(v) => Some(v),
            VariableValues::Continuous(_) => None,
        }
    }

    /// Values of the records at `rows`.
    pub fn subset(&self, rows: &[usize]) -> Values<'_> {
        match &self.values {
            VariableValues::Continuous(v) => {
                Values::Continuous(rows.iter().map(|&r| v[r]).collect())
            }
            VariableValues::Categorical(v) => Values::Categorical {
                levels: &self.levels,
                codes: rows.iter().map(|&r| v[r]).collect(),
            },
        }
    }
}

/// Apply a preferred level order. Levels missing from `preferred` keep their
/// relative order after the preferred ones; preferred levels absent from the
/// column are kept as empty levels. Returns the new order and the old->new
/// index map.
fn reorder_levels(levels: &[String], preferred: Option<&[String]>) -> (Vec<String>, Vec<usize>) {
    let Some(preferred) = preferred else {
        return (levels.to_vec(), (0..levels.len()).collect());
    };
    let mut order: Vec<String> = Vec::with_capacity(preferred.len() + levels.len());
    for level in preferred.iter().chain(levels) {
        if !order.contains(level) {
            order.push(level.clone());
        }
    }
    let remap = levels
        .iter()
        .filter_map(|l| order.iter().position(|o| o == l))
        .collect();
    (order, remap)
}

/// The values of one variable within one stratum.
#[derive(Debug, Clone, PartialEq)]
pub enum Values<'a> {
    Continuous(Vec<Option<f64>>),
    Categorical {
        levels: &'a [String],
        codes: Vec<Option<usize>>,
    },
}

impl Values<'_> {
    /// Number of records, missing included.
    pub fn len(&self) -> usize {
        match self {
            Values::Continuous(v) => v.len(),
            Values::Categorical { codes, .. } => codes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of missing values.
    pub fn missing(&self) -> usize {
        match self {
            Values::Continuous(v) => v.iter().filter(|x| x.is_none()).count(),
            Values::Categorical { codes, .. } => codes.iter().filter(|x| x.is_none()).count(),
        }
    }

    pub fn kind(&self) -> VariableKind {
        match self {
            Values::Continuous(_) => VariableKind::Continuous,
            Values::Categorical { .. } => VariableKind::Categorical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new()
            .numeric("age", vec![Some(30.0), None, Some(50.0)])
            .unwrap()
            .text("sex", &[Some("M"), Some("F"), None])
            .unwrap()
            .logical("smoker", vec![Some(true), Some(false), Some(true)])
            .unwrap()
    }

    #[test]
    fn test_text_levels_sorted() {
        let ds = sample();
        match &ds.require("sex").unwrap().data {
            ColumnData::Categorical { levels, codes } => {
                assert_eq!(levels, &vec!["F".to_string(), "M".to_string()]);
                assert_eq!(codes, &vec![Some(1), Some(0), None]);
            }
            other => panic!("unexpected column data: {other:?}"),
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = sample().numeric("bmi", vec![Some(1.0)]).unwrap_err();
        assert_eq!(
            err,
            TableOneError::ColumnLengthMismatch {
                column: "bmi".to_string(),
                expected: 3,
                found: 1,
            }
        );
    }

    #[test]
    fn test_duplicate_column() {
        let err = sample().numeric("age", vec![None, None, None]).unwrap_err();
        assert_eq!(err, TableOneError::DuplicateColumn("age".to_string()));
    }

    #[test]
    fn test_unknown_level() {
        let err = Dataset::new()
            .categorical("arm", vec!["A".to_string()], &[Some("B")])
            .unwrap_err();
        assert!(matches!(err, TableOneError::UnknownLevel { .. }));
    }

    #[test]
    fn test_resolve_missing_variable() {
        let err = VariableSpec::resolve(&sample(), &Metadata::new(), "weight").unwrap_err();
        assert_eq!(err, TableOneError::VariableNotFound("weight".to_string()));
    }

    #[test]
    fn test_display_label_with_units() {
        let meta = Metadata::new().with("age", ColumnMetadata::new().label("Age").units("years"));
        let var = VariableSpec::resolve(&sample(), &meta, "age").unwrap();
        assert_eq!(var.display_label(), "Age (years)");
        assert_eq!(var.kind, VariableKind::Continuous);
        assert!(var.has_missing());
    }

    #[test]
    fn test_logical_becomes_yes_no() {
        let var = VariableSpec::resolve(&sample(), &Metadata::new(), "smoker").unwrap();
        assert_eq!(var.kind, VariableKind::Categorical);
        assert_eq!(var.levels, vec!["Yes", "No"]);
        match var.subset(&[0, 1]) {
            Values::Categorical { codes, .. } => assert_eq!(codes, vec![Some(0), Some(1)]),
            other => panic!("unexpected values: {other:?}"),
        }
    }

    #[test]
    fn test_metadata_level_order() {
        let meta = Metadata::new().with(
            "sex",
            ColumnMetadata::new().levels(vec!["M".to_string(), "X".to_string()]),
        );
        let var = VariableSpec::resolve(&sample(), &meta, "sex").unwrap();
        assert_eq!(var.levels, vec!["M", "X", "F"]);
        match var.subset(&[0, 1, 2]) {
            Values::Categorical { codes, .. } => assert_eq!(codes, vec![Some(0), Some(2), None]),
            other => panic!("unexpected values: {other:?}"),
        }
    }

    #[test]
    fn test_nan_is_missing() {
        let ds = Dataset::new().numeric("x", vec![Some(f64::NAN), Some(1.0)]).unwrap();
        assert!(ds.require("x").unwrap().data.is_missing(0));
        let var = VariableSpec::resolve(&ds, &Metadata::new(), "x").unwrap();
        assert_eq!(var.subset(&[0, 1]).missing(), 1);
    }
}

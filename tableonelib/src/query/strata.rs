//! Stratification: partition records into the table's columns.
//!
//! Strata are views into the dataset: each holds the indices of its records.
//! With one grouping variable there is one leaf stratum per declared level;
//! with two, the outer variable's levels each expand into the inner
//! variable's levels and become spanning groups. Empty levels are kept as
//! empty strata. Records whose grouping value is missing belong to no leaf
//! stratum but are still part of the overall column.
//!
//! Callers can bypass grouping variables with [`CustomStrata`]: explicit
//! named record subsets plus optional group spans.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{Dataset, Metadata, VariableKind, VariableSpec};
use crate::error::TableOneError;
use crate::Result;

use super::options::{Overall, Placement, DEFAULT_OVERALL_LABEL};

/// Whether a stratum is a leaf of the partition or the overall column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StratumKind {
    Leaf,
    Overall,
}

/// One column's worth of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stratum {
    /// Unique name (nested strata are named `outer.inner`)
    pub name: String,
    /// Header text
    pub label: String,
    /// Indices of the member records, ascending
    pub rows: Vec<usize>,
    /// Index into [`Strata::groups`] for nested strata
    pub group: Option<usize>,
    pub kind: StratumKind,
}

impl Stratum {
    /// Number of records.
    pub fn n(&self) -> usize {
        self.rows.len()
    }

    pub fn is_overall(&self) -> bool {
        self.kind == StratumKind::Overall
    }
}

/// A spanning group of adjacent leaf strata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumGroup {
    /// Caption above the group; may be empty
    pub label: String,
    /// Number of leaf strata in the group
    pub span: usize,
}

/// The ordered strata of a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strata {
    pub strata: Vec<Stratum>,
    /// Spanning groups, empty unless stratification is nested
    pub groups: Vec<StratumGroup>,
}

impl Strata {
    pub fn len(&self) -> usize {
        self.strata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strata.is_empty()
    }

    pub fn is_nested(&self) -> bool {
        !self.groups.is_empty()
    }

    /// Leaf strata, in column order.
    pub fn leaves(&self) -> impl Iterator<Item = &Stratum> {
        self.strata.iter().filter(|s| !s.is_overall())
    }

    pub fn get(&self, name: &str) -> Option<&Stratum> {
        self.strata.iter().find(|s| s.name == name)
    }
}

/// Explicit strata supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomStrata {
    /// `(name, record indices)` in column order
    pub strata: Vec<(String, Vec<usize>)>,
    /// Widths of spanning groups; must add up to the number of strata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupspan: Option<Vec<usize>>,
    /// Captions of the spanning groups, one per span
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_labels: Vec<String>,
}

impl CustomStrata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a stratum.
    pub fn stratum(mut self, name: impl Into<String>, rows: Vec<usize>) -> Self {
        self.strata.push((name.into(), rows));
        self
    }

    /// Builder: set spanning groups as `(label, span)` pairs.
    pub fn groups<S: Into<String>>(mut self, groups: Vec<(S, usize)>) -> Self {
        let (labels, spans) = groups.into_iter().map(|(l, s)| (l.into(), s)).unzip();
        self.group_labels = labels;
        self.groupspan = Some(spans);
        self
    }
}

/// How strata are obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrataSource {
    /// Zero, one or two categorical grouping variables (outer first).
    /// With none, the table has only the overall column.
    Variables(Vec<String>),
    /// Explicit subsets
    Custom(CustomStrata),
}

impl Default for StrataSource {
    fn default() -> Self {
        StrataSource::Variables(Vec::new())
    }
}

impl StrataSource {
    pub fn by(variable: impl Into<String>) -> Self {
        StrataSource::Variables(vec![variable.into()])
    }

    pub fn nested(outer: impl Into<String>, inner: impl Into<String>) -> Self {
        StrataSource::Variables(vec![outer.into(), inner.into()])
    }

    /// Check the request against the dataset without building anything.
    pub fn validate(&self, dataset: &Dataset) -> Result<()> {
        match self {
            StrataSource::Variables(vars) => {
                if vars.len() > 2 {
                    return Err(TableOneError::TooManyGroupingVariables(vars.len()));
                }
                for name in vars {
                    let column = dataset.require(name)?;
                    if column.data.kind() != VariableKind::Categorical {
                        return Err(TableOneError::GroupingVariableNotCategorical(name.clone()));
                    }
                }
                Ok(())
            }
            StrataSource::Custom(custom) => validate_custom(custom, dataset.len()),
        }
    }
}

/// Build the ordered strata.
///
/// With no grouping variables the overall column is always present, labelled
/// per `overall` or "Overall".
pub fn build_strata(
    dataset: &Dataset,
    metadata: &Metadata,
    source: &StrataSource,
    overall: Option<&Overall>,
) -> Result<Strata> {
    source.validate(dataset)?;

    let mut strata = match source {
        StrataSource::Variables(vars) => match vars.as_slice() {
            [] => Strata::default(),
            [var] => single(dataset, metadata, var)?,
            [outer, inner] => nested(dataset, metadata, outer, inner)?,
            _ => return Err(TableOneError::TooManyGroupingVariables(vars.len())),
        },
        StrataSource::Custom(custom) => custom_strata(custom),
    };

    let forced;
    let overall = match overall {
        Some(o) => Some(o),
        None if strata.is_empty() => {
            forced = Overall::right(DEFAULT_OVERALL_LABEL);
            Some(&forced)
        }
        None => None,
    };
    if let Some(overall) = overall {
        let stratum = Stratum {
            name: overall.label.clone(),
            label: overall.label.clone(),
            rows: (0..dataset.len()).collect(),
            group: None,
            kind: StratumKind::Overall,
        };
        match overall.placement {
            Placement::Left => strata.strata.insert(0, stratum),
            Placement::Right => strata.strata.push(stratum),
        }
    }
    check_unique_names(&strata)?;

    debug!(
        strata = strata.len(),
        groups = strata.groups.len(),
        "built strata"
    );
    Ok(strata)
}

/// Stratum names key the table's columns and must not collide.
fn check_unique_names(strata: &Strata) -> Result<()> {
    let mut seen = HashSet::new();
    match strata.strata.iter().find(|s| !seen.insert(s.name.as_str())) {
        Some(duplicate) => Err(TableOneError::DuplicateStratum(duplicate.name.clone())),
        None => Ok(()),
    }
}

fn grouping(
    dataset: &Dataset,
    metadata: &Metadata,
    name: &str,
) -> Result<(Vec<String>, Vec<Option<usize>>)> {
    let var = VariableSpec::resolve(dataset, metadata, name)?;
    let codes = var
        .codes()
        .ok_or_else(|| TableOneError::GroupingVariableNotCategorical(name.to_string()))?
        .to_vec();
    let missing = codes.iter().filter(|c| c.is_none()).count();
    if missing > 0 {
        warn!(
            variable = name,
            records = missing,
            "records with a missing grouping value are only counted in the overall column"
        );
    }
    Ok((var.levels, codes))
}

fn single(dataset: &Dataset, metadata: &Metadata, var: &str) -> Result<Strata> {
    let (levels, codes) = grouping(dataset, metadata, var)?;
    let strata = levels
        .iter()
        .enumerate()
        .map(|(i, level)| Stratum {
            name: level.clone(),
            label: level.clone(),
            rows: rows_where(&codes, |c| c == i),
            group: None,
            kind: StratumKind::Leaf,
        })
        .collect();
    Ok(Strata {
        strata,
        groups: Vec::new(),
    })
}

fn nested(dataset: &Dataset, metadata: &Metadata, outer: &str, inner: &str) -> Result<Strata> {
    let (outer_levels, outer_codes) = grouping(dataset, metadata, outer)?;
    let (inner_levels, inner_codes) = grouping(dataset, metadata, inner)?;

    let mut strata = Vec::with_capacity(outer_levels.len() * inner_levels.len());
    let mut groups = Vec::with_capacity(outer_levels.len());
    for (o, outer_level) in outer_levels.iter().enumerate() {
        for (i, inner_level) in inner_levels.iter().enumerate() {
            let rows = (0..outer_codes.len())
                .filter(|&r| outer_codes[r] == Some(o) && inner_codes[r] == Some(i))
                .collect();
            strata.push(Stratum {
                name: format!("{}.{}", outer_level, inner_level),
                label: inner_level.clone(),
                rows,
                group: Some(o),
                kind: StratumKind::Leaf,
            });
        }
        groups.push(StratumGroup {
            label: outer_level.clone(),
            span: inner_levels.len(),
        });
    }
    Ok(Strata { strata, groups })
}

fn rows_where(codes: &[Option<usize>], pred: impl Fn(usize) -> bool) -> Vec<usize> {
    codes
        .iter()
        .enumerate()
        .filter_map(|(r, c)| c.filter(|&c| pred(c)).map(|_| r))
        .collect()
}

fn validate_custom(custom: &CustomStrata, len: usize) -> Result<()> {
    for (name, rows) in &custom.strata {
        if let Some(&index) = rows.iter().find(|&&r| r >= len) {
            return Err(TableOneError::StratumIndexOutOfRange {
                stratum: name.clone(),
                index,
                len,
            });
        }
    }
    match &custom.groupspan {
        Some(spans) => {
            if spans.len() != custom.group_labels.len() {
                return Err(TableOneError::GroupLabelMismatch {
                    spans: spans.len(),
                    labels: custom.group_labels.len(),
                });
            }
            let covered: usize = spans.iter().sum();
            if covered != custom.strata.len() {
                return Err(TableOneError::GroupSpanMismatch {
                    expected: custom.strata.len(),
                    found: covered,
                });
            }
        }
        None if !custom.group_labels.is_empty() => {
            return Err(TableOneError::GroupLabelMismatch {
                spans: 0,
                labels: custom.group_labels.len(),
            });
        }
        None => {}
    }
    Ok(())
}

fn custom_strata(custom: &CustomStrata) -> Strata {
    let owners: Vec<Option<usize>> = match &custom.groupspan {
        Some(spans) => spans
            .iter()
            .enumerate()
            .flat_map(|(g, &span)| std::iter::repeat_n(Some(g), span))
            .collect(),
        None => vec![None; custom.strata.len()],
    };
    let strata = custom
        .strata
        .iter()
        .zip(owners)
        .map(|((name, rows), group)| {
            let mut rows = rows.clone();
            rows.sort_unstable();
            Stratum {
                name: name.clone(),
                label: name.clone(),
                rows,
                group,
                kind: StratumKind::Leaf,
            }
        })
        .collect();
    let groups = custom
        .group_labels
        .iter()
        .zip(custom.groupspan.iter().flatten())
        .map(|(label, &span)| StratumGroup {
            label: label.clone(),
            span,
        })
        .collect();
    Strata { strata, groups }
}

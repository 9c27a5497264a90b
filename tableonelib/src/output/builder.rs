//! Table assembly.
//!
//! The data flow is:
//! 1. Resolve every requested variable (fail fast on unknown names)
//! 2. Build strata
//! 3. Render each (variable, stratum) pair through the dispatcher
//! 4. Zip the rendered rows across strata into a `TableModel`
//! 5. Optionally transpose

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::data::{Dataset, Metadata, PercentMode, StatFormatter, Values, VariableSpec};
use crate::error::TableOneError;
use crate::query::{build_strata, ExtraInput, Strata, StrataSource, StratumKind, TableOptions};
use crate::render::{RenderDispatcher, RenderInput, StatBlock};
use crate::Result;

use super::table::{HeaderCell, HeaderGroup, HeaderKind, TableModel};

/// What to tabulate: the variables (rows) and the stratification (columns).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRequest {
    pub variables: Vec<String>,
    #[serde(default)]
    pub strata: StrataSource,
}

impl TableRequest {
    pub fn new<S: Into<String>>(variables: impl IntoIterator<Item = S>) -> Self {
        Self {
            variables: variables.into_iter().map(Into::into).collect(),
            strata: StrataSource::default(),
        }
    }

    /// Stratify by one grouping variable.
    pub fn by(mut self, variable: impl Into<String>) -> Self {
        self.strata = StrataSource::by(variable);
        self
    }

    /// Stratify by two nested grouping variables, outer first.
    pub fn nested(mut self, outer: impl Into<String>, inner: impl Into<String>) -> Self {
        self.strata = StrataSource::nested(outer, inner);
        self
    }

    pub fn strata(mut self, strata: StrataSource) -> Self {
        self.strata = strata;
        self
    }
}

/// Builds tables from one dataset.
#[derive(Debug, Clone, Copy)]
pub struct TableBuilder<'a> {
    dataset: &'a Dataset,
    metadata: &'a Metadata,
    options: &'a TableOptions,
}

impl<'a> TableBuilder<'a> {
    pub fn new(dataset: &'a Dataset, metadata: &'a Metadata, options: &'a TableOptions) -> Self {
        Self {
            dataset,
            metadata,
            options,
        }
    }

    /// Build the table for a request.
    ///
    /// Configuration errors abort the build; no partial table is returned.
    pub fn build(&self, request: &TableRequest) -> Result<TableModel> {
        let formatter = self.options.formatter()?;
        let variables = request
            .variables
            .iter()
            .map(|name| VariableSpec::resolve(self.dataset, self.metadata, name))
            .collect::<Result<Vec<_>>>()?;
        debug!(variables = variables.len(), "resolved variables");

        let strata = build_strata(
            self.dataset,
            self.metadata,
            &request.strata,
            self.options.overall.as_ref(),
        )?;

        let mut table = TableModel {
            caption: self.options.caption.clone(),
            footnote: self.options.footnote.clone(),
            topclass: self.options.topclass.clone(),
            columns: self.column_headers(&strata),
            column_groups: column_groups(&strata, self.options.extra_columns.len()),
            ..TableModel::default()
        };

        let dispatcher = RenderDispatcher::new(&self.options.render);
        for variable in &variables {
            self.add_variable(&mut table, &dispatcher, variable, &strata, formatter)?;
        }
        debug!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            "assembled table"
        );

        if self.options.transpose {
            table = table.transpose();
        }
        Ok(table)
    }

    fn column_headers(&self, strata: &Strata) -> Vec<HeaderCell> {
        let stratum_cells = strata.strata.iter().map(|s| {
            let kind = match s.kind {
                StratumKind::Leaf => HeaderKind::Stratum,
                StratumKind::Overall => HeaderKind::Overall,
            };
            let cell = HeaderCell::new(s.label.clone(), kind);
            if self.options.show_n {
                cell.with_n(s.n())
            } else {
                cell
            }
        });
        let extra_cells = self
            .options
            .extra_columns
            .iter()
            .map(|c| HeaderCell::new(c.name.clone(), HeaderKind::Extra));
        stratum_cells.chain(extra_cells).collect()
    }

    fn add_variable(
        &self,
        table: &mut TableModel,
        dispatcher: &RenderDispatcher<'_>,
        variable: &VariableSpec,
        strata: &Strata,
        formatter: StatFormatter,
    ) -> Result<()> {
        let renderer = dispatcher.resolve(variable);
        trace!(variable = %variable.name, source = ?renderer.source, "resolved renderer");

        let values: Vec<(String, Values<'_>)> = strata
            .strata
            .iter()
            .map(|s| (s.name.clone(), variable.subset(&s.rows)))
            .collect();
        let row_totals = match self.options.percent_mode {
            PercentMode::Row => row_totals(variable, strata),
            PercentMode::Column => vec![None; values.len()],
        };

        let blocks = values
            .iter()
            .zip(&row_totals)
            .map(|((stratum, values), totals)| {
                let input = RenderInput {
                    variable,
                    stratum,
                    values,
                    formatter,
                    percent_mode: self.options.percent_mode,
                    row_totals: totals.as_deref(),
                    missing_label: &self.options.missing_label,
                    undefined_label: &self.options.undefined_label,
                };
                renderer.render(&input)
            })
            .collect::<Vec<StatBlock>>();
        let labels = check_alignment(variable, strata, &blocks)?;

        // an unlabelled first row sits beside the variable label
        let merge = labels.first().is_some_and(|l| l.is_empty());
        let n_rows = 1 + labels.len() - usize::from(merge);

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(n_rows);
        if !merge {
            rows.push(vec![String::new(); blocks.len()]);
        }
        for i in 0..labels.len() {
            rows.push(blocks.iter().map(|b| b[i].value.clone()).collect());
        }

        if !self.options.extra_columns.is_empty() {
            let leaves: Vec<(String, Values<'_>)> = strata
                .strata
                .iter()
                .zip(&values)
                .filter(|(s, _)| !s.is_overall())
                .map(|(_, v)| v.clone())
                .collect();
            let input = ExtraInput {
                variable,
                strata: &leaves,
                rows: n_rows,
                formatter,
            };
            for column in &self.options.extra_columns {
                let extra = column.call(&input);
                if extra.len() != n_rows {
                    return Err(TableOneError::ExtraColumnRowMismatch {
                        column: column.name.clone(),
                        variable: variable.name.clone(),
                        expected: n_rows,
                        found: extra.len(),
                    });
                }
                for (row, value) in rows.iter_mut().zip(extra) {
                    row.push(value);
                }
            }
        }

        let label = variable.display_label();
        table.rows.push(HeaderCell::new(label.clone(), HeaderKind::Variable));
        table.rows.extend(
            labels
                .iter()
                .skip(usize::from(merge))
                .map(|l| HeaderCell::new(l.clone(), HeaderKind::Statistic)),
        );
        table.row_groups.push(HeaderGroup::new(label, n_rows));
        table.cells.extend(rows);
        trace!(variable = %variable.name, rows = n_rows, "added variable");
        Ok(())
    }
}

/// Build a table in one call.
///
/// # Example
///
/// ```rust
/// use tableonelib::data::{Dataset, Metadata};
/// use tableonelib::output::{build_table, TableRequest};
/// use tableonelib::query::TableOptions;
///
/// let ds = Dataset::new()
///     .numeric("age", vec![Some(20.0), Some(30.0), Some(40.0)])
///     .unwrap()
///     .text("arm", &[Some("A"), Some("A"), Some("B")])
///     .unwrap();
/// let table = build_table(
///     &ds,
///     &Metadata::new(),
///     &TableRequest::new(["age"]).by("arm"),
///     &TableOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(table.get("Mean (SD)", "A"), Some("25.0 (7.1)"));
/// ```
pub fn build_table(
    dataset: &Dataset,
    metadata: &Metadata,
    request: &TableRequest,
    options: &TableOptions,
) -> Result<TableModel> {
    TableBuilder::new(dataset, metadata, options).build(request)
}

/// Row labels shared by every stratum's block, or a `RowCountMismatch`.
fn check_alignment(
    variable: &VariableSpec,
    strata: &Strata,
    blocks: &[StatBlock],
) -> Result<Vec<String>> {
    let Some(first) = blocks.first() else {
        return Ok(Vec::new());
    };
    for (stratum, block) in strata.strata.iter().zip(blocks) {
        if block.len() != first.len() {
            return Err(TableOneError::RowCountMismatch {
                variable: variable.name.clone(),
                stratum: stratum.name.clone(),
                expected: first.len(),
                found: block.len(),
            });
        }
    }
    Ok(first.iter().map(|row| row.label.clone()).collect())
}

/// Row-percent denominators for each stratum, in column order.
///
/// Leaf strata share the per-level counts over all leaves. The overall
/// stratum divides by its own counts, which also hold records with a
/// missing grouping value, so it never exceeds 100%.
fn row_totals(variable: &VariableSpec, strata: &Strata) -> Vec<Option<Vec<usize>>> {
    let leaves = level_counts(variable, strata.leaves().flat_map(|s| &s.rows));
    strata
        .strata
        .iter()
        .map(|s| {
            if s.is_overall() {
                level_counts(variable, &s.rows)
            } else {
                leaves.clone()
            }
        })
        .collect()
}

/// Per-level record counts over `rows`.
fn level_counts<'r>(
    variable: &VariableSpec,
    rows: impl IntoIterator<Item = &'r usize>,
) -> Option<Vec<usize>> {
    let codes = variable.codes()?;
    let mut counts = vec![0; variable.levels.len()];
    for code in rows.into_iter().filter_map(|&r| codes.get(r).copied().flatten()) {
        if let Some(count) = counts.get_mut(code) {
            *count += 1;
        }
    }
    Some(counts)
}

/// Spans over the columns, present only for grouped strata. Strata without
/// a group (overall) and extra columns get uncaptioned spans of one.
fn column_groups(strata: &Strata, extra_columns: usize) -> Vec<HeaderGroup> {
    if !strata.is_nested() {
        return Vec::new();
    }
    let mut groups: Vec<HeaderGroup> = Vec::new();
    let mut current = None;
    for stratum in &strata.strata {
        match (stratum.group, groups.last_mut()) {
            (Some(g), Some(last)) if current == Some(g) => last.span += 1,
            (Some(g), _) => {
                let label = strata.groups.get(g).map(|grp| grp.label.clone()).unwrap_or_default();
                groups.push(HeaderGroup::new(label, 1));
            }
            (None, _) => groups.push(HeaderGroup::blank(1)),
        }
        current = stratum.group;
    }
    groups.extend((0..extra_columns).map(|_| HeaderGroup::blank(1)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CustomStrata, ExtraColumn, Overall};
    use crate::render::{RenderConfig, RenderSpec, StatRow};

    fn dataset() -> Dataset {
        Dataset::new()
            .numeric("age", vec![Some(20.0), Some(30.0), None, Some(40.0)])
            .unwrap()
            .text("sex", &[Some("F"), Some("M"), Some("M"), Some("F")])
            .unwrap()
            .text("arm", &[Some("A"), Some("A"), Some("B"), Some("B")])
            .unwrap()
    }

    fn build(request: TableRequest, options: TableOptions) -> Result<TableModel> {
        build_table(&dataset(), &Metadata::new(), &request, &options)
    }

    #[test]
    fn test_default_layout() {
        let table = build(
            TableRequest::new(["age", "sex"]).by("arm"),
            TableOptions::new().overall(Overall::default()),
        )
        .unwrap();
        table.validate().unwrap();

        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "B", "Overall"]);
        assert_eq!(table.columns[0].n, Some(2));
        assert_eq!(table.columns[2].kind, HeaderKind::Overall);

        let rows: Vec<_> = table.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            rows,
            vec!["age", "Mean (SD)", "Median [Min, Max]", "Missing", "sex", "F", "M"]
        );
        assert_eq!(
            table.row_groups,
            vec![HeaderGroup::new("age", 4), HeaderGroup::new("sex", 3)]
        );
        // label rows of default renders are blank
        assert_eq!(table.cells[0], vec!["", "", ""]);
        assert_eq!(table.get("Missing", "A"), Some("0 (0.0%)"));
        assert_eq!(table.get("Missing", "B"), Some("1 (50.0%)"));
        assert_eq!(table.get("Mean (SD)", "Overall"), Some("30.0 (10.0)"));
        assert_eq!(table.get("F", "B"), Some("1 (50.0%)"));
        assert!(table.column_groups.is_empty());
    }

    #[test]
    fn test_unknown_variable_fails_fast() {
        let err = build(TableRequest::new(["age", "weight"]).by("arm"), TableOptions::new())
            .unwrap_err();
        assert_eq!(err, TableOneError::VariableNotFound("weight".to_string()));
    }

    #[test]
    fn test_unlabelled_first_row_merges_into_label_row() {
        let render = RenderConfig::new().continuous(RenderSpec::abbrev(&[("", "MEAN")]));
        let table = build(
            TableRequest::new(["age"]).by("arm"),
            TableOptions::new().render(render),
        )
        .unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.cells[0], vec!["25.0", "40.0"]);
        assert_eq!(table.rows[1].label, "Missing");
    }

    #[test]
    fn test_inconsistent_render_rows() {
        let render = RenderConfig::new().variable(
            "age",
            RenderSpec::function(|input| {
                (0..input.values.len()).map(|i| StatRow::new(i.to_string(), "")).collect()
            }),
        );
        let err = build(
            TableRequest::new(["age"]).strata(StrataSource::Custom(
                CustomStrata::new().stratum("one", vec![0]).stratum("two", vec![1, 2]),
            )),
            TableOptions::new().render(render),
        )
        .unwrap_err();
        assert_eq!(
            err,
            TableOneError::RowCountMismatch {
                variable: "age".to_string(),
                stratum: "two".to_string(),
                expected: 1,
                found: 2,
            }
        );
    }

    #[test]
    fn test_extra_column_sees_leaf_strata() {
        let extra = ExtraColumn::label_row("strata", |input| {
            input
                .strata
                .iter()
                .map(|(name, values)| format!("{}={}", name, values.len()))
                .collect::<Vec<_>>()
                .join(",")
        });
        let table = build(
            TableRequest::new(["sex"]).by("arm"),
            TableOptions::new().overall(Overall::left("All")).extra_column(extra),
        )
        .unwrap();
        table.validate().unwrap();
        assert_eq!(table.columns[3].kind, HeaderKind::Extra);
        assert_eq!(table.get("sex", "strata"), Some("A=2,B=2"));
        assert_eq!(table.get("F", "strata"), Some(""));
    }

    #[test]
    fn test_row_percentages() {
        let table = build(
            TableRequest::new(["sex"]).by("arm"),
            TableOptions::new()
                .overall(Overall::default())
                .percent_mode(PercentMode::Row),
        )
        .unwrap();
        assert_eq!(table.get("F", "A"), Some("1 (50.0%)"));
        assert_eq!(table.get("M", "B"), Some("1 (50.0%)"));
        assert_eq!(table.get("F", "Overall"), Some("2 (100.0%)"));
    }

    #[test]
    fn test_row_percentages_overall_counts_ungrouped_records() {
        let ds = Dataset::new()
            .text("arm", &[Some("A"), Some("B"), None])
            .unwrap()
            .text("sex", &[Some("F"), Some("F"), Some("F")])
            .unwrap();
        let table = build_table(
            &ds,
            &Metadata::new(),
            &TableRequest::new(["sex"]).by("arm"),
            &TableOptions::new()
                .overall(Overall::default())
                .percent_mode(PercentMode::Row),
        )
        .unwrap();
        assert_eq!(table.get("F", "A"), Some("1 (50.0%)"));
        assert_eq!(table.get("F", "B"), Some("1 (50.0%)"));
        assert_eq!(table.get("F", "Overall"), Some("3 (100.0%)"));
    }

    #[test]
    fn test_sparse_strata_render_placeholders() {
        let levels = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let ds = Dataset::new()
            .categorical("arm", levels, &[Some("A"), Some("A"), Some("A"), Some("B")])
            .unwrap()
            .numeric("age", vec![Some(20.0), Some(30.0), None, Some(40.0)])
            .unwrap()
            .text("sex", &[Some("F"), Some("M"), None, Some("F")])
            .unwrap();
        let request = TableRequest::new(["age", "sex"]).by("arm");
        let table = build_table(&ds, &Metadata::new(), &request, &TableOptions::new()).unwrap();
        table.validate().unwrap();

        assert_eq!(table.columns[2].n, Some(0));
        assert_eq!(table.get("Mean (SD)", "A"), Some("25.0 (7.1)"));
        assert_eq!(table.get("Mean (SD)", "B"), Some("40.0 (NA)"));
        assert_eq!(table.get("Mean (SD)", "C"), Some(""));
        assert_eq!(table.get("Missing", "B"), Some("0 (0.0%)"));
        assert_eq!(table.get("Missing", "C"), Some(""));
        assert_eq!(table.get("F", "B"), Some("1 (100.0%)"));
        assert_eq!(table.get("F", "C"), Some(""));
        assert_eq!(table.get("M", "C"), Some(""));

        let options = TableOptions::new().undefined_label("-");
        let table = build_table(&ds, &Metadata::new(), &request, &options).unwrap();
        assert_eq!(table.get("Mean (SD)", "B"), Some("40.0 (-)"));
    }

    #[test]
    fn test_nested_column_groups() {
        let table = build(
            TableRequest::new(["age"]).nested("arm", "sex"),
            TableOptions::new()
                .overall(Overall::default())
                .extra_column(ExtraColumn::label_row("p", |_| String::new())),
        )
        .unwrap();
        table.validate().unwrap();
        assert_eq!(
            table.column_groups,
            vec![
                HeaderGroup::new("A", 2),
                HeaderGroup::new("B", 2),
                HeaderGroup::blank(1),
                HeaderGroup::blank(1),
            ]
        );
    }

    #[test]
    fn test_decorations_and_without_n() {
        let table = build(
            TableRequest::new(["age"]),
            TableOptions::new()
                .without_n()
                .caption("Table 1")
                .footnote("note")
                .topclass("zebra"),
        )
        .unwrap();
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.columns[0].label, "Overall");
        assert_eq!(table.columns[0].n, None);
        assert_eq!(table.caption.as_deref(), Some("Table 1"));
        assert_eq!(table.footnote.as_deref(), Some("note"));
        assert_eq!(table.topclass.as_deref(), Some("zebra"));
    }

    #[test]
    fn test_transpose_option() {
        let request = TableRequest::new(["age"]).by("arm");
        let plain = build(request.clone(), TableOptions::new()).unwrap();
        let flipped = build(request, TableOptions::new().transpose(true)).unwrap();
        assert!(flipped.transposed);
        assert_eq!(flipped, plain.transpose());
    }
}

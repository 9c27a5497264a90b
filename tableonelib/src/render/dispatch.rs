//! Render resolution: which function turns a variable's values into rows.
//!
//! A render function takes one variable's values in one stratum and returns
//! a [`StatBlock`], an ordered list of `(label, value)` rows. A row with an
//! empty label placed first is shown beside the variable's own label.
//!
//! Render overrides are configured as [`RenderSpec`]s and resolved once per
//! variable by [`RenderDispatcher`], with this precedence:
//!
//! 1. a spec for the exact variable name
//! 2. the unified override (both kinds)
//! 3. the kind-specific override (continuous or categorical)
//! 4. the default renderer for the kind

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::{
    missing_stats, CategoricalStats, ContinuousStats, PercentMode, StatFormatter, StatMap, Values,
    VariableKind, VariableSpec,
};

use super::abbrev::{compile, AbbrevCode, CompiledCode};

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRow {
    pub label: String,
    pub value: String,
}

impl StatRow {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Rows produced for one (variable, stratum) pair.
pub type StatBlock = Vec<StatRow>;

/// Everything a render function gets to see.
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub variable: &'a VariableSpec,
    /// Name of the stratum being rendered
    pub stratum: &'a str,
    pub values: &'a Values<'a>,
    pub formatter: StatFormatter,
    pub percent_mode: PercentMode,
    /// Per-level totals across leaf strata, used for row percentages
    pub row_totals: Option<&'a [usize]>,
    /// Label of the missing row
    pub missing_label: &'a str,
    /// Stand-in for undefined keywords in partially defined codes
    pub undefined_label: &'a str,
}

impl RenderInput<'_> {
    /// Name of the variable being rendered.
    pub fn name(&self) -> &str {
        &self.variable.name
    }

    /// Whether the variable has missing values anywhere in the dataset.
    ///
    /// Decided over the whole dataset, not the stratum, so every stratum
    /// renders the same rows.
    pub fn has_missing(&self) -> bool {
        self.variable.has_missing()
    }

    /// Formatted statistics, or `None` for categorical values.
    pub fn continuous_stats(&self) -> Option<StatMap> {
        match self.values {
            Values::Continuous(v) => Some(self.formatter.continuous(&ContinuousStats::compute(v))),
            Values::Categorical { .. } => None,
        }
    }

    /// Raw level counts, or `None` for continuous values.
    pub fn categorical_raw(&self) -> Option<CategoricalStats> {
        match self.values {
            Values::Categorical { levels, codes } => {
                let totals = match self.percent_mode {
                    PercentMode::Column => None,
                    PercentMode::Row => self.row_totals,
                };
                Some(CategoricalStats::compute(codes, levels, totals))
            }
            Values::Continuous(_) => None,
        }
    }

    /// Formatted statistics per declared level; empty for continuous values.
    pub fn level_stats(&self) -> Vec<(String, StatMap)> {
        self.categorical_raw()
            .map(|stats| self.formatter.categorical(&stats))
            .unwrap_or_default()
    }

    /// Formatted statistics of the missing pseudo-level.
    ///
    /// PCT is the share of all records in the stratum.
    pub fn missing_stats(&self) -> StatMap {
        let total = self.values.len();
        let nmiss = self.values.missing();
        let missing = missing_stats(self.missing_label, nmiss, total);
        self.formatter.missing(&missing, total - nmiss)
    }
}

/// A custom render function.
#[derive(Clone)]
pub struct RenderFn(Arc<dyn Fn(&RenderInput<'_>) -> StatBlock + Send + Sync>);

impl RenderFn {
    pub fn new(f: impl Fn(&RenderInput<'_>) -> StatBlock + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self, input: &RenderInput<'_>) -> StatBlock {
        (self.0)(input)
    }
}

impl fmt::Debug for RenderFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RenderFn(..)")
    }
}

/// How to render a variable.
#[derive(Debug, Clone, Default)]
pub enum RenderSpec {
    /// A custom function; it is responsible for its own missing row
    Function(RenderFn),
    /// Abbreviated codes, followed by the missing row when needed
    Abbrev(AbbrevCode),
    /// The default renderer for the variable's kind
    #[default]
    Default,
}

impl RenderSpec {
    pub fn function(f: impl Fn(&RenderInput<'_>) -> StatBlock + Send + Sync + 'static) -> Self {
        RenderSpec::Function(RenderFn::new(f))
    }

    pub fn abbrev<L: AsRef<str>, C: AsRef<str>>(codes: &[(L, C)]) -> Self {
        RenderSpec::Abbrev(compile(codes))
    }
}

/// Render overrides.
#[derive(Debug, Clone, Default)]
pub struct RenderConfig {
    /// Applies to both kinds
    pub unified: Option<RenderSpec>,
    pub continuous: Option<RenderSpec>,
    pub categorical: Option<RenderSpec>,
    /// Per-variable overrides, keyed by variable name
    pub variables: BTreeMap<String, RenderSpec>,
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unified(mut self, spec: RenderSpec) -> Self {
        self.unified = Some(spec);
        self
    }

    pub fn continuous(mut self, spec: RenderSpec) -> Self {
        self.continuous = Some(spec);
        self
    }

    pub fn categorical(mut self, spec: RenderSpec) -> Self {
        self.categorical = Some(spec);
        self
    }

    pub fn variable(mut self, name: impl Into<String>, spec: RenderSpec) -> Self {
        self.variables.insert(name.into(), spec);
        self
    }
}

/// Where a resolved renderer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderSource {
    Variable,
    Unified,
    Kind,
    Default,
}

/// A render function resolved for one variable.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub source: RenderSource,
    spec: RenderSpec,
}

impl Renderer {
    pub fn render(&self, input: &RenderInput<'_>) -> StatBlock {
        match &self.spec {
            RenderSpec::Function(f) => f.call(input),
            RenderSpec::Abbrev(code) => with_missing(code.render(input), input),
            RenderSpec::Default => with_missing(default_render(input), input),
        }
    }
}

/// Resolves render overrides per variable.
#[derive(Debug, Clone, Copy)]
pub struct RenderDispatcher<'a> {
    config: &'a RenderConfig,
}

impl<'a> RenderDispatcher<'a> {
    pub fn new(config: &'a RenderConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, variable: &VariableSpec) -> Renderer {
        let kind_spec = match variable.kind {
            VariableKind::Continuous => self.config.continuous.as_ref(),
            VariableKind::Categorical => self.config.categorical.as_ref(),
        };
        let (source, spec) = if let Some(spec) = self.config.variables.get(&variable.name) {
            (RenderSource::Variable, spec.clone())
        } else if let Some(spec) = &self.config.unified {
            (RenderSource::Unified, spec.clone())
        } else if let Some(spec) = kind_spec {
            (RenderSource::Kind, spec.clone())
        } else {
            (RenderSource::Default, RenderSpec::Default)
        };
        Renderer { source, spec }
    }
}

/// Codes of the default continuous renderer.
pub const DEFAULT_CONTINUOUS: [(&str, &str); 2] =
    [(".", "Mean (SD)"), (".", "Median [Min, Max]")];

/// Code of the default categorical renderer, applied per level.
pub const DEFAULT_CATEGORICAL: (&str, &str) = (".", "FREQ (PCT%)");

/// Code of the missing row.
pub const MISSING_CODE: &str = "FREQ (PCT%)";

/// Default rows: an empty first row beside the variable label, then
/// "Mean (SD)" and "Median [Min, Max]" for continuous data, or one
/// "FREQ (PCT%)" row per level for categorical data.
pub fn default_render(input: &RenderInput<'_>) -> StatBlock {
    let mut rows = vec![StatRow::new("", "")];
    let code = match input.variable.kind {
        VariableKind::Continuous => compile(&DEFAULT_CONTINUOUS),
        VariableKind::Categorical => compile(&[DEFAULT_CATEGORICAL]),
    };
    rows.extend(code.render(input));
    rows
}

/// Missing row: "FREQ (PCT%)" of missing values.
pub fn render_missing(input: &RenderInput<'_>) -> StatRow {
    let code = CompiledCode::new(input.missing_label, MISSING_CODE);
    StatRow::new(
        code.label(),
        code.apply_with(&input.missing_stats(), input.undefined_label),
    )
}

fn with_missing(mut rows: StatBlock, input: &RenderInput<'_>) -> StatBlock {
    if input.has_missing() {
        rows.push(render_missing(input));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Dataset, Metadata};

    fn dataset() -> Dataset {
        Dataset::new()
            .numeric("age", vec![Some(20.0), Some(30.0), None, Some(40.0)])
            .unwrap()
            .numeric("bmi", vec![Some(20.0), Some(22.0), Some(24.0), Some(26.0)])
            .unwrap()
            .text("sex", &[Some("F"), Some("M"), Some("M"), Some("M")])
            .unwrap()
    }

    fn input<'a>(var: &'a VariableSpec, values: &'a Values<'a>) -> RenderInput<'a> {
        RenderInput {
            variable: var,
            stratum: "all",
            values,
            formatter: StatFormatter::new(3),
            percent_mode: PercentMode::Column,
            row_totals: None,
            missing_label: "Missing",
            undefined_label: "NA",
        }
    }

    fn render(config: &RenderConfig, name: &str) -> (RenderSource, StatBlock) {
        let ds = dataset();
        let var = VariableSpec::resolve(&ds, &Metadata::new(), name).unwrap();
        let values = var.subset(&[0, 1, 2, 3]);
        let renderer = RenderDispatcher::new(config).resolve(&var);
        let rows = renderer.render(&input(&var, &values));
        (renderer.source, rows)
    }

    #[test]
    fn test_default_continuous_with_missing() {
        let (source, rows) = render(&RenderConfig::new(), "age");
        assert_eq!(source, RenderSource::Default);
        assert_eq!(
            rows,
            vec![
                StatRow::new("", ""),
                StatRow::new("Mean (SD)", "30.0 (10.0)"),
                StatRow::new("Median [Min, Max]", "30.0 [20.0, 40.0]"),
                StatRow::new("Missing", "1 (25.0%)"),
            ]
        );
    }

    #[test]
    fn test_default_continuous_without_missing() {
        let (_, rows) = render(&RenderConfig::new(), "bmi");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].value, "23.0 (2.6)");
    }

    #[test]
    fn test_default_categorical() {
        let (_, rows) = render(&RenderConfig::new(), "sex");
        assert_eq!(
            rows,
            vec![
                StatRow::new("", ""),
                StatRow::new("F", "1 (25.0%)"),
                StatRow::new("M", "3 (75.0%)"),
            ]
        );
    }

    #[test]
    fn test_variable_override_wins() {
        let config = RenderConfig::new()
            .unified(RenderSpec::abbrev(&[(".", "N")]))
            .continuous(RenderSpec::abbrev(&[(".", "MEAN")]))
            .variable("age", RenderSpec::abbrev(&[("Range", "MIN-MAX")]));
        let (source, rows) = render(&config, "age");
        assert_eq!(source, RenderSource::Variable);
        assert_eq!(rows[0], StatRow::new("Range", "20.0-40.0"));
        // abbreviated codes still get the missing row
        assert_eq!(rows[1].label, "Missing");
    }

    #[test]
    fn test_unified_before_kind() {
        let config = RenderConfig::new()
            .unified(RenderSpec::abbrev(&[(".", "N")]))
            .continuous(RenderSpec::abbrev(&[(".", "MEAN")]));
        let (source, rows) = render(&config, "bmi");
        assert_eq!(source, RenderSource::Unified);
        assert_eq!(rows, vec![StatRow::new("N", "4")]);
    }

    #[test]
    fn test_kind_override() {
        let config = RenderConfig::new()
            .continuous(RenderSpec::abbrev(&[(".", "MEAN")]))
            .categorical(RenderSpec::abbrev(&[(".", "FREQ")]));
        let (source, rows) = render(&config, "bmi");
        assert_eq!(source, RenderSource::Kind);
        assert_eq!(rows, vec![StatRow::new("MEAN", "23.0")]);

        let (_, rows) = render(&config, "sex");
        assert_eq!(rows, vec![StatRow::new("F", "1"), StatRow::new("M", "3")]);
    }

    #[test]
    fn test_function_render() {
        let config = RenderConfig::new().unified(RenderSpec::function(|input| {
            vec![StatRow::new(
                format!("{} in {}", input.name(), input.stratum),
                input.values.len().to_string(),
            )]
        }));
        let (source, rows) = render(&config, "age");
        assert_eq!(source, RenderSource::Unified);
        // functions own their rows: no automatic missing row
        assert_eq!(rows, vec![StatRow::new("age in all", "4")]);
    }
}

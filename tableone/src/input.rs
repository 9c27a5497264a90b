//! The JSON request document.
//!
//! ```json
//! {
//!   "data": { "age": [20, 31.5, null], "arm": ["A", "B", "A"], "smoker": [true, false, null] },
//!   "metadata": { "age": { "label": "Age", "units": "years" } },
//!   "variables": ["age", "smoker"],
//!   "strata": ["arm"],
//!   "options": { "overall": { "label": "Total", "placement": "left" }, "digits": 3 },
//!   "render": { "continuous": [["", "Mean (SD)"], "Median [Q1, Q3]"] }
//! }
//! ```
//!
//! Columns are typed by their values: numbers (or all nulls) are continuous,
//! booleans logical, strings categorical. Render overrides are abbreviated
//! codes, either a bare code (labelled by itself) or a `[label, code]` pair.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tableonelib::data::{Dataset, Metadata, PercentMode};
use tableonelib::output::TableRequest;
use tableonelib::query::{Overall, StrataSource, TableOptions};
use tableonelib::render::{RenderConfig, RenderSpec, CODE_AS_LABEL};

/// One column of raw values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawColumn {
    Numeric(Vec<Option<f64>>),
    Logical(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

/// Grouping variables, either as a plain list or a full strata source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawStrata {
    Variables(Vec<String>),
    Source(StrataSource),
}

impl Default for RawStrata {
    fn default() -> Self {
        RawStrata::Variables(Vec::new())
    }
}

impl From<&RawStrata> for StrataSource {
    fn from(raw: &RawStrata) -> Self {
        match raw {
            RawStrata::Variables(vars) => StrataSource::Variables(vars.clone()),
            RawStrata::Source(source) => source.clone(),
        }
    }
}

/// Data-only table options; anything left out keeps its default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawOptions {
    pub overall: Option<Overall>,
    pub digits: Option<usize>,
    pub digits_pct: Option<usize>,
    pub percent_mode: Option<PercentMode>,
    pub show_n: Option<bool>,
    pub missing_label: Option<String>,
    pub undefined_label: Option<String>,
    pub transpose: Option<bool>,
    pub topclass: Option<String>,
    pub caption: Option<String>,
    pub footnote: Option<String>,
}

/// An abbreviated code with or without an explicit label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawCode {
    Labelled(String, String),
    Code(String),
}

impl RawCode {
    fn pair(&self) -> (&str, &str) {
        match self {
            RawCode::Labelled(label, code) => (label.as_str(), code.as_str()),
            RawCode::Code(code) => (CODE_AS_LABEL, code.as_str()),
        }
    }
}

/// Render overrides expressed as abbreviated codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawRender {
    pub unified: Option<Vec<RawCode>>,
    pub continuous: Option<Vec<RawCode>>,
    pub categorical: Option<Vec<RawCode>>,
    pub variables: BTreeMap<String, Vec<RawCode>>,
}

fn abbrev(codes: &[RawCode]) -> RenderSpec {
    let pairs: Vec<(&str, &str)> = codes.iter().map(RawCode::pair).collect();
    RenderSpec::abbrev(&pairs)
}

impl RawRender {
    pub fn config(&self) -> RenderConfig {
        let mut config = RenderConfig::new();
        if let Some(codes) = &self.unified {
            config = config.unified(abbrev(codes));
        }
        if let Some(codes) = &self.continuous {
            config = config.continuous(abbrev(codes));
        }
        if let Some(codes) = &self.categorical {
            config = config.categorical(abbrev(codes));
        }
        for (name, codes) in &self.variables {
            config = config.variable(name.clone(), abbrev(codes));
        }
        config
    }
}

/// A complete table request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub data: BTreeMap<String, RawColumn>,
    #[serde(default)]
    pub metadata: Metadata,
    pub variables: Vec<String>,
    #[serde(default)]
    pub strata: RawStrata,
    #[serde(default)]
    pub options: RawOptions,
    #[serde(default)]
    pub render: RawRender,
}

impl Request {
    /// Read a request from a file, or from stdin when `path` is `-`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = if path.as_os_str() == "-" {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read request from stdin")?;
            text
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read request {}", path.display()))?
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("invalid request document")
    }

    pub fn dataset(&self) -> tableonelib::Result<Dataset> {
        self.data
            .iter()
            .try_fold(Dataset::new(), |ds, (name, column)| match column {
                RawColumn::Numeric(values) => ds.numeric(name, values.clone()),
                RawColumn::Logical(values) => ds.logical(name, values.clone()),
                RawColumn::Text(values) => ds.text(name, values),
            })
    }

    pub fn table_request(&self) -> TableRequest {
        TableRequest::new(self.variables.iter().cloned()).strata((&self.strata).into())
    }

    pub fn options(&self) -> TableOptions {
        let raw = &self.options;
        let mut options = TableOptions::new().render(self.render.config());
        if let Some(overall) = &raw.overall {
            options = options.overall(overall.clone());
        }
        if let Some(digits) = raw.digits {
            options = options.digits(digits);
        }
        if let Some(digits_pct) = raw.digits_pct {
            options = options.digits_pct(digits_pct);
        }
        if let Some(mode) = raw.percent_mode {
            options = options.percent_mode(mode);
        }
        if raw.show_n == Some(false) {
            options = options.without_n();
        }
        if let Some(label) = &raw.missing_label {
            options = options.missing_label(label.clone());
        }
        if let Some(label) = &raw.undefined_label {
            options = options.undefined_label(label.clone());
        }
        if let Some(transpose) = raw.transpose {
            options = options.transpose(transpose);
        }
        if let Some(topclass) = &raw.topclass {
            options = options.topclass(topclass.clone());
        }
        if let Some(caption) = &raw.caption {
            options = options.caption(caption.clone());
        }
        if let Some(footnote) = &raw.footnote {
            options = options.footnote(footnote.clone());
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tableonelib::query::Placement;
    use tableonelib::render::RenderSource;
    use tableonelib::{ColumnData, RenderDispatcher, VariableSpec};

    const REQUEST: &str = r#"{
        "data": {
            "age": [20, 31.5, null],
            "arm": ["A", "B", "A"],
            "smoker": [true, false, null],
            "empty": [null, null, null]
        },
        "metadata": { "age": { "label": "Age", "units": "years" } },
        "variables": ["age", "smoker"],
        "strata": ["arm"],
        "options": {
            "overall": { "label": "Total", "placement": "left" },
            "digits": 4,
            "percent_mode": "row",
            "show_n": false,
            "undefined_label": "-",
            "caption": "Table 1"
        },
        "render": {
            "continuous": [["", "Mean (SD)"], "Median [Q1, Q3]"],
            "variables": { "smoker": ["FREQ"] }
        }
    }"#;

    #[test]
    fn test_parse_columns() {
        let request = Request::parse(REQUEST).unwrap();
        let ds = request.dataset().unwrap();
        assert_eq!(ds.len(), 3);
        assert!(matches!(ds.require("age").unwrap().data, ColumnData::Numeric(_)));
        assert!(matches!(ds.require("empty").unwrap().data, ColumnData::Numeric(_)));
        assert!(matches!(ds.require("smoker").unwrap().data, ColumnData::Logical(_)));
        assert!(matches!(ds.require("arm").unwrap().data, ColumnData::Categorical { .. }));
    }

    #[test]
    fn test_strata_shorthand_and_full_form() {
        let request = Request::parse(REQUEST).unwrap();
        assert_eq!(request.table_request().strata, StrataSource::by("arm"));

        let full = r#"{ "data": {}, "variables": [], "strata": { "variables": ["a", "b"] } }"#;
        let request = Request::parse(full).unwrap();
        assert_eq!(request.table_request().strata, StrataSource::nested("a", "b"));
    }

    #[test]
    fn test_options() {
        let options = Request::parse(REQUEST).unwrap().options();
        let overall = options.overall.clone().unwrap();
        assert_eq!(overall.label, "Total");
        assert_eq!(overall.placement, Placement::Left);
        assert_eq!(options.digits, 4);
        assert_eq!(options.percent_mode, PercentMode::Row);
        assert!(!options.show_n);
        assert_eq!(options.undefined_label, "-");
        assert_eq!(options.caption.as_deref(), Some("Table 1"));
    }

    #[test]
    fn test_render_overrides() {
        let request = Request::parse(REQUEST).unwrap();
        let ds = request.dataset().unwrap();
        let config = request.render.config();
        let dispatcher = RenderDispatcher::new(&config);

        let age = VariableSpec::resolve(&ds, &request.metadata, "age").unwrap();
        assert_eq!(dispatcher.resolve(&age).source, RenderSource::Kind);
        let smoker = VariableSpec::resolve(&ds, &request.metadata, "smoker").unwrap();
        assert_eq!(dispatcher.resolve(&smoker).source, RenderSource::Variable);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let text = r#"{ "data": {}, "variables": [], "options": { "digitz": 2 } }"#;
        assert!(Request::parse(text).is_err());
    }

    #[test]
    fn test_column_length_mismatch() {
        let text = r#"{ "data": { "a": [1, 2], "b": [1] }, "variables": ["a"] }"#;
        let err = Request::parse(text).unwrap().dataset().unwrap_err();
        assert!(err.to_string().contains("'b'"));
    }
}

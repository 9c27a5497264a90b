//! Abbreviated render codes.
//!
//! An abbreviated code is a template such as `"Mean (SD)"` or
//! `"FREQ (PCT%)"`. Statistic keywords are matched case-insensitively on word
//! boundaries and replaced by the formatted statistic; everything else is
//! copied through unchanged.
//!
//! Each code comes with a row label. The label `"."` means "use the code
//! itself as the label", so `(".", "Median [Min, Max]")` yields a row
//! labelled `Median [Min, Max]`.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::data::{StatKey, StatMap};

use super::dispatch::{RenderInput, StatBlock, StatRow};

/// Row label placeholder meaning "label the row with its code".
pub const CODE_AS_LABEL: &str = ".";

/// Text standing in for an undefined keyword next to defined ones.
pub const DEFAULT_UNDEFINED_LABEL: &str = "NA";

/// A piece of a parsed code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Segment {
    Text(String),
    Stat(StatKey),
}

/// One compiled `(label, code)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCode {
    label: String,
    code: String,
    segments: Vec<Segment>,
}

impl CompiledCode {
    pub fn new(label: &str, code: &str) -> Self {
        let label = if label == CODE_AS_LABEL { code } else { label };
        Self {
            label: label.to_string(),
            code: code.to_string(),
            segments: parse_segments(code),
        }
    }

    /// Row label after placeholder resolution.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The source code string.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Substitute statistics into the code.
    ///
    /// When the code names statistics and none of them is defined, the
    /// result is empty rather than the bare surrounding text. Undefined
    /// keywords next to defined ones read [`DEFAULT_UNDEFINED_LABEL`].
    pub fn apply(&self, stats: &StatMap) -> String {
        self.apply_with(stats, DEFAULT_UNDEFINED_LABEL)
    }

    /// [`apply`](Self::apply) with a custom placeholder for undefined keywords.
    pub fn apply_with(&self, stats: &StatMap, undefined: &str) -> String {
        let mut keys = self.segments.iter().filter_map(|segment| match segment {
            Segment::Stat(key) => Some(*key),
            Segment::Text(_) => None,
        });
        if keys.clone().next().is_some() && keys.all(|key| !stats.contains(key)) {
            return String::new();
        }
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.as_str(),
                Segment::Stat(key) if stats.contains(*key) => stats.get(*key),
                Segment::Stat(_) => undefined,
            })
            .collect()
    }
}

/// A compiled list of abbreviated codes, one output row per code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbbrevCode {
    rows: Vec<CompiledCode>,
}

/// Compile `(label, code)` pairs.
///
/// ```rust
/// use tableonelib::data::{StatKey, StatMap};
/// use tableonelib::render::compile;
///
/// let code = compile(&[(".", "MEAN (SD)")]);
/// let stats = StatMap::new()
///     .with(StatKey::Mean, "12.30")
///     .with(StatKey::Sd, "4.10");
/// let rows = code.apply(&stats);
/// assert_eq!(rows[0].label, "MEAN (SD)");
/// assert_eq!(rows[0].value, "12.30 (4.10)");
/// ```
pub fn compile<L: AsRef<str>, C: AsRef<str>>(codes: &[(L, C)]) -> AbbrevCode {
    AbbrevCode {
        rows: codes
            .iter()
            .map(|(label, code)| CompiledCode::new(label.as_ref(), code.as_ref()))
            .collect(),
    }
}

impl AbbrevCode {
    pub fn rows(&self) -> &[CompiledCode] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// One row per code against a single statistics mapping.
    pub fn apply(&self, stats: &StatMap) -> StatBlock {
        self.apply_with(stats, DEFAULT_UNDEFINED_LABEL)
    }

    pub fn apply_with(&self, stats: &StatMap, undefined: &str) -> StatBlock {
        self.rows
            .iter()
            .map(|row| StatRow::new(row.label(), row.apply_with(stats, undefined)))
            .collect()
    }

    /// Codes applied per category level.
    ///
    /// With a single code each row is labelled by its level; with several,
    /// rows read `level: label`.
    pub fn apply_levels(&self, levels: &[(String, StatMap)]) -> StatBlock {
        self.apply_levels_with(levels, DEFAULT_UNDEFINED_LABEL)
    }

    pub fn apply_levels_with(&self, levels: &[(String, StatMap)], undefined: &str) -> StatBlock {
        let single = self.rows.len() == 1;
        levels
            .iter()
            .flat_map(|(level, stats)| {
                self.rows.iter().map(move |row| {
                    let label = if single {
                        level.clone()
                    } else {
                        format!("{}: {}", level, row.label())
                    };
                    StatRow::new(label, row.apply_with(stats, undefined))
                })
            })
            .collect()
    }

    /// Render a variable's values in one stratum.
    ///
    /// Continuous data yields one row per code; categorical data yields the
    /// codes once per level. A code whose keywords are all undefined renders
    /// empty; otherwise undefined keywords read `input.undefined_label`.
    pub fn render(&self, input: &RenderInput<'_>) -> StatBlock {
        match input.continuous_stats() {
            Some(stats) => self.apply_with(&stats, input.undefined_label),
            None => self.apply_levels_with(&input.level_stats(), input.undefined_label),
        }
    }
}

fn keywords_longest_first() -> [StatKey; 18] {
    let mut keys = StatKey::ALL;
    keys.sort_by_key(|k| Reverse(k.as_str().len()));
    keys
}

fn keyword_at(bytes: &[u8], i: usize, keys: &[StatKey]) -> Option<StatKey> {
    if i > 0 && bytes[i - 1].is_ascii_alphanumeric() {
        return None;
    }
    keys.iter().copied().find(|key| {
        let kw = key.as_str().as_bytes();
        let end = i + kw.len();
        end <= bytes.len()
            && bytes[i..end].eq_ignore_ascii_case(kw)
            && bytes.get(end).is_none_or(|b| !b.is_ascii_alphanumeric())
    })
}

fn parse_segments(code: &str) -> Vec<Segment> {
    let keys = keywords_longest_first();
    let bytes = code.as_bytes();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(key) = keyword_at(bytes, i, &keys) {
            if text_start < i {
                segments.push(Segment::Text(code[text_start..i].to_string()));
            }
            segments.push(Segment::Stat(key));
            i += key.as_str().len();
            text_start = i;
        } else {
            i += code[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    if text_start < bytes.len() {
        segments.push(Segment::Text(code[text_start..].to_string()));
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_sd() -> StatMap {
        StatMap::new()
            .with(StatKey::Mean, "12.30")
            .with(StatKey::Sd, "4.10")
            .with(StatKey::Median, "11.0")
            .with(StatKey::Min, "2.00")
            .with(StatKey::Max, "30.0")
            .with(StatKey::N, "8")
            .with(StatKey::Nmiss, "1")
    }

    #[test]
    fn test_parse_segments() {
        assert_eq!(
            parse_segments("Mean (SD)"),
            vec![
                Segment::Stat(StatKey::Mean),
                Segment::Text(" (".to_string()),
                Segment::Stat(StatKey::Sd),
                Segment::Text(")".to_string()),
            ]
        );
    }

    #[test]
    fn test_keyword_substitution() {
        let code = compile(&[(".", "MEAN (SD)")]);
        let rows = code.apply(&mean_sd());
        assert_eq!(rows, vec![StatRow::new("MEAN (SD)", "12.30 (4.10)")]);
    }

    #[test]
    fn test_case_insensitive() {
        let code = compile(&[("Median", "median [min, max]")]);
        let rows = code.apply(&mean_sd());
        assert_eq!(rows[0].label, "Median");
        assert_eq!(rows[0].value, "11.0 [2.00, 30.0]");
    }

    #[test]
    fn test_longest_keyword_wins() {
        let code = compile(&[(".", "N=N, NMISS missing")]);
        assert_eq!(code.apply(&mean_sd())[0].value, "8=8, 1 missing");
    }

    #[test]
    fn test_keywords_need_word_boundaries() {
        // "Minimum" and "Means" are text, not MIN / MEAN
        let code = compile(&[(".", "Minimum of Means: MIN")]);
        assert_eq!(code.apply(&mean_sd())[0].value, "Minimum of Means: 2.00");
    }

    #[test]
    fn test_text_passthrough() {
        let code = compile(&[("", "<b>MEAN</b> &plusmn; SD")]);
        let rows = code.apply(&mean_sd());
        assert_eq!(rows[0].label, "");
        assert_eq!(rows[0].value, "<b>12.30</b> &plusmn; 4.10");
    }

    #[test]
    fn test_non_ascii_text() {
        let code = compile(&[(".", "MEAN ± SD µg")]);
        assert_eq!(code.apply(&mean_sd())[0].value, "12.30 ± 4.10 µg");
    }

    #[test]
    fn test_undefined_keyword_is_empty() {
        let code = compile(&[(".", "GMEAN (GCV%)")]);
        assert_eq!(code.apply(&mean_sd())[0].value, "");
    }

    #[test]
    fn test_one_row_per_code() {
        let code = compile(&[(".", "Mean (SD)"), ("Range", "MIN - MAX")]);
        let rows = code.apply(&mean_sd());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label, "Mean (SD)");
        assert_eq!(rows[1].label, "Range");
        assert_eq!(rows[1].value, "2.00 - 30.0");
    }

    #[test]
    fn test_apply_levels() {
        let levels = vec![
            (
                "A".to_string(),
                StatMap::new().with(StatKey::Freq, "3").with(StatKey::Pct, "60.0"),
            ),
            (
                "B".to_string(),
                StatMap::new().with(StatKey::Freq, "2").with(StatKey::Pct, "40.0"),
            ),
        ];
        let single = compile(&[(".", "FREQ (PCT%)")]).apply_levels(&levels);
        assert_eq!(single[0], StatRow::new("A", "3 (60.0%)"));
        assert_eq!(single[1], StatRow::new("B", "2 (40.0%)"));

        let double = compile(&[("n", "FREQ"), ("%", "PCT")]).apply_levels(&levels);
        assert_eq!(double.len(), 4);
        assert_eq!(double[1], StatRow::new("A: %", "60.0"));
        assert_eq!(double[2], StatRow::new("B: n", "2"));
    }

    #[test]
    fn test_mean_on_categorical_is_empty() {
        let levels = vec![("A".to_string(), StatMap::new().with(StatKey::Freq, "3"))];
        let rows = compile(&[(".", "MEAN")]).apply_levels(&levels);
        assert_eq!(rows[0].value, "");

        let rows = compile(&[(".", "MEAN (SD)")]).apply_levels(&levels);
        assert_eq!(rows[0].value, "");
    }

    #[test]
    fn test_partially_defined_uses_placeholder() {
        let stats = StatMap::new().with(StatKey::Mean, "5.00");
        let rows = compile(&[(".", "MEAN (SD)")]).apply(&stats);
        assert_eq!(rows[0].value, "5.00 (NA)");

        let rows = compile(&[(".", "MEAN (SD)")]).apply_with(&stats, "-");
        assert_eq!(rows[0].value, "5.00 (-)");

        let levels = vec![("A".to_string(), StatMap::new().with(StatKey::Freq, "0"))];
        let rows = compile(&[(".", "FREQ (PCT%)")]).apply_levels_with(&levels, "n/a");
        assert_eq!(rows[0].value, "0 (n/a%)");

        let rows = compile(&[(".", "no keywords")]).apply(&stats);
        assert_eq!(rows[0].value, "no keywords");
    }
}

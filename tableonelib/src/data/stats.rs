//! Summary statistics for one variable within one stratum.
//!
//! Raw statistics are computed as `Option<f64>` (`None` when undefined) and
//! turned into display strings by a single rounding pass in
//! [`StatFormatter`]. The formatted result is a [`StatMap`], an ordered
//! mapping from [`StatKey`] to string that render functions and abbreviated
//! codes read from.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::format::{format_decimals, signif_pad};

/// Recognized statistic names.
///
/// The declaration order is the order of [`StatMap`] entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatKey {
    N,
    Nmiss,
    Mean,
    Sd,
    Cv,
    Gmean,
    Gcv,
    Median,
    Min,
    Max,
    Iqr,
    Q1,
    Q2,
    Q3,
    T1,
    T2,
    Freq,
    Pct,
}

impl StatKey {
    pub const ALL: [StatKey; 18] = [
        StatKey::N,
        StatKey::Nmiss,
        StatKey::Mean,
        StatKey::Sd,
        StatKey::Cv,
        StatKey::Gmean,
        StatKey::Gcv,
        StatKey::Median,
        StatKey::Min,
        StatKey::Max,
        StatKey::Iqr,
        StatKey::Q1,
        StatKey::Q2,
        StatKey::Q3,
        StatKey::T1,
        StatKey::T2,
        StatKey::Freq,
        StatKey::Pct,
    ];

    /// Upper-case keyword as written in abbreviated codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatKey::N => "N",
            StatKey::Nmiss => "NMISS",
            StatKey::Mean => "MEAN",
            StatKey::Sd => "SD",
            StatKey::Cv => "CV",
            StatKey::Gmean => "GMEAN",
            StatKey::Gcv => "GCV",
            StatKey::Median => "MEDIAN",
            StatKey::Min => "MIN",
            StatKey::Max => "MAX",
            StatKey::Iqr => "IQR",
            StatKey::Q1 => "Q1",
            StatKey::Q2 => "Q2",
            StatKey::Q3 => "Q3",
            StatKey::T1 => "T1",
            StatKey::T2 => "T2",
            StatKey::Freq => "FREQ",
            StatKey::Pct => "PCT",
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown statistic: {}", s))
    }
}

/// How categorical percentages are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentMode {
    /// Percent of the stratum's non-missing records (sums to 100 down a column)
    #[default]
    Column,
    /// Percent of the level's records across all leaf strata (sums to 100 along a row)
    Row,
}

/// Raw statistics of a continuous variable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContinuousStats {
    /// Non-missing count
    pub n: usize,
    /// Missing count
    pub nmiss: usize,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub cv: Option<f64>,
    pub gmean: Option<f64>,
    pub gcv: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub q1: Option<f64>,
    pub q3: Option<f64>,
}

impl ContinuousStats {
    /// Compute every statistic over the non-missing values.
    pub fn compute(values: &[Option<f64>]) -> Self {
        let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        let nmiss = values.len() - n;

        let avg = mean(&sorted);
        let sd = sample_sd(&sorted, avg);
        let cv = match (avg, sd) {
            (Some(m), Some(s)) if m != 0.0 => Some(100.0 * s / m),
            _ => None,
        };

        let logs: Vec<f64> = sorted.iter().filter(|&&x| x > 0.0).map(|x| x.ln()).collect();
        let log_mean = mean(&logs);
        let gmean = log_mean.map(f64::exp);
        let gcv = sample_sd(&logs, log_mean).map(|s| 100.0 * (s * s).exp_m1().sqrt());

        Self {
            n,
            nmiss,
            mean: avg,
            sd,
            cv,
            gmean,
            gcv,
            median: quantile(&sorted, 0.5),
            min: sorted.first().copied(),
            max: sorted.last().copied(),
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
        }
    }

    pub fn iqr(&self) -> Option<f64> {
        Some(self.q3? - self.q1?)
    }
}

/// Frequency of one category level (or of the missing pseudo-level).
#[derive(Debug, Clone, PartialEq)]
pub struct LevelStats {
    pub level: String,
    pub freq: usize,
    pub pct: Option<f64>,
}

/// Raw statistics of a categorical variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoricalStats {
    /// Non-missing count
    pub n: usize,
    /// Missing count
    pub nmiss: usize,
    /// One entry per declared level, in order, empty levels included
    pub levels: Vec<LevelStats>,
}

impl CategoricalStats {
    /// Count each level. Percentages use the stratum's non-missing total,
    /// or, in row mode, `row_totals[level]`.
    pub fn compute(
        codes: &[Option<usize>],
        levels: &[String],
        row_totals: Option<&[usize]>,
    ) -> Self {
        let mut counts = vec![0usize; levels.len()];
        for code in codes.iter().flatten() {
            if let Some(c) = counts.get_mut(*code) {
                *c += 1;
            }
        }
        let n: usize = counts.iter().sum();
        let levels = levels
            .iter()
            .zip(&counts)
            .enumerate()
            .map(|(i, (level, &freq))| {
                let base = match row_totals {
                    Some(totals) => totals.get(i).copied().unwrap_or(0),
                    None => n,
                };
                LevelStats {
                    level: level.clone(),
                    freq,
                    pct: percent(freq, base),
                }
            })
            .collect();
        Self {
            n,
            nmiss: codes.len() - n,
            levels,
        }
    }
}

/// The missing pseudo-level: count of missing values and their share of all records.
pub fn missing_stats(label: &str, nmiss: usize, total: usize) -> LevelStats {
    LevelStats {
        level: label.to_string(),
        freq: nmiss,
        pct: percent(nmiss, total),
    }
}

fn percent(part: usize, whole: usize) -> Option<f64> {
    (whole > 0).then(|| 100.0 * part as f64 / whole as f64)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

fn sample_sd(values: &[f64], mean: Option<f64>) -> Option<f64> {
    let mean = mean?;
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Linear interpolation between closest ranks (Hyndman & Fan type 7).
///
/// `sorted` must be in ascending order.
pub fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    Some(sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo]))
}

/// Formatted statistics: an ordered mapping from statistic to display string.
///
/// Absent keys read as the empty string, so undefined statistics and
/// statistics without meaning for the variable kind render as empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatMap {
    entries: BTreeMap<StatKey, String>,
}

impl StatMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a value. Empty strings are stored as absent.
    pub fn with(mut self, key: StatKey, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: StatKey, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    /// Formatted value, or "" when undefined.
    pub fn get(&self, key: StatKey) -> &str {
        self.entries.get(&key).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, key: StatKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatKey, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Rounding configuration and the formatting pass over raw statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatFormatter {
    /// Significant digits for continuous statistics
    pub digits: usize,
    /// Fixed decimal places for percentages
    pub digits_pct: usize,
}

impl Default for StatFormatter {
    fn default() -> Self {
        Self {
            digits: 3,
            digits_pct: 1,
        }
    }
}

impl StatFormatter {
    pub fn new(digits: usize) -> Self {
        Self {
            digits,
            ..Self::default()
        }
    }

    pub fn digits_pct(mut self, digits_pct: usize) -> Self {
        self.digits_pct = digits_pct;
        self
    }

    fn signif(&self, x: Option<f64>) -> String {
        x.map(|x| signif_pad(x, self.digits)).unwrap_or_default()
    }

    fn pct(&self, x: Option<f64>) -> String {
        x.map(|x| format_decimals(x, self.digits_pct))
            .unwrap_or_default()
    }

    /// Format continuous statistics.
    ///
    /// Every statistic is rounded to `digits` significant digits, except SD,
    /// which takes as many decimals as the formatted mean so that
    /// "MEAN (SD)" reads consistently.
    pub fn continuous(&self, stats: &ContinuousStats) -> StatMap {
        let mean = self.signif(stats.mean);
        let sd = match (stats.sd, decimals_of(&mean)) {
            (Some(sd), Some(decimals)) => format_decimals(sd, decimals),
            (sd, _) => self.signif(sd),
        };
        let median = self.signif(stats.median);
        StatMap::new()
            .with(StatKey::N, stats.n.to_string())
            .with(StatKey::Nmiss, stats.nmiss.to_string())
            .with(StatKey::Mean, mean)
            .with(StatKey::Sd, sd)
            .with(StatKey::Cv, self.signif(stats.cv))
            .with(StatKey::Gmean, self.signif(stats.gmean))
            .with(StatKey::Gcv, self.signif(stats.gcv))
            .with(StatKey::Median, median.clone())
            .with(StatKey::Q2, median)
            .with(StatKey::Min, self.signif(stats.min))
            .with(StatKey::Max, self.signif(stats.max))
            .with(StatKey::Iqr, self.signif(stats.iqr()))
            .with(StatKey::Q1, self.signif(stats.q1))
            .with(StatKey::Q3, self.signif(stats.q3))
    }

    /// Format one level of a categorical variable.
    ///
    /// FREQ/PCT describe `level`; N/NMISS describe the stratum; T1/T2 give
    /// "FREQ (PCT%)" of the first and second declared level. A frequency is
    /// only reported with its percentage, so a stratum without records
    /// leaves FREQ, PCT, T1 and T2 undefined.
    pub fn level(&self, stats: &CategoricalStats, level: &LevelStats) -> StatMap {
        let mut map = StatMap::new()
            .with(StatKey::N, stats.n.to_string())
            .with(StatKey::Nmiss, stats.nmiss.to_string());
        self.insert_freq(&mut map, level);
        for (key, index) in [(StatKey::T1, 0), (StatKey::T2, 1)] {
            if let Some(l) = stats.levels.get(index).filter(|l| l.pct.is_some()) {
                map.insert(key, format!("{} ({}%)", l.freq, self.pct(l.pct)));
            }
        }
        map
    }

    /// Format every declared level of a categorical variable, in order.
    pub fn categorical(&self, stats: &CategoricalStats) -> Vec<(String, StatMap)> {
        stats
            .levels
            .iter()
            .map(|level| (level.level.clone(), self.level(stats, level)))
            .collect()
    }

    /// Format the missing pseudo-level.
    pub fn missing(&self, missing: &LevelStats, n: usize) -> StatMap {
        let mut map = StatMap::new()
            .with(StatKey::N, n.to_string())
            .with(StatKey::Nmiss, missing.freq.to_string());
        self.insert_freq(&mut map, missing);
        map
    }

    fn insert_freq(&self, map: &mut StatMap, level: &LevelStats) {
        if level.pct.is_some() {
            map.insert(StatKey::Freq, level.freq.to_string());
            map.insert(StatKey::Pct, self.pct(level.pct));
        }
    }
}

/// Decimal places of an already formatted number.
fn decimals_of(formatted: &str) -> Option<usize> {
    if formatted.is_empty() {
        return None;
    }
    Some(formatted.split_once('.').map_or(0, |(_, frac)| frac.len()))
}

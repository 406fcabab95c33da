//! Per-column summary records shared by both engines.
//!
//! Engines decide how to pull values out of their table; this module owns what a summary *is*:
//! the [`ColumnStats`] variant chosen once per column, the numeric aggregates, the most-frequent
//! value rule, and the text written to the output CSV.

use std::collections::HashMap;

use serde::Serialize;

use crate::literal::python_float_repr;

/// Group label of the whole-table summary.
pub const FULL_DATASET_LABEL: &str = "full_dataset";

/// Marker written for statistics that do not apply to a column.
pub const NA: &str = "NA";

/// Decimal places kept for `mean` and `std_dev`.
pub const ROUND_DIGITS: i32 = 4;

/// Column classification, decided before any statistic is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Smallest or largest value of a numeric column.
///
/// Integer columns keep their exact `i64` bounds; only the mean and standard deviation go through
/// `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl Bound {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    fn render(self) -> String {
        match self {
            Self::Int(v) => v.to_string(),
            Self::Float(v) => python_float_repr(v),
        }
    }
}

/// Aggregates of a numeric column. `mean` and `std_dev` are already rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericStats {
    pub mean: f64,
    pub min: Bound,
    pub max: Bound,
    /// Sample (N-1) standard deviation; `None` with fewer than two values.
    pub std_dev: Option<f64>,
}

impl NumericStats {
    /// Aggregates of a float column. Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(Self::rounded(
            mean,
            Bound::Float(min),
            Bound::Float(max),
            sample_std_dev(values, mean),
        ))
    }

    /// Aggregates of an integer column. Returns `None` for an empty slice.
    ///
    /// Bounds are exact. Mean and deviation are computed on offsets from the first value, which
    /// are exact in `i128` and keep precision for large ID-like values.
    pub fn from_integers(values: &[i64]) -> Option<Self> {
        let (&pivot, _) = values.split_first()?;
        let min = values.iter().copied().min()?;
        let max = values.iter().copied().max()?;
        let offsets: Vec<f64> = values
            .iter()
            .map(|&v| (i128::from(v) - i128::from(pivot)) as f64)
            .collect();
        let offset_mean = offsets.iter().sum::<f64>() / offsets.len() as f64;
        Some(Self::rounded(
            pivot as f64 + offset_mean,
            Bound::Int(min),
            Bound::Int(max),
            sample_std_dev(&offsets, offset_mean),
        ))
    }

    /// Builds stats from aggregates computed elsewhere, applying the output rounding.
    pub fn rounded(mean: f64, min: Bound, max: Bound, std_dev: Option<f64>) -> Self {
        Self {
            mean: round_to(mean, ROUND_DIGITS),
            min,
            max,
            std_dev: std_dev.filter(|s| s.is_finite()).map(|s| round_to(s, ROUND_DIGITS)),
        }
    }

    /// `true` when the bounds are integers.
    pub fn is_integral(&self) -> bool {
        matches!(self.min, Bound::Int(_))
    }
}

fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    Some((ss / (values.len() as f64 - 1.0)).sqrt())
}

/// The most common value of a categorical column and how often it occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MostFrequent {
    pub value: String,
    pub count: usize,
}

/// Statistics that depend on the column classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnStats {
    Numeric(NumericStats),
    /// `None` when the column has no values.
    Categorical(Option<MostFrequent>),
}

impl ColumnStats {
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
        }
    }
}

/// One output row: the statistics of one column within one group.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub group: String,
    pub column: String,
    /// Non-missing values.
    pub count: usize,
    /// Distinct non-missing values.
    pub unique: usize,
    pub stats: ColumnStats,
}

impl SummaryRecord {
    /// Flattens the record into the text written to the output file.
    pub fn to_row(&self) -> SummaryRow {
        let (mean, min, max, std_dev, most_freq) = match &self.stats {
            ColumnStats::Numeric(n) => (
                python_float_repr(n.mean),
                n.min.render(),
                n.max.render(),
                n.std_dev.map(python_float_repr).unwrap_or_else(|| NA.to_string()),
                NA.to_string(),
            ),
            ColumnStats::Categorical(top) => (
                NA.to_string(),
                NA.to_string(),
                NA.to_string(),
                NA.to_string(),
                top.as_ref()
                    .map(|t| format!("{} ({})", t.value, t.count))
                    .unwrap_or_else(|| NA.to_string()),
            ),
        };
        SummaryRow {
            group: self.group.clone(),
            column: self.column.clone(),
            count: self.count,
            unique: self.unique,
            mean,
            min,
            max,
            std_dev,
            most_freq,
        }
    }
}

/// Serialized shape of a [`SummaryRecord`]. Field order is the output header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub group: String,
    pub column: String,
    pub count: usize,
    pub unique: usize,
    pub mean: String,
    pub min: String,
    pub max: String,
    pub std_dev: String,
    pub most_freq: String,
}

/// Parses a cell as a number after removing thousands separators and surrounding whitespace.
///
/// Only finite values count; `nan`/`inf` text is not numeric.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|&c| c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Like [`parse_number`] but only for integer text (no fraction or exponent).
pub fn parse_integer(text: &str) -> Option<i64> {
    let cleaned: String = text.trim().chars().filter(|&c| c != ',').collect();
    cleaned.parse::<i64>().ok()
}

/// Distinct count of numbers, treating `-0.0` and `0.0` as equal.
pub fn count_distinct_numbers(values: &[f64]) -> usize {
    let mut bits: Vec<u64> = values
        .iter()
        .map(|v| if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() })
        .collect();
    bits.sort_unstable();
    bits.dedup();
    bits.len()
}

/// Distinct count of integers.
pub fn count_distinct_integers(values: &[i64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Counts occurrences and returns the most common value.
///
/// Ties go to the value seen first. Returns `None` for an empty input.
pub fn most_frequent<I, S>(values: I) -> Option<MostFrequent>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for value in values {
        let value = value.as_ref();
        match index.get(value) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(value.to_string(), order.len());
                order.push((value.to_string(), 1));
            }
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (value, count) in order {
        if best.as_ref().is_none_or(|(_, c)| count > *c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, count)| MostFrequent { value, count })
}

/// `"k1=v1, k2=v2"` for the given key columns and one group's values.
pub fn group_label<K, V>(keys: &[K], values: &[V]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    keys.iter()
        .zip(values)
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rounds half away from zero to `digits` decimal places.
///
/// Values too large to carry `digits` fractional places are returned unchanged.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= 9_007_199_254_740_992.0 {
        return value;
    }
    scaled.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_stats_match_sample_statistics() {
        let stats = NumericStats::from_integers(&[1, 2, 3]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.min, Bound::Int(1));
        assert_eq!(stats.max, Bound::Int(3));
        assert_eq!(stats.std_dev, Some(1.0));
        assert!(stats.is_integral());

        let pair = NumericStats::from_integers(&[1, 2]).unwrap();
        assert_eq!(pair.mean, 1.5);
        assert_eq!(pair.std_dev, Some(0.7071));

        let single = NumericStats::from_integers(&[3]).unwrap();
        assert_eq!(single.std_dev, None);

        let floats = NumericStats::from_values(&[0.5, 1.5]).unwrap();
        assert_eq!((floats.min, floats.max), (Bound::Float(0.5), Bound::Float(1.5)));
        assert!(!floats.is_integral());

        assert!(NumericStats::from_values(&[]).is_none());
        assert!(NumericStats::from_integers(&[]).is_none());
    }

    #[test]
    fn integers_beyond_f64_precision_stay_exact() {
        let ids = [9_007_199_254_740_993, 9_007_199_254_740_992];
        assert_eq!(count_distinct_integers(&ids), 2);

        let stats = NumericStats::from_integers(&ids).unwrap();
        assert_eq!(stats.min, Bound::Int(9_007_199_254_740_992));
        assert_eq!(stats.max, Bound::Int(9_007_199_254_740_993));
        assert_eq!(stats.std_dev, Some(0.7071));

        let record = SummaryRecord {
            group: FULL_DATASET_LABEL.to_string(),
            column: "id".to_string(),
            count: 2,
            unique: 2,
            stats: ColumnStats::Numeric(stats),
        };
        let row = record.to_row();
        assert_eq!(row.min, "9007199254740992");
        assert_eq!(row.max, "9007199254740993");
    }

    #[test]
    fn numeric_row_formatting() {
        let record = SummaryRecord {
            group: FULL_DATASET_LABEL.to_string(),
            column: "a".to_string(),
            count: 3,
            unique: 3,
            stats: ColumnStats::Numeric(NumericStats::from_integers(&[1, 2, 3]).unwrap()),
        };
        let row = record.to_row();
        assert_eq!(row.mean, "2.0");
        assert_eq!(row.min, "1");
        assert_eq!(row.max, "3");
        assert_eq!(row.std_dev, "1.0");
        assert_eq!(row.most_freq, NA);

        let floats = NumericStats::from_values(&[1.25, 2.5]).unwrap();
        let row = SummaryRecord { stats: ColumnStats::Numeric(floats), ..record }.to_row();
        assert_eq!(row.min, "1.25");
        assert_eq!(row.max, "2.5");
    }

    #[test]
    fn categorical_row_formatting() {
        let record = SummaryRecord {
            group: "b=x".to_string(),
            column: "color".to_string(),
            count: 3,
            unique: 1,
            stats: ColumnStats::Categorical(most_frequent(["red", "red", "red"])),
        };
        let row = record.to_row();
        assert_eq!(row.most_freq, "red (3)");
        assert_eq!((row.mean.as_str(), row.min.as_str()), (NA, NA));
        assert_eq!((row.max.as_str(), row.std_dev.as_str()), (NA, NA));

        let empty = SummaryRecord { stats: ColumnStats::Categorical(None), ..record };
        assert_eq!(empty.to_row().most_freq, NA);
    }

    #[test]
    fn most_frequent_breaks_ties_by_first_occurrence() {
        let top = most_frequent(["b", "a", "a", "b", "c"]).unwrap();
        assert_eq!(top, MostFrequent { value: "b".to_string(), count: 2 });
        assert!(most_frequent(Vec::<String>::new()).is_none());
    }

    #[test]
    fn number_parsing_strips_separators() {
        assert_eq!(parse_number(" 1,234.5 "), Some(1234.5));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number("nan"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(","), None);
        assert_eq!(parse_integer("1,000"), Some(1000));
        assert_eq!(parse_integer("1.0"), None);
    }

    #[test]
    fn distinct_numbers_ignore_zero_sign() {
        assert_eq!(count_distinct_numbers(&[0.0, -0.0, 1.0, 1.0]), 2);
    }

    #[test]
    fn group_labels_join_keys_and_values() {
        assert_eq!(group_label(&["b"], &["x"]), "b=x");
        assert_eq!(group_label(&["a", "b"], &["1", ""]), "a=1, b=");
    }

    #[test]
    fn rounding_to_four_places() {
        assert_eq!(round_to(0.707_106_78, 4), 0.7071);
        assert_eq!(round_to(2.0, 4), 2.0);
        assert_eq!(round_to(9_007_199_254_740_993.0, 4), 9_007_199_254_740_993.0);
    }
}

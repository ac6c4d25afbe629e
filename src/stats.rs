use std::fmt;

use crate::models::{DrawRecord, SummaryStats, MISSING_MARKER};

pub fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Count, mean, median, min and max of `values`.
///
/// Mean and median are rounded to two decimals. An empty input yields a count
/// of zero and no values.
pub fn summarize(values: &[f64]) -> SummaryStats {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let count = sorted.len();
    if count == 0 {
        return SummaryStats {
            count: 0,
            mean: None,
            median: None,
            min: None,
            max: None,
        };
    }

    let mean = sorted.iter().sum::<f64>() / count as f64;
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    SummaryStats {
        count,
        mean: Some(round_2dp(mean)),
        median: Some(round_2dp(median)),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
    }
}

/// Statistics over one metric; records without a numeric value are left out.
pub fn metric_stats<'a, I>(records: I, key: &str) -> SummaryStats
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let values: Vec<f64> = records
        .into_iter()
        .filter_map(|record| record.field(key))
        .collect();
    summarize(&values)
}

/// Renders a statistic, or the missing marker when there is none.
pub struct Shown {
    value: Option<f64>,
    decimals: Option<usize>,
}

impl fmt::Display for Shown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.value, self.decimals) {
            (Some(value), Some(decimals)) => write!(f, "{value:.decimals$}"),
            (Some(value), None) => write!(f, "{value}"),
            (None, _) => write!(f, "{MISSING_MARKER}"),
        }
    }
}

impl SummaryStats {
    pub fn mean_display(&self) -> Shown {
        Shown {
            value: self.mean,
            decimals: Some(2),
        }
    }

    pub fn median_display(&self) -> Shown {
        Shown {
            value: self.median,
            decimals: Some(2),
        }
    }

    pub fn min_display(&self) -> Shown {
        Shown {
            value: self.min,
            decimals: None,
        }
    }

    pub fn max_display(&self) -> Shown {
        Shown {
            value: self.max,
            decimals: None,
        }
    }
}

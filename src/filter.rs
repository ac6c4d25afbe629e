use std::fmt;
use std::str::FromStr;

use chrono::{Months, NaiveDate};
use tracing::debug;

use crate::models::{DrawRecord, DATE_FORMAT};

/// Draws on or before this date carry unreliable bucket counts.
pub const HEATMAP_CUTOFF: (i32, u32, u32) = (2022, 1, 18);

pub fn heatmap_cutoff() -> NaiveDate {
    let (year, month, day) = HEATMAP_CUTOFF;
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    LastYear,
    LastTwoYears,
    #[default]
    AllTime,
    /// Strictly after the given date.
    After(NaiveDate),
}

impl TimeWindow {
    /// Calendar-aware cutoff relative to `today`.
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        match self {
            TimeWindow::LastYear => today.checked_sub_months(Months::new(12)),
            TimeWindow::LastTwoYears => today.checked_sub_months(Months::new(24)),
            TimeWindow::AllTime => None,
            TimeWindow::After(date) => Some(*date),
        }
    }

    pub fn admits(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match (self, self.cutoff(today)) {
            (TimeWindow::AllTime, _) => true,
            (TimeWindow::After(cutoff), _) => date > *cutoff,
            (_, Some(cutoff)) => date >= cutoff,
            (_, None) => true,
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeWindow::LastYear => write!(f, "last year"),
            TimeWindow::LastTwoYears => write!(f, "last 2 years"),
            TimeWindow::AllTime => write!(f, "all time"),
            TimeWindow::After(date) => write!(f, "after {date}"),
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "1y" | "1 year" | "last-1-year" => Ok(TimeWindow::LastYear),
            "2y" | "2 year" | "2 years" | "last-2-years" => Ok(TimeWindow::LastTwoYears),
            "all" | "all-time" | "all time" => Ok(TimeWindow::AllTime),
            other => {
                let date = other.strip_prefix("after:").unwrap_or(other);
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map(TimeWindow::After)
                    .map_err(|_| format!("unknown time window '{raw}'"))
            }
        }
    }
}

/// Keeps the records whose date falls inside `window`, in input order.
///
/// `AllTime` applies no filtering at all. Every other window drops records
/// without a parseable date.
pub fn filter_window<'a>(
    records: &'a [DrawRecord],
    window: TimeWindow,
    today: NaiveDate,
) -> Vec<&'a DrawRecord> {
    if window == TimeWindow::AllTime {
        return records.iter().collect();
    }

    let kept: Vec<&DrawRecord> = records
        .iter()
        .filter(|record| match record.draw_date {
            Some(date) => window.admits(date, today),
            None => false,
        })
        .collect();

    debug!(
        window = %window,
        kept = kept.len(),
        dropped = records.len() - kept.len(),
        "applied time window"
    );
    kept
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProgramFilter {
    #[default]
    All,
    Named(String),
}

impl ProgramFilter {
    pub fn label(&self) -> &str {
        match self {
            ProgramFilter::All => "all programs",
            ProgramFilter::Named(name) => name.as_str(),
        }
    }

    pub fn matches(&self, record: &DrawRecord) -> bool {
        match self {
            ProgramFilter::All => true,
            ProgramFilter::Named(name) => record.category.as_deref() == Some(name.as_str()),
        }
    }
}

impl From<Option<String>> for ProgramFilter {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(name) if !name.trim().is_empty() && name != "All" => ProgramFilter::Named(name),
            _ => ProgramFilter::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    pub program: ProgramFilter,
    pub window: TimeWindow,
    pub metric: String,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            program: ProgramFilter::All,
            window: TimeWindow::AllTime,
            metric: "drawCRS".to_string(),
        }
    }
}

impl FilterCriteria {
    pub fn apply<'a>(&self, records: &'a [DrawRecord], today: NaiveDate) -> Vec<&'a DrawRecord> {
        filter_window(records, self.window, today)
            .into_iter()
            .filter(|record| self.program.matches(record))
            .collect()
    }
}

/// Case-insensitive substring match on a text field; missing fields never match.
pub fn contains_ignore_case(record: &DrawRecord, key: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    record
        .text(key)
        .map(|value| value.trim().to_lowercase().contains(&needle))
        .unwrap_or(false)
}

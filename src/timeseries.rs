use std::collections::HashMap;

use chrono::Datelike;

use crate::grouping::{by_category, group_by};
use crate::models::{CategorySeries, DrawRecord, MonthCount, SeriesPoint};

/// Draw counts for every month from the earliest to the latest dated record.
/// Months without draws are kept with a count of zero.
pub fn monthly_counts<'a, I>(records: I) -> Vec<MonthCount>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut counts: HashMap<(i32, u32), usize> = HashMap::new();
    let mut first: Option<(i32, u32)> = None;
    let mut last: Option<(i32, u32)> = None;

    for date in records.into_iter().filter_map(|record| record.draw_date) {
        let month = (date.year(), date.month());
        *counts.entry(month).or_insert(0) += 1;
        first = Some(first.map_or(month, |current| current.min(month)));
        last = Some(last.map_or(month, |current| current.max(month)));
    }

    let (Some((mut year, mut month)), Some(end)) = (first, last) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    while (year, month) <= end {
        series.push(MonthCount {
            year,
            month,
            count: counts.get(&(year, month)).copied().unwrap_or(0),
        });

        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }

    series
}

/// `(date, value)` points for one metric, oldest first. Records without a
/// date or without a numeric value for `key` are skipped.
pub fn metric_series<'a, I>(records: I, key: &str) -> Vec<SeriesPoint>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut points: Vec<SeriesPoint> = records
        .into_iter()
        .filter_map(|record| {
            Some(SeriesPoint {
                date: record.draw_date?,
                value: record.field(key)?,
            })
        })
        .collect();
    points.sort_by_key(|point| point.date);
    points
}

/// One score line per category, categories in first-seen order.
pub fn category_series<'a, I>(records: I) -> Vec<CategorySeries>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    group_by(records, by_category)
        .into_iter()
        .map(|group| {
            let mut points: Vec<SeriesPoint> = group
                .records
                .iter()
                .filter_map(|record| {
                    Some(SeriesPoint {
                        date: record.draw_date?,
                        value: record.score()?,
                    })
                })
                .collect();
            points.sort_by_key(|point| point.date);
            CategorySeries {
                category: group.label,
                points,
            }
        })
        .filter(|series| !series.points.is_empty())
        .collect()
}

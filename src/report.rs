use std::fmt::Write;

use chrono::NaiveDate;

use crate::buckets::{score_distribution, POOL_FIELD};
use crate::delta::latest_draw;
use crate::filter::FilterCriteria;
use crate::grouping::{recent_draws, yearly_totals};
use crate::models::{DrawRecord, LatestDraw, RecordSchema, MISSING_MARKER};
use crate::stats::metric_stats;
use crate::timeseries::monthly_counts;

fn signed(change: Option<f64>) -> String {
    match change {
        Some(value) if value > 0.0 => format!("+{value}"),
        Some(value) => format!("{value}"),
        None => MISSING_MARKER.to_string(),
    }
}

fn number(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| MISSING_MARKER.to_string())
}

fn write_latest(output: &mut String, latest: &LatestDraw) {
    let record = &latest.record;
    let _ = writeln!(
        output,
        "- {} on {}",
        record.category_or_empty(),
        record
            .draw_date
            .map(|date| date.to_string())
            .unwrap_or_else(|| MISSING_MARKER.to_string())
    );
    let _ = writeln!(
        output,
        "- Cutoff score {} ({} vs previous draw)",
        number(record.score()),
        signed(latest.score_change)
    );
    let _ = writeln!(output, "- Invitations issued {}", number(record.size()));
    let _ = writeln!(
        output,
        "- Pool size {} ({} vs previous draw)",
        number(record.field(POOL_FIELD)),
        signed(latest.pool_change)
    );
}

/// Markdown summary of the draws admitted by `criteria`.
pub fn build_report(criteria: &FilterCriteria, today: NaiveDate, records: &[DrawRecord]) -> String {
    let selected = criteria.apply(records, today);

    let mut output = String::new();
    let program_label = criteria.program.label();

    let _ = writeln!(output, "# Draw Insights Report");
    let _ = writeln!(
        output,
        "Generated for {} ({}) on {}",
        program_label, criteria.window, today
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Draw");

    match latest_draw(records.iter(), RecordSchema::EXPRESS_ENTRY.score_field) {
        Some(latest) => write_latest(&mut output, &latest),
        None => {
            let _ = writeln!(output, "No complete draws recorded.");
        }
    }

    let stats = metric_stats(selected.iter().copied(), &criteria.metric);
    let _ = writeln!(output);
    let _ = writeln!(output, "## {} Statistics", criteria.metric);
    let _ = writeln!(output, "- Total draws: {}", stats.count);
    let _ = writeln!(output, "- Mean: {}", stats.mean_display());
    let _ = writeln!(output, "- Median: {}", stats.median_display());
    let _ = writeln!(output, "- Min: {}", stats.min_display());
    let _ = writeln!(output, "- Max: {}", stats.max_display());

    let _ = writeln!(output);
    let _ = writeln!(output, "## Score Distribution");
    match score_distribution(selected.iter().copied()) {
        Some(distribution) => {
            let _ = writeln!(output, "As of {}", distribution.draw_date);
            for bar in &distribution.bars {
                let marker = if Some(bar.label) == distribution.cutoff_label {
                    " <- cutoff"
                } else {
                    ""
                };
                let kind = if bar.aggregate { " (aggregate)" } else { "" };
                let _ = writeln!(output, "- {}{}: {}{}", bar.label, kind, bar.count, marker);
            }
        }
        None => {
            let _ = writeln!(output, "No draws recorded for this window.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Draws per Month");
    let months = monthly_counts(selected.iter().copied());
    if months.is_empty() {
        let _ = writeln!(output, "No draws recorded for this window.");
    } else {
        for month in &months {
            let _ = writeln!(output, "- {}: {}", month, month.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Invitations by Year");
    let totals = yearly_totals(selected.iter().copied());
    if totals.is_empty() {
        let _ = writeln!(output, "No invitations recorded for this window.");
    } else {
        for year in &totals {
            let _ = writeln!(output, "- {}: {} total", year.year, year.total());
            for (program, size) in &year.by_category {
                let _ = writeln!(output, "  - {program}: {size}");
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Draws");
    let recent = recent_draws(selected.iter().copied(), 10);
    if recent.is_empty() {
        let _ = writeln!(output, "No draws recorded for this window.");
    } else {
        for record in recent {
            let _ = writeln!(
                output,
                "- {} ({}): score {}",
                record.category_or_empty(),
                record
                    .draw_date
                    .map(|date| date.to_string())
                    .unwrap_or_default(),
                number(record.score())
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ProgramFilter, TimeWindow};
    use crate::models::RecordSchema;
    use serde_json::json;

    fn records() -> Vec<DrawRecord> {
        vec![
            json!({
                "drawName": "CEC", "drawDate": "2024-01-10", "drawCRS": "530",
                "drawSize": "1,500", "dd18": "210,000", "dd1": "400",
            }),
            json!({
                "drawName": "CEC", "drawDate": "2024-03-05", "drawCRS": "518",
                "drawSize": "2,000", "dd18": "212,500", "dd1": "420",
            }),
            json!({ "drawName": "PNP", "drawDate": "2023-06-01", "drawCRS": "780", "drawSize": "500" }),
        ]
        .into_iter()
        .map(|doc| DrawRecord::from_value(doc, &RecordSchema::EXPRESS_ENTRY))
        .collect()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn report_lists_every_section() {
        let criteria = FilterCriteria {
            program: ProgramFilter::Named("CEC".to_string()),
            window: TimeWindow::LastYear,
            ..FilterCriteria::default()
        };
        let report = build_report(&criteria, today(), &records());

        assert!(report.starts_with("# Draw Insights Report"));
        assert!(report.contains("Generated for CEC (last year) on 2024-06-01"));
        assert!(report.contains("- Cutoff score 518 (-12 vs previous draw)"));
        assert!(report.contains("- Pool size 212500 (+2500 vs previous draw)"));
        assert!(report.contains("- Total draws: 2"));
        assert!(report.contains("- Median: 524.00"));
        assert!(report.contains("- 501-600: 0 <- cutoff"));
        assert!(report.contains("- Feb-2024: 0"));
        assert!(report.contains("  - CEC: 3500"));
        assert!(!report.contains("PNP"));
    }

    #[test]
    fn empty_window_uses_placeholders() {
        let criteria = FilterCriteria {
            window: TimeWindow::After(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()),
            ..FilterCriteria::default()
        };
        let report = build_report(&criteria, today(), &records());
        assert!(report.contains("- Total draws: 0"));
        assert!(report.contains("- Mean: –"));
        assert!(report.contains("No draws recorded for this window."));
    }

    #[test]
    fn latest_draw_compares_scores_whatever_the_metric() {
        let criteria = FilterCriteria {
            program: ProgramFilter::Named("CEC".to_string()),
            metric: "drawSize".to_string(),
            ..FilterCriteria::default()
        };
        let report = build_report(&criteria, today(), &records());
        assert!(report.contains("- Cutoff score 518 (-12 vs previous draw)"));
        assert!(report.contains("## drawSize Statistics"));
        assert!(report.contains("- Median: 1750.00"));
    }
}

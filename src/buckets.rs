use tracing::debug;

use crate::coerce::or_zero;
use crate::filter::heatmap_cutoff;
use crate::models::{BucketBar, DrawRecord, Distribution, Heatmap};

/// A fixed CRS sub-range and the document field holding its applicant count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub low: u32,
    pub high: u32,
    /// Buckets this one sums. Empty for independently measured ranges.
    pub aggregate_of: &'static [&'static str],
    /// Buckets whose counts form the stacking offset of an aggregate.
    pub stacked_on: &'static [&'static str],
}

impl BucketSpec {
    const fn range(key: &'static str, label: &'static str, low: u32, high: u32) -> Self {
        Self {
            key,
            label,
            low,
            high,
            aggregate_of: &[],
            stacked_on: &[],
        }
    }

    pub fn is_aggregate(&self) -> bool {
        !self.aggregate_of.is_empty()
    }

    pub fn contains(&self, score: f64) -> bool {
        score >= f64::from(self.low) && score <= f64::from(self.high)
    }
}

/// Canonical low-to-high bucket order. Every bucketed output follows it.
pub const CRS_BUCKETS: &[BucketSpec] = &[
    BucketSpec::range("dd17", "0-300", 0, 300),
    BucketSpec::range("dd16", "301-350", 301, 350),
    BucketSpec::range("dd15", "351-400", 351, 400),
    BucketSpec::range("dd14", "401-410", 401, 410),
    BucketSpec::range("dd13", "411-420", 411, 420),
    BucketSpec::range("dd12", "421-430", 421, 430),
    BucketSpec::range("dd11", "431-440", 431, 440),
    BucketSpec::range("dd10", "441-450", 441, 450),
    BucketSpec {
        key: "dd9",
        label: "401-450",
        low: 401,
        high: 450,
        aggregate_of: &["dd14", "dd13", "dd12", "dd11", "dd10"],
        stacked_on: &["dd17", "dd16", "dd15"],
    },
    BucketSpec::range("dd8", "451-460", 451, 460),
    BucketSpec::range("dd7", "461-470", 461, 470),
    BucketSpec::range("dd6", "471-480", 471, 480),
    BucketSpec::range("dd5", "481-490", 481, 490),
    BucketSpec::range("dd4", "491-500", 491, 500),
    BucketSpec {
        key: "dd3",
        label: "451-500",
        low: 451,
        high: 500,
        aggregate_of: &["dd8", "dd7", "dd6", "dd5", "dd4"],
        stacked_on: &["dd17", "dd16", "dd15", "dd9"],
    },
    BucketSpec::range("dd2", "501-600", 501, 600),
    BucketSpec::range("dd1", "601-1200", 601, 1200),
];

/// Field holding the total pool size at draw time.
pub const POOL_FIELD: &str = "dd18";

/// Lays out `table` as stacked bars.
///
/// Independent buckets sit on the running total of the buckets before them and
/// then add to it. Aggregates sit on the sum of their `stacked_on` buckets and
/// leave the running total alone.
pub fn stack_buckets<F>(table: &[BucketSpec], count_of: F) -> Vec<BucketBar>
where
    F: Fn(&str) -> Option<f64>,
{
    let mut running = 0.0;

    table
        .iter()
        .map(|spec| {
            let count = or_zero(count_of(spec.key));
            let base = if spec.is_aggregate() {
                spec.stacked_on.iter().map(|key| or_zero(count_of(key))).sum()
            } else {
                let base = running;
                running += count;
                base
            };

            BucketBar {
                label: spec.label,
                count,
                base,
                aggregate: spec.is_aggregate(),
            }
        })
        .collect()
}

/// First bucket, in canonical order, whose range holds `score`.
pub fn cutoff_bucket(table: &[BucketSpec], score: f64) -> Option<&BucketSpec> {
    table.iter().find(|spec| spec.contains(score))
}

/// Most recent dated record; the reference for single-draw views.
pub fn reference_record<'a, I>(records: I) -> Option<&'a DrawRecord>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    records
        .into_iter()
        .filter(|record| record.draw_date.is_some())
        .max_by_key(|record| record.draw_date)
}

/// Score distribution of the most recent draw among `records`.
pub fn score_distribution<'a, I>(records: I) -> Option<Distribution>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let reference = reference_record(records)?;
    let draw_date = reference.draw_date?;
    let cutoff_score = reference.score();

    Some(Distribution {
        draw_date,
        cutoff_score,
        cutoff_label: cutoff_score
            .and_then(|score| cutoff_bucket(CRS_BUCKETS, score))
            .map(|spec| spec.label),
        bars: stack_buckets(CRS_BUCKETS, |key| reference.field(key)),
    })
}

/// Aggregates whose stored value disagrees with the sum of their children,
/// as `(key, stored, sum_of_children)`.
pub fn aggregate_mismatches(record: &DrawRecord) -> Vec<(&'static str, f64, f64)> {
    CRS_BUCKETS
        .iter()
        .filter(|spec| spec.is_aggregate())
        .filter_map(|spec| {
            let stored = or_zero(record.field(spec.key));
            let children: f64 = spec
                .aggregate_of
                .iter()
                .map(|key| or_zero(record.field(key)))
                .sum();
            ((stored - children).abs() > f64::EPSILON).then_some((spec.key, stored, children))
        })
        .collect()
}

/// Applicant counts per independent bucket across every draw after the
/// heatmap cutoff, oldest draw first. Zero and missing counts become `None`.
pub fn heatmap<'a, I>(records: I) -> Heatmap
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let owned: Vec<&DrawRecord> = records.into_iter().collect();
    let cutoff = heatmap_cutoff();
    let mut draws: Vec<&DrawRecord> = owned
        .iter()
        .copied()
        .filter(|record| record.draw_date.is_some_and(|date| date > cutoff))
        .collect();
    draws.sort_by_key(|record| record.draw_date);
    debug!(draws = draws.len(), skipped = owned.len() - draws.len(), "built heatmap");

    let rows: Vec<&BucketSpec> = CRS_BUCKETS.iter().filter(|spec| !spec.is_aggregate()).collect();

    Heatmap {
        dates: draws.iter().filter_map(|record| record.draw_date).collect(),
        ranges: rows.iter().map(|spec| spec.label).collect(),
        cells: rows
            .iter()
            .map(|spec| {
                draws
                    .iter()
                    .map(|record| record.field(spec.key).filter(|count| *count != 0.0))
                    .collect()
            })
            .collect(),
    }
}

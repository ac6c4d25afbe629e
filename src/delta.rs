use crate::buckets::POOL_FIELD;
use crate::models::{DrawRecord, LatestDraw};

/// Dated records, newest first. Undated records cannot be ordered and are dropped.
pub fn sort_newest_first<'a, I>(records: I) -> Vec<&'a DrawRecord>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut sorted: Vec<&DrawRecord> = records
        .into_iter()
        .filter(|record| record.draw_date.is_some())
        .collect();
    sorted.sort_by(|a, b| b.draw_date.cmp(&a.draw_date));
    sorted
}

/// First record after `current` in `sorted` (newest first) that satisfies
/// `matches(current, candidate)`.
pub fn nearest_previous<'a, F>(
    sorted: &[&'a DrawRecord],
    current: usize,
    matches: F,
) -> Option<&'a DrawRecord>
where
    F: Fn(&DrawRecord, &DrawRecord) -> bool,
{
    let anchor = sorted.get(current)?;
    sorted
        .iter()
        .skip(current + 1)
        .find(|candidate| matches(*anchor, **candidate))
        .copied()
}

/// Same category, different draw date.
pub fn same_category_earlier(current: &DrawRecord, candidate: &DrawRecord) -> bool {
    current.category.is_some()
        && candidate.category == current.category
        && candidate.draw_date != current.draw_date
}

/// `current - previous` for one numeric field. `None` when there is no
/// previous record or either side lacks the value; never zero by default.
pub fn field_delta(current: &DrawRecord, previous: Option<&DrawRecord>, key: &str) -> Option<f64> {
    let previous = previous?;
    Some(current.field(key)? - previous.field(key)?)
}

/// The newest complete draw, compared with the previous draw of its category.
///
/// A draw is complete when it has a date, a score, a size and a pool figure.
pub fn latest_draw<'a, I>(records: I, score_key: &str) -> Option<LatestDraw>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let sorted: Vec<&DrawRecord> = sort_newest_first(records)
        .into_iter()
        .filter(|record| {
            record.score().is_some() && record.size().is_some() && record.field(POOL_FIELD).is_some()
        })
        .collect();

    let current = sorted.first()?;
    let previous = nearest_previous(&sorted, 0, same_category_earlier);

    Some(LatestDraw {
        record: (*current).clone(),
        previous_date: previous.and_then(|record| record.draw_date),
        score_change: field_delta(current, previous, score_key),
        pool_change: field_delta(current, previous, POOL_FIELD),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordSchema;
    use serde_json::{json, Value};

    fn draw(value: Value) -> DrawRecord {
        DrawRecord::from_value(value, &RecordSchema::EXPRESS_ENTRY)
    }

    #[test]
    fn skips_other_categories_when_matching() {
        let records = vec![
            draw(json!({ "drawName": "PNP", "drawDate": "2024-03-01", "drawCRS": "500" })),
            draw(json!({ "drawName": "PNP", "drawDate": "2024-02-01", "drawCRS": "480" })),
            draw(json!({ "drawName": "Other", "drawDate": "2024-02-15", "drawCRS": "300" })),
        ];
        let sorted = sort_newest_first(&records);
        assert_eq!(sorted[1].category.as_deref(), Some("Other"));

        let previous = nearest_previous(&sorted, 0, same_category_earlier);
        let previous_date = previous.and_then(|r| r.draw_date).map(|d| d.to_string());
        assert_eq!(previous_date.as_deref(), Some("2024-02-01"));
        assert_eq!(field_delta(sorted[0], previous, "drawCRS"), Some(20.0));
    }

    #[test]
    fn missing_match_or_value_is_not_zero() {
        let records = vec![
            draw(json!({ "drawName": "PNP", "drawDate": "2024-03-01", "drawCRS": "500", "dd18": "" })),
            draw(json!({ "drawName": "PNP", "drawDate": "2024-02-01", "drawCRS": "500", "dd18": "10" })),
            draw(json!({ "drawName": "CEC", "drawDate": "2024-01-01", "drawCRS": "520" })),
        ];
        let sorted = sort_newest_first(&records);
        let previous = nearest_previous(&sorted, 0, same_category_earlier);
        assert_eq!(field_delta(sorted[0], previous, "drawCRS"), Some(0.0));
        assert_eq!(field_delta(sorted[0], previous, "dd18"), None);

        let none = nearest_previous(&sorted, 2, same_category_earlier);
        assert!(none.is_none());
        assert_eq!(field_delta(sorted[2], none, "drawCRS"), None);
        assert!(nearest_previous(&sorted, 9, same_category_earlier).is_none());
    }

    #[test]
    fn same_date_draws_are_not_compared() {
        let records = vec![
            draw(json!({ "drawName": "PNP", "drawDate": "2024-03-01", "drawCRS": "500" })),
            draw(json!({ "drawName": "PNP", "drawDate": "2024-03-01", "drawCRS": "510" })),
        ];
        let sorted = sort_newest_first(&records);
        assert!(nearest_previous(&sorted, 0, same_category_earlier).is_none());
    }

    #[test]
    fn latest_draw_reports_score_and_pool_changes() {
        let records = vec![
            draw(json!({
                "drawName": "CEC", "drawDate": "2024-02-01", "drawCRS": "530",
                "drawSize": "1,500", "dd18": "210,000",
            })),
            draw(json!({
                "drawName": "CEC", "drawDate": "2024-03-01", "drawCRS": "518",
                "drawSize": "2,000", "dd18": "212,500",
            })),
            draw(json!({
                "drawName": "PNP", "drawDate": "2024-04-01", "drawCRS": "700",
            })),
        ];

        let latest = latest_draw(&records, "drawCRS").unwrap();
        assert_eq!(latest.record.category.as_deref(), Some("CEC"));
        assert_eq!(latest.score_change, Some(-12.0));
        assert_eq!(latest.pool_change, Some(2500.0));
        assert_eq!(latest.previous_date.map(|d| d.to_string()).as_deref(), Some("2024-02-01"));

        let again = latest_draw(&records, "drawCRS").unwrap();
        assert_eq!(latest, again);
    }

    #[test]
    fn no_complete_draw_means_no_card() {
        let records = vec![draw(json!({ "drawName": "PNP", "drawDate": "2024-04-01" }))];
        assert!(latest_draw(&records, "drawCRS").is_none());
    }
}

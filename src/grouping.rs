use std::collections::HashMap;

use chrono::Datelike;
use serde_json::{Map, Value};

use crate::coerce::coerce_str;
use crate::models::{DrawRecord, YearTotals};

/// Synthetic category meaning "no filter".
pub const ALL_CATEGORIES: &str = "All";

#[derive(Debug, Clone, PartialEq)]
pub struct Group<'a> {
    pub label: String,
    pub records: Vec<&'a DrawRecord>,
}

/// Partitions records by `selector`, keeping categories in first-seen order.
/// Records the selector yields nothing for are left out.
pub fn group_by<'a, I, F>(records: I, selector: F) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a DrawRecord>,
    F: Fn(&DrawRecord) -> Option<String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for record in records {
        let Some(label) = selector(record) else {
            continue;
        };

        match index.get(&label) {
            Some(position) => groups[*position].records.push(record),
            None => {
                index.insert(label.clone(), groups.len());
                groups.push(Group {
                    label,
                    records: vec![record],
                });
            }
        }
    }

    groups
}

pub fn by_category(record: &DrawRecord) -> Option<String> {
    record.category.clone()
}

/// Selection-control options: `All` followed by every category in first-seen order.
pub fn category_options<'a, I>(records: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut options = vec![ALL_CATEGORIES.to_string()];
    options.extend(
        group_by(records, by_category)
            .into_iter()
            .map(|group| group.label)
            .filter(|label| label != ALL_CATEGORIES),
    );
    options
}

/// Invitations issued per year and category. Records missing a date, a
/// category or a size contribute nothing.
pub fn yearly_totals<'a, I>(records: I) -> Vec<YearTotals>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut years: Vec<YearTotals> = Vec::new();

    for record in records {
        let (Some(date), Some(category), Some(size)) =
            (record.draw_date, record.category.as_ref(), record.size())
        else {
            continue;
        };

        let position = match years.iter().position(|entry| entry.year == date.year()) {
            Some(position) => position,
            None => {
                years.push(YearTotals {
                    year: date.year(),
                    by_category: Vec::new(),
                });
                years.len() - 1
            }
        };

        let entry = &mut years[position];
        match entry.by_category.iter_mut().find(|(name, _)| name == category) {
            Some((_, total)) => *total += size,
            None => entry.by_category.push((category.clone(), size)),
        }
    }

    years.sort_by_key(|entry| entry.year);
    years
}

/// Groups dated records by calendar year, newest year first.
pub fn group_by_year<'a, I>(records: I) -> Vec<Group<'a>>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut groups = group_by(records, |record| {
        record.draw_date.map(|date| date.year().to_string())
    });
    groups.sort_by(|a, b| b.label.cmp(&a.label));
    groups
}

/// Most recent draw of every category, ordered newest first.
pub fn latest_by_category<'a, I>(records: I) -> Vec<&'a DrawRecord>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut latest: Vec<&DrawRecord> = group_by(records, by_category)
        .into_iter()
        .filter_map(|group| {
            group
                .records
                .into_iter()
                .filter(|record| record.draw_date.is_some())
                .max_by_key(|record| record.draw_date)
        })
        .collect();
    latest.sort_by(|a, b| b.draw_date.cmp(&a.draw_date));
    latest
}

/// The `limit` most recent draws that have both a date and a category.
pub fn recent_draws<'a, I>(records: I, limit: usize) -> Vec<&'a DrawRecord>
where
    I: IntoIterator<Item = &'a DrawRecord>,
{
    let mut recent: Vec<&DrawRecord> = records
        .into_iter()
        .filter(|record| record.draw_date.is_some() && record.category.is_some())
        .collect();
    recent.sort_by(|a, b| b.draw_date.cmp(&a.draw_date));
    recent.truncate(limit);
    recent
}

/// Chartable metric keys: `drawCRS` first, then every other key of the sample
/// document whose string value reads as a number, in document order.
pub fn metric_keys(sample: &Map<String, Value>) -> Vec<String> {
    let mut keys = vec!["drawCRS".to_string()];
    keys.extend(
        sample
            .iter()
            .filter(|(key, _)| key.as_str() != "drawCRS")
            .filter(|(_, value)| value.as_str().and_then(coerce_str).is_some())
            .map(|(key, _)| key.clone()),
    );
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordSchema;
    use serde_json::json;

    fn draw(date: &str, name: &str, size: &str) -> DrawRecord {
        DrawRecord::from_value(
            json!({ "drawDate": date, "drawName": name, "drawSize": size }),
            &RecordSchema::EXPRESS_ENTRY,
        )
    }

    #[test]
    fn groups_preserve_first_seen_order() {
        let records = vec![
            draw("2024-03-01", "PNP", "800"),
            draw("2024-02-01", "CEC", "3,000"),
            draw("2024-01-01", "PNP", "700"),
        ];
        let groups = group_by(&records, by_category);
        let labels: Vec<_> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["PNP", "CEC"]);
        assert_eq!(groups[0].records.len(), 2);
    }

    #[test]
    fn options_prepend_all_wildcard() {
        let records = vec![
            draw("2024-03-01", "French", "800"),
            draw("2024-02-01", "", "100"),
            draw("2024-02-01", "CEC", "3,000"),
            draw("2024-01-01", "French", "700"),
        ];
        assert_eq!(category_options(&records), vec!["All", "French", "CEC"]);
        assert_eq!(category_options(&Vec::<DrawRecord>::new()), vec!["All"]);
    }

    #[test]
    fn yearly_totals_sum_sizes_per_program() {
        let records = vec![
            draw("2023-03-01", "PNP", "800"),
            draw("2024-02-01", "CEC", "3,000"),
            draw("2023-01-01", "PNP", "700"),
            draw("2023-05-01", "CEC", "n/a"),
        ];
        let totals = yearly_totals(&records);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].year, 2023);
        assert_eq!(totals[0].by_category, vec![("PNP".to_string(), 1500.0)]);
        assert_eq!(totals[1].year, 2024);
        assert_eq!(totals[1].total(), 3000.0);
    }

    #[test]
    fn latest_per_category_and_recent_list() {
        let records = vec![
            draw("2024-01-01", "PNP", "700"),
            draw("2024-03-01", "PNP", "800"),
            draw("2024-02-01", "CEC", "3,000"),
            draw("bad", "CEC", "1"),
        ];
        let latest = latest_by_category(&records);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].size(), Some(800.0));
        assert_eq!(latest[1].size(), Some(3000.0));

        let recent = recent_draws(&records, 2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].size(), Some(800.0));
    }

    #[test]
    fn years_listed_newest_first() {
        let records = vec![
            draw("2022-01-01", "PNP", "1"),
            draw("2024-01-01", "PNP", "1"),
            draw("2023-01-01", "PNP", "1"),
        ];
        let labels: Vec<_> = group_by_year(&records).into_iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["2024", "2023", "2022"]);
    }

    #[test]
    fn metric_keys_follow_sample_document() {
        let sample = json!({
            "drawNumber": "311",
            "drawDate": "2024-03-01",
            "drawCRS": "518",
            "drawName": "CEC",
            "dd18": "211,245",
            "dd1": "",
        });
        let keys = metric_keys(sample.as_object().unwrap());
        assert_eq!(keys, vec!["drawCRS", "drawNumber", "dd18"]);
    }
}

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::coerce::{coerce, leading_integer};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Placeholder shown wherever a statistic has no input to work from.
pub const MISSING_MARKER: &str = "–";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFormat {
    /// A plain number such as `"481"`.
    Plain,
    /// Free text whose first integer is the score, such as `"450-470"`.
    LeadingInteger,
}

/// Names the document fields that carry a draw's date, category, score and size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    pub date_field: &'static str,
    pub category_field: &'static str,
    pub score_field: &'static str,
    pub size_field: &'static str,
    pub score_format: ScoreFormat,
    pub title_case_category: bool,
}

impl RecordSchema {
    pub const EXPRESS_ENTRY: RecordSchema = RecordSchema {
        date_field: "drawDate",
        category_field: "drawName",
        score_field: "drawCRS",
        size_field: "drawSize",
        score_format: ScoreFormat::Plain,
        title_case_category: false,
    };

    pub const PROVINCIAL: RecordSchema = RecordSchema {
        date_field: "date_issued",
        category_field: "stream",
        score_field: "score_range",
        size_field: "number_of_invitations_issued",
        score_format: ScoreFormat::LeadingInteger,
        title_case_category: true,
    };
}

/// One draw event. The source document is kept as-is; typed accessors read
/// through the schema it was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub draw_date: Option<NaiveDate>,
    pub category: Option<String>,
    score: Option<f64>,
    size: Option<f64>,
    pub fields: Map<String, Value>,
}

impl DrawRecord {
    pub fn from_document(fields: Map<String, Value>, schema: &RecordSchema) -> Self {
        let draw_date = fields
            .get(schema.date_field)
            .and_then(Value::as_str)
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok());

        let category = fields
            .get(schema.category_field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(|label| {
                if schema.title_case_category {
                    title_case(label)
                } else {
                    label.to_string()
                }
            });

        let score = fields.get(schema.score_field).and_then(|raw| match schema.score_format {
            ScoreFormat::Plain => coerce(raw),
            ScoreFormat::LeadingInteger => raw.as_str().and_then(leading_integer),
        });
        let size = fields.get(schema.size_field).and_then(coerce);

        Self {
            draw_date,
            category,
            score,
            size,
            fields,
        }
    }

    /// Builds a record from any JSON value; non-objects become empty records.
    pub fn from_value(value: Value, schema: &RecordSchema) -> Self {
        match value {
            Value::Object(fields) => Self::from_document(fields, schema),
            _ => Self::from_document(Map::new(), schema),
        }
    }

    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn size(&self) -> Option<f64> {
        self.size
    }

    /// Coerced numeric value of any raw field.
    pub fn field(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(coerce)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn category_or_empty(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

fn title_case(text: &str) -> String {
    text.to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One bar of the stacked score distribution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketBar {
    pub label: &'static str,
    pub count: f64,
    pub base: f64,
    pub aggregate: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub draw_date: NaiveDate,
    pub cutoff_score: Option<f64>,
    pub cutoff_label: Option<&'static str>,
    pub bars: Vec<BucketBar>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    pub dates: Vec<NaiveDate>,
    pub ranges: Vec<&'static str>,
    /// `cells[row][column]`, one row per range and one column per date.
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub count: usize,
}

impl MonthCount {
    /// Grouping key in `M-YYYY` form.
    pub fn key(&self) -> String {
        format!("{}-{}", self.month, self.year)
    }
}

impl fmt::Display for MonthCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        let name = (self.month as usize)
            .checked_sub(1)
            .and_then(|index| NAMES.get(index))
            .copied()
            .unwrap_or("???");
        write!(f, "{}-{}", name, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySeries {
    pub category: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotals {
    pub year: i32,
    pub by_category: Vec<(String, f64)>,
}

impl YearTotals {
    pub fn total(&self) -> f64 {
        self.by_category.iter().map(|(_, size)| size).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LatestDraw {
    pub record: DrawRecord,
    pub previous_date: Option<NaiveDate>,
    pub score_change: Option<f64>,
    pub pool_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub user_id: String,
    pub text: String,
    pub due_date: Option<NaiveDate>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn express_entry_fields_are_typed() {
        let record = DrawRecord::from_value(
            json!({
                "drawDate": "2024-03-01",
                "drawName": "Canadian Experience Class",
                "drawCRS": "518",
                "drawSize": "1,500",
                "dd1": "",
            }),
            &RecordSchema::EXPRESS_ENTRY,
        );

        assert_eq!(record.draw_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(record.category.as_deref(), Some("Canadian Experience Class"));
        assert_eq!(record.score(), Some(518.0));
        assert_eq!(record.size(), Some(1500.0));
        assert_eq!(record.field("dd1"), None);
        assert_eq!(record.field("dd2"), None);
    }

    #[test]
    fn unparseable_date_is_absent() {
        let record = DrawRecord::from_value(
            json!({ "drawDate": "March 1, 2024", "drawName": "PNP" }),
            &RecordSchema::EXPRESS_ENTRY,
        );
        assert_eq!(record.draw_date, None);
        assert_eq!(record.category.as_deref(), Some("PNP"));
    }

    #[test]
    fn provincial_schema_reads_score_range_and_title_cases_stream() {
        let record = DrawRecord::from_value(
            json!({
                "date_issued": "2025-02-11",
                "stream": "employer job offer: FOREIGN WORKER stream",
                "score_range": "52 and above",
                "number_of_invitations_issued": "1,002",
            }),
            &RecordSchema::PROVINCIAL,
        );

        assert_eq!(
            record.category.as_deref(),
            Some("Employer Job Offer: Foreign Worker Stream")
        );
        assert_eq!(record.score(), Some(52.0));
        assert_eq!(record.size(), Some(1002.0));
    }

    #[test]
    fn month_count_formats_key_and_label() {
        let month = MonthCount {
            year: 2022,
            month: 4,
            count: 3,
        };
        assert_eq!(month.key(), "4-2022");
        assert_eq!(month.to_string(), "Apr-2022");
    }
}

use chrono::NaiveDate;

use crate::models::ChecklistItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChecklistItem {
    pub text: String,
    pub due_date: Option<NaiveDate>,
}

impl NewChecklistItem {
    /// Trims the text; blank items are rejected.
    pub fn new(text: &str, due_date: Option<NaiveDate>) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        Some(Self {
            text: text.to_string(),
            due_date,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    /// Whole percent, 0 for an empty list.
    pub percent: u32,
}

pub fn progress(items: &[ChecklistItem]) -> Progress {
    let completed = items.iter().filter(|item| item.done).count();
    let total = items.len();
    let percent = if total == 0 {
        0
    } else {
        (completed as f64 / total as f64 * 100.0).round() as u32
    };

    Progress {
        completed,
        total,
        percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn item(done: bool) -> ChecklistItem {
        ChecklistItem {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            text: "Upload police certificate".to_string(),
            due_date: None,
            done,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_items_are_rejected() {
        assert!(NewChecklistItem::new("   ", None).is_none());
        let item = NewChecklistItem::new("  Book medical exam ", None).unwrap();
        assert_eq!(item.text, "Book medical exam");
    }

    #[test]
    fn progress_rounds_to_whole_percent() {
        let items = vec![item(true), item(false), item(false)];
        assert_eq!(
            progress(&items),
            Progress {
                completed: 1,
                total: 3,
                percent: 33
            }
        );
        assert_eq!(progress(&[item(true), item(true)]).percent, 100);
        assert_eq!(progress(&[]).percent, 0);
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day's diary text, keyed by its calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub date: NaiveDate,
    #[serde(default)]
    pub content: String,
}

impl DiaryEntry {
    pub fn new(date: NaiveDate, content: impl Into<String>) -> Self {
        DiaryEntry {
            date,
            content: content.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Dates the store holds content for, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryIndex {
    pub entries: Vec<NaiveDate>,
}

/// Body of a failed request, e.g. `{"error": "Entry not found"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn entry_uses_iso_dates_on_the_wire() {
        let entry = DiaryEntry::new(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), "Hello");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"date": "2024-01-15", "content": "Hello"})
        );
    }

    #[test]
    fn index_keeps_server_order() {
        let index: EntryIndex =
            serde_json::from_str(r#"{"entries": ["2024-01-15", "2023-12-31"]}"#).unwrap();
        assert_eq!(
            index.entries,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            ]
        );
    }

    #[test]
    fn whitespace_only_content_is_blank() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(DiaryEntry::new(date, "  \n\t").is_blank());
        assert!(!DiaryEntry::new(date, " x ").is_blank());
    }
}

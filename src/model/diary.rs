use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use super::temporal::{parse_clock_time, parse_date};
use super::{EntityKind, Record, RecordId};
use crate::error::EngineResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diary {
    pub id: RecordId,
    pub title: String,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_images: bool,
    pub category: String,
}

impl Record for Diary {
    const KIND: EntityKind = EntityKind::Diary;
    const CATEGORIZED: bool = true;

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn searchable_text(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str(), self.content.as_str()];
        fields.extend(self.tags.iter().map(String::as_str));
        fields
    }

    fn date_key(&self) -> EngineResult<PrimitiveDateTime> {
        let date = parse_date("date", &self.date)?;
        if self.time.trim().is_empty() {
            return Ok(date.midnight());
        }
        Ok(date.with_time(parse_clock_time("time", &self.time)?))
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use assert_matches::assert_matches;
    use time::macros::datetime;

    fn entry(date: &str, time: &str) -> Diary {
        Diary {
            id: 1,
            title: "周末旅行".into(),
            content: "今天去了郊外爬山".into(),
            date: date.into(),
            time: time.into(),
            tags: vec!["旅行".into()],
            has_images: true,
            category: "生活".into(),
        }
    }

    #[test]
    fn date_key_combines_date_and_clock_time() -> EngineResult<()> {
        assert_eq!(
            entry("2025-12-02", "14:20").date_key()?,
            datetime!(2025-12-02 14:20)
        );
        assert_eq!(entry("2025-12-02", "").date_key()?, datetime!(2025-12-02 0:00));
        Ok(())
    }

    #[test]
    fn malformed_clock_time_is_invalid_data() {
        let err = entry("2025-12-02", "25:99").date_key().unwrap_err();
        assert_matches!(err, EngineError::InvalidData { field: "time", .. });
    }

    #[test]
    fn tags_are_searchable() {
        let diary = entry("2025-12-02", "14:20");
        assert!(diary.searchable_text().contains(&"旅行"));
    }
}

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use time::PrimitiveDateTime;

use super::temporal::parse_timestamp;
use super::{EntityKind, Priority, Record, RecordId, Schedule};
use crate::error::EngineResult;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum TodoStatus {
    Pending,
    Completed,
}

impl TodoStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Pending => Self::Completed,
            Self::Completed => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TodoStatus,
    pub priority: Priority,
    pub due_date: String,
    pub category: String,
}

impl Todo {
    pub fn is_completed(&self) -> bool {
        self.status == TodoStatus::Completed
    }
}

impl Record for Todo {
    const KIND: EntityKind = EntityKind::Todo;
    const STATUS_BUCKETS: &'static [&'static str] = &["pending", "completed"];
    const CATEGORIZED: bool = true;

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn searchable_text(&self) -> Vec<&str> {
        vec![self.title.as_str(), self.description.as_str()]
    }

    fn date_key(&self) -> EngineResult<PrimitiveDateTime> {
        parse_timestamp("dueDate", &self.due_date)
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn status_label(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn schedule(&self) -> Option<Schedule<'_>> {
        Some(Schedule {
            field: "dueDate",
            at: &self.due_date,
            completed: self.is_completed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_lowercase_label() -> anyhow::Result<()> {
        let raw = r#"{"id":3,"title":"健身锻炼","description":"","status":"completed",
            "priority":"medium","dueDate":"2025-12-05","category":"健康"}"#;
        let todo: Todo = serde_json::from_str(raw)?;
        assert!(todo.is_completed());
        assert_eq!(todo.status_label(), Some("completed"));
        assert_eq!(todo.status.toggled(), TodoStatus::Pending);
        let round = serde_json::to_value(&todo)?;
        assert_eq!(round["dueDate"], "2025-12-05");
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::{AsRefStr, Display, EnumString};
use time::PrimitiveDateTime;

use super::temporal::parse_timestamp;
use super::{require_title, EntityKind, Record, RecordId, Schedule};
use crate::error::{EngineError, EngineResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum RepeatType {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_repeating: bool,
    pub repeat_type: RepeatType,
    /// Free-form lead time such as "15分钟".
    #[serde(default, alias = "提前提醒")]
    pub advance_notice: Option<String>,
}

impl Record for Reminder {
    const KIND: EntityKind = EntityKind::Reminder;
    const STATUS_BUCKETS: &'static [&'static str] = &["pending", "completed"];

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
        parse_timestamp("time", &self.time)
    }

    fn status_label(&self) -> Option<&str> {
        Some(if self.is_completed {
            "completed"
        } else {
            "pending"
        })
    }

    fn schedule(&self) -> Option<Schedule<'_>> {
        Some(Schedule {
            field: "time",
            at: &self.time,
            completed: self.is_completed,
        })
    }

    fn validate(&self) -> EngineResult<()> {
        require_title(Self::KIND, &self.title)?;
        if !self.is_repeating && self.repeat_type != RepeatType::Once {
            return Err(EngineError::validation(format!(
                "reminder #{} is not repeating but has repeat type {}",
                self.id, self.repeat_type
            )));
        }
        Ok(())
    }
}

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use strum::{AsRefStr, Display, EnumString};
use time::PrimitiveDateTime;

use super::temporal::parse_timestamp;
use super::{EntityKind, Record, RecordId};
use crate::error::EngineResult;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum BackupType {
    Auto,
    Manual,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum BackupStatus {
    InProgress,
    Completed,
    Failed,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: RecordId,
    pub name: String,
    pub date: String,
    /// Human-readable size, e.g. "12.5 MB". Absent until the backup completes.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(rename = "type")]
    pub kind: BackupType,
    pub status: BackupStatus,
    #[serde(default)]
    pub entries: u64,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

impl Record for Backup {
    const KIND: EntityKind = EntityKind::Backup;
    const STATUS_BUCKETS: &'static [&'static str] = &["in-progress", "completed", "failed"];

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn searchable_text(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn date_key(&self) -> EngineResult<PrimitiveDateTime> {
        parse_timestamp("date", &self.date)
    }

    fn status_label(&self) -> Option<&str> {
        Some(self.status.as_ref())
    }
}

/// Formats a byte count the way the backup page shows sizes.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {}", UNITS[unit])
}

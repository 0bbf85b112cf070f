use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use time::PrimitiveDateTime;

use crate::error::{EngineError, EngineResult};

mod backup;
mod diary;
mod plan;
mod reminder;
pub mod temporal;
mod todo;
mod website;

pub use backup::{format_size, Backup, BackupStatus, BackupType};
pub use diary::Diary;
pub use plan::{Milestone, Plan};
pub use reminder::{Reminder, RepeatType};
pub use temporal::{Clock, FixedClock, SystemClock};
pub use todo::{Todo, TodoStatus};
pub use website::Website;

pub type RecordId = i64;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EntityKind {
    Diary,
    Todo,
    Plan,
    Reminder,
    Website,
    Backup,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A dated item with a completion flag, used by the time-window filter.
#[derive(Debug, Clone, Copy)]
pub struct Schedule<'a> {
    pub field: &'static str,
    pub at: &'a str,
    pub completed: bool,
}

impl Schedule<'_> {
    pub fn timestamp(&self) -> EngineResult<PrimitiveDateTime> {
        temporal::parse_timestamp(self.field, self.at)
    }
}

/// Explicit user answer required before a hard delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl Confirmation {
    pub fn from_flag(confirmed: bool) -> Self {
        if confirmed {
            Self::Confirmed
        } else {
            Self::Declined
        }
    }

    pub(crate) fn require(self, kind: EntityKind, id: RecordId) -> EngineResult<()> {
        match self {
            Self::Confirmed => Ok(()),
            Self::Declined => Err(EngineError::validation(format!(
                "deleting {kind} #{id} needs confirmation"
            ))),
        }
    }
}

/// Shared shape of the six dashboard record kinds.
///
/// Every accessor beyond `id`, `title`, `searchable_text` and `date_key` is
/// optional; a kind that does not carry a dimension returns `None` and never
/// matches an active filter on it.
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// Status buckets in board order. Empty for kinds without a status.
    const STATUS_BUCKETS: &'static [&'static str] = &[];

    /// Whether records of this kind carry a category.
    const CATEGORIZED: bool = false;

    fn id(&self) -> RecordId;

    fn title(&self) -> &str;

    fn searchable_text(&self) -> Vec<&str>;

    /// Designated date for sorting and date-range filters.
    fn date_key(&self) -> EngineResult<PrimitiveDateTime>;

    fn category(&self) -> Option<&str> {
        None
    }

    fn tags(&self) -> &[String] {
        &[]
    }

    fn status_label(&self) -> Option<&str> {
        None
    }

    fn priority(&self) -> Option<Priority> {
        None
    }

    fn is_favorite(&self) -> Option<bool> {
        None
    }

    fn schedule(&self) -> Option<Schedule<'_>> {
        None
    }

    fn validate(&self) -> EngineResult<()> {
        require_title(Self::KIND, self.title())
    }
}

pub(crate) fn require_title(kind: EntityKind, title: &str) -> EngineResult<()> {
    if title.trim().is_empty() {
        return Err(EngineError::validation(format!("{kind} title cannot be empty")));
    }
    Ok(())
}

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use super::temporal::{format_timestamp, parse_timestamp};
use super::{require_title, EntityKind, Priority, Record, RecordId};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: RecordId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub is_favorite: bool,
    pub importance: Priority,
    #[serde(default)]
    pub visits: u64,
    pub last_visit: String,
    #[serde(default)]
    pub favicon: String,
}

impl Website {
    pub fn record_visit(&mut self, at: PrimitiveDateTime) {
        self.visits += 1;
        self.last_visit = format_timestamp(at);
    }

    /// Host portion of the URL, without scheme, credentials or port.
    pub fn hostname(&self) -> Option<&str> {
        let rest = self.url.split_once("://").map(|(_, rest)| rest)?;
        let authority = rest.split(['/', '?', '#']).next()?;
        let host = authority.rsplit('@').next()?;
        let host = host.split(':').next()?;
        if host.is_empty() {
            None
        } else {
            Some(host)
        }
    }
}

impl Record for Website {
    const KIND: EntityKind = EntityKind::Website;
    const CATEGORIZED: bool = true;

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn searchable_text(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.description.as_str(),
            self.url.as_str(),
        ]
    }

    fn date_key(&self) -> EngineResult<PrimitiveDateTime> {
        parse_timestamp("lastVisit", &self.last_visit)
    }

    fn category(&self) -> Option<&str> {
        Some(self.category.as_str())
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.importance)
    }

    fn is_favorite(&self) -> Option<bool> {
        Some(self.is_favorite)
    }

    fn validate(&self) -> EngineResult<()> {
        require_title(Self::KIND, &self.name)?;
        if self.hostname().is_none() {
            return Err(EngineError::validation(format!(
                "website #{} has no usable url: {:?}",
                self.id, self.url
            )));
        }
        Ok(())
    }
}

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

use super::temporal::{parse_date, parse_timestamp};
use super::{require_title, EntityKind, Priority, Record, RecordId};
use crate::error::{EngineError, EngineResult};

/// Dated checkpoint owned by a single plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub id: RecordId,
    pub name: String,
    pub date: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    /// Set by hand, never derived from milestone completion.
    pub progress: u8,
    pub priority: Priority,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
}

impl Plan {
    /// Completed milestones over total, or `None` for a plan without milestones.
    pub fn milestone_completion(&self) -> Option<(usize, usize)> {
        if self.milestones.is_empty() {
            return None;
        }
        let done = self.milestones.iter().filter(|m| m.completed).count();
        Some((done, self.milestones.len()))
    }

    pub fn duration_days(&self) -> EngineResult<i64> {
        let start = parse_date("startDate", &self.start_date)?;
        let end = parse_date("endDate", &self.end_date)?;
        Ok((end - start).whole_days().abs())
    }

    pub fn milestone(&self, milestone_id: RecordId) -> EngineResult<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| {
                EngineError::validation(format!(
                    "plan #{} has no milestone #{milestone_id}",
                    self.id
                ))
            })
    }

    pub fn toggle_milestone(&mut self, milestone_id: RecordId) -> EngineResult<bool> {
        let plan_id = self.id;
        let milestone = self
            .milestones
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| {
                EngineError::validation(format!(
                    "plan #{plan_id} has no milestone #{milestone_id}"
                ))
            })?;
        milestone.completed = !milestone.completed;
        Ok(milestone.completed)
    }
}

impl Record for Plan {
    const KIND: EntityKind = EntityKind::Plan;

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
        parse_timestamp("startDate", &self.start_date)
    }

    fn priority(&self) -> Option<Priority> {
        Some(self.priority)
    }

    fn validate(&self) -> EngineResult<()> {
        require_title(Self::KIND, &self.title)?;
        if self.progress > 100 {
            return Err(EngineError::validation(format!(
                "plan progress must be within 0..=100, got {}",
                self.progress
            )));
        }
        let mut seen = HashSet::new();
        for milestone in &self.milestones {
            if !seen.insert(milestone.id) {
                return Err(EngineError::validation(format!(
                    "duplicate milestone id {} in plan #{}",
                    milestone.id, self.id
                )));
            }
        }
        Ok(())
    }
}

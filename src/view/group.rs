use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::{EngineError, EngineResult};
use crate::model::Record;

/// Name of the pseudo-group holding every record in category grouping.
pub const ALL_GROUP: &str = "all";

pub type Groups<R> = IndexMap<String, Vec<R>>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum GroupKey {
    Status,
    Category,
}

/// Partitions an already filtered and sorted sequence into labelled buckets.
/// Each bucket keeps the incoming order.
pub fn group_records<R: Record>(records: &[R], key: GroupKey) -> EngineResult<Groups<R>> {
    match key {
        GroupKey::Status => group_by_status(records),
        GroupKey::Category => group_by_category(records),
    }
}

fn group_by_status<R: Record>(records: &[R]) -> EngineResult<Groups<R>> {
    if R::STATUS_BUCKETS.is_empty() {
        return Err(EngineError::validation(format!(
            "{} records have no status to group by",
            R::KIND
        )));
    }
    let mut groups: Groups<R> = R::STATUS_BUCKETS
        .iter()
        .map(|label| (label.to_string(), Vec::new()))
        .collect();
    for record in records {
        let label = record.status_label().unwrap_or_default();
        let bucket = groups
            .get_mut(label)
            .ok_or_else(|| EngineError::invalid_data("status", label))?;
        bucket.push(record.clone());
    }
    Ok(groups)
}

fn group_by_category<R: Record>(records: &[R]) -> EngineResult<Groups<R>> {
    if !R::CATEGORIZED {
        return Err(EngineError::validation(format!(
            "{} records have no category to group by",
            R::KIND
        )));
    }
    let mut groups: Groups<R> = IndexMap::new();
    groups.insert(ALL_GROUP.to_string(), records.to_vec());
    for record in records {
        let Some(category) = record.category() else {
            continue;
        };
        if category == ALL_GROUP {
            return Err(EngineError::validation(format!(
                "category name {ALL_GROUP:?} is reserved"
            )));
        }
        groups
            .entry(category.to_string())
            .or_default()
            .push(record.clone());
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Diary, Plan, Priority, Todo, TodoStatus};
    use assert_matches::assert_matches;

    fn todo(id: i64, status: TodoStatus) -> Todo {
        Todo {
            id,
            title: format!("todo {id}"),
            description: String::new(),
            status,
            priority: Priority::Medium,
            due_date: "2025-12-06".into(),
            category: "工作".into(),
        }
    }

    fn diary(id: i64, category: &str) -> Diary {
        Diary {
            id,
            title: format!("diary {id}"),
            content: String::new(),
            date: "2025-12-05".into(),
            time: String::new(),
            tags: Vec::new(),
            has_images: false,
            category: category.into(),
        }
    }

    fn ids<R: Record>(records: &[R]) -> Vec<i64> {
        records.iter().map(|record| record.id()).collect()
    }

    #[test]
    fn todos_split_into_pending_and_completed() -> EngineResult<()> {
        let todos = vec![
            todo(1, TodoStatus::Pending),
            todo(2, TodoStatus::Completed),
            todo(3, TodoStatus::Pending),
        ];
        let groups = group_records(&todos, GroupKey::Status)?;
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["pending", "completed"]);
        assert_eq!(ids(&groups["pending"]), vec![1, 3]);
        assert_eq!(ids(&groups["completed"]), vec![2]);
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, todos.len());
        Ok(())
    }

    #[test]
    fn status_buckets_exist_even_when_empty() -> EngineResult<()> {
        let groups = group_records(&[todo(1, TodoStatus::Pending)], GroupKey::Status)?;
        assert!(groups["completed"].is_empty());
        Ok(())
    }

    #[test]
    fn category_groups_lead_with_all() -> EngineResult<()> {
        let diaries = vec![diary(1, "工作"), diary(2, "学习"), diary(3, "工作")];
        let groups = group_records(&diaries, GroupKey::Category)?;
        assert_eq!(
            groups.keys().collect::<Vec<_>>(),
            vec![ALL_GROUP, "工作", "学习"]
        );
        assert_eq!(ids(&groups[ALL_GROUP]), vec![1, 2, 3]);
        assert_eq!(ids(&groups["工作"]), vec![1, 3]);
        Ok(())
    }

    #[test]
    fn reserved_category_name_is_rejected() {
        let diaries = vec![diary(1, "all")];
        assert_matches!(
            group_records(&diaries, GroupKey::Category),
            Err(EngineError::Validation { .. })
        );
    }

    #[test]
    fn kinds_without_the_dimension_cannot_be_grouped() {
        let diaries = vec![diary(1, "工作")];
        assert_matches!(
            group_records(&diaries, GroupKey::Status),
            Err(EngineError::Validation { .. })
        );
        let plans: Vec<Plan> = Vec::new();
        assert_matches!(
            group_records(&plans, GroupKey::Category),
            Err(EngineError::Validation { .. })
        );
    }
}

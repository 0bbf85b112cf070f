use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::error::EngineResult;
use crate::model::Record;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortField {
    #[default]
    Date,
    Title,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: SortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }
}

/// Orders records by `spec`, keeping equal keys in their incoming order for
/// either direction.
///
/// Every date key is parsed before anything moves, so a malformed date fails
/// the whole sort instead of landing at an arbitrary position.
pub fn sort_records<R: Record>(records: Vec<R>, spec: SortSpec) -> EngineResult<Vec<R>> {
    match spec.field {
        SortField::Date => {
            let mut keyed = records
                .into_iter()
                .map(|record| Ok((record.date_key()?, record)))
                .collect::<EngineResult<Vec<_>>>()?;
            keyed.sort_by(|(a, _), (b, _)| spec.direction.apply(a.cmp(b)));
            Ok(keyed.into_iter().map(|(_, record)| record).collect())
        }
        SortField::Title => {
            let mut keyed = records
                .into_iter()
                .map(|record| (record.title().to_lowercase(), record))
                .collect::<Vec<_>>();
            keyed.sort_by(|(a, _), (b, _)| spec.direction.apply(a.cmp(b)));
            Ok(keyed.into_iter().map(|(_, record)| record).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::model::{Priority, Todo, TodoStatus};
    use assert_matches::assert_matches;

    fn todo(id: i64, title: &str, due: &str) -> Todo {
        Todo {
            id,
            title: title.into(),
            description: String::new(),
            status: TodoStatus::Pending,
            priority: Priority::Medium,
            due_date: due.into(),
            category: "工作".into(),
        }
    }

    fn ids(records: &[Todo]) -> Vec<i64> {
        records.iter().map(|t| t.id).collect()
    }

    #[test]
    fn default_is_newest_first_by_date() {
        let spec = SortSpec::default();
        assert_eq!(spec.field, SortField::Date);
        assert_eq!(spec.direction, SortDirection::Descending);
    }

    #[test]
    fn directions_mirror_each_other_without_ties() -> EngineResult<()> {
        let todos = vec![
            todo(1, "a", "2025-12-06"),
            todo(2, "b", "2025-12-05"),
            todo(3, "c", "2025-12-10"),
            todo(4, "d", "2025-12-08"),
        ];
        let desc = sort_records(todos.clone(), SortSpec::default())?;
        let asc = sort_records(
            todos,
            SortSpec::new(SortField::Date, SortDirection::Ascending),
        )?;
        assert_eq!(ids(&desc), vec![3, 4, 1, 2]);
        let mut reversed = ids(&asc);
        reversed.reverse();
        assert_eq!(ids(&desc), reversed);
        Ok(())
    }

    #[test]
    fn ties_keep_store_order_in_both_directions() -> EngineResult<()> {
        let todos = vec![
            todo(1, "a", "2025-12-05"),
            todo(2, "b", "2025-12-06"),
            todo(3, "c", "2025-12-05"),
            todo(4, "d", "2025-12-06"),
        ];
        let desc = sort_records(todos.clone(), SortSpec::default())?;
        assert_eq!(ids(&desc), vec![2, 4, 1, 3]);
        let asc = sort_records(
            todos,
            SortSpec::new(SortField::Date, SortDirection::Ascending),
        )?;
        assert_eq!(ids(&asc), vec![1, 3, 2, 4]);
        Ok(())
    }

    #[test]
    fn titles_sort_case_insensitively() -> EngineResult<()> {
        let todos = vec![
            todo(1, "banana", "2025-12-05"),
            todo(2, "Apple", "2025-12-05"),
            todo(3, "cherry", "2025-12-05"),
        ];
        let sorted = sort_records(
            todos,
            SortSpec::new(SortField::Title, SortDirection::Ascending),
        )?;
        assert_eq!(ids(&sorted), vec![2, 1, 3]);
        Ok(())
    }

    #[test]
    fn malformed_date_fails_the_sort() {
        let todos = vec![todo(1, "a", "2025-12-05"), todo(2, "b", "12/06/2025")];
        let err = sort_records(todos, SortSpec::default()).unwrap_err();
        assert_matches!(err, EngineError::InvalidData { field: "dueDate", .. });
    }
}

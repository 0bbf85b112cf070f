use time::PrimitiveDateTime;

use super::{Filters, RangeFilter, TimeWindow};
use crate::error::EngineResult;
use crate::model::{Priority, Record};

/// Combined search-and-filter test for one record kind.
///
/// Text matching is a case-insensitive substring test using Unicode lower
/// casing, so CJK and mixed-script titles match the same way ASCII does.
/// `now` is captured at build time; time-window results depend on it.
#[derive(Debug, Clone)]
pub struct Predicate {
    needle: Option<String>,
    categories: Vec<String>,
    tags: Vec<String>,
    statuses: Vec<String>,
    priorities: Vec<Priority>,
    favorite: Option<bool>,
    window: TimeWindow,
    date: RangeFilter,
    now: PrimitiveDateTime,
}

impl Predicate {
    pub fn build(search_text: &str, filters: &Filters, now: PrimitiveDateTime) -> Self {
        let trimmed = search_text.trim();
        let needle = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        };
        Self {
            needle,
            categories: lowered(&filters.categories),
            tags: lowered(&filters.tags),
            statuses: lowered(&filters.statuses),
            priorities: filters.priorities.clone(),
            favorite: filters.favorite,
            window: filters.window,
            date: filters.date,
            now,
        }
    }

    /// True when the predicate accepts every record.
    pub fn is_identity(&self) -> bool {
        self.needle.is_none()
            && self.categories.is_empty()
            && self.tags.is_empty()
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.favorite.is_none()
            && self.window == TimeWindow::All
            && !self.date.has_range()
    }

    pub fn matches<R: Record>(&self, record: &R) -> EngineResult<bool> {
        if let Some(needle) = &self.needle {
            let hit = record
                .searchable_text()
                .into_iter()
                .any(|field| field.to_lowercase().contains(needle.as_str()));
            if !hit {
                return Ok(false);
            }
        }

        if !self.categories.is_empty() {
            let Some(category) = record.category() else {
                return Ok(false);
            };
            if !contains_lowered(&self.categories, category) {
                return Ok(false);
            }
        }

        if !self.tags.is_empty()
            && !record
                .tags()
                .iter()
                .any(|tag| contains_lowered(&self.tags, tag))
        {
            return Ok(false);
        }

        if !self.statuses.is_empty() {
            let Some(status) = record.status_label() else {
                return Ok(false);
            };
            if !contains_lowered(&self.statuses, status) {
                return Ok(false);
            }
        }

        if !self.priorities.is_empty() {
            match record.priority() {
                Some(priority) if self.priorities.contains(&priority) => {}
                _ => return Ok(false),
            }
        }

        if let Some(wanted) = self.favorite {
            if record.is_favorite() != Some(wanted) {
                return Ok(false);
            }
        }

        if self.date.has_range() && !self.date.contains(record.date_key()?) {
            return Ok(false);
        }

        self.matches_window(record)
    }

    /// Records matching the predicate, in their original order.
    pub fn apply<R: Record>(&self, records: &[R]) -> EngineResult<Vec<R>> {
        let mut out = Vec::new();
        for record in records {
            if self.matches(record)? {
                out.push(record.clone());
            }
        }
        Ok(out)
    }

    fn matches_window<R: Record>(&self, record: &R) -> EngineResult<bool> {
        if self.window == TimeWindow::All {
            return Ok(true);
        }
        let Some(schedule) = record.schedule() else {
            return Ok(false);
        };
        let matched = match self.window {
            TimeWindow::All => true,
            TimeWindow::Completed => schedule.completed,
            TimeWindow::Upcoming => !schedule.completed && schedule.timestamp()? >= self.now,
            TimeWindow::Past => !schedule.completed && schedule.timestamp()? < self.now,
        };
        Ok(matched)
    }
}

fn lowered(values: &[String]) -> Vec<String> {
    values.iter().map(|value| value.to_lowercase()).collect()
}

fn contains_lowered(wanted: &[String], value: &str) -> bool {
    let value = value.to_lowercase();
    wanted.iter().any(|candidate| *candidate == value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::model::{
        Diary, Priority, Reminder, RepeatType, Todo, TodoStatus, Website,
    };
    use assert_matches::assert_matches;
    use time::macros::datetime;

    const NOW: PrimitiveDateTime = datetime!(2025-12-20 0:00);

    fn diary(id: i64, title: &str, category: &str, tags: &[&str]) -> Diary {
        Diary {
            id,
            title: title.into(),
            content: String::new(),
            date: "2025-12-05".into(),
            time: "15:30".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            has_images: false,
            category: category.into(),
        }
    }

    fn reminder(id: i64, time: &str, completed: bool) -> Reminder {
        Reminder {
            id,
            title: format!("reminder {id}"),
            description: String::new(),
            time: time.into(),
            is_completed: completed,
            is_repeating: false,
            repeat_type: RepeatType::Once,
            advance_notice: None,
        }
    }

    fn todo(id: i64, status: TodoStatus, priority: Priority, category: &str) -> Todo {
        Todo {
            id,
            title: format!("todo {id}"),
            description: String::new(),
            status,
            priority,
            due_date: "2025-12-06".into(),
            category: category.into(),
        }
    }

    #[test]
    fn empty_input_is_identity() -> EngineResult<()> {
        let predicate = Predicate::build("   ", &Filters::default(), NOW);
        assert!(predicate.is_identity());
        assert!(predicate.matches(&diary(1, "任何", "工作", &[]))?);
        Ok(())
    }

    #[test]
    fn text_match_ignores_case_across_scripts() -> EngineResult<()> {
        let entry = diary(2, "学习React笔记", "学习", &[]);
        for query in ["react", "REACT", "React笔记", "学习"] {
            let predicate = Predicate::build(query, &Filters::default(), NOW);
            assert!(predicate.matches(&entry)?, "{query} should match");
        }
        let miss = Predicate::build("vue", &Filters::default(), NOW);
        assert!(!miss.matches(&entry)?);

        let umlaut = diary(3, "ÜBERSICHT", "其他", &[]);
        let predicate = Predicate::build("übersicht", &Filters::default(), NOW);
        assert!(predicate.matches(&umlaut)?);
        Ok(())
    }

    #[test]
    fn tags_are_searched_for_diaries() -> EngineResult<()> {
        let entry = diary(1, "项目开发总结", "工作", &["项目", "React"]);
        let predicate = Predicate::build("react", &Filters::default(), NOW);
        assert!(predicate.matches(&entry)?);
        Ok(())
    }

    #[test]
    fn values_within_a_dimension_are_ored() -> EngineResult<()> {
        let filters = Filters::default().category("工作").category("学习");
        let predicate = Predicate::build("", &filters, NOW);
        assert!(predicate.matches(&diary(1, "a", "工作", &[]))?);
        assert!(predicate.matches(&diary(2, "b", "学习", &[]))?);
        assert!(!predicate.matches(&diary(3, "c", "生活", &[]))?);
        Ok(())
    }

    #[test]
    fn dimensions_are_anded() -> EngineResult<()> {
        let filters = Filters::default()
            .category("工作")
            .status("pending")
            .priority(Priority::High);
        let predicate = Predicate::build("todo", &filters, NOW);
        assert!(predicate.matches(&todo(1, TodoStatus::Pending, Priority::High, "工作"))?);
        assert!(!predicate.matches(&todo(2, TodoStatus::Completed, Priority::High, "工作"))?);
        assert!(!predicate.matches(&todo(3, TodoStatus::Pending, Priority::Low, "工作"))?);
        assert!(!predicate.matches(&todo(4, TodoStatus::Pending, Priority::High, "健康"))?);
        Ok(())
    }

    #[test]
    fn records_without_a_dimension_fail_active_filters() -> EngineResult<()> {
        let entry = diary(1, "a", "工作", &[]);
        let by_priority = Predicate::build("", &Filters::default().priority(Priority::High), NOW);
        assert!(!by_priority.matches(&entry)?);
        let by_favorite = Predicate::build("", &Filters::default().favorite(true), NOW);
        assert!(!by_favorite.matches(&entry)?);
        Ok(())
    }

    #[test]
    fn favorite_filter_checks_websites() -> EngineResult<()> {
        let site = Website {
            id: 4,
            name: "YouTube".into(),
            url: "https://youtube.com".into(),
            description: "视频分享平台".into(),
            category: "娱乐".into(),
            is_favorite: false,
            importance: Priority::Low,
            visits: 234,
            last_visit: "2025-12-05T19:20:00".into(),
            favicon: String::new(),
        };
        let favorites = Predicate::build("", &Filters::default().favorite(true), NOW);
        let others = Predicate::build("", &Filters::default().favorite(false), NOW);
        assert!(!favorites.matches(&site)?);
        assert!(others.matches(&site)?);
        Ok(())
    }

    #[test]
    fn past_reminder_lands_in_past_window_only() -> EngineResult<()> {
        let overdue = reminder(1, "2025-12-05T16:00:00", false);
        let past = Predicate::build("", &Filters::default().window(TimeWindow::Past), NOW);
        let upcoming = Predicate::build("", &Filters::default().window(TimeWindow::Upcoming), NOW);
        let completed =
            Predicate::build("", &Filters::default().window(TimeWindow::Completed), NOW);
        assert!(past.matches(&overdue)?);
        assert!(!upcoming.matches(&overdue)?);
        assert!(!completed.matches(&overdue)?);
        Ok(())
    }

    #[test]
    fn upcoming_includes_the_current_instant() -> EngineResult<()> {
        let due_now = reminder(1, "2025-12-20T00:00:00", false);
        let upcoming = Predicate::build("", &Filters::default().window(TimeWindow::Upcoming), NOW);
        assert!(upcoming.matches(&due_now)?);

        let done = reminder(2, "2026-01-01T09:00:00", true);
        assert!(!upcoming.matches(&done)?);
        let completed =
            Predicate::build("", &Filters::default().window(TimeWindow::Completed), NOW);
        assert!(completed.matches(&done)?);
        Ok(())
    }

    #[test]
    fn malformed_time_surfaces_instead_of_guessing() {
        let broken = reminder(1, "someday", false);
        let past = Predicate::build("", &Filters::default().window(TimeWindow::Past), NOW);
        assert_matches!(
            past.matches(&broken),
            Err(EngineError::InvalidData { field: "time", .. })
        );
    }

    #[test]
    fn apply_keeps_store_order() -> EngineResult<()> {
        let todos = vec![
            todo(3, TodoStatus::Pending, Priority::High, "工作"),
            todo(1, TodoStatus::Completed, Priority::High, "工作"),
            todo(2, TodoStatus::Pending, Priority::Low, "工作"),
        ];
        let predicate = Predicate::build("", &Filters::default().status("PENDING"), NOW);
        let ids: Vec<_> = predicate.apply(&todos)?.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3, 2]);
        Ok(())
    }
}

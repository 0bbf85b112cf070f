use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use tracing::info;

use crate::backup::{BackupManager, BackupProvider, RestoreOutcome};
use crate::error::{EngineError, EngineResult};
use crate::model::{
    Backup, BackupType, Clock, Diary, EntityKind, Plan, Reminder, Todo, TodoStatus, Website,
};
use crate::search::{Filters, TimeWindow};
use crate::store::{Category, EntityStore};
use crate::view::{project, Projection, SortDirection, SortField, SortSpec, ViewQuery};

mod actions;
mod context;

pub use actions::ActionDispatcher;
pub use context::{AppContext, AuthProvider, StubAuthProvider, User};

const SEED: &str = include_str!("seed.json");

/// Number of upcoming todos shown on the dashboard.
const NEXT_TODOS: usize = 3;

/// Serialized form of every collection, in the shape the dashboard pages use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dataset {
    pub diaries: Vec<Diary>,
    pub todos: Vec<Todo>,
    pub plans: Vec<Plan>,
    pub reminders: Vec<Reminder>,
    pub websites: Vec<Website>,
    pub backups: Vec<Backup>,
    pub categories: ReferenceCategories,
}

/// Category names the pages offer even when no record uses them yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceCategories {
    pub diary: Vec<String>,
    pub todo: Vec<String>,
    pub website: Vec<String>,
}

impl Dataset {
    /// Built-in sample data.
    pub fn seed() -> Result<Self> {
        serde_json::from_str(SEED).context("parsing built-in seed dataset")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing dataset {}", path.display()))
    }

    /// Records a backup would contain. Backup history itself is not counted.
    pub fn entry_count(&self) -> usize {
        self.diaries.len()
            + self.todos.len()
            + self.plans.len()
            + self.reminders.len()
            + self.websites.len()
    }
}

/// Dashboard numbers shown on the home page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub counts: IndexMap<EntityKind, usize>,
    pub pending_todos: usize,
    pub upcoming_reminders: usize,
    pub favorite_websites: usize,
    pub next_todos: Vec<Todo>,
}

/// One store per record kind plus the backup job slot.
#[derive(Debug)]
pub struct Workspace {
    pub diaries: EntityStore<Diary>,
    pub todos: EntityStore<Todo>,
    pub plans: EntityStore<Plan>,
    pub reminders: EntityStore<Reminder>,
    pub websites: EntityStore<Website>,
    backups: BackupManager,
    categories: ReferenceCategories,
}

impl Workspace {
    /// A workspace with nothing loaded yet.
    pub fn unloaded(backup_timeout: Duration) -> Self {
        Self {
            diaries: EntityStore::new(),
            todos: EntityStore::new(),
            plans: EntityStore::new(),
            reminders: EntityStore::new(),
            websites: EntityStore::new(),
            backups: BackupManager::idle(backup_timeout),
            categories: ReferenceCategories::default(),
        }
    }

    pub fn from_dataset(dataset: Dataset, backup_timeout: Duration) -> EngineResult<Self> {
        let workspace = Self {
            diaries: EntityStore::with_records(dataset.diaries)?,
            todos: EntityStore::with_records(dataset.todos)?,
            plans: EntityStore::with_records(dataset.plans)?,
            reminders: EntityStore::with_records(dataset.reminders)?,
            websites: EntityStore::with_records(dataset.websites)?,
            backups: BackupManager::new(
                EntityStore::with_records(dataset.backups)?,
                backup_timeout,
            )?,
            categories: dataset.categories,
        };
        info!(
            diaries = workspace.diaries.len(),
            todos = workspace.todos.len(),
            plans = workspace.plans.len(),
            reminders = workspace.reminders.len(),
            websites = workspace.websites.len(),
            backups = workspace.backups.store().len(),
            "dataset loaded"
        );
        Ok(workspace)
    }

    /// Loads the dataset at `path`, or the built-in sample data when absent.
    pub fn load(path: Option<&Path>, backup_timeout: Duration) -> Result<Self> {
        let dataset = match path {
            Some(path) => Dataset::from_path(path)?,
            None => Dataset::seed()?,
        };
        Self::from_dataset(dataset, backup_timeout).context("validating dataset records")
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn backups_mut(&mut self) -> &mut BackupManager {
        &mut self.backups
    }

    pub fn snapshot(&self) -> Dataset {
        Dataset {
            diaries: self.diaries.get_all().to_vec(),
            todos: self.todos.get_all().to_vec(),
            plans: self.plans.get_all().to_vec(),
            reminders: self.reminders.get_all().to_vec(),
            websites: self.websites.get_all().to_vec(),
            backups: self.backups.store().get_all().to_vec(),
            categories: self.categories.clone(),
        }
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Diary => self.diaries.len(),
            EntityKind::Todo => self.todos.len(),
            EntityKind::Plan => self.plans.len(),
            EntityKind::Reminder => self.reminders.len(),
            EntityKind::Website => self.websites.len(),
            EntityKind::Backup => self.backups.store().len(),
        }
    }

    /// Live category counts for a kind, reference categories first.
    pub fn categories(&self, kind: EntityKind) -> EngineResult<Vec<Category>> {
        match kind {
            EntityKind::Diary => Ok(self.diaries.categories(&self.categories.diary)),
            EntityKind::Todo => Ok(self.todos.categories(&self.categories.todo)),
            EntityKind::Website => Ok(self.websites.categories(&self.categories.website)),
            other => Err(EngineError::validation(format!(
                "{other} records have no categories"
            ))),
        }
    }

    pub fn summary(&self, clock: &dyn Clock) -> EngineResult<Summary> {
        let counts = EntityKind::iter().map(|kind| (kind, self.len(kind))).collect();
        let pending_todos = self
            .todos
            .get_all()
            .iter()
            .filter(|todo| todo.status == TodoStatus::Pending)
            .count();
        let upcoming = ViewQuery::default()
            .with_filters(Filters::default().window(TimeWindow::Upcoming))
            .sorted(SortSpec::new(SortField::Date, SortDirection::Ascending));
        let upcoming_reminders = project(&self.reminders, &upcoming, clock)?.len();
        let next_todos = match project(&self.todos, &upcoming, clock)? {
            Projection::List(todos) => todos.into_iter().take(NEXT_TODOS).collect(),
            _ => Vec::new(),
        };
        let favorite_websites = self
            .websites
            .get_all()
            .iter()
            .filter(|site| site.is_favorite)
            .count();
        Ok(Summary {
            counts,
            pending_todos,
            upcoming_reminders,
            favorite_websites,
            next_todos,
        })
    }

    /// Runs a full backup cycle against `provider`: expire any stale job,
    /// start a new one, then settle it with a snapshot of the current data.
    pub fn create_backup(
        &mut self,
        kind: BackupType,
        provider: &dyn BackupProvider,
        clock: &dyn Clock,
    ) -> EngineResult<Backup> {
        let now = clock.now();
        self.backups.expire(now)?;
        self.backups.begin(kind, now)?;
        let snapshot = self.snapshot();
        self.backups.complete(provider, &snapshot).cloned()
    }

    pub fn restore_backup(
        &mut self,
        id: i64,
        provider: &dyn BackupProvider,
        clock: &dyn Clock,
    ) -> EngineResult<RestoreOutcome> {
        self.backups.expire(clock.now())?;
        self.backups.restore(id, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::SimulatedBackupProvider;
    use crate::model::{BackupStatus, FixedClock, Record};
    use time::macros::datetime;

    const QUERIES: [&str; 6] = ["学习", "REACT", "github.com", "生活", "会议", "o"];

    /// Runs every query against `store` and checks each hit carries the
    /// phrase in a searchable field. Returns the total number of hits.
    fn hits_contain_the_phrase<R: Record + PartialEq>(
        store: &EntityStore<R>,
        clock: &dyn Clock,
    ) -> EngineResult<usize> {
        let mut total = 0;
        for text in QUERIES {
            let needle = text.to_lowercase();
            if let Projection::List(records) = project(store, &ViewQuery::new(text), clock)? {
                for record in &records {
                    assert!(
                        record
                            .searchable_text()
                            .iter()
                            .any(|field| field.to_lowercase().contains(&needle)),
                        "{} #{} matched {text:?} without containing it",
                        R::KIND,
                        record.id()
                    );
                }
                total += records.len();
            }
        }
        for filters in [
            Filters::default(),
            Filters::default().window(TimeWindow::Past),
        ] {
            let plain = project(store, &ViewQuery::default().with_filters(filters.clone()), clock)?;
            let blank = project(store, &ViewQuery::new(" \t ").with_filters(filters), clock)?;
            assert_eq!(plain, blank, "{} blank search changed the result", R::KIND);
        }
        Ok(total)
    }

    #[test]
    fn seed_search_hits_always_contain_the_phrase() -> Result<()> {
        let workspace = seeded()?;
        let clock = FixedClock(datetime!(2025-12-20 0:00));
        let per_kind = [
            hits_contain_the_phrase(&workspace.diaries, &clock)?,
            hits_contain_the_phrase(&workspace.todos, &clock)?,
            hits_contain_the_phrase(&workspace.plans, &clock)?,
            hits_contain_the_phrase(&workspace.reminders, &clock)?,
            hits_contain_the_phrase(&workspace.websites, &clock)?,
            hits_contain_the_phrase(workspace.backups().store(), &clock)?,
        ];
        assert!(per_kind[0] > 0 && per_kind[4] > 0, "hits per kind: {per_kind:?}");
        Ok(())
    }

    fn seeded() -> Result<Workspace> {
        Workspace::load(None, Duration::from_secs(60))
    }

    #[test]
    fn seed_loads_every_collection() -> Result<()> {
        let workspace = seeded()?;
        assert_eq!(workspace.len(EntityKind::Diary), 3);
        assert_eq!(workspace.len(EntityKind::Todo), 5);
        assert_eq!(workspace.len(EntityKind::Plan), 3);
        assert_eq!(workspace.len(EntityKind::Reminder), 5);
        assert_eq!(workspace.len(EntityKind::Website), 5);
        assert_eq!(workspace.len(EntityKind::Backup), 3);
        let advance = workspace.reminders.get(1)?.advance_notice.clone();
        assert_eq!(advance.as_deref(), Some("15分钟"));
        Ok(())
    }

    #[test]
    fn summary_counts_against_the_clock() -> Result<()> {
        let workspace = seeded()?;
        let clock = FixedClock(datetime!(2025-12-06 0:00));
        let summary = workspace.summary(&clock)?;
        assert_eq!(summary.counts[&EntityKind::Todo], 5);
        assert_eq!(summary.pending_todos, 4);
        assert_eq!(summary.favorite_websites, 4);
        // 提交周报, 朋友生日, 项目截止日期
        assert_eq!(summary.upcoming_reminders, 3);
        let next: Vec<_> = summary.next_todos.iter().map(|todo| todo.id).collect();
        assert_eq!(next, vec![1, 5, 4]);
        Ok(())
    }

    #[test]
    fn category_counts_are_live() -> Result<()> {
        let mut workspace = seeded()?;
        let before = workspace.categories(EntityKind::Website)?;
        assert_eq!(before[0].name, "开发工具");
        assert_eq!(before[0].count, 2);
        assert_eq!(before[3].name, "新闻");
        assert_eq!(before[3].count, 0);

        workspace.websites.remove(1)?;
        let after = workspace.categories(EntityKind::Website)?;
        assert_eq!(after[0].count, 1);
        assert!(workspace.categories(EntityKind::Plan).is_err());
        Ok(())
    }

    #[test]
    fn backup_cycle_records_the_snapshot() -> Result<()> {
        let mut workspace = seeded()?;
        let clock = FixedClock(datetime!(2025-12-20 9:00));
        let backup = workspace.create_backup(BackupType::Manual, &SimulatedBackupProvider, &clock)?;
        assert_eq!(backup.status, BackupStatus::Completed);
        assert_eq!(backup.entries, 21);
        assert_eq!(backup.id, 4);
        assert_eq!(workspace.backups().store().get_all()[0].id, 4);

        let outcome = workspace.restore_backup(2, &SimulatedBackupProvider, &clock)?;
        assert_eq!(outcome, RestoreOutcome::Restored { id: 2 });
        Ok(())
    }

    #[test]
    fn dataset_round_trips_through_json() -> Result<()> {
        let workspace = seeded()?;
        let json = serde_json::to_string(&workspace.snapshot())?;
        assert!(json.contains("\"dueDate\""));
        assert!(json.contains("\"advanceNotice\""));
        let reloaded = Workspace::from_dataset(serde_json::from_str(&json)?, Duration::from_secs(60))?;
        assert_eq!(reloaded.len(EntityKind::Plan), 3);
        Ok(())
    }
}

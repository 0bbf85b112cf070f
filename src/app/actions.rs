use tracing::info;

use crate::error::EngineResult;
use crate::model::{
    Clock, Confirmation, EntityKind, Plan, Record, RecordId, Reminder, Todo, Website,
};
use crate::store::EntityStore;

use super::Workspace;

/// Page-level mutations over a [`Workspace`].
pub struct ActionDispatcher<'a> {
    workspace: &'a mut Workspace,
    clock: &'a dyn Clock,
}

impl<'a> ActionDispatcher<'a> {
    pub fn new(workspace: &'a mut Workspace, clock: &'a dyn Clock) -> Self {
        Self { workspace, clock }
    }

    pub fn toggle_todo(&mut self, id: RecordId) -> EngineResult<&Todo> {
        self.workspace
            .todos
            .update(id, |todo| todo.status = todo.status.toggled())
    }

    pub fn toggle_reminder(&mut self, id: RecordId) -> EngineResult<&Reminder> {
        self.workspace
            .reminders
            .update(id, |reminder| reminder.is_completed = !reminder.is_completed)
    }

    pub fn toggle_favorite(&mut self, id: RecordId) -> EngineResult<&Website> {
        self.workspace
            .websites
            .update(id, |site| site.is_favorite = !site.is_favorite)
    }

    pub fn record_visit(&mut self, id: RecordId) -> EngineResult<&Website> {
        let now = self.clock.now();
        self.workspace
            .websites
            .update(id, |site| site.record_visit(now))
    }

    /// Flips one milestone and returns its new completion flag. Plan progress
    /// is left alone.
    pub fn toggle_milestone(
        &mut self,
        plan_id: RecordId,
        milestone_id: RecordId,
    ) -> EngineResult<bool> {
        let mut completed = false;
        self.workspace.plans.try_update(plan_id, |plan: &mut Plan| {
            completed = plan.toggle_milestone(milestone_id)?;
            Ok(())
        })?;
        Ok(completed)
    }

    /// Hard delete of any record kind. Nothing is removed without an explicit
    /// confirmation.
    pub fn delete(
        &mut self,
        kind: EntityKind,
        id: RecordId,
        confirmation: Confirmation,
    ) -> EngineResult<()> {
        let workspace = &mut *self.workspace;
        match kind {
            EntityKind::Diary => remove_confirmed(&mut workspace.diaries, id, confirmation),
            EntityKind::Todo => remove_confirmed(&mut workspace.todos, id, confirmation),
            EntityKind::Plan => remove_confirmed(&mut workspace.plans, id, confirmation),
            EntityKind::Reminder => remove_confirmed(&mut workspace.reminders, id, confirmation),
            EntityKind::Website => remove_confirmed(&mut workspace.websites, id, confirmation),
            EntityKind::Backup => workspace.backups_mut().delete(id, confirmation).map(drop),
        }?;
        info!(%kind, id, "record deleted");
        Ok(())
    }
}

fn remove_confirmed<R: Record>(
    store: &mut EntityStore<R>,
    id: RecordId,
    confirmation: Confirmation,
) -> EngineResult<()> {
    confirmation.require(R::KIND, id)?;
    store.remove(id).map(drop)
}

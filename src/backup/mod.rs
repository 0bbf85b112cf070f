use std::time::Duration;

use anyhow::{Context, Result};
use time::PrimitiveDateTime;
use tracing::{info, warn};

use crate::app::Dataset;
use crate::error::{EngineError, EngineResult};
use crate::model::temporal::{format_date, format_timestamp};
use crate::model::{
    format_size, Backup, BackupStatus, BackupType, Confirmation, EntityKind, Record, RecordId,
};
use crate::store::EntityStore;

/// What a provider reports after writing a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupArtifact {
    pub size_bytes: u64,
    pub entries: u64,
}

/// Collaborator that actually stores and restores backup payloads.
///
/// Both operations are opaque to the engine: they either succeed or fail with
/// a reason that ends up on the backup record.
pub trait BackupProvider {
    fn create(&self, dataset: &Dataset) -> Result<BackupArtifact>;
    fn restore(&self, backup: &Backup) -> Result<()>;
}

/// Measures the serialized dataset without writing it anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedBackupProvider;

impl BackupProvider for SimulatedBackupProvider {
    fn create(&self, dataset: &Dataset) -> Result<BackupArtifact> {
        let payload = serde_json::to_vec(dataset).context("serializing dataset for backup")?;
        Ok(BackupArtifact {
            size_bytes: payload.len() as u64,
            entries: dataset.entry_count() as u64,
        })
    }

    fn restore(&self, _backup: &Backup) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Pending {
        id: RecordId,
        started_at: PrimitiveDateTime,
    },
    Completed {
        id: RecordId,
    },
    Failed {
        id: RecordId,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { id: RecordId },
    Failed { id: RecordId, reason: String },
}

/// Backup history plus the single in-flight job slot.
///
/// At most one backup is `in-progress` at any time. A second `begin` while the
/// slot is taken fails with `Conflict`; a job that outlives the timeout is
/// moved to `failed` by [`BackupManager::expire`].
#[derive(Debug)]
pub struct BackupManager {
    store: EntityStore<Backup>,
    state: JobState,
    timeout: Duration,
}

impl BackupManager {
    /// Wraps an existing history. A record already `in-progress` takes the
    /// job slot, started at its recorded date, so it can still expire.
    pub fn new(store: EntityStore<Backup>, timeout: Duration) -> EngineResult<Self> {
        let mut running = store
            .get_all()
            .iter()
            .filter(|backup| backup.status == BackupStatus::InProgress);
        let state = match (running.next(), running.next()) {
            (None, _) => JobState::Idle,
            (Some(backup), None) => JobState::Pending {
                id: backup.id,
                started_at: backup.date_key()?,
            },
            (Some(first), Some(second)) => {
                return Err(EngineError::validation(format!(
                    "backups #{} and #{} are both in progress",
                    first.id, second.id
                )));
            }
        };
        if let JobState::Pending { id, .. } = state {
            info!(id, "resuming in-progress backup");
        }
        Ok(Self {
            store,
            state,
            timeout,
        })
    }

    /// An empty history that has not been loaded.
    pub fn idle(timeout: Duration) -> Self {
        Self {
            store: EntityStore::new(),
            state: JobState::Idle,
            timeout,
        }
    }

    pub fn store(&self) -> &EntityStore<Backup> {
        &self.store
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, JobState::Pending { .. })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records a new `in-progress` backup at the front of the history.
    pub fn begin(&mut self, kind: BackupType, now: PrimitiveDateTime) -> EngineResult<RecordId> {
        if let JobState::Pending { id, .. } = self.state {
            return Err(EngineError::conflict(format!(
                "backup #{id} is still in progress"
            )));
        }
        let id = self.store.allocate_id();
        let label = match kind {
            BackupType::Auto => "自动备份",
            BackupType::Manual => "手动备份",
        };
        self.store.add(Backup {
            id,
            name: format!("{label} - {}", format_date(now.date())),
            date: format_timestamp(now),
            size: None,
            kind,
            status: BackupStatus::InProgress,
            entries: 0,
            failure_reason: None,
        })?;
        self.state = JobState::Pending {
            id,
            started_at: now,
        };
        info!(id, %kind, "backup started");
        Ok(id)
    }

    /// Runs the provider for the pending job and settles its record.
    ///
    /// Provider failures are recorded on the backup as `failed`, not returned
    /// as errors. Either way the job slot is free afterwards.
    pub fn complete(
        &mut self,
        provider: &dyn BackupProvider,
        dataset: &Dataset,
    ) -> EngineResult<&Backup> {
        let JobState::Pending { id, .. } = self.state else {
            return Err(EngineError::conflict("no backup is in progress"));
        };
        match provider.create(dataset) {
            Ok(artifact) => {
                info!(
                    id,
                    size_bytes = artifact.size_bytes,
                    entries = artifact.entries,
                    "backup completed"
                );
                self.state = JobState::Completed { id };
                self.store.update(id, |backup| {
                    backup.status = BackupStatus::Completed;
                    backup.size = Some(format_size(artifact.size_bytes));
                    backup.entries = artifact.entries;
                })
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(?err, id, "backup failed");
                self.fail(id, reason)
            }
        }
    }

    /// Fails the pending job if it has been running for longer than the
    /// timeout. Returns the id of the expired backup, if any.
    pub fn expire(&mut self, now: PrimitiveDateTime) -> EngineResult<Option<RecordId>> {
        let JobState::Pending { id, started_at } = self.state else {
            return Ok(None);
        };
        if now - started_at < self.timeout {
            return Ok(None);
        }
        warn!(id, timeout_secs = self.timeout.as_secs(), "backup timed out");
        let reason = format!("timed out after {}s", self.timeout.as_secs());
        self.fail(id, reason)?;
        Ok(Some(id))
    }

    pub fn restore(
        &mut self,
        id: RecordId,
        provider: &dyn BackupProvider,
    ) -> EngineResult<RestoreOutcome> {
        if let JobState::Pending { id: pending, .. } = self.state {
            return Err(EngineError::conflict(format!(
                "cannot restore while backup #{pending} is in progress"
            )));
        }
        let backup = self.store.get(id)?;
        if backup.status != BackupStatus::Completed {
            return Err(EngineError::validation(format!(
                "backup #{id} is {} and cannot be restored",
                backup.status
            )));
        }
        match provider.restore(backup) {
            Ok(()) => {
                info!(id, "backup restored");
                Ok(RestoreOutcome::Restored { id })
            }
            Err(err) => {
                warn!(?err, id, "restore failed");
                Ok(RestoreOutcome::Failed {
                    id,
                    reason: format!("{err:#}"),
                })
            }
        }
    }

    pub fn delete(&mut self, id: RecordId, confirmation: Confirmation) -> EngineResult<Backup> {
        if matches!(self.state, JobState::Pending { id: pending, .. } if pending == id) {
            return Err(EngineError::conflict(format!(
                "backup #{id} is still in progress"
            )));
        }
        confirmation.require(EntityKind::Backup, id)?;
        let removed = self.store.remove(id)?;
        if matches!(
            self.state,
            JobState::Completed { id: last } | JobState::Failed { id: last, .. } if last == id
        ) {
            self.state = JobState::Idle;
        }
        info!(id, "backup deleted");
        Ok(removed)
    }

    fn fail(&mut self, id: RecordId, reason: String) -> EngineResult<&Backup> {
        self.state = JobState::Failed {
            id,
            reason: reason.clone(),
        };
        self.store.update(id, |backup| {
            backup.status = BackupStatus::Failed;
            backup.failure_reason = Some(reason);
        })
    }
}

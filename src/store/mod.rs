use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::model::{Record, RecordId};

/// Category reference entry with a count computed from the live collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub name: String,
    pub count: usize,
}

/// Owning, ordered collection of one record kind, newest first.
///
/// Every successful mutation bumps `generation`, which view caches use to
/// detect staleness. A store built with [`EntityStore::new`] reports itself as
/// not loaded until records are added or replaced.
///
/// Ids are never reused: removed ids stay retired until the next
/// [`EntityStore::replace_all`].
#[derive(Debug)]
pub struct EntityStore<R: Record> {
    records: Vec<R>,
    next_id: RecordId,
    retired: HashSet<RecordId>,
    generation: u64,
    loaded: bool,
    instance: u64,
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

fn next_instance() -> u64 {
    NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

/// A clone is a separate store and gets its own instance id.
impl<R: Record> Clone for EntityStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
            next_id: self.next_id,
            retired: self.retired.clone(),
            generation: self.generation,
            loaded: self.loaded,
            instance: next_instance(),
        }
    }
}

impl<R: Record> Default for EntityStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> EntityStore<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
            retired: HashSet::new(),
            generation: 0,
            loaded: false,
            instance: next_instance(),
        }
    }

    pub fn with_records(records: Vec<R>) -> EngineResult<Self> {
        let mut store = Self::new();
        store.replace_all(records)?;
        Ok(store)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Identifies this store for as long as it lives, across mutations.
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn get_all(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.position(id).is_some()
    }

    pub fn get(&self, id: RecordId) -> EngineResult<&R> {
        self.position(id)
            .map(|index| &self.records[index])
            .ok_or_else(|| EngineError::not_found(R::KIND, id))
    }

    /// Hands out an id that has never been seen by this store.
    pub fn allocate_id(&mut self) -> RecordId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn add(&mut self, record: R) -> EngineResult<&R> {
        record.validate()?;
        let id = record.id();
        if self.contains(id) {
            return Err(EngineError::validation(format!(
                "{} id {id} already exists",
                R::KIND
            )));
        }
        if self.retired.contains(&id) {
            return Err(EngineError::validation(format!(
                "{} id {id} was deleted and cannot be reused",
                R::KIND
            )));
        }
        self.next_id = self.next_id.max(id.saturating_add(1));
        self.records.insert(0, record);
        self.loaded = true;
        self.touch();
        tracing::debug!(kind = %R::KIND, id, generation = self.generation, "record added");
        Ok(&self.records[0])
    }

    pub fn update<F>(&mut self, id: RecordId, patch: F) -> EngineResult<&R>
    where
        F: FnOnce(&mut R),
    {
        let index = self.try_update(id, |record| {
            patch(record);
            Ok(())
        })?;
        Ok(&self.records[index])
    }

    /// Applies a fallible patch to a copy and commits it only if the patch and
    /// validation both succeed. Returns the record's position.
    pub fn try_update<F>(&mut self, id: RecordId, patch: F) -> EngineResult<usize>
    where
        F: FnOnce(&mut R) -> EngineResult<()>,
    {
        let index = self
            .position(id)
            .ok_or_else(|| EngineError::not_found(R::KIND, id))?;
        let mut draft = self.records[index].clone();
        patch(&mut draft)?;
        if draft.id() != id {
            return Err(EngineError::validation(format!(
                "{} id cannot change from {id} to {}",
                R::KIND,
                draft.id()
            )));
        }
        draft.validate()?;
        self.records[index] = draft;
        self.touch();
        tracing::debug!(kind = %R::KIND, id, generation = self.generation, "record updated");
        Ok(index)
    }

    pub fn remove(&mut self, id: RecordId) -> EngineResult<R> {
        let index = self
            .position(id)
            .ok_or_else(|| EngineError::not_found(R::KIND, id))?;
        let removed = self.records.remove(index);
        self.retired.insert(id);
        self.touch();
        tracing::debug!(kind = %R::KIND, id, generation = self.generation, "record removed");
        Ok(removed)
    }

    /// Swaps in a whole collection. Nothing changes unless every record is
    /// valid and ids are unique.
    pub fn replace_all(&mut self, records: Vec<R>) -> EngineResult<()> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            record.validate()?;
            if !seen.insert(record.id()) {
                return Err(EngineError::validation(format!(
                    "duplicate {} id {}",
                    R::KIND,
                    record.id()
                )));
            }
        }
        if let Some(max_id) = records.iter().map(|record| record.id()).max() {
            self.next_id = self.next_id.max(max_id.saturating_add(1));
        }
        self.records = records;
        self.retired.clear();
        self.loaded = true;
        self.touch();
        tracing::debug!(
            kind = %R::KIND,
            count = self.records.len(),
            generation = self.generation,
            "collection replaced"
        );
        Ok(())
    }

    /// Live record count per category, in first-appearance order.
    pub fn category_counts(&self) -> IndexMap<String, usize> {
        let mut counts = IndexMap::new();
        for category in self.records.iter().filter_map(|record| record.category()) {
            *counts.entry(category.to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Reference categories first (zero when unused), then any others found in
    /// the records.
    pub fn categories(&self, reference: &[String]) -> Vec<Category> {
        let mut counts = self.category_counts();
        let mut out = Vec::with_capacity(reference.len() + counts.len());
        for name in reference {
            let count = counts.shift_remove(name).unwrap_or(0);
            out.push(Category {
                name: name.clone(),
                count,
            });
        }
        out.extend(
            counts
                .into_iter()
                .map(|(name, count)| Category { name, count }),
        );
        out
    }

    fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }

    fn touch(&mut self) {
        self.generation += 1;
    }
}

use serde::Serialize;
use time::PrimitiveDateTime;

use crate::error::EngineResult;
use crate::model::{Clock, Record};
use crate::search::{parse_query, Filters, Predicate, TimeWindow};
use crate::store::EntityStore;

mod group;
mod sort;

pub use group::{group_records, GroupKey, Groups, ALL_GROUP};
pub use sort::{sort_records, SortDirection, SortField, SortSpec};

/// Everything a list page feeds into the projection pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ViewQuery {
    pub search: String,
    pub filters: Filters,
    pub sort: SortSpec,
    pub group: Option<GroupKey>,
}

impl ViewQuery {
    pub fn new(search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..Self::default()
        }
    }

    /// Builds a query from a one-line search with inline `prefix:value` filters.
    pub fn parse(input: &str) -> EngineResult<Self> {
        let parsed = parse_query(input)?;
        Ok(Self {
            search: parsed.text,
            filters: parsed.filters,
            ..Self::default()
        })
    }

    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    pub fn sorted(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn grouped(mut self, key: GroupKey) -> Self {
        self.group = Some(key);
        self
    }

    fn depends_on_clock(&self) -> bool {
        self.filters.window != TimeWindow::All
    }
}

/// Result of running a [`ViewQuery`] against a store.
///
/// `Empty` means the store is loaded and nothing matched; `NotLoaded` means
/// there was nothing to search yet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "records", rename_all = "kebab-case")]
pub enum Projection<R> {
    NotLoaded,
    Empty,
    List(Vec<R>),
    Grouped(Groups<R>),
}

impl<R> Projection<R> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::NotLoaded)
    }

    /// Number of distinct records in the projection. The `all` pseudo-group
    /// is not counted twice.
    pub fn len(&self) -> usize {
        match self {
            Self::NotLoaded | Self::Empty => 0,
            Self::List(records) => records.len(),
            Self::Grouped(groups) => match groups.get(ALL_GROUP) {
                Some(all) => all.len(),
                None => groups.values().map(Vec::len).sum(),
            },
        }
    }
}

/// Store -> predicate -> sort -> group.
pub fn project<R: Record>(
    store: &EntityStore<R>,
    query: &ViewQuery,
    clock: &dyn Clock,
) -> EngineResult<Projection<R>> {
    if !store.is_loaded() {
        return Ok(Projection::NotLoaded);
    }
    let predicate = Predicate::build(&query.search, &query.filters, clock.now());
    let matched = predicate.apply(store.get_all())?;
    let sorted = sort_records(matched, query.sort)?;
    let grouped = match query.group {
        Some(key) => Some(group_records(&sorted, key)?),
        None => None,
    };
    if sorted.is_empty() {
        return Ok(Projection::Empty);
    }
    Ok(match grouped {
        Some(groups) => Projection::Grouped(groups),
        None => Projection::List(sorted),
    })
}

/// Memo of the most recent projection for one store.
///
/// The key covers the store instance and generation, the query and, for
/// time-window queries only, the clock reading.
#[derive(Debug)]
pub struct ViewCache<R> {
    key: Option<CacheKey>,
    projection: Projection<R>,
    hits: u64,
    misses: u64,
}

impl<R> Default for ViewCache<R> {
    fn default() -> Self {
        Self {
            key: None,
            projection: Projection::NotLoaded,
            hits: 0,
            misses: 0,
        }
    }
}

impl<R: Record> ViewCache<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(
        &mut self,
        store: &EntityStore<R>,
        query: &ViewQuery,
        clock: &dyn Clock,
    ) -> EngineResult<&Projection<R>> {
        let key = CacheKey::new(store, query, clock);
        if self.key.as_ref() == Some(&key) {
            self.hits += 1;
        } else {
            self.misses += 1;
            self.projection = project(store, query, clock)?;
            self.key = Some(key);
        }
        Ok(&self.projection)
    }

    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheKey {
    instance: u64,
    generation: u64,
    loaded: bool,
    query: ViewQuery,
    now: Option<PrimitiveDateTime>,
}

impl CacheKey {
    fn new<R: Record>(store: &EntityStore<R>, query: &ViewQuery, clock: &dyn Clock) -> Self {
        Self {
            instance: store.instance(),
            generation: store.generation(),
            loaded: store.is_loaded(),
            query: query.clone(),
            now: query.depends_on_clock().then(|| clock.now()),
        }
    }
}

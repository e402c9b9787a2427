//! Batched relationship loading.
//!
//! Loading `article.author` for a thousand articles naively costs a
//! thousand queries. The loader here costs `ceil(groups / chunk_size)`:
//! it groups the parent records by the key that drives the fetch, builds
//! one reusable SELECT template with a key-set predicate, then executes it
//! once per fixed-size batch and writes each fetched row (or collection)
//! back into the right parents' relationship slots.
//!
//! A load call runs in three phases, each with its own type:
//!
//! 1. [`SelectInLoader::prepare`] partitions the parents for the
//!    relationship's topology and returns a [`Prepared`] value.
//! 2. [`Prepared::build_query`] turns a caller-built base query into the
//!    batch template (match columns selected, key-set predicate attached).
//! 3. [`Prepared::fetch_and_populate`] consumes the `Prepared` and drives
//!    the batches, mutating the parent records in place and lazily
//!    yielding every fetched child row through [`FetchedRecords`].
//!
//! Population is an in-place mutation of caller-owned records by design:
//! parent sets can be large, and the caller keeps ownership throughout.

use asupersync::{Cx, Outcome};
use selectin_core::{
    Cardinality, Error, KeyTuple, QueryErrorKind, Record, RecordSide, Related, Relation, Result,
    Topology,
};
use selectin_query::{Executor, Select};
use std::collections::{BTreeMap, VecDeque};

/// Default number of keys bound per batch statement.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Tuning knobs for one loader.
///
/// Carried per loader rather than process-wide so concurrent load calls
/// (and tests) can use different settings without shared state.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Maximum number of keys bound to one batch statement.
    pub chunk_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Batched loader for one relationship edge.
///
/// Cheap to construct; all per-call state lives in the [`Prepared`] value
/// returned by [`prepare`](Self::prepare).
#[derive(Debug, Clone, Copy)]
pub struct SelectInLoader {
    relation: Relation,
    config: LoaderConfig,
}

impl SelectInLoader {
    /// Create a loader for a relationship with the default configuration.
    #[must_use]
    pub fn new(relation: Relation) -> Self {
        Self::with_config(relation, LoaderConfig::default())
    }

    /// Create a loader with an explicit configuration.
    #[must_use]
    pub fn with_config(relation: Relation, config: LoaderConfig) -> Self {
        Self { relation, config }
    }

    /// The relationship this loader serves.
    #[must_use]
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// Partition the parent records for the relationship's topology.
    ///
    /// Each call builds a fresh partition; the same `parents` slice must
    /// later be handed to [`Prepared::fetch_and_populate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteRecord`] if a parent lacks a column the
    /// topology's key list requires. A present-but-NULL foreign key is not
    /// an error: such parents resolve to an empty result without being
    /// queried.
    #[tracing::instrument(level = "debug", skip(self, parents), fields(relation = self.relation.name))]
    pub fn prepare(&self, parents: &[Record]) -> Result<Prepared> {
        let groups = match self.relation.topology {
            Topology::ChildLookup { .. } => {
                let columns = self.relation.key_columns();
                let mut groups: BTreeMap<KeyTuple, Vec<usize>> = BTreeMap::new();
                let mut missing = Vec::new();
                for (index, parent) in parents.iter().enumerate() {
                    let key = key_tuple_for(parent, columns, &self.relation, RecordSide::Parent)?;
                    if key.has_null() {
                        missing.push(index);
                    } else {
                        groups.entry(key).or_default().push(index);
                    }
                }
                tracing::debug!(
                    parents = parents.len(),
                    groups = groups.len(),
                    no_target = missing.len(),
                    "Grouped parent records by foreign key"
                );
                Groups::ChildLookup { groups, missing }
            }
            Topology::ParentLookup { .. } => {
                let columns = self.relation.key_columns();
                let mut keyed = Vec::with_capacity(parents.len());
                for (index, parent) in parents.iter().enumerate() {
                    let key = key_tuple_for(parent, columns, &self.relation, RecordSide::Parent)?;
                    keyed.push((key, index));
                }
                tracing::debug!(parents = parents.len(), "Collected parent primary keys");
                Groups::ParentLookup { keyed }
            }
        };
        Ok(Prepared {
            relation: self.relation,
            config: self.config,
            parent_count: parents.len(),
            groups,
        })
    }
}

/// Parent records partitioned per topology, ready to drive a batch fetch.
#[derive(Debug)]
enum Groups {
    /// Parents grouped by the foreign key they carry. `missing` holds the
    /// indices whose key tuple had a NULL component.
    ChildLookup {
        groups: BTreeMap<KeyTuple, Vec<usize>>,
        missing: Vec<usize>,
    },
    /// Parents paired with their own primary key, in input order.
    ParentLookup { keyed: Vec<(KeyTuple, usize)> },
}

/// The partitioned state of one load call.
///
/// Produced by [`SelectInLoader::prepare`]; consumed by
/// [`fetch_and_populate`](Self::fetch_and_populate), which makes the
/// fetched-row sequence single-use by construction.
#[derive(Debug)]
pub struct Prepared {
    relation: Relation,
    config: LoaderConfig,
    parent_count: usize,
    groups: Groups,
}

impl Prepared {
    /// Number of entries that will drive batching: distinct foreign keys
    /// for a child lookup, parent records for a parent lookup.
    #[must_use]
    pub fn group_count(&self) -> usize {
        match &self.groups {
            Groups::ChildLookup { groups, .. } => groups.len(),
            Groups::ParentLookup { keyed } => keyed.len(),
        }
    }

    /// Shape a caller-built base query into the reusable batch template.
    ///
    /// Adds the relationship's match columns to the projection (adapted to
    /// the base query's alias, skipping columns already selected) and
    /// attaches the single key-set predicate over them.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryErrorKind::DuplicateKeySet`] error if the base
    /// query already carries a key-set predicate.
    pub fn build_query(&self, base: Select) -> Result<Select> {
        let mut query = base;
        query.ensure_columns(self.relation.match_columns());
        query.with_key_set(self.relation.match_columns())
    }

    /// Drive the batches: execute the template once per chunk, mutate
    /// every parent's relationship slot, and lazily yield each fetched
    /// child row.
    ///
    /// `parents` must be the same records that were passed to
    /// [`SelectInLoader::prepare`], in the same order. Parents with a NULL
    /// foreign key are populated with their empty value immediately, even
    /// when zero batches run.
    ///
    /// The returned [`FetchedRecords`] is a finite, single-pass sequence;
    /// a caller that stops consuming early leaves the remaining batches
    /// unexecuted (and the corresponding parents unpopulated).
    ///
    /// # Errors
    ///
    /// Returns a [`QueryErrorKind::StateMismatch`] error if `parents` does
    /// not have the prepared length, and a
    /// [`QueryErrorKind::MissingKeySet`] error if `query` was not shaped
    /// by [`build_query`](Self::build_query).
    #[tracing::instrument(level = "debug", skip(self, executor, query, parents), fields(relation = self.relation.name))]
    pub fn fetch_and_populate<'a, E: Executor>(
        self,
        executor: &'a E,
        query: &'a Select,
        parents: &'a mut [Record],
    ) -> Result<FetchedRecords<'a, E>> {
        if parents.len() != self.parent_count {
            return Err(Error::query(
                QueryErrorKind::StateMismatch,
                format!(
                    "prepared {} parent record(s), got {}",
                    self.parent_count,
                    parents.len()
                ),
            ));
        }
        if !query.has_key_set() {
            return Err(Error::query(
                QueryErrorKind::MissingKeySet,
                "template was not shaped for batch loading",
            ));
        }

        let relation = self.relation;
        let plan = match self.groups {
            Groups::ChildLookup { groups, missing } => {
                // Parents that can never match are resolved up front,
                // independent of batching; this also covers the case where
                // every foreign key is NULL and no batch runs at all.
                for &index in &missing {
                    parents[index].set_related(relation.name, empty_related(relation.cardinality));
                }
                Plan::ChildLookup {
                    pending: groups.into_iter().collect(),
                }
            }
            Groups::ParentLookup { keyed } => Plan::ParentLookup {
                pending: keyed.into_iter().collect(),
            },
        };

        tracing::info!(
            relation = relation.name,
            target = relation.target_table,
            parents = parents.len(),
            chunk_size = self.config.chunk_size,
            "Batch loading relationship"
        );

        Ok(FetchedRecords {
            relation,
            // A chunk must make progress; zero would spin forever.
            chunk_size: self.config.chunk_size.max(1),
            executor,
            query,
            parents,
            plan,
            buffer: VecDeque::new(),
            batches: 0,
            yielded: 0,
            finished: false,
        })
    }
}

/// Remaining batch-driving entries.
#[derive(Debug)]
enum Plan {
    /// Sorted distinct foreign keys with the parents sharing each key.
    ChildLookup {
        pending: VecDeque<(KeyTuple, Vec<usize>)>,
    },
    /// Parent primary keys in input order.
    ParentLookup {
        pending: VecDeque<(KeyTuple, usize)>,
    },
}

/// One chunk of batch-driving entries, detached from the plan.
enum Chunk {
    Child(Vec<(KeyTuple, Vec<usize>)>),
    Parent(Vec<(KeyTuple, usize)>),
}

/// The lazy sequence of fetched child rows produced by one load call.
///
/// Each `next` call yields one fetched row; when the current chunk's rows
/// are exhausted the next chunk executes. Population of a chunk's parents
/// always completes before any of that chunk's rows are yielded, so a
/// caller recursing into nested relationships sees populated parents.
///
/// The sequence is finite and non-restartable; it is consumed at most
/// once. After an error the sequence is exhausted, but parents populated
/// by earlier chunks remain populated.
pub struct FetchedRecords<'a, E: Executor> {
    relation: Relation,
    chunk_size: usize,
    executor: &'a E,
    query: &'a Select,
    parents: &'a mut [Record],
    plan: Plan,
    buffer: VecDeque<Record>,
    batches: usize,
    yielded: usize,
    finished: bool,
}

impl<'a, E: Executor> FetchedRecords<'a, E> {
    /// Yield the next fetched child row, executing the next batch when the
    /// current one is drained. Returns `Ok(None)` once all batches have
    /// run.
    pub async fn next(&mut self, cx: &Cx) -> Outcome<Option<Record>, Error> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                self.yielded += 1;
                return Outcome::Ok(Some(row));
            }
            if self.finished {
                return Outcome::Ok(None);
            }
            let Some(chunk) = self.next_chunk() else {
                self.finished = true;
                tracing::debug!(
                    relation = self.relation.name,
                    batches = self.batches,
                    yielded = self.yielded,
                    "Batch load complete"
                );
                return Outcome::Ok(None);
            };
            match self.run_chunk(cx, chunk).await {
                Outcome::Ok(()) => {}
                Outcome::Err(e) => {
                    self.finished = true;
                    return Outcome::Err(e);
                }
                Outcome::Cancelled(r) => {
                    self.finished = true;
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => {
                    self.finished = true;
                    return Outcome::Panicked(p);
                }
            }
        }
    }

    /// Consume the sequence for its population side effects, returning the
    /// number of child rows fetched.
    pub async fn drive(mut self, cx: &Cx) -> Outcome<usize, Error> {
        loop {
            match self.next(cx).await {
                Outcome::Ok(Some(_)) => {}
                Outcome::Ok(None) => return Outcome::Ok(self.yielded),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
    }

    /// Consume the sequence and materialize every fetched child row.
    pub async fn collect(mut self, cx: &Cx) -> Outcome<Vec<Record>, Error> {
        let mut rows = Vec::new();
        loop {
            match self.next(cx).await {
                Outcome::Ok(Some(row)) => rows.push(row),
                Outcome::Ok(None) => return Outcome::Ok(rows),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }
    }

    /// Detach up to `chunk_size` entries from the front of the plan.
    fn next_chunk(&mut self) -> Option<Chunk> {
        match &mut self.plan {
            Plan::ChildLookup { pending } => {
                if pending.is_empty() {
                    return None;
                }
                let take = pending.len().min(self.chunk_size);
                Some(Chunk::Child(pending.drain(..take).collect()))
            }
            Plan::ParentLookup { pending } => {
                if pending.is_empty() {
                    return None;
                }
                let take = pending.len().min(self.chunk_size);
                Some(Chunk::Parent(pending.drain(..take).collect()))
            }
        }
    }

    /// Execute one chunk, populate its parents, and buffer its rows.
    async fn run_chunk(&mut self, cx: &Cx, chunk: Chunk) -> Outcome<(), Error> {
        match chunk {
            Chunk::Child(entries) => self.run_child_chunk(cx, entries).await,
            Chunk::Parent(entries) => self.run_parent_chunk(cx, entries).await,
        }
    }

    /// Child lookup: the chunk's keys are target primary keys; each
    /// fetched row matches at most one key, each key any number of
    /// parents.
    async fn run_child_chunk(
        &mut self,
        cx: &Cx,
        entries: Vec<(KeyTuple, Vec<usize>)>,
    ) -> Outcome<(), Error> {
        // BTreeMap iteration order makes the bound key list sorted and
        // deduplicated already.
        let keys: Vec<KeyTuple> = entries.iter().map(|(key, _)| key.clone()).collect();
        let rows = match self.execute(cx, &keys).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        // Re-key fetched rows by the target primary key. A duplicate key
        // keeps the last row, like the dict the original builds.
        let mut data: BTreeMap<KeyTuple, Record> = BTreeMap::new();
        for row in rows {
            let key = match key_tuple_for(
                &row,
                self.relation.match_columns(),
                &self.relation,
                RecordSide::Fetched,
            ) {
                Ok(key) => key,
                Err(e) => return Outcome::Err(e),
            };
            data.insert(key, row);
        }

        for (key, indices) in &entries {
            let matched = data.get(key);
            for &index in indices {
                let related = match self.relation.cardinality {
                    Cardinality::One => Related::One(matched.cloned()),
                    Cardinality::Many => {
                        Related::Many(matched.cloned().map_or_else(Vec::new, |row| vec![row]))
                    }
                };
                self.parents[index].set_related(self.relation.name, related);
            }
        }

        self.buffer.extend(data.into_values());
        Outcome::Ok(())
    }

    /// Parent lookup: the chunk's keys are parent primary keys; fetched
    /// rows group by the foreign key they carry.
    async fn run_parent_chunk(
        &mut self,
        cx: &Cx,
        entries: Vec<(KeyTuple, usize)>,
    ) -> Outcome<(), Error> {
        // Sorted + deduplicated binding keeps statement text reproducible
        // run-to-run; the populated result is unaffected.
        let mut keys: Vec<KeyTuple> = entries.iter().map(|(key, _)| key.clone()).collect();
        keys.sort();
        keys.dedup();
        let rows = match self.execute(cx, &keys).await {
            Outcome::Ok(rows) => rows,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let mut grouped: BTreeMap<KeyTuple, Vec<Record>> = BTreeMap::new();
        for row in rows {
            let key = match key_tuple_for(
                &row,
                self.relation.match_columns(),
                &self.relation,
                RecordSide::Fetched,
            ) {
                Ok(key) => key,
                Err(e) => return Outcome::Err(e),
            };
            grouped.entry(key).or_default().push(row);
        }

        for (key, index) in &entries {
            let matched = grouped.get(key);
            let related = match self.relation.cardinality {
                Cardinality::Many => Related::Many(matched.cloned().unwrap_or_default()),
                Cardinality::One => {
                    let collection = matched.map_or(&[][..], Vec::as_slice);
                    if collection.len() > 1 {
                        tracing::warn!(
                            relation = self.relation.name,
                            matches = collection.len(),
                            "Multiple rows matched a singular relationship; keeping the first"
                        );
                    }
                    Related::One(collection.first().cloned())
                }
            };
            self.parents[*index].set_related(self.relation.name, related);
        }

        self.buffer.extend(grouped.into_values().flatten());
        Outcome::Ok(())
    }

    /// Execute the template with one chunk's key binding.
    async fn execute(&mut self, cx: &Cx, keys: &[KeyTuple]) -> Outcome<Vec<Record>, Error> {
        self.batches += 1;
        tracing::trace!(
            relation = self.relation.name,
            batch = self.batches,
            bound_keys = keys.len(),
            "Executing batch"
        );
        let outcome = self.executor.fetch_in_set(cx, self.query, keys).await;
        if let Outcome::Ok(rows) = &outcome {
            tracing::debug!(
                relation = self.relation.name,
                batch = self.batches,
                rows = rows.len(),
                "Batch fetched"
            );
        }
        outcome
    }
}

/// The value an unmatched (or unmatchable) parent resolves to.
fn empty_related(cardinality: Cardinality) -> Related {
    match cardinality {
        Cardinality::One => Related::One(None),
        Cardinality::Many => Related::Many(Vec::new()),
    }
}

/// Extract a key tuple, reporting which column was absent on failure.
fn key_tuple_for(
    record: &Record,
    columns: &[&str],
    relation: &Relation,
    side: RecordSide,
) -> Result<KeyTuple> {
    let mut values = Vec::with_capacity(columns.len());
    for column in columns {
        match record.get(column) {
            Some(value) => values.push(value.clone()),
            None => return Err(Error::incomplete_record(relation.name, *column, side)),
        }
    }
    Ok(KeyTuple::new(values))
}

//! Core query database implementation.
//!
//! The `QueryDatabase` is the central coordinator for query execution,
//! memoization, revision tracking and dependency-based invalidation.
//!
//! The protocol every query wrapper follows is fixed: check whether the
//! cached result is up to date; if stale, execute the query body while
//! recording a dependency edge for every nested query or input read; then
//! commit the value with [`QueryDatabase::on_query_result`]. The
//! [`QueryDatabase::query`] method implements that sequence; the lower
//! level operations stay public for generated wrappers.

use crate::parallel::ParallelConfig;
use crate::query::{Query, QueryId, QueryIdInterner};
use crate::record::{
    ComputedRecord, InputRecord, ResultRecord, downcast_value,
};
use crate::revision::{Revision, RevisionCounter};
use dashmap::DashMap;
use log::{debug, trace};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use thread_local::ThreadLocal;

/// Per-thread stack of queries currently executing.
///
/// Reads performed while a query sits on top of the stack are recorded as
/// dependency edges from that query.
#[derive(Debug, Default)]
struct ActiveQueries {
    stack: Vec<QueryId>,
}

/// The central query database.
///
/// Owns every result record, the revision clock and the identifier
/// interner. Shared across worker threads by reference; per-identifier
/// compute locks keep at most one computation per query in flight.
pub struct QueryDatabase {
    /// Revision clock - advanced on every input change.
    revision: RevisionCounter,

    /// Every memoization cell, keyed by query identifier.
    records: DashMap<QueryId, ResultRecord>,

    /// Stable identifiers for (query function, arguments) pairs.
    ids: QueryIdInterner,

    /// One lock per computed query; the holder is the only in-flight
    /// computation for that identifier.
    compute_locks: DashMap<QueryId, Arc<Mutex<()>>>,

    /// Per-thread stack of in-flight queries for dependency recording.
    active: ThreadLocal<RefCell<ActiveQueries>>,

    /// Pool the dependency-refresh fan-out runs on.
    pool: rayon::ThreadPool,
}

impl Default for QueryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryDatabase {
    /// Create a database with the default thread-pool configuration.
    ///
    /// # Panics
    ///
    /// Panics if the default thread pool cannot be created.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(&ParallelConfig::default())
            .unwrap_or_else(|error| panic!("failed to create query thread pool: {error}"))
    }

    /// Create a database with an explicit thread-pool configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub fn with_config(config: &ParallelConfig) -> anyhow::Result<Self> {
        Ok(Self {
            revision: RevisionCounter::new(),
            records: DashMap::new(),
            ids: QueryIdInterner::default(),
            compute_locks: DashMap::new(),
            active: ThreadLocal::new(),
            pool: config.build_pool()?,
        })
    }

    /// The revision the system is currently at.
    #[inline]
    pub fn current_revision(&self) -> Revision {
        self.revision.current()
    }

    /// Register a fresh input, initialized to `T::default()`.
    ///
    /// The record starts with an [`Revision::INVALID`] changed-revision;
    /// nothing else is affected.
    pub fn create_input<T>(&self) -> QueryId
    where
        T: Default + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let id = self.ids.fresh();
        self.records.insert(
            id,
            ResultRecord::Input(InputRecord {
                changed_at: Revision::INVALID,
                value: Box::new(T::default()),
            }),
        );
        trace!("created input {id:?}");
        id
    }

    /// Set an input's value, advancing the revision clock.
    ///
    /// The clock advances and the input's changed-revision moves even when
    /// the new value equals the old one: inputs are conservatively treated
    /// as changed on every set. Dependent computed queries still get early
    /// cutoff from the value comparison in [`Self::on_query_result`].
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown, is not an input, or stores a different
    /// value type.
    pub fn set_input<T>(&self, id: QueryId, value: T)
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let mut record = self
            .records
            .get_mut(&id)
            .unwrap_or_else(|| panic!("set_input: unknown query {id:?}"));
        let ResultRecord::Input(input) = record.value_mut() else {
            panic!("set_input: {id:?} is not an input")
        };
        assert!(
            input.value.as_any().is::<T>(),
            "set_input: type mismatch for {id:?}, stored {:?}",
            input.value,
        );

        let revision = self.revision.next();
        input.value = Box::new(value);
        input.changed_at = revision;
        debug!("input {id:?} set, revision advanced to {}", revision.get());
    }

    /// Read an input's current value.
    ///
    /// When called from inside an executing query, a dependency edge from
    /// that query to `id` is recorded.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown, is not an input, or stores a different
    /// value type.
    pub fn get_input<T>(&self, id: QueryId) -> T
    where
        T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let value = {
            let record = self
                .records
                .get(&id)
                .unwrap_or_else(|| panic!("get_input: unknown query {id:?}"));
            let ResultRecord::Input(input) = record.value() else {
                panic!("get_input: {id:?} is not an input")
            };
            downcast_value::<T>(input.value.as_ref(), id)
        };
        self.record_read(id);
        value
    }

    /// Execute a query, returning the memoized result when it is valid.
    ///
    /// This is the main entry point. It interns the identifier, registers
    /// the record on first sight, records the dependency edge to the
    /// calling query, and then either reuses the cached value or executes
    /// the query body under this identifier's compute lock.
    pub fn query<Q: Query>(&self, key: Q::Key) -> Q::Value {
        let id = self.ids.intern::<Q>(&key);

        let recompute_key = key.clone();
        self.on_new_query(id, move |db| {
            db.run_query::<Q>(id, recompute_key.clone());
        });

        self.record_read(id);
        self.run_query::<Q>(id, key)
    }

    /// The stable identifier a `(Q, key)` call resolves to.
    ///
    /// Useful for inspecting a query's record revisions without going
    /// through the wrapper.
    #[inline]
    pub fn query_id<Q: Query>(&self, key: &Q::Key) -> QueryId {
        self.ids.intern::<Q>(key)
    }

    /// Register a computed record for `id` if none exists yet.
    ///
    /// The record starts unmemoized (invalid changed/verified revisions,
    /// no dependencies). `recompute` re-drives the full wrapper protocol
    /// for this query; dependents call it when refreshing. Subsequent
    /// calls for the same identifier are no-ops.
    pub fn on_new_query(
        &self,
        id: QueryId,
        recompute: impl Fn(&QueryDatabase) + Send + Sync + 'static,
    ) {
        self.records.entry(id).or_insert_with(|| {
            ResultRecord::Computed(ComputedRecord {
                changed_at: Revision::INVALID,
                verified_at: Revision::INVALID,
                dependencies: Vec::new(),
                value: None,
                recompute: Arc::new(recompute),
            })
        });
    }

    /// Commit the value a computed query's body just produced.
    ///
    /// This is the single point where early cutoff is decided: the new
    /// value is compared to the previous one, and only an actual change
    /// advances the record's changed-revision. The verified-revision
    /// always moves to the current revision.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown or is not a computed query.
    pub fn on_query_result<T>(&self, id: QueryId, value: T)
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let current = self.revision.current();
        let mut record = self
            .records
            .get_mut(&id)
            .unwrap_or_else(|| panic!("on_query_result: unknown query {id:?}"));
        let ResultRecord::Computed(computed) = record.value_mut() else {
            panic!("on_query_result: {id:?} is not a computed query")
        };

        let changed = computed
            .value
            .as_deref()
            .is_none_or(|previous| !previous.value_eq(&value));
        if changed {
            computed.changed_at = current;
        }
        computed.verified_at = current;
        computed.value = Some(Box::new(value));
        trace!("result for {id:?} committed, changed: {changed}");
    }

    /// Record that `dependent`'s current execution read `dependency`.
    ///
    /// # Panics
    ///
    /// Panics if either identifier is unknown, or if `dependent` is not a
    /// computed query (inputs have no dependencies).
    pub fn on_query_dependency(&self, dependent: QueryId, dependency: QueryId) {
        assert!(
            self.records.contains_key(&dependency),
            "on_query_dependency: unknown dependency {dependency:?}",
        );
        let mut record = self
            .records
            .get_mut(&dependent)
            .unwrap_or_else(|| panic!("on_query_dependency: unknown query {dependent:?}"));
        let ResultRecord::Computed(computed) = record.value_mut() else {
            panic!("on_query_dependency: {dependent:?} is not a computed query")
        };
        if !computed.dependencies.contains(&dependency) {
            computed.dependencies.push(dependency);
        }
    }

    /// Attempt to retrieve the up-to-date result of a computed query.
    ///
    /// Returns `None` when the query has never been computed, or when a
    /// dependency changed since this record was last verified - the
    /// caller must then re-execute the query body and commit the value
    /// with [`Self::on_query_result`].
    ///
    /// Stale dependencies are refreshed first, as one parallel fan-out
    /// joined before the verdict. If afterwards no dependency changed past
    /// this record's verified-revision, the cached value is reused without
    /// recomputation (early cutoff).
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown, is not a computed query, or stores a
    /// different value type.
    pub fn try_get_up_to_date_query_result<T>(&self, id: QueryId) -> Option<T>
    where
        T: Clone + 'static,
    {
        let (changed_at, verified_at, dependencies) = {
            let record = self
                .records
                .get(&id)
                .unwrap_or_else(|| panic!("up-to-date check: unknown query {id:?}"));
            let ResultRecord::Computed(computed) = record.value() else {
                panic!("up-to-date check: {id:?} is not a computed query")
            };
            (
                computed.changed_at,
                computed.verified_at,
                computed.dependencies.clone(),
            )
        };

        // The value has never been memoized yet
        if changed_at == Revision::INVALID {
            return None;
        }

        // Already verified in the current revision, reuse directly
        let current = self.revision.current();
        if verified_at == current {
            return self.cached_value(id);
        }

        // Bring every dependency up to date before judging them: a single
        // fan-out with one join point
        self.pool.install(|| {
            dependencies
                .par_iter()
                .for_each(|dependency| self.refresh(*dependency));
        });

        // If no dependency changed past our verification point, they were
        // merely re-verified, and the cached value is still correct
        let reusable = dependencies.iter().all(|dependency| {
            self.records
                .get(dependency)
                .is_some_and(|record| record.value().changed_at() <= verified_at)
        });
        if reusable {
            let mut record = self
                .records
                .get_mut(&id)
                .unwrap_or_else(|| panic!("up-to-date check: unknown query {id:?}"));
            if let ResultRecord::Computed(computed) = record.value_mut() {
                computed.verified_at = current;
            }
            drop(record);
            return self.cached_value(id);
        }

        // Some dependency carries a genuinely new value; the caller must
        // recompute
        None
    }

    /// The revision where a record's value last changed.
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    pub fn changed_at(&self, id: QueryId) -> Revision {
        self.records
            .get(&id)
            .unwrap_or_else(|| panic!("changed_at: unknown query {id:?}"))
            .value()
            .changed_at()
    }

    /// The revision through which a record is known valid.
    ///
    /// Inputs report [`Revision::MAX`].
    ///
    /// # Panics
    ///
    /// Panics if `id` is unknown.
    pub fn verified_at(&self, id: QueryId) -> Revision {
        self.records
            .get(&id)
            .unwrap_or_else(|| panic!("verified_at: unknown query {id:?}"))
            .value()
            .verified_at()
    }

    /// The number of registered records, inputs included.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the database holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop all computed records, keeping inputs.
    ///
    /// Dropped queries are re-registered and recomputed on their next
    /// call.
    pub fn clear_computed(&self) {
        self.records
            .retain(|_, record| matches!(record, ResultRecord::Input(_)));
    }

    /// Run the full wrapper protocol for one computed query.
    fn run_query<Q: Query>(&self, id: QueryId, key: Q::Key) -> Q::Value {
        // A query re-entering itself is a wiring bug; catching it here
        // also keeps it from self-deadlocking on its compute lock.
        let reentrant = self
            .active
            .get()
            .is_some_and(|active| active.borrow().stack.contains(&id));
        assert!(!reentrant, "query cycle detected at {} ({id:?})", Q::name());

        if let Some(value) = self.try_get_up_to_date_query_result::<Q::Value>(id) {
            trace!("cache hit for {} {id:?}", Q::name());
            return value;
        }
        trace!("cache miss for {} {id:?}", Q::name());

        let lock = self.compute_lock(id);
        let _guard = lock.lock();

        // Another thread may have finished this computation while we
        // waited for the lock
        if let Some(value) = self.try_get_up_to_date_query_result::<Q::Value>(id) {
            trace!("cache hit for {} {id:?} after lock", Q::name());
            return value;
        }

        // Each execution records exactly the edges it reads; edges from
        // earlier revisions are purged before the body re-adds its own
        self.clear_dependencies(id);

        self.active_stack().borrow_mut().stack.push(id);
        let value = Q::execute(self, key);
        self.active_stack().borrow_mut().stack.pop();

        self.on_query_result(id, value.clone());
        value
    }

    /// Bring one dependency up to date, recomputing it if needed.
    fn refresh(&self, id: QueryId) {
        let recompute = {
            let record = self
                .records
                .get(&id)
                .unwrap_or_else(|| panic!("refresh: unknown query {id:?}"));
            match record.value() {
                // Inputs are always current
                ResultRecord::Input(_) => return,
                ResultRecord::Computed(computed) => Arc::clone(&computed.recompute),
            }
        };
        recompute(self);
    }

    /// Clone the cached value of a computed query out of its record.
    fn cached_value<T: Clone + 'static>(&self, id: QueryId) -> Option<T> {
        let record = self
            .records
            .get(&id)
            .unwrap_or_else(|| panic!("cached value: unknown query {id:?}"));
        let ResultRecord::Computed(computed) = record.value() else {
            panic!("cached value: {id:?} is not a computed query")
        };
        computed
            .value
            .as_deref()
            .map(|value| downcast_value::<T>(value, id))
    }

    /// Record a read of `id` as a dependency of the innermost executing
    /// query, if any.
    fn record_read(&self, id: QueryId) {
        let dependent = self
            .active
            .get()
            .and_then(|active| active.borrow().stack.last().copied());
        if let Some(dependent) = dependent {
            self.on_query_dependency(dependent, id);
        }
    }

    /// Drop all recorded dependency edges of a computed query.
    fn clear_dependencies(&self, id: QueryId) {
        let mut record = self
            .records
            .get_mut(&id)
            .unwrap_or_else(|| panic!("clear dependencies: unknown query {id:?}"));
        if let ResultRecord::Computed(computed) = record.value_mut() {
            computed.dependencies.clear();
        }
    }

    /// The compute lock for one identifier, created on first use.
    fn compute_lock(&self, id: QueryId) -> Arc<Mutex<()>> {
        self.compute_locks.entry(id).or_default().clone()
    }

    /// This thread's active-query stack, created on first use.
    fn active_stack(&self) -> &RefCell<ActiveQueries> {
        self.active.get_or(|| RefCell::new(ActiveQueries::default()))
    }
}

//! Query trait and identifier interning.
//!
//! Queries are the fundamental unit of computation: a pure function from a
//! key to a value, memoized by the database with automatic dependency
//! tracking.

use crate::database::QueryDatabase;
use dashmap::DashMap;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher as _};
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for one (query function, arguments) pair.
///
/// Identity follows the logical query call, never the result value: the
/// same query function invoked with equal arguments maps to the same
/// identifier for the lifetime of the database. Input identifiers are
/// allocated directly by [`QueryDatabase::create_input`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct QueryId(u64);

/// A query call before identifier allocation: the query type plus a hash
/// of its arguments.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
struct CallKey {
    query_type: TypeId,
    key_hash: u64,
}

/// Allocates stable [`QueryId`]s.
///
/// Input identifiers are freshly allocated; computed identifiers are
/// interned from the (query type, argument hash) pair so repeated calls
/// agree. Both draw from one counter, so the two kinds never collide.
#[derive(Debug, Default)]
pub(crate) struct QueryIdInterner {
    ids: DashMap<CallKey, QueryId>,
    next: AtomicU64,
}

impl QueryIdInterner {
    /// Allocate an identifier bound to no call key.
    #[inline]
    pub(crate) fn fresh(&self) -> QueryId {
        QueryId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The identifier for a `(Q, key)` call, allocating on first sight.
    pub(crate) fn intern<Q: Query>(&self, key: &Q::Key) -> QueryId {
        let mut hasher = rustc_hash::FxHasher::default();
        key.hash(&mut hasher);
        let call = CallKey {
            query_type: TypeId::of::<Q>(),
            key_hash: hasher.finish(),
        };
        *self.ids.entry(call).or_insert_with(|| self.fresh())
    }
}

/// A memoized derivation over the query database.
///
/// A query is a pure function from `Key` to `Value`. Executions are
/// memoized; every input and query read during execution is recorded as a
/// dependency, and the cached value is reused until a dependency's value
/// actually changes.
///
/// # Example
///
/// ```ignore
/// struct DeclaredType;
///
/// impl Query for DeclaredType {
///     type Key = NodeId;
///     type Value = Type;
///
///     fn execute(db: &QueryDatabase, key: NodeId) -> Type {
///         let syntax = db.query::<DeclarationSyntax>(key);
///         resolve_type_annotation(db, &syntax)
///     }
/// }
/// ```
pub trait Query: 'static + Sized {
    /// The input key type for this query.
    type Key: Clone + Hash + Eq + Send + Sync + 'static;

    /// The output value type for this query.
    ///
    /// `PartialEq` drives early cutoff: a recomputation that produces an
    /// equal value does not advance the result's changed-revision.
    type Value: Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Execute the query to compute its value.
    ///
    /// Called when the query has never run, or when a dependency changed.
    /// Read other queries with `db.query::<Other>(key)` and inputs with
    /// `db.get_input`, which record dependency edges automatically.
    fn execute(db: &QueryDatabase, key: Self::Key) -> Self::Value;

    /// Name used in logs and panic messages.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Query for Upper {
        type Key = String;
        type Value = String;

        fn execute(_db: &QueryDatabase, key: String) -> String {
            key.to_uppercase()
        }
    }

    struct Lower;

    impl Query for Lower {
        type Key = String;
        type Value = String;

        fn execute(_db: &QueryDatabase, key: String) -> String {
            key.to_lowercase()
        }
    }

    #[test]
    fn interning_is_stable_per_call() {
        let interner = QueryIdInterner::default();
        let first = interner.intern::<Upper>(&"a".to_owned());
        let again = interner.intern::<Upper>(&"a".to_owned());
        let other_key = interner.intern::<Upper>(&"b".to_owned());
        let other_query = interner.intern::<Lower>(&"a".to_owned());

        assert_eq!(first, again);
        assert_ne!(first, other_key);
        assert_ne!(first, other_query);
    }

    #[test]
    fn fresh_ids_never_collide_with_interned_ones() {
        let interner = QueryIdInterner::default();
        let interned = interner.intern::<Upper>(&"a".to_owned());
        let fresh = interner.fresh();
        assert_ne!(interned, fresh);
    }
}

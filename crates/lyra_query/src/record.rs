//! Result records: the memoization cells of the database.
//!
//! The kind set is closed - a record is either an externally supplied
//! input or a computed derivation - and every consumer matches it
//! exhaustively. Values are stored type-erased behind one trait object;
//! downcasts are checked and fail loudly, since a mismatch between the
//! stored type and the type a caller assumes is a wiring bug.

use crate::database::QueryDatabase;
use crate::query::QueryId;
use crate::revision::Revision;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased value stored in a result record.
pub(crate) trait RecordValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    /// Value equality against another stored value; differing types are
    /// never equal.
    fn value_eq(&self, other: &dyn RecordValue) -> bool;
}

impl<T> RecordValue for T
where
    T: Any + Send + Sync + fmt::Debug + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value_eq(&self, other: &dyn RecordValue) -> bool {
        other.as_any().downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// Downcast a stored value to the type the caller assumes, cloning it out.
///
/// # Panics
///
/// Panics when the stored type differs from `T` - an internal invariant
/// violation, never user input.
pub(crate) fn downcast_value<T: Clone + 'static>(value: &dyn RecordValue, id: QueryId) -> T {
    value.as_any().downcast_ref::<T>().map_or_else(
        || {
            panic!(
                "type mismatch for {id:?}: stored {value:?}, requested {}",
                std::any::type_name::<T>()
            )
        },
        Clone::clone,
    )
}

/// Thunk that re-drives one computed query through the full wrapper
/// protocol; used when a dependent refreshes its dependencies.
pub(crate) type RecomputeFn = Arc<dyn Fn(&QueryDatabase) + Send + Sync>;

/// An externally supplied base fact.
///
/// Trusted by construction: its verification revision is pinned at
/// [`Revision::MAX`] and it has no dependencies.
pub(crate) struct InputRecord {
    pub changed_at: Revision,
    pub value: Box<dyn RecordValue>,
}

/// A memoized derivation with dynamically discovered dependencies.
///
/// `dependencies` holds the identifiers of every query and input read
/// during the last execution - references by identifier, never ownership,
/// since several results may depend on the same upstream record.
pub(crate) struct ComputedRecord {
    pub changed_at: Revision,
    pub verified_at: Revision,
    pub dependencies: Vec<QueryId>,
    pub value: Option<Box<dyn RecordValue>>,
    pub recompute: RecomputeFn,
}

/// One memoization cell.
pub(crate) enum ResultRecord {
    Input(InputRecord),
    Computed(ComputedRecord),
}

impl ResultRecord {
    /// The revision where the value last changed.
    pub(crate) fn changed_at(&self) -> Revision {
        match self {
            Self::Input(input) => input.changed_at,
            Self::Computed(computed) => computed.changed_at,
        }
    }

    /// The revision through which the value is known valid.
    pub(crate) fn verified_at(&self) -> Revision {
        match self {
            Self::Input(_) => Revision::MAX,
            Self::Computed(computed) => computed.verified_at,
        }
    }
}

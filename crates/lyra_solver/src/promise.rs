//! Single-assignment promises shared between constraints.

use parking_lot::Mutex;
use std::sync::Arc;

/// Single-assignment container for an eventually known value.
///
/// A promise is shared between the constraint that resolves it and every
/// awaiter; cloning shares the same cell. Once resolved, the value is
/// fixed forever, so sharing stays safe after resolution.
#[derive(Debug)]
pub struct Promise<T> {
    cell: Arc<Mutex<Option<T>>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Default for Promise<T> {
    fn default() -> Self {
        Self::unresolved()
    }
}

impl<T> Promise<T> {
    /// Create a promise with no value yet.
    #[inline]
    pub fn unresolved() -> Self {
        Self {
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the value has been assigned.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.cell.lock().is_some()
    }

    /// Assign the value.
    ///
    /// # Panics
    ///
    /// Panics when the promise is already resolved - resolving twice is a
    /// programming error in the resolver, not a recoverable condition.
    pub fn resolve(&self, value: T) {
        let mut cell = self.cell.lock();
        assert!(cell.is_none(), "promise resolved twice");
        *cell = Some(value);
    }
}

impl<T: Clone> Promise<T> {
    /// Read the resolved value.
    ///
    /// # Panics
    ///
    /// Panics when the promise is unresolved; callers gate on
    /// [`Self::is_resolved`] first.
    pub fn result(&self) -> T {
        self.cell
            .lock()
            .clone()
            .unwrap_or_else(|| panic!("promise read before resolution"))
    }
}

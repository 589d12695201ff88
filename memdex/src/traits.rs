//! The interface surface the collection engine consumes.

use std::sync::Arc;

use crate::encoding::IndexKey;
use crate::row::Row;
use crate::value::Value;

/// A record stored in a collection.
///
/// The engine treats records as opaque apart from two capabilities:
/// extracting named fields to build index keys, and producing the payload
/// that actually gets committed.
///
/// Can be derived for structs with named fields whose types convert
/// [`Into<Value>`]; derive when the default [`merge`](Record::merge) is
/// enough, implement by hand when a veto or a read-modify-write is needed.
pub trait Record: Clone + Send + Sync + 'static {
    /// Extracts the named field.
    ///
    /// Must be stable: the same record yields the same value for the same
    /// name, concurrently callable from any thread.
    ///
    /// # Panics
    ///
    /// Implementations panic for names outside the record's schema; asking
    /// for an unknown field is a collection/record mismatch, not a runtime
    /// condition.
    fn field(&self, name: &str) -> Value;

    /// Produces the payload to commit, given the previously committed one
    /// (`None` on first insert).
    ///
    /// Returning `None` vetoes the write; this is the only point where
    /// user code can abort a commit after every index slot has been
    /// reserved. The result must agree with `self` on every indexed
    /// field, since index keys are computed from the incoming record
    /// before `merge` runs.
    fn merge(&self, previous: Option<&Self>) -> Option<Self> {
        let _ = previous;
        Some(self.clone())
    }
}

/// A concurrent associative container an index keeps its rows in.
///
/// Implementations must be safe under concurrent calls; the engine layers
/// all ordering on top. Uniqueness is a property of the container:
/// a unique map holds one row per key, a non-unique map judges absence per
/// `(key, row)` pair and lets distinct rows share a key.
pub trait IndexMap<R>: Send + Sync {
    /// Atomically stores `row` under `key` if the slot is absent.
    ///
    /// Returns the stored row and whether it was already present: on a
    /// fresh insert `(row, false)`, otherwise the incumbent and `true`.
    fn insert_if_absent(&self, key: IndexKey, row: Arc<Row<R>>) -> (Arc<Row<R>>, bool);

    /// All rows currently stored under `key`; at most one for a unique map.
    fn get(&self, key: &IndexKey) -> Vec<Arc<Row<R>>>;

    /// Removes the `(key, row)` pair; a no-op when absent. Unique maps
    /// ignore `row` and drop the key.
    fn remove(&self, key: &IndexKey, row: &Arc<Row<R>>);

    /// Visits every `(key, row)` pair until the callback returns `false`.
    ///
    /// Visit order is unspecified and concurrent mutation is tolerated;
    /// no snapshot guarantee is made beyond pair-level consistency.
    fn for_each(&self, visit: &mut dyn FnMut(&IndexKey, &Arc<Row<R>>) -> bool);

    /// Whether the container holds at most one row per key.
    fn is_unique(&self) -> bool;
}

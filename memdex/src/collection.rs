//! The collection engine: multi-index `put`/`get`/`delete` with slot
//! reservation, rollback, and compare-and-swap commits.

use std::sync::Arc;
use std::thread;

use tracing::{debug, trace};

use crate::encoding::IndexKey;
use crate::errors::SchemaError;
use crate::index::Index;
use crate::row::{Row, RowGuard};
use crate::traits::Record;
use crate::tx::Tx;
use crate::value::Value;

/// One logical set of records, reachable through every index at once.
///
/// A committed record is visible under all of its index keys or none of
/// them: `put` reserves every slot before touching the payload and takes
/// every reservation back out on any failure. Writers contending for a row
/// are serialized by its write lock; writers contending for each other's
/// index slots are kept out of deadlock by the per-row wait chains.
///
/// The index order is fixed at construction. Position 0 is the primary
/// index: unique, and the arbiter of insert versus update.
pub struct Collection<R: Record> {
    indexes: Vec<Index<R>>,
}

impl<R: Record> std::fmt::Debug for Collection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("indexes", &self.indexes.len())
            .finish()
    }
}

/// Assembles a [`Collection`], validating the schema on `build`.
pub struct CollectionBuilder<R: Record> {
    indexes: Vec<Index<R>>,
}

impl<R: Record> CollectionBuilder<R> {
    /// Appends a unique index over `fields`.
    #[must_use]
    pub fn unique(mut self, fields: &[&str]) -> Self {
        self.indexes.push(Index::unique(fields));
        self
    }

    /// Appends a non-unique index over `fields`.
    #[must_use]
    pub fn non_unique(mut self, fields: &[&str]) -> Self {
        self.indexes.push(Index::non_unique(fields));
        self
    }

    /// Appends a preassembled index, custom encoder and container included.
    #[must_use]
    pub fn index(mut self, index: Index<R>) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn build(self) -> Result<Collection<R>, SchemaError> {
        let Some(primary) = self.indexes.first() else {
            return Err(SchemaError::NoIndexes);
        };
        if !primary.is_unique() {
            return Err(SchemaError::NonUniquePrimary);
        }
        for (position, index) in self.indexes.iter().enumerate() {
            if index.fields().is_empty() {
                return Err(SchemaError::EmptyFieldList { position });
            }
        }
        Ok(Collection {
            indexes: self.indexes,
        })
    }
}

/// One index entry written by the current attempt.
///
/// Remembered on the rollback list so a failed attempt can take it back
/// out, or on the unleash list so a successful update can free the key the
/// record moved away from.
struct Reservation<R> {
    index: usize,
    key: IndexKey,
    row: Arc<Row<R>>,
}

/// Outcome of the update path, separating genuine results from the row
/// dying between the primary probe and the row lock.
enum Update {
    Done(Option<u64>),
    Vanished,
}

impl<R: Record> Collection<R> {
    #[must_use]
    pub fn builder() -> CollectionBuilder<R> {
        CollectionBuilder {
            indexes: Vec::new(),
        }
    }

    /// Inserts or updates `record`, committing it under every index
    /// atomically.
    ///
    /// `cas_expected` guards against lost overwrites: `0` skips the check,
    /// any other value must exceed the row's current version and becomes
    /// the committed version. Returns the new version, or `None` on any
    /// failure: a unique-index collision with a committed record, a stale
    /// `cas_expected`, or a [`merge`](Record::merge) veto. Failures leave
    /// the collection exactly as it was.
    pub fn put(&self, tx: &Tx, record: R, cas_expected: u64) -> Option<u64> {
        let one = Row::new();
        let mut reserved = one.lock(tx);
        let key = self.indexes[0].key_of(&record);
        loop {
            let (existing, present) = self.indexes[0]
                .map
                .insert_if_absent(key.clone(), Arc::clone(&one));
            if !present {
                // The primary slot is ours; the fresh row rides along on
                // the rollback list in case a later index says no.
                let seed = Reservation {
                    index: 0,
                    key,
                    row: Arc::clone(&one),
                };
                return self.insert(tx, &one, &mut reserved, &record, cas_expected, vec![seed]);
            }
            if existing.committed(tx) {
                match self.update(tx, &existing, &record, cas_expected) {
                    Update::Done(result) => return result,
                    // Deleted while we waited for its lock; by now the
                    // slot is free or holds a different row.
                    Update::Vanished => continue,
                }
            }
            // A foreign reservation holds the slot; once that transaction
            // commits or rolls back the probe resolves either way.
            thread::yield_now();
        }
    }

    fn insert(
        &self,
        tx: &Tx,
        one: &Arc<Row<R>>,
        reserved: &mut RowGuard<'_, R>,
        record: &R,
        cas_expected: u64,
        mut rollbacks: Vec<Reservation<R>>,
    ) -> Option<u64> {
        for (position, index) in self.indexes.iter().enumerate().skip(1) {
            let key = index.key_of(record);
            loop {
                let (existing, present) =
                    index.map.insert_if_absent(key.clone(), Arc::clone(one));
                if !present {
                    rollbacks.push(Reservation {
                        index: position,
                        key,
                        row: Arc::clone(one),
                    });
                    break;
                }
                if Arc::ptr_eq(&existing, one) {
                    // This attempt already owns the slot.
                    break;
                }
                if existing.committed(tx) {
                    trace!(index = position, "insert collided with a committed row");
                    self.rollback(&rollbacks);
                    return None;
                }
                thread::yield_now();
            }
        }
        self.end(rollbacks, reserved, record, cas_expected, Vec::new())
    }

    fn update(&self, tx: &Tx, row: &Arc<Row<R>>, record: &R, cas_expected: u64) -> Update {
        let mut guard = row.lock(tx);
        let Some(previous) = guard.payload.clone() else {
            return Update::Vanished;
        };
        let mut rollbacks = Vec::new();
        let mut unleashes = Vec::new();
        for (position, index) in self.indexes.iter().enumerate().skip(1) {
            let key = index.key_of(record);
            loop {
                let (existing, present) =
                    index.map.insert_if_absent(key.clone(), Arc::clone(row));
                if !present {
                    // The record is moving keys in this index: the new
                    // entry is provisional, the old one is freed only on
                    // commit.
                    unleashes.push(Reservation {
                        index: position,
                        key: index.key_of(&previous),
                        row: Arc::clone(row),
                    });
                    rollbacks.push(Reservation {
                        index: position,
                        key,
                        row: Arc::clone(row),
                    });
                    break;
                }
                if Arc::ptr_eq(&existing, row) {
                    // The key did not move for this index.
                    break;
                }
                if existing.committed(tx) {
                    trace!(index = position, "update collided with a committed row");
                    self.rollback(&rollbacks);
                    return Update::Done(None);
                }
                thread::yield_now();
            }
        }
        Update::Done(self.end(rollbacks, &mut guard, record, cas_expected, unleashes))
    }

    fn commit(
        &self,
        row: &mut RowGuard<'_, R>,
        record: &R,
        cas_expected: u64,
        unleashes: &[Reservation<R>],
    ) -> Option<u64> {
        let cas = if cas_expected == 0 {
            row.cas + 1
        } else if cas_expected <= row.cas {
            trace!(expected = cas_expected, current = row.cas, "stale cas");
            return None;
        } else {
            cas_expected
        };
        let payload = record.merge(row.payload.as_ref())?;
        // Nothing can stop the commit now; the keys the record moved away
        // from fall out of their indexes.
        self.rollback(unleashes);
        row.payload = Some(payload);
        row.cas = cas;
        debug!(cas, "committed");
        Some(cas)
    }

    fn end(
        &self,
        rollbacks: Vec<Reservation<R>>,
        row: &mut RowGuard<'_, R>,
        record: &R,
        cas_expected: u64,
        unleashes: Vec<Reservation<R>>,
    ) -> Option<u64> {
        let committed = self.commit(row, record, cas_expected, &unleashes);
        if committed.is_none() {
            self.rollback(&rollbacks);
        }
        committed
    }

    fn rollback(&self, reservations: &[Reservation<R>]) {
        for entry in reservations {
            self.indexes[entry.index].map.remove(&entry.key, &entry.row);
        }
    }

    /// Looks up records through the index at `position`.
    ///
    /// Each tuple is encoded with the index's field order; results
    /// concatenate in tuple order, with enumeration order within a tuple
    /// unspecified. Reservations, tombstones and rows this transaction is
    /// itself visiting are skipped.
    ///
    /// # Panics
    ///
    /// If `position` is out of range.
    pub fn get(&self, tx: &Tx, position: usize, tuples: &[Vec<Value>]) -> Vec<R> {
        let index = &self.indexes[position];
        let mut records = Vec::new();
        for tuple in tuples {
            for row in index.map.get(&index.encode(tuple)) {
                if let Some((record, _)) = row.fetch(tx) {
                    records.push(record);
                }
            }
        }
        records
    }

    /// Removes the record whose primary key matches `sentinel`.
    ///
    /// Only the primary fields of the sentinel matter; secondary entries
    /// are removed under the keys of the stored payload. `cas_expected`
    /// follows the same rule as [`put`](Collection::put), and the returned
    /// version is the one the deletion committed at. `None` means no such
    /// record or a stale `cas_expected`; failures leave the collection
    /// untouched.
    pub fn delete(&self, tx: &Tx, sentinel: &R, cas_expected: u64) -> Option<u64> {
        let primary = &self.indexes[0];
        let key = primary.key_of(sentinel);
        let row = primary.map.get(&key).into_iter().next()?;
        let mut guard = row.lock(tx);
        let previous = guard.payload.clone()?;
        // The slot may have been repointed while we waited on the lock.
        if !primary
            .map
            .get(&key)
            .iter()
            .any(|current| Arc::ptr_eq(current, &row))
        {
            return None;
        }
        let cas = if cas_expected == 0 {
            guard.cas + 1
        } else if cas_expected <= guard.cas {
            trace!(expected = cas_expected, current = guard.cas, "stale cas");
            return None;
        } else {
            cas_expected
        };
        // Primary first: once it is out, no new reader can reach the row,
        // and secondary lookups resolve against the tombstone below.
        primary.map.remove(&key, &row);
        for index in &self.indexes[1..] {
            index.map.remove(&index.key_of(&previous), &row);
        }
        guard.payload = None;
        guard.cas = 0;
        debug!(cas, "deleted");
        Some(cas)
    }

    /// Visits every committed record filed in the index at `position`
    /// until the callback returns `false`.
    ///
    /// Enumeration order is unspecified and no snapshot is taken; the
    /// visit may block briefly behind a writer.
    ///
    /// # Panics
    ///
    /// If `position` is out of range.
    pub fn range(&self, position: usize, mut visit: impl FnMut(&IndexKey, &R) -> bool) {
        self.indexes[position].map.for_each(&mut |key, row| {
            match row.peek() {
                Some((record, _)) => visit(key, &record),
                None => true,
            }
        });
    }

    /// Number of indexes, primary included.
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }
}

//! The two built-in index containers.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::encoding::IndexKey;
use crate::row::Row;
use crate::traits::IndexMap;

/// A unique index container: one row per key.
pub struct UniqueMap<R> {
    entries: DashMap<IndexKey, Arc<Row<R>>>,
}

impl<R> Default for UniqueMap<R> {
    fn default() -> Self {
        UniqueMap {
            entries: DashMap::new(),
        }
    }
}

impl<R: Send + Sync> IndexMap<R> for UniqueMap<R> {
    fn insert_if_absent(&self, key: IndexKey, row: Arc<Row<R>>) -> (Arc<Row<R>>, bool) {
        match self.entries.entry(key) {
            Entry::Occupied(occupied) => (Arc::clone(occupied.get()), true),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&row));
                (row, false)
            }
        }
    }

    fn get(&self, key: &IndexKey) -> Vec<Arc<Row<R>>> {
        self.entries
            .get(key)
            .map(|entry| vec![Arc::clone(entry.value())])
            .unwrap_or_default()
    }

    fn remove(&self, key: &IndexKey, _row: &Arc<Row<R>>) {
        self.entries.remove(key);
    }

    fn for_each(&self, visit: &mut dyn FnMut(&IndexKey, &Arc<Row<R>>) -> bool) {
        // Snapshot the pairs first so the callback never runs under a
        // shard lock; callers may take row locks while visiting.
        let pairs: Vec<(IndexKey, Arc<Row<R>>)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        for (key, row) in &pairs {
            if !visit(key, row) {
                return;
            }
        }
    }

    fn is_unique(&self) -> bool {
        true
    }
}

/// A non-unique index container: any number of rows per key.
///
/// Absence is judged per `(key, row)` pair, so re-inserting a pair reports
/// it as present while a different row slots in beside the incumbent.
/// Buckets are kept once created; an emptied bucket answers like a missing
/// key.
pub struct NonUniqueMap<R> {
    entries: DashMap<IndexKey, Vec<Arc<Row<R>>>>,
}

impl<R> Default for NonUniqueMap<R> {
    fn default() -> Self {
        NonUniqueMap {
            entries: DashMap::new(),
        }
    }
}

impl<R: Send + Sync> IndexMap<R> for NonUniqueMap<R> {
    fn insert_if_absent(&self, key: IndexKey, row: Arc<Row<R>>) -> (Arc<Row<R>>, bool) {
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if let Some(found) = occupied.get().iter().find(|r| Arc::ptr_eq(r, &row)) {
                    return (Arc::clone(found), true);
                }
                occupied.get_mut().push(Arc::clone(&row));
                (row, false)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(vec![Arc::clone(&row)]);
                (row, false)
            }
        }
    }

    fn get(&self, key: &IndexKey) -> Vec<Arc<Row<R>>> {
        self.entries
            .get(key)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default()
    }

    fn remove(&self, key: &IndexKey, row: &Arc<Row<R>>) {
        if let Some(mut bucket) = self.entries.get_mut(key) {
            bucket.retain(|r| !Arc::ptr_eq(r, row));
        }
    }

    fn for_each(&self, visit: &mut dyn FnMut(&IndexKey, &Arc<Row<R>>) -> bool) {
        let mut pairs: Vec<(IndexKey, Arc<Row<R>>)> = Vec::new();
        for entry in self.entries.iter() {
            for row in entry.value() {
                pairs.push((entry.key().clone(), Arc::clone(row)));
            }
        }
        for (key, row) in &pairs {
            if !visit(key, row) {
                return;
            }
        }
    }

    fn is_unique(&self) -> bool {
        false
    }
}

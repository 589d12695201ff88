#![allow(dead_code)]

use core::fmt;
use std::sync::Arc;

use memdex::{Collection, Record, Value};

/// Merge hook: lets a test veto a commit after every slot is reserved.
pub type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

#[derive(Clone, Default)]
pub struct Asset {
    pub id: u64,
    pub kind: String,
    pub name: i64,
    pub code: i64,
    pub time: u64,
    pub gate: Option<Gate>,
}

impl Asset {
    pub fn new(id: u64, kind: &str, name: i64, code: i64) -> Self {
        Asset {
            id,
            kind: kind.to_string(),
            name,
            code,
            time: 0,
            gate: None,
        }
    }

    pub fn with_time(mut self, time: u64) -> Self {
        self.time = time;
        self
    }

    pub fn vetoed(mut self) -> Self {
        self.gate = Some(Arc::new(|| false));
        self
    }
}

impl Record for Asset {
    fn field(&self, name: &str) -> Value {
        match name {
            "id" => self.id.into(),
            "kind" => self.kind.as_str().into(),
            "name" => self.name.into(),
            "code" => self.code.into(),
            "time" => self.time.into(),
            other => panic!("asset has no field {other:?}"),
        }
    }

    fn merge(&self, _previous: Option<&Self>) -> Option<Self> {
        if let Some(gate) = &self.gate {
            if !gate() {
                return None;
            }
        }
        Some(self.clone())
    }
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        (self.id, &self.kind, self.name, self.code, self.time)
            == (other.id, &other.kind, other.name, other.code, other.time)
    }
}

impl Eq for Asset {}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Asset")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("code", &self.code)
            .field("time", &self.time)
            .finish()
    }
}

pub const PRIMARY: usize = 0;
pub const KIND_NAME: usize = 1;
pub const CODE: usize = 2;
pub const TIME: usize = 3;

/// The schema every test runs against: unique `id`, unique `(kind, name)`,
/// unique `code`, non-unique `time`.
pub fn collection() -> Collection<Asset> {
    Collection::builder()
        .unique(&["id"])
        .unique(&["kind", "name"])
        .unique(&["code"])
        .non_unique(&["time"])
        .build()
        .expect("valid schema")
}

/// Flattens every index into comparable `(index, key, record)` rows.
pub fn snapshot(collection: &Collection<Asset>) -> Vec<(usize, Vec<u8>, Asset)> {
    let mut entries = Vec::new();
    for position in 0..collection.index_count() {
        collection.range(position, |key, record| {
            entries.push((position, key.as_bytes().to_vec(), record.clone()));
            true
        });
    }
    entries.sort_by(|a, b| (a.0, &a.1, a.2.id).cmp(&(b.0, &b.1, b.2.id)));
    entries
}

//! # memdex
//!
//! An in-memory, multi-indexed record store with optimistic concurrency.
//!
//! A [`Collection`] keeps one logical set of records reachable through
//! several keying schemes at once: a unique primary index plus any number
//! of unique or non-unique secondary indexes.
//!
//! ## Features
//!
//! - Atomic multi-index writes: a record appears under all of its keys or
//!   none of them
//! - Compare-and-swap versions guarding against lost overwrites
//! - Row-granular write serialization, fully re-entrant across threads
//! - Deadlock-free handling of writers contending for each other's index
//!   slots, via per-row transaction wait chains
//! - Pluggable key encoders and index containers

mod collection;
mod encoding;
mod errors;
mod index;
mod maps;
mod row;
mod traits;
mod tx;
mod value;

pub use collection::{Collection, CollectionBuilder};
pub use encoding::{IndexKey, KeyEncoder, TupleEncoder};
pub use errors::SchemaError;
pub use index::Index;
pub use maps::{NonUniqueMap, UniqueMap};
pub use memdex_derive::Record;
pub use row::Row;
pub use traits::{IndexMap, Record};
pub use tx::Tx;
pub use value::Value;

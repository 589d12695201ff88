use thiserror::Error;

/// Structural problems detected while building a collection.
///
/// These are the only errors the library surfaces: runtime write conflicts
/// stay silent by design, and contract violations abort.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A collection needs at least a primary index.
    #[error("collection has no indexes")]
    NoIndexes,
    /// The index at position 0 decides insert versus update, so it must
    /// map every key to at most one row.
    #[error("primary index must be unique")]
    NonUniquePrimary,
    /// An index with no fields would file every record under one key.
    #[error("index at position {position} has an empty field list")]
    EmptyFieldList { position: usize },
}

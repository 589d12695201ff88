use crate::encoding::{IndexKey, KeyEncoder, TupleEncoder};
use crate::maps::{NonUniqueMap, UniqueMap};
use crate::traits::{IndexMap, Record};
use crate::value::Value;

/// One keying scheme over a collection: an ordered field list, an encoder,
/// and the container mapping encoded keys to rows.
pub struct Index<R> {
    fields: Vec<String>,
    encoder: Box<dyn KeyEncoder>,
    pub(crate) map: Box<dyn IndexMap<R>>,
}

impl<R: Record> Index<R> {
    /// An index with a custom encoder or container.
    #[must_use]
    pub fn new(fields: &[&str], encoder: Box<dyn KeyEncoder>, map: Box<dyn IndexMap<R>>) -> Self {
        Index {
            fields: fields.iter().map(|field| (*field).to_string()).collect(),
            encoder,
            map,
        }
    }

    /// A unique index over `fields` with the default encoder.
    #[must_use]
    pub fn unique(fields: &[&str]) -> Self {
        Self::new(fields, Box::new(TupleEncoder), Box::new(UniqueMap::default()))
    }

    /// A non-unique index over `fields` with the default encoder.
    #[must_use]
    pub fn non_unique(fields: &[&str]) -> Self {
        Self::new(
            fields,
            Box::new(TupleEncoder),
            Box::new(NonUniqueMap::default()),
        )
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub(crate) fn is_unique(&self) -> bool {
        self.map.is_unique()
    }

    /// The key this index files `record` under.
    pub(crate) fn key_of(&self, record: &R) -> IndexKey {
        let values: Vec<Value> = self
            .fields
            .iter()
            .map(|field| record.field(field))
            .collect();
        self.encoder.encode(&values)
    }

    pub(crate) fn encode(&self, values: &[Value]) -> IndexKey {
        self.encoder.encode(values)
    }
}

//! Deterministic, injective encoding of field-value tuples into index keys.

use core::fmt;

use crate::value::Value;

/// An encoded index key.
///
/// Opaque bytes produced by a [`KeyEncoder`]; equal keys mean equal field
/// tuples, and nothing else about the tuple can be assumed.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexKey(Vec<u8>);

impl IndexKey {
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for IndexKey {
    fn from(bytes: Vec<u8>) -> Self {
        IndexKey(bytes)
    }
}

impl fmt::Debug for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexKey(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Turns a tuple of field values into an index key.
///
/// Implementations must be deterministic and injective over the tuples a
/// collection feeds them: two different tuples must never encode to the
/// same key, or records would silently collide in an index.
pub trait KeyEncoder: Send + Sync {
    fn encode(&self, values: &[Value]) -> IndexKey;
}

const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_UINT: u8 = 3;
const TAG_STR: u8 = 4;
const TAG_BYTES: u8 = 5;

/// The default encoder.
///
/// Every value is framed: a tag byte, then a fixed-width big-endian body
/// for scalars or a length prefix before string and byte content. Framing
/// rather than separators is what keeps the encoding injective for
/// arbitrary byte content.
#[derive(Debug, Default, Clone, Copy)]
pub struct TupleEncoder;

impl KeyEncoder for TupleEncoder {
    fn encode(&self, values: &[Value]) -> IndexKey {
        let mut out = Vec::with_capacity(values.len() * 9);
        for value in values {
            match value {
                Value::Bool(b) => {
                    out.push(TAG_BOOL);
                    out.push(u8::from(*b));
                }
                Value::Int(i) => {
                    out.push(TAG_INT);
                    out.extend_from_slice(&i.to_be_bytes());
                }
                Value::Uint(u) => {
                    out.push(TAG_UINT);
                    out.extend_from_slice(&u.to_be_bytes());
                }
                Value::Str(s) => {
                    out.push(TAG_STR);
                    out.extend_from_slice(&(s.len() as u64).to_be_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                Value::Bytes(b) => {
                    out.push(TAG_BYTES);
                    out.extend_from_slice(&(b.len() as u64).to_be_bytes());
                    out.extend_from_slice(b);
                }
            }
        }
        IndexKey(out)
    }
}

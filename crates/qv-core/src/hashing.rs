//! Deterministic structural hashing for plan nodes.
//!
//! Node identity is a truncated SHA-256 digest over a canonical byte stream:
//! a kind tag, the ids of child nodes, then the node payload. The digest is
//! independent of process, platform and allocation addresses, so two
//! structurally identical nodes hash the same in any run.

use crate::schema::{Field, Schema};
use crate::types::{DataType, Nullability};
use crate::value::ScalarValue;
use sha2::{Digest, Sha256};

/// 128-bit structural identity of a node
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId([u8; 16]);

impl NodeId {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// First eight hex digits, for display
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}

/// Incremental builder for a [`NodeId`].
///
/// Every variable-length write is length-prefixed so adjacent fields can
/// never be confused.
pub struct StructuralHasher {
    inner: Sha256,
}

impl StructuralHasher {
    /// Start a digest for a node of the given kind
    pub fn new(kind: &str) -> Self {
        let mut hasher = Self {
            inner: Sha256::new(),
        };
        hasher.write_str(kind);
        hasher
    }

    /// Append a single tag byte
    pub fn write_u8(&mut self, v: u8) -> &mut Self {
        self.inner.update([v]);
        self
    }

    /// Append a u64 in little-endian order
    pub fn write_u64(&mut self, v: u64) -> &mut Self {
        self.inner.update(v.to_le_bytes());
        self
    }

    /// Append an i64 in little-endian order
    pub fn write_i64(&mut self, v: i64) -> &mut Self {
        self.inner.update(v.to_le_bytes());
        self
    }

    /// Append a bool
    pub fn write_bool(&mut self, v: bool) -> &mut Self {
        self.write_u8(v as u8)
    }

    /// Append a length-prefixed string
    pub fn write_str(&mut self, s: &str) -> &mut Self {
        self.write_bytes(s.as_bytes())
    }

    /// Append length-prefixed bytes
    pub fn write_bytes(&mut self, b: &[u8]) -> &mut Self {
        self.write_u64(b.len() as u64);
        self.inner.update(b);
        self
    }

    /// Append a child node id
    pub fn write_id(&mut self, id: &NodeId) -> &mut Self {
        self.inner.update(id.0);
        self
    }

    /// Append any structurally hashable value
    pub fn write<T: StructuralHash + ?Sized>(&mut self, value: &T) -> &mut Self {
        value.structural_hash(self);
        self
    }

    /// Append a length-prefixed sequence
    pub fn write_seq<'a, T, I>(&mut self, items: I) -> &mut Self
    where
        T: StructuralHash + 'a,
        I: IntoIterator<Item = &'a T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = items.into_iter();
        self.write_u64(iter.len() as u64);
        for item in iter {
            item.structural_hash(self);
        }
        self
    }

    /// Consume the hasher and produce the identity
    pub fn finish(self) -> NodeId {
        let digest = self.inner.finalize();
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        NodeId(out)
    }
}

/// Types that contribute a canonical byte stream to a [`StructuralHasher`]
pub trait StructuralHash {
    /// Feed this value into the hasher
    fn structural_hash(&self, hasher: &mut StructuralHasher);
}

impl StructuralHash for NodeId {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher.write_id(self);
    }
}

impl StructuralHash for str {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher.write_str(self);
    }
}

impl StructuralHash for String {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher.write_str(self);
    }
}

impl StructuralHash for Nullability {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher.write_bool(self.is_nullable());
    }
}

impl StructuralHash for DataType {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        // Display names are canonical and carry every type parameter
        hasher.write_str(&self.display_name());
    }
}

impl StructuralHash for Field {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher
            .write_str(&self.name)
            .write(&self.data_type)
            .write(&self.nullability);
    }
}

impl StructuralHash for Schema {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        hasher.write_seq(self.fields());
    }
}

impl StructuralHash for ScalarValue {
    fn structural_hash(&self, hasher: &mut StructuralHasher) {
        match self {
            ScalarValue::Null => {
                hasher.write_u8(0);
            }
            ScalarValue::Boolean(b) => {
                hasher.write_u8(1).write_bool(*b);
            }
            ScalarValue::Integer(v) => {
                hasher.write_u8(2).write_i64(*v);
            }
            ScalarValue::Float(v) => {
                hasher.write_u8(3).write_u64(v.to_bits());
            }
            ScalarValue::Decimal { value, scale } => {
                hasher
                    .write_u8(4)
                    .write_bytes(&value.to_le_bytes())
                    .write_u8(*scale);
            }
            ScalarValue::String(s) => {
                hasher.write_u8(5).write_str(s);
            }
            ScalarValue::Binary(b) => {
                hasher.write_u8(6).write_bytes(b);
            }
            ScalarValue::Date(d) => {
                hasher.write_u8(7).write_str(&d.to_string());
            }
            ScalarValue::Time(t) => {
                hasher.write_u8(8).write_str(&t.to_string());
            }
            ScalarValue::Timestamp(t) => {
                hasher.write_u8(9).write_str(&t.to_string());
            }
            ScalarValue::Interval(v) => {
                hasher.write_u8(10).write_i64(*v);
            }
            ScalarValue::Array(items) => {
                hasher.write_u8(11).write_seq(items);
            }
            ScalarValue::Struct(fields) => {
                hasher.write_u8(12).write_u64(fields.len() as u64);
                for (name, value) in fields {
                    hasher.write_str(name).write(value);
                }
            }
            ScalarValue::Map(entries) => {
                hasher.write_u8(13).write_u64(entries.len() as u64);
                for (k, v) in entries {
                    hasher.write(k).write(v);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "hashing_test.rs"]
mod tests;

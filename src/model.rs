//! Identifiers and small shared data types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Monotone counter identifying a read-only transaction.
pub type TxnId = u64;

/// Monotone counter identifying a commit; the snapshot-isolation key.
///
/// Zero is reserved as "none". Version ids are packed together with a
/// two-bit lifecycle tag into a single atomic word (see [`crate::txn`]),
/// which caps the usable range at [`MAX_VERSION_ID`].
pub type VersionId = u64;

/// Largest version id the packed lifecycle word can represent.
pub const MAX_VERSION_ID: VersionId = (1 << 62) - 1;

/// Identifier of a class, assigned by the schema engine.
pub type ClassId = u16;

/// Identifier of a property within the schema.
pub type PropertyId = u16;

/// Identifier of a secondary index.
pub type IndexId = u16;

/// Per-class record slot, assigned monotonically by the record store.
pub type PositionId = u32;

/// Unique name of a vertex or edge record: its class and position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId {
    /// Class the record belongs to.
    pub class_id: ClassId,
    /// Slot of the record within its class.
    pub position_id: PositionId,
}

impl RecordId {
    /// Builds a record id from its two halves.
    pub const fn new(class_id: ClassId, position_id: PositionId) -> Self {
        Self {
            class_id,
            position_id,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.class_id, self.position_id)
    }
}

/// Kind of records a class groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassType {
    /// Vertex records.
    Vertex,
    /// Edge records.
    Edge,
}

/// Declared value type of a property.
///
/// The core never interprets payload bytes; the type only drives schema
/// bookkeeping and index-database naming (signed numeric types are split
/// into positive and negative halves).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyType {
    /// 8-bit signed integer.
    TinyInt,
    /// 8-bit unsigned integer.
    UnsignedTinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 16-bit unsigned integer.
    UnsignedSmallInt,
    /// 32-bit signed integer.
    Integer,
    /// 32-bit unsigned integer.
    UnsignedInteger,
    /// 64-bit signed integer.
    BigInt,
    /// 64-bit unsigned integer.
    UnsignedBigInt,
    /// UTF-8 text.
    Text,
    /// 64-bit floating point.
    Real,
    /// Opaque bytes.
    Blob,
}

impl PropertyType {
    /// Whether values of this type carry a sign, requiring the index store
    /// to keep separate positive and negative halves.
    pub fn is_signed_numeric(self) -> bool {
        matches!(
            self,
            PropertyType::TinyInt
                | PropertyType::SmallInt
                | PropertyType::Integer
                | PropertyType::BigInt
                | PropertyType::Real
        )
    }
}

/// Schema-wide bookkeeping counters.
///
/// Read-write transactions work on a private copy and write it back under
/// the schema-info lock at commit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbInfo {
    /// Highest class id ever assigned.
    pub max_class_id: ClassId,
    /// Number of live classes.
    pub num_classes: u32,
    /// Highest property id ever assigned.
    pub max_property_id: PropertyId,
    /// Number of live properties across all classes.
    pub num_properties: u32,
    /// Highest index id ever assigned.
    pub max_index_id: IndexId,
    /// Number of live indexes.
    pub num_indexes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_orders_by_class_then_position() {
        let a = RecordId::new(1, 9);
        let b = RecordId::new(2, 1);
        let c = RecordId::new(2, 3);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(format!("{}", c), "2:3");
    }

    #[test]
    fn signed_split_covers_numeric_types() {
        assert!(PropertyType::Integer.is_signed_numeric());
        assert!(PropertyType::Real.is_signed_numeric());
        assert!(!PropertyType::UnsignedBigInt.is_signed_numeric());
        assert!(!PropertyType::Text.is_signed_numeric());
    }
}

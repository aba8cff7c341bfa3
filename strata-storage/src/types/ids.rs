use std::fmt::{Display, Formatter};

/// The index of a chunk within a table.
pub type ChunkId = u32;
/// The index of a column within a table.
pub type ColumnId = u16;
/// The index of a row within a chunk.
pub type ChunkOffset = u32;

/// Returned by dictionary lookups when no matching entry exists.
///
/// Attribute vectors never store this value, their width is always picked so that
/// the maximum value at that width stays unused.
pub const INVALID_VALUE_ID: ValueId = ValueId(u64::MAX);

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// A position within the sorted values of a dictionary.
pub struct ValueId(pub u64);

impl ValueId {
    #[inline]
    /// Returns `false` if this is the [INVALID_VALUE_ID] sentinel.
    pub fn is_valid(self) -> bool {
        self != INVALID_VALUE_ID
    }

    #[inline]
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl Display for ValueId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "INVALID")
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// Addresses a single row of a table.
///
/// Row IDs are only meaningful relative to the table they were produced against.
pub struct RowId {
    pub chunk_id: ChunkId,
    pub chunk_offset: ChunkOffset,
}

impl RowId {
    #[inline]
    pub const fn new(chunk_id: ChunkId, chunk_offset: ChunkOffset) -> Self {
        Self {
            chunk_id,
            chunk_offset,
        }
    }
}

impl Display for RowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.chunk_id, self.chunk_offset)
    }
}

/// An ordered list of rows selected from a table.
pub type PosList = Vec<RowId>;

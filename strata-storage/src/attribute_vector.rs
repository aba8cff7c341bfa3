//! Bit-width fitted storage of dictionary value IDs.

use crate::error::StorageError;
use crate::types::ValueId;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
/// The integer width each entry of an [AttributeVector] is stored with.
pub enum AttributeVectorWidth {
    U8,
    U16,
    U32,
    U64,
}

impl AttributeVectorWidth {
    /// Picks the narrowest width where `2^width - 1 >= cardinality`.
    ///
    /// The maximum value at the chosen width is never a valid index.
    pub fn for_cardinality(cardinality: usize) -> Self {
        let cardinality = cardinality as u64;
        if cardinality <= u8::MAX as u64 {
            Self::U8
        } else if cardinality <= u16::MAX as u64 {
            Self::U16
        } else if cardinality <= u32::MAX as u64 {
            Self::U32
        } else {
            Self::U64
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::U64 => 64,
        }
    }

    pub fn bytes(&self) -> usize {
        self.bits() as usize / 8
    }

    fn max_value_id(&self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A dense row offset to [ValueId] mapping.
pub enum AttributeVector {
    U8(Box<[u8]>),
    U16(Box<[u16]>),
    U32(Box<[u32]>),
    U64(Box<[u64]>),
}

impl AttributeVector {
    /// Creates a zeroed vector of `len` entries at the given width.
    pub fn new(width: AttributeVectorWidth, len: usize) -> Self {
        match width {
            AttributeVectorWidth::U8 => Self::U8(vec![0; len].into_boxed_slice()),
            AttributeVectorWidth::U16 => Self::U16(vec![0; len].into_boxed_slice()),
            AttributeVectorWidth::U32 => Self::U32(vec![0; len].into_boxed_slice()),
            AttributeVectorWidth::U64 => Self::U64(vec![0; len].into_boxed_slice()),
        }
    }

    /// Collects the IDs into a vector sized for a dictionary of `cardinality` entries.
    ///
    /// Every ID must be `< cardinality`.
    pub fn fitted<I>(cardinality: usize, ids: I) -> Self
    where
        I: IntoIterator<Item = ValueId>,
    {
        let ids = ids.into_iter();
        match AttributeVectorWidth::for_cardinality(cardinality) {
            AttributeVectorWidth::U8 => Self::U8(ids.map(|id| id.0 as u8).collect()),
            AttributeVectorWidth::U16 => Self::U16(ids.map(|id| id.0 as u16).collect()),
            AttributeVectorWidth::U32 => Self::U32(ids.map(|id| id.0 as u32).collect()),
            AttributeVectorWidth::U64 => Self::U64(ids.map(|id| id.0).collect()),
        }
    }

    #[inline]
    /// Returns the value ID stored at the given offset.
    pub fn get(&self, offset: usize) -> Option<ValueId> {
        let id = match self {
            Self::U8(ids) => *ids.get(offset)? as u64,
            Self::U16(ids) => *ids.get(offset)? as u64,
            Self::U32(ids) => *ids.get(offset)? as u64,
            Self::U64(ids) => *ids.get(offset)?,
        };
        Some(ValueId(id))
    }

    /// Stores a value ID at the given offset.
    ///
    /// IDs that do not fit below the maximum value of the vector's width are rejected.
    pub fn set(&mut self, offset: usize, value_id: ValueId) -> Result<(), StorageError> {
        let len = self.len();
        if offset >= len {
            return Err(StorageError::out_of_range("row", offset, len));
        }

        let max = self.width().max_value_id();
        if value_id.0 >= max {
            return Err(StorageError::out_of_range(
                "value id",
                value_id.as_usize(),
                max as usize,
            ));
        }

        match self {
            Self::U8(ids) => ids[offset] = value_id.0 as u8,
            Self::U16(ids) => ids[offset] = value_id.0 as u16,
            Self::U32(ids) => ids[offset] = value_id.0 as u32,
            Self::U64(ids) => ids[offset] = value_id.0,
        }

        Ok(())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(ids) => ids.len(),
            Self::U16(ids) => ids.len(),
            Self::U32(ids) => ids.len(),
            Self::U64(ids) => ids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> AttributeVectorWidth {
        match self {
            Self::U8(_) => AttributeVectorWidth::U8,
            Self::U16(_) => AttributeVectorWidth::U16,
            Self::U32(_) => AttributeVectorWidth::U32,
            Self::U64(_) => AttributeVectorWidth::U64,
        }
    }

    pub fn iter(&self) -> AttributeVectorIter<'_> {
        match self {
            Self::U8(ids) => AttributeVectorIter::U8(ids.iter()),
            Self::U16(ids) => AttributeVectorIter::U16(ids.iter()),
            Self::U32(ids) => AttributeVectorIter::U32(ids.iter()),
            Self::U64(ids) => AttributeVectorIter::U64(ids.iter()),
        }
    }

    /// Calls `emit` with the offset of every entry accepted by `predicate`, in
    /// ascending offset order.
    ///
    /// The width is resolved once rather than per entry.
    pub fn for_each_matching<P, E>(&self, mut predicate: P, mut emit: E)
    where
        P: FnMut(ValueId) -> bool,
        E: FnMut(usize),
    {
        match self {
            Self::U8(ids) => visit_matching(ids, &mut predicate, &mut emit),
            Self::U16(ids) => visit_matching(ids, &mut predicate, &mut emit),
            Self::U32(ids) => visit_matching(ids, &mut predicate, &mut emit),
            Self::U64(ids) => visit_matching(ids, &mut predicate, &mut emit),
        }
    }

    pub fn estimated_memory_usage(&self) -> usize {
        self.len() * self.width().bytes()
    }
}

fn visit_matching<T, P, E>(ids: &[T], predicate: &mut P, emit: &mut E)
where
    T: Copy + Into<u64>,
    P: FnMut(ValueId) -> bool,
    E: FnMut(usize),
{
    for (offset, id) in ids.iter().enumerate() {
        if predicate(ValueId((*id).into())) {
            emit(offset);
        }
    }
}

/// Iterates the [ValueId]s of an [AttributeVector] in offset order.
pub enum AttributeVectorIter<'a> {
    U8(std::slice::Iter<'a, u8>),
    U16(std::slice::Iter<'a, u16>),
    U32(std::slice::Iter<'a, u32>),
    U64(std::slice::Iter<'a, u64>),
}

impl Iterator for AttributeVectorIter<'_> {
    type Item = ValueId;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let id = match self {
            Self::U8(iter) => *iter.next()? as u64,
            Self::U16(iter) => *iter.next()? as u64,
            Self::U32(iter) => *iter.next()? as u64,
            Self::U64(iter) => *iter.next()?,
        };
        Some(ValueId(id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::U8(iter) => iter.size_hint(),
            Self::U16(iter) => iter.size_hint(),
            Self::U32(iter) => iter.size_hint(),
            Self::U64(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for AttributeVectorIter<'_> {}

//! Column storage for a single chunk.
//!
//! A [Segment] is one of three encodings:
//!
//! - [Segment::Value] plain, append-only storage of typed values.
//! - [Segment::Dictionary] a sorted dictionary plus a fitted [AttributeVector](crate::AttributeVector).
//! - [Segment::Reference] a zero-copy view over another table's column.
//!
//! The typed encodings are wrapped in [AnyValueSegment] and [AnyDictionarySegment],
//! one variant per [DataType], so callers pick the native type once with
//! [ColumnType::value_segment](crate::ColumnType::value_segment) or
//! [ColumnType::dictionary_segment](crate::ColumnType::dictionary_segment)
//! and then operate on plain slices.

/// Applies `$body` to the typed segment inside any of the per-type variants.
macro_rules! dispatch_typed {
    ($segment:expr, |$s:ident| $body:expr) => {
        match $segment {
            Self::Int($s) => $body,
            Self::Long($s) => $body,
            Self::Float($s) => $body,
            Self::Double($s) => $body,
            Self::String($s) => $body,
        }
    };
}

mod dictionary;
mod reference;
mod value;

use std::fmt::{Display, Formatter};

pub use self::dictionary::{AnyDictionarySegment, DictionarySegment};
pub use self::reference::ReferenceSegment;
pub use self::value::{AnyValueSegment, ValueSegment};
use crate::error::StorageError;
use crate::types::{DataType, Value};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// The encoding of a [Segment].
pub enum SegmentKind {
    Value,
    Dictionary,
    Reference,
}

impl Display for SegmentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Value => f.write_str("value"),
            SegmentKind::Dictionary => f.write_str("dictionary"),
            SegmentKind::Reference => f.write_str("reference"),
        }
    }
}

#[derive(Debug, Clone)]
/// The storage of one column within one chunk.
pub enum Segment {
    Value(AnyValueSegment),
    Dictionary(AnyDictionarySegment),
    Reference(ReferenceSegment),
}

impl Segment {
    /// Creates an empty, appendable segment for the given type.
    pub fn new_value(data_type: DataType) -> Self {
        Self::Value(AnyValueSegment::new(data_type))
    }

    pub fn kind(&self) -> SegmentKind {
        match self {
            Self::Value(_) => SegmentKind::Value,
            Self::Dictionary(_) => SegmentKind::Dictionary,
            Self::Reference(_) => SegmentKind::Reference,
        }
    }

    /// The type of the values in the segment.
    ///
    /// For reference segments this is the type of the referenced column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Value(segment) => segment.data_type(),
            Self::Dictionary(segment) => segment.data_type(),
            Self::Reference(segment) => segment.data_type(),
        }
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        match self {
            Self::Value(segment) => segment.len(),
            Self::Dictionary(segment) => segment.len(),
            Self::Reference(segment) => segment.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the cell at the given offset.
    ///
    /// This materializes a [Value], scans should use the typed segments instead.
    pub fn value(&self, offset: usize) -> Result<Value, StorageError> {
        let value = match self {
            Self::Value(segment) => segment.value(offset),
            Self::Dictionary(segment) => segment.value(offset),
            Self::Reference(segment) => return segment.value(offset),
        };
        value.ok_or_else(|| StorageError::out_of_range("row", offset, self.len()))
    }

    /// Appends a value to the end of the segment.
    ///
    /// Only value segments can be appended to.
    pub fn append(&mut self, value: Value) -> Result<(), StorageError> {
        match self {
            Self::Value(segment) => segment.append(value),
            other => Err(StorageError::ImmutableSegmentMutation(other.kind())),
        }
    }

    /// Produces the dictionary encoded form of this segment.
    ///
    /// Already encoded segments are returned as a cheap clone.
    pub fn encode_dictionary(&self) -> Result<Segment, StorageError> {
        match self {
            Self::Value(segment) => Ok(Self::Dictionary(AnyDictionarySegment::encode(segment))),
            Self::Dictionary(segment) => Ok(Self::Dictionary(segment.clone())),
            Self::Reference(_) => Err(StorageError::UnsupportedEncoding(SegmentKind::Reference)),
        }
    }

    /// An estimate of the bytes held by the segment.
    ///
    /// Reference segments only account for their position list, which may be
    /// shared with other segments.
    pub fn estimated_memory_usage(&self) -> usize {
        match self {
            Self::Value(segment) => segment.estimated_memory_usage(),
            Self::Dictionary(segment) => segment.estimated_memory_usage(),
            Self::Reference(segment) => segment.estimated_memory_usage(),
        }
    }
}

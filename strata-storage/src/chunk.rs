use std::iter::zip;

use crate::error::StorageError;
use crate::segment::{Segment, SegmentKind};
use crate::types::{ColumnId, Value};

#[derive(Debug, Clone, Default)]
/// A horizontal partition of a table holding one [Segment] per column.
///
/// All segments of a chunk always have the same length.
pub struct Chunk {
    segments: Vec<Segment>,
}

impl Chunk {
    /// Creates a chunk without any segments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chunk from a set of segments of equal length.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, StorageError> {
        let mut chunk = Self::with_capacity(segments.len());
        for segment in segments {
            chunk.add_segment(segment)?;
        }
        Ok(chunk)
    }

    fn with_capacity(columns: usize) -> Self {
        Self {
            segments: Vec::with_capacity(columns),
        }
    }

    /// Adds a segment as the last column of the chunk.
    pub fn add_segment(&mut self, segment: Segment) -> Result<(), StorageError> {
        if !self.segments.is_empty() && segment.len() != self.size() {
            return Err(StorageError::ChunkSizeMismatch {
                expected: self.size(),
                actual: segment.len(),
            });
        }

        self.segments.push(segment);
        Ok(())
    }

    /// Appends one row to the chunk.
    ///
    /// The row is validated against every segment before any segment is touched,
    /// a failed append leaves the chunk unchanged.
    pub fn append(&mut self, values: Vec<Value>) -> Result<(), StorageError> {
        if values.len() != self.segments.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: self.segments.len(),
                actual: values.len(),
            });
        }

        for (segment, value) in zip(&self.segments, &values) {
            let Segment::Value(segment) = segment else {
                return Err(StorageError::ImmutableSegmentMutation(segment.kind()));
            };
            if segment.data_type() != value.data_type() {
                return Err(StorageError::TypeMismatch {
                    expected: segment.data_type(),
                    actual: value.data_type(),
                });
            }
        }

        for (segment, value) in zip(&mut self.segments, values) {
            segment.append(value)?;
        }

        Ok(())
    }

    /// Returns the segment of the given column.
    pub fn segment(&self, column_id: ColumnId) -> Result<&Segment, StorageError> {
        self.segments.get(column_id as usize).ok_or_else(|| {
            StorageError::out_of_range("column", column_id as usize, self.segments.len())
        })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn column_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of rows, `0` if the chunk has no segments.
    pub fn size(&self) -> usize {
        self.segments.first().map(Segment::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns `true` if every segment is of the given kind.
    pub fn is_encoded_as(&self, kind: SegmentKind) -> bool {
        self.segments.iter().all(|segment| segment.kind() == kind)
    }

    /// Produces a copy of the chunk with every segment dictionary encoded.
    pub fn encode_dictionary(&self) -> Result<Chunk, StorageError> {
        let segments = self
            .segments
            .iter()
            .map(Segment::encode_dictionary)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn estimated_memory_usage(&self) -> usize {
        self.segments.iter().map(Segment::estimated_memory_usage).sum()
    }
}

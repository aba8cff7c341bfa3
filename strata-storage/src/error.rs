use crate::segment::SegmentKind;
use crate::types::DataType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// An error that can occur when reading or mutating columnar storage.
pub enum StorageError {
    #[error("Type mismatch: expected {expected}, got {actual}")]
    /// A value does not match the declared type of the column it targets.
    TypeMismatch { expected: DataType, actual: DataType },
    #[error("Cannot mutate immutable {0} segment")]
    /// An append or column change targeted storage that cannot be modified.
    ImmutableSegmentMutation(SegmentKind),
    #[error("{what} index {index} is out of range (len {len})")]
    /// A row, column or chunk index is beyond the bounds of its container.
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },
    #[error("Unknown column: {0:?}")]
    /// No column with the given name exists.
    UnknownColumn(String),
    #[error("Expected {expected} values, got {actual}")]
    /// The number of supplied values does not match the number of columns.
    ColumnCountMismatch { expected: usize, actual: usize },
    #[error("Chunk size mismatch: expected {expected} rows, got {actual}")]
    /// A segment or chunk would break the equal-length or full-chunk invariants.
    ChunkSizeMismatch { expected: usize, actual: usize },
    #[error("Column already exists: {0:?}")]
    DuplicateColumn(String),
    #[error("Expected a {expected} segment, got a {actual} segment")]
    UnexpectedSegmentKind {
        expected: SegmentKind,
        actual: SegmentKind,
    },
    #[error("A {0} segment cannot be dictionary encoded")]
    UnsupportedEncoding(SegmentKind),
    #[error("Table not found: {0:?}")]
    TableNotFound(String),
    #[error("Table already exists: {0:?}")]
    TableAlreadyExists(String),
}

impl StorageError {
    pub(crate) fn out_of_range(what: &'static str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { what, index, len }
    }

    /// Returns `true` for the recoverable lookup misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownColumn(_) | Self::TableNotFound(_))
    }
}

use strata_storage::{ColumnId, DataType, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// An error that can occur while executing an operator.
pub enum ScanError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Cannot compare a {column_type} column with a {literal_type} literal")]
    /// The scan literal does not have the declared type of the scanned column.
    LiteralTypeMismatch {
        column_type: DataType,
        literal_type: DataType,
    },
    #[error("Column {0} references more than one table")]
    /// The reference segments of one input column point at different tables,
    /// so the column cannot be flattened into a single reference segment.
    MixedReferenceTargets(ColumnId),
}

//! In-memory columnar storage.
//!
//! Tables are split horizontally into [Chunk]s, each holding one [Segment] per column.
//! Full chunks can be swapped for a dictionary encoded copy by the [Compressor],
//! query results are built from [ReferenceSegment]s pointing back at their base table.

mod attribute_vector;
mod catalog;
mod chunk;
mod compressor;
mod error;
mod segment;
mod table;
mod types;

pub use self::attribute_vector::{AttributeVector, AttributeVectorIter, AttributeVectorWidth};
pub use self::catalog::Catalog;
pub use self::chunk::Chunk;
pub use self::compressor::{CompressionSummary, Compressor, CompressorOptions};
pub use self::error::StorageError;
pub use self::segment::{
    AnyDictionarySegment,
    AnyValueSegment,
    DictionarySegment,
    ReferenceSegment,
    Segment,
    SegmentKind,
    ValueSegment,
};
pub use self::table::{ColumnDefinition, Table, TableOptions, DEFAULT_MAX_CHUNK_SIZE};
pub use self::types::{
    ChunkId,
    ChunkOffset,
    ColumnId,
    ColumnType,
    DataType,
    PosList,
    RowId,
    UnknownDataType,
    Value,
    ValueId,
    INVALID_VALUE_ID,
};

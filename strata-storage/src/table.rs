use std::iter::zip;
use std::sync::Arc;

use bon::Builder;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument, trace, warn};

use crate::chunk::Chunk;
use crate::error::StorageError;
use crate::segment::{AnyValueSegment, Segment, SegmentKind};
use crate::types::{ChunkId, ChunkOffset, ColumnId, DataType, RowId, Value};

/// The default row capacity of a chunk, effectively unbounded.
pub const DEFAULT_MAX_CHUNK_SIZE: ChunkOffset = ChunkOffset::MAX - 1;

#[derive(Debug, Clone, Builder)]
/// Options that can be configured when creating a table.
pub struct TableOptions {
    #[builder(default = DEFAULT_MAX_CHUNK_SIZE)]
    /// The number of rows a chunk holds before a new chunk is started.
    ///
    /// A value of `0` is treated as `1`.
    max_chunk_size: ChunkOffset,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// The name and declared type of a column.
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum TableKind {
    /// Chunks hold value or dictionary segments.
    Base,
    /// A single immutable chunk of reference segments.
    Reference,
}

#[derive(Debug)]
/// A single chunk position within the table.
///
/// Readers clone the current [Arc<Chunk>] out of the slot, so replacing the chunk
/// is an all-or-nothing swap from their point of view.
struct ChunkSlot {
    chunk: RwLock<Arc<Chunk>>,
    /// Serializes every writer of this slot: compression, appends and column
    /// back-fills. Readers never take it.
    writer: Mutex<()>,
}

impl ChunkSlot {
    fn new(chunk: Chunk) -> Self {
        Self {
            chunk: RwLock::new(Arc::new(chunk)),
            writer: Mutex::new(()),
        }
    }

    fn snapshot(&self) -> Arc<Chunk> {
        self.chunk.read().clone()
    }
}

#[derive(Debug)]
struct TableState {
    columns: Vec<ColumnDefinition>,
    chunks: Vec<Arc<ChunkSlot>>,
}

#[derive(Debug)]
/// An ordered set of [Chunk]s sharing a common set of columns.
///
/// All chunks except the last one are always full. A table is shared behind an
/// [Arc]; reads, appends and compression all take `&self`.
///
/// ### Concurrency
///
/// - Scans read chunk snapshots and never block on compression.
/// - Compression of a chunk only locks that chunk's slot, different chunks can be
///   compressed in parallel.
/// - Appends and column additions lock the table state and the affected slots.
pub struct Table {
    kind: TableKind,
    max_chunk_size: ChunkOffset,
    state: RwLock<TableState>,
}

impl Default for Table {
    fn default() -> Self {
        Self::new(TableOptions::default())
    }
}

impl Table {
    /// Creates a new base table with a single empty chunk.
    pub fn new(options: TableOptions) -> Self {
        let max_chunk_size = if options.max_chunk_size == 0 {
            warn!("A max chunk size of 0 is not allowed, using 1");
            1
        } else {
            options.max_chunk_size
        };

        Self {
            kind: TableKind::Base,
            max_chunk_size,
            state: RwLock::new(TableState {
                columns: Vec::new(),
                chunks: vec![Arc::new(ChunkSlot::new(Chunk::new()))],
            }),
        }
    }

    /// Creates a new base table with the given chunk capacity.
    pub fn with_max_chunk_size(max_chunk_size: ChunkOffset) -> Self {
        Self::new(TableOptions::builder().max_chunk_size(max_chunk_size).build())
    }

    /// Creates an immutable table from a single chunk of reference segments.
    pub fn new_reference(
        columns: Vec<ColumnDefinition>,
        chunk: Chunk,
    ) -> Result<Self, StorageError> {
        if chunk.column_count() != columns.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: columns.len(),
                actual: chunk.column_count(),
            });
        }

        for (definition, segment) in zip(&columns, chunk.segments()) {
            if segment.kind() != SegmentKind::Reference {
                return Err(StorageError::UnexpectedSegmentKind {
                    expected: SegmentKind::Reference,
                    actual: segment.kind(),
                });
            }
            if segment.data_type() != definition.data_type {
                return Err(StorageError::TypeMismatch {
                    expected: definition.data_type,
                    actual: segment.data_type(),
                });
            }
        }

        Ok(Self {
            kind: TableKind::Reference,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            state: RwLock::new(TableState {
                columns,
                chunks: vec![Arc::new(ChunkSlot::new(chunk))],
            }),
        })
    }

    /// Returns `true` if the table is the immutable result of a scan.
    pub fn is_reference_table(&self) -> bool {
        self.kind == TableKind::Reference
    }

    fn ensure_mutable(&self) -> Result<(), StorageError> {
        match self.kind {
            TableKind::Base => Ok(()),
            TableKind::Reference => {
                Err(StorageError::ImmutableSegmentMutation(SegmentKind::Reference))
            },
        }
    }

    /// Adds a column to the table.
    ///
    /// Existing chunks are extended with a value segment holding the type's
    /// default value for every row that already exists.
    pub fn add_column(
        &self,
        name: impl Into<String>,
        data_type: DataType,
    ) -> Result<ColumnId, StorageError> {
        self.ensure_mutable()?;

        let name = name.into();
        let mut state = self.state.write();

        if state.columns.iter().any(|column| column.name == name) {
            return Err(StorageError::DuplicateColumn(name));
        }

        let column_id = ColumnId::try_from(state.columns.len()).map_err(|_| {
            StorageError::out_of_range("column", state.columns.len(), ColumnId::MAX as usize)
        })?;

        for slot in state.chunks.iter() {
            let _writer = slot.writer.lock();
            let mut chunk = slot.chunk.write();
            let segment = AnyValueSegment::filled(data_type, chunk.size());
            Arc::make_mut(&mut *chunk).add_segment(Segment::Value(segment))?;
        }

        debug!(column_id, name = %name, data_type = %data_type, "Added column");
        state.columns.push(ColumnDefinition { name, data_type });

        Ok(column_id)
    }

    /// Appends a row to the last chunk, starting a new chunk if the last one is full.
    ///
    /// The row is type checked against the column definitions before anything is
    /// written.
    pub fn append(&self, values: Vec<Value>) -> Result<(), StorageError> {
        self.ensure_mutable()?;

        let mut state = self.state.write();

        if values.len() != state.columns.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: state.columns.len(),
                actual: values.len(),
            });
        }

        for (column, value) in zip(&state.columns, &values) {
            if column.data_type != value.data_type() {
                return Err(StorageError::TypeMismatch {
                    expected: column.data_type,
                    actual: value.data_type(),
                });
            }
        }

        let max_chunk_size = self.max_chunk_size as usize;
        let reusable = state
            .chunks
            .last()
            .filter(|slot| slot.chunk.read().size() < max_chunk_size)
            .cloned();
        let slot = match reusable {
            Some(slot) => slot,
            None => {
                let slot = Arc::new(ChunkSlot::new(Self::empty_chunk(&state.columns)?));
                state.chunks.push(slot.clone());
                trace!(chunk_id = state.chunks.len() - 1, "Allocated new chunk");
                slot
            },
        };

        let _writer = slot.writer.lock();
        let mut chunk = slot.chunk.write();
        Arc::make_mut(&mut *chunk).append(values)
    }

    /// Appends a pre-built chunk to the table.
    ///
    /// The chunk must match the column definitions and the current last chunk must
    /// be full. If the table holds no rows yet, the initial empty chunk is replaced.
    pub fn emplace_chunk(&self, chunk: Chunk) -> Result<(), StorageError> {
        self.ensure_mutable()?;

        let mut state = self.state.write();

        if chunk.column_count() != state.columns.len() {
            return Err(StorageError::ColumnCountMismatch {
                expected: state.columns.len(),
                actual: chunk.column_count(),
            });
        }

        for (column, segment) in zip(&state.columns, chunk.segments()) {
            if segment.kind() == SegmentKind::Reference {
                return Err(StorageError::UnexpectedSegmentKind {
                    expected: SegmentKind::Value,
                    actual: SegmentKind::Reference,
                });
            }
            if segment.data_type() != column.data_type {
                return Err(StorageError::TypeMismatch {
                    expected: column.data_type,
                    actual: segment.data_type(),
                });
            }
        }

        let max_chunk_size = self.max_chunk_size as usize;
        if chunk.size() > max_chunk_size {
            return Err(StorageError::ChunkSizeMismatch {
                expected: max_chunk_size,
                actual: chunk.size(),
            });
        }

        let is_empty_table =
            state.chunks.len() == 1 && state.chunks[0].snapshot().is_empty();
        if is_empty_table {
            state.chunks.clear();
        } else if let Some(last) = state.chunks.last() {
            let last_size = last.snapshot().size();
            if last_size != max_chunk_size {
                return Err(StorageError::ChunkSizeMismatch {
                    expected: max_chunk_size,
                    actual: last_size,
                });
            }
        }

        trace!(chunk_id = state.chunks.len(), rows = chunk.size(), "Emplacing chunk");
        state.chunks.push(Arc::new(ChunkSlot::new(chunk)));

        Ok(())
    }

    fn empty_chunk(columns: &[ColumnDefinition]) -> Result<Chunk, StorageError> {
        let segments = columns
            .iter()
            .map(|column| Segment::new_value(column.data_type))
            .collect();
        Chunk::from_segments(segments)
    }

    #[instrument(skip(self))]
    /// Replaces the value segments of a chunk with dictionary encoded segments.
    ///
    /// Compressing the same chunk concurrently is serialized, other chunks are not
    /// affected. Readers observe either the old or the new chunk, never a mix.
    ///
    /// Returns `false` if the chunk was already fully encoded.
    ///
    /// Compressing a partial last chunk makes the table read-only for good: appends
    /// fail with [StorageError::ImmutableSegmentMutation] and [Self::emplace_chunk]
    /// requires a full last chunk.
    pub fn compress_chunk(&self, chunk_id: ChunkId) -> Result<bool, StorageError> {
        if self.is_reference_table() {
            return Err(StorageError::UnsupportedEncoding(SegmentKind::Reference));
        }

        let slot = self.slot(chunk_id)?;
        let _writer = slot.writer.lock();

        let current = slot.snapshot();
        if current.is_encoded_as(SegmentKind::Dictionary) {
            trace!("Chunk is already compressed");
            return Ok(false);
        }

        let compressed = current.encode_dictionary()?;
        debug!(
            rows = compressed.size(),
            bytes_before = current.estimated_memory_usage(),
            bytes_after = compressed.estimated_memory_usage(),
            "Compressed chunk",
        );

        *slot.chunk.write() = Arc::new(compressed);

        Ok(true)
    }

    fn slot(&self, chunk_id: ChunkId) -> Result<Arc<ChunkSlot>, StorageError> {
        let state = self.state.read();
        state.chunks.get(chunk_id as usize).cloned().ok_or_else(|| {
            StorageError::out_of_range("chunk", chunk_id as usize, state.chunks.len())
        })
    }

    /// Returns a snapshot of the chunk with the given ID.
    pub fn get_chunk(&self, chunk_id: ChunkId) -> Result<Arc<Chunk>, StorageError> {
        self.slot(chunk_id).map(|slot| slot.snapshot())
    }

    /// Returns a snapshot of every chunk in order.
    pub fn chunks(&self) -> Vec<Arc<Chunk>> {
        let state = self.state.read();
        state.chunks.iter().map(|slot| slot.snapshot()).collect()
    }

    /// Returns the column definitions together with a snapshot of every chunk.
    ///
    /// Both are read under the same lock, every chunk holds a segment for every
    /// returned column.
    pub fn snapshot(&self) -> (Vec<ColumnDefinition>, Vec<Arc<Chunk>>) {
        let state = self.state.read();
        let chunks = state.chunks.iter().map(|slot| slot.snapshot()).collect();
        (state.columns.clone(), chunks)
    }

    /// Reads a single cell.
    pub fn value(&self, column_id: ColumnId, row_id: RowId) -> Result<Value, StorageError> {
        let chunk = self.get_chunk(row_id.chunk_id)?;
        chunk.segment(column_id)?.value(row_id.chunk_offset as usize)
    }

    pub fn chunk_count(&self) -> ChunkId {
        self.state.read().chunks.len() as ChunkId
    }

    /// Returns the number of rows across all chunks.
    pub fn row_count(&self) -> u64 {
        let state = self.state.read();
        state
            .chunks
            .iter()
            .map(|slot| slot.snapshot().size() as u64)
            .sum()
    }

    pub fn column_count(&self) -> usize {
        self.state.read().columns.len()
    }

    pub fn max_chunk_size(&self) -> ChunkOffset {
        self.max_chunk_size
    }

    pub fn columns(&self) -> Vec<ColumnDefinition> {
        self.state.read().columns.clone()
    }

    pub fn column_names(&self) -> Vec<String> {
        let state = self.state.read();
        state.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn column(&self, column_id: ColumnId) -> Result<ColumnDefinition, StorageError> {
        let state = self.state.read();
        state.columns.get(column_id as usize).cloned().ok_or_else(|| {
            StorageError::out_of_range("column", column_id as usize, state.columns.len())
        })
    }

    pub fn column_name(&self, column_id: ColumnId) -> Result<String, StorageError> {
        self.column(column_id).map(|column| column.name)
    }

    pub fn column_type(&self, column_id: ColumnId) -> Result<DataType, StorageError> {
        self.column(column_id).map(|column| column.data_type)
    }

    /// Looks up a column by name.
    ///
    /// Returns [StorageError::UnknownColumn] if no column has that name.
    pub fn column_id_by_name(&self, name: &str) -> Result<ColumnId, StorageError> {
        let state = self.state.read();
        state
            .columns
            .iter()
            .position(|column| column.name == name)
            .map(|position| position as ColumnId)
            .ok_or_else(|| StorageError::UnknownColumn(name.to_string()))
    }

    pub fn estimated_memory_usage(&self) -> usize {
        self.chunks().iter().map(|c| c.estimated_memory_usage()).sum()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn table_with_rows(max_chunk_size: ChunkOffset, rows: i32) -> Table {
        let table = Table::with_max_chunk_size(max_chunk_size);
        table.add_column("id", DataType::Int).unwrap();
        table.add_column("name", DataType::String).unwrap();
        for i in 0..rows {
            table.append(vec![Value::Int(i), Value::String(format!("n{}", i % 3))]).unwrap();
        }
        table
    }

    #[test]
    fn test_new_table_has_one_empty_chunk() {
        let table = Table::default();
        assert_eq!(table.chunk_count(), 1);
        assert_eq!(table.row_count(), 0);
        assert_eq!(table.column_count(), 0);
        assert_eq!(table.max_chunk_size(), DEFAULT_MAX_CHUNK_SIZE);
        assert!(!table.is_reference_table());
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let table = Table::with_max_chunk_size(0);
        assert_eq!(table.max_chunk_size(), 1);
    }

    #[test]
    fn test_append_starts_new_chunk_at_capacity() {
        let table = table_with_rows(2, 4);
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.row_count(), 4);

        table.append(vec![Value::Int(4), Value::from("n1")]).unwrap();
        assert_eq!(table.chunk_count(), 3);
        assert_eq!(table.get_chunk(2).unwrap().size(), 1);
        assert_eq!(table.value(0, RowId::new(2, 0)), Ok(Value::Int(4)));
        assert_eq!(table.row_count(), 5);
    }

    #[test]
    fn test_append_validates_row() {
        let table = table_with_rows(2, 1);
        assert_eq!(
            table.append(vec![Value::Int(1)]),
            Err(StorageError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(
            table.append(vec![Value::Long(1), Value::from("x")]),
            Err(StorageError::TypeMismatch {
                expected: DataType::Int,
                actual: DataType::Long
            })
        );
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_column_lookup() {
        let table = table_with_rows(10, 0);
        assert_eq!(table.column_id_by_name("name"), Ok(1));
        assert_eq!(table.column_names(), vec!["id".to_string(), "name".to_string()]);
        assert_eq!(table.column_name(0), Ok("id".to_string()));
        assert_eq!(table.column_type(1), Ok(DataType::String));

        let err = table.column_id_by_name("missing").unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            table.column_type(2),
            Err(StorageError::IndexOutOfRange { what: "column", .. })
        ));
    }

    #[test]
    fn test_add_column_backfills_existing_chunks() {
        let table = table_with_rows(2, 3);
        let column_id = table.add_column("score", DataType::Double).unwrap();
        assert_eq!(column_id, 2);

        for chunk in table.chunks() {
            assert_eq!(chunk.column_count(), 3);
            assert_eq!(chunk.segment(2).unwrap().len(), chunk.size());
        }
        assert_eq!(table.value(2, RowId::new(1, 0)), Ok(Value::Double(0.0)));

        table
            .append(vec![Value::Int(3), Value::from("n0"), Value::Double(1.5)])
            .unwrap();
        assert_eq!(table.value(2, RowId::new(1, 1)), Ok(Value::Double(1.5)));
    }

    #[test]
    fn test_add_duplicate_column() {
        let table = table_with_rows(2, 0);
        assert_eq!(
            table.add_column("id", DataType::Long),
            Err(StorageError::DuplicateColumn("id".to_string()))
        );
    }

    #[test]
    fn test_compress_chunk_keeps_values() {
        let table = table_with_rows(3, 7);
        let before: Vec<_> = (0..7)
            .map(|i| table.value(1, RowId::new(i / 3, i % 3)).unwrap())
            .collect();

        assert_eq!(table.compress_chunk(1), Ok(true));
        assert_eq!(table.compress_chunk(1), Ok(false));

        let chunk = table.get_chunk(1).unwrap();
        assert!(chunk.is_encoded_as(SegmentKind::Dictionary));
        assert!(table.get_chunk(0).unwrap().is_encoded_as(SegmentKind::Value));

        let after: Vec<_> = (0..7)
            .map(|i| table.value(1, RowId::new(i / 3, i % 3)).unwrap())
            .collect();
        assert_eq!(before, after);
        assert!(matches!(
            table.compress_chunk(3),
            Err(StorageError::IndexOutOfRange { what: "chunk", .. })
        ));
    }

    #[test]
    fn test_append_to_compressed_partial_chunk_fails() {
        let table = table_with_rows(3, 4);
        table.compress_chunk(1).unwrap();

        let err = table.append(vec![Value::Int(9), Value::from("n9")]).unwrap_err();
        assert_eq!(
            err,
            StorageError::ImmutableSegmentMutation(SegmentKind::Dictionary)
        );
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.chunk_count(), 2);

        let full = table.get_chunk(0).unwrap().as_ref().clone();
        assert_eq!(
            table.emplace_chunk(full),
            Err(StorageError::ChunkSizeMismatch {
                expected: 3,
                actual: 1
            })
        );
        assert_eq!(table.chunk_count(), 2);
    }

    #[test]
    fn test_snapshot_columns_match_chunks() {
        let table = table_with_rows(2, 5);
        let (columns, chunks) = table.snapshot();
        assert_eq!(columns.len(), 2);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.column_count() == columns.len()));
    }

    #[test]
    fn test_append_after_compressed_full_chunk() {
        let table = table_with_rows(2, 2);
        table.compress_chunk(0).unwrap();
        table.append(vec![Value::Int(2), Value::from("n2")]).unwrap();
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.value(0, RowId::new(1, 0)), Ok(Value::Int(2)));
    }

    #[test]
    fn test_snapshot_survives_compression() {
        let table = table_with_rows(4, 4);
        let snapshot = table.get_chunk(0).unwrap();
        table.compress_chunk(0).unwrap();
        assert!(snapshot.is_encoded_as(SegmentKind::Value));
        assert_eq!(snapshot.size(), 4);
    }

    #[test]
    fn test_emplace_chunk() {
        let table = table_with_rows(2, 0);
        let source = table_with_rows(2, 2);
        let chunk = source.get_chunk(0).unwrap().encode_dictionary().unwrap();

        table.emplace_chunk(chunk.clone()).unwrap();
        assert_eq!(table.chunk_count(), 1);
        assert_eq!(table.row_count(), 2);

        table.emplace_chunk(chunk).unwrap();
        assert_eq!(table.chunk_count(), 2);
        assert_eq!(table.value(1, RowId::new(1, 1)), Ok(Value::from("n1")));

        table.append(vec![Value::Int(7), Value::from("n7")]).unwrap();
        let partial = table_with_rows(2, 1).get_chunk(0).unwrap();
        let err = table.emplace_chunk(Chunk::clone(&partial)).unwrap_err();
        assert_eq!(
            err,
            StorageError::ChunkSizeMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_emplace_chunk_rejects_wrong_schema() {
        let table = table_with_rows(2, 0);
        let other = Table::with_max_chunk_size(2);
        other.add_column("id", DataType::Long).unwrap();
        other.add_column("name", DataType::String).unwrap();
        other.append(vec![Value::Long(1), Value::from("x")]).unwrap();

        let err = table
            .emplace_chunk(Chunk::clone(&other.get_chunk(0).unwrap()))
            .unwrap_err();
        assert!(matches!(err, StorageError::TypeMismatch { .. }));
    }

    #[test]
    fn test_concurrent_compress_and_read() {
        let table = table_with_rows(16, 16 * 8);
        let expected: Vec<_> = table.chunks().iter().map(|c| c.size()).collect();

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for chunk_id in 0..table.chunk_count() {
                        table.compress_chunk(chunk_id).unwrap();
                    }
                });
            }
            scope.spawn(|| {
                for _ in 0..50 {
                    for (chunk, size) in table.chunks().iter().zip(&expected) {
                        assert_eq!(chunk.size(), *size);
                        let kind = chunk.segments()[0].kind();
                        assert!(chunk.is_encoded_as(kind), "chunk was partially swapped");
                    }
                }
            });
        });

        for chunk in table.chunks() {
            assert!(chunk.is_encoded_as(SegmentKind::Dictionary));
        }
        assert_eq!(table.value(0, RowId::new(7, 15)), Ok(Value::Int(127)));
    }
}

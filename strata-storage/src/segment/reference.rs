use std::fmt::{Debug, Formatter};
use std::mem;
use std::sync::Arc;

use crate::error::StorageError;
use crate::table::Table;
use crate::types::{ColumnId, DataType, PosList, RowId, Value};

#[derive(Clone)]
/// A zero-copy view over a column of another table.
///
/// Row `i` of the segment is the row `pos_list[i]` of the referenced column.
/// The referenced table is kept alive for as long as any segment points at it.
pub struct ReferenceSegment {
    table: Arc<Table>,
    column_id: ColumnId,
    data_type: DataType,
    pos_list: Arc<PosList>,
}

impl Debug for ReferenceSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ReferenceSegment(column_id={}, data_type={}, rows={})",
            self.column_id,
            self.data_type,
            self.pos_list.len()
        )
    }
}

impl ReferenceSegment {
    /// Creates a new view over `column_id` of the given table.
    ///
    /// Returns an error if the column does not exist.
    pub fn new(
        table: Arc<Table>,
        column_id: ColumnId,
        pos_list: Arc<PosList>,
    ) -> Result<Self, StorageError> {
        let data_type = table.column_type(column_id)?;
        Ok(Self {
            table,
            column_id,
            data_type,
            pos_list,
        })
    }

    /// Resolves the row through the position list and reads the referenced cell.
    pub fn value(&self, offset: usize) -> Result<Value, StorageError> {
        let row_id = self.row_id(offset)?;
        self.table.value(self.column_id, row_id)
    }

    /// Returns the referenced row for the given offset.
    pub fn row_id(&self, offset: usize) -> Result<RowId, StorageError> {
        self.pos_list
            .get(offset)
            .copied()
            .ok_or_else(|| StorageError::out_of_range("row", offset, self.pos_list.len()))
    }

    pub fn referenced_table(&self) -> &Arc<Table> {
        &self.table
    }

    pub fn referenced_column_id(&self) -> ColumnId {
        self.column_id
    }

    pub fn pos_list(&self) -> &Arc<PosList> {
        &self.pos_list
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn len(&self) -> usize {
        self.pos_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pos_list.is_empty()
    }

    pub fn estimated_memory_usage(&self) -> usize {
        self.pos_list.len() * mem::size_of::<RowId>()
    }
}

use std::mem;

use crate::error::StorageError;
use crate::types::{ColumnType, DataType, Value};
use crate::with_data_type;

#[derive(Debug, Clone, PartialEq)]
/// Uncompressed, append-only storage of the values of one column.
pub struct ValueSegment<T> {
    values: Vec<T>,
}

impl<T: ColumnType> Default for ValueSegment<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ColumnType> From<Vec<T>> for ValueSegment<T> {
    fn from(values: Vec<T>) -> Self {
        Self { values }
    }
}

impl<T: ColumnType> ValueSegment<T> {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.values.push(value);
    }

    /// Appends a [Value], rejecting values of any other type.
    pub fn append(&mut self, value: Value) -> Result<(), StorageError> {
        let value = T::from_owned_value(value).map_err(|other| StorageError::TypeMismatch {
            expected: T::DATA_TYPE,
            actual: other.data_type(),
        })?;
        self.values.push(value);
        Ok(())
    }

    #[inline]
    /// Returns the values in row order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn get(&self, offset: usize) -> Option<&T> {
        self.values.get(offset)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn estimated_memory_usage(&self) -> usize {
        let heap: usize = self.values.iter().map(ColumnType::heap_size).sum();
        self.values.capacity() * mem::size_of::<T>() + heap
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A [ValueSegment] of any supported [DataType].
pub enum AnyValueSegment {
    Int(ValueSegment<i32>),
    Long(ValueSegment<i64>),
    Float(ValueSegment<f32>),
    Double(ValueSegment<f64>),
    String(ValueSegment<String>),
}

impl AnyValueSegment {
    /// Creates an empty segment of the given type.
    pub fn new(data_type: DataType) -> Self {
        with_data_type!(data_type, |T| T::wrap_value_segment(ValueSegment::<T>::new()))
    }

    /// Creates a segment holding `len` copies of the type's default value.
    pub fn filled(data_type: DataType, len: usize) -> Self {
        with_data_type!(data_type, |T| {
            T::wrap_value_segment(ValueSegment::from(vec![T::default(); len]))
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int(_) => DataType::Int,
            Self::Long(_) => DataType::Long,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::String(_) => DataType::String,
        }
    }

    pub fn append(&mut self, value: Value) -> Result<(), StorageError> {
        dispatch_typed!(self, |s| s.append(value))
    }

    pub fn value(&self, offset: usize) -> Option<Value> {
        dispatch_typed!(self, |s| s.get(offset).cloned().map(ColumnType::into_value))
    }

    pub fn len(&self) -> usize {
        dispatch_typed!(self, |s| s.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn estimated_memory_usage(&self) -> usize {
        dispatch_typed!(self, |s| s.estimated_memory_usage())
    }
}

use std::cmp::Ordering;
use std::mem;
use std::sync::Arc;

use super::value::{AnyValueSegment, ValueSegment};
use crate::attribute_vector::AttributeVector;
use crate::error::StorageError;
use crate::types::{ColumnType, DataType, Value, ValueId, INVALID_VALUE_ID};

#[derive(Debug, Clone)]
/// Dictionary encoded storage of the values of one column.
///
/// The dictionary holds every distinct value once in ascending order, each row
/// stores the [ValueId] of its value in a fitted [AttributeVector].
///
/// Both parts are immutable once built and cheaply shared between clones.
pub struct DictionarySegment<T> {
    dictionary: Arc<[T]>,
    attribute_vector: Arc<AttributeVector>,
}

impl<T: ColumnType> DictionarySegment<T> {
    /// Encodes the values of a [ValueSegment].
    ///
    /// Reading any row of the result returns the same value as the source.
    pub fn encode(segment: &ValueSegment<T>) -> Self {
        let values = segment.values();

        let mut dictionary = values.to_vec();
        dictionary.sort_unstable_by(T::compare);
        dictionary.dedup_by(|a, b| a.compare(b) == Ordering::Equal);

        let ids = values.iter().map(|value| {
            match dictionary.binary_search_by(|entry| entry.compare(value)) {
                Ok(position) | Err(position) => ValueId(position as u64),
            }
        });
        let attribute_vector = AttributeVector::fitted(dictionary.len(), ids);

        Self {
            dictionary: dictionary.into(),
            attribute_vector: Arc::new(attribute_vector),
        }
    }

    #[inline]
    /// Returns the value at the given row.
    pub fn get(&self, offset: usize) -> Option<&T> {
        let value_id = self.attribute_vector.get(offset)?;
        self.dictionary.get(value_id.as_usize())
    }

    /// The sorted, distinct values of the segment.
    pub fn dictionary(&self) -> &[T] {
        &self.dictionary
    }

    pub fn attribute_vector(&self) -> &AttributeVector {
        &self.attribute_vector
    }

    /// Returns the value represented by a given [ValueId].
    pub fn value_by_value_id(&self, value_id: ValueId) -> Option<&T> {
        if !value_id.is_valid() {
            return None;
        }
        self.dictionary.get(value_id.as_usize())
    }

    /// Returns the first value ID that refers to a value `>=` the search value.
    ///
    /// Returns [INVALID_VALUE_ID] if all values are smaller than the search value.
    pub fn lower_bound(&self, value: &T) -> ValueId {
        let position = self
            .dictionary
            .partition_point(|entry| entry.compare(value) == Ordering::Less);
        self.position_to_value_id(position)
    }

    /// Returns the first value ID that refers to a value `>` the search value.
    ///
    /// Returns [INVALID_VALUE_ID] if all values are smaller than or equal to the
    /// search value.
    pub fn upper_bound(&self, value: &T) -> ValueId {
        let position = self
            .dictionary
            .partition_point(|entry| entry.compare(value) != Ordering::Greater);
        self.position_to_value_id(position)
    }

    /// Same as [Self::lower_bound] but accepts a [Value].
    pub fn lower_bound_value(&self, value: &Value) -> Result<ValueId, StorageError> {
        Ok(self.lower_bound(typed_literal::<T>(value)?))
    }

    /// Same as [Self::upper_bound] but accepts a [Value].
    pub fn upper_bound_value(&self, value: &Value) -> Result<ValueId, StorageError> {
        Ok(self.upper_bound(typed_literal::<T>(value)?))
    }

    /// Returns the number of distinct values.
    pub fn unique_values_count(&self) -> usize {
        self.dictionary.len()
    }

    /// Returns the number of rows.
    pub fn len(&self) -> usize {
        self.attribute_vector.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_vector.is_empty()
    }

    pub fn estimated_memory_usage(&self) -> usize {
        let heap: usize = self.dictionary.iter().map(ColumnType::heap_size).sum();
        self.dictionary.len() * mem::size_of::<T>()
            + heap
            + self.attribute_vector.estimated_memory_usage()
    }

    fn position_to_value_id(&self, position: usize) -> ValueId {
        if position >= self.dictionary.len() {
            INVALID_VALUE_ID
        } else {
            ValueId(position as u64)
        }
    }
}

fn typed_literal<T: ColumnType>(value: &Value) -> Result<&T, StorageError> {
    T::from_value(value).ok_or(StorageError::TypeMismatch {
        expected: T::DATA_TYPE,
        actual: value.data_type(),
    })
}

#[derive(Debug, Clone)]
/// A [DictionarySegment] of any supported [DataType].
pub enum AnyDictionarySegment {
    Int(DictionarySegment<i32>),
    Long(DictionarySegment<i64>),
    Float(DictionarySegment<f32>),
    Double(DictionarySegment<f64>),
    String(DictionarySegment<String>),
}

impl AnyDictionarySegment {
    /// Encodes a value segment, keeping its type.
    pub fn encode(segment: &AnyValueSegment) -> Self {
        match segment {
            AnyValueSegment::Int(s) => Self::Int(DictionarySegment::encode(s)),
            AnyValueSegment::Long(s) => Self::Long(DictionarySegment::encode(s)),
            AnyValueSegment::Float(s) => Self::Float(DictionarySegment::encode(s)),
            AnyValueSegment::Double(s) => Self::Double(DictionarySegment::encode(s)),
            AnyValueSegment::String(s) => Self::String(DictionarySegment::encode(s)),
        }
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

    pub fn value(&self, offset: usize) -> Option<Value> {
        dispatch_typed!(self, |s| s.get(offset).cloned().map(ColumnType::into_value))
    }

    pub fn unique_values_count(&self) -> usize {
        dispatch_typed!(self, |s| s.unique_values_count())
    }

    pub fn attribute_vector(&self) -> &AttributeVector {
        dispatch_typed!(self, |s| s.attribute_vector())
    }

    pub fn lower_bound(&self, value: &Value) -> Result<ValueId, StorageError> {
        dispatch_typed!(self, |s| s.lower_bound_value(value))
    }

    pub fn upper_bound(&self, value: &Value) -> Result<ValueId, StorageError> {
        dispatch_typed!(self, |s| s.upper_bound_value(value))
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

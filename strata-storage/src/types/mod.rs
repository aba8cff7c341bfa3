//! Column data types and the [Value] used at the boundary of the storage engine.
//!
//! Segments are generic over a native Rust type implementing [ColumnType], the
//! closed set of types is mapped back to a generic instantiation once via
//! [with_data_type!](crate::with_data_type).

mod ids;

use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

pub use self::ids::{ChunkId, ChunkOffset, ColumnId, PosList, RowId, ValueId, INVALID_VALUE_ID};
use crate::segment::{AnyDictionarySegment, AnyValueSegment, DictionarySegment, ValueSegment};

#[repr(u32)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
/// The declared data type of a column.
pub enum DataType {
    Int = 1,
    Long = 2,
    Float = 3,
    Double = 4,
    String = 5,
}

impl DataType {
    /// Every supported data type.
    pub const ALL: [DataType; 5] = [
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Double,
        DataType::String,
    ];

    /// The name of the type as used in column definitions.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::String => "string",
        }
    }

    /// The value used to back-fill existing rows when a column is added
    /// to a table that already holds data.
    pub fn default_value(&self) -> Value {
        crate::with_data_type!(*self, |T| T::default().into_value())
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown data type: {0:?}")]
pub struct UnknownDataType(pub String);

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataType::ALL
            .into_iter()
            .find(|data_type| data_type.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDataType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A single typed cell value.
pub enum Value {
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    /// Returns the [DataType] of the value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::Int,
            Value::Long(_) => DataType::Long,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::String(_) => DataType::String,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A native Rust type that can be stored in a column.
///
/// This trait is sealed, the set of column types is closed and matches [DataType].
pub trait ColumnType:
    Clone + Debug + Default + PartialEq + Send + Sync + 'static + sealed::Sealed
{
    /// The [DataType] this Rust type is stored as.
    const DATA_TYPE: DataType;

    /// A total ordering over the values of the type.
    ///
    /// Floats are ordered with `total_cmp` so that dictionaries can be sorted and
    /// searched, every scan path compares with this same ordering.
    fn compare(&self, other: &Self) -> Ordering;

    /// Borrows the native value out of a [Value] of the matching variant.
    fn from_value(value: &Value) -> Option<&Self>;

    /// Takes the native value out of a [Value], returning it untouched on a mismatch.
    fn from_owned_value(value: Value) -> Result<Self, Value>;

    fn into_value(self) -> Value;

    /// Bytes owned on the heap by this value, not counting `size_of::<Self>()`.
    fn heap_size(&self) -> usize;

    fn value_segment(segment: &AnyValueSegment) -> Option<&ValueSegment<Self>>;

    fn dictionary_segment(segment: &AnyDictionarySegment) -> Option<&DictionarySegment<Self>>;

    fn wrap_value_segment(segment: ValueSegment<Self>) -> AnyValueSegment;

    fn wrap_dictionary_segment(segment: DictionarySegment<Self>) -> AnyDictionarySegment;
}

macro_rules! impl_column_type {
    ($t:ty, $variant:ident, compare = |$a:ident, $b:ident| $cmp:expr, heap = |$h:ident| $heap:expr) => {
        impl sealed::Sealed for $t {}

        impl ColumnType for $t {
            const DATA_TYPE: DataType = DataType::$variant;

            #[inline]
            fn compare(&self, other: &Self) -> Ordering {
                let ($a, $b) = (self, other);
                $cmp
            }

            #[inline]
            fn from_value(value: &Value) -> Option<&Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_owned_value(value: Value) -> Result<Self, Value> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn heap_size(&self) -> usize {
                let $h = self;
                $heap
            }

            fn value_segment(segment: &AnyValueSegment) -> Option<&ValueSegment<Self>> {
                match segment {
                    AnyValueSegment::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn dictionary_segment(
                segment: &AnyDictionarySegment,
            ) -> Option<&DictionarySegment<Self>> {
                match segment {
                    AnyDictionarySegment::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn wrap_value_segment(segment: ValueSegment<Self>) -> AnyValueSegment {
                AnyValueSegment::$variant(segment)
            }

            fn wrap_dictionary_segment(segment: DictionarySegment<Self>) -> AnyDictionarySegment {
                AnyDictionarySegment::$variant(segment)
            }
        }
    };
}

impl_column_type!(i32, Int, compare = |a, b| a.cmp(b), heap = |_v| 0);
impl_column_type!(i64, Long, compare = |a, b| a.cmp(b), heap = |_v| 0);
impl_column_type!(f32, Float, compare = |a, b| a.total_cmp(b), heap = |_v| 0);
impl_column_type!(f64, Double, compare = |a, b| a.total_cmp(b), heap = |_v| 0);
impl_column_type!(String, String, compare = |a, b| a.cmp(b), heap = |v| v.capacity());

#[macro_export]
/// Resolves a runtime [DataType] to its native [ColumnType] and evaluates the
/// body with the type bound to the given identifier.
///
/// ```
/// use strata_storage::{with_data_type, ColumnType, DataType};
///
/// let name = with_data_type!(DataType::Long, |T| T::DATA_TYPE.name());
/// assert_eq!(name, "long");
/// ```
macro_rules! with_data_type {
    ($data_type:expr, |$t:ident| $body:expr) => {
        match $data_type {
            $crate::DataType::Int => {
                type $t = i32;
                $body
            },
            $crate::DataType::Long => {
                type $t = i64;
                $body
            },
            $crate::DataType::Float => {
                type $t = f32;
                $body
            },
            $crate::DataType::Double => {
                type $t = f64;
                $body
            },
            $crate::DataType::String => {
                type $t = ::std::string::String;
                $body
            },
        }
    };
}

use ndarray::{Array, Array1, ArrayD, Dimension, IxDyn};
use num_traits::{NumCast, ToPrimitive};
use paste::paste;

use crate::dtype::Dtype;
use crate::errors::{Error, Result};

/// A single element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// The natural dtype this scalar materializes to.
    pub fn dtype(&self) -> Dtype {
        match self {
            Scalar::Bool(_) => Dtype::Bool,
            Scalar::Int(_) => Dtype::Int64,
            Scalar::Float(_) => Dtype::Float64,
            Scalar::Str(_) => Dtype::Str,
        }
    }

    /// Materialize as a 0-dimensional array of the natural dtype.
    pub fn into_array(self) -> ArrayData {
        let dim = IxDyn(&[]);
        match self {
            Scalar::Bool(value) => ArrayData::Bool(ArrayD::from_elem(dim, value)),
            Scalar::Int(value) => ArrayData::Int64(ArrayD::from_elem(dim, value)),
            Scalar::Float(value) => ArrayData::Float64(ArrayD::from_elem(dim, value)),
            Scalar::Str(value) => ArrayData::Str(ArrayD::from_elem(dim, value)),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            Scalar::Bool(value) => value.to_string(),
            Scalar::Int(value) => value.to_string(),
            Scalar::Float(value) => value.to_string(),
            Scalar::Str(value) => value.clone(),
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(value as i64)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::Float(value as f64)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

/// A dynamic-rank array tagged with its element type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(ArrayD<bool>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    UInt32(ArrayD<u32>),
    UInt64(ArrayD<u64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Str(ArrayD<String>),
    DateTime64(ArrayD<i64>),
}

macro_rules! with_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            ArrayData::Bool($array) => $body,
            ArrayData::Int32($array) => $body,
            ArrayData::Int64($array) => $body,
            ArrayData::UInt32($array) => $body,
            ArrayData::UInt64($array) => $body,
            ArrayData::Float32($array) => $body,
            ArrayData::Float64($array) => $body,
            ArrayData::Str($array) => $body,
            ArrayData::DateTime64($array) => $body,
        }
    };
}

macro_rules! map_array {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            ArrayData::Bool($array) => ArrayData::Bool($body),
            ArrayData::Int32($array) => ArrayData::Int32($body),
            ArrayData::Int64($array) => ArrayData::Int64($body),
            ArrayData::UInt32($array) => ArrayData::UInt32($body),
            ArrayData::UInt64($array) => ArrayData::UInt64($body),
            ArrayData::Float32($array) => ArrayData::Float32($body),
            ArrayData::Float64($array) => ArrayData::Float64($body),
            ArrayData::Str($array) => ArrayData::Str($body),
            ArrayData::DateTime64($array) => ArrayData::DateTime64($body),
        }
    };
}

impl ArrayData {
    pub fn dtype(&self) -> Dtype {
        match self {
            ArrayData::Bool(_) => Dtype::Bool,
            ArrayData::Int32(_) => Dtype::Int32,
            ArrayData::Int64(_) => Dtype::Int64,
            ArrayData::UInt32(_) => Dtype::UInt32,
            ArrayData::UInt64(_) => Dtype::UInt64,
            ArrayData::Float32(_) => Dtype::Float32,
            ArrayData::Float64(_) => Dtype::Float64,
            ArrayData::Str(_) => Dtype::Str,
            ArrayData::DateTime64(_) => Dtype::DateTime64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, array => array.shape())
    }

    pub fn ndim(&self) -> usize {
        with_array!(self, array => array.ndim())
    }

    pub fn len(&self) -> usize {
        with_array!(self, array => array.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to the given element type.
    ///
    /// Returns the value unchanged when it already has that type. Numeric
    /// conversions go through ``num_traits`` and fail when a value does not
    /// fit the target type. Text arrays convert to nothing but text.
    pub fn cast(self, to: Dtype) -> Result<ArrayData> {
        if self.dtype() == to {
            return Ok(self);
        }
        let from = self.dtype();
        match self {
            ArrayData::Str(_) => Err(Error::Cast { from, to }),
            ArrayData::Bool(array) => match to {
                Dtype::Str => Ok(ArrayData::Str(array.mapv(|v| v.to_string()))),
                _ => cast_numeric(array.mapv(|v| v as i64), from, to),
            },
            ArrayData::Int32(array) => cast_numeric(array, from, to),
            ArrayData::Int64(array) => cast_numeric(array, from, to),
            ArrayData::UInt32(array) => cast_numeric(array, from, to),
            ArrayData::UInt64(array) => cast_numeric(array, from, to),
            ArrayData::Float32(array) => cast_numeric(array, from, to),
            ArrayData::Float64(array) => cast_numeric(array, from, to),
            ArrayData::DateTime64(array) => cast_numeric(array, from, to),
        }
    }

    /// Expand a 0-dimensional array to the given shape by repeating its
    /// single element.
    pub fn broadcast_to(self, shape: &[usize]) -> ArrayData {
        if self.ndim() != 0 {
            panic!("not a 0-dimensional array");
        }
        let dim = IxDyn(shape);
        map_array!(self, array => {
            let element = array.iter().next().unwrap().clone();
            ArrayD::from_elem(dim.clone(), element)
        })
    }

    /// An array of the given shape and dtype with unspecified contents.
    pub fn empty(shape: &[usize], dtype: Dtype) -> ArrayData {
        Self::zeros(shape, dtype)
    }

    pub fn zeros(shape: &[usize], dtype: Dtype) -> ArrayData {
        let dim = IxDyn(shape);
        match dtype {
            Dtype::Bool => ArrayData::Bool(ArrayD::from_elem(dim, false)),
            Dtype::Int32 => ArrayData::Int32(ArrayD::zeros(dim)),
            Dtype::Int64 => ArrayData::Int64(ArrayD::zeros(dim)),
            Dtype::UInt32 => ArrayData::UInt32(ArrayD::zeros(dim)),
            Dtype::UInt64 => ArrayData::UInt64(ArrayD::zeros(dim)),
            Dtype::Float32 => ArrayData::Float32(ArrayD::zeros(dim)),
            Dtype::Float64 => ArrayData::Float64(ArrayD::zeros(dim)),
            Dtype::Str => ArrayData::Str(ArrayD::from_elem(dim, String::new())),
            Dtype::DateTime64 => ArrayData::DateTime64(ArrayD::zeros(dim)),
        }
    }

    pub fn ones(shape: &[usize], dtype: Dtype) -> ArrayData {
        let dim = IxDyn(shape);
        match dtype {
            Dtype::Bool => ArrayData::Bool(ArrayD::from_elem(dim, true)),
            Dtype::Int32 => ArrayData::Int32(ArrayD::ones(dim)),
            Dtype::Int64 => ArrayData::Int64(ArrayD::ones(dim)),
            Dtype::UInt32 => ArrayData::UInt32(ArrayD::ones(dim)),
            Dtype::UInt64 => ArrayData::UInt64(ArrayD::ones(dim)),
            Dtype::Float32 => ArrayData::Float32(ArrayD::ones(dim)),
            Dtype::Float64 => ArrayData::Float64(ArrayD::ones(dim)),
            Dtype::Str => ArrayData::Str(ArrayD::from_elem(dim, String::from("1"))),
            Dtype::DateTime64 => ArrayData::DateTime64(ArrayD::ones(dim)),
        }
    }

    pub fn full(shape: &[usize], fill: &Scalar, dtype: Dtype) -> Result<ArrayData> {
        Ok(fill.clone().into_array().cast(dtype)?.broadcast_to(shape))
    }

    pub fn as_datetime64(&self) -> Option<&ArrayD<i64>> {
        match self {
            ArrayData::DateTime64(array) => Some(array),
            _ => None,
        }
    }
}

fn cast_numeric<T>(array: ArrayD<T>, from: Dtype, to: Dtype) -> Result<ArrayData>
where
    T: NumCast + Copy + ToString,
{
    Ok(match to {
        Dtype::Bool => {
            ArrayData::Bool(array.mapv(|v| v.to_f64().map(|f| f != 0.0).unwrap_or(true)))
        }
        Dtype::Int32 => ArrayData::Int32(cast_values(array, from, to)?),
        Dtype::Int64 => ArrayData::Int64(cast_values(array, from, to)?),
        Dtype::UInt32 => ArrayData::UInt32(cast_values(array, from, to)?),
        Dtype::UInt64 => ArrayData::UInt64(cast_values(array, from, to)?),
        Dtype::Float32 => ArrayData::Float32(cast_values(array, from, to)?),
        Dtype::Float64 => ArrayData::Float64(cast_values(array, from, to)?),
        Dtype::Str => ArrayData::Str(array.mapv(|v| v.to_string())),
        Dtype::DateTime64 => ArrayData::DateTime64(cast_values(array, from, to)?),
    })
}

fn cast_values<A, B>(array: ArrayD<A>, from: Dtype, to: Dtype) -> Result<ArrayD<B>>
where
    A: NumCast + Copy,
    B: NumCast,
{
    let dim = array.raw_dim();
    let mut values = Vec::with_capacity(array.len());
    for v in array.iter() {
        values.push(num_traits::cast(*v).ok_or(Error::Cast { from, to })?);
    }
    Ok(ArrayD::from_shape_vec(dim, values).unwrap())
}

/// A raw value bound to a declared field, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Array(ArrayData),
    /// Bound fields of a composed class instance.
    Record(Record),
}

impl From<Scalar> for Value {
    fn from(scalar: Scalar) -> Self {
        Value::Scalar(scalar)
    }
}

impl From<ArrayData> for Value {
    fn from(array: ArrayData) -> Self {
        Value::Array(array)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Record(record)
    }
}

macro_rules! scalar_conversions {
    ($($type:ty),* $(,)?) => {
        $(
            impl From<$type> for Value {
                fn from(value: $type) -> Self {
                    Value::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_conversions!(bool, i32, i64, f32, f64, &str, String);

macro_rules! array_conversions {
    ($variant:ident, $elem:ident) => {
        paste! {
            impl<D: Dimension> From<Array<$elem, D>> for ArrayData {
                fn from(array: Array<$elem, D>) -> Self {
                    ArrayData::$variant(array.into_dyn())
                }
            }

            impl From<Vec<$elem>> for ArrayData {
                fn from(values: Vec<$elem>) -> Self {
                    ArrayData::$variant(Array1::from(values).into_dyn())
                }
            }

            impl<D: Dimension> From<Array<$elem, D>> for Value {
                fn from(array: Array<$elem, D>) -> Self {
                    Value::Array(ArrayData::from(array))
                }
            }

            impl From<Vec<$elem>> for Value {
                fn from(values: Vec<$elem>) -> Self {
                    Value::Array(ArrayData::from(values))
                }
            }

            impl ArrayData {
                /// Borrow the underlying typed array, when this is that dtype.
                pub fn [<as_ $elem:lower>](&self) -> Option<&ArrayD<$elem>> {
                    match self {
                        ArrayData::$variant(array) => Some(array),
                        _ => None,
                    }
                }
            }
        }
    };
}

array_conversions!(Bool, bool);
array_conversions!(Int32, i32);
array_conversions!(Int64, i64);
array_conversions!(UInt32, u32);
array_conversions!(UInt64, u64);
array_conversions!(Float32, f32);
array_conversions!(Float64, f64);
array_conversions!(Str, String);

impl From<Vec<&str>> for ArrayData {
    fn from(values: Vec<&str>) -> Self {
        ArrayData::from(values.into_iter().map(String::from).collect::<Vec<_>>())
    }
}

impl From<Vec<&str>> for Value {
    fn from(values: Vec<&str>) -> Self {
        Value::Array(ArrayData::from(values))
    }
}

/// Ordered ``name -> Value`` bindings of one raw data-holder instance.
///
/// Also used for attribute mappings on the final containers, where values
/// pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(Vec<(String, Value)>);

impl Record {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Bind a value, replacing any existing binding in place.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.0.iter().position(|(n, _)| n == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Fill policy for allocator entry points.
#[derive(Debug, Clone)]
pub(crate) enum Fill {
    Empty,
    Zeros,
    Ones,
    Full(Scalar),
}

impl Fill {
    pub(crate) fn materialize(&self, shape: &[usize], dtype: Dtype) -> Result<ArrayData> {
        Ok(match self {
            Fill::Empty => ArrayData::empty(shape, dtype),
            Fill::Zeros => ArrayData::zeros(shape, dtype),
            Fill::Ones => ArrayData::ones(shape, dtype),
            Fill::Full(fill) => ArrayData::full(shape, fill, dtype)?,
        })
    }
}

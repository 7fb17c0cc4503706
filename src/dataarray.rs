use std::marker::PhantomData;

use crate::build::build_dataarray;
use crate::dims::Dims;
use crate::dtype::Dtype;
use crate::errors::{Error, Result};
use crate::spec::{Declare, Spec};
use crate::values::{ArrayData, Fill, Record, Scalar, Value};

/// Ordered ``name -> array`` mapping, used for coordinates and for dataset
/// members. Insertion replaces an existing entry in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayMap(Vec<(String, DataArray)>);

impl ArrayMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, array: DataArray) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = array,
            None => self.0.push((name, array)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&DataArray> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataArray)> {
        self.0.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }
}

impl IntoIterator for ArrayMap {
    type Item = (String, DataArray);
    type IntoIter = std::vec::IntoIter<(String, DataArray)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// A multi-dimensional array with named axes, per-axis coordinates,
/// free-form attributes, and an optional name.
#[derive(Debug, Clone, PartialEq)]
pub struct DataArray {
    /// The array payload.
    pub values: ArrayData,

    /// Dimension names, one per axis of ``values``.
    pub dims: Dims,

    /// Coordinate arrays keyed by name.
    pub coords: ArrayMap,

    /// Free-form metadata, stored unchanged.
    pub attrs: Record,

    /// Optional display name.
    pub name: Option<String>,
}

impl DataArray {
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    pub fn dtype(&self) -> Dtype {
        self.values.dtype()
    }

    /// Dimension names paired with their lengths.
    pub fn sizes(&self) -> Vec<(String, usize)> {
        self.dims.sizes(self.shape())
    }

    pub fn coord(&self, name: &str) -> Option<&DataArray> {
        self.coords.get(name)
    }
}

/// Decoration for classes built into a single labeled array.
///
/// Implementing this (empty) trait installs the allocator entry points;
/// classes that skip it can still go through [`asdataarray`].
///
/// [`asdataarray`]: crate::asdataarray
pub trait AsDataArray: Declare {
    /// Start from an explicit payload value. No fill synthesis happens.
    fn new(value: impl Into<Value>) -> DataArrayBuilder<Self> {
        DataArrayBuilder::with_value(value.into())
    }

    /// Allocate the payload with unspecified contents.
    fn empty(shape: impl AsRef<[usize]>) -> DataArrayBuilder<Self> {
        DataArrayBuilder::with_fill(shape.as_ref().to_vec(), Fill::Empty)
    }

    /// Allocate the payload filled with zeros.
    fn zeros(shape: impl AsRef<[usize]>) -> DataArrayBuilder<Self> {
        DataArrayBuilder::with_fill(shape.as_ref().to_vec(), Fill::Zeros)
    }

    /// Allocate the payload filled with ones.
    fn ones(shape: impl AsRef<[usize]>) -> DataArrayBuilder<Self> {
        DataArrayBuilder::with_fill(shape.as_ref().to_vec(), Fill::Ones)
    }

    /// Allocate the payload filled with a constant.
    fn full(shape: impl AsRef<[usize]>, fill: impl Into<Scalar>) -> DataArrayBuilder<Self> {
        DataArrayBuilder::with_fill(shape.as_ref().to_vec(), Fill::Full(fill.into()))
    }
}

enum Source {
    Value(Value),
    Shaped { shape: Vec<usize>, fill: Fill },
}

/// Collects the remaining field values for one construction.
pub struct DataArrayBuilder<T: Declare> {
    source: Source,
    overrides: Record,
    class: PhantomData<T>,
}

impl<T: Declare> DataArrayBuilder<T> {
    fn with_value(value: Value) -> Self {
        Self {
            source: Source::Value(value),
            overrides: Record::new(),
            class: PhantomData,
        }
    }

    fn with_fill(shape: Vec<usize>, fill: Fill) -> Self {
        Self {
            source: Source::Shaped { shape, fill },
            overrides: Record::new(),
            class: PhantomData,
        }
    }

    /// Bind a coordinate, attribute, or name field by its declared name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(name, value);
        self
    }

    pub fn build(self) -> Result<DataArray> {
        let spec = Spec::of::<T>()?;
        let data_field = spec.primary_data()?;

        let value = match self.source {
            Source::Value(value) => value,
            Source::Shaped { shape, fill } => {
                if shape.len() != data_field.dims.len() {
                    return Err(Error::ShapeMismatch {
                        class: spec.class.clone(),
                        field: data_field.name.clone(),
                        want: data_field.dims.len(),
                        got: shape.len(),
                    });
                }
                let dtype = data_field.dtype.unwrap_or(Dtype::Float64);
                Value::Array(fill.materialize(&shape, dtype)?)
            }
        };

        let mut record = self.overrides;
        record.insert(data_field.name.clone(), value);
        build_dataarray(&spec, record, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Image;
    use ndarray::{arr1, arr2};

    #[test]
    fn test_new_with_explicit_coordinates() {
        let image = Image::new(arr2(&[[0, 1], [2, 3]]))
            .set("x", vec![0_i64, 1])
            .set("y", vec![0_i64, 1])
            .build()
            .unwrap();

        assert_eq!(image.dims, Dims::from(["x", "y"]));
        assert_eq!(image.dtype(), Dtype::Float64);
        assert_eq!(
            image.values.as_f64().unwrap(),
            &arr2(&[[0.0, 1.0], [2.0, 3.0]]).into_dyn()
        );

        let x = image.coord("x").unwrap();
        assert_eq!(x.dtype(), Dtype::Int64);
        assert_eq!(x.values.as_i64().unwrap(), &arr1(&[0_i64, 1]).into_dyn());

        let y = image.coord("y").unwrap();
        assert_eq!(y.values.as_i64().unwrap(), &arr1(&[0_i64, 1]).into_dyn());
    }

    #[test]
    fn test_ones_broadcasts_default_coordinates() {
        let image = Image::ones([3, 3]).build().unwrap();

        assert_eq!(image.shape(), &[3, 3]);
        assert!(image.values.as_f64().unwrap().iter().all(|v| *v == 1.0));

        let x = image.coord("x").unwrap();
        assert_eq!(x.values.as_i64().unwrap(), &arr1(&[0_i64, 0, 0]).into_dyn());
        let y = image.coord("y").unwrap();
        assert_eq!(y.values.as_i64().unwrap(), &arr1(&[0_i64, 0, 0]).into_dyn());
    }

    #[test]
    fn test_zeros_and_full_and_empty() {
        let zeros = Image::zeros([2, 4]).build().unwrap();
        assert_eq!(zeros.shape(), &[2, 4]);
        assert!(zeros.values.as_f64().unwrap().iter().all(|v| *v == 0.0));
        assert_eq!(zeros.coord("y").unwrap().shape(), &[4]);

        let full = Image::full([2, 2], 7.5).build().unwrap();
        assert!(full.values.as_f64().unwrap().iter().all(|v| *v == 7.5));

        let empty = Image::empty([1, 1]).build().unwrap();
        assert_eq!(empty.shape(), &[1, 1]);
        assert_eq!(empty.dtype(), Dtype::Float64);
    }

    #[test]
    fn test_shape_rank_must_match_declaration() {
        let result = Image::zeros([3]).build();
        assert!(matches!(
            result,
            Err(Error::ShapeMismatch { want: 2, got: 1, .. })
        ));
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let image = Image::zeros([2, 2]).set("x", vec![5_i64, 6]).build().unwrap();
        assert_eq!(
            image.coord("x").unwrap().values.as_i64().unwrap(),
            &arr1(&[5_i64, 6]).into_dyn()
        );
        // the untouched coordinate still gets its default
        assert_eq!(
            image.coord("y").unwrap().values.as_i64().unwrap(),
            &arr1(&[0_i64, 0]).into_dyn()
        );
    }

    #[test]
    fn test_extra_data_fields_are_ignored() {
        use crate::spec::{Declare, SpecBuilder};

        struct TwoPayloads;

        impl Declare for TwoPayloads {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("first", ["x"], "float")
                    .data("second", ["x"], "float")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for TwoPayloads {}

        // only the first declared data field is the payload; the second is
        // never resolved and its absence is not an error
        let array = TwoPayloads::new(vec![1.0, 2.0]).build().unwrap();
        assert_eq!(array.values.as_f64().unwrap(), &arr1(&[1.0, 2.0]).into_dyn());
    }
}

use std::marker::PhantomData;

use crate::build::build_dataset;
use crate::dataarray::{ArrayMap, DataArray};
use crate::dtype::Dtype;
use crate::errors::{Error, Result};
use crate::spec::{Declare, Spec};
use crate::values::{Fill, Record, Scalar, Value};

/// A mapping of named arrays sharing dimensions and coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Member arrays keyed by name.
    pub data_vars: ArrayMap,

    /// Coordinate arrays keyed by name, shared by the members.
    pub coords: ArrayMap,

    /// Free-form metadata, stored unchanged.
    pub attrs: Record,
}

impl Dataset {
    pub fn data_var(&self, name: &str) -> Option<&DataArray> {
        self.data_vars.get(name)
    }

    pub fn coord(&self, name: &str) -> Option<&DataArray> {
        self.coords.get(name)
    }

    /// Dimension names paired with their lengths, across members and
    /// coordinates.
    pub fn sizes(&self) -> Vec<(String, usize)> {
        let mut sizes: Vec<(String, usize)> = Vec::new();
        let arrays = self.data_vars.iter().chain(self.coords.iter());
        for (_, array) in arrays {
            for (dim, len) in array.dims.sizes(array.shape()) {
                if !sizes.iter().any(|(d, _)| *d == dim) {
                    sizes.push((dim, len));
                }
            }
        }
        sizes
    }
}

/// Decoration for classes built into a dataset.
///
/// Implementing this (empty) trait installs the allocator entry points;
/// classes that skip it can still go through [`asdataset`].
///
/// [`asdataset`]: crate::asdataset
pub trait AsDataset: Declare {
    /// Start from explicit member values, in declared data-field order.
    /// No fill synthesis happens.
    fn new<V, I>(values: I) -> DatasetBuilder<Self>
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        DatasetBuilder::with_values(values.into_iter().map(Into::into).collect())
    }

    /// Allocate every member with unspecified contents.
    fn empty<S, I>(sizes: I) -> DatasetBuilder<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, usize)>,
    {
        DatasetBuilder::with_fill(collect_sizes(sizes), Fill::Empty)
    }

    /// Allocate every member filled with zeros.
    fn zeros<S, I>(sizes: I) -> DatasetBuilder<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, usize)>,
    {
        DatasetBuilder::with_fill(collect_sizes(sizes), Fill::Zeros)
    }

    /// Allocate every member filled with ones.
    fn ones<S, I>(sizes: I) -> DatasetBuilder<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, usize)>,
    {
        DatasetBuilder::with_fill(collect_sizes(sizes), Fill::Ones)
    }

    /// Allocate every member filled with a constant.
    fn full<S, I>(sizes: I, fill: impl Into<Scalar>) -> DatasetBuilder<Self>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, usize)>,
    {
        DatasetBuilder::with_fill(collect_sizes(sizes), Fill::Full(fill.into()))
    }
}

fn collect_sizes<S, I>(sizes: I) -> Vec<(String, usize)>
where
    S: Into<String>,
    I: IntoIterator<Item = (S, usize)>,
{
    sizes.into_iter().map(|(dim, len)| (dim.into(), len)).collect()
}

enum Source {
    Values(Vec<Value>),
    Shaped {
        sizes: Vec<(String, usize)>,
        fill: Fill,
    },
}

/// Collects the remaining field values for one dataset construction.
pub struct DatasetBuilder<T: Declare> {
    source: Source,
    overrides: Record,
    class: PhantomData<T>,
}

impl<T: Declare> DatasetBuilder<T> {
    fn with_values(values: Vec<Value>) -> Self {
        Self {
            source: Source::Values(values),
            overrides: Record::new(),
            class: PhantomData,
        }
    }

    fn with_fill(sizes: Vec<(String, usize)>, fill: Fill) -> Self {
        Self {
            source: Source::Shaped { sizes, fill },
            overrides: Record::new(),
            class: PhantomData,
        }
    }

    /// Bind a coordinate, attribute, or member field by its declared name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.overrides.insert(name, value);
        self
    }

    pub fn build(self) -> Result<Dataset> {
        let spec = Spec::of::<T>()?;
        let mut record = self.overrides;

        match self.source {
            Source::Values(values) => {
                let fields: Vec<_> = spec.data_fields().collect();
                if values.len() != fields.len() {
                    return Err(Error::ShapeMismatch {
                        class: spec.class.clone(),
                        field: String::from("data_vars"),
                        want: fields.len(),
                        got: values.len(),
                    });
                }
                for (field, value) in fields.into_iter().zip(values) {
                    record.insert(field.name.clone(), value);
                }
            }
            Source::Shaped { sizes, fill } => {
                for field in spec.data_fields() {
                    let mut shape = Vec::with_capacity(field.dims.len());
                    for dim in field.dims.iter() {
                        let len = sizes
                            .iter()
                            .find(|(d, _)| d == dim)
                            .map(|(_, len)| *len)
                            .ok_or_else(|| Error::UnknownSize {
                                class: spec.class.clone(),
                                field: field.name.clone(),
                                dim: dim.to_string(),
                            })?;
                        shape.push(len);
                    }
                    let dtype = field.dtype.unwrap_or(Dtype::Float64);
                    record.insert(field.name.clone(), Value::Array(fill.materialize(&shape, dtype)?));
                }
            }
        }

        build_dataset(&spec, record)
    }
}

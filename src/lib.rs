//! Declarative schema layer for labeled multi-dimensional arrays.
//!
//! A class declares its fields with data, coordinate, attribute, and name
//! roles; the declaration is parsed once into a cached table, and instances
//! (or the allocator entry points) are coerced into dimension- and
//! dtype-correct labeled arrays.

mod build;
mod dataarray;
mod dataset;
mod dims;
mod dtype;
mod errors;
mod factory;
mod spec;
mod values;

#[cfg(test)]
mod testing;

pub use build::{asdataarray, asdataset};
pub use dataarray::{ArrayMap, AsDataArray, DataArray, DataArrayBuilder};
pub use dataset::{AsDataset, Dataset, DatasetBuilder};
pub use dims::Dims;
pub use dtype::{Dtype, DtypeSpec};
pub use errors::{Error, Result};
pub use factory::{DataArrayParts, DatasetParts, DefaultFactory, Factory};
pub use spec::{Declare, FieldSpec, Role, Spec, SpecBuilder};
pub use values::{ArrayData, Record, Scalar, Value};

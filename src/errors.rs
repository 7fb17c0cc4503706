use thiserror::Error;

use crate::dims::Dims;
use crate::dtype::Dtype;

#[derive(Debug, Error)]
pub enum Error {
    /// A field was declared more than once, or declared in a way that does
    /// not fit any recognized role.
    #[error("{class}.{field}: unsupported or ambiguous field declaration")]
    UnsupportedField { class: String, field: String },

    /// A class with no data field was used where a payload is required.
    #[error("{class}: no data field declared")]
    NoDataField { class: String },

    /// A composition reference points at a class without a data field, or a
    /// dataset construction produced zero members.
    #[error("{class}: no data field available")]
    MissingDataField { class: String },

    /// A value cannot be mapped onto the dimensions declared for its field.
    #[error("{class}.{field}: value of shape {shape:?} does not fit dimensions {dims}")]
    DimensionMismatch {
        class: String,
        field: String,
        shape: Vec<usize>,
        dims: Dims,
    },

    /// An allocator was given a shape of the wrong rank, or the wrong number
    /// of data values.
    #[error("{class}.{field}: expected rank {want}, got rank {got}")]
    ShapeMismatch {
        class: String,
        field: String,
        want: usize,
        got: usize,
    },

    /// A scalar needs to be expanded along a dimension whose length is not
    /// known from the data or the given sizes.
    #[error("{class}.{field}: no size given for dimension {dim:?}")]
    UnknownSize {
        class: String,
        field: String,
        dim: String,
    },

    /// A field has neither a bound value nor a declared default.
    #[error("{class}.{field}: value is missing and no default is declared")]
    MissingValue { class: String, field: String },

    /// A chain of composition references reaches back to its own start.
    #[error("{class}: cyclic composition of array classes")]
    CyclicComposition { class: String },

    /// Two members of a dataset supplied unequal coordinates under one name.
    #[error("coordinate {name:?} has conflicting definitions")]
    CoordConflict { name: String },

    /// A value cannot be converted to the declared element type.
    #[error("cannot cast {from} data to {to}")]
    Cast { from: Dtype, to: Dtype },
}

pub type Result<T> = std::result::Result<T, Error>;

use crate::dataarray::{ArrayMap, DataArray};
use crate::dataset::Dataset;
use crate::dims::Dims;
use crate::errors::{Error, Result};
use crate::values::{ArrayData, Record};

/// Resolved parts handed to the factory for one labeled array.
pub struct DataArrayParts {
    /// Class the parts were resolved from, for error context.
    pub class: String,
    pub values: ArrayData,
    pub dims: Dims,
    pub coords: ArrayMap,
    pub attrs: Record,
    pub name: Option<String>,
}

/// Resolved parts handed to the factory for one dataset.
pub struct DatasetParts {
    pub class: String,
    pub data_vars: Vec<(String, DataArray)>,
    /// Coordinates in attachment order. Duplicate names may appear when
    /// several members carry the same coordinate; they must be equal.
    pub coords: Vec<(String, DataArray)>,
    pub attrs: Record,
}

/// Assembles final containers from fully coerced parts.
///
/// The construction engine performs one call per container. A class can
/// attach its own implementation to hook or replace assembly; the default
/// enforces the shape consistency rules below.
pub trait Factory: Send + Sync {
    fn dataarray(&self, parts: DataArrayParts) -> Result<DataArray> {
        assemble_dataarray(parts)
    }

    fn dataset(&self, parts: DatasetParts) -> Result<Dataset> {
        assemble_dataset(parts)
    }
}

/// The stock factory.
pub struct DefaultFactory;

impl Factory for DefaultFactory {}

/// Build a labeled array, checking every coordinate against the payload.
///
/// Each coordinate dimension must name a payload dimension and match its
/// length.
pub(crate) fn assemble_dataarray(parts: DataArrayParts) -> Result<DataArray> {
    let DataArrayParts {
        class,
        values,
        dims,
        coords,
        attrs,
        name,
    } = parts;

    let sizes = dims.sizes(values.shape());
    for (key, coord) in coords.iter() {
        for (axis, dim) in coord.dims.iter().enumerate() {
            let fits = sizes
                .iter()
                .any(|(d, len)| d == dim && *len == coord.shape()[axis]);
            if !fits {
                return Err(Error::DimensionMismatch {
                    class,
                    field: key.to_string(),
                    shape: coord.shape().to_vec(),
                    dims: coord.dims.clone(),
                });
            }
        }
    }

    Ok(DataArray {
        values,
        dims,
        coords,
        attrs,
        name,
    })
}

/// Build a dataset, sizing dimensions from its members.
///
/// Member dimensions must agree with each other. Coordinates over known
/// dimensions must match their lengths; a coordinate over a dimension no
/// member has defines that dimension's size itself. Duplicate coordinate
/// names must carry equal coordinates.
pub(crate) fn assemble_dataset(parts: DatasetParts) -> Result<Dataset> {
    let DatasetParts {
        class,
        data_vars,
        coords: raw_coords,
        attrs,
    } = parts;

    let mut sizes: Vec<(String, usize)> = Vec::new();
    for (key, member) in &data_vars {
        for (dim, len) in member.dims.sizes(member.shape()) {
            match sizes.iter().find(|(d, _)| *d == dim) {
                Some((_, existing)) if *existing != len => {
                    return Err(Error::DimensionMismatch {
                        class,
                        field: key.clone(),
                        shape: member.shape().to_vec(),
                        dims: member.dims.clone(),
                    });
                }
                Some(_) => {}
                None => sizes.push((dim, len)),
            }
        }
    }

    let mut coords = ArrayMap::new();
    for (key, coord) in raw_coords {
        match coords.get(&key) {
            Some(existing) if *existing != coord => {
                return Err(Error::CoordConflict { name: key });
            }
            Some(_) => {}
            None => {
                for (axis, dim) in coord.dims.iter().enumerate() {
                    match sizes.iter().find(|(d, _)| d == dim) {
                        Some((_, len)) if *len != coord.shape()[axis] => {
                            return Err(Error::DimensionMismatch {
                                class,
                                field: key.clone(),
                                shape: coord.shape().to_vec(),
                                dims: coord.dims.clone(),
                            });
                        }
                        Some(_) => {}
                        None => sizes.push((dim.to_string(), coord.shape()[axis])),
                    }
                }
                coords.insert(key, coord);
            }
        }
    }

    let mut members = ArrayMap::new();
    for (key, member) in data_vars {
        members.insert(key, member);
    }

    Ok(Dataset {
        data_vars: members,
        coords,
        attrs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::spec::{Declare, SpecBuilder};
    use crate::testing::Image;
    use crate::values::Record;
    use crate::AsDataArray;
    use ndarray::arr2;
    use std::sync::Arc;

    // Marks everything it assembles, so tests can see which factory ran.
    struct TaggingFactory;

    impl Factory for TaggingFactory {
        fn dataarray(&self, mut parts: DataArrayParts) -> Result<DataArray> {
            parts.attrs.insert("assembled_by", "tagging");
            assemble_dataarray(parts)
        }
    }

    struct Tagged;

    impl Declare for Tagged {
        fn declare(spec: SpecBuilder) -> SpecBuilder {
            spec.data("data", ["x"], "float")
                .factory(Arc::new(TaggingFactory))
        }

        fn bind(self) -> Record {
            Record::new()
        }
    }

    impl AsDataArray for Tagged {}

    struct TaggedChild;

    impl Declare for TaggedChild {
        fn declare(spec: SpecBuilder) -> SpecBuilder {
            spec.extend::<Tagged>().coord("x", ["x"], "int")
        }

        fn bind(self) -> Record {
            Record::new()
        }
    }

    impl AsDataArray for TaggedChild {}

    #[test]
    fn test_class_factory_override() {
        let array = Tagged::new(vec![1.0, 2.0]).build().unwrap();
        assert_eq!(array.attrs.get("assembled_by"), Some(&"tagging".into()));
    }

    #[test]
    fn test_factory_override_is_inherited() {
        let array = TaggedChild::new(vec![1.0, 2.0])
            .set("x", vec![10_i64, 20])
            .build()
            .unwrap();
        assert_eq!(array.attrs.get("assembled_by"), Some(&"tagging".into()));
        assert_eq!(array.coord("x").unwrap().shape(), &[2]);
    }

    #[test]
    fn test_coordinate_must_fit_payload_dims() {
        struct Stray;

        impl Declare for Stray {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float").coord("c", ["z"], "int")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Stray {}

        let result = Stray::new(vec![1.0, 2.0]).set("c", vec![1_i64]).build();
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { field, .. }) if field == "c"
        ));
    }

    #[test]
    fn test_coordinate_length_must_match() {
        let result = Image::new(arr2(&[[1.0, 2.0], [3.0, 4.0]]))
            .set("x", vec![0_i64, 1, 2])
            .build();
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { field, .. }) if field == "x"
        ));
    }
}

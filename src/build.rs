use crate::dataarray::DataArray;
use crate::dataset::Dataset;
use crate::dtype::Dtype;
use crate::errors::{Error, Result};
use crate::factory::{DataArrayParts, DatasetParts};
use crate::spec::{Declare, FieldSpec, Spec};
use crate::values::{Record, Value};

/// Build a labeled array from an instance of a declared class.
pub fn asdataarray<T: Declare>(object: T) -> Result<DataArray> {
    let spec = Spec::of::<T>()?;
    build_dataarray(&spec, object.bind(), None)
}

/// Build a dataset from an instance of a declared class.
pub fn asdataset<T: Declare>(object: T) -> Result<Dataset> {
    let spec = Spec::of::<T>()?;
    build_dataset(&spec, object.bind())
}

/// Walk a class's table and assemble one labeled array from a record.
///
/// ``reference`` carries the dimension sizes of an enclosing construction,
/// so that scalar values of nested classes can be expanded.
pub(crate) fn build_dataarray(
    spec: &Spec,
    mut record: Record,
    reference: Option<&[(String, usize)]>,
) -> Result<DataArray> {
    let data_field = spec.primary_data()?;
    let value = take_value(&spec.class, &mut record, data_field)?;
    let payload = resolve_entry(&spec.class, data_field, value, reference)?;

    let sizes = payload.dims.sizes(payload.shape());
    let DataArray {
        values,
        dims,
        mut coords,
        mut attrs,
        mut name,
    } = payload;

    // index coordinates first, then the rest
    for field in spec.coord_fields() {
        if dims.contains(field.key()) {
            let value = take_value(&spec.class, &mut record, field)?;
            let coord = resolve_entry(&spec.class, field, value, Some(&sizes))?;
            coords.insert(field.key().to_string(), coord);
        }
    }
    for field in spec.coord_fields() {
        if !dims.contains(field.key()) {
            let value = take_value(&spec.class, &mut record, field)?;
            let coord = resolve_entry(&spec.class, field, value, Some(&sizes))?;
            coords.insert(field.key().to_string(), coord);
        }
    }

    for field in spec.attr_fields() {
        let value = take_value(&spec.class, &mut record, field)?;
        attrs.insert(field.name.clone(), value);
    }

    if let Some(field) = spec.name_fields().next() {
        let value = take_value(&spec.class, &mut record, field)?;
        name = Some(text_value(&spec.class, field, value)?);
    }

    spec.factory.dataarray(DataArrayParts {
        class: spec.class.clone(),
        values,
        dims,
        coords,
        attrs,
        name,
    })
}

/// Walk a class's table and assemble one dataset from a record.
pub(crate) fn build_dataset(spec: &Spec, mut record: Record) -> Result<Dataset> {
    let mut data_vars: Vec<(String, DataArray)> = Vec::new();
    let mut coords: Vec<(String, DataArray)> = Vec::new();

    for field in spec.data_fields() {
        let value = take_value(&spec.class, &mut record, field)?;
        let member = resolve_entry(&spec.class, field, value, None)?;
        let DataArray {
            values,
            dims,
            coords: member_coords,
            attrs,
            name: _,
        } = member;
        for (key, coord) in member_coords {
            coords.push((key, coord));
        }
        data_vars.push((
            field.key().to_string(),
            DataArray {
                values,
                dims,
                coords: Default::default(),
                attrs,
                name: None,
            },
        ));
    }

    if data_vars.is_empty() {
        return Err(Error::MissingDataField {
            class: spec.class.clone(),
        });
    }

    // first-found sizes; the factory settles conflicts between members
    let mut sizes: Vec<(String, usize)> = Vec::new();
    for (_, member) in &data_vars {
        for (dim, len) in member.dims.sizes(member.shape()) {
            if !sizes.iter().any(|(d, _)| *d == dim) {
                sizes.push((dim, len));
            }
        }
    }

    let index = |field: &FieldSpec| sizes.iter().any(|(d, _)| d == field.key());
    for pass in [true, false] {
        for field in spec.coord_fields() {
            if index(field) != pass {
                continue;
            }
            let value = take_value(&spec.class, &mut record, field)?;
            let coord = resolve_entry(&spec.class, field, value, Some(&sizes))?;
            // a class-level coordinate replaces any member-supplied one
            coords.retain(|(key, _)| key != field.key());
            coords.push((field.key().to_string(), coord));
        }
    }

    let mut attrs = Record::new();
    for field in spec.attr_fields() {
        let value = take_value(&spec.class, &mut record, field)?;
        attrs.insert(field.name.clone(), value);
    }

    spec.factory.dataset(DatasetParts {
        class: spec.class.clone(),
        data_vars,
        coords,
        attrs,
    })
}

/// Coerce one bound value into the labeled array its field declares.
///
/// Composed fields recurse into the referenced class; everything else is
/// cast to the resolved dtype, with 0-dimensional values expanded against
/// the reference sizes.
pub(crate) fn resolve_entry(
    class: &str,
    field: &FieldSpec,
    value: Value,
    reference: Option<&[(String, usize)]>,
) -> Result<DataArray> {
    if let Some(nested) = &field.nested {
        let record = match value {
            Value::Record(record) => record,
            other => {
                let data_name = nested.primary_data()?.name.clone();
                Record::new().set(data_name, other)
            }
        };
        return build_dataarray(nested, record, reference);
    }

    let array = match value {
        Value::Scalar(scalar) => scalar.into_array(),
        Value::Array(array) => array,
        Value::Record(_) => {
            return Err(Error::UnsupportedField {
                class: class.to_string(),
                field: field.name.clone(),
            });
        }
    };

    let array = match field.dtype {
        Some(dtype) => array.cast(dtype)?,
        None => array,
    };

    let array = match reference {
        Some(sizes) if array.ndim() == 0 && !field.dims.is_empty() => {
            let mut shape = Vec::with_capacity(field.dims.len());
            for dim in field.dims.iter() {
                let len = sizes
                    .iter()
                    .find(|(d, _)| d == dim)
                    .map(|(_, len)| *len)
                    .ok_or_else(|| Error::UnknownSize {
                        class: class.to_string(),
                        field: field.name.clone(),
                        dim: dim.to_string(),
                    })?;
                shape.push(len);
            }
            array.broadcast_to(&shape)
        }
        _ => array,
    };

    if array.ndim() != field.dims.len() {
        return Err(Error::DimensionMismatch {
            class: class.to_string(),
            field: field.name.clone(),
            shape: array.shape().to_vec(),
            dims: field.dims.clone(),
        });
    }

    Ok(DataArray {
        values: array,
        dims: field.dims.clone(),
        coords: Default::default(),
        attrs: Record::new(),
        name: None,
    })
}

fn take_value(class: &str, record: &mut Record, field: &FieldSpec) -> Result<Value> {
    match record.take(&field.name) {
        Some(value) => Ok(value),
        None => field.default.clone().ok_or_else(|| Error::MissingValue {
            class: class.to_string(),
            field: field.name.clone(),
        }),
    }
}

fn text_value(class: &str, field: &FieldSpec, value: Value) -> Result<String> {
    match value {
        Value::Scalar(scalar) => Ok(scalar.to_text()),
        Value::Array(array) => Err(Error::Cast {
            from: array.dtype(),
            to: Dtype::Str,
        }),
        Value::Record(_) => Err(Error::UnsupportedField {
            class: class.to_string(),
            field: field.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataarray::AsDataArray;
    use crate::spec::SpecBuilder;
    use crate::testing::{Image, XAxis};
    use ndarray::{arr1, arr2};

    #[test]
    fn test_identity_round_trip() {
        struct Series;

        impl Declare for Series {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["t"], crate::DtypeSpec::Any)
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Series {}

        let values = arr1(&[1.5_f32, 2.5, 3.5]);
        let series = Series::new(values.clone()).build().unwrap();
        // no coercion declared, so dtype and values come through exactly
        assert_eq!(series.values.as_f32().unwrap(), &values.into_dyn());
    }

    #[test]
    fn test_instance_construction() {
        let image = Image {
            data: arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn(),
            x: vec![0, 1],
            y: vec![10, 11],
        };
        let array = asdataarray(image).unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(
            array.coord("y").unwrap().values.as_i64().unwrap(),
            &arr1(&[10_i64, 11]).into_dyn()
        );
    }

    #[test]
    fn test_scalar_coordinate_expands_against_the_payload() {
        let image = Image::new(arr2(&[[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]]))
            .build()
            .unwrap();
        // data is 3x2; x follows the first axis, y the second
        assert_eq!(
            image.coord("x").unwrap().values.as_i64().unwrap(),
            &arr1(&[0_i64, 0, 0]).into_dyn()
        );
        assert_eq!(
            image.coord("y").unwrap().values.as_i64().unwrap(),
            &arr1(&[0_i64, 0]).into_dyn()
        );
    }

    #[test]
    fn test_rank_mismatch_is_rejected() {
        let result = Image::new(vec![1.0, 2.0]).build();
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch { class, field, .. })
                if class == "Image" && field == "data"
        ));
    }

    #[test]
    fn test_composed_coordinate_carries_attrs() {
        struct Profile;

        impl Declare for Profile {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float").coord_of::<XAxis>("x")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Profile {}

        let profile = Profile::new(vec![1.0, 2.0, 3.0])
            .set("x", vec![10_i64, 20, 30])
            .build()
            .unwrap();

        let x = profile.coord("x").unwrap();
        assert_eq!(x.values.as_i64().unwrap(), &arr1(&[10_i64, 20, 30]).into_dyn());
        assert_eq!(x.attrs.get("long_name"), Some(&Value::from("x axis")));
    }

    #[test]
    fn test_composed_coordinate_defaults_expand() {
        struct Profile2;

        impl Declare for Profile2 {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float")
                    .coord_of::<XAxis>("x")
                    .default("x", 0)
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Profile2 {}

        let profile = Profile2::new(vec![1.0, 2.0, 3.0]).build().unwrap();
        assert_eq!(
            profile.coord("x").unwrap().values.as_i64().unwrap(),
            &arr1(&[0_i64, 0, 0]).into_dyn()
        );
    }

    #[test]
    fn test_nested_name_renames_the_entry() {
        struct Axis;

        impl Declare for Axis {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "int")
                    .name("name")
                    .default("name", "distance")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        struct Track;

        impl Declare for Track {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float").coord_of::<Axis>("x")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Track {}

        let track = Track::new(vec![1.0, 2.0])
            .set("x", vec![5_i64, 6])
            .build()
            .unwrap();

        // the referenced class names its coordinate
        assert!(track.coord("x").is_none());
        let distance = track.coord("distance").unwrap();
        assert_eq!(distance.name.as_deref(), Some("distance"));
        assert_eq!(
            distance.values.as_i64().unwrap(),
            &arr1(&[5_i64, 6]).into_dyn()
        );
    }

    #[test]
    fn test_attrs_and_name_pass_through() {
        struct Labeled;

        impl Declare for Labeled {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float")
                    .attr("units")
                    .name("name")
                    .default("name", "luminance")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Labeled {}

        let array = Labeled::new(vec![1.0]).set("units", "cd / m^2").build().unwrap();
        assert_eq!(array.attrs.get("units"), Some(&Value::from("cd / m^2")));
        assert_eq!(array.name.as_deref(), Some("luminance"));
    }

    #[test]
    fn test_missing_value_without_default() {
        struct Labeled2;

        impl Declare for Labeled2 {
            fn declare(spec: SpecBuilder) -> SpecBuilder {
                spec.data("data", ["x"], "float").attr("units")
            }

            fn bind(self) -> Record {
                Record::new()
            }
        }

        impl AsDataArray for Labeled2 {}

        let result = Labeled2::new(vec![1.0]).build();
        assert!(matches!(
            result,
            Err(Error::MissingValue { class, field })
                if class == "Labeled2" && field == "units"
        ));
    }

    #[test]
    fn test_coercion_failure_surfaces_unwrapped() {
        let result = Image::new(arr2(&[[1.0, 2.0], [3.0, 4.0]]))
            .set("x", vec!["a", "b"])
            .build();
        assert!(matches!(
            result,
            Err(Error::Cast {
                from: Dtype::Str,
                to: Dtype::Int64
            })
        ));
    }
}

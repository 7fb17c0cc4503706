use ndarray::ArrayD;

use crate::spec::{Declare, SpecBuilder};
use crate::values::Record;
use crate::{AsDataArray, AsDataset};

/// 2-d float image with integer axis coordinates.
pub(crate) struct Image {
    pub data: ArrayD<f64>,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
}

impl Declare for Image {
    fn declare(spec: SpecBuilder) -> SpecBuilder {
        spec.data("data", ["x", "y"], "float")
            .coord("x", ["x"], "int")
            .coord("y", ["y"], "int")
            .default("x", 0)
            .default("y", 0)
    }

    fn bind(self) -> Record {
        Record::new()
            .set("data", self.data)
            .set("x", self.x)
            .set("y", self.y)
    }
}

impl AsDataArray for Image {}

/// 1-d integer axis carrying a plotting label.
pub(crate) struct XAxis {
    pub data: Vec<i64>,
}

impl Declare for XAxis {
    fn declare(spec: SpecBuilder) -> SpecBuilder {
        spec.data("data", ["x"], "int")
            .attr("long_name")
            .default("long_name", "x axis")
    }

    fn bind(self) -> Record {
        Record::new().set("data", self.data)
    }
}

/// Three-channel image declared as a dataset.
pub(crate) struct ColorImage {
    pub red: ArrayD<f64>,
    pub green: ArrayD<f64>,
    pub blue: ArrayD<f64>,
}

impl Declare for ColorImage {
    fn declare(spec: SpecBuilder) -> SpecBuilder {
        spec.data("red", ["x", "y"], "float")
            .data("green", ["x", "y"], "float")
            .data("blue", ["x", "y"], "float")
            .coord("x", ["x"], "int")
            .coord("y", ["y"], "int")
            .default("x", 0)
            .default("y", 0)
    }

    fn bind(self) -> Record {
        Record::new()
            .set("red", self.red)
            .set("green", self.green)
            .set("blue", self.blue)
    }
}

impl AsDataset for ColorImage {}

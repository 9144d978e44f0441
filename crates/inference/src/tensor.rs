//! Named tensors exchanged with the inference engine.

use ndarray::{ArrayD, IxDyn, ShapeError};

/// Input: the encoded image payload.
pub const IMAGE_BYTES: &str = "image_bytes";
/// Input: per-request identifier.
pub const KEY: &str = "key";
/// Output: `[N, 4]` boxes as `[yMin, xMin, yMax, xMax]`.
pub const DETECTION_BOXES: &str = "detection_boxes";
/// Output: `[N]` confidence scores.
pub const DETECTION_SCORES: &str = "detection_scores";
/// Output: `[N]` class ids, possibly emitted as floats.
pub const DETECTION_CLASSES: &str = "detection_classes";

/// Element storage of a tensor.
///
/// `Bytes` mirrors TensorFlow's string dtype: every element is an arbitrary
/// byte string, not necessarily UTF-8.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    Bytes(ArrayD<Vec<u8>>),
    Float(ArrayD<f32>),
    Int(ArrayD<i64>),
}

impl TensorData {
    pub fn shape(&self) -> &[usize] {
        match self {
            TensorData::Bytes(a) => a.shape(),
            TensorData::Float(a) => a.shape(),
            TensorData::Int(a) => a.shape(),
        }
    }

    pub fn dtype(&self) -> &'static str {
        match self {
            TensorData::Bytes(_) => "string",
            TensorData::Float(_) => "float32",
            TensorData::Int(_) => "int64",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTensor {
    name: String,
    data: TensorData,
}

impl NamedTensor {
    pub fn new(name: impl Into<String>, data: TensorData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Rank-0 byte-string tensor.
    pub fn scalar_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, TensorData::Bytes(ArrayD::from_elem(IxDyn(&[]), bytes)))
    }

    /// Rank-0 string tensor holding UTF-8 text.
    pub fn scalar_string(name: impl Into<String>, value: &str) -> Self {
        Self::scalar_bytes(name, value.as_bytes().to_vec())
    }

    pub fn float(
        name: impl Into<String>,
        shape: &[usize],
        values: Vec<f32>,
    ) -> Result<Self, ShapeError> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(Self::new(name, TensorData::Float(array)))
    }

    pub fn int(
        name: impl Into<String>,
        shape: &[usize],
        values: Vec<i64>,
    ) -> Result<Self, ShapeError> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(Self::new(name, TensorData::Int(array)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &TensorData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn into_parts(self) -> (String, TensorData) {
        (self.name, self.data)
    }

    /// Payload of a rank-0 byte-string tensor.
    pub fn as_scalar_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            TensorData::Bytes(a) if a.ndim() == 0 => a.first().map(Vec::as_slice),
            _ => None,
        }
    }

    /// Payload of a rank-0 string tensor, if it is valid UTF-8.
    pub fn as_scalar_str(&self) -> Option<&str> {
        self.as_scalar_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

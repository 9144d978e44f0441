use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in the same unit space as the model's boxes
/// (normalized image coordinates for TF object-detection models).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rectangle {
    /// Convert a `[yMin, xMin, yMax, xMax]` box.
    ///
    /// Inverted corners are not clamped and yield a negative width or height.
    #[inline]
    pub fn from_yxyx([y_min, x_min, y_max, x_max]: [f32; 4]) -> Self {
        Self {
            x: x_min,
            y: y_min,
            width: x_max - x_min,
            height: y_max - y_min,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.width < 0.0 || self.height < 0.0
    }
}

/// One recognised object. Serialized with the field names the HTTP
/// response uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,
    #[serde(rename = "probability")]
    pub score: f64,
    #[serde(rename = "bounds")]
    pub rect: Rectangle,
}

//! Types returned by the object-detection capability.

use serde::Serialize;

/// Axis-aligned bounding box in image pixel coordinates.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
}

/// One detected object.
#[derive(Serialize, Clone, Debug)]
pub struct Detection {
    /// Class label (e.g. "battery", "circuit-board").
    pub label: String,

    /// Confidence score in `[0, 1]`.
    pub score: f32,

    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

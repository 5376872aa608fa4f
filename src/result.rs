//! Bit-exact JSON result shape, kept separate from the internal
//! `BoundingBox` geometry type so the wire format can stay stable even if
//! the internal representation changes shape.

use serde::{Deserialize, Serialize};

use crate::geometry::BoundingBox;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolygonJson {
    pub points: Vec<PointJson>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PointJson {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RotatedRectangleJson {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RectangleJson {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBoxJson {
    pub polygon: PolygonJson,
    #[serde(rename = "rotatedRectangle")]
    pub rotated_rectangle: RotatedRectangleJson,
    pub rectangle: RectangleJson,
}

impl From<&BoundingBox> for BoundingBoxJson {
    fn from(b: &BoundingBox) -> Self {
        Self {
            polygon: PolygonJson {
                points: b.polygon.points.iter().map(|p| PointJson { x: p.x, y: p.y }).collect(),
            },
            rotated_rectangle: RotatedRectangleJson {
                x: b.rotated_rectangle.x,
                y: b.rotated_rectangle.y,
                width: b.rotated_rectangle.width,
                height: b.rotated_rectangle.height,
                angle: b.rotated_rectangle.angle,
            },
            rectangle: RectangleJson {
                x: b.rectangle.x,
                y: b.rectangle.y,
                width: b.rectangle.width,
                height: b.rectangle.height,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    pub text: String,
    pub confidence: f64,
    #[serde(rename = "boundingBox")]
    pub bounding_box: BoundingBoxJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    #[serde(rename = "pageNumber")]
    pub page_number: u32,
    pub results: Vec<OcrResult>,
}

use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::rect::Rect;

/// Summary of one foreground blob: mass center and bounding box.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    #[serde(rename = "x")]
    pub cx: f32,
    #[serde(rename = "y")]
    pub cy: f32,
    pub bbox: Rect,
}

impl Detection {
    #[inline]
    pub fn new(cx: f32, cy: f32, bbox: Rect) -> Self {
        Self { cx, cy, bbox }
    }

    #[inline(always)]
    pub fn centroid(&self) -> na::Point2<f32> {
        na::Point2::new(self.cx, self.cy)
    }
}

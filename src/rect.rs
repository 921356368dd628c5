use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

/// Axis-aligned integer rectangle. The right and bottom edges are exclusive,
/// so a rectangle of width 1 contains exactly one pixel column.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    #[inline]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning two arbitrary corner points, in any order.
    pub fn from_corners(a: na::Point2<i32>, b: na::Point2<i32>) -> Self {
        let x = a.x.min(b.x);
        let y = a.y.min(b.y);

        Self {
            x,
            y,
            width: (a.x.max(b.x) - x),
            height: (a.y.max(b.y) - y),
        }
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline(always)]
    pub fn longest_side(&self) -> i32 {
        self.width.max(self.height)
    }

    #[inline]
    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    #[inline]
    pub fn contains(&self, p: na::Point2<f32>) -> bool {
        p.x >= self.x as f32
            && p.x < self.right() as f32
            && p.y >= self.y as f32
            && p.y < self.bottom() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_is_half_open() {
        let r = Rect::new(10, 20, 30, 40);

        assert!(r.contains(na::Point2::new(10.0, 20.0)));
        assert!(r.contains(na::Point2::new(39.9, 59.9)));
        assert!(!r.contains(na::Point2::new(40.0, 30.0)));
        assert!(!r.contains(na::Point2::new(20.0, 60.0)));
        assert!(!r.contains(na::Point2::new(9.9, 30.0)));
    }

    #[test]
    fn from_corners_normalizes_order() {
        let r = Rect::from_corners(na::Point2::new(50, 60), na::Point2::new(10, 20));

        assert_eq!(r, Rect::new(10, 20, 40, 40));
    }
}

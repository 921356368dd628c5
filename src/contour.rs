use image::GrayImage;
use nalgebra as na;

use crate::detection::Detection;
use crate::rect::Rect;

/// Ordered outline of one connected foreground region.
pub type Contour = Vec<na::Point2<i32>>;

/// Tolerance of the polygonal approximation used for bounding boxes.
const APPROX_TOLERANCE: f64 = 3.0;

/// Clockwise 8-neighborhood, starting east.
const DELTA: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Outer boundaries of every 8-connected foreground component, one contour
/// per component. Holes are not visited.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let mut visited = vec![false; (w * h) as usize];
    let mut contours = Vec::new();
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            if visited[idx] || mask.get_pixel(x as u32, y as u32)[0] == 0 {
                continue;
            }

            // The first pixel of a component in scan order is the uppermost
            // leftmost one, which sits on its outer border.
            contours.push(trace_border(mask, na::Point2::new(x, y)));

            // Flood the component so it is traced exactly once.
            visited[idx] = true;
            stack.push((x, y));
            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in DELTA {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }

                    let nidx = (ny * w + nx) as usize;
                    if !visited[nidx] && mask.get_pixel(nx as u32, ny as u32)[0] != 0 {
                        visited[nidx] = true;
                        stack.push((nx, ny));
                    }
                }
            }
        }
    }

    contours
}

#[inline]
fn foreground(mask: &GrayImage, x: i32, y: i32) -> bool {
    x >= 0
        && y >= 0
        && (x as u32) < mask.width()
        && (y as u32) < mask.height()
        && mask.get_pixel(x as u32, y as u32)[0] != 0
}

/// Radial-sweep border following, clockwise around the component, from its
/// uppermost leftmost pixel.
fn trace_border(mask: &GrayImage, start: na::Point2<i32>) -> Contour {
    let mut border = vec![start];
    let mut curr = start;
    // Direction pointing back at the previously visited pixel; the start
    // pixel has only background to its west and in the row above.
    let mut back = 4;
    let limit = mask.width() as usize * mask.height() as usize * 4;

    loop {
        let mut next = None;
        for k in 1..=8 {
            let d = (back + k) % 8;
            let (dx, dy) = DELTA[d];
            if foreground(mask, curr.x + dx, curr.y + dy) {
                next = Some((d, na::Point2::new(curr.x + dx, curr.y + dy)));
                break;
            }
        }

        match next {
            // Isolated pixel.
            None => break,
            Some((d, p)) => {
                if p == start || border.len() > limit {
                    break;
                }

                border.push(p);
                curr = p;
                back = (d + 4) % 8;
            }
        }
    }

    border
}

/// Zeroth and first spatial moments of the closed polygon spanned by the
/// points (Green's theorem). Signed; callers take `m00.abs()` for area.
pub fn moments(points: &[na::Point2<i32>]) -> (f64, f64, f64) {
    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;

    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let cross = p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;

        m00 += cross;
        m10 += (p.x + q.x) as f64 * cross;
        m01 += (p.y + q.y) as f64 * cross;
    }

    (m00 / 2.0, m10 / 6.0, m01 / 6.0)
}

#[inline]
pub fn contour_area(points: &[na::Point2<i32>]) -> f64 {
    moments(points).0.abs()
}

/// Mass center `(m10/m00, m01/m00)`, or `None` for a degenerate contour
/// whose enclosed area vanishes.
pub fn mass_center(points: &[na::Point2<i32>]) -> Option<na::Point2<f32>> {
    let (m00, m10, m01) = moments(points);

    if m00 == 0.0 {
        return None;
    }

    Some(na::Point2::new((m10 / m00) as f32, (m01 / m00) as f32))
}

/// Keep only contours whose area exceeds `size_fraction` of the largest.
/// If every contour has zero area none survive.
pub fn filter_small(mut contours: Vec<Contour>, size_fraction: f32) -> Vec<Contour> {
    let max_area = contours
        .iter()
        .map(|c| contour_area(c))
        .fold(0.0, f64::max);

    let threshold = size_fraction as f64 * max_area;
    contours.retain(|c| contour_area(c) > threshold);

    contours
}

/// Douglas-Peucker simplification. A closed curve is split at the point
/// farthest from the first and both halves are reduced independently.
pub fn approx_polygon_dp(
    points: &[na::Point2<i32>],
    epsilon: f64,
    closed: bool,
) -> Vec<na::Point2<i32>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    if !closed {
        let mut out = Vec::new();
        simplify(points, epsilon, &mut out);
        return out;
    }

    let first = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let (dx, dy) = ((p.x - first.x) as i64, (p.y - first.y) as i64);
            dx * dx + dy * dy
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    if far == 0 {
        return points.to_vec();
    }

    let mut out = Vec::new();
    simplify(&points[..=far], epsilon, &mut out);
    out.pop();

    let mut tail: Vec<_> = points[far..].to_vec();
    tail.push(points[0]);
    simplify(&tail, epsilon, &mut out);
    out.pop();

    out
}

fn simplify(points: &[na::Point2<i32>], epsilon: f64, out: &mut Vec<na::Point2<i32>>) {
    let last = points.len() - 1;
    if last == 0 {
        out.push(points[0]);
        return;
    }

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (i, p) in points.iter().enumerate().take(last).skip(1) {
        let d = segment_distance(*p, points[0], points[last]);
        if d > max_dist {
            max_dist = d;
            max_idx = i;
        }
    }

    if max_dist > epsilon {
        simplify(&points[..=max_idx], epsilon, out);
        out.pop();
        simplify(&points[max_idx..], epsilon, out);
    } else {
        out.push(points[0]);
        out.push(points[last]);
    }
}

fn segment_distance(p: na::Point2<i32>, a: na::Point2<i32>, b: na::Point2<i32>) -> f64 {
    let p = na::Point2::new(p.x as f64, p.y as f64);
    let a = na::Point2::new(a.x as f64, a.y as f64);
    let b = na::Point2::new(b.x as f64, b.y as f64);

    let ab = b - a;
    let len = ab.norm();
    if len == 0.0 {
        return na::distance(&p, &a);
    }

    let ap = p - a;
    (ab.x * ap.y - ab.y * ap.x).abs() / len
}

/// Tight axis-aligned box around the points; spans `max - min + 1` so a
/// single pixel yields a unit rectangle.
pub fn bounding_rect(points: &[na::Point2<i32>]) -> Rect {
    let mut min = match points.first() {
        Some(p) => *p,
        None => return Rect::default(),
    };
    let mut max = min;

    for p in &points[1..] {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }

    Rect::new(min.x, min.y, max.x - min.x + 1, max.y - min.y + 1)
}

/// Mass center plus the bounding box of the polygonal approximation, or
/// `None` when the contour is degenerate.
pub fn summarize(contour: &[na::Point2<i32>]) -> Option<Detection> {
    let center = mass_center(contour)?;
    let polygon = approx_polygon_dp(contour, APPROX_TOLERANCE, true);
    let bbox = bounding_rect(&polygon);

    Some(Detection::new(center.x, center.y, bbox))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn mask_with_block(w: u32, h: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        let mut mask = GrayImage::new(w, h);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        mask
    }

    #[test]
    fn traces_one_contour_per_component() {
        let mut mask = mask_with_block(20, 20, 2, 2, 4);
        for y in 10..14 {
            for x in 12..16 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }

        let contours = find_external_contours(&mask);

        assert_eq!(contours.len(), 2);
        assert_eq!(bounding_rect(&contours[0]), Rect::new(2, 2, 4, 4));
        assert_eq!(bounding_rect(&contours[1]), Rect::new(12, 10, 4, 4));
    }

    #[test]
    fn square_centroid_sits_in_the_middle() {
        let mask = mask_with_block(16, 16, 3, 3, 4);
        let contours = find_external_contours(&mask);
        let center = mass_center(&contours[0]).unwrap();

        assert!((center.x - 4.5).abs() < 1e-3);
        assert!((center.y - 4.5).abs() < 1e-3);
    }

    #[test]
    fn one_pixel_line_is_degenerate() {
        let mut mask = GrayImage::new(12, 12);
        for x in 2..9 {
            mask.put_pixel(x, 5, Luma([255]));
        }

        let contours = find_external_contours(&mask);

        assert_eq!(contours.len(), 1);
        assert_eq!(contour_area(&contours[0]), 0.0);
        assert!(mass_center(&contours[0]).is_none());
    }

    #[test]
    fn size_filter_is_relative_to_the_largest() {
        let mut mask = mask_with_block(40, 40, 2, 2, 12);
        mask.put_pixel(30, 30, Luma([255]));
        mask.put_pixel(31, 30, Luma([255]));
        mask.put_pixel(30, 31, Luma([255]));
        mask.put_pixel(31, 31, Luma([255]));

        let contours = find_external_contours(&mask);
        assert_eq!(contours.len(), 2);

        let survivors = filter_small(contours, 0.1);
        assert_eq!(survivors.len(), 1);
        assert_eq!(bounding_rect(&survivors[0]), Rect::new(2, 2, 12, 12));
    }

    #[test]
    fn all_zero_area_contours_are_dropped() {
        let contours = vec![
            vec![na::Point2::new(0, 0), na::Point2::new(5, 0)],
            vec![na::Point2::new(7, 7)],
        ];

        assert!(filter_small(contours, 0.1).is_empty());
    }

    #[test]
    fn polygon_approximation_keeps_square_corners() {
        let square = vec![
            na::Point2::new(0, 0),
            na::Point2::new(5, 0),
            na::Point2::new(10, 0),
            na::Point2::new(10, 5),
            na::Point2::new(10, 10),
            na::Point2::new(5, 10),
            na::Point2::new(0, 10),
            na::Point2::new(0, 5),
        ];

        let approx = approx_polygon_dp(&square, 1.0, true);

        assert_eq!(
            approx,
            vec![
                na::Point2::new(0, 0),
                na::Point2::new(10, 0),
                na::Point2::new(10, 10),
                na::Point2::new(0, 10),
            ]
        );
    }

    #[test]
    fn bounding_rect_is_inclusive() {
        let points = vec![na::Point2::new(3, 4)];
        assert_eq!(bounding_rect(&points), Rect::new(3, 4, 1, 1));

        let points = vec![na::Point2::new(2, 2), na::Point2::new(7, 5)];
        assert_eq!(bounding_rect(&points), Rect::new(2, 2, 6, 4));
    }
}

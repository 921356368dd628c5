use image::{GrayImage, Luma};

use crate::rect::Rect;

/// Binary threshold: strictly greater than `thresh` becomes 255, the rest 0.
pub fn threshold(mask: &mut GrayImage, thresh: u8) {
    for px in mask.pixels_mut() {
        px[0] = if px[0] > thresh { 255 } else { 0 };
    }
}

/// Median filter over a `size` x `size` window, replicating the border.
/// On a binary mask the median reduces to a majority vote.
pub fn median_blur(mask: &GrayImage, size: u32) -> GrayImage {
    debug_assert!(size % 2 == 1, "median kernel side must be odd");

    let (w, h) = (mask.width(), mask.height());
    let r = (size / 2) as i32;
    let window = size * size;
    let mut out = GrayImage::new(w, h);

    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let mut set = 0u32;
            for dy in -r..=r {
                for dx in -r..=r {
                    let sx = (x + dx).clamp(0, w as i32 - 1) as u32;
                    let sy = (y + dy).clamp(0, h as i32 - 1) as u32;
                    if mask.get_pixel(sx, sy)[0] != 0 {
                        set += 1;
                    }
                }
            }

            if set * 2 > window {
                out.put_pixel(x as u32, y as u32, Luma([255]));
            }
        }
    }

    out
}

/// Repeated binary dilation with a 3x3 rectangular kernel, fusing adjacent
/// blobs and closing small gaps.
pub fn dilate(mask: &GrayImage, iterations: u32) -> GrayImage {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let mut current = mask.clone();

    for _ in 0..iterations {
        let mut next = current.clone();

        for y in 0..h {
            for x in 0..w {
                if current.get_pixel(x as u32, y as u32)[0] != 0 {
                    continue;
                }

                'neighbors: for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (x + dx, y + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }

                        if current.get_pixel(nx as u32, ny as u32)[0] != 0 {
                            next.put_pixel(x as u32, y as u32, Luma([255]));
                            break 'neighbors;
                        }
                    }
                }
            }
        }

        current = next;
    }

    current
}

/// Force every pixel inside `rect` to background.
pub fn suppress(mask: &mut GrayImage, rect: Rect) {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = rect.right().min(w);
    let y1 = rect.bottom().min(h);

    for y in y0..y1 {
        for x in x0..x1 {
            mask.put_pixel(x as u32, y as u32, Luma([0]));
        }
    }
}

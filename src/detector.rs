use image::GrayImage;
use tracing::debug;

use crate::background::BackgroundModel;
use crate::config::DetectorConfig;
use crate::contour::{self, Contour};
use crate::detection::Detection;
use crate::error::Error;
use crate::mask;
use crate::merge;
use crate::rect::Rect;

/// Threshold that folds shadow labels back into the background before the
/// mask is cleaned up.
const MASK_THRESHOLD: u8 = 130;

/// Turns a raw frame into blob detections: background subtraction, mask
/// cleanup, contour extraction, size filtering and proximity merging.
pub struct ContourDetector {
    config: DetectorConfig,
    background: Option<BackgroundModel>,
    suppressed: Option<Rect>,
}

impl ContourDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            background: None,
            suppressed: None,
        }
    }

    /// Force a region to background in every subsequent frame. Replaces any
    /// previously set rectangle.
    pub fn suppress(&mut self, rect: Rect) {
        self.suppressed = Some(rect);
    }

    pub fn process(&mut self, frame: &GrayImage) -> Result<Vec<Detection>, Error> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::EmptyFrame);
        }

        let config = &self.config;
        let background = self
            .background
            .get_or_insert_with(|| BackgroundModel::new(frame.width(), frame.height(), config));

        let mut foreground = background.apply(frame);
        mask::threshold(&mut foreground, MASK_THRESHOLD);
        let foreground = mask::median_blur(&foreground, config.median_filter_size);
        let mut foreground = mask::dilate(&foreground, config.dilate_iterations);

        if let Some(rect) = self.suppressed {
            mask::suppress(&mut foreground, rect);
        }

        let contours = contour::find_external_contours(&foreground);
        let contours = contour::filter_small(contours, config.size_fraction);

        // The merge gate works on pre-merge geometry; contours whose area
        // vanishes are dropped together with their summaries.
        let (contours, summaries): (Vec<Contour>, Vec<Detection>) = contours
            .into_iter()
            .filter_map(|c| contour::summarize(&c).map(|d| (c, d)))
            .unzip();

        let merged = merge::merge_nearby(contours, &summaries, config.merge_fraction);
        let detections: Vec<Detection> =
            merged.iter().filter_map(|c| contour::summarize(c)).collect();

        debug!(detections = detections.len(), "frame processed");

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn frame_with_block(w: u32, h: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        let mut frame = GrayImage::from_pixel(w, h, Luma([20]));
        for y in y0..(y0 + side).min(h) {
            for x in x0..(x0 + side).min(w) {
                frame.put_pixel(x, y, Luma([230]));
            }
        }
        frame
    }

    #[test]
    fn zero_sized_frame_is_rejected() {
        let mut detector = ContourDetector::new(DetectorConfig::default());

        let result = detector.process(&GrayImage::new(0, 10));
        assert!(matches!(result, Err(Error::EmptyFrame)));
    }

    #[test]
    fn still_scene_yields_no_detections() {
        let mut detector = ContourDetector::new(DetectorConfig::default());

        for _ in 0..10 {
            let detections = detector
                .process(&GrayImage::from_pixel(40, 40, Luma([20])))
                .unwrap();
            assert!(detections.is_empty());
        }
    }

    #[test]
    fn appearing_block_is_detected_near_its_center() {
        let mut detector = ContourDetector::new(DetectorConfig::default());
        for _ in 0..10 {
            detector
                .process(&GrayImage::from_pixel(60, 60, Luma([20])))
                .unwrap();
        }

        let detections = detector
            .process(&frame_with_block(60, 60, 20, 20, 16))
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert!((detections[0].cx - 27.5).abs() < 2.0);
        assert!((detections[0].cy - 27.5).abs() < 2.0);
    }

    #[test]
    fn suppression_rectangle_silences_a_region() {
        let mut detector = ContourDetector::new(DetectorConfig::default());
        detector.suppress(Rect::new(0, 0, 60, 60));

        for _ in 0..10 {
            detector
                .process(&GrayImage::from_pixel(60, 60, Luma([20])))
                .unwrap();
        }

        let detections = detector
            .process(&frame_with_block(60, 60, 20, 20, 16))
            .unwrap();

        assert!(detections.is_empty());
    }
}

pub mod background;
pub mod config;
pub mod contour;
pub mod detection;
pub mod detector;
pub mod error;
pub mod kalman;
pub mod mask;
pub mod merge;
pub mod rect;
pub mod track;
pub mod track_log;
pub mod tracker;

mod circular_queue;
mod disjoint_set;

pub use config::{DetectorConfig, TrackerConfig};
pub use detection::Detection;
pub use detector::ContourDetector;
pub use error::Error;
pub use rect::Rect;
pub use track::{Track, TrackingOutput};
pub use track_log::TrackLog;
pub use tracker::MultiObjectTracker;

use image::GrayImage;
use nalgebra as na;
use std::fmt;

pub trait Float:
    num_traits::FromPrimitive + na::ComplexField + Copy + fmt::Debug + PartialEq + 'static
{
}

impl<T> Float for T where
    T: num_traits::FromPrimitive + na::ComplexField + Copy + fmt::Debug + PartialEq + 'static
{
}

/// Detection and tracking chained behind a single per-frame call. The
/// tracker is sized from the first frame it sees.
pub struct Pipeline {
    detector: ContourDetector,
    tracker: Option<MultiObjectTracker>,
    tracker_config: TrackerConfig,
    frame_number: u64,
}

impl Pipeline {
    pub fn new(detector_config: DetectorConfig, tracker_config: TrackerConfig) -> Self {
        Self {
            detector: ContourDetector::new(detector_config),
            tracker: None,
            tracker_config,
            frame_number: 0,
        }
    }

    /// Frames processed so far.
    #[inline]
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Force a region to background in every subsequent frame. Replaces
    /// any previously set rectangle.
    pub fn suppress(&mut self, rect: Rect) {
        self.detector.suppress(rect);
    }

    pub fn update(&mut self, frame: &GrayImage) -> Result<&[TrackingOutput], Error> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(Error::EmptyFrame);
        }

        let tracker_config = &self.tracker_config;
        let tracker = self.tracker.get_or_insert_with(|| {
            MultiObjectTracker::new(frame.width(), frame.height(), tracker_config.clone())
        });

        let detections = self.detector.process(frame)?;
        self.frame_number += 1;

        Ok(tracker.update(&detections))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(DetectorConfig::default(), TrackerConfig::default())
    }
}

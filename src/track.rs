use nalgebra as na;

use crate::circular_queue::CircularQueue;
use crate::config::TrackerConfig;
use crate::error::Error;
use crate::kalman::MotionFilter;

/// Stable display color for a track id: a golden-angle walk around the hue
/// wheel at full saturation.
pub fn color_for_id(id: u64) -> (u8, u8, u8) {
    let hue = (id.wrapping_mul(137) % 360) as f32;
    let fraction = hue / 60.0 - (hue / 60.0).floor();
    let rising = (fraction * 255.0) as u8;
    let falling = 255 - rising;

    match (hue / 60.0) as u32 % 6 {
        0 => (255, rising, 0),
        1 => (falling, 255, 0),
        2 => (0, 255, rising),
        3 => (0, falling, 255),
        4 => (rising, 0, 255),
        _ => (255, 0, falling),
    }
}

/// One persistent object identity: a motion filter plus the lifecycle
/// counters the association step drives.
#[derive(Debug, Clone)]
pub struct Track {
    id: u64,
    color: (u8, u8, u8),
    filter: MotionFilter<f32>,
    lifetime: u64,
    missed_frames: u32,
    trajectory: CircularQueue<na::Point2<f32>>,
}

impl Track {
    pub(crate) fn new(id: u64, centroid: na::Point2<f32>, config: &TrackerConfig) -> Self {
        Self {
            id,
            color: color_for_id(id),
            filter: MotionFilter::new(
                centroid,
                config.dt,
                config.accel_noise_magnitude,
                config.measurement_noise,
            ),
            lifetime: 0,
            missed_frames: 0,
            trajectory: CircularQueue::with_capacity(config.trajectory_capacity),
        }
    }

    pub(crate) fn predict(&mut self) -> na::Point2<f32> {
        self.lifetime += 1;
        self.filter.predict()
    }

    pub(crate) fn correct(&mut self, observation: na::Point2<f32>) -> Result<(), Error> {
        self.filter.correct(observation)?;
        self.trajectory.push(self.filter.latest_prediction());
        Ok(())
    }

    pub(crate) fn correct_no_obs(&mut self) -> Result<(), Error> {
        self.filter.correct_no_obs()?;
        self.trajectory.push(self.filter.latest_prediction());
        Ok(())
    }

    pub(crate) fn got_update(&mut self) {
        self.missed_frames = 0;
    }

    pub(crate) fn no_update_this_frame(&mut self) {
        self.missed_frames += 1;
    }

    #[inline(always)]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline(always)]
    pub fn color(&self) -> (u8, u8, u8) {
        self.color
    }

    /// Frames since this track was created.
    #[inline(always)]
    pub fn lifetime(&self) -> u64 {
        self.lifetime
    }

    /// Consecutive frames without any form of update.
    #[inline(always)]
    pub fn missed_frames(&self) -> u32 {
        self.missed_frames
    }

    #[inline]
    pub fn latest_prediction(&self) -> na::Point2<f32> {
        self.filter.latest_prediction()
    }

    /// Smoothed position history, oldest first.
    pub fn trajectory(&self) -> Vec<na::Point2<f32>> {
        self.trajectory.asc_iter().copied().collect()
    }

    pub(crate) fn output(&self) -> TrackingOutput {
        TrackingOutput {
            id: self.id,
            color: self.color,
            position: self.latest_prediction(),
            trajectory: self.trajectory(),
        }
    }
}

/// Per-frame emission record for one visible track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingOutput {
    pub id: u64,
    pub color: (u8, u8, u8),
    pub position: na::Point2<f32>,
    pub trajectory: Vec<na::Point2<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_are_deterministic_and_distinct() {
        for id in 1..=6 {
            assert_eq!(color_for_id(id), color_for_id(id));
        }

        let colors: std::collections::HashSet<_> = (1..=6).map(color_for_id).collect();
        assert_eq!(colors.len(), 6);
    }

    #[test]
    fn trajectory_is_capped() {
        let config = TrackerConfig {
            trajectory_capacity: 4,
            ..TrackerConfig::default()
        };

        let mut track = Track::new(1, na::Point2::new(0.0, 0.0), &config);
        for t in 1..=10 {
            track.predict();
            track.correct(na::Point2::new(t as f32, 0.0)).unwrap();
        }

        let trajectory = track.trajectory();
        assert_eq!(trajectory.len(), 4);
        assert!(trajectory[0].x < trajectory[3].x);
    }
}

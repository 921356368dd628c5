/// Knobs for the detection side: background model, mask cleanup and
/// contour post-processing.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Background adaptation window, in frames.
    pub history: usize,
    /// Gaussian components per pixel.
    pub n_mixtures: usize,
    /// Label shadow pixels with an intermediate gray before thresholding.
    pub detect_shadows: bool,
    /// Brightness ratio below which a darkened pixel is no longer a shadow.
    pub shadow_threshold: f32,
    /// Contour area gate, as a fraction of the largest contour's area.
    pub size_fraction: f32,
    /// Side of the median denoise kernel. Must be odd.
    pub median_filter_size: u32,
    /// Number of 3x3 dilation passes applied to the mask.
    pub dilate_iterations: u32,
    /// Centroid proximity gate for merging contours, relative to the
    /// largest bounding-box side of the pair.
    pub merge_fraction: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history: 1000,
            n_mixtures: 3,
            detect_shadows: true,
            shadow_threshold: 0.5,
            size_fraction: 0.1,
            median_filter_size: 5,
            dilate_iterations: 4,
            merge_fraction: 0.5,
        }
    }
}

/// Knobs for the association side: gating, lifecycle and the motion model.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Frames a newborn track must survive before it is emitted.
    pub lifetime_threshold: u64,
    /// Assignment cost gate, as a fraction of the mean frame dimension.
    pub distance_fraction: f32,
    /// Consecutive missed frames after which a track is destroyed.
    pub missed_frames_threshold: u32,
    /// Motion step per frame.
    pub dt: f32,
    /// White-noise acceleration magnitude feeding the process noise.
    pub accel_noise_magnitude: f32,
    /// Standard deviation of the position measurement, in pixels.
    pub measurement_noise: f32,
    /// Smoothed positions retained per track for display.
    pub trajectory_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            lifetime_threshold: 2,
            distance_fraction: 0.1,
            missed_frames_threshold: 10,
            dt: 1.0,
            accel_noise_magnitude: 0.5,
            measurement_noise: 0.1,
            trajectory_capacity: 64,
        }
    }
}

use image::GrayImage;
use tracing::trace;

use crate::config::DetectorConfig;

/// Gray value given to shadow pixels. It sits below the foreground
/// threshold, so binarization folds shadows back into the background.
pub const SHADOW_VALUE: u8 = 127;
const FOREGROUND_VALUE: u8 = 255;

const MATCH_GATE_SIGMAS: f32 = 2.5;
const BACKGROUND_RATIO: f32 = 0.9;
const INITIAL_VARIANCE: f32 = 225.0;
const MIN_VARIANCE: f32 = 4.0;
const INITIAL_WEIGHT: f32 = 0.05;

#[derive(Debug, Clone, Copy, Default)]
struct Gaussian {
    weight: f32,
    mean: f32,
    variance: f32,
}

impl Gaussian {
    #[inline]
    fn matches(&self, value: f32) -> bool {
        self.weight > 0.0 && (value - self.mean).abs() < MATCH_GATE_SIGMAS * self.variance.sqrt()
    }

    /// Components are kept ordered by weight over spread, so the most
    /// stable evidence comes first.
    #[inline]
    fn fitness(&self) -> f32 {
        if self.weight > 0.0 {
            self.weight / self.variance.sqrt()
        } else {
            0.0
        }
    }
}

/// Adaptive per-pixel mixture-of-Gaussians estimate of the scene
/// background over grayscale intensity.
pub struct BackgroundModel {
    width: u32,
    height: u32,
    n_mixtures: usize,
    history: usize,
    detect_shadows: bool,
    shadow_threshold: f32,
    frames_seen: usize,
    mixtures: Vec<Gaussian>,
}

impl BackgroundModel {
    pub fn new(width: u32, height: u32, config: &DetectorConfig) -> Self {
        let n_mixtures = config.n_mixtures.max(1);

        Self {
            width,
            height,
            n_mixtures,
            history: config.history.max(1),
            detect_shadows: config.detect_shadows,
            shadow_threshold: config.shadow_threshold,
            frames_seen: 0,
            mixtures: vec![Gaussian::default(); (width * height) as usize * n_mixtures],
        }
    }

    /// Learn from the frame and label every pixel: 0 background,
    /// `SHADOW_VALUE` shadow, 255 foreground.
    pub fn apply(&mut self, frame: &GrayImage) -> GrayImage {
        debug_assert_eq!((frame.width(), frame.height()), (self.width, self.height));

        self.frames_seen += 1;
        let alpha = 1.0 / self.frames_seen.min(self.history) as f32;
        trace!(frame = self.frames_seen, alpha, "background update");

        let mut mask = GrayImage::new(self.width, self.height);
        let k = self.n_mixtures;

        for (i, (out, px)) in mask.pixels_mut().zip(frame.pixels()).enumerate() {
            let components = &mut self.mixtures[i * k..(i + 1) * k];
            out[0] = classify_and_update(
                components,
                px[0] as f32,
                alpha,
                self.detect_shadows,
                self.shadow_threshold,
            );
        }

        mask
    }
}

fn classify_and_update(
    components: &mut [Gaussian],
    value: f32,
    alpha: f32,
    detect_shadows: bool,
    shadow_threshold: f32,
) -> u8 {
    let total: f32 = components.iter().map(|c| c.weight).sum();

    // The very first observation seeds the model and counts as background
    // while the estimate settles.
    if total == 0.0 {
        components[0] = Gaussian {
            weight: 1.0,
            mean: value,
            variance: INITIAL_VARIANCE,
        };
        return 0;
    }

    // Leading components whose cumulative weight crosses the ratio model
    // the background; the tail holds transient foreground evidence.
    let mut cumulative = 0.0;
    let mut n_background = components.len();
    for (idx, c) in components.iter().enumerate() {
        cumulative += c.weight;
        if cumulative > BACKGROUND_RATIO {
            n_background = idx + 1;
            break;
        }
    }

    let matched = components.iter().position(|c| c.matches(value));

    match matched {
        Some(idx) => {
            for (ci, c) in components.iter_mut().enumerate() {
                let hit = if ci == idx { 1.0 } else { 0.0 };
                c.weight += alpha * (hit - c.weight);
            }

            let c = &mut components[idx];
            c.mean += alpha * (value - c.mean);
            let deviation = value - c.mean;
            c.variance = (c.variance + alpha * (deviation * deviation - c.variance)).max(MIN_VARIANCE);
        }
        None => {
            // Nothing explains this intensity: the weakest component is
            // sacrificed for a fresh wide Gaussian centered on it.
            let last = components.len() - 1;
            components[last] = Gaussian {
                weight: INITIAL_WEIGHT,
                mean: value,
                variance: INITIAL_VARIANCE,
            };
        }
    }

    normalize(components);
    components.sort_by(|a, b| {
        b.fitness()
            .partial_cmp(&a.fitness())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if matched.map_or(false, |idx| idx < n_background) {
        return 0;
    }

    if detect_shadows {
        let dominant = components[0];
        if dominant.weight > 0.0
            && value < dominant.mean
            && value > shadow_threshold * dominant.mean
        {
            return SHADOW_VALUE;
        }
    }

    FOREGROUND_VALUE
}

fn normalize(components: &mut [Gaussian]) {
    let total: f32 = components.iter().map(|c| c.weight).sum();
    if total > 0.0 {
        for c in components.iter_mut() {
            c.weight /= total;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform(w: u32, h: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([value]))
    }

    #[test]
    fn static_scene_stays_background() {
        let mut model = BackgroundModel::new(8, 8, &DetectorConfig::default());

        for _ in 0..10 {
            let mask = model.apply(&uniform(8, 8, 30));
            assert!(mask.pixels().all(|p| p[0] == 0));
        }
    }

    #[test]
    fn novel_object_is_foreground() {
        let mut model = BackgroundModel::new(16, 16, &DetectorConfig::default());
        for _ in 0..10 {
            model.apply(&uniform(16, 16, 30));
        }

        let mut frame = uniform(16, 16, 30);
        for y in 4..10 {
            for x in 4..10 {
                frame.put_pixel(x, y, Luma([240]));
            }
        }

        let mask = model.apply(&frame);

        assert_eq!(mask.get_pixel(6, 6)[0], 255);
        assert_eq!(mask.get_pixel(1, 1)[0], 0);
    }

    #[test]
    fn darkened_pixels_are_labeled_shadow() {
        let mut model = BackgroundModel::new(4, 4, &DetectorConfig::default());
        for _ in 0..20 {
            model.apply(&uniform(4, 4, 200));
        }

        let mask = model.apply(&uniform(4, 4, 120));

        assert!(mask.pixels().all(|p| p[0] == SHADOW_VALUE));
    }

    #[test]
    fn shadow_labeling_can_be_disabled() {
        let config = DetectorConfig {
            detect_shadows: false,
            ..DetectorConfig::default()
        };

        let mut model = BackgroundModel::new(4, 4, &config);
        for _ in 0..20 {
            model.apply(&uniform(4, 4, 200));
        }

        let mask = model.apply(&uniform(4, 4, 120));

        assert!(mask.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn revealed_background_is_recognized_again() {
        let mut model = BackgroundModel::new(4, 4, &DetectorConfig::default());
        for _ in 0..10 {
            model.apply(&uniform(4, 4, 30));
        }

        model.apply(&uniform(4, 4, 240));
        let mask = model.apply(&uniform(4, 4, 30));

        assert!(mask.pixels().all(|p| p[0] == 0));
    }
}

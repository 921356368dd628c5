use munkres::{solve_assignment, WeightMatrix};
use nalgebra as na;
use tracing::{debug, trace, warn};

use crate::config::TrackerConfig;
use crate::detection::Detection;
use crate::error::Error;
use crate::track::{Track, TrackingOutput};

/// Weight of the padding cells that square up a rectangular cost matrix.
const PAD_WEIGHT: f32 = 1e6;

/// Associates per-frame detections with a pool of tracked identities and
/// manages their birth, survival and death.
pub struct MultiObjectTracker {
    config: TrackerConfig,
    frame_width: u32,
    frame_height: u32,
    tracks: Vec<Track>,
    next_id: u64,
    cost: Vec<f32>,
    outputs: Vec<TrackingOutput>,
}

impl MultiObjectTracker {
    pub fn new(frame_width: u32, frame_height: u32, config: TrackerConfig) -> Self {
        Self {
            config,
            frame_width,
            frame_height,
            tracks: Vec::new(),
            next_id: 1,
            cost: Vec::new(),
            outputs: Vec::new(),
        }
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Run one frame through association, lifecycle and estimation.
    /// Returns the smoothed prediction of every visible track.
    pub fn update(&mut self, detections: &[Detection]) -> &[TrackingOutput] {
        self.outputs.clear();

        if detections.is_empty() {
            self.update_without_detections();
            return &self.outputs;
        }

        if self.tracks.is_empty() {
            for det in detections {
                self.spawn(det.centroid());
            }
        }

        let mut assigned = match self.associate(detections) {
            Ok(assigned) => assigned,
            Err(err) => {
                warn!(%err, "treating every track as unmatched this frame");
                vec![None; self.tracks.len()]
            }
        };

        self.gate(detections, &mut assigned);
        self.occlusion_tolerance(detections, &assigned);
        self.evict(&mut assigned);
        self.spawn_unassigned(detections, &assigned);
        self.correct_filters(detections, &mut assigned);
        self.emit();

        &self.outputs
    }

    /// Nothing was observed: every track misses a frame, the stale ones
    /// die, and the visible survivors coast on prediction alone.
    fn update_without_detections(&mut self) {
        for track in &mut self.tracks {
            track.no_update_this_frame();
        }

        let threshold = self.config.missed_frames_threshold;
        self.tracks.retain(|t| {
            if t.missed_frames() > threshold {
                debug!(id = t.id(), "track died");
                return false;
            }
            true
        });

        for track in &mut self.tracks {
            if track.lifetime() > self.config.lifetime_threshold {
                track.predict();
                self.outputs.push(track.output());
            }
        }
    }

    fn spawn(&mut self, centroid: na::Point2<f32>) {
        debug!(id = self.next_id, x = centroid.x, y = centroid.y, "track born");
        self.tracks
            .push(Track::new(self.next_id, centroid, &self.config));
        self.next_id += 1;
    }

    /// Minimum-cost one-to-one pairing of track predictions to detection
    /// centroids. The matrix is padded square so the longer side's extras
    /// stay unassigned.
    fn associate(&mut self, detections: &[Detection]) -> Result<Vec<Option<usize>>, Error> {
        let n_tracks = self.tracks.len();
        let n_dets = detections.len();
        let n = n_tracks.max(n_dets);

        self.cost.clear();
        self.cost.resize(n_tracks * n_dets, 0.0);
        for (i, track) in self.tracks.iter().enumerate() {
            let predicted = track.latest_prediction();
            for (j, det) in detections.iter().enumerate() {
                self.cost[i * n_dets + j] = na::distance(&predicted, &det.centroid());
            }
        }

        let cost = &self.cost;
        let mut weights = WeightMatrix::from_fn(n, |(row, column)| {
            if row < n_tracks && column < n_dets {
                cost[row * n_dets + column]
            } else {
                PAD_WEIGHT
            }
        });

        let positions = solve_assignment(&mut weights).map_err(|_| Error::Assignment {
            rows: n_tracks,
            cols: n_dets,
        })?;

        let mut assigned = vec![None; n_tracks];
        for p in positions {
            if p.row < n_tracks && p.column < n_dets {
                assigned[p.row] = Some(p.column);
            }
        }

        Ok(assigned)
    }

    /// Reject pairings farther apart than the frame-relative distance gate.
    /// Every track left without a detection counts a missed frame.
    fn gate(&mut self, detections: &[Detection], assigned: &mut [Option<usize>]) {
        let frame_dimension = 0.5 * (self.frame_height as f32 + self.frame_width as f32);
        let gate = self.config.distance_fraction * frame_dimension;
        let n_dets = detections.len();

        for (i, slot) in assigned.iter_mut().enumerate() {
            if let Some(j) = *slot {
                let cost = self.cost[i * n_dets + j];
                if cost > gate {
                    trace!(track = self.tracks[i].id(), cost, gate, "pairing rejected");
                    *slot = None;
                }
            }

            if slot.is_none() {
                self.tracks[i].no_update_this_frame();
            }
        }
    }

    /// A track without a detection whose prediction falls inside some
    /// detection's bounding box still counts as updated: two occluding
    /// objects collapse into a single blob until they separate.
    fn occlusion_tolerance(&mut self, detections: &[Detection], assigned: &[Option<usize>]) {
        for (i, slot) in assigned.iter().enumerate() {
            if slot.is_some() {
                continue;
            }

            let predicted = self.tracks[i].latest_prediction();
            if detections.iter().any(|det| det.bbox.contains(predicted)) {
                trace!(track = self.tracks[i].id(), "occlusion tolerance update");
                self.tracks[i].got_update();
            }
        }
    }

    /// Drop tracks that went unseen for too long, keeping the assignment
    /// vector aligned with the surviving pool.
    fn evict(&mut self, assigned: &mut Vec<Option<usize>>) {
        let threshold = self.config.missed_frames_threshold;

        let mut i = 0;
        while i < self.tracks.len() {
            if self.tracks[i].missed_frames() > threshold {
                debug!(id = self.tracks[i].id(), "track died");
                self.tracks.remove(i);
                assigned.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Every detection nobody claimed becomes a new track. Newborns skip
    /// the rest of this frame's update loop.
    fn spawn_unassigned(&mut self, detections: &[Detection], assigned: &[Option<usize>]) {
        for (j, det) in detections.iter().enumerate() {
            if !assigned.iter().any(|slot| *slot == Some(j)) {
                self.spawn(det.centroid());
            }
        }
    }

    /// Advance every pre-birth survivor one step and fold in its detection,
    /// or its own prediction when it has none. A filter whose update
    /// diverges is destroyed on the spot.
    fn correct_filters(&mut self, detections: &[Detection], assigned: &mut Vec<Option<usize>>) {
        let mut i = 0;
        while i < assigned.len() {
            let track = &mut self.tracks[i];
            track.predict();

            let result = match assigned[i] {
                Some(j) => {
                    let result = track.correct(detections[j].centroid());
                    if result.is_ok() {
                        track.got_update();
                    }
                    result
                }
                None => track.correct_no_obs(),
            };

            match result {
                Ok(()) => i += 1,
                Err(err) => {
                    warn!(id = track.id(), %err, "destroying track after filter failure");
                    self.tracks.remove(i);
                    assigned.remove(i);
                }
            }
        }
    }

    fn emit(&mut self) {
        for track in &self.tracks {
            if track.lifetime() > self.config.lifetime_threshold {
                self.outputs.push(track.output());
            }
        }
    }
}

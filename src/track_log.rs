use serde_derive::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::error::Error;
use crate::track::TrackingOutput;

/// One logged position sample.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

/// Accumulates emitted positions keyed by frame number and serializes the
/// whole run as one JSON object with a frame-dimension header. File
/// handling stays with the caller.
#[derive(Serialize, Debug, Default)]
pub struct TrackLog {
    width: u32,
    height: u32,
    frames: BTreeMap<u64, Vec<TrackPoint>>,
}

impl TrackLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_dimensions(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    pub fn add_track(&mut self, id: u64, x: f32, y: f32, frame: u64) {
        self.frames
            .entry(frame)
            .or_default()
            .push(TrackPoint { id, x, y });
    }

    /// Record every emission of one frame.
    pub fn add_frame(&mut self, frame: u64, outputs: &[TrackingOutput]) {
        for out in outputs {
            self.add_track(out.id, out.position.x, out.position.y, frame);
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        let json = self.to_json()?;
        writer.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_frames_under_string_keys() {
        let mut log = TrackLog::new();
        log.set_dimensions(640, 480);
        log.add_track(1, 10.5, 20.0, 3);
        log.add_track(2, 30.0, 40.0, 3);
        log.add_track(1, 11.0, 21.0, 4);

        let value: serde_json::Value =
            serde_json::from_str(&log.to_json().unwrap()).unwrap();

        assert_eq!(value["width"], 640);
        assert_eq!(value["height"], 480);
        assert_eq!(value["frames"]["3"].as_array().unwrap().len(), 2);
        assert_eq!(value["frames"]["3"][0]["id"], 1);
        assert_eq!(value["frames"]["4"][0]["x"], 11.0);
    }

    #[test]
    fn write_to_produces_the_same_bytes() {
        let mut log = TrackLog::new();
        log.add_track(7, 1.0, 2.0, 1);

        let mut buffer = Vec::new();
        log.write_to(&mut buffer).unwrap();

        assert_eq!(String::from_utf8(buffer).unwrap(), log.to_json().unwrap());
    }
}

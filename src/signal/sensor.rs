use super::block::BlockRing;
use crate::track::CoasterTrack;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    /// The train crossed into a block.
    TrainEnter,
    /// The train approaches the end of a block and asks whether it may leave.
    BlockCheck,
    /// Forwarded to listeners only.
    Generic,
}

/// A trigger at a fixed global track parameter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SensorEvent {
    pub t: f32,
    pub kind: SensorKind,
    pub label: String,
}

impl SensorEvent {
    pub fn new(t: f32, kind: SensorKind, label: impl Into<String>) -> Self {
        Self {
            t,
            kind,
            label: label.into(),
        }
    }
}

/// Sorts sensors by parameter. Non-finite parameters are dropped.
pub fn sort_sensors(sensors: &mut Vec<SensorEvent>) {
    sensors.retain(|s| s.t.is_finite());
    sensors.sort_by(|a, b| a.t.total_cmp(&b.t));
}

/// Sensors strictly inside `(t0, t1)`, in increasing order. `sensors` must be sorted.
pub fn sensors_in_window(sensors: &[SensorEvent], t0: f32, t1: f32) -> &[SensorEvent] {
    if t0.is_nan() || t1.is_nan() || t1 <= t0 {
        return &[];
    }
    let lo = sensors.partition_point(|s| s.t <= t0);
    let hi = sensors.partition_point(|s| s.t < t1);
    &sensors[lo..hi.max(lo)]
}

/// One enter sensor just past the start of every block and one check sensor
/// just before its end, `margin` parameter units inside the block.
pub fn auto_place_sensors(track: &CoasterTrack, ring: &BlockRing, margin: f32) -> Vec<SensorEvent> {
    let mut sensors = Vec::with_capacity(ring.len() * 2);
    for (b, block) in ring.blocks().iter().enumerate() {
        if let Some(start) = block.first().and_then(|s| track.start_of(s)) {
            sensors.push(SensorEvent::new(
                start + margin,
                SensorKind::TrainEnter,
                format!("{} enter", block.name),
            ));
        } else {
            log::warn!("block {b} has no resolvable first section, no enter sensor placed");
        }

        let end = block.last().and_then(|s| {
            let start = track.start_of(s)?;
            track.section(s).map(|section| start + section.t_max())
        });
        match end {
            Some(end) => sensors.push(SensorEvent::new(
                end - margin,
                SensorKind::BlockCheck,
                format!("{} check", block.name),
            )),
            None => log::warn!("block {b} has no resolvable last section, no check sensor placed"),
        }
    }
    sort_sensors(&mut sensors);
    sensors
}

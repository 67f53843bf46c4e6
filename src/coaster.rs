use crate::error::SignalResult;
use crate::signal::{BlockController, BlockRing};
use crate::track::{CoasterTrack, TrackSection};
use crate::train::Train;

/// One track with its trains and, optionally, the block controller guarding them.
///
/// All mutation happens through `tick` and the explicit setters, so the
/// controller's occupancy always matches the trains it placed.
#[derive(Debug, Default)]
pub struct Coaster {
    track: CoasterTrack,
    trains: Vec<Train>,
    controller: Option<BlockController>,
    clock: f64,
}

impl Coaster {
    /// Unsignaled coaster. Every train is placed where its `t_global` points.
    pub fn new(track: CoasterTrack, mut trains: Vec<Train>) -> Self {
        for train in &mut trains {
            train.place_on_track(&track);
        }
        Self {
            track,
            trains,
            controller: None,
            clock: 0.0,
        }
    }

    /// Hands the trains to `controller`, which places them at their start blocks.
    pub fn with_controller(mut self, mut controller: BlockController) -> Self {
        controller.place_trains(&mut self.track, &mut self.trains);
        self.controller = Some(controller);
        self
    }

    pub fn track(&self) -> &CoasterTrack {
        &self.track
    }

    /// Runtime access to the track, e.g. for section physics. Geometry
    /// changes with a controller attached should use `reset_track`.
    pub fn track_mut(&mut self) -> &mut CoasterTrack {
        &mut self.track
    }

    pub fn trains(&self) -> &[Train] {
        &self.trains
    }

    pub fn controller(&self) -> Option<&BlockController> {
        self.controller.as_ref()
    }

    pub fn controller_mut(&mut self) -> Option<&mut BlockController> {
        self.controller.as_mut()
    }

    /// Seconds simulated so far.
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Trains move in declaration order. Sensors swept by each train then
    /// fire, and station holds that ran out are released.
    pub fn tick(&mut self, dt: f32) {
        self.clock += f64::from(dt);

        let track = &self.track;
        let windows: Vec<(f32, f32)> = self
            .trains
            .iter_mut()
            .filter_map(|train| train.tick(track, dt))
            .collect();

        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        let t_max = self.track.t_max();
        for (t0, t1) in windows {
            controller.trigger_events(&mut self.track, t0, t1, self.clock);
            if self.track.is_closed() && t1 > t_max {
                controller.trigger_events(&mut self.track, t0 - t_max, t1 - t_max, self.clock);
            }
        }
        controller.update(&mut self.track, self.clock);
    }

    /// Replaces the track geometry. With a controller, the block ring must
    /// still cover the new sections. On error nothing changes.
    pub fn reset_track(&mut self, sections: Vec<TrackSection>) -> SignalResult<()> {
        if let Some(controller) = &self.controller {
            BlockRing::coverage(controller.ring().blocks(), sections.len())?;
        }
        self.track.reset(sections);

        match self.controller.as_mut() {
            Some(controller) => controller.reset_track(&mut self.track, &mut self.trains)?,
            None => {
                for train in &mut self.trains {
                    train.place_on_track(&self.track);
                }
            }
        }
        log::debug!(
            "track reset: {} sections, t_max = {:.3}",
            self.track.len(),
            self.track.t_max()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BlockSection, SignalConfig};
    use crate::sim::{Float3, SectionPhysics, TrainParams};
    use approx::assert_relative_eq;

    fn straight() -> TrackSection {
        TrackSection::new(vec![Float3::ZERO, Float3::new(0.0, 0.0, 10.0)])
            .with_physics(SectionPhysics::drive(4.0, 6.0, 5.0))
    }

    /// Level circle of `n` driven three-point arcs.
    fn circle(n: usize, radius: f32) -> CoasterTrack {
        let step = std::f32::consts::TAU / n as f32;
        let point = |a: f32| Float3::new(radius * (1.0 - a.cos()), 0.0, radius * a.sin());
        let sections = (0..n)
            .map(|i| {
                let a = i as f32 * step;
                TrackSection::new(vec![point(a), point(a + 0.5 * step), point(a + step)])
                    .with_physics(SectionPhysics::drive(4.0, 6.0, 5.0))
            })
            .collect();
        CoasterTrack::new(sections, true)
    }

    fn signaled(blocks: usize, trains: usize) -> Coaster {
        let track = circle(blocks, 20.0);
        let ring = BlockRing::new(
            (0..blocks)
                .map(|i| BlockSection::new(format!("b{i}"), vec![i]))
                .collect(),
            blocks,
        )
        .unwrap();
        let controller = BlockController::new(ring, SignalConfig::default())
            .with_auto_sensors(&track)
            .with_stations([0]);
        let trains = (0..trains)
            .map(|_| Train::new(TrainParams::default(), [0.0, 1.0]))
            .collect();
        Coaster::new(track, trains).with_controller(controller)
    }

    #[test]
    fn clock_advances_without_controller() {
        let track = CoasterTrack::new(vec![straight()], false);
        let mut coaster = Coaster::new(track, vec![Train::new(TrainParams::default(), [0.0])]);
        coaster.tick(0.25);
        coaster.tick(0.25);
        assert_relative_eq!(coaster.clock(), 0.5);
        assert!(coaster.controller().is_none());
    }

    #[test]
    fn lone_train_laps_and_keeps_occupancy() {
        let mut coaster = signaled(3, 1);
        let mut laps = 0;
        let mut last = coaster.trains()[0].t_global;
        for _ in 0..4000 {
            coaster.tick(0.02);
            let t = coaster.trains()[0].t_global;
            if t < last {
                laps += 1;
            }
            last = t;
            let free = coaster.controller().unwrap().occupancy().free_count();
            assert_eq!(free, 2);
        }
        assert!(laps >= 1);
    }

    #[test]
    fn reset_with_mismatched_ring_changes_nothing() {
        let mut coaster = signaled(3, 1);
        let t_max = coaster.track().t_max();
        assert!(coaster.reset_track(vec![straight()]).is_err());
        assert_eq!(coaster.track().t_max(), t_max);
        assert_eq!(coaster.track().len(), 3);
    }

    #[test]
    fn reset_replaces_trains() {
        let mut coaster = signaled(3, 1);
        for _ in 0..50 {
            coaster.tick(0.02);
        }
        let wider = circle(3, 30.0).sections().to_vec();
        coaster.reset_track(wider).unwrap();
        assert_relative_eq!(coaster.track().t_max(), 6.0);
        assert_relative_eq!(coaster.trains()[0].t_global, 1.95, epsilon = 1e-5);
        assert_eq!(coaster.trains()[0].velocity, 0.0);
    }
}

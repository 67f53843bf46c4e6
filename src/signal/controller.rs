use std::fmt;

use super::block::{BlockRing, Occupancy};
use super::sensor::{auto_place_sensors, sensors_in_window, sort_sensors, SensorEvent, SensorKind};
use crate::error::SignalResult;
use crate::track::CoasterTrack;
use crate::train::Train;

/// Hooks for scripted behaviour. Both default to doing nothing.
pub trait SignalListener {
    /// A train entered `block`, after the occupancy transition.
    fn on_section_entered(&mut self, _block: usize) {}

    /// Called for every fired sensor, after the controller handled it.
    fn on_sensor(&mut self, _event: &SensorEvent) {}
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalConfig {
    /// Seconds a train is held at a station before it may leave.
    pub station_dwell_seconds: f64,
    /// Parameter distance of auto-placed sensors from block boundaries.
    pub sensor_margin: f32,
    /// Parameter distance of startup positions from the block end.
    pub placement_margin: f32,
}

impl SignalConfig {
    pub const DEFAULT: Self = Self {
        station_dwell_seconds: 10.0,
        sensor_margin: 0.25,
        placement_margin: 0.05,
    };
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mutual-exclusion signaling over a ring of blocks.
///
/// The controller owns the authoritative `Occupancy` and writes
/// `physics_active` and `stop_train` on the track sections of each block. At
/// most one train is ever allowed into a block: a train stops at the end of
/// its block until the next block is free.
pub struct BlockController {
    ring: BlockRing,
    occupancy: Occupancy,
    sensors: Vec<SensorEvent>,
    auto_sensors: bool,
    stations: Vec<usize>,
    dwell: Vec<Option<f64>>,
    listeners: Vec<Box<dyn SignalListener>>,
    config: SignalConfig,
}

impl fmt::Debug for BlockController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockController")
            .field("ring", &self.ring)
            .field("occupancy", &self.occupancy)
            .field("sensors", &self.sensors.len())
            .field("stations", &self.stations)
            .field("dwell", &self.dwell)
            .field("listeners", &self.listeners.len())
            .field("config", &self.config)
            .finish()
    }
}

impl BlockController {
    pub fn new(ring: BlockRing, config: SignalConfig) -> Self {
        let occupancy = Occupancy::all_free(&ring);
        let dwell = vec![None; ring.len()];
        Self {
            ring,
            occupancy,
            sensors: Vec::new(),
            auto_sensors: false,
            stations: Vec::new(),
            dwell,
            listeners: Vec::new(),
            config,
        }
    }

    pub fn with_sensors(mut self, sensors: Vec<SensorEvent>) -> Self {
        self.sensors = sensors;
        sort_sensors(&mut self.sensors);
        self
    }

    /// Replaces the sensors with an enter and a check sensor per block. They
    /// are placed again whenever the track is reset.
    pub fn with_auto_sensors(mut self, track: &CoasterTrack) -> Self {
        self.sensors = auto_place_sensors(track, &self.ring, self.config.sensor_margin);
        self.auto_sensors = true;
        self
    }

    /// Marks blocks as stations. Unknown block indices are ignored.
    pub fn with_stations(mut self, stations: impl IntoIterator<Item = usize>) -> Self {
        let len = self.ring.len();
        self.stations = stations
            .into_iter()
            .filter(|&b| {
                let known = b < len;
                if !known {
                    log::warn!("station block {b} is not part of the ring, ignored");
                }
                known
            })
            .collect();
        self
    }

    pub fn add_listener(&mut self, listener: Box<dyn SignalListener>) {
        self.listeners.push(listener);
    }

    pub fn add_sensor(&mut self, sensor: SensorEvent) {
        self.sensors.push(sensor);
        sort_sensors(&mut self.sensors);
    }

    pub fn ring(&self) -> &BlockRing {
        &self.ring
    }

    pub fn occupancy(&self) -> &Occupancy {
        &self.occupancy
    }

    pub fn sensors(&self) -> &[SensorEvent] {
        &self.sensors
    }

    pub fn stations(&self) -> &[usize] {
        &self.stations
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn is_station(&self, block: usize) -> bool {
        self.stations.contains(&block)
    }

    /// Whether a station hold is pending on `block`.
    pub fn is_dwelling(&self, block: usize) -> bool {
        self.dwell.get(block).is_some_and(Option::is_some)
    }

    /// Pending station deadline of `block`.
    pub fn dwell_deadline(&self, block: usize) -> Option<f64> {
        self.dwell.get(block).copied().flatten()
    }

    pub fn cancel_timers(&mut self) {
        self.dwell.iter_mut().for_each(|d| *d = None);
    }

    /// Startup placement.
    ///
    /// Train 0 waits at the end of block 0, train `k` at the end of block
    /// `n - k`. Every train starts at rest with its block's exit closed, then
    /// the first station is released. Placing a train occupies its block
    /// without freeing the one behind it.
    pub fn place_trains(&mut self, track: &mut CoasterTrack, trains: &mut [Train]) {
        self.cancel_timers();
        self.occupancy = Occupancy::all_free(&self.ring);

        let n = self.ring.len();
        if trains.len() > n {
            log::warn!(
                "{} trains on a ring of {n} blocks, only the first {n} are placed",
                trains.len()
            );
        }

        for (k, train) in trains.iter_mut().take(n).enumerate() {
            let block = if k == 0 { 0 } else { n - k };
            let Some(last) = self.ring.block(block).and_then(|b| b.last()) else {
                continue;
            };
            let Some(end) = track
                .start_of(last)
                .zip(track.section(last))
                .map(|(start, section)| start + section.t_max())
            else {
                log::warn!("block {block} ends on missing section {last}, train {k} not placed");
                continue;
            };

            train.t_global = end - self.config.placement_margin;
            train.velocity = 0.0;
            train.place_on_track(track);
            self.admit(track, block, |occ, _, b| occ.occupy(b));
            if let Some(section) = track.section_mut(last) {
                section.physics.stop_train = true;
            }
        }

        if let Some(&station) = self.stations.first() {
            if let Some(section) = self.last_section_mut(track, station) {
                section.physics.stop_train = false;
            }
        }
    }

    /// Fires the sensors strictly inside `(t0, t1)` in increasing order.
    /// Returns how many fired.
    pub fn trigger_events(&mut self, track: &mut CoasterTrack, t0: f32, t1: f32, now: f64) -> usize {
        let fired: Vec<SensorEvent> = sensors_in_window(&self.sensors, t0, t1).to_vec();
        for event in &fired {
            log::debug!("sensor '{}' ({:?}) at t = {:.4}", event.label, event.kind, event.t);

            let block = track
                .resolve(event.t)
                .and_then(|(section, _)| self.ring.block_of(section));
            match (event.kind, block) {
                (SensorKind::TrainEnter, Some(block)) => self.on_train_enter(track, block),
                (SensorKind::BlockCheck, Some(block)) => self.check_block(track, block, now),
                (SensorKind::TrainEnter | SensorKind::BlockCheck, None) => log::warn!(
                    "sensor '{}' at t = {:.4} lies outside every block",
                    event.label,
                    event.t
                ),
                (SensorKind::Generic, _) => {}
            }

            for listener in &mut self.listeners {
                listener.on_sensor(event);
            }
        }
        fired.len()
    }

    /// A train entered `block`: occupies it, frees the one behind and lets
    /// the train two blocks behind move up.
    pub fn on_train_enter(&mut self, track: &mut CoasterTrack, block: usize) {
        self.admit(track, block, Occupancy::enter);
    }

    fn admit(
        &mut self,
        track: &mut CoasterTrack,
        block: usize,
        transition: impl FnOnce(&Occupancy, &BlockRing, usize) -> Occupancy,
    ) {
        if block >= self.ring.len() {
            return;
        }
        self.occupancy = transition(&self.occupancy, &self.ring, block);
        log::debug!(
            "train entered block {block}, {} of {} blocks free",
            self.occupancy.free_count(),
            self.ring.len()
        );

        self.activate(track, block);
        let behind = self.ring.prev(self.ring.prev(block));
        self.activate(track, behind);

        for listener in &mut self.listeners {
            listener.on_section_entered(block);
        }
    }

    /// The train nears the end of `block`: it may only leave when the next
    /// block is free, and a station holds it for the dwell time.
    pub fn check_block(&mut self, track: &mut CoasterTrack, block: usize, now: f64) {
        let next_free = self.occupancy.is_free(self.ring.next(block));
        let station = self.is_station(block);
        if let Some(section) = self.last_section_mut(track, block) {
            section.physics.stop_train = !next_free || station;
            section.physics.physics_active = true;
        }
        if station {
            let until = now + self.config.station_dwell_seconds;
            if let Some(deadline) = self.dwell.get_mut(block) {
                *deadline = Some(until);
                log::debug!("station block {block} holding until {until:.2}");
            }
        }
    }

    /// Releases every station whose dwell has run out, if its exit is free.
    pub fn update(&mut self, track: &mut CoasterTrack, now: f64) {
        for block in 0..self.dwell.len() {
            if self.dwell[block].is_some_and(|deadline| deadline <= now) {
                self.dwell[block] = None;
                let next_free = self.occupancy.is_free(self.ring.next(block));
                if let Some(section) = self.last_section_mut(track, block) {
                    section.physics.stop_train = !next_free;
                }
                log::debug!("station block {block} dwell over, next block free: {next_free}");
            }
        }
    }

    /// Validates the ring against a rebuilt track, cancels every hold and
    /// places the trains again.
    pub fn reset_track(&mut self, track: &mut CoasterTrack, trains: &mut [Train]) -> SignalResult<()> {
        self.ring.revalidate(track.len())?;
        if self.auto_sensors {
            self.sensors = auto_place_sensors(track, &self.ring, self.config.sensor_margin);
        }
        self.place_trains(track, trains);
        Ok(())
    }

    /// Opens every section of `block` unless a station hold is pending.
    fn activate(&self, track: &mut CoasterTrack, block: usize) {
        if self.is_dwelling(block) {
            return;
        }
        let Some(b) = self.ring.block(block) else {
            return;
        };
        for &index in &b.sections {
            if let Some(section) = track.section_mut(index) {
                section.physics.physics_active = true;
                section.physics.stop_train = false;
            }
        }
    }

    fn last_section_mut<'t>(
        &self,
        track: &'t mut CoasterTrack,
        block: usize,
    ) -> Option<&'t mut crate::track::TrackSection> {
        let last = self.ring.block(block)?.last()?;
        track.section_mut(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BlockSection, BlockState};
    use crate::sim::{Float3, SectionPhysics, TrainParams};
    use crate::track::TrackSection;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Level circle of `n` three-point arcs, each spanning two parameter units.
    fn circle(n: usize) -> CoasterTrack {
        let radius = 20.0;
        let step = std::f32::consts::TAU / n as f32;
        let point = |a: f32| Float3::new(radius * (1.0 - a.cos()), 0.0, radius * a.sin());
        let sections = (0..n)
            .map(|i| {
                let a = i as f32 * step;
                TrackSection::new(vec![point(a), point(a + 0.5 * step), point(a + step)])
                    .with_physics(SectionPhysics::drive(2.0, 3.0, 4.0))
            })
            .collect();
        CoasterTrack::new(sections, true)
    }

    /// Circle of `n` one-section blocks, block 0 a station.
    fn setup(n: usize) -> (CoasterTrack, BlockController) {
        let track = circle(n);
        let blocks = (0..n)
            .map(|i| BlockSection::new(format!("b{i}"), vec![i]))
            .collect();
        let ring = BlockRing::new(blocks, n).unwrap();
        let controller = BlockController::new(ring, SignalConfig::default())
            .with_auto_sensors(&track)
            .with_stations([0]);
        (track, controller)
    }

    fn trains(count: usize) -> Vec<Train> {
        (0..count)
            .map(|_| Train::new(TrainParams::default(), [0.0, 2.0]))
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        entered: Rc<RefCell<Vec<usize>>>,
        sensors: Rc<RefCell<Vec<String>>>,
    }

    impl SignalListener for Recorder {
        fn on_section_entered(&mut self, block: usize) {
            self.entered.borrow_mut().push(block);
        }

        fn on_sensor(&mut self, event: &SensorEvent) {
            self.sensors.borrow_mut().push(event.label.clone());
        }
    }

    #[test]
    fn startup_places_trains_at_block_ends() {
        let (mut track, mut controller) = setup(4);
        let mut trains = trains(2);
        controller.place_trains(&mut track, &mut trains);

        assert_relative_eq!(trains[0].t_global, 1.95, epsilon = 1e-5);
        assert_relative_eq!(trains[1].t_global, 7.95, epsilon = 1e-5);
        assert_eq!(trains[0].velocity, 0.0);

        let occ = controller.occupancy();
        assert_eq!(occ.state(0), BlockState::Occupied);
        assert_eq!(occ.state(3), BlockState::Occupied);
        assert_eq!(occ.free_count(), 2);

        // the station is released, the other train waits
        assert!(!track.section(0).unwrap().physics.stop_train);
        assert!(track.section(3).unwrap().physics.stop_train);
    }

    #[test]
    fn surplus_trains_are_not_placed() {
        let (mut track, mut controller) = setup(2);
        let mut trains = trains(3);
        trains[2].t_global = 0.3;
        controller.place_trains(&mut track, &mut trains);
        assert_eq!(trains[2].t_global, 0.3);
        assert_eq!(controller.occupancy().free_count(), 0);
    }

    #[test]
    fn enter_activates_block_and_two_behind() {
        let (mut track, mut controller) = setup(4);
        for i in 0..4 {
            track.section_mut(i).unwrap().physics.stop_train = true;
        }
        controller.on_train_enter(&mut track, 2);
        assert!(!track.section(2).unwrap().physics.stop_train);
        assert!(!track.section(0).unwrap().physics.stop_train);
        assert!(track.section(1).unwrap().physics.stop_train);
        assert!(track.section(3).unwrap().physics.stop_train);
    }

    #[test]
    fn check_block_stops_before_occupied_block() {
        let (mut track, mut controller) = setup(3);
        controller.on_train_enter(&mut track, 2);
        controller.check_block(&mut track, 1, 0.0);
        assert!(track.section(1).unwrap().physics.stop_train);

        controller.check_block(&mut track, 2, 0.0);
        // block 0 is free
        assert!(!track.section(2).unwrap().physics.stop_train);
        assert!(track.section(2).unwrap().physics.physics_active);
    }

    #[test]
    fn station_holds_for_dwell_then_releases() {
        let (mut track, mut controller) = setup(3);
        controller.check_block(&mut track, 0, 5.0);
        assert!(track.section(0).unwrap().physics.stop_train);
        assert_eq!(controller.dwell_deadline(0), Some(15.0));

        // activation is suppressed during the hold
        controller.on_train_enter(&mut track, 2);
        assert!(track.section(0).unwrap().physics.stop_train);

        controller.update(&mut track, 14.9);
        assert!(controller.is_dwelling(0));
        controller.update(&mut track, 15.0);
        assert!(!controller.is_dwelling(0));
        assert!(!track.section(0).unwrap().physics.stop_train);
    }

    #[test]
    fn dwell_expiry_keeps_stop_when_next_is_occupied() {
        let (mut track, mut controller) = setup(3);
        controller.on_train_enter(&mut track, 1);
        controller.check_block(&mut track, 0, 0.0);
        controller.update(&mut track, 10.0);
        assert!(track.section(0).unwrap().physics.stop_train);
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let (mut track, mut controller) = setup(3);
        controller.check_block(&mut track, 0, 0.0);
        controller.cancel_timers();
        controller.update(&mut track, 100.0);
        assert!(track.section(0).unwrap().physics.stop_train);
    }

    #[test]
    fn events_fire_in_order_and_reach_listeners() {
        let (mut track, mut controller) = setup(3);
        let recorder = Recorder::default();
        let entered = Rc::clone(&recorder.entered);
        let sensors = Rc::clone(&recorder.sensors);
        controller.add_listener(Box::new(recorder));
        controller.add_sensor(SensorEvent::new(2.5, SensorKind::Generic, "photo"));

        let fired = controller.trigger_events(&mut track, 1.5, 2.6, 0.0);
        assert_eq!(fired, 3);
        assert_eq!(*sensors.borrow(), vec!["b0 check", "b1 enter", "photo"]);
        assert_eq!(*entered.borrow(), vec![1]);
        assert_eq!(controller.occupancy().state(1), BlockState::Occupied);
    }

    #[test]
    fn backward_motion_fires_nothing() {
        let (mut track, mut controller) = setup(3);
        assert_eq!(controller.trigger_events(&mut track, 2.6, 1.5, 0.0), 0);
    }

    #[test]
    fn unknown_stations_are_ignored() {
        let (_, controller) = setup(2);
        let controller = controller.with_stations([1, 9]);
        assert_eq!(controller.stations(), &[1]);
        assert!(controller.is_station(1));
        assert!(!controller.is_station(0));
    }

    #[test]
    fn reset_rejects_ring_that_no_longer_covers_track() {
        let (mut track, mut controller) = setup(3);
        let mut trains = trains(1);
        track.reset(circle(2).sections().to_vec());
        assert!(controller.reset_track(&mut track, &mut trains).is_err());
    }
}

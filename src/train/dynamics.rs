use super::axle::Axle;
use crate::sim::physics::{
    drag_force, gravity_force, integrate_velocity, rolling_resistance, MIN_SPEED,
};
use crate::sim::{Pose, TrainParams};
use crate::track::CoasterTrack;

/// Distance kept from the end of an open track.
const OPEN_END_MARGIN: f32 = 1e-4;

/// Lowest parametric speed used for stepping, relative to the section's mean.
const SLOW_TANGENT_FRACTION: f32 = 0.1;

/// A rigid multi-axle vehicle moving along a `CoasterTrack`.
///
/// `t_global` is the train reference point. Velocity is in metres per second
/// along the track, positive in the direction of increasing parameter.
#[derive(Debug, Clone, Default)]
pub struct Train {
    pub t_global: f32,
    pub velocity: f32,
    pub params: TrainParams,
    pose: Pose,
    axles: Vec<Axle>,
}

impl Train {
    /// Builds a train from the spacing of its axles, each relative to the previous one.
    pub fn new(params: TrainParams, axle_offsets: impl IntoIterator<Item = f32>) -> Self {
        Self {
            params,
            axles: axle_offsets.into_iter().map(Axle::new).collect(),
            ..Self::default()
        }
    }

    pub fn at(mut self, t_global: f32) -> Self {
        self.t_global = t_global;
        self
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn axles(&self) -> &[Axle] {
        &self.axles
    }

    pub fn total_mass(&self) -> f32 {
        self.params.car_mass * self.axles.len() as f32
    }

    /// Section index and local parameter under the train reference point.
    pub fn current_section(&self, track: &CoasterTrack) -> Option<(usize, f32)> {
        track.resolve(self.t_global)
    }

    /// Integrates gravity, rolling resistance and drag over all axles, then
    /// lets the section under the train drive or brake it.
    pub fn update_physics(&mut self, track: &CoasterTrack, dt: f32) {
        let mass = self.params.car_mass;
        let force: f32 = self
            .axles
            .iter()
            .map(|axle| {
                gravity_force(axle.pose().forward(), mass)
                    + rolling_resistance(
                        axle.pose().up(),
                        self.velocity,
                        self.params.roll_coefficient,
                        mass,
                    )
                    + drag_force(self.velocity, self.params.cross_area)
            })
            .sum();
        self.velocity = integrate_velocity(self.velocity, force, self.total_mass(), dt);

        if let Some(section) = self
            .current_section(track)
            .and_then(|(index, _)| track.section(index))
        {
            self.velocity = section.physics.apply(self.velocity, dt);
        }
    }

    /// Moves the reference point by `velocity * dt` metres.
    ///
    /// Returns the swept window `(t0, t1)`, where `t1` is not wrapped. An open
    /// track end stops the train. Returns `None` when the train is off track.
    ///
    /// Where the tangent nearly vanishes the step uses a tenth of the
    /// section's mean parametric speed instead, and one step never exceeds
    /// the span of the current section.
    pub fn advance(&mut self, track: &CoasterTrack, dt: f32) -> Option<(f32, f32)> {
        let Some((index, local)) = self.current_section(track) else {
            log::debug!("train off track at t = {:.4}, holding", self.t_global);
            return None;
        };
        let section = track.section(index)?;
        let span = section.t_max();
        let mean_speed = if span > 0.0 {
            section.arc_length() / span
        } else {
            0.0
        };
        let speed = section
            .tangent(local)
            .magnitude()
            .max(mean_speed * SLOW_TANGENT_FRACTION)
            .max(MIN_SPEED);

        let t0 = self.t_global;
        let step = (self.velocity * dt / speed).clamp(-span, span);
        let mut t1 = t0 + step;

        if !track.is_closed() {
            let end = (track.t_max() - OPEN_END_MARGIN).max(0.0);
            if t1 > end || t1 < 0.0 {
                log::warn!(
                    "train reached the end of an open track at t = {:.4}, stopping",
                    t1
                );
                t1 = t1.clamp(0.0, end);
                self.velocity = 0.0;
            }
        }

        self.t_global = t1;
        Some((t0, t1))
    }

    /// Wraps the reference parameter and places the body and every axle.
    pub fn place_on_track(&mut self, track: &CoasterTrack) {
        if track.t_max() <= 0.0 {
            self.t_global = 0.0;
            return;
        }
        self.t_global = track.wrap(self.t_global);

        if let Some(pose) = track.pose(self.t_global) {
            self.pose = pose;
        }
        self.place_axles(track, self.t_global);
    }

    /// Chains the axles backwards from `lead` by their arc-length offsets.
    /// An axle that does not resolve keeps its last pose.
    pub fn place_axles(&mut self, track: &CoasterTrack, lead: f32) {
        let mut t = lead;
        for (i, axle) in self.axles.iter_mut().enumerate() {
            t = track.wrap(t + track.delta_arc_length_backward(t, axle.offset_from_prev));
            match track.pose(t) {
                Some(pose) => axle.place(t, pose),
                None => log::debug!("axle {i} off track at t = {t:.4}, keeping last pose"),
            }
        }
    }

    /// One simulation step. Returns the swept window when the train moved.
    pub fn tick(&mut self, track: &CoasterTrack, dt: f32) -> Option<(f32, f32)> {
        let window = if self.params.physics_enabled {
            self.update_physics(track, dt);
            self.advance(track, dt)
        } else {
            None
        };
        self.place_on_track(track);
        window
    }
}

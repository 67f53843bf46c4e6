use super::physics::APPROACH_RATE;

/// Per-train physical properties.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainParams {
    pub roll_coefficient: f32,
    pub cross_area: f32,
    /// Mass carried by each axle, in kilograms.
    pub car_mass: f32,
    pub physics_enabled: bool,
}

impl TrainParams {
    pub fn new(roll_coefficient: f32, cross_area: f32, car_mass: f32, physics_enabled: bool) -> Self {
        Self {
            roll_coefficient,
            cross_area,
            car_mass,
            physics_enabled,
        }
    }
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            roll_coefficient: 0.0,
            cross_area: 1.0,
            car_mass: 550.0,
            physics_enabled: true,
        }
    }
}

/// Drive and brake settings of a track section (lift hills, launches, brake runs, stations).
///
/// `physics_active` and `stop_train` are commands written by the block controller.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SectionPhysics {
    pub affects_train: bool,
    pub acceleration: f32,
    pub braking: f32,
    pub target_velocity: f32,
    pub physics_active: bool,
    pub stop_train: bool,
}

impl SectionPhysics {
    pub fn drive(acceleration: f32, braking: f32, target_velocity: f32) -> Self {
        Self {
            affects_train: true,
            acceleration,
            braking,
            target_velocity,
            physics_active: true,
            stop_train: false,
        }
    }

    /// Returns the velocity after this section acted on the train for `dt` seconds.
    ///
    /// Speeding up uses an exponential approach, slowing down a constant
    /// deceleration. Neither step moves past the requested target.
    pub fn apply(&self, velocity: f32, dt: f32) -> f32 {
        if !self.affects_train || !self.physics_active {
            return velocity;
        }

        let target = if self.stop_train {
            0.0
        } else {
            self.target_velocity
        };
        let delta = target - velocity;

        if delta > 0.0 {
            let acc = (1.0 - (-delta * APPROACH_RATE).exp()) * self.acceleration;
            velocity + (acc * dt).min(delta)
        } else {
            velocity + (-self.braking * dt).max(delta)
        }
    }
}

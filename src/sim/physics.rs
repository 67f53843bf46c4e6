use super::math::Float3;

pub const G: f32 = 9.81;
pub const EPSILON: f32 = 1.192_093e-7;
/// Air density used by the drag model.
pub const AIR_DENSITY: f32 = 1.293e-3;
pub const DRAG_COEFFICIENT: f32 = 0.6;
/// Steepness of the exponential approach towards a section's target velocity.
pub const APPROACH_RATE: f32 = 8.0;
/// Floor for tangent magnitudes before dividing by them.
pub const MIN_SPEED: f32 = 1e-4;

fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Gravity component along the track for one car, in newtons.
pub fn gravity_force(forward: Float3, mass: f32) -> f32 {
    -forward.dot(Float3::UP) * G * mass
}

/// Rolling resistance opposing the motion, scaled by the normal load.
pub fn rolling_resistance(up: Float3, velocity: f32, coefficient: f32, mass: f32) -> f32 {
    let normal_accel = up.dot(Float3::UP) * G;
    -sign(velocity) * coefficient * normal_accel * mass
}

/// Quadratic aerodynamic drag.
pub fn drag_force(velocity: f32, cross_area: f32) -> f32 {
    -sign(velocity) * 0.5 * AIR_DENSITY * velocity * velocity * DRAG_COEFFICIENT * cross_area
}

/// Semi-implicit Euler step for the scalar forward velocity.
pub fn integrate_velocity(velocity: f32, force: f32, total_mass: f32, dt: f32) -> f32 {
    if total_mass <= 0.0 {
        return velocity;
    }
    velocity + force * dt / total_mass
}

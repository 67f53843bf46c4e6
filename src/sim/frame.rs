use super::math::{Float3, Matrix3, Quaternion};

/// Orthonormal coordinate frame for track orientation.
///
/// Right-handed system with three orthogonal unit vectors:
/// - `direction`: forward along the track (tangent)
/// - `normal`: up, away from the rails
/// - `lateral`: right, with `normal = direction x lateral`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub direction: Float3,
    pub normal: Float3,
    pub lateral: Float3,
}

impl Frame {
    pub const fn new(direction: Float3, normal: Float3, lateral: Float3) -> Self {
        Self {
            direction,
            normal,
            lateral,
        }
    }

    /// Builds a frame looking along `forward` with `up` as the preferred normal.
    pub fn look(forward: Float3, up: Float3) -> Self {
        let rotation = Quaternion::look_rotation(forward, up);
        Self::new(
            rotation.mul_vec(Float3::FORWARD),
            rotation.mul_vec(Float3::UP),
            rotation.mul_vec(Float3::RIGHT),
        )
    }

    pub fn rotation(&self) -> Quaternion {
        Matrix3::from_columns(self.lateral, self.normal, self.direction).to_quaternion()
    }

    /// Bank angle in radians, zero when the normal points to world up.
    pub fn roll(&self) -> f32 {
        (-self.lateral.y).atan2(self.normal.y)
    }

    pub const DEFAULT: Self = Self::new(Float3::FORWARD, Float3::UP, Float3::RIGHT);
}

impl Default for Frame {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A point on the track together with its orientation.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Pose {
    pub position: Float3,
    pub frame: Frame,
}

impl Pose {
    pub const fn new(position: Float3, frame: Frame) -> Self {
        Self { position, frame }
    }

    pub fn forward(&self) -> Float3 {
        self.frame.direction
    }

    pub fn up(&self) -> Float3 {
        self.frame.normal
    }

    pub fn right(&self) -> Float3 {
        self.frame.lateral
    }

    pub fn rotation(&self) -> Quaternion {
        self.frame.rotation()
    }
}

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use super::physics::EPSILON;

/// 3D vector with f32 components.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Float3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Float3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);

    pub fn magnitude(self) -> f32 {
        self.magnitude_squared().sqrt()
    }

    pub fn magnitude_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit vector, or `ZERO` for a degenerate input.
    pub fn normalize(self) -> Self {
        self.normalize_or(Self::ZERO)
    }

    /// Unit vector, or `fallback` when the magnitude is too small to divide by.
    pub fn normalize_or(self, fallback: Self) -> Self {
        let mag = self.magnitude();
        if !mag.is_finite() || mag < EPSILON {
            return fallback;
        }
        self * (1.0 / mag)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    pub fn distance(self, other: Self) -> f32 {
        (self - other).magnitude()
    }

    pub fn is_zero(self) -> bool {
        self.magnitude_squared() == 0.0
    }
}

impl Add for Float3 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl AddAssign for Float3 {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for Float3 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f32> for Float3 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl Div<f32> for Float3 {
    type Output = Self;
    fn div(self, scalar: f32) -> Self {
        Self::new(self.x / scalar, self.y / scalar, self.z / scalar)
    }
}

impl Neg for Float3 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Default for Float3 {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Unit quaternion for 3D rotations.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub fn from_axis_angle(axis: Float3, angle: f32) -> Self {
        let half_angle = angle * 0.5;
        let s = half_angle.sin();
        let c = half_angle.cos();
        let normalized = axis.normalize();

        Self::new(normalized.x * s, normalized.y * s, normalized.z * s, c)
    }

    /// Rotation mapping +Z onto `forward` and +Y as close to `up` as possible.
    pub fn look_rotation(forward: Float3, up: Float3) -> Self {
        let f = forward.normalize_or(Float3::FORWARD);
        let mut r = up.cross(f);
        if r.magnitude_squared() < EPSILON {
            // up parallel to forward, pick any perpendicular
            r = Float3::UP.cross(f);
            if r.magnitude_squared() < EPSILON {
                r = Float3::RIGHT;
            }
        }
        let r = r.normalize_or(Float3::RIGHT);
        let u = f.cross(r);
        Matrix3::from_columns(r, u, f).to_quaternion()
    }

    pub fn mul_vec(self, v: Float3) -> Float3 {
        let qv = Float3::new(self.x, self.y, self.z);
        let uv = qv.cross(v);
        let uuv = qv.cross(uv);
        v + (uv * (2.0 * self.w)) + (uuv * 2.0)
    }

    pub fn normalize(self) -> Self {
        let mag = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if mag < EPSILON {
            return Self::IDENTITY;
        }
        Self::new(self.x / mag, self.y / mag, self.z / mag, self.w / mag)
    }
}

impl Mul for Quaternion {
    type Output = Self;
    fn mul(self, other: Self) -> Self {
        Self::new(
            self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
            self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
        )
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 3x3 matrix stored as three column vectors.
/// Used to turn an orthonormal basis into a rotation.
#[derive(Debug, Clone, Copy)]
pub struct Matrix3 {
    pub c0: Float3,
    pub c1: Float3,
    pub c2: Float3,
}

impl Matrix3 {
    pub fn from_columns(c0: Float3, c1: Float3, c2: Float3) -> Self {
        Self { c0, c1, c2 }
    }

    /// Converts a rotation matrix (orthonormal columns) to a unit quaternion.
    pub fn to_quaternion(&self) -> Quaternion {
        // m[row][col]
        let (m00, m01, m02) = (self.c0.x, self.c1.x, self.c2.x);
        let (m10, m11, m12) = (self.c0.y, self.c1.y, self.c2.y);
        let (m20, m21, m22) = (self.c0.z, self.c1.z, self.c2.z);

        let trace = m00 + m11 + m22;
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Quaternion::new((m21 - m12) / s, (m02 - m20) / s, (m10 - m01) / s, 0.25 * s)
        } else if m00 > m11 && m00 > m22 {
            let s = (1.0 + m00 - m11 - m22).sqrt() * 2.0;
            Quaternion::new(0.25 * s, (m01 + m10) / s, (m02 + m20) / s, (m21 - m12) / s)
        } else if m11 > m22 {
            let s = (1.0 + m11 - m00 - m22).sqrt() * 2.0;
            Quaternion::new((m01 + m10) / s, 0.25 * s, (m12 + m21) / s, (m02 - m20) / s)
        } else {
            let s = (1.0 + m22 - m00 - m11).sqrt() * 2.0;
            Quaternion::new((m02 + m20) / s, (m12 + m21) / s, 0.25 * s, (m10 - m01) / s)
        };
        q.normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: Float3, b: Float3) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(a.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn test_float3_normalize() {
        let v = Float3::new(3.0, 4.0, 0.0);
        let normalized = v.normalize();
        assert_relative_eq!(normalized.x, 0.6, epsilon = 1e-6);
        assert_relative_eq!(normalized.y, 0.8, epsilon = 1e-6);
        assert_relative_eq!(normalized.magnitude(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn normalize_or_uses_fallback_for_zero() {
        let v = Float3::ZERO.normalize_or(Float3::FORWARD);
        assert_eq!(v, Float3::FORWARD);
        let nan = Float3::new(f32::NAN, 0.0, 0.0).normalize_or(Float3::UP);
        assert_eq!(nan, Float3::UP);
    }

    #[test]
    fn test_float3_cross() {
        let c = Float3::RIGHT.cross(Float3::UP);
        assert_vec_eq(c, Float3::FORWARD);
    }

    #[test]
    fn test_quaternion_axis_angle() {
        use std::f32::consts::PI;
        let q = Quaternion::from_axis_angle(Float3::UP, PI / 2.0);
        let rotated = q.mul_vec(Float3::RIGHT);
        assert_vec_eq(rotated, Float3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn look_rotation_identity_for_default_axes() {
        let q = Quaternion::look_rotation(Float3::FORWARD, Float3::UP);
        assert_relative_eq!(q.w.abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn look_rotation_maps_axes() {
        let forward = Float3::new(1.0, 0.0, 1.0).normalize();
        let q = Quaternion::look_rotation(forward, Float3::UP);
        assert_vec_eq(q.mul_vec(Float3::FORWARD), forward);
        assert_vec_eq(q.mul_vec(Float3::UP), Float3::UP);
    }

    #[test]
    fn look_rotation_handles_vertical_forward() {
        let q = Quaternion::look_rotation(Float3::UP, Float3::UP);
        assert_vec_eq(q.mul_vec(Float3::FORWARD), Float3::UP);
        assert!(q.x.is_finite() && q.y.is_finite() && q.z.is_finite() && q.w.is_finite());
    }
}

//! Unit quaternions for character orientation.
//!
//! This is a deliberately small type: just enough to compose yaw rotations,
//! convert to a matrix for rendering, and slerp between two orientations
//! while the character veers. It follows the (x, y, z, w) convention with
//! the identity at (0, 0, 0, 1).

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector3};
use std::ops::{Add, Mul};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quaternion {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quaternion {
    pub fn identity() -> Quaternion {
        Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }

    /// Axis-angle constructor: `(sin θ · axis, cos θ)` with `theta` in
    /// degrees. Note that the rotation the quaternion *applies* is `2θ`, so
    /// callers pass half the angle they want.
    pub fn from_axis_angle(axis: Vector3<f32>, theta: f32) -> Quaternion {
        let theta_rad = theta.to_radians();
        let v = axis.normalize() * theta_rad.sin();
        Quaternion { x: v.x, y: v.y, z: v.z, w: theta_rad.cos() }
    }

    pub fn dot(self, other: Quaternion) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// The equivalent rotation matrix.
    ///
    /// Obtained by extracting the pre- and post-multiplication matrices of
    /// the action `q p q⁻¹` and multiplying them. Only valid for unit
    /// quaternions; anything else yields a matrix that isn't a pure rotation.
    pub fn matrix(self) -> Matrix4<f32> {
        let (x, y, z, w) = (self.x, self.y, self.z, self.w);

        let xx = x * x;
        let xy = x * y;
        let xz = x * z;
        let xw = x * w;
        let yy = y * y;
        let yz = y * z;
        let yw = y * w;
        let zz = z * z;
        let zw = z * w;

        // cgmath matrices are column-major: arguments go column by column.
        Matrix4::new(
            1.0 - 2.0 * (yy + zz), 2.0 * (xy + zw), 2.0 * (xz - yw), 0.0,
            2.0 * (xy - zw), 1.0 - 2.0 * (xx + zz), 2.0 * (yz + xw), 0.0,
            2.0 * (xz + yw), 2.0 * (yz - xw), 1.0 - 2.0 * (xx + yy), 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

impl Add for Quaternion {
    type Output = Quaternion;

    fn add(self, other: Quaternion) -> Quaternion {
        Quaternion {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
            w: self.w + other.w,
        }
    }
}

/// Hamilton product. `q1 * q2` composes the rotations the way callers chain
/// them here: the character's orientation is on the left, the increment on
/// the right.
impl Mul for Quaternion {
    type Output = Quaternion;

    fn mul(self, other: Quaternion) -> Quaternion {
        Quaternion {
            // i·1, j·k, k·j, 1·i
            x: self.x * other.w + self.y * other.z - self.z * other.y + self.w * other.x,
            // i·k, j·1, k·i, 1·j
            y: -self.x * other.z + self.y * other.w + self.z * other.x + self.w * other.y,
            // i·j, j·i, k·1, 1·k
            z: self.x * other.y - self.y * other.x + self.z * other.w + self.w * other.z,
            // i·i, j·j, k·k, 1·1
            w: -self.x * other.x - self.y * other.y - self.z * other.z + self.w * other.w,
        }
    }
}

impl Mul<f32> for Quaternion {
    type Output = Quaternion;

    fn mul(self, scalar: f32) -> Quaternion {
        Quaternion {
            x: self.x * scalar,
            y: self.y * scalar,
            z: self.z * scalar,
            w: self.w * scalar,
        }
    }
}

impl Mul<Quaternion> for f32 {
    type Output = Quaternion;

    fn mul(self, q: Quaternion) -> Quaternion {
        q * self
    }
}

/// Spherical interpolation along the shortest arc between `q0` and `q1`.
///
/// Both inputs must be unit quaternions and `t` must be in [0, 1]. When the
/// inputs are nearly parallel the sine in the denominator vanishes, so we
/// fall back to component-wise lerp.
pub fn slerp(q0: Quaternion, q1: Quaternion, t: f32) -> Quaternion {
    let mut q1 = q1;
    let mut cos_theta = q0.dot(q1);

    // q and -q are the same rotation; flip to take the short way around.
    if cos_theta < 0.0 {
        q1 = q1 * -1.0;
        cos_theta = -cos_theta;
    }

    if 1.0 - cos_theta < std::f32::EPSILON {
        return q0 * (1.0 - t) + q1 * t;
    }

    let angle = cos_theta.acos();
    let d = angle.sin();
    let s0 = (((1.0 - t) * angle).sin()) / d;
    let s1 = ((t * angle).sin()) / d;

    q0 * s0 + q1 * s1
}

/// Rotation taking the direction `from` onto the direction `to`.
/// Used to orient canonical +Z cylinders along bone vectors.
pub fn rotate_between(from: Vector3<f32>, to: Vector3<f32>) -> Matrix4<f32> {
    let from = from.normalize();
    let to = to.normalize();
    let axis = from.cross(to);
    let cos_angle = from.dot(to).max(-1.0).min(1.0);

    if axis.magnitude2() < 1.0e-12 {
        if cos_angle > 0.0 {
            return Matrix4::identity();
        }
        // Antiparallel: rotate 180° about any axis perpendicular to `from`.
        let perp = if from.x.abs() < 0.9 {
            from.cross(Vector3::unit_x())
        } else {
            from.cross(Vector3::unit_y())
        };
        return Quaternion::from_axis_angle(perp, 90.0).matrix();
    }

    // Half-angle because of the axis-angle constructor's convention.
    Quaternion::from_axis_angle(axis, cos_angle.acos().to_degrees() / 2.0).matrix()
}

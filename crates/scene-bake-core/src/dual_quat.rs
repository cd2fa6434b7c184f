//! Unit dual quaternions for rigid-transform blending

use glam::{DMat4, DQuat, DVec3};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// A dual quaternion `real + ε·dual` encoding a rotation and a translation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualQuat {
    /// Rotation part
    pub real: DQuat,
    /// Translation part, `0.5 · t · real`
    pub dual: DQuat,
}

impl DualQuat {
    /// The all-zero dual quaternion, used as an accumulator seed
    pub const ZERO: Self = Self {
        real: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Identity transform
    pub const IDENTITY: Self = Self {
        real: DQuat::IDENTITY,
        dual: DQuat::from_xyzw(0.0, 0.0, 0.0, 0.0),
    };

    /// Build from a rotation followed by a translation
    pub fn from_rotation_translation(rotation: DQuat, translation: DVec3) -> Self {
        let t = DQuat::from_xyzw(translation.x, translation.y, translation.z, 0.0);
        Self {
            real: rotation,
            dual: (t * rotation) * 0.5,
        }
    }

    /// Build from the rotation and translation of an affine matrix
    ///
    /// Any scale in the matrix is discarded.
    pub fn from_mat4(matrix: &DMat4) -> Self {
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        Self::from_rotation_translation(rotation.normalize(), translation)
    }

    /// Dot product of the rotation parts
    pub fn real_dot(&self, other: &Self) -> f64 {
        self.real.dot(other.real)
    }

    /// Divide both parts by the norm of the rotation part
    ///
    /// Returns `None` when the rotation part has vanished, which only happens
    /// when every contribution cancelled out.
    pub fn normalize(&self) -> Option<Self> {
        let length = self.real.length();
        if length <= f64::EPSILON {
            return None;
        }

        Some(Self {
            real: self.real * (1.0 / length),
            dual: self.dual * (1.0 / length),
        })
    }

    /// Translation encoded by a unit dual quaternion
    pub fn translation(&self) -> DVec3 {
        let t = (self.dual * 2.0) * self.real.conjugate();
        DVec3::new(t.x, t.y, t.z)
    }

    /// Apply a unit dual quaternion as a rigid transform to a point
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.real * point + self.translation()
    }
}

impl Default for DualQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul<f64> for DualQuat {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            real: self.real * rhs,
            dual: self.dual * rhs,
        }
    }
}

impl Add for DualQuat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            real: self.real + rhs.real,
            dual: self.dual + rhs.dual,
        }
    }
}

impl Sub for DualQuat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            real: self.real - rhs.real,
            dual: self.dual - rhs.dual,
        }
    }
}

impl Neg for DualQuat {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            real: -self.real,
            dual: -self.dual,
        }
    }
}

impl AddAssign for DualQuat {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for DualQuat {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn assert_vec_close(a: DVec3, b: DVec3) {
        assert!(a.abs_diff_eq(b, 1e-9), "{a:?} != {b:?}");
    }

    #[test]
    fn test_identity_leaves_points_alone() {
        let p = DVec3::new(1.0, -2.0, 3.5);
        assert_vec_close(DualQuat::IDENTITY.transform_point(p), p);
    }

    #[test]
    fn test_matches_matrix_transform() {
        let rotation = DQuat::from_rotation_y(FRAC_PI_2);
        let translation = DVec3::new(0.0, 4.0, -1.0);
        let matrix = DMat4::from_rotation_translation(rotation, translation);
        let dq = DualQuat::from_mat4(&matrix);

        let p = DVec3::new(2.0, 1.0, 0.0);
        assert_vec_close(dq.transform_point(p), matrix.transform_point3(p));
        assert_vec_close(dq.translation(), translation);
    }

    #[test]
    fn test_scaled_blend_normalizes_back() {
        let dq = DualQuat::from_rotation_translation(
            DQuat::from_rotation_x(0.3),
            DVec3::new(1.0, 2.0, 3.0),
        );
        let blended = (dq * 0.25 + dq * 0.75).normalize();
        let blended = blended.unwrap_or(DualQuat::ZERO);

        let p = DVec3::new(-1.0, 0.5, 2.0);
        assert_vec_close(blended.transform_point(p), dq.transform_point(p));
    }

    #[test]
    fn test_antipodal_quaternions_describe_same_transform() {
        let dq = DualQuat::from_rotation_translation(
            DQuat::from_rotation_z(1.0),
            DVec3::new(0.0, 0.0, 5.0),
        );
        let p = DVec3::new(1.0, 1.0, 1.0);
        assert_vec_close((-dq).transform_point(p), dq.transform_point(p));
        assert!(dq.real_dot(&-dq) < 0.0);
    }

    #[test]
    fn test_zero_does_not_normalize() {
        assert_eq!(DualQuat::ZERO.normalize(), None);
    }
}

//! Matrix helpers used by the transform resolver and the skin deformer
//!
//! All deformation math runs in double precision (`glam::DMat4`); only the
//! packed vertex buffers are narrowed to `f32`.

use glam::{DMat4, DQuat, DVec3};

/// Build a rotation from Euler angles in degrees, applied X then Y then Z
pub fn rotation_from_euler_degrees(degrees: DVec3) -> DQuat {
    let radians = DVec3::new(
        degrees.x.to_radians(),
        degrees.y.to_radians(),
        degrees.z.to_radians(),
    );

    DQuat::from_rotation_z(radians.z)
        * DQuat::from_rotation_y(radians.y)
        * DQuat::from_rotation_x(radians.x)
}

/// Compose `T * R * S` with the rotation given as Euler degrees
pub fn from_trs_degrees(translation: DVec3, rotation: DVec3, scaling: DVec3) -> DMat4 {
    DMat4::from_scale_rotation_translation(
        scaling,
        rotation_from_euler_degrees(rotation),
        translation,
    )
}

/// Scale all the elements of a matrix
pub fn matrix_scale(matrix: &DMat4, value: f64) -> DMat4 {
    *matrix * value
}

/// Add a value to all the elements on the diagonal of a matrix
pub fn matrix_add_to_diagonal(matrix: &DMat4, value: f64) -> DMat4 {
    *matrix + DMat4::from_diagonal(glam::DVec4::splat(value))
}

/// Sum two matrices element by element
pub fn matrix_add(lhs: &DMat4, rhs: &DMat4) -> DMat4 {
    *lhs + *rhs
}

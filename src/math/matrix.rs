//! Isometry and camera matrix helpers on top of glam's `Mat3`/`Mat4`.
//!
//! glam matrices are column-major. Anything receiving a row-major matrix
//! (e.g. calibration rectification matrices from config structs) must be
//! transposed by the caller, as noted on each function.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::math::Pose;

/// Transform a vector by a 3x3 matrix. `m` is column-major; transpose
/// row-major calibration matrices before calling.
pub fn matrix_3x3_transform_vec3(m: &Mat3, v: Vec3) -> Vec3 {
    *m * v
}

/// Rigid transform from a rotation matrix and a translation.
pub fn matrix_4x4_isometry_from_rt(rotation: &Mat3, translation: Vec3) -> Mat4 {
    let mut m = Mat4::from_mat3(*rotation);
    m.w_axis = (translation, 1.0).into();
    m
}

/// Rigid transform matrix of a pose.
pub fn matrix_4x4_isometry_from_pose(pose: &Pose) -> Mat4 {
    Mat4::from_rotation_translation(pose.orientation, pose.position)
}

/// Invert an isometry, exploiting orthogonality: the inverse rotation is the
/// transpose and the inverse translation is `-Rᵀ·t`.
pub fn matrix_4x4_isometry_inverse(m: &Mat4) -> Mat4 {
    let rot = Mat3::from_mat4(*m).transpose();
    let t = m.w_axis.truncate();
    matrix_4x4_isometry_from_rt(&rot, rot * -t)
}

/// Model matrix: pose transform with a per-axis scale applied first.
pub fn matrix_4x4_model(pose: &Pose, size: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(size, pose.orientation, pose.position)
}

/// View matrix of a camera at `pose`: the inverse of its pose-to-world
/// transform.
pub fn matrix_4x4_view_from_pose(pose: &Pose) -> Mat4 {
    matrix_4x4_isometry_inverse(&matrix_4x4_isometry_from_pose(pose))
}

/// Inverse view-projection used to unproject rays. Only the 3x3 rotation
/// block of `view` participates, the eye position cancels out.
pub fn matrix_4x4_inverse_view_projection(view: &Mat4, projection: &Mat4) -> Mat4 {
    let view_rotation = Mat4::from_mat3(Mat3::from_mat4(*view));
    (*projection * view_rotation).inverse()
}

/// Rotation part of a pose as a 3x3 matrix.
pub fn matrix_3x3_from_quat(q: Quat) -> Mat3 {
    Mat3::from_quat(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_isometry_from_pose_round_trips_points() {
        let pose = Pose::new(Quat::from_rotation_z(0.4), Vec3::new(1.0, 2.0, 3.0));
        let m = matrix_4x4_isometry_from_pose(&pose);

        let p = Vec3::new(-0.5, 0.25, 4.0);
        let by_pose = pose.transform_point(p);
        let by_matrix = m.transform_point3(p);
        assert_relative_eq!(by_pose.x, by_matrix.x, epsilon = 1e-5);
        assert_relative_eq!(by_pose.y, by_matrix.y, epsilon = 1e-5);
        assert_relative_eq!(by_pose.z, by_matrix.z, epsilon = 1e-5);
    }

    #[test]
    fn test_isometry_inverse_is_inverse() {
        let pose = Pose::new(
            Quat::from_rotation_x(1.1) * Quat::from_rotation_y(-0.6),
            Vec3::new(0.3, -1.0, 2.0),
        );
        let m = matrix_4x4_isometry_from_pose(&pose);
        let inv = matrix_4x4_isometry_inverse(&m);

        let p = Vec3::new(5.0, -2.0, 0.5);
        let round = inv.transform_point3(m.transform_point3(p));
        assert_relative_eq!(round.x, p.x, epsilon = 1e-4);
        assert_relative_eq!(round.y, p.y, epsilon = 1e-4);
        assert_relative_eq!(round.z, p.z, epsilon = 1e-4);
    }

    #[test]
    fn test_view_from_pose_moves_eye_to_origin() {
        let pose = Pose::new(Quat::from_rotation_y(0.9), Vec3::new(2.0, 1.0, -4.0));
        let view = matrix_4x4_view_from_pose(&pose);
        let eye_in_view = view.transform_point3(pose.position);
        assert_relative_eq!(eye_in_view.length(), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_model_matrix_applies_scale_first() {
        let pose = Pose::from_position(Vec3::new(0.0, 1.0, 0.0));
        let m = matrix_4x4_model(&pose, Vec3::new(2.0, 2.0, 2.0));
        let p = m.transform_point3(Vec3::X);
        assert_relative_eq!(p.x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-6);
    }
}

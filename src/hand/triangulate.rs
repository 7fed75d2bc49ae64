//! Two-ray triangulation: the midpoint of the shortest segment between two
//! camera rays.

use glam::Vec3;

use crate::math::Pose;

/// Closest points between line `a` (through `p1`, `p2`) and line `b`
/// (through `p3`, `p4`). Returns `None` for (near-)parallel or degenerate
/// lines.
pub fn line_line_closest_points(
    p1: Vec3,
    p2: Vec3,
    p3: Vec3,
    p4: Vec3,
) -> Option<(Vec3, Vec3)> {
    let p13 = p1 - p3;
    let p43 = p4 - p3;
    let p21 = p2 - p1;

    if p43.length_squared() < f32::EPSILON || p21.length_squared() < f32::EPSILON {
        return None;
    }

    let d1343 = p13.dot(p43);
    let d4321 = p43.dot(p21);
    let d1321 = p13.dot(p21);
    let d4343 = p43.dot(p43);
    let d2121 = p21.dot(p21);

    let denom = d2121 * d4343 - d4321 * d4321;
    if denom.abs() < f32::EPSILON {
        return None;
    }

    let mua = (d1343 * d4321 - d1321 * d4343) / denom;
    let mub = (d1343 + d4321 * mua) / d4343;

    Some((p1 + p21 * mua, p3 + p43 * mub))
}

/// Triangulate a keypoint from one ray per camera. `left_ray` is in the
/// left camera frame (the solve frame); `right_ray` is rotated and offset by
/// `right_in_left` before intersecting. The result is the midpoint of the
/// closest-approach segment.
pub fn triangulate_rays(left_ray: Vec3, right_ray: Vec3, right_in_left: &Pose) -> Option<Vec3> {
    let p1 = Vec3::ZERO;
    let p2 = left_ray;
    let p3 = right_in_left.position;
    let p4 = right_in_left.orientation * right_ray + right_in_left.position;

    let (pa, pb) = line_line_closest_points(p1, p2, p3, p4)?;
    Some((pa + pb) * 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_intersecting_lines_meet() {
        // Lines crossing at (1, 1, 0).
        let (pa, pb) = line_line_closest_points(
            Vec3::ZERO,
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!((pa - pb).length(), 0.0, epsilon = 1e-5);
        assert_relative_eq!(pa.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(pa.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_parallel_lines_are_rejected() {
        let result = line_line_closest_points(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_skew_lines_take_midpoint() {
        // Closest segment between these runs from (0.5, 0, 0) to (0.5, 0, 1).
        let (pa, pb) = line_line_closest_points(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(0.5, -1.0, 1.0),
            Vec3::new(0.5, 1.0, 1.0),
        )
        .unwrap();
        assert_relative_eq!(pa.x, 0.5, epsilon = 1e-5);
        assert_relative_eq!(pb.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_triangulate_stereo_point() {
        // Cameras 6 cm apart on X, both looking at a point 30 cm out on -Z.
        let target = Vec3::new(0.0, 0.0, -0.3);
        let baseline = Pose::from_position(Vec3::new(0.06, 0.0, 0.0));

        let left_ray = target.normalize();
        let right_ray = (target - baseline.position).normalize();

        let p = triangulate_rays(left_ray, right_ray, &baseline).unwrap();
        assert_relative_eq!(p.x, target.x, epsilon = 1e-4);
        assert_relative_eq!(p.y, target.y, epsilon = 1e-4);
        assert_relative_eq!(p.z, target.z, epsilon = 1e-4);
    }
}

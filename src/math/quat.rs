//! Quaternion operations: rotation helpers, the exponential/log maps used
//! for velocity integration, swing-twist decomposition and basis changes.
//!
//! The exp/log maps follow Grassia, "Practical Parameterization of Rotations
//! Using the Exponential Map" (1998): direct computation away from zero, a
//! Taylor expansion below the fourth root of machine epsilon.

use glam::{Mat3, Quat, Vec2, Vec3};

/// Fourth root of f32 machine epsilon, the recommended cutoff between the
/// Taylor expansion and direct computation of sinc.
const FOURTH_ROOT_EPS: f32 = 1e-6;

/// Tolerance for [`quat_ensure_normalized`] and the 1%-validators.
const NORMALIZE_TOLERANCE: f32 = 0.01;

// -- Construction --

/// Rotation of `angle_rads` radians about a unit `axis`.
pub fn quat_from_angle_vector(angle_rads: f32, axis: Vec3) -> Quat {
    Quat::from_axis_angle(axis, angle_rads)
}

/// Rotation from a 3x3 rotation matrix (glam column-major; a row-major
/// source must be transposed before this call).
pub fn quat_from_matrix_3x3(mat: &Mat3) -> Quat {
    Quat::from_mat3(mat)
}

/// Build a rotation from the +X and +Z axes of a right-handed basis, crossing
/// +Z and +X to recover +Y. Inputs must be normalized.
pub fn quat_from_plus_x_z(plus_x: Vec3, plus_z: Vec3) -> Quat {
    let plus_y = plus_z.cross(plus_x);
    Quat::from_mat3(&Mat3::from_cols(plus_x, plus_y, plus_z))
}

// -- Validation and normalization --

/// Check that a quaternion is finite and of unit length within 1%.
pub fn quat_validate(q: Quat) -> bool {
    q.is_finite() && (q.length_squared() - 1.0).abs() <= 2.0 * NORMALIZE_TOLERANCE
}

/// Check that a quaternion's length is within 1% of unit.
pub fn quat_validate_within_1_percent(q: Quat) -> bool {
    q.is_finite() && (q.length() - 1.0).abs() <= NORMALIZE_TOLERANCE
}

/// Normalize `q` only if it is already within tolerance of unit length.
/// Returns false without touching `q` otherwise, which callers use to detect
/// corrupted state.
pub fn quat_ensure_normalized(q: &mut Quat) -> bool {
    if !quat_validate_within_1_percent(*q) {
        return false;
    }
    *q = q.normalize();
    true
}

// -- Rotation helpers --

/// Compose two rotations: `left` applied after `right`.
pub fn quat_rotate(left: Quat, right: Quat) -> Quat {
    left * right
}

/// Rotate `right` into `left`'s local frame: `left⁻¹ · right`.
pub fn quat_unrotate(left: Quat, right: Quat) -> Quat {
    left.conjugate() * right
}

/// Rotate a vector by a quaternion.
pub fn quat_rotate_vec3(q: Quat, v: Vec3) -> Vec3 {
    q * v
}

/// Rotate a derivative (angular velocity, acceleration) by a quaternion.
/// Numerically the same as [`quat_rotate_vec3`], kept separate so call sites
/// document that the quantity is a derivative.
pub fn quat_rotate_derivative(q: Quat, deriv: Vec3) -> Vec3 {
    q * deriv
}

// -- Exponential and log maps --

/// Un-normalized sinc: `sin(theta)/theta`, continuous at zero.
fn sinc(theta: f32) -> f32 {
    if theta < FOURTH_ROOT_EPS {
        // Degree-2 Taylor expansion.
        1.0 - theta * theta / 6.0
    } else {
        theta.sin() / theta
    }
}

/// Taylor expansion of `theta/sin(theta)` for use near zero.
fn csc_taylor_expansion(theta: f32) -> f32 {
    let t2 = theta * theta;
    1.0 + t2 / 6.0 + (7.0 * t2 * t2) / 360.0 + (31.0 * t2 * t2 * t2) / 15120.0
}

/// Quaternion exponential of a rotation vector (axis scaled by half-angle).
pub fn quat_exp(axis_angle: Vec3) -> Quat {
    let theta = axis_angle.length();
    let vec = axis_angle * sinc(theta);
    Quat::from_xyzw(vec.x, vec.y, vec.z, theta.cos()).normalize()
}

/// Log map of a unit quaternion back to its rotation vector.
pub fn quat_ln(q: Quat) -> Vec3 {
    let vec = Vec3::new(q.x, q.y, q.z);
    let vecnorm = vec.length();

    // atan2 for numerical stability over asin/acos.
    let phi = vecnorm.atan2(q.w);

    let phi_over_sin = if vecnorm < 1e-4 {
        csc_taylor_expansion(phi)
    } else {
        phi / phi.sin()
    };
    vec * phi_over_sin
}

/// Integrate an angular velocity over `dt` seconds onto a rotation:
/// `q · exp(½·ω·dt)`, normalized.
pub fn quat_integrate_velocity(q: Quat, angular_velocity: Vec3, dt: f32) -> Quat {
    let incremental = quat_exp(angular_velocity * dt * 0.5);
    (q * incremental).normalize()
}

/// Recover the angular velocity that rotates `q0` into `q1` over `dt`
/// seconds: `2·ln(q1·q0⁻¹)/dt`.
pub fn quat_finite_difference(q0: Quat, q1: Quat, dt: f32) -> Vec3 {
    let inc = q1 * q0.conjugate();
    quat_ln(inc) * (2.0 / dt)
}

// -- Interpolation --

/// Spherical linear interpolation, taking the short path (one input is
/// flipped when the dot product is negative).
pub fn quat_slerp(a: Quat, b: Quat, t: f32) -> Quat {
    a.slerp(b, t)
}

// -- Swing-twist decomposition --

/// Build a quaternion from a 2D swing (rotation vector projected on the XY
/// plane) and an axial twist about Z. The twist is applied first, then the
/// swing.
pub fn quat_from_swing_twist(swing: Vec2, twist: f32) -> Quat {
    let swing_quat = quat_exp(Vec3::new(swing.x, swing.y, 0.0) * 0.5);
    let half_twist = twist * 0.5;
    let twist_quat = Quat::from_xyzw(0.0, 0.0, half_twist.sin(), half_twist.cos());
    swing_quat * twist_quat
}

/// Decompose a quaternion into swing and twist, the inverse of
/// [`quat_from_swing_twist`] over the upper 180-degree hemisphere.
pub fn quat_to_swing_twist(q: Quat) -> (Vec2, f32) {
    // The Z component of the product comes entirely from the twist factor.
    let twist = 2.0 * q.z.atan2(q.w);

    let half_twist = twist * 0.5;
    let twist_quat = Quat::from_xyzw(0.0, 0.0, half_twist.sin(), half_twist.cos());
    let swing_quat = q * twist_quat.conjugate();

    let xy_len = (swing_quat.x * swing_quat.x + swing_quat.y * swing_quat.y).sqrt();
    if xy_len < 1e-7 {
        return (Vec2::ZERO, twist);
    }
    let angle = 2.0 * xy_len.atan2(swing_quat.w);
    let swing = Vec2::new(swing_quat.x, swing_quat.y) * (angle / xy_len);
    (swing, twist)
}

// -- Change of basis --

/// Map a quaternion between left-handed and right-handed coordinate systems
/// that differ by a flipped X axis: `(x,y,z,w) ↦ (−x,y,z,−w)`. Its own
/// inverse.
pub fn quat_change_of_basis_lh_rh(q: Quat) -> Quat {
    Quat::from_xyzw(-q.x, q.y, q.z, -q.w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn quat_difference(q1: Quat, q2: Quat) -> f32 {
        // d(q1,q2) = 1 - <q1,q2>^2, zero iff same rotation.
        let inner = q1.dot(q2);
        1.0 - inner * inner
    }

    // Deterministic pseudo-random floats, xorshift-based.
    fn rand_stream(seed: u64) -> impl FnMut() -> f32 {
        let mut state = seed.wrapping_mul(0x9E3779B97F4A7C15) | 1;
        move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ((state >> 40) as f32 / (1u64 << 24) as f32) * 2.0 - 1.0
        }
    }

    #[test]
    fn test_exp_ln_round_trip() {
        let mut rand = rand_stream(7);
        for _ in 0..50 {
            let omega_dt = Vec3::new(rand(), rand(), rand()) * 1.5;
            if omega_dt.length() >= PI {
                continue;
            }
            let recovered = quat_ln(quat_exp(omega_dt * 0.5)) * 2.0;
            assert_relative_eq!(recovered.x, omega_dt.x, epsilon = 1e-5);
            assert_relative_eq!(recovered.y, omega_dt.y, epsilon = 1e-5);
            assert_relative_eq!(recovered.z, omega_dt.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_exp_near_zero_is_identity() {
        let q = quat_exp(Vec3::splat(1e-9));
        assert!(quat_difference(q, Quat::IDENTITY) < 1e-10);
    }

    #[test]
    fn test_integrate_velocity_full_turn() {
        // pi rad/s about Y for 1 second is a half turn.
        let q = quat_integrate_velocity(Quat::IDENTITY, Vec3::new(0.0, PI, 0.0), 1.0);
        let expected = Quat::from_rotation_y(PI);
        assert!(quat_difference(q, expected) < 1e-5);
    }

    #[test]
    fn test_finite_difference_matches_integration() {
        let q0 = Quat::from_rotation_x(0.3);
        let omega = Vec3::new(0.0, 2.0, -1.0);
        let dt = 0.01;
        let q1 = quat_integrate_velocity(q0, omega, dt);
        // finite_difference is the left (world-frame) difference while
        // integrate_velocity applies the body-frame increment, so rotate back.
        let recovered = quat_finite_difference(q0, q1, dt);
        let body = q0.conjugate() * recovered;
        assert_relative_eq!(body.x, omega.x, epsilon = 1e-2);
        assert_relative_eq!(body.y, omega.y, epsilon = 1e-2);
        assert_relative_eq!(body.z, omega.z, epsilon = 1e-2);
    }

    #[test]
    fn test_swing_twist_invertible_in_hemisphere() {
        let mut rand = rand_stream(11);
        for _ in 0..20 {
            let swing = Vec2::new(rand(), rand()) * (PI / 2.0);
            let twist = rand() * (PI / 2.0);

            let q = quat_from_swing_twist(swing, twist);
            let (rec_swing, rec_twist) = quat_to_swing_twist(q);

            assert_relative_eq!(swing.x, rec_swing.x, epsilon = 1e-3);
            assert_relative_eq!(swing.y, rec_swing.y, epsilon = 1e-3);
            assert_relative_eq!(twist, rec_twist, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_swing_twist_double_round_trip() {
        // Outside the hemisphere the recovered angles differ, but the rotation
        // they encode must be the same.
        let mut rand = rand_stream(13);
        for _ in 0..20 {
            let swing = Vec2::new(rand(), rand()) * 1000.0;
            let twist = rand() * 1000.0;

            let q = quat_from_swing_twist(swing, twist);
            let (rec_swing, rec_twist) = quat_to_swing_twist(q);
            let q2 = quat_from_swing_twist(rec_swing, rec_twist);

            assert!(
                quat_difference(q, q2) <= 1e-3,
                "swing {swing:?} twist {twist} produced different rotations"
            );
        }
    }

    #[test]
    fn test_change_of_basis_is_involution() {
        let mut rand = rand_stream(17);
        for _ in 0..10 {
            let q = Quat::from_xyzw(rand(), rand(), rand(), rand()).normalize();
            let twice = quat_change_of_basis_lh_rh(quat_change_of_basis_lh_rh(q));
            assert!(quat_difference(q, twice) < 1e-3);
        }
    }

    #[test]
    fn test_change_of_basis_matches_plus_x_z_construction() {
        // Slow reference: rotate the basis vectors, flip them across the YZ
        // plane, rebuild the rotation from +X and +Z.
        let mut rand = rand_stream(19);
        for _ in 0..10 {
            let q = Quat::from_xyzw(rand(), rand(), rand(), rand()).normalize();

            let mut x = q * Vec3::X;
            let mut z = q * Vec3::Z;
            x.y = -x.y;
            x.z = -x.z;
            z.x = -z.x;
            let slow = quat_from_plus_x_z(x, z);

            let fast = quat_change_of_basis_lh_rh(q);
            assert!(quat_difference(slow, fast) < 1e-3);
        }
    }

    #[test]
    fn test_ensure_normalized_detects_corruption() {
        let mut nearly = Quat::from_xyzw(0.0, 0.0, 0.0, 1.005);
        assert!(quat_ensure_normalized(&mut nearly));
        assert_relative_eq!(nearly.length(), 1.0, epsilon = 1e-6);

        let mut corrupt = Quat::from_xyzw(0.3, 0.3, 0.3, 2.0);
        let before = corrupt;
        assert!(!quat_ensure_normalized(&mut corrupt));
        assert_eq!(corrupt, before);
    }

    #[test]
    fn test_from_plus_x_z_identity_basis() {
        let q = quat_from_plus_x_z(Vec3::X, Vec3::Z);
        assert!(quat_difference(q, Quat::IDENTITY) < 1e-6);
    }

    #[test]
    fn test_unrotate_undoes_rotate() {
        let l = Quat::from_rotation_y(0.8);
        let r = Quat::from_rotation_x(-0.4);
        let composed = quat_rotate(l, r);
        let back = quat_unrotate(l, composed);
        assert!(quat_difference(back, r) < 1e-6);
    }
}

//! Flag-propagation truth table for relation chain resolution.

use glam::{Quat, Vec3};
use sixdof::math::Pose;
use sixdof::relation::{Relation, RelationChain, RelationFlags};

const POSE_ONE_Y: Pose = Pose {
    orientation: Quat::IDENTITY,
    position: Vec3::new(0.0, 1.0, 0.0),
};

const FLAGS_NOT_VALID: RelationFlags = RelationFlags::empty();
const FLAGS_VALID: RelationFlags = RelationFlags::POSE_VALID;
const FLAGS_VALID_TRACKED: RelationFlags =
    RelationFlags::POSE_VALID.union(RelationFlags::POSE_TRACKED);

/// Chain-building steps for the truth table.
#[derive(Clone, Copy, Debug)]
enum Step {
    /// Non-identity relation, not valid, not tracked.
    Nv,
    /// Non-identity relation, valid and tracked.
    Vt,
    /// Non-identity relation, valid, not tracked.
    Vnt,
    /// Non-identity pose.
    P,
    /// Identity pose (skipped by the push helper).
    Ip,
    /// Only orientation valid.
    OnlyOrientation,
    /// Only position valid.
    OnlyPosition,
}

fn relation(flags: RelationFlags, pose: Pose) -> Relation {
    Relation {
        flags,
        pose,
        linear_velocity: Vec3::ZERO,
        angular_velocity: Vec3::ZERO,
    }
}

fn run_step(chain: &mut RelationChain, step: Step) {
    match step {
        Step::Nv => chain.push_relation(&relation(FLAGS_NOT_VALID, POSE_ONE_Y)),
        Step::Vt => chain.push_relation(&relation(FLAGS_VALID_TRACKED, POSE_ONE_Y)),
        Step::Vnt => chain.push_relation(&relation(FLAGS_VALID, POSE_ONE_Y)),
        Step::P => chain.push_pose_if_not_identity(&POSE_ONE_Y),
        Step::Ip => chain.push_pose_if_not_identity(&Pose::IDENTITY),
        Step::OnlyOrientation => chain.push_relation(&relation(
            RelationFlags::ORIENTATION_VALID,
            Pose::IDENTITY,
        )),
        Step::OnlyPosition => chain.push_relation(&relation(
            RelationFlags::POSITION_VALID,
            // Garbage orientation that must be ignored.
            Pose::new(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        )),
    }
}

fn check_flags(expected: RelationFlags, steps: &[Step]) {
    let mut chain = RelationChain::new();
    for &step in steps {
        run_step(&mut chain, step);
    }
    let result = chain.resolve();
    assert_eq!(
        result.flags, expected,
        "steps {steps:?} resolved to {:?}, expected {expected:?}",
        result.flags
    );
}

#[test]
fn test_not_valid() {
    use Step::*;
    check_flags(FLAGS_NOT_VALID, &[Vt, Nv, Vt]);
    check_flags(FLAGS_NOT_VALID, &[Vt, Vt, Vt, Nv]);
    check_flags(FLAGS_NOT_VALID, &[P, Nv, Vnt]);

    check_flags(FLAGS_NOT_VALID, &[Nv, OnlyOrientation]);
    check_flags(FLAGS_NOT_VALID, &[Nv, OnlyPosition]);
    check_flags(FLAGS_NOT_VALID, &[OnlyOrientation, Nv]);
    check_flags(FLAGS_NOT_VALID, &[OnlyPosition, Nv]);
}

#[test]
fn test_tracked_bit_spreads_across_valid_steps() {
    use Step::*;
    // One tracked step marks the whole resolved pose tracked.
    check_flags(FLAGS_VALID_TRACKED, &[Vnt, Ip, Vt]);
    check_flags(FLAGS_VALID_TRACKED, &[Vnt, P, Vt]);
    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, P, Vnt]);
    check_flags(FLAGS_VALID_TRACKED, &[Vt, Vt, Vnt, Vt]);
    check_flags(FLAGS_VALID_TRACKED, &[Ip, Vt, P, Vnt, P, Vt]);

    check_flags(FLAGS_VALID_TRACKED, &[Vt, OnlyOrientation]);
    check_flags(FLAGS_VALID_TRACKED, &[Vt, OnlyPosition]);
    check_flags(FLAGS_VALID_TRACKED, &[OnlyOrientation, Vt]);
    check_flags(FLAGS_VALID_TRACKED, &[OnlyPosition, Vt]);

    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, OnlyOrientation, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, OnlyPosition, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, OnlyOrientation, Vt, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, OnlyPosition, Vt, P]);
}

#[test]
fn test_tracked() {
    use Step::*;
    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, P, Vt]);
    check_flags(FLAGS_VALID_TRACKED, &[Vt, Ip, P]);
    check_flags(FLAGS_VALID_TRACKED, &[Ip, Vt, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, Vt, Ip, P]);
    check_flags(FLAGS_VALID_TRACKED, &[P, Ip, Vt, P]);
    check_flags(FLAGS_VALID_TRACKED, &[Ip, Ip, Vt, Ip, Ip]);
}

#[test]
fn test_non_tracked() {
    use Step::*;
    check_flags(FLAGS_VALID, &[P, Vnt, P]);
    check_flags(FLAGS_VALID, &[Vnt, Vnt, Vnt]);
    check_flags(FLAGS_VALID, &[Vnt, P]);
    check_flags(FLAGS_VALID, &[P, Vnt]);
    check_flags(FLAGS_VALID, &[Vnt, Ip]);
    check_flags(FLAGS_VALID, &[Ip, Vnt]);
    check_flags(FLAGS_VALID, &[Vnt, Ip, P]);
    check_flags(FLAGS_VALID, &[Ip, Vnt, P]);
    check_flags(FLAGS_VALID, &[P, Vnt, Ip, P]);
    check_flags(FLAGS_VALID, &[P, Ip, Vnt, P]);

    check_flags(FLAGS_VALID, &[P, OnlyOrientation, Ip, P]);
    check_flags(FLAGS_VALID, &[P, OnlyPosition, Ip, P]);

    check_flags(FLAGS_VALID, &[OnlyOrientation, Vnt]);
    check_flags(FLAGS_VALID, &[OnlyPosition, Vnt]);
    check_flags(FLAGS_VALID, &[Vnt, OnlyOrientation]);
    check_flags(FLAGS_VALID, &[Vnt, OnlyPosition]);

    check_flags(FLAGS_VALID, &[OnlyOrientation, P, Vnt]);
    check_flags(FLAGS_VALID, &[OnlyPosition, P, Vnt]);
    check_flags(FLAGS_VALID, &[Vnt, OnlyOrientation, P]);
    check_flags(FLAGS_VALID, &[Vnt, OnlyPosition, P]);
}

#[test]
fn test_upgrade_fills_missing_components() {
    use Step::*;
    // One step with only orientation, one with only position: the resolved
    // pose has both components valid, neither tracked.
    check_flags(FLAGS_VALID, &[OnlyOrientation, OnlyPosition]);
    check_flags(FLAGS_VALID, &[OnlyPosition, OnlyOrientation]);
}

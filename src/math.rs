//! Shared math helpers for bone transforms.
//!
//! Authored rotations come in as euler degrees (ZYX application order, the
//! convention of the modeling tool); everything downstream works in
//! quaternions. The epsilons here are the single source of truth for frame
//! timing and degenerate-geometry guards.

use glam::{EulerRot, Quat, Vec3};

/// Smallest meaningful difference between two keyframe times, in seconds.
///
/// Also defines the IK convergence radius: a solve terminates once the end
/// effector is within `FRAME_EPSILON` of its target.
pub const FRAME_EPSILON: f32 = 1.0e-3;

/// Epsilon for float comparisons against zero (degenerate segments, zero
/// authored deltas).
pub const FLOAT_EPSILON: f32 = 1.0e-6;

/// Squared IK convergence threshold.
pub const DISTANCE_THRESHOLD_SQ: f32 = FRAME_EPSILON * FRAME_EPSILON;

/// Converts authored euler degrees to a quaternion (ZYX order).
#[inline]
#[must_use]
pub fn to_quaternion(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// Rotation carrying the unit vector `from` onto the unit vector `to`.
///
/// Inputs are normalized here; callers pass raw directions. Degenerate
/// (near-zero) directions yield the identity rotation.
#[inline]
#[must_use]
pub fn from_to_rotation(from: Vec3, to: Vec3) -> Quat {
    let from_len = from.length();
    let to_len = to.length();
    if from_len < FLOAT_EPSILON || to_len < FLOAT_EPSILON {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(from / from_len, to / to_len)
}

/// Checks whether any component of a vector is meaningfully non-zero.
#[inline]
#[must_use]
pub fn is_not_zero(v: Vec3) -> bool {
    v.abs().max_element() > FLOAT_EPSILON
}

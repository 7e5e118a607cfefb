use glam::{Quat, Vec3};

/// One bone's local transform relative to its parent's rest offset.
///
/// `raw_rotation` keeps the accumulated euler degrees so that layered
/// keyframes can add angles before the quaternion is recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneMovement {
    /// Local position offset.
    pub position: Vec3,
    /// Local scale multiplier.
    pub scale: Vec3,
    /// Local rotation derived from `raw_rotation`.
    pub rotation: Quat,
    /// Accumulated euler rotation in degrees.
    pub raw_rotation: Vec3,
}

impl BoneMovement {
    /// Creates a movement from its parts.
    #[must_use]
    pub fn new(position: Vec3, scale: Vec3, rotation: Quat, raw_rotation: Vec3) -> Self {
        Self {
            position,
            scale,
            rotation,
            raw_rotation,
        }
    }

    /// Copies all components from another movement.
    #[inline]
    pub fn set(&mut self, other: &Self) {
        self.position = other.position;
        self.scale = other.scale;
        self.rotation = other.rotation;
        self.raw_rotation = other.raw_rotation;
    }
}

impl Default for BoneMovement {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Quat::IDENTITY,
            raw_rotation: Vec3::ZERO,
        }
    }
}

/// The dual-buffer pose of a bone: what was last sent and what this tick
/// computed.
///
/// Both buffers are value types swapped at explicit tick boundaries, so the
/// pose being computed never aliases the pose last sent.
#[derive(Debug, Clone, PartialEq)]
pub struct BoneState {
    /// Last flushed pose.
    pub before: BoneMovement,
    /// Pose computed this tick.
    pub after: BoneMovement,
}

impl BoneState {
    /// Starts both buffers at the rest pose.
    #[must_use]
    pub fn at_rest(rest: &BoneMovement) -> Self {
        Self {
            before: rest.clone(),
            after: rest.clone(),
        }
    }

    /// Tick boundary: the freshly computed pose becomes the last sent one.
    #[inline]
    pub fn swap(&mut self) {
        self.before.set(&self.after);
    }

    /// Whether this tick's pose differs from the last sent one.
    #[inline]
    #[must_use]
    pub fn changed(&self) -> bool {
        self.before != self.after
    }
}

//! Mount capability and builtin controllers.

use glam::Vec3;

/// Mediates whether and how an entity rides a seat bone.
pub trait MountController: Send + Sync {
    /// Whether mounting is allowed at all.
    fn can_mount(&self) -> bool {
        true
    }

    /// Whether the rider steers the source entity.
    fn can_control(&self) -> bool {
        true
    }

    /// Whether steering may leave the ground.
    fn can_fly(&self) -> bool {
        false
    }

    /// Shapes the rider's raw movement input into the travel vector applied
    /// to the source entity.
    fn shape_input(&self, input: Vec3) -> Vec3;
}

/// Builtin controllers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountControllers {
    /// Not a seat; mounting always fails.
    Invalid,
    /// A passive seat: riding allowed, no control.
    None,
    /// Ground steering: lateral damped, reverse quartered, no vertical input.
    Walk,
    /// Aerial steering: like walk but keeps the vertical component.
    Fly,
}

impl MountController for MountControllers {
    fn can_mount(&self) -> bool {
        !matches!(self, Self::Invalid)
    }

    fn can_control(&self) -> bool {
        matches!(self, Self::Walk | Self::Fly)
    }

    fn can_fly(&self) -> bool {
        matches!(self, Self::Fly)
    }

    fn shape_input(&self, input: Vec3) -> Vec3 {
        match self {
            Self::Invalid | Self::None => Vec3::ZERO,
            Self::Walk | Self::Fly => {
                let mut shaped = input.normalize_or_zero();
                if matches!(self, Self::Walk) {
                    shaped.y = 0.0;
                }
                shaped.x *= 0.5;
                if shaped.z <= 0.0 {
                    shaped.z *= 0.25;
                }
                shaped
            }
        }
    }
}

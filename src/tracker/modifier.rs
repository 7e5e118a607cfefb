use bitflags::bitflags;
use glam::Quat;
use serde::{Deserialize, Serialize};

use crate::bone::tree::RootFrame;
use crate::platform::Location;

/// Static per-tracker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackerModifier {
    /// Whether per-viewer visibility uses sight tracing.
    #[serde(default = "default_true", rename = "sight-trace")]
    pub sight_trace: bool,
    /// Client render range of the model displays, in blocks.
    #[serde(default = "default_view_range", rename = "view-range")]
    pub view_range: f32,
    /// Whether the model tints red on source damage.
    #[serde(default = "default_true", rename = "damage-tint")]
    pub damage_tint: bool,
}

fn default_true() -> bool {
    true
}

fn default_view_range() -> f32 {
    48.0
}

impl TrackerModifier {
    /// The stock configuration.
    pub const DEFAULT: Self = Self {
        sight_trace: true,
        view_range: 48.0,
        damage_tint: true,
    };
}

impl Default for TrackerModifier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Where a tracker's uniform model scale comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ModelScaler {
    /// A constant scale.
    Fixed {
        /// The scale value.
        value: f32,
    },
    /// The source entity's own platform scale.
    Entity,
    /// The product of several scalers.
    Multiplied {
        /// Factors, applied in order.
        values: Vec<ModelScaler>,
    },
}

impl ModelScaler {
    /// The default scaler for entity-bound trackers.
    #[must_use]
    pub fn entity() -> Self {
        Self::Entity
    }

    /// Resolves the scale given the source entity's platform scale.
    #[must_use]
    pub fn scale(&self, entity_scale: f32) -> f32 {
        match self {
            Self::Fixed { value } => *value,
            Self::Entity => entity_scale,
            Self::Multiplied { values } => values.iter().map(|s| s.scale(entity_scale)).product(),
        }
    }
}

impl Default for ModelScaler {
    fn default() -> Self {
        Self::Entity
    }
}

/// Which source view angles rotate the model's root frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "kebab-case")]
pub enum ModelRotator {
    /// Follow the source yaw only.
    Yaw,
    /// Follow both yaw and pitch.
    YawPitch,
    /// A fixed orientation regardless of the source.
    Lock {
        /// Locked yaw in degrees.
        yaw: f32,
        /// Locked pitch in degrees.
        pitch: f32,
    },
}

impl ModelRotator {
    /// Resolves the root orientation for a source location.
    #[must_use]
    pub fn rotation(&self, location: &Location) -> Quat {
        let (yaw, pitch) = match self {
            Self::Yaw => (location.yaw, 0.0),
            Self::YawPitch => (location.yaw, location.pitch),
            Self::Lock { yaw, pitch } => (*yaw, *pitch),
        };
        Quat::from_rotation_y(-yaw.to_radians()) * Quat::from_rotation_x(pitch.to_radians())
    }

    /// Builds the full root frame together with a resolved scale.
    #[must_use]
    pub fn frame(&self, location: &Location, scale: f32) -> RootFrame {
        RootFrame {
            rotation: self.rotation(location),
            scale,
        }
    }
}

impl Default for ModelRotator {
    fn default() -> Self {
        Self::Yaw
    }
}

bitflags! {
    /// Which visuals of the source entity are suppressed while the model
    /// renders over it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct HideOption: u8 {
        /// Hide the entity itself.
        const VISIBILITY = 1;
        /// Hide worn equipment.
        const EQUIPMENT = 1 << 1;
        /// Hide the burning overlay.
        const FIRE = 1 << 2;
        /// Hide the glowing outline.
        const GLOWING = 1 << 3;
        /// Hide saddle-type cosmetics.
        const SADDLE = 1 << 4;
    }
}

impl HideOption {
    /// The stock option: only the entity itself is hidden.
    pub const DEFAULT: Self = Self::VISIBILITY;
}

impl Default for HideOption {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Serialize for HideOption {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        let mut seq = serializer.serialize_seq(Some(names.len()))?;
        for name in names {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for HideOption {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut flags = HideOption::empty();
        for name in names {
            match HideOption::from_name(&name) {
                Some(flag) => flags |= flag,
                None => log::warn!("unknown hide option `{name}` ignored"),
            }
        }
        Ok(flags)
    }
}

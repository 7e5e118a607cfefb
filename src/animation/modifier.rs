use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::animation::iterator::LoopType;

/// Playback knobs accepted by `Tracker::play`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationModifier {
    /// Playback speed multiplier.
    pub speed: f32,
    /// Lerp-in window in seconds when the animation starts.
    pub start: f32,
    /// Lerp-out window in seconds when the animation ends.
    pub end: f32,
    /// Overrides the clip's own override flag when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_mode: Option<bool>,
    /// Overrides the clip's default looping policy when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_override: Option<LoopType>,
    /// Restricts the animation's effect to a single viewer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Uuid>,
}

impl AnimationModifier {
    /// Standard playback: full speed, no lerp windows, no overrides.
    pub const DEFAULT: Self = Self {
        speed: 1.0,
        start: 0.0,
        end: 0.0,
        override_mode: None,
        loop_override: None,
        player: None,
    };

    /// Standard playback forced to play once, used for the spawn animation.
    pub const DEFAULT_WITH_PLAY_ONCE: Self = Self {
        loop_override: Some(LoopType::PlayOnce),
        ..Self::DEFAULT
    };

    /// Whether this modifier suppresses clips flagged as overriding.
    #[inline]
    #[must_use]
    pub fn overrides(&self, clip_default: bool) -> bool {
        self.override_mode.unwrap_or(clip_default)
    }
}

impl Default for AnimationModifier {
    fn default() -> Self {
        Self::DEFAULT
    }
}

use rustc_hash::FxHashMap;

use crate::animation::iterator::{AnimationIterator, LoopType};
use crate::animation::keyframe::{self, Progress};
use crate::animation::modifier::AnimationModifier;
use crate::animation::script::TimeScript;
use crate::animation::timed::TimedStorage;

/// The processed keyframe channel for a single bone.
#[derive(Debug, Clone)]
pub struct BoneAnimator {
    /// Raw authored bone name this channel targets.
    pub bone: String,
    keyframes: TimedStorage<Progress>,
}

impl BoneAnimator {
    /// Creates an animator from a built keyframe channel.
    #[must_use]
    pub fn new(bone: impl Into<String>, keyframes: TimedStorage<Progress>) -> Self {
        Self {
            bone: bone.into(),
            keyframes,
        }
    }

    /// Creates an iterator over the channel with the given policy.
    #[must_use]
    pub fn iterator(&self, loop_type: LoopType) -> AnimationIterator<Progress> {
        loop_type.iterator(self.keyframes.clone())
    }
}

/// A complete, processed animation for a model.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    /// Animation name, unique within a model.
    pub name: String,
    /// Default looping policy.
    pub loop_type: LoopType,
    /// Length in seconds.
    pub length: f32,
    /// Whether playing this clip stops every other running animation.
    pub overrides: bool,
    animators: FxHashMap<String, BoneAnimator>,
    script: Option<TimedStorage<TimeScript>>,
    empty: TimedStorage<Progress>,
}

impl AnimationClip {
    /// Assembles a clip from its per-bone channels.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        loop_type: LoopType,
        length: f32,
        overrides: bool,
        animators: Vec<BoneAnimator>,
        script: Option<TimedStorage<TimeScript>>,
    ) -> Self {
        Self {
            name: name.into(),
            loop_type,
            length,
            overrides,
            animators: animators
                .into_iter()
                .map(|a| (a.bone.clone(), a))
                .collect(),
            script,
            empty: keyframe::empty_storage(length),
        }
    }

    /// The channel for a bone, if this clip animates it.
    #[must_use]
    pub fn animator(&self, bone: &str) -> Option<&BoneAnimator> {
        self.animators.get(bone)
    }

    /// Iterator over the empty channel, used for bones this clip leaves
    /// untouched so that every bone advances on the same cadence.
    #[must_use]
    pub fn empty_iterator(&self, loop_type: LoopType) -> AnimationIterator<Progress> {
        loop_type.iterator(self.empty.clone())
    }

    /// Script events of this clip, unless the modifier suppresses them.
    ///
    /// Overriding playback and per-player playback both run without scripts.
    #[must_use]
    pub fn script(&self, modifier: &AnimationModifier) -> Option<&TimedStorage<TimeScript>> {
        if modifier.overrides(self.overrides) || modifier.player.is_some() {
            None
        } else {
            self.script.as_ref()
        }
    }
}

//! The processed model blueprint shared by every tracker of a model.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::animation::AnimationClip;
use crate::bone::BoneGroup;

/// An authored model: its bone hierarchy plus its animations, fully
/// processed and immutable.
pub struct ModelBlueprint {
    /// Model identifier.
    pub name: String,
    /// Root bone groups, in authored order.
    pub groups: Vec<Arc<BoneGroup>>,
    animations: FxHashMap<String, Arc<AnimationClip>>,
}

impl ModelBlueprint {
    /// Assembles a blueprint.
    #[must_use]
    pub fn new(name: impl Into<String>, groups: Vec<Arc<BoneGroup>>, clips: Vec<AnimationClip>) -> Self {
        Self {
            name: name.into(),
            groups,
            animations: clips
                .into_iter()
                .map(|c| (c.name.clone(), Arc::new(c)))
                .collect(),
        }
    }

    /// An animation by name.
    #[must_use]
    pub fn animation(&self, name: &str) -> Option<&Arc<AnimationClip>> {
        self.animations.get(name)
    }

    /// Names of every animation, in arbitrary order.
    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }
}

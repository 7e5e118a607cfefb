//! The render pipeline: one rendered bone tree, its running animations, its
//! IK chains and its viewers.
//!
//! Per tick the owning tracker calls, in order: [`RenderPipeline::advance`]
//! (keyframe clocks + pose composition), [`RenderPipeline::freeze`] (world
//! transforms + IK), then [`RenderPipeline::bundle`] (per-viewer deltas).
//! The pose is frozen before any bundling, so per-viewer flushing needs no
//! viewer-to-viewer ordering.

use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::animation::iterator::{AnimationIterator, LoopType};
use crate::animation::keyframe::Progress;
use crate::animation::modifier::AnimationModifier;
use crate::animation::script::TimeScript;
use crate::animation::timed::Timed;
use crate::animation::AnimationClip;
use crate::bone::ik::IkSolver;
use crate::bone::movement::BoneMovement;
use crate::bone::tree::{BoneKey, BoneTree, RootFrame};
use crate::errors::{MarionetteError, Result};
use crate::math;
use crate::model::ModelBlueprint;
use crate::platform::{BoneTransformUpdate, BundlerFactory, Location, PacketBundler};

/// A viewer's lifecycle against one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerPhase {
    /// Not receiving packets.
    Hidden,
    /// Shown this tick for the first time; the next bundle is a full send.
    Spawning,
    /// Receiving incremental deltas.
    Shown,
}

/// A keyframe cursor driven by wall-clock seconds instead of indices.
///
/// `pending` is the keyframe the pose is interpolating toward; once the
/// remaining window elapses it becomes `applied` and the next keyframe is
/// pulled from the iterator. Keyframes with non-increasing times collapse the
/// window to a hard step.
struct Channel<T> {
    iterator: AnimationIterator<T>,
    applied: Option<T>,
    pending: Option<T>,
    remaining: f32,
    window: f32,
    active: bool,
}

impl<T: Timed + Clone> Channel<T> {
    fn new(mut iterator: AnimationIterator<T>) -> Self {
        let pending = iterator.next();
        let remaining = pending.as_ref().map_or(0.0, Timed::time);
        Self {
            iterator,
            applied: None,
            pending,
            remaining,
            window: remaining,
            active: true,
        }
    }

    /// Advances the cursor by `dt` seconds, applying every keyframe whose
    /// time was crossed. `length` is the clip length, needed to measure the
    /// wrap-around window of looping playback.
    fn advance(&mut self, dt: f32, length: f32, mut on_apply: impl FnMut(&T)) {
        if !self.active {
            return;
        }
        self.remaining -= dt;
        while self.active && self.remaining <= math::FRAME_EPSILON {
            let Some(pending) = self.pending.take() else {
                self.active = false;
                break;
            };
            let applied_time = pending.time();
            on_apply(&pending);
            self.applied = Some(pending);

            match self.iterator.next() {
                Some(next) => {
                    let mut delta = next.time() - applied_time;
                    if delta <= math::FRAME_EPSILON {
                        if self.iterator.loop_type() == LoopType::Loop {
                            delta = (length - applied_time) + next.time();
                        }
                        if delta <= math::FRAME_EPSILON {
                            // Holding the same frame forever; the pose is final.
                            self.active = false;
                            break;
                        }
                    }
                    self.window = delta;
                    self.remaining += delta;
                    self.pending = Some(next);
                }
                None => self.active = false,
            }
        }
    }
}

/// One animation currently driving the pipeline's bones.
struct RunningAnimation {
    name: String,
    clip: Arc<AnimationClip>,
    modifier: AnimationModifier,
    channels: FxHashMap<BoneKey, Channel<Progress>>,
    script: Option<Channel<TimeScript>>,
    /// Hold-after-finish window in seconds (the modifier's lerp-out).
    linger: f32,
}

impl RunningAnimation {
    fn new(
        name: &str,
        clip: Arc<AnimationClip>,
        modifier: AnimationModifier,
        tree: &BoneTree,
    ) -> Self {
        let loop_type = modifier.loop_override.unwrap_or(clip.loop_type);
        let mut channels = FxHashMap::default();
        for key in tree.flatten() {
            let Some(bone) = tree.bone(key) else {
                continue;
            };
            let iterator = clip
                .animator(&bone.group().name.raw)
                .map_or_else(|| clip.empty_iterator(loop_type), |a| a.iterator(loop_type));
            let mut channel = Channel::new(iterator);
            if modifier.start > 0.0 {
                channel.remaining += modifier.start;
                channel.window += modifier.start;
            }
            channels.insert(key, channel);
        }
        let script = clip
            .script(&modifier)
            .map(|storage| Channel::new(loop_type.iterator(storage.clone())));
        Self {
            name: name.to_string(),
            linger: modifier.end,
            clip,
            modifier,
            channels,
            script,
        }
    }

    /// A play-once animation is finished when every channel ran out; looping
    /// and hold-on-last animations persist until stopped.
    fn finished(&self) -> bool {
        let loop_type = self.modifier.loop_override.unwrap_or(self.clip.loop_type);
        loop_type == LoopType::PlayOnce
            && self.channels.values().all(|c| !c.active)
            && self.script.as_ref().is_none_or(|c| !c.active)
    }

    /// Whether this animation affects the given viewer pass.
    fn applies_to(&self, viewer: Option<Uuid>) -> bool {
        match (self.modifier.player, viewer) {
            (None, _) => true,
            (Some(p), Some(v)) => p == v,
            (Some(_), None) => false,
        }
    }
}

/// One model instance: bone tree, animation layers, IK chains, viewers.
pub struct RenderPipeline {
    name: String,
    blueprint: Arc<ModelBlueprint>,
    tree: BoneTree,
    ik: IkSolver,
    running: Vec<RunningAnimation>,
    viewers: FxHashMap<Uuid, ViewerPhase>,
    scoped: SmallVec<[Uuid; 2]>,
    last_anchor: Option<(Vec3, RootFrame)>,
}

impl RenderPipeline {
    /// Instantiates a pipeline from a blueprint.
    #[must_use]
    pub fn new(name: impl Into<String>, blueprint: Arc<ModelBlueprint>) -> Self {
        let tree = BoneTree::build(&blueprint.groups);
        Self {
            name: name.into(),
            blueprint,
            tree,
            ik: IkSolver::new(),
            running: Vec::new(),
            viewers: FxHashMap::default(),
            scoped: SmallVec::new(),
            last_anchor: None,
        }
    }

    /// Pipeline name; unique per tracker of one entity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared model blueprint.
    #[must_use]
    pub fn blueprint(&self) -> &Arc<ModelBlueprint> {
        &self.blueprint
    }

    /// The rendered bone tree.
    #[must_use]
    pub fn tree(&self) -> &BoneTree {
        &self.tree
    }

    /// Mutable access to the rendered bone tree.
    pub fn tree_mut(&mut self) -> &mut BoneTree {
        &mut self.tree
    }

    /// Names of the currently running animations, in layer order.
    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.running.iter().map(|a| a.name.as_str())
    }

    // ------------------------------------------------------------------
    // Animation control
    // ------------------------------------------------------------------

    /// Starts an animation layer.
    ///
    /// A clip (or modifier) flagged as overriding stops every other layer
    /// first. Playing a name that is already running for the same player
    /// scope replaces that layer.
    pub fn play(&mut self, name: &str, modifier: AnimationModifier) -> Result<()> {
        let clip = self
            .blueprint
            .animation(name)
            .ok_or_else(|| MarionetteError::UnknownAnimation(name.to_string()))?
            .clone();
        if modifier.overrides(clip.overrides) {
            self.running.clear();
        } else {
            self.running
                .retain(|a| !(a.name == name && a.modifier.player == modifier.player));
        }
        self.running
            .push(RunningAnimation::new(name, clip, modifier, &self.tree));
        Ok(())
    }

    /// Stops every layer playing the named animation. Returns whether any
    /// layer was removed.
    pub fn stop(&mut self, name: &str) -> bool {
        let before = self.running.len();
        self.running.retain(|a| a.name != name);
        before != self.running.len()
    }

    /// Advances every animation layer by `dt` seconds and recomputes local
    /// poses. Script events crossed this tick are pushed to `signals`;
    /// finished play-once animations are removed and their names returned.
    pub fn advance(&mut self, dt: f32, signals: &mut Vec<String>) -> Vec<String> {
        for animation in &mut self.running {
            let scaled = dt * animation.modifier.speed.max(0.0);
            let length = animation.clip.length;
            for channel in animation.channels.values_mut() {
                channel.advance(scaled, length, |_| {});
            }
            if let Some(script) = &mut animation.script {
                script.advance(scaled, length, |event| signals.push(event.signal.clone()));
            }
        }

        let mut ended = Vec::new();
        self.running.retain_mut(|animation| {
            if !animation.finished() {
                return true;
            }
            animation.linger -= dt;
            if animation.linger > 0.0 {
                return true;
            }
            log::debug!("animation `{}` finished", animation.name);
            ended.push(animation.name.clone());
            false
        });

        // Viewers that lost their last scoped layer drop their overrides.
        let scoped: SmallVec<[Uuid; 2]> = {
            let mut set = SmallVec::new();
            for animation in &self.running {
                if let Some(player) = animation.modifier.player {
                    if !set.contains(&player) {
                        set.push(player);
                    }
                }
            }
            set
        };
        for viewer in &self.scoped {
            if !scoped.contains(viewer) {
                self.tree.clear_viewer(*viewer);
            }
        }
        self.scoped = scoped;

        self.build_pose(None);
        for viewer in self.scoped.clone() {
            self.build_pose(Some(viewer));
        }
        ended
    }

    /// Composes the local pose of every bone for one viewer pass, applying
    /// each active layer's current keyframe in layer order into a shared
    /// destination buffer.
    fn build_pose(&mut self, viewer: Option<Uuid>) {
        let keys: Vec<BoneKey> = self.tree.flatten().collect();
        let mut current = BoneMovement::default();
        let mut dest = BoneMovement::default();
        for key in keys {
            let Some(bone) = self.tree.bone(key) else {
                continue;
            };
            current.set(bone.rest());
            let mut global = false;
            let mut hard_cut = false;
            let mut window = 0.0_f32;
            for animation in &self.running {
                if !animation.applies_to(viewer) {
                    continue;
                }
                let Some(channel) = animation.channels.get(&key) else {
                    continue;
                };
                let Some(progress) = &channel.applied else {
                    continue;
                };
                progress.animate(&current, &mut dest);
                std::mem::swap(&mut current, &mut dest);
                global |= progress.global_rotation();
                hard_cut |= progress.skip_interpolation();
                window = window.max(channel.window);
            }
            match viewer {
                None => {
                    let bone = self.tree.bone_mut(key).expect("key collected above");
                    bone.state.after.set(&current);
                    bone.global_rotation = global;
                    bone.interpolation = window;
                    bone.hard_cut = hard_cut;
                }
                Some(v) => {
                    self.tree.ensure_viewer_state(key, v);
                    let bone = self.tree.bone_mut(key).expect("key collected above");
                    if let Some(state) = bone.viewer_states.get_mut(&v) {
                        state.after.set(&current);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // IK
    // ------------------------------------------------------------------

    /// Registers an IK locator chain by authored bone uuids. Invalid or
    /// too-short chains register nothing.
    pub fn add_locator(&mut self, source: Option<Uuid>, target: Uuid, locator: Uuid) {
        self.ik.add_locator(&self.tree, source, target, locator);
    }

    /// Number of registered IK chains.
    #[must_use]
    pub fn ik_chain_count(&self) -> usize {
        self.ik.chain_count()
    }

    /// Solves every IK chain against the given viewer's frozen pose.
    pub fn solve_ik(&mut self, viewer: Option<Uuid>) {
        self.ik.solve(&mut self.tree, viewer);
    }

    /// Recomputes world transforms for every pass, then reconciles IK
    /// chains. Must run after [`Self::advance`] and before [`Self::bundle`].
    pub fn freeze(&mut self, frame: &RootFrame) {
        self.tree.update_world(frame, None);
        self.ik.solve(&mut self.tree, None);
        for viewer in self.scoped.clone() {
            self.tree.update_world(frame, Some(viewer));
            self.ik.solve(&mut self.tree, Some(viewer));
        }
    }

    // ------------------------------------------------------------------
    // Viewers & bundling
    // ------------------------------------------------------------------

    /// Starts showing the pipeline to a viewer. Returns `false` when the
    /// viewer was already shown or spawning.
    pub fn show(&mut self, viewer: Uuid) -> bool {
        match self.viewers.get(&viewer) {
            Some(ViewerPhase::Shown | ViewerPhase::Spawning) => false,
            _ => {
                self.viewers.insert(viewer, ViewerPhase::Spawning);
                true
            }
        }
    }

    /// Stops showing the pipeline to a viewer. Returns `false` when the
    /// viewer was already hidden.
    pub fn hide(&mut self, viewer: Uuid) -> bool {
        match self.viewers.get_mut(&viewer) {
            Some(phase) if *phase != ViewerPhase::Hidden => {
                *phase = ViewerPhase::Hidden;
                true
            }
            _ => false,
        }
    }

    /// A viewer's current phase.
    #[must_use]
    pub fn viewer_phase(&self, viewer: Uuid) -> ViewerPhase {
        self.viewers
            .get(&viewer)
            .copied()
            .unwrap_or(ViewerPhase::Hidden)
    }

    /// Viewers currently receiving packets.
    #[must_use]
    pub fn active_viewers(&self) -> Vec<Uuid> {
        self.viewers
            .iter()
            .filter(|(_, phase)| **phase != ViewerPhase::Hidden)
            .map(|(viewer, _)| *viewer)
            .collect()
    }

    /// Collects this tick's minimal transform deltas per viewer and flushes
    /// each non-empty bundle once. Finishes the tick by swapping the dual
    /// pose buffers.
    ///
    /// A bone is bundled when its local pose changed, when IK touched it,
    /// when the source anchor moved, or when the viewer is spawning (full
    /// send).
    pub fn bundle<F: BundlerFactory>(&mut self, anchor: &Location, frame: &RootFrame, factory: &mut F) {
        let moved = self
            .last_anchor
            .is_none_or(|(position, last_frame)| position != anchor.position || last_frame != *frame);
        self.last_anchor = Some((anchor.position, *frame));

        let keys: Vec<BoneKey> = self.tree.flatten().collect();
        let targets: Vec<(Uuid, bool)> = self
            .viewers
            .iter()
            .filter(|(_, phase)| **phase != ViewerPhase::Hidden)
            .map(|(viewer, phase)| (*viewer, *phase == ViewerPhase::Spawning))
            .collect();

        for (viewer, spawning) in targets {
            let mut bundler = factory.create();
            for &key in &keys {
                let Some(bone) = self.tree.bone(key) else {
                    continue;
                };
                let state = bone.state(Some(viewer));
                if spawning || moved || bone.dirty || state.changed() {
                    let world = bone.world(Some(viewer));
                    bundler.transform(BoneTransformUpdate {
                        bone: bone.group().uuid,
                        position: anchor.position + world.position,
                        rotation: world.rotation,
                        scale: world.scale,
                        interpolation: if spawning || bone.hard_cut {
                            0.0
                        } else {
                            bone.interpolation
                        },
                    });
                }
            }
            if !bundler.is_empty() {
                factory.send(viewer, bundler);
            }
            if spawning {
                self.viewers.insert(viewer, ViewerPhase::Shown);
            }
        }

        self.tree.swap_states();
    }
}

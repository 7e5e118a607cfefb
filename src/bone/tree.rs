use std::sync::Arc;

use glam::{Quat, Vec3};
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, SparseSecondaryMap, new_key_type};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::bone::attachment::BoneAttachment;
use crate::bone::group::BoneGroup;
use crate::bone::movement::{BoneMovement, BoneState};
use crate::math;

new_key_type! {
    /// Handle of a rendered bone inside its tracker's [`BoneTree`].
    pub struct BoneKey;
}

/// A bone's composed transform in model space (relative to the tracker's
/// source position).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldTransform {
    /// Model-space position.
    pub position: Vec3,
    /// Model-space rotation.
    pub rotation: Quat,
    /// Accumulated scale.
    pub scale: Vec3,
}

impl Default for WorldTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// The parent frame of root bones: the tracker's source orientation and model
/// scale. Root positions stay in model space; the source's world location is
/// added at packet time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RootFrame {
    /// Source orientation (from the model rotator).
    pub rotation: Quat,
    /// Uniform model scale (from the model scaler).
    pub scale: f32,
}

impl Default for RootFrame {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            scale: 1.0,
        }
    }
}

/// Runtime state of one bone inside a tracker.
#[derive(Debug)]
pub struct RenderedBone {
    group: Arc<BoneGroup>,
    parent: Option<BoneKey>,
    children: SmallVec<[BoneKey; 4]>,
    rest: BoneMovement,
    pub(crate) state: BoneState,
    pub(crate) viewer_states: FxHashMap<Uuid, BoneState>,
    world: WorldTransform,
    viewer_worlds: FxHashMap<Uuid, WorldTransform>,
    /// Whether any keyframe applied this tick rotates in the global frame.
    pub(crate) global_rotation: bool,
    /// Client-side interpolation window for this tick's pose, in seconds.
    pub(crate) interpolation: f32,
    /// Whether this tick's pose is a hard cut (no client interpolation).
    pub(crate) hard_cut: bool,
    /// Set when something other than the keyframe pass (IK) moved the bone.
    pub(crate) dirty: bool,
}

impl RenderedBone {
    /// The authored definition this bone was instantiated from.
    #[inline]
    #[must_use]
    pub fn group(&self) -> &Arc<BoneGroup> {
        &self.group
    }

    /// Parent handle, `None` for roots.
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<BoneKey> {
        self.parent
    }

    /// Child handles.
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[BoneKey] {
        &self.children
    }

    /// The parent-relative rest pose.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &BoneMovement {
        &self.rest
    }

    /// Dual-buffer pose for diffing. `None` means the authoritative state;
    /// a viewer without an override falls back to it.
    #[must_use]
    pub fn state(&self, viewer: Option<Uuid>) -> &BoneState {
        viewer
            .and_then(|v| self.viewer_states.get(&v))
            .unwrap_or(&self.state)
    }

    /// Composed model-space transform, with the same viewer fallback as
    /// [`Self::state`].
    #[must_use]
    pub fn world(&self, viewer: Option<Uuid>) -> &WorldTransform {
        viewer
            .and_then(|v| self.viewer_worlds.get(&v))
            .unwrap_or(&self.world)
    }
}

/// The runtime bone tree of one tracker: an arena of [`RenderedBone`]s with
/// handle-based hierarchy links and name/uuid lookup.
pub struct BoneTree {
    bones: SlotMap<BoneKey, RenderedBone>,
    roots: Vec<BoneKey>,
    by_name: FxHashMap<String, BoneKey>,
    by_uuid: FxHashMap<Uuid, BoneKey>,
    attachments: SparseSecondaryMap<BoneKey, Vec<Box<dyn BoneAttachment>>>,
}

impl BoneTree {
    /// Instantiates the authored group hierarchy, depth-first from roots to
    /// leaves. Each bone pre-computes its rest offset relative to its parent.
    #[must_use]
    pub fn build(groups: &[Arc<BoneGroup>]) -> Self {
        let mut tree = Self {
            bones: SlotMap::with_key(),
            roots: Vec::new(),
            by_name: FxHashMap::default(),
            by_uuid: FxHashMap::default(),
            attachments: SparseSecondaryMap::new(),
        };
        for group in groups {
            let key = tree.insert(group, None);
            tree.roots.push(key);
        }
        tree
    }

    fn insert(&mut self, group: &Arc<BoneGroup>, parent: Option<BoneKey>) -> BoneKey {
        let offset = match parent {
            Some(p) => group.origin - self.bones[p].group.origin,
            None => group.origin,
        };
        let rest = BoneMovement::new(
            offset,
            Vec3::ONE,
            math::to_quaternion(group.rotation),
            group.rotation,
        );
        let key = self.bones.insert(RenderedBone {
            group: Arc::clone(group),
            parent,
            children: SmallVec::new(),
            state: BoneState::at_rest(&rest),
            rest,
            viewer_states: FxHashMap::default(),
            world: WorldTransform::default(),
            viewer_worlds: FxHashMap::default(),
            global_rotation: false,
            interpolation: 0.0,
            hard_cut: false,
            dirty: false,
        });
        self.by_name.insert(group.name.raw.clone(), key);
        self.by_uuid.insert(group.uuid, key);
        if let Some(p) = parent {
            self.bones[p].children.push(key);
        }
        for child in &group.children {
            self.insert(child, Some(key));
        }
        key
    }

    /// Number of bones.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    /// Whether the tree has no bones.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Root handles, in authored order.
    #[inline]
    #[must_use]
    pub fn roots(&self) -> &[BoneKey] {
        &self.roots
    }

    /// Bone by handle. Stale handles return `None`.
    #[inline]
    #[must_use]
    pub fn bone(&self, key: BoneKey) -> Option<&RenderedBone> {
        self.bones.get(key)
    }

    /// Mutable bone by handle.
    #[inline]
    pub fn bone_mut(&mut self, key: BoneKey) -> Option<&mut RenderedBone> {
        self.bones.get_mut(key)
    }

    /// Handle by raw authored name. Bone sets vary per model, so a miss is a
    /// plain `None`, never an error.
    #[must_use]
    pub fn key_by_name(&self, raw: &str) -> Option<BoneKey> {
        self.by_name.get(raw).copied()
    }

    /// Handle by authored uuid.
    #[must_use]
    pub fn key_by_uuid(&self, uuid: Uuid) -> Option<BoneKey> {
        self.by_uuid.get(&uuid).copied()
    }

    /// Depth-first traversal over the whole tree. Recomputed each call,
    /// restartable.
    #[must_use]
    pub fn flatten(&self) -> Flatten<'_> {
        Flatten {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Depth-first traversal of the subtree rooted at `key` (inclusive).
    #[must_use]
    pub fn flatten_from(&self, key: BoneKey) -> Flatten<'_> {
        Flatten {
            tree: self,
            stack: vec![key],
        }
    }

    /// Whether `needle` lies in the subtree rooted at `ancestor`
    /// (inclusive). Walks parent links upward.
    #[must_use]
    pub fn subtree_contains(&self, ancestor: BoneKey, needle: BoneKey) -> bool {
        let mut cursor = Some(needle);
        while let Some(key) = cursor {
            if key == ancestor {
                return true;
            }
            cursor = self.bones.get(key).and_then(RenderedBone::parent);
        }
        false
    }

    /// Makes sure `key` has a dedicated state buffer for `viewer`, seeded
    /// from the authoritative state.
    pub fn ensure_viewer_state(&mut self, key: BoneKey, viewer: Uuid) {
        if let Some(bone) = self.bones.get_mut(key) {
            if !bone.viewer_states.contains_key(&viewer) {
                bone.viewer_states.insert(viewer, bone.state.clone());
            }
        }
    }

    /// Drops every per-viewer buffer for `viewer`.
    pub fn clear_viewer(&mut self, viewer: Uuid) {
        for (_, bone) in &mut self.bones {
            bone.viewer_states.remove(&viewer);
            bone.viewer_worlds.remove(&viewer);
        }
    }

    /// Recomputes model-space world transforms for every bone, top down.
    ///
    /// Composition per bone: scale multiplies, position is the parent's
    /// position plus the rotated, scaled local offset, and rotation composes
    /// locally, unless a keyframe this tick asked for global rotation, in
    /// which case the bone's rotation pre-multiplies the parent orientation.
    pub fn update_world(&mut self, frame: &RootFrame, viewer: Option<Uuid>) {
        let mut stack: Vec<(BoneKey, WorldTransform)> = self
            .roots
            .iter()
            .rev()
            .map(|&k| {
                (
                    k,
                    WorldTransform {
                        position: Vec3::ZERO,
                        rotation: frame.rotation,
                        scale: Vec3::splat(frame.scale),
                    },
                )
            })
            .collect();

        while let Some((key, parent)) = stack.pop() {
            let bone = &mut self.bones[key];
            let local = viewer
                .and_then(|v| bone.viewer_states.get(&v))
                .unwrap_or(&bone.state)
                .after
                .clone();

            let world = WorldTransform {
                scale: parent.scale * local.scale,
                rotation: if bone.global_rotation {
                    local.rotation * parent.rotation
                } else {
                    parent.rotation * local.rotation
                },
                position: parent.position + parent.rotation * (local.position * parent.scale),
            };

            match viewer {
                Some(v) => {
                    bone.viewer_worlds.insert(v, world);
                }
                None => bone.world = world,
            }

            for &child in bone.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    /// Mutable world transform for IK write-back; marks the bone dirty so the
    /// change is bundled even though its local state did not move. For a
    /// viewer pass the override entry is seeded from the authoritative
    /// transform.
    pub(crate) fn world_mut(&mut self, key: BoneKey, viewer: Option<Uuid>) -> &mut WorldTransform {
        let bone = &mut self.bones[key];
        bone.dirty = true;
        match viewer {
            Some(v) => bone.viewer_worlds.entry(v).or_insert(bone.world),
            None => &mut bone.world,
        }
    }

    /// Resolves a bone's model-space point for an optional viewer:
    /// `world.position + world.rotation * (local_offset * world.scale) +
    /// global_offset`.
    #[must_use]
    pub fn world_position(
        &self,
        key: BoneKey,
        local_offset: Vec3,
        global_offset: Vec3,
        viewer: Option<Uuid>,
    ) -> Option<Vec3> {
        let world = self.bones.get(key)?.world(viewer);
        Some(world.position + world.rotation * (local_offset * world.scale) + global_offset)
    }

    /// Tick boundary: every computed pose becomes the last sent one and the
    /// dirty marks are consumed.
    pub fn swap_states(&mut self) {
        for (_, bone) in &mut self.bones {
            bone.state.swap();
            for state in bone.viewer_states.values_mut() {
                state.swap();
            }
            bone.dirty = false;
        }
    }

    /// Attaches something to a bone.
    pub fn attach(&mut self, key: BoneKey, attachment: Box<dyn BoneAttachment>) {
        if self.bones.contains_key(key) {
            self.attachments
                .entry(key)
                .expect("bone key verified above")
                .or_insert_with(Vec::new)
                .push(attachment);
        }
    }

    /// Updates every attachment against its bone's frozen world transform.
    pub fn update_attachments(&mut self, viewer: Option<Uuid>) {
        let keys: Vec<BoneKey> = self.attachments.keys().collect();
        for key in keys {
            let Some(mut list) = self.attachments.remove(key) else {
                continue;
            };
            if let Some(bone) = self.bones.get(key) {
                for attachment in &mut list {
                    attachment.update(bone, viewer);
                }
            }
            self.attachments.insert(key, list);
        }
    }

    /// Removes and cleans up every attachment; called when the tracker
    /// closes.
    pub fn detach_all(&mut self) {
        let keys: Vec<BoneKey> = self.attachments.keys().collect();
        for key in keys {
            if let Some(mut list) = self.attachments.remove(key) {
                for attachment in &mut list {
                    attachment.remove();
                }
            }
        }
    }
}

/// Restartable depth-first iterator over bone handles.
pub struct Flatten<'a> {
    tree: &'a BoneTree,
    stack: Vec<BoneKey>,
}

impl Iterator for Flatten<'_> {
    type Item = BoneKey;

    fn next(&mut self) -> Option<BoneKey> {
        let key = self.stack.pop()?;
        if let Some(bone) = self.tree.bones.get(key) {
            for &child in bone.children.iter().rev() {
                self.stack.push(child);
            }
        }
        Some(key)
    }
}

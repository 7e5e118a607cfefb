use glam::Vec3;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::bone::tree::{BoneKey, BoneTree};
use crate::math;

/// Iteration cap of one FABRIK solve.
const MAX_IK_ITERATIONS: usize = 20;

/// A registered chain: the ordered bones between a source and a target,
/// driven toward a locator bone. Scratch buffers are sized once at
/// registration so a solve allocates nothing.
struct IkChain {
    locator: BoneKey,
    source: BoneKey,
    bones: SmallVec<[BoneKey; 8]>,
    lengths: Vec<f32>,
    positions: Vec<Vec3>,
}

/// Positional IK over registered locator chains.
///
/// Chains are rebuilt only when locators are registered, never per tick.
#[derive(Default)]
pub struct IkSolver {
    chains: Vec<IkChain>,
}

impl IkSolver {
    /// Creates an empty solver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered chains.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Registers a locator chain.
    ///
    /// Walks the subtree under `source` (or the target's tree root when
    /// unspecified) and keeps the bones whose subtree contains `target` but
    /// not the locator itself; a chain must never solve through the bone
    /// driving it. Chains shorter than two bones register nothing; many bone
    /// layouts simply have no valid chain there.
    pub fn add_locator(
        &mut self,
        tree: &BoneTree,
        source: Option<Uuid>,
        target: Uuid,
        locator: Uuid,
    ) {
        let Some(target_key) = tree.key_by_uuid(target) else {
            return;
        };
        let Some(locator_key) = tree.key_by_uuid(locator) else {
            return;
        };
        let source_key = source
            .and_then(|uuid| tree.key_by_uuid(uuid))
            .unwrap_or_else(|| root_of(tree, target_key));

        let bones: SmallVec<[BoneKey; 8]> = tree
            .flatten_from(source_key)
            .filter(|&key| {
                tree.subtree_contains(key, target_key) && !tree.subtree_contains(key, locator_key)
            })
            .collect();
        if bones.len() < 2 {
            log::debug!("ik chain shorter than two bones, skipping locator");
            return;
        }
        let count = bones.len();
        self.chains.push(IkChain {
            locator: locator_key,
            source: source_key,
            bones,
            lengths: vec![0.0; count - 1],
            positions: vec![Vec3::ZERO; count],
        });
    }

    /// Solves every chain against the given viewer's frozen pose.
    ///
    /// Runs after all keyframe layers for the tick; the solved positions and
    /// the rotations derived from them overwrite the bones' world transforms
    /// and are not re-blended with lower-priority animation layers. A chain
    /// whose effector already sits on its target is left untouched.
    pub fn solve(&mut self, tree: &mut BoneTree, viewer: Option<Uuid>) {
        'chains: for chain in &mut self.chains {
            for (slot, &key) in chain.positions.iter_mut().zip(chain.bones.iter()) {
                let Some(bone) = tree.bone(key) else {
                    continue 'chains;
                };
                *slot = bone.world(viewer).position;
            }
            let Some(target) = tree.bone(chain.locator).map(|b| b.world(viewer).position)
            else {
                continue;
            };

            if !fabrik(&mut chain.positions, &mut chain.lengths, target) {
                continue;
            }

            let inverted_source = tree
                .bone(chain.source)
                .map_or(glam::Quat::IDENTITY, |b| b.world(viewer).rotation.inverse());

            for i in 0..chain.bones.len() - 1 {
                let direction = chain.positions[i + 1] - chain.positions[i];
                let world = tree.world_mut(chain.bones[i], viewer);
                world.rotation =
                    math::from_to_rotation(Vec3::Y, direction) * inverted_source * world.rotation;
                world.position = chain.positions[i];
            }
            let last = chain.bones.len() - 1;
            tree.world_mut(chain.bones[last], viewer).position = chain.positions[last];
        }
    }
}

/// Forward-and-backward reaching pass over a chain of joint positions.
/// Returns whether any joint moved.
///
/// Segment lengths are recomputed every solve (bones may have been scaled or
/// animated since the last one) but are pinned within the pass. Degenerate
/// segments are skipped in the lerp step so a zero-length segment can never
/// feed NaN into a joint. A perfectly straight chain cannot fold toward an
/// interior target, so a stalled iteration nudges the interior joints off
/// the axis before continuing.
fn fabrik(positions: &mut [Vec3], lengths: &mut [f32], target: Vec3) -> bool {
    let count = positions.len();
    let root = positions[0];
    let last = count - 1;

    if positions[last].distance_squared(target) < math::DISTANCE_THRESHOLD_SQ {
        return false;
    }

    let mut total = 0.0;
    for i in 0..last {
        lengths[i] = positions[i].distance(positions[i + 1]);
        total += lengths[i];
    }

    if root.distance(target) >= total {
        // Out of reach: extend the chain straight toward the target.
        let direction = (target - root).normalize_or_zero();
        if direction == Vec3::ZERO {
            return false;
        }
        for i in 0..last {
            positions[i + 1] = positions[i] + direction * lengths[i];
        }
        return true;
    }

    let mut previous = f32::INFINITY;
    for _ in 0..MAX_IK_ITERATIONS {
        // Forward: pin the effector to the target, walk back toward the root.
        positions[last] = target;
        for i in (0..last).rev() {
            let distance = positions[i].distance(positions[i + 1]);
            if distance < math::FLOAT_EPSILON {
                continue;
            }
            positions[i] = positions[i + 1].lerp(positions[i], lengths[i] / distance);
        }
        // Backward: re-pin the root, walk forward toward the effector.
        positions[0] = root;
        for i in 0..last {
            let distance = positions[i].distance(positions[i + 1]);
            if distance < math::FLOAT_EPSILON {
                continue;
            }
            positions[i + 1] = positions[i].lerp(positions[i + 1], lengths[i] / distance);
        }

        let error = positions[last].distance_squared(target);
        if error < math::DISTANCE_THRESHOLD_SQ {
            break;
        }
        if previous - error < math::FLOAT_EPSILON {
            // Stalled: a straight chain cannot fold, so bend the interior
            // joints off the root-target axis and let the reaching passes
            // settle the fold.
            let ortho = orthogonal(target - root);
            for i in 1..last {
                positions[i] += ortho * (0.25 * lengths[i - 1]);
            }
        }
        previous = error;
    }
    true
}

/// A deterministic unit vector orthogonal to `v`.
fn orthogonal(v: Vec3) -> Vec3 {
    let candidate = if v.x.abs() < 0.9 * v.length() {
        Vec3::X
    } else {
        Vec3::Y
    };
    let ortho = v.cross(candidate).normalize_or_zero();
    if ortho == Vec3::ZERO { Vec3::X } else { ortho }
}

fn root_of(tree: &BoneTree, key: BoneKey) -> BoneKey {
    let mut cursor = key;
    while let Some(parent) = tree.bone(cursor).and_then(super::tree::RenderedBone::parent) {
        cursor = parent;
    }
    cursor
}

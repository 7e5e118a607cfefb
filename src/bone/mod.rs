//! Bone data: authored groups, runtime tree, movements and IK.
//!
//! The authored model is an immutable [`BoneGroup`] hierarchy. Each tracker
//! instantiates it once into a [`BoneTree`]: an arena of [`RenderedBone`]s
//! addressed by [`BoneKey`] handles, so parent back-references are indices
//! rather than owning pointers.

pub mod attachment;
pub mod group;
pub mod ik;
pub mod movement;
pub mod name;
pub mod tree;

pub use attachment::BoneAttachment;
pub use group::{BoneGroup, BoundingBox, DisplayItem, MountClass};
pub use ik::IkSolver;
pub use movement::{BoneMovement, BoneState};
pub use name::{BoneName, BoneTag};
pub use tree::{BoneKey, BoneTree, RenderedBone, RootFrame, WorldTransform};

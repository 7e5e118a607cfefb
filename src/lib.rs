//! Marionette, a server-side bone transform & animation engine.
//!
//! Renders externally-authored models (bone hierarchies with keyframe
//! animations) as packet-driven entities bound to a live entity, a player or
//! a fixed point, without touching game assets. The host platform stays
//! behind narrow traits: entities and locations come in through
//! [`platform`], transform deltas go out through a per-viewer
//! [`platform::PacketBundler`].
//!
//! Per tick: animation iterators advance, bone movements compose, IK chains
//! reconcile against their locators, world transforms freeze, and per-viewer
//! deltas bundle and flush.

pub mod animation;
pub mod bone;
pub mod errors;
pub mod math;
pub mod model;
pub mod mount;
pub mod pipeline;
pub mod platform;
pub mod tracker;
pub mod visibility;

pub use animation::{AnimationClip, AnimationIterator, AnimationModifier, LoopType, TimedStorage};
pub use bone::{BoneGroup, BoneKey, BoneMovement, BoneName, BoneTree, IkSolver, RenderedBone};
pub use errors::{MarionetteError, Result};
pub use model::ModelBlueprint;
pub use mount::{MountController, MountControllers};
pub use pipeline::{RenderPipeline, ViewerPhase};
pub use platform::{BufferedBundler, BundlerFactory, Location, PacketBundler};
pub use tracker::{CloseReason, EntityTrackerRegistry, Tracker, TrackerData, TrackerSource};

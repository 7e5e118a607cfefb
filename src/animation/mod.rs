//! Keyframe storage, iteration and clip data.
//!
//! - [`TimedStorage`]: immutable, indexable sequence of timestamped samples
//! - [`AnimationIterator`]: stateful cursor with three looping policies
//! - [`Progress`]: one keyframe's effect on a bone movement
//! - [`AnimationClip`]: a complete named animation for a model
//! - [`AnimationModifier`]: playback knobs passed to `play`

pub mod clip;
pub mod iterator;
pub mod keyframe;
pub mod modifier;
pub mod script;
pub mod timed;

pub use clip::{AnimationClip, BoneAnimator};
pub use iterator::{AnimationIterator, LoopType};
pub use keyframe::{KeyframeBuilder, Progress};
pub use modifier::AnimationModifier;
pub use script::TimeScript;
pub use timed::{Timed, TimedStorage};

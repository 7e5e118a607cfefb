use std::sync::Arc;

use glam::Vec3;

use crate::animation::timed::{Timed, TimedStorage};
use crate::bone::movement::BoneMovement;
use crate::math;

/// Keyframe channel data for one bone, stored structure-of-arrays so every
/// [`Progress`] is a cheap index view.
#[derive(Debug)]
pub struct KeyframeData {
    rotate_global: bool,
    skip_interpolation: Box<[bool]>,
    times: Box<[f32]>,
    position: Box<[Vec3]>,
    scale: Box<[Vec3]>,
    rotation: Box<[Vec3]>,
}

/// One keyframe's effect on a bone movement.
///
/// The `Empty` variant applies identity (copies the current pose through) and
/// backs bones an animation does not touch, so every bone has uniform
/// per-frame cost.
#[derive(Debug, Clone)]
pub enum Progress {
    /// No authored effect at this time.
    Empty {
        /// Keyframe time in seconds
        time: f32,
    },
    /// An authored keyframe inside a [`KeyframeData`] block.
    Frame {
        /// Shared channel data
        data: Arc<KeyframeData>,
        /// Index of this keyframe within the channel
        index: usize,
    },
}

impl Progress {
    /// An empty progress at the given time.
    #[inline]
    #[must_use]
    pub fn empty(time: f32) -> Self {
        Self::Empty { time }
    }

    /// Applies this keyframe to `current`, writing the result into `dest`.
    ///
    /// Position adds, scale multiplies, and the rotation quaternion is
    /// recomputed from the accumulated raw euler degrees. The empty variant is
    /// an exact copy.
    pub fn animate(&self, current: &BoneMovement, dest: &mut BoneMovement) {
        dest.set(current);
        if let Self::Frame { data, index } = self {
            let i = *index;
            dest.position += data.position[i];
            dest.scale *= data.scale[i];
            dest.raw_rotation += data.rotation[i];
            dest.rotation = math::to_quaternion(dest.raw_rotation);
        }
    }

    /// Whether client-side interpolation toward this keyframe is skipped
    /// (hard cut).
    #[inline]
    #[must_use]
    pub fn skip_interpolation(&self) -> bool {
        match self {
            Self::Empty { .. } => false,
            Self::Frame { data, index } => data.skip_interpolation[*index],
        }
    }

    /// Whether the rotation of this keyframe is applied in the model's global
    /// frame rather than the bone-local one.
    #[inline]
    #[must_use]
    pub fn global_rotation(&self) -> bool {
        match self {
            Self::Empty { .. } => false,
            Self::Frame { data, .. } => data.rotate_global,
        }
    }
}

impl Timed for Progress {
    fn time(&self) -> f32 {
        match self {
            Self::Empty { time } => *time,
            Self::Frame { data, index } => data.times[*index],
        }
    }
}

/// Builds the keyframe storage for one bone channel.
///
/// Authored scale is stored as `1 + value` so it can be applied
/// multiplicatively; keyframes with no authored effect collapse to the empty
/// progress.
pub struct KeyframeBuilder {
    rotate_global: bool,
    skip_interpolation: Vec<bool>,
    times: Vec<f32>,
    position: Vec<Vec3>,
    scale: Vec<Vec3>,
    rotation: Vec<Vec3>,
    empty: Vec<bool>,
}

impl KeyframeBuilder {
    /// Starts a builder for a channel of `capacity` keyframes.
    #[must_use]
    pub fn new(capacity: usize, rotate_global: bool) -> Self {
        Self {
            rotate_global,
            skip_interpolation: Vec::with_capacity(capacity),
            times: Vec::with_capacity(capacity),
            position: Vec::with_capacity(capacity),
            scale: Vec::with_capacity(capacity),
            rotation: Vec::with_capacity(capacity),
            empty: Vec::with_capacity(capacity),
        }
    }

    /// Appends one keyframe data point.
    pub fn push(
        &mut self,
        time: f32,
        position: Vec3,
        scale: Vec3,
        rotation: Vec3,
        skip_interpolation: bool,
    ) {
        self.times.push(time);
        self.position.push(position);
        self.scale.push(scale + Vec3::ONE);
        self.rotation.push(rotation);
        self.skip_interpolation.push(skip_interpolation);
        self.empty.push(
            !math::is_not_zero(position) && !math::is_not_zero(scale) && !math::is_not_zero(rotation),
        );
    }

    /// Finishes the channel.
    ///
    /// # Panics
    ///
    /// Panics if no keyframe was pushed.
    #[must_use]
    pub fn build(self) -> TimedStorage<Progress> {
        assert!(!self.times.is_empty(), "keyframe channel requires at least one keyframe");
        let times = self.times.clone();
        let empty = self.empty;
        let data = Arc::new(KeyframeData {
            rotate_global: self.rotate_global,
            skip_interpolation: self.skip_interpolation.into(),
            times: self.times.into(),
            position: self.position.into(),
            scale: self.scale.into(),
            rotation: self.rotation.into(),
        });
        let progresses = times
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                if empty[i] {
                    Progress::empty(time)
                } else {
                    Progress::Frame {
                        data: Arc::clone(&data),
                        index: i,
                    }
                }
            })
            .collect();
        TimedStorage::new(progresses)
    }
}

/// An all-empty channel spanning `[0, length]`, used for bones an animation
/// leaves untouched.
#[must_use]
pub fn empty_storage(length: f32) -> TimedStorage<Progress> {
    if length <= 0.0 {
        TimedStorage::new(vec![Progress::empty(0.0)])
    } else {
        TimedStorage::new(vec![Progress::empty(0.0), Progress::empty(length)])
    }
}

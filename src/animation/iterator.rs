use serde::{Deserialize, Serialize};

use crate::animation::timed::{Timed, TimedStorage};

/// Looping policy of an [`AnimationIterator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopType {
    /// Plays the keyframe sequence once, then stops.
    #[serde(rename = "once")]
    PlayOnce,
    /// Wraps back to the first keyframe forever.
    #[serde(rename = "loop")]
    Loop,
    /// Plays once, then keeps yielding the last keyframe.
    #[serde(rename = "hold")]
    HoldOnLast,
}

impl LoopType {
    /// Creates an iterator over `storage` with this policy. The only
    /// construction path for [`AnimationIterator`].
    #[must_use]
    pub fn iterator<T: Timed + Clone>(self, storage: TimedStorage<T>) -> AnimationIterator<T> {
        AnimationIterator {
            storage,
            index: 0,
            loop_type: self,
        }
    }
}

/// A stateful cursor over a [`TimedStorage`].
///
/// Wrap-around / hold is always checked before indexing, so `next` never
/// indexes out of bounds regardless of how often it is called.
#[derive(Debug, Clone)]
pub struct AnimationIterator<T> {
    storage: TimedStorage<T>,
    index: usize,
    loop_type: LoopType,
}

impl<T: Timed + Clone> AnimationIterator<T> {
    /// The looping policy of this iterator.
    #[inline]
    #[must_use]
    pub fn loop_type(&self) -> LoopType {
        self.loop_type
    }

    /// Whether another call to `next` will yield an entry.
    ///
    /// Always `true` for `Loop` and `HoldOnLast`.
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        match self.loop_type {
            LoopType::PlayOnce => self.index < self.storage.len(),
            LoopType::Loop | LoopType::HoldOnLast => true,
        }
    }

    /// Resets the iterator to its type-specific initial state.
    ///
    /// `PlayOnce` is forced to *exhausted* ("already played"), not back to the
    /// first keyframe; `Loop` and `HoldOnLast` reset to the first keyframe.
    pub fn clear(&mut self) {
        self.index = match self.loop_type {
            LoopType::PlayOnce => usize::MAX,
            LoopType::Loop | LoopType::HoldOnLast => 0,
        };
    }
}

impl<T: Timed + Clone> Iterator for AnimationIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let len = self.storage.len();
        match self.loop_type {
            LoopType::PlayOnce => {
                if self.index >= len {
                    return None;
                }
                let entry = self.storage.get(self.index).clone();
                self.index += 1;
                Some(entry)
            }
            LoopType::Loop => {
                if self.index >= len {
                    self.index = 0;
                }
                let entry = self.storage.get(self.index).clone();
                self.index += 1;
                Some(entry)
            }
            LoopType::HoldOnLast => {
                if self.index >= len {
                    return Some(self.storage.last().clone());
                }
                let entry = self.storage.get(self.index).clone();
                self.index += 1;
                Some(entry)
            }
        }
    }
}

use std::sync::Arc;

/// Anything placed in a [`TimedStorage`] exposes a timestamp in seconds.
///
/// Storage does not enforce sortedness beyond author input.
pub trait Timed {
    /// The timestamp of this entry.
    fn time(&self) -> f32;
}

/// A read-only, random-access sequence of timed entries.
///
/// Invariant: never empty where constructed for live use. `get` out of range
/// is a programming error and panics; so does construction from an empty
/// vector.
#[derive(Debug, Clone)]
pub struct TimedStorage<T> {
    entries: Arc<[T]>,
}

impl<T: Timed> TimedStorage<T> {
    /// Wraps a non-empty vector of entries.
    ///
    /// # Panics
    ///
    /// Panics if `entries` is empty.
    #[must_use]
    pub fn new(entries: Vec<T>) -> Self {
        assert!(
            !entries.is_empty(),
            "timed storage requires at least one entry"
        );
        Self {
            entries: entries.into(),
        }
    }

    /// Entry at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> &T {
        &self.entries[index]
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; storages are constructed non-empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The last entry.
    #[inline]
    #[must_use]
    pub fn last(&self) -> &T {
        self.entries
            .last()
            .expect("timed storage is never constructed empty")
    }

    /// All entries, in author order.
    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[T] {
        &self.entries
    }
}

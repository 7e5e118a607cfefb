//! Animation iterator tests
//!
//! Tests for:
//! - TimedStorage contracts (non-empty invariant, indexed access)
//! - PlayOnce / Loop / HoldOnLast yield sequences
//! - The type-specific clear() semantics

use marionette::animation::{LoopType, Timed, TimedStorage};

#[derive(Debug, Clone, PartialEq)]
struct Stamp(f32);

impl Timed for Stamp {
    fn time(&self) -> f32 {
        self.0
    }
}

fn storage(times: &[f32]) -> TimedStorage<Stamp> {
    TimedStorage::new(times.iter().map(|&t| Stamp(t)).collect())
}

// ============================================================================
// TimedStorage
// ============================================================================

#[test]
fn storage_indexed_access() {
    let s = storage(&[0.0, 1.0, 2.0]);
    assert_eq!(s.len(), 3);
    assert_eq!(s.get(1).time(), 1.0);
    assert_eq!(s.last().time(), 2.0);
}

#[test]
#[should_panic(expected = "at least one entry")]
fn storage_rejects_empty_input() {
    let _ = TimedStorage::<Stamp>::new(Vec::new());
}

#[test]
#[should_panic]
fn storage_out_of_range_is_fatal() {
    let s = storage(&[0.0]);
    let _ = s.get(5);
}

// ============================================================================
// PlayOnce
// ============================================================================

#[test]
fn play_once_yields_exactly_n() {
    let mut it = LoopType::PlayOnce.iterator(storage(&[0.0, 1.0, 2.0]));
    let mut yielded = Vec::new();
    while it.has_next() {
        yielded.push(it.next().unwrap().time());
    }
    assert_eq!(yielded, vec![0.0, 1.0, 2.0]);
    assert!(!it.has_next());
    // Extra guarded calls stay exhausted.
    assert!(it.next().is_none());
    assert!(!it.has_next());
}

#[test]
fn play_once_clear_means_already_played() {
    let mut it = LoopType::PlayOnce.iterator(storage(&[0.0, 1.0]));
    assert!(it.has_next());
    it.clear();
    assert!(!it.has_next());
    assert!(it.next().is_none());
}

// ============================================================================
// Loop
// ============================================================================

#[test]
fn loop_wraps_indefinitely() {
    let mut it = LoopType::Loop.iterator(storage(&[0.0, 1.0, 2.0]));
    let yielded: Vec<f32> = (0..5).map(|_| it.next().unwrap().time()).collect();
    assert_eq!(yielded, vec![0.0, 1.0, 2.0, 0.0, 1.0]);
    assert!(it.has_next());
}

#[test]
fn loop_clear_resets_to_start() {
    let mut it = LoopType::Loop.iterator(storage(&[0.0, 1.0, 2.0]));
    it.next();
    it.next();
    it.clear();
    assert_eq!(it.next().unwrap().time(), 0.0);
}

// ============================================================================
// HoldOnLast
// ============================================================================

#[test]
fn hold_repeats_last_without_advancing() {
    let mut it = LoopType::HoldOnLast.iterator(storage(&[0.0, 1.0, 2.0]));
    let yielded: Vec<f32> = (0..6).map(|_| it.next().unwrap().time()).collect();
    assert_eq!(yielded, vec![0.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
    assert!(it.has_next());
}

#[test]
fn hold_clear_resets_to_start() {
    let mut it = LoopType::HoldOnLast.iterator(storage(&[0.0, 1.0]));
    for _ in 0..4 {
        it.next();
    }
    it.clear();
    assert_eq!(it.next().unwrap().time(), 0.0);
    assert_eq!(it.next().unwrap().time(), 1.0);
}

#[test]
fn single_entry_storage_works_for_all_types() {
    let mut once = LoopType::PlayOnce.iterator(storage(&[0.5]));
    assert_eq!(once.next().unwrap().time(), 0.5);
    assert!(once.next().is_none());

    let mut looped = LoopType::Loop.iterator(storage(&[0.5]));
    for _ in 0..3 {
        assert_eq!(looped.next().unwrap().time(), 0.5);
    }

    let mut hold = LoopType::HoldOnLast.iterator(storage(&[0.5]));
    for _ in 0..3 {
        assert_eq!(hold.next().unwrap().time(), 0.5);
    }
}

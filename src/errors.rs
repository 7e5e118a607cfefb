//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! Structural "nothing to do" conditions (a bone lookup miss, an IK chain that
//! is too short, an empty packet bundle) are **not** errors; they are `Option`s
//! or silent no-ops. Programmer-contract violations (indexing a timed storage
//! out of range, building an iterator over an empty storage) panic immediately
//! rather than propagate a corrupted pose.

use thiserror::Error;

/// The main error type for the engine.
#[derive(Error, Debug)]
pub enum MarionetteError {
    /// The requested animation does not exist in the model blueprint.
    #[error("Unknown animation: {0}")]
    UnknownAnimation(String),

    /// The requested bone does not exist in the model blueprint.
    #[error("Unknown bone: {0}")]
    UnknownBone(String),

    /// A mount request was rejected by the seat's controller.
    #[error("Bone is not mountable: {0}")]
    NotMountable(String),

    /// A vetoable operation was cancelled by a pre-check hook.
    #[error("Operation vetoed: {0}")]
    Vetoed(&'static str),

    /// Tracker state serialization/deserialization error.
    #[error("Tracker data error: {0}")]
    DataError(#[from] serde_json::Error),

    /// The tracker is already closed.
    #[error("Tracker is closed")]
    Closed,
}

/// Alias for `Result<T, MarionetteError>`.
pub type Result<T> = std::result::Result<T, MarionetteError>;

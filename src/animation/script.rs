use crate::animation::timed::Timed;

/// A timestamped script event inside an animation.
///
/// Scripts carry an opaque signal string; the tracker surfaces them through
/// its signal hook when the playhead crosses their time.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeScript {
    /// Playhead time in seconds.
    pub time: f32,
    /// Opaque signal payload.
    pub signal: String,
}

impl TimeScript {
    /// Creates a script event.
    #[must_use]
    pub fn new(time: f32, signal: impl Into<String>) -> Self {
        Self {
            time,
            signal: signal.into(),
        }
    }
}

impl Timed for TimeScript {
    fn time(&self) -> f32 {
        self.time
    }
}

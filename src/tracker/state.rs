use crate::animation::AnimationModifier;
use crate::tracker::TrackerSource;

/// A priority-ordered animation state: while its predicate holds and nothing
/// of higher priority is active, its animation plays.
pub struct AnimationState {
    /// State name, unique within a controller.
    pub name: String,
    /// Animation the state plays.
    pub animation: String,
    /// Higher wins.
    pub priority: i32,
    /// Playback knobs for the state's animation.
    pub modifier: AnimationModifier,
    predicate: Box<dyn Fn(&TrackerSource) -> bool + Send + Sync>,
}

impl AnimationState {
    /// Creates a state.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        animation: impl Into<String>,
        priority: i32,
        modifier: AnimationModifier,
        predicate: impl Fn(&TrackerSource) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            animation: animation.into(),
            priority,
            modifier,
            predicate: Box::new(predicate),
        }
    }

    /// Whether this state is active for the given source.
    #[must_use]
    pub fn is_active(&self, source: &TrackerSource) -> bool {
        (self.predicate)(source)
    }
}

/// What the tracker should do after a state evaluation.
pub struct StateCommand {
    /// Animation to stop first, if a state lost control.
    pub stop: Option<String>,
    /// Animation to play, if a state gained control.
    pub play: Option<(String, AnimationModifier)>,
}

/// Evaluates animation states each tick and swaps the winning animation.
#[derive(Default)]
pub struct StateController {
    states: Vec<AnimationState>,
    current: Option<usize>,
}

impl StateController {
    /// Registers a state, keeping the list sorted by descending priority.
    pub fn add(&mut self, state: AnimationState) {
        self.states.push(state);
        self.states.sort_by_key(|s| std::cmp::Reverse(s.priority));
        self.current = None;
    }

    /// Removes a state by name.
    pub fn remove(&mut self, name: &str) {
        self.states.retain(|s| !s.name.eq_ignore_ascii_case(name));
        self.current = None;
    }

    /// Picks the highest-priority active state. Returns a command only when
    /// the winner changed.
    pub fn update(&mut self, source: &TrackerSource) -> Option<StateCommand> {
        let winner = self.states.iter().position(|s| s.is_active(source));
        if winner == self.current {
            return None;
        }
        let stop = self
            .current
            .and_then(|i| self.states.get(i))
            .map(|s| s.animation.clone());
        let play = winner
            .and_then(|i| self.states.get(i))
            .map(|s| (s.animation.clone(), s.modifier.clone()));
        self.current = winner;
        Some(StateCommand { stop, play })
    }
}

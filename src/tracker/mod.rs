//! Trackers: one model instance bound to a moving source.
//!
//! A tracker owns a [`RenderPipeline`] and drives it each tick: keyframe
//! clocks forward, pose composed, IK reconciled, deltas bundled per viewer.
//! The entity/player/dummy distinction is a data variant, not a type
//! hierarchy; behavior branches on it only where the source genuinely
//! differs (location and profile resolution).

pub mod data;
pub mod modifier;
pub mod registry;
pub mod state;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use uuid::Uuid;

use crate::animation::AnimationModifier;
use crate::bone::group::MountClass;
use crate::bone::tree::BoneKey;
use crate::errors::{MarionetteError, Result};
use crate::mount::{MountController, MountControllers};
use crate::pipeline::RenderPipeline;
use crate::platform::{
    BundlerFactory, Location, PlatformEntity, PlatformPlayer, ProfileSlot,
};
use crate::tracker::modifier::{HideOption, ModelRotator, ModelScaler, TrackerModifier};

pub use data::TrackerData;
pub use registry::{EntityTrackerRegistry, TrackerRegistryEntry};
pub use state::{AnimationState, StateCommand, StateController};

/// Why a tracker closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Explicit close by the controlling plugin.
    Plugin,
    /// The owning registry entry was unregistered.
    Unregistered,
    /// A new tracker took this tracker's name on the same entity.
    Replaced,
    /// The backing entity disappeared from its world.
    Despawned,
}

/// What a tracker is bound to.
pub enum TrackerSource {
    /// A live platform entity.
    Entity {
        /// The bound entity.
        entity: Arc<dyn PlatformEntity>,
    },
    /// A player; adds async profile/skin resolution.
    Player {
        /// The bound player.
        player: Arc<dyn PlatformPlayer>,
        /// Tick-side slot the resolved profile lands in.
        profile: ProfileSlot,
    },
    /// A fixed, manually movable location.
    ///
    /// The mutex guards cross-thread moves; everything else about the
    /// tracker stays tick-thread-only.
    Dummy {
        /// Current location.
        location: Mutex<Location>,
    },
}

impl TrackerSource {
    /// Binds to a live entity.
    #[must_use]
    pub fn entity(entity: Arc<dyn PlatformEntity>) -> Self {
        Self::Entity { entity }
    }

    /// Binds to a player with an in-flight profile resolution.
    #[must_use]
    pub fn player(player: Arc<dyn PlatformPlayer>, profile: ProfileSlot) -> Self {
        Self::Player { player, profile }
    }

    /// Binds to a fixed, manually movable location.
    #[must_use]
    pub fn dummy(location: Location) -> Self {
        Self::Dummy {
            location: Mutex::new(location),
        }
    }

    /// The source's current location.
    #[must_use]
    pub fn location(&self) -> Location {
        match self {
            Self::Entity { entity } => entity.location(),
            Self::Player { player, .. } => player.location(),
            Self::Dummy { location } => *location.lock(),
        }
    }

    /// The backing entity uuid, when there is one.
    #[must_use]
    pub fn uuid(&self) -> Option<Uuid> {
        match self {
            Self::Entity { entity } => Some(entity.uuid()),
            Self::Player { player, .. } => Some(player.uuid()),
            Self::Dummy { .. } => None,
        }
    }

    /// The platform-side size multiplier.
    #[must_use]
    pub fn entity_scale(&self) -> f32 {
        match self {
            Self::Entity { entity } => entity.scale(),
            Self::Player { player, .. } => player.scale(),
            Self::Dummy { .. } => 1.0,
        }
    }

    /// Whether the backing entity is gone.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        match self {
            Self::Entity { entity } => entity.is_dead(),
            Self::Player { player, .. } => player.is_dead(),
            Self::Dummy { .. } => false,
        }
    }
}

/// Pre-check hooks for the vetoable operations, plus the script signal sink.
///
/// A hook returning `false` vetoes the operation: nothing changes and no
/// packets are bundled. Absent hooks always proceed.
#[derive(Default)]
pub struct TrackerHooks {
    /// Before a viewer starts seeing the model.
    pub before_spawn: Option<Box<dyn Fn(Uuid) -> bool + Send + Sync>>,
    /// Before a viewer stops seeing the model.
    pub before_hide: Option<Box<dyn Fn(Uuid) -> bool + Send + Sync>>,
    /// Before a passenger mounts a seat bone (passenger, bone raw name).
    pub before_mount: Option<Box<dyn Fn(Uuid, &str) -> bool + Send + Sync>>,
    /// Before a passenger dismounts.
    pub before_dismount: Option<Box<dyn Fn(Uuid) -> bool + Send + Sync>>,
    /// Before the tracker closes on a plugin request.
    pub before_close: Option<Box<dyn Fn() -> bool + Send + Sync>>,
    /// Receives animation script signals as the playhead crosses them.
    pub on_signal: Option<Box<dyn Fn(&str) + Send + Sync>>,
}

fn allows(hook: Option<&(dyn Fn(Uuid) -> bool + Send + Sync)>, viewer: Uuid) -> bool {
    hook.is_none_or(|h| h(viewer))
}

/// The runtime binding of one model instance to one source.
pub struct Tracker {
    pipeline: RenderPipeline,
    source: TrackerSource,
    modifier: TrackerModifier,
    scaler: ModelScaler,
    rotator: ModelRotator,
    hide_option: HideOption,
    hooks: TrackerHooks,
    states: StateController,
    mounts: FxHashMap<Uuid, BoneKey>,
    mark_for_spawn: FxHashSet<Uuid>,
    default_seat: MountControllers,
    close_reason: Option<CloseReason>,
    signal_buffer: Vec<String>,
}

impl Tracker {
    /// The name of the spawn animation every tracker plays on creation.
    pub const SPAWN_ANIMATION: &'static str = "spawn";

    /// Creates a tracker and plays the forced spawn animation (play-once)
    /// before any scripted layer gets control. Models without a spawn
    /// animation simply skip it.
    #[must_use]
    pub fn new(source: TrackerSource, mut pipeline: RenderPipeline, modifier: TrackerModifier) -> Self {
        if pipeline
            .play(
                Self::SPAWN_ANIMATION,
                AnimationModifier::DEFAULT_WITH_PLAY_ONCE,
            )
            .is_err()
        {
            log::debug!(
                "model `{}` has no spawn animation",
                pipeline.blueprint().name
            );
        }
        Self {
            pipeline,
            source,
            modifier,
            scaler: ModelScaler::default(),
            rotator: ModelRotator::default(),
            hide_option: HideOption::default(),
            hooks: TrackerHooks::default(),
            states: StateController::default(),
            mounts: FxHashMap::default(),
            mark_for_spawn: FxHashSet::default(),
            default_seat: MountControllers::Walk,
            close_reason: None,
            signal_buffer: Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The owned pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    /// Mutable access to the owned pipeline.
    pub fn pipeline_mut(&mut self) -> &mut RenderPipeline {
        &mut self.pipeline
    }

    /// The tracker's source binding.
    #[must_use]
    pub fn source(&self) -> &TrackerSource {
        &self.source
    }

    /// Pipeline name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.pipeline.name()
    }

    /// Static configuration.
    #[must_use]
    pub fn modifier(&self) -> &TrackerModifier {
        &self.modifier
    }

    /// Current model scaler.
    #[must_use]
    pub fn scaler(&self) -> &ModelScaler {
        &self.scaler
    }

    /// Replaces the model scaler.
    pub fn set_scaler(&mut self, scaler: ModelScaler) {
        self.scaler = scaler;
    }

    /// Current model rotator.
    #[must_use]
    pub fn rotator(&self) -> &ModelRotator {
        &self.rotator
    }

    /// Replaces the model rotator.
    pub fn set_rotator(&mut self, rotator: ModelRotator) {
        self.rotator = rotator;
    }

    /// Current hide option.
    #[must_use]
    pub fn hide_option(&self) -> HideOption {
        self.hide_option
    }

    /// Replaces the hide option.
    pub fn set_hide_option(&mut self, option: HideOption) {
        self.hide_option = option;
    }

    /// Installs the pre-check hooks and the signal sink.
    pub fn set_hooks(&mut self, hooks: TrackerHooks) {
        self.hooks = hooks;
    }

    /// The animation state controller.
    pub fn states_mut(&mut self) -> &mut StateController {
        &mut self.states
    }

    /// Replaces the default controller used for seat-tagged bones.
    pub fn set_default_seat(&mut self, controller: MountControllers) {
        self.default_seat = controller;
    }

    /// Why the tracker closed, once it has.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Whether the tracker has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close_reason.is_some()
    }

    /// Queues viewers to be shown as soon as the tracker resumes.
    pub fn mark_for_spawn(&mut self, viewers: impl IntoIterator<Item = Uuid>) {
        self.mark_for_spawn.extend(viewers);
    }

    // ------------------------------------------------------------------
    // Animation control
    // ------------------------------------------------------------------

    /// Plays an animation.
    pub fn play(&mut self, name: &str, modifier: AnimationModifier) -> Result<()> {
        if self.is_closed() {
            return Err(MarionetteError::Closed);
        }
        self.pipeline.play(name, modifier)
    }

    /// Stops an animation. Returns whether anything was playing it.
    pub fn stop(&mut self, name: &str) -> bool {
        self.pipeline.stop(name)
    }

    // ------------------------------------------------------------------
    // Viewer visibility
    // ------------------------------------------------------------------

    /// Starts showing the model to a viewer; vetoable.
    pub fn show(&mut self, viewer: Uuid) -> Result<()> {
        if self.is_closed() {
            return Err(MarionetteError::Closed);
        }
        if !allows(self.hooks.before_spawn.as_deref(), viewer) {
            return Err(MarionetteError::Vetoed("spawn"));
        }
        self.pipeline.show(viewer);
        Ok(())
    }

    /// Stops showing the model to a viewer; vetoable.
    pub fn hide(&mut self, viewer: Uuid) -> Result<()> {
        if self.is_closed() {
            return Err(MarionetteError::Closed);
        }
        if !allows(self.hooks.before_hide.as_deref(), viewer) {
            return Err(MarionetteError::Vetoed("hide"));
        }
        self.pipeline.hide(viewer);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mounting
    // ------------------------------------------------------------------

    /// Mounts a passenger on a seat bone; gated by the seat's controller
    /// capabilities and the mount pre-check.
    pub fn mount(&mut self, passenger: Uuid, bone: &str) -> Result<()> {
        if self.is_closed() {
            return Err(MarionetteError::Closed);
        }
        let key = self
            .pipeline
            .tree()
            .key_by_name(bone)
            .ok_or_else(|| MarionetteError::UnknownBone(bone.to_string()))?;
        let class = self
            .pipeline
            .tree()
            .bone(key)
            .map_or(MountClass::NotMountable, |b| b.group().mount_class());
        let controller = self.seat_controller(class);
        if !controller.can_mount() {
            return Err(MarionetteError::NotMountable(bone.to_string()));
        }
        if let Some(hook) = &self.hooks.before_mount {
            if !hook(passenger, bone) {
                return Err(MarionetteError::Vetoed("mount"));
            }
        }
        self.mounts.insert(passenger, key);
        Ok(())
    }

    /// Dismounts a passenger; vetoable. Unknown passengers are a no-op.
    pub fn dismount(&mut self, passenger: Uuid) -> Result<()> {
        if !self.mounts.contains_key(&passenger) {
            return Ok(());
        }
        if !allows(self.hooks.before_dismount.as_deref(), passenger) {
            return Err(MarionetteError::Vetoed("dismount"));
        }
        self.mounts.remove(&passenger);
        Ok(())
    }

    /// The seat bone a passenger currently rides, if any.
    #[must_use]
    pub fn seat_of(&self, passenger: Uuid) -> Option<BoneKey> {
        self.mounts.get(&passenger).copied()
    }

    /// The controller mediating a seat of the given class.
    #[must_use]
    pub fn seat_controller(&self, class: MountClass) -> MountControllers {
        match class {
            MountClass::Seat => self.default_seat,
            MountClass::SubSeat => MountControllers::None,
            MountClass::NotMountable => MountControllers::Invalid,
        }
    }

    // ------------------------------------------------------------------
    // Dummy movement
    // ------------------------------------------------------------------

    /// Moves a dummy tracker to a new authoritative location.
    ///
    /// Safe to call off the tick thread; the location swap happens under the
    /// source mutex and the bones re-teleport on the next tick. On non-dummy
    /// sources this is a no-op.
    pub fn move_to(&self, location: Location) {
        if let TrackerSource::Dummy { location: slot } = &self.source {
            let mut guard = slot.lock();
            if *guard != location {
                *guard = location;
            }
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// One simulation tick: advance keyframe clocks, compose poses, solve
    /// IK, diff against the last flush and hand each viewer's bundle to the
    /// factory. Runs on (or synchronized with) the host tick thread.
    pub fn tick<F: BundlerFactory>(&mut self, dt: f32, factory: &mut F) {
        if self.is_closed() {
            return;
        }
        if self.source.is_dead() {
            self.close_internal(CloseReason::Despawned);
            return;
        }

        // Async profile completion only ever applies here, on the tick.
        if let TrackerSource::Player { profile, .. } = &mut self.source {
            if profile.poll() {
                log::debug!("profile resolved for `{}`", self.pipeline.name());
            }
        }

        // Queued spawn marks become spawning viewers.
        for viewer in std::mem::take(&mut self.mark_for_spawn) {
            self.pipeline.show(viewer);
        }

        // Highest-priority active state wins the state layer.
        if let Some(command) = self.states.update(&self.source) {
            if let Some(stop) = command.stop {
                self.pipeline.stop(&stop);
            }
            if let Some((play, modifier)) = command.play {
                if let Err(err) = self.pipeline.play(&play, modifier) {
                    log::warn!("state animation failed: {err}");
                }
            }
        }

        self.signal_buffer.clear();
        let mut signals = std::mem::take(&mut self.signal_buffer);
        self.pipeline.advance(dt, &mut signals);
        if let Some(sink) = &self.hooks.on_signal {
            for signal in &signals {
                sink(signal);
            }
        }
        self.signal_buffer = signals;

        let location = self.source.location();
        let scale = self.scaler.scale(self.source.entity_scale());
        let frame = self.rotator.frame(&location, scale);
        self.pipeline.freeze(&frame);
        self.pipeline.bundle(&location, &frame, factory);
        self.pipeline.tree_mut().update_attachments(None);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Snapshots the persistent state.
    #[must_use]
    pub fn data(&self) -> TrackerData {
        TrackerData {
            id: self.pipeline.blueprint().name.clone(),
            scaler: Some(self.scaler.clone()),
            rotator: Some(self.rotator),
            modifier: self.modifier,
            hide_option: Some(self.hide_option),
            mark_for_spawn: Some(
                self.pipeline
                    .active_viewers()
                    .into_iter()
                    .chain(self.mark_for_spawn.iter().copied())
                    .collect(),
            ),
        }
    }

    /// Applies a persisted record onto this tracker.
    pub fn apply_data(&mut self, data: &TrackerData) {
        self.scaler = data.scaler();
        self.rotator = data.rotator();
        self.hide_option = data.hide_option();
        self.mark_for_spawn(data.mark_for_spawn());
    }

    // ------------------------------------------------------------------
    // Close
    // ------------------------------------------------------------------

    /// Closes the tracker on a plugin request; vetoable. Detaches every
    /// attachment and drops all viewers.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        if !self.hooks.before_close.as_ref().is_none_or(|h| h()) {
            return Err(MarionetteError::Vetoed("close"));
        }
        self.close_internal(CloseReason::Plugin);
        Ok(())
    }

    /// Forced close path used by the registry; not vetoable, since registry
    /// integrity depends on it.
    pub(crate) fn close_internal(&mut self, reason: CloseReason) {
        if self.is_closed() {
            return;
        }
        for viewer in self.pipeline.active_viewers() {
            self.pipeline.hide(viewer);
        }
        self.mounts.clear();
        self.pipeline.tree_mut().detach_all();
        self.close_reason = Some(reason);
        log::debug!("tracker `{}` closed: {reason:?}", self.pipeline.name());
    }
}

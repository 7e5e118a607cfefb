//! Narrow interfaces to the host platform.
//!
//! The engine never touches real entities, packets or threads directly; it
//! consumes these traits and emits transform updates through a
//! [`PacketBundler`]. The host wires them to its own world.

use glam::{Quat, Vec3};
use uuid::Uuid;

/// A point in a host world, with view angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    /// World identity.
    pub world: Uuid,
    /// Position in world space.
    pub position: Vec3,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Pitch in degrees.
    pub pitch: f32,
}

impl Location {
    /// A location at the origin of the given world.
    #[must_use]
    pub fn at(world: Uuid, position: Vec3) -> Self {
        Self {
            world,
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

/// A live platform entity a tracker can bind to.
pub trait PlatformEntity: Send + Sync {
    /// Stable entity identity.
    fn uuid(&self) -> Uuid;

    /// Current location, including view angles.
    fn location(&self) -> Location;

    /// Body yaw in degrees; defaults to the view yaw.
    fn body_yaw(&self) -> f32 {
        self.location().yaw
    }

    /// Platform-side size multiplier applied to the model.
    fn scale(&self) -> f32 {
        1.0
    }

    /// Whether the entity has been removed from its world.
    fn is_dead(&self) -> bool {
        false
    }
}

/// A player entity; adds nothing the core needs beyond identity, but keeps
/// the variant distinction explicit at the seam.
pub trait PlatformPlayer: PlatformEntity {
    /// Account name.
    fn name(&self) -> &str;
}

/// A cancellable task handed back by the scheduler.
pub trait ScheduledTask: Send {
    /// Cancels the task if it has not run yet.
    fn cancel(&self);
}

/// Tick-aligned scheduling on the host's simulation thread.
///
/// Both methods return `None` when the target execution context is gone
/// (for example an unloaded world region); callers treat that as "nothing
/// scheduled", not as an error.
pub trait Scheduler {
    /// Runs `task` on the next tick.
    fn run_now(&self, task: Box<dyn FnOnce() + Send>) -> Option<Box<dyn ScheduledTask>>;

    /// Runs `task` after `ticks` full ticks.
    fn run_later(&self, ticks: u32, task: Box<dyn FnOnce() + Send>)
    -> Option<Box<dyn ScheduledTask>>;
}

/// One bone's outbound transform change for one viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransformUpdate {
    /// Authored bone identity.
    pub bone: Uuid,
    /// World-space position (source location + model-space offset).
    pub position: Vec3,
    /// World-space rotation.
    pub rotation: Quat,
    /// Composed scale.
    pub scale: Vec3,
    /// Client-side interpolation window in seconds; zero for a hard cut.
    pub interpolation: f32,
}

/// Accumulates the minimal set of state changes of one tick for one viewer.
///
/// The engine fills a bundler per viewer per tick and hands it back through
/// [`BundlerFactory::send`]; empty bundles are dropped without sending.
pub trait PacketBundler {
    /// Whether nothing has been collected.
    fn is_empty(&self) -> bool;

    /// Number of collected updates.
    fn len(&self) -> usize;

    /// Collects one bone transform change.
    fn transform(&mut self, update: BoneTransformUpdate);
}

/// Creates and flushes bundlers; the host's seam to its network layer.
pub trait BundlerFactory {
    /// Concrete bundler type.
    type Bundler: PacketBundler;

    /// Creates an empty bundler for one viewer's tick.
    fn create(&mut self) -> Self::Bundler;

    /// Flushes a non-empty bundler to a viewer.
    fn send(&mut self, viewer: Uuid, bundler: Self::Bundler);
}

/// A plain in-memory bundler, useful for tests and for hosts that translate
/// updates at flush time.
#[derive(Debug, Default)]
pub struct BufferedBundler {
    /// Collected updates, in bone order.
    pub updates: Vec<BoneTransformUpdate>,
}

impl PacketBundler for BufferedBundler {
    fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }

    fn len(&self) -> usize {
        self.updates.len()
    }

    fn transform(&mut self, update: BoneTransformUpdate) {
        self.updates.push(update);
    }
}

/// Cosmetic profile data resolved for player models.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelProfile {
    /// Account identity.
    pub uuid: Uuid,
    /// Account name.
    pub name: String,
    /// Skin texture URL, when resolved.
    pub skin_url: Option<String>,
}

impl ModelProfile {
    /// The fallback profile used until (or instead of) a resolved one.
    #[must_use]
    pub fn unknown(uuid: Uuid) -> Self {
        Self {
            uuid,
            name: String::new(),
            skin_url: None,
        }
    }
}

/// Asynchronous profile/skin resolution.
///
/// Implementations complete off-thread; the returned channel is polled on
/// the tick so results only ever apply on the tick thread.
pub trait ProfileSupplier: Send + Sync {
    /// Requests resolution for an account.
    fn request(&self, uuid: Uuid) -> flume::Receiver<ModelProfile>;
}

/// The tick-side slot a profile completion lands in.
#[derive(Debug)]
pub struct ProfileSlot {
    receiver: Option<flume::Receiver<ModelProfile>>,
    profile: ModelProfile,
}

impl ProfileSlot {
    /// Starts with the unknown profile and an in-flight request.
    #[must_use]
    pub fn pending(uuid: Uuid, receiver: flume::Receiver<ModelProfile>) -> Self {
        Self {
            receiver: Some(receiver),
            profile: ModelProfile::unknown(uuid),
        }
    }

    /// Starts already resolved.
    #[must_use]
    pub fn resolved(profile: ModelProfile) -> Self {
        Self {
            receiver: None,
            profile,
        }
    }

    /// Applies a completion if one arrived; returns whether the profile
    /// changed. A disconnected supplier falls back to the current (default)
    /// profile rather than blocking or failing the tracker.
    pub fn poll(&mut self) -> bool {
        let Some(receiver) = &self.receiver else {
            return false;
        };
        match receiver.try_recv() {
            Ok(profile) => {
                self.profile = profile;
                self.receiver = None;
                true
            }
            Err(flume::TryRecvError::Empty) => false,
            Err(flume::TryRecvError::Disconnected) => {
                log::warn!("profile supplier dropped request; keeping fallback profile");
                self.receiver = None;
                false
            }
        }
    }

    /// The currently applied profile.
    #[must_use]
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }
}

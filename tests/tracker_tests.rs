//! Tracker orchestration tests
//!
//! Tests for:
//! - TrackerData serde round-trip and access-time defaults
//! - Spawn (full send) vs steady-state (empty) bundling
//! - Animation-driven deltas and dummy relocation
//! - Veto hooks on spawn/mount/close
//! - Mount gating by bone tags
//! - Registry replace/unregister close reasons
//! - Async profile completion on the tick

use std::sync::Arc;

use glam::Vec3;
use uuid::Uuid;

use marionette::animation::{
    AnimationClip, AnimationModifier, BoneAnimator, KeyframeBuilder, LoopType,
};
use marionette::bone::BoneGroup;
use marionette::errors::MarionetteError;
use marionette::model::ModelBlueprint;
use marionette::pipeline::RenderPipeline;
use marionette::platform::{
    BoneTransformUpdate, BufferedBundler, BundlerFactory, Location, ModelProfile, ProfileSlot,
};
use marionette::tracker::modifier::TrackerModifier;
use marionette::tracker::{
    CloseReason, EntityTrackerRegistry, Tracker, TrackerData, TrackerHooks, TrackerSource,
};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Default)]
struct TestFactory {
    sent: Vec<(Uuid, Vec<BoneTransformUpdate>)>,
}

impl BundlerFactory for TestFactory {
    type Bundler = BufferedBundler;

    fn create(&mut self) -> BufferedBundler {
        BufferedBundler::default()
    }

    fn send(&mut self, viewer: Uuid, bundler: BufferedBundler) {
        self.sent.push((viewer, bundler.updates));
    }
}

fn body_head_groups() -> Vec<Arc<BoneGroup>> {
    vec![Arc::new(
        BoneGroup::new("body", Vec3::ZERO, Vec3::ZERO)
            .with_child(BoneGroup::new("head", Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO)),
    )]
}

fn shift_clip(name: &str, bone: &str, offset: Vec3) -> AnimationClip {
    let mut builder = KeyframeBuilder::new(2, false);
    builder.push(0.0, offset, Vec3::ZERO, Vec3::ZERO, false);
    builder.push(1.0, offset, Vec3::ZERO, Vec3::ZERO, false);
    AnimationClip::new(
        name,
        LoopType::HoldOnLast,
        1.0,
        false,
        vec![BoneAnimator::new(bone, builder.build())],
        None,
    )
}

fn dummy_tracker(clips: Vec<AnimationClip>) -> Tracker {
    let blueprint = Arc::new(ModelBlueprint::new("rig", body_head_groups(), clips));
    let pipeline = RenderPipeline::new("main", blueprint);
    let location = Location::at(Uuid::new_v4(), Vec3::new(10.0, 0.0, 0.0));
    Tracker::new(
        TrackerSource::dummy(location),
        pipeline,
        TrackerModifier::DEFAULT,
    )
}

// ============================================================================
// TrackerData
// ============================================================================

#[test]
fn tracker_data_round_trip() {
    use marionette::tracker::modifier::{HideOption, ModelRotator, ModelScaler};

    let data = TrackerData {
        id: "rig".to_string(),
        scaler: Some(ModelScaler::Fixed { value: 2.0 }),
        rotator: Some(ModelRotator::Lock {
            yaw: 90.0,
            pitch: 0.0,
        }),
        modifier: TrackerModifier::DEFAULT,
        hide_option: Some(HideOption::VISIBILITY | HideOption::EQUIPMENT),
        mark_for_spawn: Some([Uuid::new_v4()].into_iter().collect()),
    };

    let value = data.serialize().unwrap();
    let back = TrackerData::deserialize(&value).unwrap();
    assert_eq!(back, data);
}

#[test]
fn tracker_data_explicit_empty_survives() {
    let data = TrackerData {
        mark_for_spawn: Some(Default::default()),
        ..TrackerData::of("rig")
    };
    let back = TrackerData::deserialize(&data.serialize().unwrap()).unwrap();
    // Explicitly empty stays Some(empty), it does not collapse to None.
    assert_eq!(back.mark_for_spawn, Some(Default::default()));
}

#[test]
fn tracker_data_absent_fields_default_at_access() {
    use marionette::tracker::modifier::{HideOption, ModelScaler};

    let back = TrackerData::deserialize(&serde_json::json!({ "id": "rig" })).unwrap();
    assert_eq!(back.scaler, None);
    assert_eq!(back.scaler(), ModelScaler::Entity);
    assert_eq!(back.hide_option(), HideOption::DEFAULT);
    assert!(back.mark_for_spawn().is_empty());
}

#[test]
fn tracker_data_accepts_bare_model_id() {
    let back = TrackerData::deserialize(&serde_json::json!("rig")).unwrap();
    assert_eq!(back.id, "rig");
}

// ============================================================================
// Bundling
// ============================================================================

#[test]
fn spawn_sends_full_pose_then_goes_quiet() {
    init_logs();
    let mut tracker = dummy_tracker(Vec::new());
    let viewer = Uuid::new_v4();
    tracker.show(viewer).unwrap();

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    assert_eq!(factory.sent.len(), 1);
    let (to, updates) = &factory.sent[0];
    assert_eq!(*to, viewer);
    assert_eq!(updates.len(), 2, "full send covers every bone");

    // Nothing changed: the next tick bundles nothing.
    tracker.tick(0.05, &mut factory);
    assert_eq!(factory.sent.len(), 1);
}

#[test]
fn animation_moves_bones_in_world_space() {
    let mut tracker = dummy_tracker(vec![shift_clip("wave", "body", Vec3::new(1.0, 0.0, 0.0))]);
    let viewer = Uuid::new_v4();
    tracker.show(viewer).unwrap();
    tracker.play("wave", AnimationModifier::DEFAULT).unwrap();

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    let (_, updates) = &factory.sent[0];

    let body_uuid = tracker.pipeline().blueprint().groups[0].uuid;
    let body = updates.iter().find(|u| u.bone == body_uuid).unwrap();
    // Anchor (10,0,0) plus the animated offset.
    assert!((body.position - Vec3::new(11.0, 0.0, 0.0)).length() < 1.0e-4);

    let head_uuid = tracker.pipeline().blueprint().groups[0].children[0].uuid;
    let head = updates.iter().find(|u| u.bone == head_uuid).unwrap();
    assert!((head.position - Vec3::new(11.0, 2.0, 0.0)).length() < 1.0e-4);
}

#[test]
fn unknown_animation_is_an_error() {
    let mut tracker = dummy_tracker(Vec::new());
    assert!(matches!(
        tracker.play("missing", AnimationModifier::DEFAULT),
        Err(MarionetteError::UnknownAnimation(_))
    ));
}

#[test]
fn moving_a_dummy_reteleports_bones() {
    let mut tracker = dummy_tracker(Vec::new());
    let viewer = Uuid::new_v4();
    tracker.show(viewer).unwrap();

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    tracker.tick(0.05, &mut factory);
    assert_eq!(factory.sent.len(), 1, "steady state is quiet");

    let world = tracker.source().location().world;
    tracker.move_to(Location::at(world, Vec3::new(20.0, 0.0, 0.0)));
    tracker.tick(0.05, &mut factory);
    assert_eq!(factory.sent.len(), 2);
    let (_, updates) = &factory.sent[1];
    assert!(updates.iter().all(|u| (u.position.x - 20.0).abs() < 3.0));
}

#[test]
fn spawn_animation_plays_on_creation() {
    let mut spawn_builder = KeyframeBuilder::new(1, false);
    spawn_builder.push(0.0, Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO, Vec3::ZERO, false);
    let spawn = AnimationClip::new(
        Tracker::SPAWN_ANIMATION,
        LoopType::Loop,
        0.2,
        false,
        vec![BoneAnimator::new("body", spawn_builder.build())],
        None,
    );
    let tracker = dummy_tracker(vec![spawn]);
    // Creation forces the spawn animation as a play-once layer.
    let running: Vec<&str> = tracker.pipeline().running().collect();
    assert_eq!(running, vec![Tracker::SPAWN_ANIMATION]);
}

// ============================================================================
// Veto hooks
// ============================================================================

#[test]
fn vetoed_spawn_is_a_no_op() {
    let mut tracker = dummy_tracker(Vec::new());
    tracker.set_hooks(TrackerHooks {
        before_spawn: Some(Box::new(|_| false)),
        ..TrackerHooks::default()
    });

    let viewer = Uuid::new_v4();
    assert!(matches!(
        tracker.show(viewer),
        Err(MarionetteError::Vetoed("spawn"))
    ));

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    assert!(factory.sent.is_empty(), "a veto bundles no packets");
}

#[test]
fn vetoed_close_keeps_the_tracker_alive() {
    let mut tracker = dummy_tracker(Vec::new());
    tracker.set_hooks(TrackerHooks {
        before_close: Some(Box::new(|| false)),
        ..TrackerHooks::default()
    });
    assert!(matches!(
        tracker.close(),
        Err(MarionetteError::Vetoed("close"))
    ));
    assert!(!tracker.is_closed());
}

// ============================================================================
// Mounting
// ============================================================================

fn seat_tracker() -> Tracker {
    let groups = vec![Arc::new(
        BoneGroup::new("body", Vec3::ZERO, Vec3::ZERO)
            .with_child(BoneGroup::new("p_saddle", Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO)),
    )];
    let blueprint = Arc::new(ModelBlueprint::new("steed", groups, Vec::new()));
    Tracker::new(
        TrackerSource::dummy(Location::at(Uuid::new_v4(), Vec3::ZERO)),
        RenderPipeline::new("main", blueprint),
        TrackerModifier::DEFAULT,
    )
}

#[test]
fn seat_tag_gates_mounting() {
    let mut tracker = seat_tracker();
    let passenger = Uuid::new_v4();

    assert!(matches!(
        tracker.mount(passenger, "body"),
        Err(MarionetteError::NotMountable(_))
    ));
    assert!(tracker.seat_of(passenger).is_none());

    tracker.mount(passenger, "p_saddle").unwrap();
    assert!(tracker.seat_of(passenger).is_some());

    tracker.dismount(passenger).unwrap();
    assert!(tracker.seat_of(passenger).is_none());
}

#[test]
fn vetoed_mount_is_a_no_op() {
    let mut tracker = seat_tracker();
    tracker.set_hooks(TrackerHooks {
        before_mount: Some(Box::new(|_, _| false)),
        ..TrackerHooks::default()
    });
    let passenger = Uuid::new_v4();
    assert!(matches!(
        tracker.mount(passenger, "p_saddle"),
        Err(MarionetteError::Vetoed("mount"))
    ));
    assert!(tracker.seat_of(passenger).is_none());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn installing_over_a_name_replaces_the_old_tracker() {
    let registry = EntityTrackerRegistry::new();
    let entity = Uuid::new_v4();
    let entry = registry.get_or_create(entity);

    let first = entry.install(dummy_tracker(Vec::new()));
    let second = entry.install(dummy_tracker(Vec::new()));

    assert_eq!(first.lock().close_reason(), Some(CloseReason::Replaced));
    assert!(!second.lock().is_closed());
    assert!(Arc::ptr_eq(&registry.tracker(entity, "main").unwrap(), &second));
}

#[test]
fn unregistering_closes_everything() {
    let registry = EntityTrackerRegistry::new();
    let entity = Uuid::new_v4();
    let tracker = registry.get_or_create(entity).install(dummy_tracker(Vec::new()));

    registry.unregister(entity);
    assert_eq!(
        tracker.lock().close_reason(),
        Some(CloseReason::Unregistered)
    );
    assert!(registry.entry(entity).is_none());
}

#[test]
fn entry_get_or_create_reuses_live_trackers() {
    let registry = EntityTrackerRegistry::new();
    let entry = registry.get_or_create(Uuid::new_v4());

    let first = entry.get_or_create("main", || dummy_tracker(Vec::new()));
    let second = entry.get_or_create("main", || panic!("must not build a second tracker"));
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn removing_a_single_tracker_unregisters_it() {
    let registry = EntityTrackerRegistry::new();
    let entity = Uuid::new_v4();
    let tracker = registry
        .get_or_create(entity)
        .install(dummy_tracker(Vec::new()));

    registry.remove_tracker(entity, "main");
    assert_eq!(
        tracker.lock().close_reason(),
        Some(CloseReason::Unregistered)
    );
    assert!(registry.tracker(entity, "main").is_none());
}

#[test]
fn closed_trackers_stop_ticking() {
    let mut tracker = dummy_tracker(Vec::new());
    let viewer = Uuid::new_v4();
    tracker.show(viewer).unwrap();
    tracker.close().unwrap();
    assert_eq!(tracker.close_reason(), Some(CloseReason::Plugin));

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    assert!(factory.sent.is_empty());
    assert!(matches!(tracker.show(viewer), Err(MarionetteError::Closed)));
}

// ============================================================================
// Source variants
// ============================================================================

struct MockEntity {
    uuid: Uuid,
    world: Uuid,
    dead: Arc<std::sync::atomic::AtomicBool>,
}

impl marionette::platform::PlatformEntity for MockEntity {
    fn uuid(&self) -> Uuid {
        self.uuid
    }

    fn location(&self) -> Location {
        Location::at(self.world, Vec3::new(3.0, 0.0, 0.0))
    }

    fn is_dead(&self) -> bool {
        self.dead.load(std::sync::atomic::Ordering::SeqCst)
    }
}

struct MockPlayer(MockEntity);

impl marionette::platform::PlatformEntity for MockPlayer {
    fn uuid(&self) -> Uuid {
        self.0.uuid
    }

    fn location(&self) -> Location {
        self.0.location()
    }
}

impl marionette::platform::PlatformPlayer for MockPlayer {
    fn name(&self) -> &str {
        "steve"
    }
}

fn blueprint() -> Arc<ModelBlueprint> {
    Arc::new(ModelBlueprint::new("rig", body_head_groups(), Vec::new()))
}

#[test]
fn dead_entity_closes_the_tracker() {
    let dead = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let entity = Arc::new(MockEntity {
        uuid: Uuid::new_v4(),
        world: Uuid::new_v4(),
        dead: Arc::clone(&dead),
    });
    let mut tracker = Tracker::new(
        TrackerSource::entity(entity),
        RenderPipeline::new("main", blueprint()),
        TrackerModifier::DEFAULT,
    );

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    assert!(!tracker.is_closed());

    dead.store(true, std::sync::atomic::Ordering::SeqCst);
    tracker.tick(0.05, &mut factory);
    assert_eq!(tracker.close_reason(), Some(CloseReason::Despawned));
}

#[test]
fn player_profile_applies_on_the_tick() {
    let uuid = Uuid::new_v4();
    let (tx, rx) = flume::bounded(1);
    let player = Arc::new(MockPlayer(MockEntity {
        uuid,
        world: Uuid::new_v4(),
        dead: Arc::new(std::sync::atomic::AtomicBool::new(false)),
    }));
    let mut tracker = Tracker::new(
        TrackerSource::player(player, ProfileSlot::pending(uuid, rx)),
        RenderPipeline::new("main", blueprint()),
        TrackerModifier::DEFAULT,
    );

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);

    tx.send(ModelProfile {
        uuid,
        name: "steve".to_string(),
        skin_url: None,
    })
    .unwrap();
    tracker.tick(0.05, &mut factory);

    let TrackerSource::Player { profile, .. } = tracker.source() else {
        panic!("player source expected");
    };
    assert_eq!(profile.profile().name, "steve");
}

// ============================================================================
// States & persistence
// ============================================================================

#[test]
fn state_controller_swaps_the_running_animation() {
    use marionette::tracker::AnimationState;

    let mut tracker = dummy_tracker(vec![
        shift_clip("idle", "body", Vec3::ZERO),
        shift_clip("walk", "body", Vec3::new(0.0, 0.0, 1.0)),
    ]);
    tracker.states_mut().add(AnimationState::new(
        "idle",
        "idle",
        0,
        AnimationModifier::DEFAULT,
        |_| true,
    ));
    tracker.states_mut().add(AnimationState::new(
        "walk",
        "walk",
        10,
        AnimationModifier::DEFAULT,
        |_| true,
    ));

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    // Higher priority wins.
    let running: Vec<&str> = tracker.pipeline().running().collect();
    assert!(running.contains(&"walk"));
    assert!(!running.contains(&"idle"));
}

#[test]
fn apply_data_restores_marked_viewers() {
    let viewer = Uuid::new_v4();
    let data = TrackerData {
        mark_for_spawn: Some([viewer].into_iter().collect()),
        ..TrackerData::of("rig")
    };

    let mut tracker = dummy_tracker(Vec::new());
    tracker.apply_data(&data);

    let mut factory = TestFactory::default();
    tracker.tick(0.05, &mut factory);
    // The marked viewer spawned and received the full pose.
    assert_eq!(factory.sent.len(), 1);
    assert_eq!(factory.sent[0].0, viewer);
    assert_eq!(
        tracker.pipeline().viewer_phase(viewer),
        marionette::pipeline::ViewerPhase::Shown
    );
}

// ============================================================================
// Async profile completion
// ============================================================================

#[test]
fn profile_slot_applies_on_poll() {
    let uuid = Uuid::new_v4();
    let (tx, rx) = flume::bounded(1);
    let mut slot = ProfileSlot::pending(uuid, rx);
    assert!(!slot.poll(), "nothing arrived yet");
    assert!(slot.profile().name.is_empty());

    tx.send(ModelProfile {
        uuid,
        name: "steve".to_string(),
        skin_url: Some("http://example/skin.png".to_string()),
    })
    .unwrap();
    assert!(slot.poll());
    assert_eq!(slot.profile().name, "steve");
}

#[test]
fn dropped_supplier_falls_back_to_default() {
    let uuid = Uuid::new_v4();
    let (tx, rx) = flume::bounded::<ModelProfile>(1);
    let mut slot = ProfileSlot::pending(uuid, rx);
    drop(tx);
    assert!(!slot.poll());
    assert_eq!(slot.profile(), &ModelProfile::unknown(uuid));
}

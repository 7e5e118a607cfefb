//! IK solver tests
//!
//! Tests for:
//! - Two-bone FABRIK reach (target within chain length)
//! - Unreachable target full extension without NaN/Inf
//! - Degenerate chain registration (length < 2) as a silent no-op
//! - Locator exclusion from its own chain

use std::sync::Arc;

use glam::Vec3;
use uuid::Uuid;

use marionette::bone::{BoneGroup, RootFrame};
use marionette::model::ModelBlueprint;
use marionette::pipeline::RenderPipeline;

/// Chain root at the origin, middle at y=1, tip at y=2, plus a detached
/// locator bone at `locator_y`.
fn chain_model(locator_y: f32) -> (ModelBlueprint, Uuid, Uuid) {
    let chain = BoneGroup::new("root", Vec3::ZERO, Vec3::ZERO).with_child(
        BoneGroup::new("mid", Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO)
            .with_child(BoneGroup::new("tip", Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO)),
    );
    let locator = BoneGroup::new("locator", Vec3::new(0.0, locator_y, 0.0), Vec3::ZERO);
    let tip_uuid = chain.children[0].children[0].uuid;
    let locator_uuid = locator.uuid;
    (
        ModelBlueprint::new(
            "chain",
            vec![Arc::new(chain), Arc::new(locator)],
            Vec::new(),
        ),
        tip_uuid,
        locator_uuid,
    )
}

fn frozen_pipeline(blueprint: ModelBlueprint) -> RenderPipeline {
    let mut pipeline = RenderPipeline::new("ik", Arc::new(blueprint));
    let mut signals = Vec::new();
    pipeline.advance(0.05, &mut signals);
    pipeline
}

fn world_position(pipeline: &RenderPipeline, name: &str) -> Vec3 {
    let tree = pipeline.tree();
    let key = tree.key_by_name(name).unwrap();
    tree.bone(key).unwrap().world(None).position
}

// ============================================================================
// Reachable targets
// ============================================================================

#[test]
fn two_segment_chain_reaches_target() {
    let (blueprint, tip, locator) = chain_model(1.9);
    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, tip, locator);
    assert_eq!(pipeline.ik_chain_count(), 1);

    pipeline.freeze(&RootFrame::default());

    let tip_pos = world_position(&pipeline, "tip");
    assert!(
        tip_pos.distance(Vec3::new(0.0, 1.9, 0.0)) < 1.0e-3,
        "tip at {tip_pos}"
    );
    // The chain root stays pinned.
    assert!(world_position(&pipeline, "root").distance(Vec3::ZERO) < 1.0e-3);
}

#[test]
fn offset_target_bends_the_chain() {
    let chain = BoneGroup::new("root", Vec3::ZERO, Vec3::ZERO).with_child(
        BoneGroup::new("mid", Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO)
            .with_child(BoneGroup::new("tip", Vec3::new(0.0, 2.0, 0.0), Vec3::ZERO)),
    );
    let locator = BoneGroup::new("locator", Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO);
    let tip_uuid = chain.children[0].children[0].uuid;
    let locator_uuid = locator.uuid;
    let blueprint =
        ModelBlueprint::new("bend", vec![Arc::new(chain), Arc::new(locator)], Vec::new());

    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, tip_uuid, locator_uuid);
    pipeline.freeze(&RootFrame::default());

    let tip_pos = world_position(&pipeline, "tip");
    assert!(tip_pos.distance(Vec3::new(1.0, 1.0, 0.0)) < 1.0e-2, "tip at {tip_pos}");

    // Segment lengths survive the solve.
    let root_pos = world_position(&pipeline, "root");
    let mid_pos = world_position(&pipeline, "mid");
    assert!((root_pos.distance(mid_pos) - 1.0).abs() < 1.0e-2);
    assert!((mid_pos.distance(tip_pos) - 1.0).abs() < 1.0e-2);
}

#[test]
fn resolving_a_converged_chain_is_a_no_op() {
    let (blueprint, tip, locator) = chain_model(1.9);
    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, tip, locator);
    pipeline.freeze(&RootFrame::default());

    let settled = world_position(&pipeline, "tip");
    pipeline.solve_ik(None);
    assert_eq!(world_position(&pipeline, "tip"), settled);
}

// ============================================================================
// Unreachable targets
// ============================================================================

#[test]
fn unreachable_target_fully_extends() {
    let (blueprint, tip, locator) = chain_model(10.0);
    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, tip, locator);
    pipeline.freeze(&RootFrame::default());

    // Total chain length is 2, so the tip lands at y=2 toward the target.
    let tip_pos = world_position(&pipeline, "tip");
    assert!(tip_pos.is_finite(), "tip must stay finite, got {tip_pos}");
    assert!(tip_pos.distance(Vec3::new(0.0, 2.0, 0.0)) < 1.0e-3, "tip at {tip_pos}");

    for name in ["root", "mid", "tip"] {
        assert!(world_position(&pipeline, name).is_finite());
    }
}

// ============================================================================
// Degenerate registrations
// ============================================================================

#[test]
fn single_bone_chain_registers_nothing() {
    let root = BoneGroup::new("root", Vec3::ZERO, Vec3::ZERO);
    let locator = BoneGroup::new("locator", Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO);
    let root_uuid = root.uuid;
    let locator_uuid = locator.uuid;
    let blueprint =
        ModelBlueprint::new("short", vec![Arc::new(root), Arc::new(locator)], Vec::new());

    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, root_uuid, locator_uuid);
    assert_eq!(pipeline.ik_chain_count(), 0);

    // Solving afterwards leaves positions untouched.
    pipeline.freeze(&RootFrame::default());
    assert_eq!(world_position(&pipeline, "root"), Vec3::ZERO);
}

#[test]
fn unknown_target_registers_nothing() {
    let (blueprint, _, locator) = chain_model(1.5);
    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, Uuid::new_v4(), locator);
    assert_eq!(pipeline.ik_chain_count(), 0);
}

#[test]
fn locator_inside_chain_excludes_its_ancestors() {
    // The locator hangs off the mid bone: bones above it must not try to
    // solve through the thing driving them, leaving a too-short chain.
    let chain = BoneGroup::new("root", Vec3::ZERO, Vec3::ZERO).with_child(
        BoneGroup::new("mid", Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO)
            .with_child(BoneGroup::new("locator", Vec3::new(0.5, 1.5, 0.0), Vec3::ZERO)),
    );
    let mid_uuid = chain.children[0].uuid;
    let locator_uuid = chain.children[0].children[0].uuid;
    let blueprint = ModelBlueprint::new("nested", vec![Arc::new(chain)], Vec::new());

    let mut pipeline = frozen_pipeline(blueprint);
    pipeline.add_locator(None, mid_uuid, locator_uuid);
    assert_eq!(pipeline.ik_chain_count(), 0);
}

//! End-to-end tests for the transform family.

mod common;

use glam::{Vec2, Vec3};

use common::{Clock, Recorder, context, record_states, state, states, touch};
use touch_lattice::config::TransformConfig;
use touch_lattice::prelude::*;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

fn half_cm_threshold() -> TransformConfig {
    TransformConfig {
        screen_transform_threshold_cm: 0.5,
        ..TransformConfig::default()
    }
}

// ============================================================================
// Pan
// ============================================================================

#[test]
fn test_pan_waits_for_threshold_then_reports_excess() {
    let mut ctx = context(160.0);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(half_cm_threshold()).unwrap())
        .unwrap();
    let recorder = record_states(&ctx, pan);
    let started = Recorder::attach(ctx.recognizer::<Transform>(pan).unwrap().transform_started());
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(pan).unwrap().transformed());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Possible);

    ctx.move_pointer(finger, Vec2::new(79.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Possible);
    assert_eq!(deltas.len(), 0);

    ctx.move_pointer(finger, Vec2::new(81.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Changed);
    assert_eq!(started.len(), 1);
    let first = deltas.events();
    assert_eq!(first.len(), 1);
    assert!(approx(first[0].position.x, 1.0) && approx(first[0].position.y, 0.0));
    assert_eq!(first[0].types, TransformTypes::TRANSLATION);

    for x in 82..=84 {
        ctx.move_pointer(finger, Vec2::new(x as f32, 0.0));
        clock.step(&mut ctx);
    }
    let all = deltas.events();
    assert_eq!(all.len(), 4);
    for delta in &all[1..] {
        assert!(approx(delta.position.x, 1.0));
        assert_eq!(delta.rotation, 0.0);
        assert_eq!(delta.scale, 1.0);
    }
    assert_eq!(
        states(&recorder),
        vec![
            GestureState::Possible,
            GestureState::Began,
            GestureState::Changed,
            GestureState::Changed,
            GestureState::Changed,
            GestureState::Changed,
        ]
    );
}

#[test]
fn test_pan_threshold_follows_dpi_change() {
    let mut ctx = context(160.0);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(half_cm_threshold()).unwrap())
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(pan).unwrap().transformed());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(40.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Possible);

    // 0.5 cm is now 20 px instead of 80 px.
    ctx.set_dots_per_centimeter(40.0).unwrap();
    ctx.move_pointer(finger, Vec2::new(41.0, 0.0));
    clock.step(&mut ctx);

    assert_eq!(state(&ctx, pan), GestureState::Changed);
    let events = deltas.events();
    assert_eq!(events.len(), 1);
    assert!(approx(events[0].position.x, 21.0));
}

#[test]
fn test_pan_completes_on_release() {
    let mut ctx = context(160.0);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(half_cm_threshold()).unwrap())
        .unwrap();
    let completed = Recorder::attach(ctx.recognizer::<Transform>(pan).unwrap().transform_completed());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(200.0, 0.0));
    clock.step(&mut ctx);
    ctx.end_pointer(finger);
    clock.step(&mut ctx);

    assert_eq!(completed.len(), 1);
    let gesture = ctx.gesture(pan).unwrap();
    assert_eq!(gesture.previous_state(), GestureState::Recognized);
    assert_eq!(gesture.state(), GestureState::Idle);
}

#[test]
fn test_pan_below_threshold_returns_to_idle() {
    let mut ctx = context(160.0);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(half_cm_threshold()).unwrap())
        .unwrap();
    let recorder = record_states(&ctx, pan);

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(10.0, 0.0));
    clock.step(&mut ctx);
    ctx.end_pointer(finger);
    clock.step(&mut ctx);

    assert_eq!(states(&recorder), vec![GestureState::Possible, GestureState::Idle]);
    assert!(!ctx.recognizer::<Transform>(pan).unwrap().is_transforming());
}

// ============================================================================
// Rotate and scale
// ============================================================================

#[test]
fn test_rotate_reports_angle_of_second_pointer() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let dial = ctx.create_object(None).unwrap();
    let rotate = ctx
        .attach(dial, Transform::rotate(TransformConfig::default()).unwrap())
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(rotate).unwrap().transformed());

    let _anchor = touch(&mut ctx, 0.0, 0.0);
    let moving = touch(&mut ctx, 100.0, 0.0);
    clock.step(&mut ctx);

    ctx.move_pointer(moving, Vec2::new(100.0, 100.0));
    clock.step(&mut ctx);

    assert_eq!(state(&ctx, rotate), GestureState::Changed);
    let events = deltas.events();
    assert_eq!(events.len(), 1);
    assert!(approx(events[0].rotation, 45.0));
    assert_eq!(events[0].types, TransformTypes::ROTATION);
    assert_eq!(events[0].position, Vec3::ZERO);
}

#[test]
fn test_scale_reports_distance_ratio() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let photo = ctx.create_object(None).unwrap();
    let scale = ctx
        .attach(photo, Transform::scale(TransformConfig::default()).unwrap())
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(scale).unwrap().transformed());

    let _left = touch(&mut ctx, 0.0, 0.0);
    let right = touch(&mut ctx, 100.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(right, Vec2::new(200.0, 0.0));
    clock.step(&mut ctx);
    ctx.move_pointer(right, Vec2::new(300.0, 0.0));
    clock.step(&mut ctx);

    let events = deltas.events();
    assert_eq!(events.len(), 2);
    assert!(approx(events[0].scale, 2.0));
    assert!(approx(events[1].scale, 1.5));
}

#[test]
fn test_points_too_close_translate_only() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let transform = ctx
        .attach(card, Transform::new(TransformConfig::default()).unwrap())
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(transform).unwrap().transformed());

    let first = touch(&mut ctx, 0.0, 0.0);
    let _second = touch(&mut ctx, 2.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(first, Vec2::new(0.0, 10.0));
    clock.step(&mut ctx);

    let events = deltas.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].types, TransformTypes::TRANSLATION);
}

// ============================================================================
// Pinned and plane space
// ============================================================================

#[test]
fn test_pinned_rotates_around_object() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let knob = ctx.create_object(None).unwrap();
    ctx.set_world_position(knob, Vec3::new(50.0, 50.0, 0.0)).unwrap();
    let pinned = ctx
        .attach(knob, Transform::pinned(TransformConfig::default()).unwrap())
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(pinned).unwrap().transformed());

    let finger = touch(&mut ctx, 150.0, 50.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(50.0, 150.0));
    clock.step(&mut ctx);

    let events = deltas.events();
    assert_eq!(events.len(), 1);
    assert!(approx(events[0].rotation, 90.0));
    assert_eq!(events[0].position, Vec3::ZERO);
}

#[test]
fn test_plane_space_pan_in_world_units() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(
            card,
            Transform::pan(TransformConfig::default())
                .unwrap()
                .in_space(TransformSpace::Plane { normal: Some(Vec3::Z) }),
        )
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(pan).unwrap().transformed());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(0.0, 50.0));
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(0.0, 60.0));
    clock.step(&mut ctx);

    let events = deltas.events();
    assert_eq!(events.len(), 2);
    assert!(approx(events[1].position.y, 10.0));
    assert!(approx(events[1].position.z, 0.0));
    assert_eq!(ctx.recognizer::<Transform>(pan).unwrap().plane().normal, Vec3::Z);
}

// ============================================================================
// Clustered
// ============================================================================

#[test]
fn test_clustered_scale_with_four_fingers() {
    let mut ctx = context(TouchConfig::default().dots_per_centimeter);
    let mut clock = Clock::new();
    let map = ctx.create_object(None).unwrap();
    let transform = ctx
        .attach(
            map,
            Transform::scale(TransformConfig::default()).unwrap().clustered(),
        )
        .unwrap();
    let deltas = Recorder::attach(ctx.recognizer::<Transform>(transform).unwrap().transformed());

    let _l1 = touch(&mut ctx, 0.0, 0.0);
    let _l2 = touch(&mut ctx, 10.0, 0.0);
    let r1 = touch(&mut ctx, 200.0, 0.0);
    let r2 = touch(&mut ctx, 210.0, 0.0);
    clock.step(&mut ctx);

    // Centroids move from 5 and 205 to 5 and 405.
    ctx.move_pointer(r1, Vec2::new(400.0, 0.0));
    ctx.move_pointer(r2, Vec2::new(410.0, 0.0));
    clock.step(&mut ctx);

    let events = deltas.events();
    assert_eq!(events.len(), 1);
    assert!(approx(events[0].scale, 2.0));
}

// ============================================================================
// Cancellation
// ============================================================================

#[test]
fn test_cancelled_pointer_cancels_started_transform() {
    let mut ctx = context(160.0);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(half_cm_threshold()).unwrap())
        .unwrap();
    let recorder = record_states(&ctx, pan);

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(100.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Changed);

    ctx.cancel_pointer(finger, false);
    clock.step(&mut ctx);

    assert_eq!(
        states(&recorder).last().copied(),
        Some(GestureState::Idle)
    );
    assert!(states(&recorder).contains(&GestureState::Cancelled));
    assert!(ctx.pointer(finger).is_none());
}

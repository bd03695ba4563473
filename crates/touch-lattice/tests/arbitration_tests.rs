//! Cross-gesture arbitration through a full context.

mod common;

use std::sync::Arc;
use std::time::Duration;

use glam::Vec2;

use common::{Clock, Recorder, context, record_states, state, states, touch};
use touch_lattice::config::{TapConfig, TransformConfig};
use touch_lattice::prelude::*;
use touch_lattice::{PointerFlags, PointerId, PointerKind};

const DPCM: f32 = 40.0;

fn double_tap_config() -> TapConfig {
    TapConfig {
        number_of_taps_required: 2,
        time_limit_ms: Some(300),
        ..TapConfig::default()
    }
}

fn tap_once(ctx: &mut TouchContext, clock: &mut Clock, at: Vec2) {
    let finger = touch(ctx, at.x, at.y);
    clock.step(ctx);
    ctx.end_pointer(finger);
    clock.step(ctx);
}

// ============================================================================
// Exclusivity and friendliness
// ============================================================================

#[test]
fn test_competing_taps_only_one_wins() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let first = ctx.attach(button, Tap::default()).unwrap();
    let second = ctx.attach(button, Tap::default()).unwrap();
    let first_states = record_states(&ctx, first);
    let second_states = record_states(&ctx, second);

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);

    assert!(states(&first_states).contains(&GestureState::Recognized));
    assert!(states(&second_states).contains(&GestureState::Failed));
    assert!(!states(&second_states).contains(&GestureState::Recognized));
}

#[test]
fn test_friendly_taps_both_recognized() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let first = ctx.attach(button, Tap::default()).unwrap();
    let second = ctx.attach(button, Tap::default()).unwrap();
    ctx.add_friendly(first, second).unwrap();
    let first_taps = Recorder::attach(ctx.recognizer::<Tap>(first).unwrap().tapped());
    let second_taps = Recorder::attach(ctx.recognizer::<Tap>(second).unwrap().tapped());

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);

    assert_eq!(first_taps.len(), 1);
    assert_eq!(second_taps.len(), 1);
    assert!(ctx.gesture(first).unwrap().is_friendly_with(second));
}

#[test]
fn test_gestures_on_separate_branches_do_not_compete() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let left = ctx.create_object(None).unwrap();
    let right = ctx.create_object(None).unwrap();
    ctx.set_hit_tester(move |pointer: &Pointer, object: ObjectId| {
        let on_left = pointer.position().x < 100.0;
        if on_left == (object == left) {
            HitResult::Hit(HitData::default())
        } else {
            HitResult::Miss
        }
    });
    let left_tap = ctx.attach(left, Tap::default()).unwrap();
    let right_tap = ctx.attach(right, Tap::default()).unwrap();
    let left_taps = Recorder::attach(ctx.recognizer::<Tap>(left_tap).unwrap().tapped());
    let right_taps = Recorder::attach(ctx.recognizer::<Tap>(right_tap).unwrap().tapped());

    let a = touch(&mut ctx, 10.0, 0.0);
    let b = touch(&mut ctx, 500.0, 0.0);
    clock.step(&mut ctx);
    ctx.end_pointer(a);
    ctx.end_pointer(b);
    clock.step(&mut ctx);

    assert_eq!(left_taps.len(), 1);
    assert_eq!(right_taps.len(), 1);
}

#[test]
fn test_started_pan_blocks_new_pointers_for_tap() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let board = ctx.create_object(None).unwrap();
    let card = ctx.create_object(Some(board)).unwrap();
    let pan = ctx
        .attach(board, Transform::pan(TransformConfig::default()).unwrap())
        .unwrap();
    let tap = ctx.attach(card, Tap::default()).unwrap();
    let tap_states = record_states(&ctx, tap);

    let dragging = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(dragging, Vec2::new(50.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Changed);

    let _second = touch(&mut ctx, 100.0, 0.0);
    clock.step(&mut ctx);
    // The first finger reached the tap before the pan began and was failed
    // then; the second one never reaches it.
    assert_eq!(state(&ctx, tap), GestureState::Idle);
    assert_eq!(
        states(&tap_states),
        vec![GestureState::Possible, GestureState::Failed, GestureState::Idle]
    );
}

// ============================================================================
// Dependencies
// ============================================================================

#[test]
fn test_single_tap_waits_for_double_tap_to_fail() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let photo = ctx.create_object(None).unwrap();
    let single = ctx.attach(photo, Tap::default()).unwrap();
    let double = ctx
        .attach(photo, Tap::new(double_tap_config()).unwrap())
        .unwrap();
    ctx.require_to_fail(single, Some(double)).unwrap();
    let singles = Recorder::attach(ctx.recognizer::<Tap>(single).unwrap().tapped());

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);
    assert_eq!(singles.len(), 0);
    assert_eq!(state(&ctx, single), GestureState::Possible);

    clock.advance(&mut ctx, Duration::from_millis(400));
    assert_eq!(singles.len(), 1);
    assert_eq!(
        ctx.gesture(single).unwrap().previous_state(),
        GestureState::Recognized
    );
}

#[test]
fn test_double_tap_fails_dependent_single_tap() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let photo = ctx.create_object(None).unwrap();
    let single = ctx.attach(photo, Tap::default()).unwrap();
    let double = ctx
        .attach(photo, Tap::new(double_tap_config()).unwrap())
        .unwrap();
    ctx.require_to_fail(single, Some(double)).unwrap();
    let singles = Recorder::attach(ctx.recognizer::<Tap>(single).unwrap().tapped());
    let doubles = Recorder::attach(ctx.recognizer::<Tap>(double).unwrap().tapped());
    let single_states = record_states(&ctx, single);

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);
    tap_once(&mut ctx, &mut clock, Vec2::ZERO);

    assert_eq!(doubles.len(), 1);
    assert_eq!(singles.len(), 0);
    assert!(states(&single_states).contains(&GestureState::Failed));
}

// ============================================================================
// Delegates
// ============================================================================

struct Refuse;

impl GestureDelegate for Refuse {
    fn should_begin(&self, _gesture: &Gesture) -> bool {
        false
    }
}

struct Exploding;

impl GestureDelegate for Exploding {
    fn should_begin(&self, _gesture: &Gesture) -> bool {
        panic!("host delegate bug")
    }
}

struct MouseOnly;

impl GestureDelegate for MouseOnly {
    fn should_receive_pointer(&self, _gesture: &Gesture, pointer: &Pointer) -> bool {
        pointer.kind() == PointerKind::Mouse
    }
}

#[test]
fn test_refusing_delegate_fails_gesture() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let tap = ctx.attach(button, Tap::default()).unwrap();
    ctx.set_gesture_delegate(tap, Some(Arc::new(Refuse))).unwrap();
    let recorder = record_states(&ctx, tap);

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);

    assert_eq!(
        states(&recorder),
        vec![GestureState::Possible, GestureState::Failed, GestureState::Idle]
    );
}

#[test]
fn test_panicking_delegate_is_a_refusal() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let tap = ctx.attach(button, Tap::default()).unwrap();
    ctx.set_delegate(Some(Arc::new(Exploding)));
    let recorder = record_states(&ctx, tap);

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);

    assert!(states(&recorder).contains(&GestureState::Failed));
    assert!(!states(&recorder).contains(&GestureState::Recognized));
    assert_eq!(state(&ctx, tap), GestureState::Idle);
}

#[test]
fn test_delegate_filters_pointers() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let tap = ctx.attach(button, Tap::default()).unwrap();
    ctx.set_delegate(Some(Arc::new(MouseOnly)));
    let taps = Recorder::attach(ctx.recognizer::<Tap>(tap).unwrap().tapped());

    tap_once(&mut ctx, &mut clock, Vec2::ZERO);
    assert_eq!(taps.len(), 0);

    let mouse = ctx.begin_pointer(Vec2::ZERO, PointerInit::mouse(InputSourceId::default()));
    clock.step(&mut ctx);
    ctx.end_pointer(mouse);
    clock.step(&mut ctx);
    assert_eq!(taps.len(), 1);
}

// ============================================================================
// Hand-off and cancellation
// ============================================================================

#[test]
fn test_recognized_transform_hands_off_pointers() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(TransformConfig::default()).unwrap())
        .unwrap();
    ctx.set_pointer_limits(pan, PointerLimits::new(None, Some(1)).unwrap())
        .unwrap();
    let cancelled = Recorder::attach(ctx.pointers_cancelled());
    let added = Recorder::attach(ctx.pointers_added());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(60.0, 0.0));
    clock.step(&mut ctx);
    assert_eq!(state(&ctx, pan), GestureState::Changed);

    // A second finger exceeds the limit: the pan ends and gives its pointers back.
    let _extra = touch(&mut ctx, 200.0, 0.0);
    clock.step(&mut ctx);
    assert_eq!(
        ctx.gesture(pan).unwrap().previous_state(),
        GestureState::Recognized
    );
    let cancelled: Vec<PointerId> = cancelled.events().concat();
    assert!(cancelled.contains(&finger));
    assert!(ctx.pointer(finger).is_none());

    clock.step(&mut ctx);
    let returned: Vec<PointerId> = added.events().concat();
    assert!(returned.iter().any(|id| {
        ctx.pointer(*id)
            .is_some_and(|pointer| pointer.flags().has(PointerFlags::RETURNED))
    }));
}

#[test]
fn test_returned_pointer_is_not_a_tap() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let tap = ctx.attach(card, Tap::default()).unwrap();
    let taps = Recorder::attach(ctx.recognizer::<Tap>(tap).unwrap().tapped());
    let added = Recorder::attach(ctx.pointers_added());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.cancel_pointer(finger, true);
    clock.step(&mut ctx);
    clock.step(&mut ctx);

    let returned = added
        .events()
        .concat()
        .into_iter()
        .find(|id| *id != finger)
        .expect("pointer was re-issued");
    ctx.end_pointer(returned);
    clock.step(&mut ctx);

    assert_eq!(taps.len(), 0);
}

#[test]
fn test_cancel_gesture_cascades_to_pointers() {
    let mut ctx = context(DPCM);
    let mut clock = Clock::new();
    let card = ctx.create_object(None).unwrap();
    let pan = ctx
        .attach(card, Transform::pan(TransformConfig::default()).unwrap())
        .unwrap();
    let recorder = record_states(&ctx, pan);
    let cancelled = Recorder::attach(ctx.pointers_cancelled());

    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);
    ctx.move_pointer(finger, Vec2::new(60.0, 0.0));
    clock.step(&mut ctx);

    ctx.cancel_gesture(pan, true, false).unwrap();
    assert_eq!(state(&ctx, pan), GestureState::Cancelled);
    clock.step(&mut ctx);

    assert_eq!(states(&recorder).last().copied(), Some(GestureState::Idle));
    assert_eq!(cancelled.events().concat(), vec![finger]);
    assert!(ctx.pointer(finger).is_none());
}

//! Frame processing: batching, ordering and pointer identity.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;

use common::{Clock, context, touch};
use touch_lattice::prelude::*;

#[test]
fn test_pointer_ids_never_reused() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    let mut seen = HashSet::new();

    for round in 0..20 {
        let ids: Vec<PointerId> = (0..5)
            .map(|i| touch(&mut ctx, i as f32, round as f32))
            .collect();
        clock.step(&mut ctx);
        for id in ids {
            assert!(seen.insert(id), "pointer id reused");
            ctx.end_pointer(id);
        }
        clock.step(&mut ctx);
    }
    assert_eq!(seen.len(), 100);
    assert!(ctx.pointers().is_empty());
}

#[test]
fn test_batches_delivered_in_order() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let sink = log.clone();
    ctx.frame_started().connect(move |_| sink.lock().push("frame_started"));
    let sink = log.clone();
    ctx.pointers_added().connect(move |_| sink.lock().push("added"));
    let sink = log.clone();
    ctx.pointers_updated().connect(move |_| sink.lock().push("updated"));
    let sink = log.clone();
    ctx.pointers_released().connect(move |_| sink.lock().push("released"));
    let sink = log.clone();
    ctx.pointers_cancelled().connect(move |_| sink.lock().push("cancelled"));
    let sink = log.clone();
    ctx.frame_finished().connect(move |_| sink.lock().push("frame_finished"));

    let moving = touch(&mut ctx, 0.0, 0.0);
    let ending = touch(&mut ctx, 10.0, 0.0);
    let cancelling = touch(&mut ctx, 20.0, 0.0);
    clock.step(&mut ctx);
    log.lock().clear();

    // Queue everything in reverse; delivery order is fixed regardless.
    ctx.cancel_pointer(cancelling, false);
    ctx.end_pointer(ending);
    ctx.move_pointer(moving, Vec2::new(5.0, 0.0));
    let _fresh = touch(&mut ctx, 30.0, 0.0);
    clock.step(&mut ctx);

    assert_eq!(
        *log.lock(),
        vec![
            "frame_started",
            "added",
            "updated",
            "released",
            "cancelled",
            "frame_finished"
        ]
    );
}

#[test]
fn test_gestures_see_begin_move_end_within_one_frame() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    let surface = ctx.create_object(None).unwrap();
    let meta = ctx.attach(surface, Meta::new()).unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));

    let recognizer = ctx.recognizer::<Meta>(meta).unwrap();
    let sink = log.clone();
    recognizer.pointer_began().connect(move |_| sink.lock().push("b"));
    let sink = log.clone();
    recognizer.pointer_moved().connect(move |_| sink.lock().push("m"));
    let sink = log.clone();
    recognizer.pointer_ended().connect(move |_| sink.lock().push("e"));

    let a = touch(&mut ctx, 0.0, 0.0);
    let b = touch(&mut ctx, 50.0, 0.0);
    ctx.move_pointer(a, Vec2::new(5.0, 0.0));
    ctx.move_pointer(b, Vec2::new(55.0, 0.0));
    ctx.end_pointer(a);
    ctx.end_pointer(b);
    clock.step(&mut ctx);

    assert_eq!(*log.lock(), vec!["b", "b", "m", "m", "e", "e"]);
}

#[test]
fn test_moves_coalesce_within_frame() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    let finger = touch(&mut ctx, 0.0, 0.0);
    clock.step(&mut ctx);

    ctx.move_pointer(finger, Vec2::new(5.0, 0.0));
    ctx.move_pointer(finger, Vec2::new(9.0, 0.0));
    assert_eq!(ctx.pointer(finger).unwrap().position(), Vec2::ZERO);
    clock.step(&mut ctx);

    let pointer = ctx.pointer(finger).unwrap();
    assert_eq!(pointer.position(), Vec2::new(9.0, 0.0));
    assert_eq!(pointer.previous_position(), Vec2::ZERO);
}

#[test]
fn test_press_uses_begin_position_even_if_moved() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    let button = ctx.create_object(None).unwrap();
    let press = ctx.attach(button, Press::default()).unwrap();

    let finger = touch(&mut ctx, 1.0, 1.0);
    ctx.move_pointer(finger, Vec2::new(7.0, 7.0));
    clock.step(&mut ctx);

    let pointer = ctx.pointer(finger).unwrap();
    assert_eq!(pointer.press_position(), Vec2::new(1.0, 1.0));
    assert_eq!(pointer.position(), Vec2::new(7.0, 7.0));
    assert_eq!(
        ctx.gesture(press).unwrap().previous_state(),
        GestureState::Recognized
    );
}

#[test]
fn test_frame_counter_advances() {
    let mut ctx = context(40.0);
    let mut clock = Clock::new();
    assert_eq!(ctx.frame(), 0);
    clock.step(&mut ctx);
    clock.step(&mut ctx);
    assert_eq!(ctx.frame(), 2);
}

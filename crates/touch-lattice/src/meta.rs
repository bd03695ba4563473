//! Pass-through observation of raw pointer events.
//!
//! [`Meta`] reports every pointer it receives as an individual event. It is
//! passive, so attaching one never changes which other gesture wins.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use touch_lattice_core::{PointerId, Signal};

use crate::gesture::{GestureCx, GestureState, Recognizer};

/// Payload of every [`Meta`] signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetaEvent {
    pub pointer: PointerId,
    /// Screen position at the time of the event.
    pub position: Vec2,
}

/// Forwards pointer lifecycle events.
#[derive(Default)]
pub struct Meta {
    pointer_began: Signal<MetaEvent>,
    pointer_moved: Signal<MetaEvent>,
    pointer_ended: Signal<MetaEvent>,
    pointer_cancelled: Signal<MetaEvent>,
}

impl Meta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_began(&self) -> &Signal<MetaEvent> {
        &self.pointer_began
    }

    pub fn pointer_moved(&self) -> &Signal<MetaEvent> {
        &self.pointer_moved
    }

    pub fn pointer_ended(&self) -> &Signal<MetaEvent> {
        &self.pointer_ended
    }

    pub fn pointer_cancelled(&self) -> &Signal<MetaEvent> {
        &self.pointer_cancelled
    }
}

fn emit_each(signal: &Signal<MetaEvent>, cx: &GestureCx<'_>, pointers: &[PointerId]) {
    for pointer in pointers {
        signal.emit(MetaEvent {
            pointer: *pointer,
            position: cx.pointers().position(*pointer),
        });
    }
}

impl Recognizer for Meta {
    fn kind(&self) -> &'static str {
        "meta"
    }

    fn is_passive(&self) -> bool {
        true
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if matches!(cx.state(), GestureState::Idle | GestureState::Possible) {
            cx.set_state(GestureState::Began);
        }
        emit_each(&self.pointer_began, cx, pointers);
    }

    fn pointers_updated(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if cx.state().is_started() {
            cx.set_state(GestureState::Changed);
        }
        emit_each(&self.pointer_moved, cx, pointers);
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if cx.state().is_started() && cx.pointer_count() == 0 {
            cx.set_state(GestureState::ENDED);
        }
        emit_each(&self.pointer_ended, cx, pointers);
    }

    fn pointers_cancelled(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        cx.cancel_if_pointers_lost();
        emit_each(&self.pointer_cancelled, cx, pointers);
    }
}

static_assertions::assert_impl_all!(MetaEvent: Serialize, serde::de::DeserializeOwned, Send);

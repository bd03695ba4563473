//! Recognized when the last required pointer is lifted.
//!
//! Like [`Press`](crate::press::Press), [`Release`] is passive.

use touch_lattice_core::{Pointer, PointerId, Signal};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

/// Fires on release.
#[derive(Default)]
pub struct Release {
    ignore_children: bool,
    released: Signal<()>,
}

impl Release {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept pointers pressed directly on the gesture's object.
    pub fn with_ignore_children(mut self, ignore_children: bool) -> Self {
        self.ignore_children = ignore_children;
        self
    }

    pub fn ignore_children(&self) -> bool {
        self.ignore_children
    }

    pub fn set_ignore_children(&mut self, ignore_children: bool) {
        self.ignore_children = ignore_children;
    }

    /// Emitted when the gesture is recognized.
    pub fn released(&self) -> &Signal<()> {
        &self.released
    }
}

impl Recognizer for Release {
    fn kind(&self) -> &'static str {
        "release"
    }

    fn is_passive(&self) -> bool {
        true
    }

    fn should_receive_pointer(&self, cx: &GestureCx<'_>, pointer: &Pointer) -> bool {
        !self.ignore_children || pointer.press_target() == Some(cx.object())
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        match cx.pointers_num_state() {
            PointersNumState::PassedMinThreshold => {
                if cx.state() == GestureState::Idle {
                    cx.set_state(GestureState::Possible);
                }
            }
            PointersNumState::PassedMinMaxThreshold => {
                cx.set_state(GestureState::Failed);
            }
            _ => {}
        }
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        if cx.pointers_num_state() == PointersNumState::PassedMinThreshold {
            cx.set_state(GestureState::Recognized);
        }
    }

    fn state_entered(&mut self, _cx: &mut GestureCx<'_>, state: GestureState) {
        if state == GestureState::Recognized {
            self.released.emit(());
        }
    }
}

//! Recognized the moment enough pointers are pressed.
//!
//! [`Press`] is passive: it neither prevents nor is prevented by other
//! gestures unless it carries its own delegate.

use touch_lattice_core::{Pointer, PointerId, Signal};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

/// Fires on press.
#[derive(Default)]
pub struct Press {
    ignore_children: bool,
    pressed: Signal<()>,
}

impl Press {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept pointers pressed directly on the gesture's object, not on
    /// one of its descendants.
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
    pub fn pressed(&self) -> &Signal<()> {
        &self.pressed
    }
}

impl Recognizer for Press {
    fn kind(&self) -> &'static str {
        "press"
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
                cx.set_state(GestureState::Recognized);
            }
            PointersNumState::PassedMinMaxThreshold => {
                cx.set_state(GestureState::Failed);
            }
            _ => {}
        }
    }

    fn state_entered(&mut self, _cx: &mut GestureCx<'_>, state: GestureState) {
        if state == GestureState::Recognized {
            self.pressed.emit(());
        }
    }
}

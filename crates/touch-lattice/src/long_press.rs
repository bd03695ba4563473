//! Press-and-hold recognition.

use std::time::Instant;

use glam::Vec2;

use touch_lattice_core::config::LongPressConfig;
use touch_lattice_core::logging::targets;
use touch_lattice_core::{PointerId, Result, Signal};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

/// Recognized once pointers are held long enough without moving too far.
///
/// When the hold time elapses the gesture checks what lies under its current
/// screen position; if that is no longer its object (or a descendant), it
/// fails instead.
pub struct LongPress {
    config: LongPressConfig,
    pressed_at: Option<Instant>,
    total_movement: Vec2,
    long_pressed: Signal<Vec2>,
}

impl Default for LongPress {
    fn default() -> Self {
        Self::with_valid_config(LongPressConfig::default())
    }
}

impl LongPress {
    pub fn new(config: LongPressConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: LongPressConfig) -> Self {
        Self {
            config,
            pressed_at: None,
            total_movement: Vec2::ZERO,
            long_pressed: Signal::new(),
        }
    }

    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }

    /// Emitted with the screen position when the hold is recognized.
    pub fn long_pressed(&self) -> &Signal<Vec2> {
        &self.long_pressed
    }

    fn held_long_enough(&self, cx: &GestureCx<'_>) -> bool {
        self.pressed_at.is_some_and(|pressed_at| {
            cx.now().saturating_duration_since(pressed_at) >= self.config.time_to_press()
        })
    }
}

impl Recognizer for LongPress {
    fn kind(&self) -> &'static str {
        "long_press"
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        match cx.pointers_num_state() {
            PointersNumState::PassedMaxThreshold | PointersNumState::PassedMinMaxThreshold => {
                cx.set_state(GestureState::Failed);
            }
            PointersNumState::PassedMinThreshold => {
                self.pressed_at = Some(cx.now());
                cx.set_state(GestureState::Possible);
            }
            _ => {}
        }
    }

    fn pointers_updated(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        let limit = self.config.distance_limit_px(cx.dots_per_centimeter());
        if !limit.is_finite() {
            return;
        }
        self.total_movement += cx.screen_position() - cx.previous_screen_position();
        if self.total_movement.length_squared() > limit * limit {
            tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "long press moved too far");
            cx.set_state(GestureState::Failed);
        }
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if cx.pointers_num_state() != PointersNumState::PassedMinThreshold {
            return;
        }
        // The hold may have completed inside the frame that delivered the release.
        if cx.state() == GestureState::Possible && self.held_long_enough(cx) {
            self.pressed_at = None;
            let on_target = pointers.iter().all(|p| cx.is_pointer_on_target(*p));
            if on_target {
                cx.set_state(GestureState::Recognized);
                return;
            }
        }
        cx.set_state(GestureState::Failed);
    }

    fn tick(&mut self, cx: &mut GestureCx<'_>) {
        if cx.state() != GestureState::Possible || !self.held_long_enough(cx) {
            return;
        }
        self.pressed_at = None;
        let on_target = cx
            .hit_at(cx.screen_position())
            .is_some_and(|hit| cx.is_on_target(hit.target));
        if on_target {
            cx.set_state(GestureState::Recognized);
        } else {
            tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "long press left its target");
            cx.set_state(GestureState::Failed);
        }
    }

    fn state_entered(&mut self, cx: &mut GestureCx<'_>, state: GestureState) {
        if state == GestureState::Recognized {
            self.long_pressed.emit(cx.screen_position());
        }
    }

    fn reset(&mut self) {
        self.pressed_at = None;
        self.total_movement = Vec2::ZERO;
    }
}

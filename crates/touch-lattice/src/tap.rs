//! Tap and multi-tap recognition.
//!
//! A tap is a press and release without much movement. With
//! `number_of_taps_required > 1` the gesture stays Possible between taps and
//! is recognized on the release that completes the sequence; every later
//! press must land within the distance limit of the first one.
//!
//! Pointers re-issued by a hand-off are never accepted: a finger that just
//! finished a pan is not a tap.

use std::time::Instant;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use touch_lattice_core::cluster::centroid;
use touch_lattice_core::config::TapConfig;
use touch_lattice_core::logging::targets;
use touch_lattice_core::{
    Pointer, PointerFlags, PointerId, Result, Signal, TimedSequence, is_invalid_position,
};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

/// Payload of [`Tap::tapped`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Screen position of the final release.
    pub position: Vec2,
    /// Taps in the recognized sequence.
    pub taps: u32,
}

/// Recognizes one or more quick taps.
pub struct Tap {
    config: TapConfig,
    /// True between the press that reached the minimum pointer count and the
    /// release that ends the tap.
    active: bool,
    taps_done: u32,
    start_position: Vec2,
    started_at: Option<Instant>,
    total_movement: Vec2,
    /// Current and previous positions of pointers released over the target.
    released: TimedSequence<(Vec2, Vec2)>,
    tapped: Signal<TapEvent>,
}

impl Default for Tap {
    fn default() -> Self {
        Self::with_valid_config(TapConfig::default())
    }
}

impl Tap {
    /// Create a tap recognizer, rejecting invalid settings.
    pub fn new(config: TapConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: TapConfig) -> Self {
        Self {
            config,
            active: false,
            taps_done: 0,
            start_position: Vec2::ZERO,
            started_at: None,
            total_movement: Vec2::ZERO,
            released: TimedSequence::new(),
            tapped: Signal::new(),
        }
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Taps completed in the current sequence.
    pub fn taps_done(&self) -> u32 {
        self.taps_done
    }

    /// Emitted when the tap sequence is recognized.
    pub fn tapped(&self) -> &Signal<TapEvent> {
        &self.tapped
    }

    fn begin_sequence(&mut self, position: Vec2, now: Instant) {
        self.start_position = position;
        self.started_at = Some(now);
    }

    fn limit_squared(&self, cx: &GestureCx<'_>) -> f32 {
        let limit = self.config.distance_limit_px(cx.dots_per_centimeter());
        limit * limit
    }

    /// True once the sequence has run past its time limit.
    fn timed_out(&self, cx: &GestureCx<'_>) -> bool {
        match (self.config.time_limit(), self.started_at) {
            (Some(limit), Some(started_at)) => cx.now().saturating_duration_since(started_at) >= limit,
            _ => false,
        }
    }

    /// Report the centroid of pointers released inside the combine window.
    fn combine_released(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        let now = cx.now();
        for pointer in pointers {
            if !cx.is_pointer_on_target(*pointer) {
                continue;
            }
            if let Some(data) = cx.pointer(*pointer) {
                self.released
                    .add((data.position(), data.previous_position()), now);
            }
        }
        if cx.pointer_count() != 0 {
            return;
        }
        let window = self.config.combine_pointers_interval();
        let position = centroid(self.released.within(now, window).map(|(p, _)| *p));
        let previous = centroid(self.released.within(now, window).map(|(_, p)| *p));
        cx.set_cached_position(position, previous);
    }
}

impl Recognizer for Tap {
    fn kind(&self) -> &'static str {
        "tap"
    }

    fn should_receive_pointer(&self, _cx: &GestureCx<'_>, pointer: &Pointer) -> bool {
        !pointer.flags().has(PointerFlags::RETURNED)
    }

    fn should_cache_pointer_position(&mut self, cx: &mut GestureCx<'_>, pointer: PointerId) -> bool {
        cx.is_pointer_on_target(pointer)
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        let num_state = cx.pointers_num_state();
        if matches!(
            num_state,
            PointersNumState::PassedMaxThreshold | PointersNumState::PassedMinMaxThreshold
        ) {
            cx.set_state(GestureState::Failed);
            return;
        }

        if cx.pointer_count() == pointers.len()
            && let Some(first) = pointers.first()
        {
            let position = cx.pointers().position(*first);
            if self.taps_done == 0 {
                self.begin_sequence(position, cx.now());
            } else if self.taps_done >= self.config.number_of_taps_required {
                // Completed but held back by a dependency, then tapped again.
                self.reset();
                self.begin_sequence(position, cx.now());
            } else if (position - self.start_position).length_squared() > self.limit_squared(cx) {
                tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "next tap too far away");
                cx.set_state(GestureState::Failed);
                return;
            }
        }

        if num_state == PointersNumState::PassedMinThreshold {
            if self.active {
                // Lifted a finger and pressed again mid-tap.
                cx.set_state(GestureState::Failed);
            } else {
                if cx.state() == GestureState::Idle {
                    cx.set_state(GestureState::Possible);
                }
                self.active = true;
            }
        }
    }

    fn pointers_updated(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if self.config.distance_limit_cm.is_none() {
            return;
        }
        let Some(data) = pointers.first().and_then(|p| cx.pointer(*p)) else {
            return;
        };
        self.total_movement += data.position() - data.previous_position();
        if self.total_movement.length_squared() > self.limit_squared(cx) {
            cx.set_state(GestureState::Failed);
        }
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        if self.config.combine_pointers {
            self.combine_released(cx, pointers);
        }
        if cx.pointer_count() != 0 {
            return;
        }
        if !self.active || is_invalid_position(cx.screen_position()) || self.timed_out(cx) {
            cx.set_state(GestureState::Failed);
            return;
        }
        self.taps_done += 1;
        self.active = false;
        if self.taps_done >= self.config.number_of_taps_required {
            cx.set_state(GestureState::Recognized);
        }
    }

    fn tick(&mut self, cx: &mut GestureCx<'_>) {
        if self.timed_out(cx) && matches!(cx.state(), GestureState::Idle | GestureState::Possible) {
            tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "tap time limit passed");
            cx.set_state(GestureState::Failed);
        }
    }

    fn state_entered(&mut self, cx: &mut GestureCx<'_>, state: GestureState) {
        if state == GestureState::Recognized {
            self.tapped.emit(TapEvent {
                position: cx.screen_position(),
                taps: self.taps_done,
            });
        }
    }

    fn reset(&mut self) {
        self.active = false;
        self.taps_done = 0;
        self.started_at = None;
        self.total_movement = Vec2::ZERO;
        self.released.clear();
    }
}

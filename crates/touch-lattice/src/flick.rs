//! Flick recognition.
//!
//! While the gesture tracks pointers, the movement of its screen position is
//! sampled once per frame. On the final release the samples from the last
//! `flick_time_ms` are summed; the flick is recognized when that sum, after
//! the direction filter, is at least `min_distance_cm` long.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use touch_lattice_core::config::FlickConfig;
use touch_lattice_core::logging::targets;
use touch_lattice_core::{FlickDirection, PointerId, Result, Signal, TimedSequence};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

/// Payload of [`Flick::flicked`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlickEvent {
    /// Summed screen movement inside the flick window.
    pub vector: Vec2,
    /// Time from the oldest sample in the window to the release.
    pub duration: Duration,
}

/// Recognizes a quick swipe.
pub struct Flick {
    config: FlickConfig,
    active: bool,
    /// Set once the pointers moved past the movement threshold.
    moving: bool,
    movement: Vec2,
    deltas: TimedSequence<Vec2>,
    last_flick: Option<FlickEvent>,
    flicked: Signal<FlickEvent>,
}

impl Default for Flick {
    fn default() -> Self {
        Self::with_valid_config(FlickConfig::default())
    }
}

impl Flick {
    pub fn new(config: FlickConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: FlickConfig) -> Self {
        Self {
            config,
            active: false,
            moving: false,
            movement: Vec2::ZERO,
            deltas: TimedSequence::new(),
            last_flick: None,
            flicked: Signal::new(),
        }
    }

    pub fn config(&self) -> &FlickConfig {
        &self.config
    }

    /// The most recent recognized flick.
    pub fn last_flick(&self) -> Option<FlickEvent> {
        self.last_flick
    }

    /// Emitted when a flick is recognized.
    pub fn flicked(&self) -> &Signal<FlickEvent> {
        &self.flicked
    }

    /// Sum the samples inside the window, returning the vector and the time
    /// since the oldest sample used.
    fn measure(&self, cx: &GestureCx<'_>) -> FlickEvent {
        let now = cx.now();
        let window = self.config.flick_time();
        let (mut vector, start) = match now.checked_sub(window) {
            Some(cutoff) => {
                let (samples, start) = self.deltas.later_than_with_start(cutoff);
                (samples.into_iter().copied().sum::<Vec2>(), start)
            }
            None => (self.deltas.within(now, window).copied().sum::<Vec2>(), now),
        };
        match self.config.direction {
            FlickDirection::Any => {}
            FlickDirection::Horizontal => vector.y = 0.0,
            FlickDirection::Vertical => vector.x = 0.0,
        }
        FlickEvent {
            vector,
            duration: now.saturating_duration_since(start),
        }
    }
}

impl Recognizer for Flick {
    fn kind(&self) -> &'static str {
        "flick"
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        match cx.pointers_num_state() {
            PointersNumState::PassedMaxThreshold | PointersNumState::PassedMinMaxThreshold => {
                if cx.state() == GestureState::Possible {
                    cx.set_state(GestureState::Failed);
                }
            }
            PointersNumState::PassedMinThreshold => {
                if self.active {
                    // Lifted a finger and pressed again while moving.
                    cx.set_state(GestureState::Failed);
                } else {
                    self.active = true;
                    if cx.state() == GestureState::Idle {
                        cx.set_state(GestureState::Possible);
                    }
                }
            }
            _ => {}
        }
    }

    fn pointers_updated(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        if !self.active || self.moving {
            return;
        }
        self.movement += cx.screen_position() - cx.previous_screen_position();
        let threshold = cx.cm_to_px(self.config.movement_threshold_cm);
        if self.movement.length_squared() >= threshold * threshold {
            self.moving = true;
        }
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        if cx.pointer_count() != 0 {
            return;
        }
        if !self.active || !self.moving {
            tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "flick never moved");
            cx.set_state(GestureState::Failed);
            return;
        }

        let last = cx.screen_position() - cx.previous_screen_position();
        if last.is_finite() {
            self.deltas.add(last, cx.now());
        }
        let flick = self.measure(cx);
        if flick.vector.length() < cx.cm_to_px(self.config.min_distance_cm) {
            tracing::debug!(
                target: targets::GESTURE,
                gesture = ?cx.id(),
                distance = flick.vector.length(),
                "flick too short"
            );
            cx.set_state(GestureState::Failed);
        } else {
            self.last_flick = Some(flick);
            cx.set_state(GestureState::Recognized);
        }
    }

    fn tick(&mut self, cx: &mut GestureCx<'_>) {
        if !self.active {
            return;
        }
        let delta = cx.screen_position() - cx.previous_screen_position();
        if delta.is_finite() {
            self.deltas.add(delta, cx.now());
        }
    }

    fn state_entered(&mut self, _cx: &mut GestureCx<'_>, state: GestureState) {
        if state == GestureState::Recognized
            && let Some(flick) = self.last_flick
        {
            self.flicked.emit(flick);
        }
    }

    fn reset(&mut self) {
        self.active = false;
        self.moving = false;
        self.movement = Vec2::ZERO;
        self.deltas.clear();
    }
}

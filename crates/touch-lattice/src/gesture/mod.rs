//! Gesture state machine.
//!
//! Every attached gesture is split in two halves:
//!
//! - a [`Gesture`] record owned by the context, holding the state, the
//!   pointers the gesture tracks, friendliness and dependency links, and the
//!   `state_changed` signal;
//! - a boxed [`Recognizer`] holding the algorithm and its own scratch state.
//!
//! Recognizers never see the context directly. Each callback receives a
//! [`GestureCx`], a short-lived handle through which the recognizer reads
//! pointers and requests state transitions. Transition requests run the full
//! arbitration pass synchronously, so by the time [`GestureCx::set_state`]
//! returns, any competing gesture it prevented has already failed.
//!
//! # States
//!
//! ```text
//! Idle -> Possible -> Began -> Changed* -> Recognized (Ended)
//!                  \-> Recognized
//! any non-terminal -> Failed | Cancelled
//! terminal -> Idle   (at the next frame boundary)
//! ```

pub mod arbitration;

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};

use touch_lattice_core::cluster::{center_position, previous_center_position};
use touch_lattice_core::config::cm_to_px;
use touch_lattice_core::{
    Error, GestureId, INVALID_POSITION, ObjectId, Pointer, PointerHit, PointerId, PointerTable,
    ProjectionParams, Result, Signal,
};

use crate::engine::Engine;
pub use arbitration::GestureDelegate;

/// Lifecycle state of a gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    /// Not tracking anything.
    #[default]
    Idle,
    /// Tracking pointers, not yet recognized.
    Possible,
    /// A continuous gesture started.
    Began,
    /// A continuous gesture produced a new delta.
    Changed,
    /// A discrete gesture was recognized, or a continuous one ended.
    Recognized,
    /// Recognition was rejected.
    Failed,
    /// Recognition was aborted from outside.
    Cancelled,
}

impl GestureState {
    /// Alias used by continuous gestures.
    pub const ENDED: GestureState = GestureState::Recognized;

    /// Recognized, Failed or Cancelled.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Recognized | Self::Failed | Self::Cancelled)
    }

    /// Began or Changed.
    pub fn is_started(self) -> bool {
        matches!(self, Self::Began | Self::Changed)
    }
}

/// Payload of [`Gesture::state_changed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub gesture: GestureId,
    pub object: ObjectId,
    pub previous: GestureState,
    pub current: GestureState,
}

// ============================================================================
// Pointer count limits
// ============================================================================

/// How the number of tracked pointers relates to a gesture's limits after
/// the latest batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointersNumState {
    /// Within limits, and no limit was crossed by the batch.
    InRange,
    /// Below the minimum.
    #[default]
    TooFew,
    /// Above the maximum.
    TooMany,
    /// The batch crossed the minimum (upwards on press, downwards on release).
    PassedMinThreshold,
    /// The batch crossed the maximum.
    PassedMaxThreshold,
    /// The batch crossed both limits at once.
    PassedMinMaxThreshold,
}

/// Minimum and maximum number of pointers a gesture works with.
///
/// `None` means unlimited. Zero is rejected: a gesture that needs no
/// pointers cannot be recognized from pointer input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointerLimits {
    min: Option<u32>,
    max: Option<u32>,
}

impl PointerLimits {
    /// No limits.
    pub const UNBOUNDED: PointerLimits = PointerLimits {
        min: None,
        max: None,
    };

    /// Create limits, rejecting zero and `max < min`.
    pub fn new(min: Option<u32>, max: Option<u32>) -> Result<Self> {
        if min == Some(0) {
            return Err(Error::invalid_config(
                "PointerLimits",
                "min_pointers must be at least 1",
            ));
        }
        if max == Some(0) {
            return Err(Error::invalid_config(
                "PointerLimits",
                "max_pointers must be at least 1",
            ));
        }
        if let (Some(min), Some(max)) = (min, max)
            && max < min
        {
            return Err(Error::invalid_config(
                "PointerLimits",
                format!("max_pointers ({max}) is below min_pointers ({min})"),
            ));
        }
        Ok(Self { min, max })
    }

    /// Exactly `count` pointers.
    pub fn exactly(count: u32) -> Result<Self> {
        Self::new(Some(count), Some(count))
    }

    /// Minimum pointer count.
    pub fn min(&self) -> Option<u32> {
        self.min
    }

    /// Maximum pointer count.
    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Classify a press batch of `added` pointers on top of `old`.
    pub fn on_pressed(&self, old: usize, added: usize) -> PointersNumState {
        let total = old + added;
        let mut state = PointersNumState::InRange;
        match self.min {
            None if old == 0 => state = PointersNumState::PassedMinThreshold,
            None => {}
            Some(min) => {
                let min = min as usize;
                if old < min {
                    state = if total >= min {
                        PointersNumState::PassedMinThreshold
                    } else {
                        PointersNumState::TooFew
                    };
                }
            }
        }
        if let Some(max) = self.max {
            let max = max as usize;
            if old <= max {
                if total > max {
                    state = if state == PointersNumState::PassedMinThreshold {
                        PointersNumState::PassedMinMaxThreshold
                    } else {
                        PointersNumState::PassedMaxThreshold
                    };
                }
            } else {
                state = PointersNumState::TooMany;
            }
        }
        state
    }

    /// Classify a move batch with `count` tracked pointers.
    pub fn on_updated(&self, count: usize) -> PointersNumState {
        if self.min.is_some_and(|min| count < min as usize) {
            PointersNumState::TooFew
        } else if self.max.is_some_and(|max| count > max as usize) {
            PointersNumState::TooMany
        } else {
            PointersNumState::InRange
        }
    }

    /// Classify a release or cancel batch of `removed` pointers out of `old`.
    pub fn on_released(&self, old: usize, removed: usize) -> PointersNumState {
        let total = old.saturating_sub(removed);
        let mut state = PointersNumState::InRange;
        match self.min {
            None if total == 0 => state = PointersNumState::PassedMinThreshold,
            None => {}
            Some(min) => {
                let min = min as usize;
                if old >= min {
                    if total < min {
                        state = PointersNumState::PassedMinThreshold;
                    }
                } else {
                    state = PointersNumState::TooFew;
                }
            }
        }
        if let Some(max) = self.max {
            let max = max as usize;
            if old > max {
                state = if total <= max {
                    if state == PointersNumState::PassedMinThreshold {
                        PointersNumState::PassedMinMaxThreshold
                    } else {
                        PointersNumState::PassedMaxThreshold
                    }
                } else {
                    PointersNumState::TooMany
                };
            }
        }
        state
    }
}

// ============================================================================
// Gesture record
// ============================================================================

/// The context-owned half of an attached gesture.
pub struct Gesture {
    pub(crate) id: GestureId,
    pub(crate) object: ObjectId,
    pub(crate) kind: &'static str,
    pub(crate) passive: bool,
    pub(crate) state: GestureState,
    pub(crate) previous_state: GestureState,
    pub(crate) active_pointers: Vec<PointerId>,
    /// True while the gesture holds a claim on every active pointer.
    pub(crate) retained: bool,
    pub(crate) limits: PointerLimits,
    pub(crate) num_state: PointersNumState,
    pub(crate) friendly: HashSet<GestureId>,
    pub(crate) require_to_fail: Option<GestureId>,
    pub(crate) dependents: Vec<GestureId>,
    pub(crate) required_failed: bool,
    pub(crate) delayed_state: Option<GestureState>,
    pub(crate) delegate: Option<Arc<dyn GestureDelegate>>,
    pub(crate) cached_position: Vec2,
    pub(crate) cached_previous_position: Vec2,
    pub(crate) state_changed: Signal<StateChange>,
}

impl fmt::Debug for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gesture")
            .field("id", &self.id)
            .field("object", &self.object)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("active_pointers", &self.active_pointers)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl Gesture {
    pub(crate) fn new(id: GestureId, object: ObjectId, kind: &'static str, passive: bool) -> Self {
        Self {
            id,
            object,
            kind,
            passive,
            state: GestureState::Idle,
            previous_state: GestureState::Idle,
            active_pointers: Vec::new(),
            retained: false,
            limits: PointerLimits::UNBOUNDED,
            num_state: PointersNumState::TooFew,
            friendly: HashSet::new(),
            require_to_fail: None,
            dependents: Vec::new(),
            required_failed: false,
            delayed_state: None,
            delegate: None,
            cached_position: INVALID_POSITION,
            cached_previous_position: INVALID_POSITION,
            state_changed: Signal::new(),
        }
    }

    pub fn id(&self) -> GestureId {
        self.id
    }

    /// The object this gesture is attached to.
    pub fn object(&self) -> ObjectId {
        self.object
    }

    /// Recognizer name, e.g. `"tap"`.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn previous_state(&self) -> GestureState {
        self.previous_state
    }

    /// Pointers currently tracked, in the order they were received.
    pub fn active_pointers(&self) -> &[PointerId] {
        &self.active_pointers
    }

    pub fn pointer_count(&self) -> usize {
        self.active_pointers.len()
    }

    pub fn limits(&self) -> PointerLimits {
        self.limits
    }

    /// Pointer count classification after the latest batch.
    pub fn pointers_num_state(&self) -> PointersNumState {
        self.num_state
    }

    /// Check whether `other` was declared friendly with this gesture.
    pub fn is_friendly_with(&self, other: GestureId) -> bool {
        self.friendly.contains(&other)
    }

    /// The gesture this one waits on.
    pub fn require_to_fail(&self) -> Option<GestureId> {
        self.require_to_fail
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// Emitted on every state transition.
    pub fn state_changed(&self) -> &Signal<StateChange> {
        &self.state_changed
    }

    /// Clear per-interaction bookkeeping. Links and limits survive.
    pub(crate) fn clear(&mut self) {
        self.active_pointers.clear();
        self.retained = false;
        self.num_state = PointersNumState::TooFew;
        self.required_failed = false;
        self.delayed_state = None;
        self.cached_position = INVALID_POSITION;
        self.cached_previous_position = INVALID_POSITION;
    }
}

// ============================================================================
// Recognizer capability
// ============================================================================

/// A gesture recognition algorithm.
///
/// All methods have no-op defaults except `kind`. The context calls the
/// pointer methods with the batch that reached this gesture; the tracked
/// pointer set and [`PointersNumState`] are already updated when they run.
pub trait Recognizer: Any + Send {
    /// Short name for logs.
    fn kind(&self) -> &'static str;

    /// Passive gestures never prevent others and are never prevented,
    /// unless they carry a delegate.
    fn is_passive(&self) -> bool {
        false
    }

    /// Filter a pointer before it joins the tracked set.
    fn should_receive_pointer(&self, _cx: &GestureCx<'_>, _pointer: &Pointer) -> bool {
        true
    }

    /// Whether the last released pointer's position is kept as this
    /// gesture's screen position once it holds no pointers.
    fn should_cache_pointer_position(&mut self, _cx: &mut GestureCx<'_>, _pointer: PointerId) -> bool {
        true
    }

    fn pointers_pressed(&mut self, _cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {}

    fn pointers_updated(&mut self, _cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {}

    fn pointers_released(&mut self, _cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {}

    fn pointers_cancelled(&mut self, cx: &mut GestureCx<'_>, _pointers: &[PointerId]) {
        cx.cancel_if_pointers_lost();
    }

    /// Called once per frame after pointer batches while the gesture is
    /// Possible, Began or Changed.
    fn tick(&mut self, _cx: &mut GestureCx<'_>) {}

    /// Called after the gesture entered `state`.
    fn state_entered(&mut self, _cx: &mut GestureCx<'_>, _state: GestureState) {}

    /// Clear algorithm state before the gesture returns to Idle.
    fn reset(&mut self) {}
}

// ============================================================================
// Recognizer context
// ============================================================================

/// Access to the context from inside a [`Recognizer`] callback.
pub struct GestureCx<'a> {
    pub(crate) id: GestureId,
    pub(crate) engine: &'a mut Engine,
}

impl GestureCx<'_> {
    pub fn id(&self) -> GestureId {
        self.id
    }

    fn record(&self) -> Option<&Gesture> {
        self.engine.gesture(self.id)
    }

    /// The gesture record.
    ///
    /// # Panics
    ///
    /// Never while a callback runs: a gesture cannot be detached from
    /// inside its own callbacks.
    pub fn gesture(&self) -> &Gesture {
        match self.record() {
            Some(gesture) => gesture,
            None => unreachable!("gesture detached during its own callback"),
        }
    }

    pub fn object(&self) -> ObjectId {
        self.gesture().object
    }

    pub fn state(&self) -> GestureState {
        self.gesture().state
    }

    pub fn active_pointers(&self) -> &[PointerId] {
        &self.gesture().active_pointers
    }

    pub fn pointer_count(&self) -> usize {
        self.gesture().active_pointers.len()
    }

    pub fn pointers_num_state(&self) -> PointersNumState {
        self.gesture().num_state
    }

    pub fn pointers(&self) -> &PointerTable {
        &self.engine.pointers
    }

    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.engine.pointers.get(id)
    }

    /// Current frame's timestamp.
    pub fn now(&self) -> Instant {
        self.engine.now
    }

    pub fn dots_per_centimeter(&self) -> f32 {
        self.engine.config.dots_per_centimeter
    }

    /// Convert a length in centimeters at the current DPI.
    pub fn cm_to_px(&self, cm: f32) -> f32 {
        cm_to_px(cm, self.engine.config.dots_per_centimeter)
    }

    /// World position of the object this gesture is attached to.
    pub fn world_position(&self) -> Vec3 {
        self.engine.scene.world_position(self.object())
    }

    /// Centroid of the tracked pointers, or the cached release position
    /// once none are left.
    pub fn screen_position(&self) -> Vec2 {
        let gesture = self.gesture();
        if gesture.active_pointers.is_empty() {
            gesture.cached_position
        } else {
            center_position(&self.engine.pointers, &gesture.active_pointers)
        }
    }

    /// Like [`screen_position`](Self::screen_position) one frame earlier.
    pub fn previous_screen_position(&self) -> Vec2 {
        let gesture = self.gesture();
        if gesture.active_pointers.is_empty() {
            gesture.cached_previous_position
        } else {
            previous_center_position(&self.engine.pointers, &gesture.active_pointers)
        }
    }

    /// Override the positions reported once no pointers are left.
    pub fn set_cached_position(&mut self, position: Vec2, previous: Vec2) {
        if let Some(gesture) = self.engine.gesture_mut(self.id) {
            gesture.cached_position = position;
            gesture.cached_previous_position = previous;
        }
    }

    /// Projection parameters for a pointer.
    pub fn projection_params(&self, pointer: PointerId) -> ProjectionParams {
        self.engine.projection_params(pointer)
    }

    /// What lies under a pointer this frame.
    pub fn pointer_hit(&mut self, pointer: PointerId) -> Option<PointerHit> {
        self.engine.pointer_hit(pointer)
    }

    /// True if the pointer is over this gesture's object or one of its descendants.
    pub fn is_pointer_on_target(&mut self, pointer: PointerId) -> bool {
        let object = self.object();
        self.engine.is_pointer_on(pointer, object)
    }

    /// What lies under `position`, probed with the first tracked pointer's metadata.
    pub fn hit_at(&self, position: Vec2) -> Option<PointerHit> {
        let template = self.active_pointers().first().copied()?;
        let probe = self.engine.pointers.get(template)?.probe_at(position);
        self.engine.scene.find_target(self.engine.hit_tester.as_ref(), &probe)
    }

    /// True if `object` is this gesture's object or lies beneath it.
    pub fn is_on_target(&self, object: ObjectId) -> bool {
        self.engine.scene.is_self_or_descendant(object, self.object())
    }

    /// Request a transition. Returns true if the gesture ended up in `state`.
    pub fn set_state(&mut self, state: GestureState) -> bool {
        self.engine.set_state(self.id, state)
    }

    /// Cancel the gesture when its tracked pointers were cancelled out from
    /// under it. Used by the default [`Recognizer::pointers_cancelled`].
    pub fn cancel_if_pointers_lost(&mut self) {
        let state = self.state();
        let lost_min = self.pointers_num_state() == PointersNumState::PassedMinThreshold;
        let lost_all = self.pointer_count() == 0;
        if (lost_min && state.is_started()) || (lost_all && matches!(state, GestureState::Possible))
        {
            self.set_state(GestureState::Cancelled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Pointer limits
    // =========================================================================

    #[test]
    fn test_limits_reject_zero_and_inverted() {
        assert!(PointerLimits::new(Some(0), None).is_err());
        assert!(PointerLimits::new(None, Some(0)).is_err());
        assert!(PointerLimits::new(Some(3), Some(2)).is_err());
        assert!(PointerLimits::exactly(2).is_ok());
    }

    #[test]
    fn test_unbounded_press_and_release() {
        let limits = PointerLimits::UNBOUNDED;
        assert_eq!(limits.on_pressed(0, 1), PointersNumState::PassedMinThreshold);
        assert_eq!(limits.on_pressed(1, 1), PointersNumState::InRange);
        assert_eq!(limits.on_updated(5), PointersNumState::InRange);
        assert_eq!(limits.on_released(2, 1), PointersNumState::InRange);
        assert_eq!(limits.on_released(2, 2), PointersNumState::PassedMinThreshold);
    }

    #[test]
    fn test_min_threshold() {
        let limits = PointerLimits::new(Some(2), None).unwrap();
        assert_eq!(limits.on_pressed(0, 1), PointersNumState::TooFew);
        assert_eq!(limits.on_pressed(1, 1), PointersNumState::PassedMinThreshold);
        assert_eq!(limits.on_pressed(2, 1), PointersNumState::InRange);
        assert_eq!(limits.on_updated(1), PointersNumState::TooFew);
        assert_eq!(limits.on_released(2, 1), PointersNumState::PassedMinThreshold);
        assert_eq!(limits.on_released(1, 1), PointersNumState::TooFew);
    }

    #[test]
    fn test_max_threshold() {
        let limits = PointerLimits::new(None, Some(1)).unwrap();
        assert_eq!(limits.on_pressed(0, 2), PointersNumState::PassedMinMaxThreshold);
        assert_eq!(limits.on_pressed(1, 1), PointersNumState::PassedMaxThreshold);
        assert_eq!(limits.on_pressed(2, 1), PointersNumState::TooMany);
        assert_eq!(limits.on_updated(2), PointersNumState::TooMany);
        assert_eq!(limits.on_released(3, 1), PointersNumState::TooMany);
        assert_eq!(limits.on_released(2, 1), PointersNumState::PassedMaxThreshold);
        assert_eq!(limits.on_released(2, 2), PointersNumState::PassedMinMaxThreshold);
    }

    // =========================================================================
    // States
    // =========================================================================

    #[test]
    fn test_state_classes() {
        assert_eq!(GestureState::ENDED, GestureState::Recognized);
        assert!(GestureState::Failed.is_terminal());
        assert!(!GestureState::Possible.is_terminal());
        assert!(GestureState::Changed.is_started());
        assert!(!GestureState::Recognized.is_started());
    }
}

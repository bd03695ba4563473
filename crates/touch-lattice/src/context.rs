//! The touch context: pointer input, frame processing and the gesture roster.
//!
//! A [`TouchContext`] is the single owner of everything the engine mutates.
//! Input sources feed it through [`begin_pointer`](TouchContext::begin_pointer),
//! [`move_pointer`](TouchContext::move_pointer),
//! [`end_pointer`](TouchContext::end_pointer) and
//! [`cancel_pointer`](TouchContext::cancel_pointer); none of these notify
//! gestures directly. Everything is delivered by
//! [`process_frame`](TouchContext::process_frame) in a fixed order:
//!
//! 1. gestures that reached a terminal state are reset to Idle;
//! 2. pointers begun since the last frame, as one pressed batch;
//! 3. pointers moved since the last frame, as one updated batch;
//! 4. pointers ended since the last frame, as one released batch;
//! 5. pointers cancelled by the host or by gestures, as cancelled batches;
//! 6. timers of every gesture that is tracking pointers;
//! 7. gestures that reached a terminal state are reset again.
//!
//! # Example
//!
//! ```
//! use std::time::{Duration, Instant};
//! use glam::Vec2;
//! use touch_lattice::context::TouchContext;
//! use touch_lattice::gesture::GestureState;
//! use touch_lattice::scene::HitResult;
//! use touch_lattice::tap::Tap;
//! use touch_lattice_core::{HitData, InputSourceId, ObjectId, Pointer, PointerInit, TouchConfig};
//!
//! let mut ctx = TouchContext::new(TouchConfig::default(), |_: &Pointer, _: ObjectId| {
//!     HitResult::Hit(HitData::default())
//! })
//! .unwrap();
//! let button = ctx.create_object(None).unwrap();
//! let tap = ctx.attach(button, Tap::default()).unwrap();
//!
//! let start = Instant::now();
//! let finger = ctx.begin_pointer(Vec2::new(10.0, 10.0), PointerInit::touch(InputSourceId::default()));
//! ctx.process_frame(start);
//! ctx.end_pointer(finger);
//! ctx.process_frame(start + Duration::from_millis(50));
//!
//! // Recognized during the frame, back to Idle by its end.
//! assert_eq!(ctx.gesture(tap).unwrap().previous_state(), GestureState::Recognized);
//! ```

use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use glam::{Vec2, Vec3};

use touch_lattice_core::logging::{PerfSpan, span_names, targets};
use touch_lattice_core::{
    Error, GestureId, ObjectId, Pointer, PointerButtons, PointerHit, PointerId, PointerInit,
    PointerTable, Result, Signal, TouchConfig,
};

use crate::engine::{CancelRequest, Engine};
use crate::gesture::{Gesture, GestureDelegate, PointerLimits, Recognizer};
use crate::scene::{HitTester, Scene};

/// Owner of the pointer table, the scene and every attached gesture.
pub struct TouchContext {
    engine: Engine,
    /// Pointers begun since the last frame, in arrival order.
    added: Vec<PointerId>,
    /// Pointers ended since the last frame, in arrival order.
    released: Vec<PointerId>,

    frame_started: Signal<u64>,
    frame_finished: Signal<u64>,
    pointers_added: Signal<Vec<PointerId>>,
    pointers_updated: Signal<Vec<PointerId>>,
    pointers_released: Signal<Vec<PointerId>>,
    pointers_cancelled: Signal<Vec<PointerId>>,
}

impl fmt::Debug for TouchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TouchContext")
            .field("frame", &self.engine.frame)
            .field("pointers", &self.engine.pointers.len())
            .field("gestures", &self.engine.gestures.len())
            .field("objects", &self.engine.scene.len())
            .finish_non_exhaustive()
    }
}

impl TouchContext {
    /// Create a context after validating `config`.
    pub fn new(config: TouchConfig, hit_tester: impl HitTester + 'static) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            target: targets::DISPATCH,
            dots_per_centimeter = config.dots_per_centimeter,
            "touch context created"
        );
        Ok(Self {
            engine: Engine::new(config, Box::new(hit_tester)),
            added: Vec::new(),
            released: Vec::new(),
            frame_started: Signal::new(),
            frame_finished: Signal::new(),
            pointers_added: Signal::new(),
            pointers_updated: Signal::new(),
            pointers_released: Signal::new(),
            pointers_cancelled: Signal::new(),
        })
    }

    pub fn config(&self) -> &TouchConfig {
        &self.engine.config
    }

    pub fn dots_per_centimeter(&self) -> f32 {
        self.engine.config.dots_per_centimeter
    }

    /// Change the screen density. Thresholds pick it up at their next comparison.
    pub fn set_dots_per_centimeter(&mut self, dots_per_centimeter: f32) -> Result<()> {
        let mut config = self.engine.config.clone();
        config.dots_per_centimeter = dots_per_centimeter;
        config.validate()?;
        self.engine.config = config;
        Ok(())
    }

    /// Number of frames processed so far.
    pub fn frame(&self) -> u64 {
        self.engine.frame
    }

    /// Replace the hit-test oracle.
    pub fn set_hit_tester(&mut self, hit_tester: impl HitTester + 'static) {
        self.engine.hit_tester = Box::new(hit_tester);
    }

    // ========================================================================
    // Signals
    // ========================================================================

    /// Emitted at the start of every frame with the frame number.
    pub fn frame_started(&self) -> &Signal<u64> {
        &self.frame_started
    }

    /// Emitted at the end of every frame with the frame number.
    pub fn frame_finished(&self) -> &Signal<u64> {
        &self.frame_finished
    }

    /// Emitted after the pressed batch was delivered.
    pub fn pointers_added(&self) -> &Signal<Vec<PointerId>> {
        &self.pointers_added
    }

    /// Emitted after the updated batch was delivered.
    pub fn pointers_updated(&self) -> &Signal<Vec<PointerId>> {
        &self.pointers_updated
    }

    /// Emitted after the released batch was delivered.
    pub fn pointers_released(&self) -> &Signal<Vec<PointerId>> {
        &self.pointers_released
    }

    /// Emitted after each cancelled batch was delivered.
    pub fn pointers_cancelled(&self) -> &Signal<Vec<PointerId>> {
        &self.pointers_cancelled
    }

    // ========================================================================
    // Scene
    // ========================================================================

    pub fn scene(&self) -> &Scene {
        &self.engine.scene
    }

    /// Add an object to the scene. With no parent it becomes the top-most root.
    pub fn create_object(&mut self, parent: Option<ObjectId>) -> Result<ObjectId> {
        self.engine.scene.create_object(parent)
    }

    /// Remove an object and its subtree, detaching every gesture on them.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        if !self.engine.scene.contains(id) {
            return Err(Error::UnknownObject(id));
        }
        let doomed: Vec<GestureId> = self
            .engine
            .gestures
            .iter()
            .filter(|(_, slot)| {
                self.engine
                    .scene
                    .is_self_or_descendant(slot.gesture.object, id)
            })
            .map(|(gesture, _)| gesture)
            .collect();
        for gesture in doomed {
            self.engine.detach(gesture)?;
        }
        let removed = self.engine.scene.remove_subtree(id)?;
        tracing::debug!(target: targets::DISPATCH, object = ?id, count = removed.len(), "objects removed");
        Ok(())
    }

    pub fn set_world_position(&mut self, id: ObjectId, position: Vec3) -> Result<()> {
        self.engine.scene.set_world_position(id, position)
    }

    // ========================================================================
    // Gestures
    // ========================================================================

    /// Attach a recognizer to `object`.
    pub fn attach<R: Recognizer>(&mut self, object: ObjectId, recognizer: R) -> Result<GestureId> {
        self.engine.attach(object, Box::new(recognizer))
    }

    /// Detach a gesture, cancelling it first if it is tracking pointers.
    pub fn detach(&mut self, id: GestureId) -> Result<()> {
        self.engine.detach(id)
    }

    pub fn gesture(&self, id: GestureId) -> Option<&Gesture> {
        self.engine.gesture(id)
    }

    /// Every attached gesture, in no particular order.
    pub fn gestures(&self) -> impl Iterator<Item = &Gesture> {
        self.engine.gestures.values().map(|slot| &slot.gesture)
    }

    /// The recognizer behind `id`, if it is an `R`.
    pub fn recognizer<R: Recognizer>(&self, id: GestureId) -> Option<&R> {
        let recognizer: &dyn Any = self.engine.recognizer(id)?;
        recognizer.downcast_ref::<R>()
    }

    /// Mutable access to the recognizer behind `id`, if it is an `R`.
    pub fn recognizer_mut<R: Recognizer>(&mut self, id: GestureId) -> Option<&mut R> {
        let recognizer: &mut dyn Any = self.engine.recognizer_mut(id)?;
        recognizer.downcast_mut::<R>()
    }

    /// Set the minimum and maximum number of pointers a gesture works with.
    pub fn set_pointer_limits(&mut self, id: GestureId, limits: PointerLimits) -> Result<()> {
        let gesture = self.engine.gesture_mut(id).ok_or(Error::UnknownGesture(id))?;
        gesture.limits = limits;
        Ok(())
    }

    /// Install or remove a gesture's own delegate.
    pub fn set_gesture_delegate(
        &mut self,
        id: GestureId,
        delegate: Option<Arc<dyn GestureDelegate>>,
    ) -> Result<()> {
        let gesture = self.engine.gesture_mut(id).ok_or(Error::UnknownGesture(id))?;
        gesture.delegate = delegate;
        Ok(())
    }

    /// Install or remove the delegate consulted for every gesture.
    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn GestureDelegate>>) {
        self.engine.delegate = delegate;
    }

    /// Let `a` and `b` always be recognized together.
    pub fn add_friendly(&mut self, a: GestureId, b: GestureId) -> Result<()> {
        if a == b {
            return Err(Error::SelfReference(a));
        }
        self.ensure_gesture(a)?;
        self.ensure_gesture(b)?;
        if let Some(gesture) = self.engine.gesture_mut(a) {
            gesture.friendly.insert(b);
        }
        if let Some(gesture) = self.engine.gesture_mut(b) {
            gesture.friendly.insert(a);
        }
        Ok(())
    }

    pub fn remove_friendly(&mut self, a: GestureId, b: GestureId) -> Result<()> {
        self.ensure_gesture(a)?;
        self.ensure_gesture(b)?;
        if let Some(gesture) = self.engine.gesture_mut(a) {
            gesture.friendly.remove(&b);
        }
        if let Some(gesture) = self.engine.gesture_mut(b) {
            gesture.friendly.remove(&a);
        }
        Ok(())
    }

    /// Make `gesture` wait for `required` to fail before it begins or is
    /// recognized. `None` removes the dependency.
    pub fn require_to_fail(&mut self, gesture: GestureId, required: Option<GestureId>) -> Result<()> {
        if required == Some(gesture) {
            return Err(Error::SelfReference(gesture));
        }
        self.ensure_gesture(gesture)?;
        if let Some(required) = required {
            self.ensure_gesture(required)?;
        }

        let old = self
            .engine
            .gesture_mut(gesture)
            .and_then(|g| mem::replace(&mut g.require_to_fail, required));
        if let Some(old) = old
            && let Some(previous) = self.engine.gesture_mut(old)
        {
            previous.dependents.retain(|g| *g != gesture);
        }
        if let Some(required) = required
            && let Some(target) = self.engine.gesture_mut(required)
            && !target.dependents.contains(&gesture)
        {
            target.dependents.push(gesture);
        }
        Ok(())
    }

    /// Cancel a gesture. A no-op for gestures already Failed or Cancelled.
    ///
    /// With `cancel_pointers` its pointers are cancelled at the next frame;
    /// with `return_pointers` as well, each is re-issued as a fresh pointer
    /// flagged [`RETURNED`](touch_lattice_core::PointerFlags::RETURNED).
    pub fn cancel_gesture(
        &mut self,
        id: GestureId,
        cancel_pointers: bool,
        return_pointers: bool,
    ) -> Result<()> {
        self.engine.cancel_gesture(id, cancel_pointers, return_pointers)
    }

    fn ensure_gesture(&self, id: GestureId) -> Result<()> {
        match self.engine.gesture(id) {
            Some(_) => Ok(()),
            None => Err(Error::UnknownGesture(id)),
        }
    }

    // ========================================================================
    // Pointers
    // ========================================================================

    pub fn pointers(&self) -> &PointerTable {
        &self.engine.pointers
    }

    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.engine.pointers.get(id)
    }

    /// Start a pointer. Gestures see it at the next frame.
    pub fn begin_pointer(&mut self, position: Vec2, init: PointerInit) -> PointerId {
        let id = self.engine.pointers.create(position, init);
        tracing::trace!(target: targets::DISPATCH, pointer = ?id, ?position, "begin pointer");
        self.added.push(id);
        id
    }

    /// Buffer a new position. Returns false for unknown or ended pointers.
    pub fn move_pointer(&mut self, id: PointerId, position: Vec2) -> bool {
        if !self.is_live(id) {
            tracing::trace!(target: targets::DISPATCH, pointer = ?id, "move of unknown pointer ignored");
            return false;
        }
        tracing::trace!(target: targets::DISPATCH, pointer = ?id, ?position, "move pointer");
        self.engine.pointers.buffer_position(id, position)
    }

    /// End a pointer. Returns false for unknown or already ended pointers.
    pub fn end_pointer(&mut self, id: PointerId) -> bool {
        if !self.engine.pointers.mark_released(id) {
            tracing::trace!(target: targets::DISPATCH, pointer = ?id, "end of unknown pointer ignored");
            return false;
        }
        tracing::trace!(target: targets::DISPATCH, pointer = ?id, "end pointer");
        self.released.push(id);
        true
    }

    /// Cancel a pointer, optionally re-issuing it as a returned pointer.
    /// Returns false for unknown or already ended pointers.
    pub fn cancel_pointer(&mut self, id: PointerId, return_pointer: bool) -> bool {
        if !self.is_live(id) {
            tracing::trace!(target: targets::DISPATCH, pointer = ?id, "cancel of unknown pointer ignored");
            return false;
        }
        tracing::trace!(target: targets::DISPATCH, pointer = ?id, return_pointer, "cancel pointer");
        self.engine.pending_cancels.push(CancelRequest {
            pointer: id,
            return_pointer,
        });
        true
    }

    /// Set a pointer's pressed buttons.
    pub fn set_pointer_buttons(&mut self, id: PointerId, buttons: PointerButtons) -> bool {
        self.engine.pointers.set_buttons(id, buttons)
    }

    /// The object under a pointer this frame.
    pub fn pointer_hit(&mut self, id: PointerId) -> Option<PointerHit> {
        self.engine.pointer_hit(id)
    }

    /// Recompute the object under a pointer, ignoring this frame's cache.
    /// Needed after the scene changed mid-frame.
    pub fn recalculate_hit(&mut self, id: PointerId) -> Option<PointerHit> {
        self.engine.recalculate_hit(id)
    }

    fn is_live(&self, id: PointerId) -> bool {
        self.engine
            .pointers
            .get(id)
            .is_some_and(|pointer| !pointer.is_released())
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Deliver everything buffered since the last frame.
    ///
    /// `now` drives every timer; pass synthetic instants for deterministic
    /// replays.
    pub fn process_frame(&mut self, now: Instant) {
        self.engine.frame += 1;
        self.engine.now = now;
        let frame = self.engine.frame;
        let _perf = PerfSpan::with_frame(span_names::FRAME, frame);

        self.frame_started.emit(frame);
        self.engine.reset_gestures();

        let added = mem::take(&mut self.added);
        let moved: Vec<PointerId> = self
            .engine
            .pointers
            .iter()
            .filter(|pointer| pointer.has_pending_move())
            .map(Pointer::id)
            .collect();
        let existing: Vec<PointerId> = self
            .engine
            .pointers
            .iter()
            .map(Pointer::id)
            .filter(|id| !added.contains(id))
            .collect();
        for id in existing {
            self.engine.pointers.commit_position(id);
        }

        if !added.is_empty() {
            let _batch = PerfSpan::with_frame(span_names::BATCH, frame);
            self.engine.dispatch_pressed(&added);
            for id in &added {
                self.engine.pointers.commit_position(*id);
            }
            self.pointers_added.emit(added);
        }

        if !moved.is_empty() {
            let _batch = PerfSpan::with_frame(span_names::BATCH, frame);
            self.engine.dispatch_updated(&moved);
            self.pointers_updated.emit(moved);
        }

        let released = mem::take(&mut self.released);
        if !released.is_empty() {
            let _batch = PerfSpan::with_frame(span_names::BATCH, frame);
            self.engine.dispatch_released(&released);
            self.pointers_released.emit(released.clone());
        }

        let cancelled = self.process_cancels(frame);

        for id in released.iter().chain(cancelled.iter()) {
            self.engine.check_retired(*id);
            self.engine.pointers.retire(*id);
        }

        self.engine.tick();
        self.engine.reset_gestures();
        self.frame_finished.emit(frame);
    }

    /// Deliver cancel requests until none are left, returning every pointer
    /// that was cancelled.
    fn process_cancels(&mut self, frame: u64) -> Vec<PointerId> {
        let mut cancelled = Vec::new();
        loop {
            let requests = mem::take(&mut self.engine.pending_cancels);
            if requests.is_empty() {
                break;
            }
            let _batch = PerfSpan::with_frame(span_names::BATCH, frame);
            let mut batch = Vec::new();
            for request in requests {
                if !self.engine.pointers.mark_released(request.pointer) {
                    continue;
                }
                if request.return_pointer
                    && let Some(returned) = self.engine.pointers.create_returned(request.pointer)
                {
                    tracing::trace!(
                        target: targets::DISPATCH,
                        pointer = ?request.pointer,
                        ?returned,
                        "pointer returned"
                    );
                    self.added.push(returned);
                }
                batch.push(request.pointer);
            }
            if batch.is_empty() {
                continue;
            }
            self.engine.dispatch_cancelled(&batch);
            self.pointers_cancelled.emit(batch.clone());
            cancelled.extend(batch);
        }
        cancelled
    }
}

//! Dispatch state shared by the context and every recognizer callback.
//!
//! [`Engine`] owns the pointer table, the scene, the gesture roster and the
//! per-frame queues. It drives the gesture state machine: every transition
//! request goes through [`Engine::set_state`], which applies the
//! require-to-fail delay, runs arbitration, updates pointer claims and emits
//! notifications before returning.
//!
//! While a recognizer callback runs, its box is taken out of the roster so
//! the callback can hold `&mut self` alongside a `&mut Engine`. Hooks aimed
//! at a detached recognizer (for example a `state_entered` caused by its own
//! transition request) are queued on its slot and delivered before the box
//! is put back.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use slotmap::SlotMap;

use touch_lattice_core::logging::targets;
use touch_lattice_core::{
    Error, GestureId, INVALID_POSITION, ObjectId, PointerHit, PointerId, PointerTable,
    ProjectionParams, Result, TouchConfig,
};

use crate::gesture::{Gesture, GestureCx, GestureDelegate, GestureState, Recognizer, StateChange};
use crate::scene::{HitTester, Scene};

/// A recognizer callback waiting for its box to be put back.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Hook {
    Entered(GestureState),
    Reset,
}

pub(crate) struct GestureSlot {
    pub(crate) gesture: Gesture,
    recognizer: Option<Box<dyn Recognizer>>,
    hooks: Vec<Hook>,
}

/// A pointer cancellation requested during the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CancelRequest {
    pub(crate) pointer: PointerId,
    pub(crate) return_pointer: bool,
}

pub(crate) struct Engine {
    pub(crate) gestures: SlotMap<GestureId, GestureSlot>,
    pub(crate) pointers: PointerTable,
    pub(crate) scene: Scene,
    pub(crate) hit_tester: Box<dyn HitTester>,
    pub(crate) config: TouchConfig,
    pub(crate) delegate: Option<Arc<dyn GestureDelegate>>,
    pub(crate) frame: u64,
    pub(crate) now: Instant,
    pub(crate) pending_cancels: Vec<CancelRequest>,
    /// Gestures each pressed pointer was delivered to, in delivery order.
    pointer_gestures: HashMap<PointerId, Vec<GestureId>>,
    pending_resets: Vec<GestureId>,
}

impl Engine {
    pub(crate) fn new(config: TouchConfig, hit_tester: Box<dyn HitTester>) -> Self {
        Self {
            gestures: SlotMap::with_key(),
            pointers: PointerTable::new(),
            scene: Scene::new(),
            hit_tester,
            config,
            delegate: None,
            frame: 0,
            now: Instant::now(),
            pending_cancels: Vec::new(),
            pointer_gestures: HashMap::new(),
            pending_resets: Vec::new(),
        }
    }

    pub(crate) fn gesture(&self, id: GestureId) -> Option<&Gesture> {
        self.gestures.get(id).map(|slot| &slot.gesture)
    }

    pub(crate) fn gesture_mut(&mut self, id: GestureId) -> Option<&mut Gesture> {
        self.gestures.get_mut(id).map(|slot| &mut slot.gesture)
    }

    pub(crate) fn recognizer(&self, id: GestureId) -> Option<&(dyn Recognizer + 'static)> {
        self.gestures.get(id)?.recognizer.as_deref()
    }

    pub(crate) fn recognizer_mut(&mut self, id: GestureId) -> Option<&mut (dyn Recognizer + 'static)> {
        self.gestures.get_mut(id)?.recognizer.as_deref_mut()
    }

    // ========================================================================
    // Roster
    // ========================================================================

    pub(crate) fn attach(&mut self, object: ObjectId, recognizer: Box<dyn Recognizer>) -> Result<GestureId> {
        if !self.scene.contains(object) {
            return Err(Error::UnknownObject(object));
        }
        let kind = recognizer.kind();
        let passive = recognizer.is_passive();
        let id = self.gestures.insert_with_key(|id| GestureSlot {
            gesture: Gesture::new(id, object, kind, passive),
            recognizer: Some(recognizer),
            hooks: Vec::new(),
        });
        self.scene.attach_gesture(object, id)?;
        tracing::debug!(target: targets::GESTURE, gesture = ?id, ?object, kind, "gesture attached");
        Ok(id)
    }

    pub(crate) fn detach(&mut self, id: GestureId) -> Result<()> {
        let state = self.gesture(id).ok_or(Error::UnknownGesture(id))?.state;
        if !state.is_terminal() && state != GestureState::Idle {
            self.set_state(id, GestureState::Cancelled);
        }
        self.release_claims(id, false);

        let Some(slot) = self.gestures.remove(id) else {
            return Err(Error::UnknownGesture(id));
        };
        let gesture = slot.gesture;
        for pointer in &gesture.active_pointers {
            if let Some(list) = self.pointer_gestures.get_mut(pointer) {
                list.retain(|g| *g != id);
            }
        }
        for friend in &gesture.friendly {
            if let Some(other) = self.gesture_mut(*friend) {
                other.friendly.remove(&id);
            }
        }
        if let Some(required) = gesture.require_to_fail
            && let Some(other) = self.gesture_mut(required)
        {
            other.dependents.retain(|g| *g != id);
        }
        for dependent in &gesture.dependents {
            if let Some(other) = self.gesture_mut(*dependent) {
                other.require_to_fail = None;
                if let Some(delayed) = other.delayed_state.take() {
                    tracing::debug!(
                        target: targets::GESTURE,
                        gesture = ?dependent,
                        ?delayed,
                        "dropping delayed state of detached dependency"
                    );
                }
            }
        }
        self.scene.detach_gesture(gesture.object, id);
        self.pending_resets.retain(|g| *g != id);
        tracing::debug!(target: targets::GESTURE, gesture = ?id, kind = gesture.kind, "gesture detached");
        Ok(())
    }

    /// Run `f` with the recognizer of `id` taken out of the roster.
    ///
    /// Returns `None` if the gesture is unknown or its recognizer is already
    /// running further up the stack.
    pub(crate) fn with_recognizer<R>(
        &mut self,
        id: GestureId,
        f: impl FnOnce(&mut dyn Recognizer, &mut GestureCx<'_>) -> R,
    ) -> Option<R> {
        let mut recognizer = self.gestures.get_mut(id)?.recognizer.take()?;
        let result = {
            let mut cx = GestureCx { id, engine: self };
            let result = f(recognizer.as_mut(), &mut cx);
            loop {
                let hooks = match cx.engine.gestures.get_mut(id) {
                    Some(slot) => mem::take(&mut slot.hooks),
                    None => Vec::new(),
                };
                if hooks.is_empty() {
                    break;
                }
                for hook in hooks {
                    match hook {
                        Hook::Entered(state) => recognizer.state_entered(&mut cx, state),
                        Hook::Reset => recognizer.reset(),
                    }
                }
            }
            result
        };
        if let Some(slot) = self.gestures.get_mut(id) {
            slot.recognizer = Some(recognizer);
        }
        Some(result)
    }

    fn run_hook(&mut self, id: GestureId, hook: Hook) {
        let Some(slot) = self.gestures.get_mut(id) else {
            return;
        };
        if slot.recognizer.is_none() {
            slot.hooks.push(hook);
            return;
        }
        self.with_recognizer(id, |recognizer, cx| match hook {
            Hook::Entered(state) => recognizer.state_entered(cx, state),
            Hook::Reset => recognizer.reset(),
        });
    }

    // ========================================================================
    // Hit testing
    // ========================================================================

    pub(crate) fn projection_params(&self, pointer: PointerId) -> ProjectionParams {
        match self.pointers.get(pointer) {
            Some(data) => self.hit_tester.projection_params(data),
            None => ProjectionParams::Screen,
        }
    }

    /// Hit under a pointer, computed at most once per frame.
    pub(crate) fn pointer_hit(&mut self, pointer: PointerId) -> Option<PointerHit> {
        let frame = self.frame;
        let data = self.pointers.get(pointer)?;
        if let Some(cached) = data.cached_hit(frame) {
            return cached;
        }
        let hit = self.scene.find_target(self.hit_tester.as_ref(), data);
        self.pointers.cache_hit(pointer, frame, hit);
        hit
    }

    /// Recompute the hit under a pointer, bypassing the frame cache.
    pub(crate) fn recalculate_hit(&mut self, pointer: PointerId) -> Option<PointerHit> {
        let data = self.pointers.get(pointer)?;
        let hit = self.scene.find_target(self.hit_tester.as_ref(), data);
        self.pointers.cache_hit(pointer, self.frame, hit);
        hit
    }

    pub(crate) fn is_pointer_on(&mut self, pointer: PointerId, object: ObjectId) -> bool {
        self.pointer_hit(pointer)
            .is_some_and(|hit| self.scene.is_self_or_descendant(hit.target, object))
    }

    // ========================================================================
    // State machine
    // ========================================================================

    /// Request a transition for `id`. Returns true if the gesture ended up in `value`.
    pub(crate) fn set_state(&mut self, id: GestureId, value: GestureState) -> bool {
        let Some(gesture) = self.gesture_mut(id) else {
            return false;
        };
        let current = gesture.state;
        if value == current && current != GestureState::Changed {
            return false;
        }
        if gesture.require_to_fail.is_some() && !gesture.required_failed {
            match value {
                GestureState::Began | GestureState::Recognized => {
                    gesture.delayed_state = Some(value);
                    tracing::debug!(
                        target: targets::GESTURE,
                        gesture = ?id,
                        delayed = ?value,
                        "waiting for required gesture to fail"
                    );
                    return false;
                }
                _ => gesture.delayed_state = None,
            }
        }

        let new = self.change_state(id, value);
        // Arbitration may have moved this gesture already, e.g. through a dependency.
        match self.gesture(id).map(|g| g.state) {
            Some(state) if state == current => {
                if new != current || new == GestureState::Changed {
                    self.apply_state(id, new);
                }
                new == value
            }
            _ => false,
        }
    }

    /// Validate a requested transition and run arbitration for it.
    fn change_state(&mut self, id: GestureId, value: GestureState) -> GestureState {
        let Some(current) = self.gesture(id).map(|g| g.state) else {
            return value;
        };
        match value {
            GestureState::Idle | GestureState::Possible => value,
            GestureState::Began => {
                if self.recognize_if_not_prevented(id) {
                    value
                } else {
                    self.queue_reset(id);
                    GestureState::Failed
                }
            }
            GestureState::Changed => {
                if current.is_started() {
                    value
                } else {
                    tracing::warn!(
                        target: targets::GESTURE,
                        gesture = ?id,
                        ?current,
                        "Changed requested from a state that has not begun; ignoring"
                    );
                    current
                }
            }
            GestureState::Failed | GestureState::Cancelled => {
                self.queue_reset(id);
                value
            }
            GestureState::Recognized => {
                self.queue_reset(id);
                if matches!(current, GestureState::Idle | GestureState::Possible)
                    && !self.recognize_if_not_prevented(id)
                {
                    GestureState::Failed
                } else {
                    value
                }
            }
        }
    }

    /// Enter `state`: adjust claims, notify, and propagate to dependents.
    fn apply_state(&mut self, id: GestureId, state: GestureState) {
        let Some(gesture) = self.gesture_mut(id) else {
            return;
        };
        let previous = gesture.state;
        gesture.previous_state = previous;
        gesture.state = state;
        let object = gesture.object;
        tracing::debug!(
            target: targets::GESTURE,
            gesture = ?id,
            kind = gesture.kind,
            ?previous,
            current = ?state,
            "state changed"
        );

        match state {
            GestureState::Began => self.retain_claims(id),
            GestureState::Recognized if previous.is_started() => self.release_claims(id, true),
            GestureState::Failed | GestureState::Cancelled if previous.is_started() => {
                self.release_claims(id, false)
            }
            _ => {}
        }

        if let Some(gesture) = self.gesture(id) {
            gesture.state_changed.emit(StateChange {
                gesture: id,
                object,
                previous,
                current: state,
            });
        }
        self.run_hook(id, Hook::Entered(state));

        let dependents = self.gesture(id).map(|g| g.dependents.clone()).unwrap_or_default();
        for dependent in dependents {
            match state {
                GestureState::Failed => {
                    let delayed = self.gesture_mut(dependent).and_then(|g| {
                        g.required_failed = true;
                        g.delayed_state.take()
                    });
                    if let Some(delayed) = delayed {
                        self.set_state(dependent, delayed);
                    }
                }
                GestureState::Began | GestureState::Recognized | GestureState::Cancelled => {
                    if self
                        .gesture(dependent)
                        .is_some_and(|g| g.state != GestureState::Failed)
                    {
                        self.set_state(dependent, GestureState::Failed);
                    }
                }
                _ => {}
            }
        }
    }

    fn retain_claims(&mut self, id: GestureId) {
        let Some(slot) = self.gestures.get_mut(id) else {
            return;
        };
        if slot.gesture.retained {
            return;
        }
        slot.gesture.retained = true;
        for pointer in &slot.gesture.active_pointers {
            self.pointers.retain(*pointer);
        }
    }

    /// Drop the gesture's claims. With `hand_off`, pointers nobody claims any
    /// more are cancelled and re-issued so other gestures can pick them up.
    fn release_claims(&mut self, id: GestureId, hand_off: bool) {
        let Some(slot) = self.gestures.get_mut(id) else {
            return;
        };
        if !slot.gesture.retained {
            return;
        }
        slot.gesture.retained = false;
        for pointer in &slot.gesture.active_pointers {
            let left = self.pointers.release(*pointer);
            let live = self.pointers.get(*pointer).is_some_and(|p| !p.is_released());
            if hand_off && left == 0 && live {
                self.pending_cancels.push(CancelRequest {
                    pointer: *pointer,
                    return_pointer: true,
                });
            }
        }
    }

    fn queue_reset(&mut self, id: GestureId) {
        if !self.pending_resets.contains(&id) {
            self.pending_resets.push(id);
        }
    }

    /// Return every terminal gesture queued for reset to Idle.
    pub(crate) fn reset_gestures(&mut self) {
        let queue = mem::take(&mut self.pending_resets);
        for id in queue {
            let Some(gesture) = self.gesture(id) else {
                continue;
            };
            if !gesture.state.is_terminal() {
                continue;
            }
            let pointers = gesture.active_pointers.clone();
            for pointer in &pointers {
                if let Some(list) = self.pointer_gestures.get_mut(pointer) {
                    list.retain(|g| *g != id);
                }
            }
            self.release_claims(id, false);
            self.run_hook(id, Hook::Reset);
            if let Some(gesture) = self.gesture_mut(id) {
                gesture.clear();
            }
            self.set_state(id, GestureState::Idle);
        }
    }

    /// Cancel a gesture from outside, optionally cancelling its pointers.
    pub(crate) fn cancel_gesture(
        &mut self,
        id: GestureId,
        cancel_pointers: bool,
        return_pointers: bool,
    ) -> Result<()> {
        let gesture = self.gesture(id).ok_or(Error::UnknownGesture(id))?;
        if matches!(gesture.state, GestureState::Cancelled | GestureState::Failed) {
            return Ok(());
        }
        let pointers = gesture.active_pointers.clone();
        self.set_state(id, GestureState::Cancelled);
        if cancel_pointers {
            self.pending_cancels
                .extend(pointers.into_iter().map(|pointer| CancelRequest {
                    pointer,
                    return_pointer: return_pointers,
                }));
        }
        Ok(())
    }

    // ========================================================================
    // Batch dispatch
    // ========================================================================

    /// Deliver newly pressed pointers to the gestures on their hit path.
    pub(crate) fn dispatch_pressed(&mut self, batch: &[PointerId]) {
        let mut groups: Vec<(ObjectId, Vec<PointerId>)> = Vec::new();
        for pointer in batch {
            let target = self.pointer_hit(*pointer).map(|hit| hit.target);
            self.pointers.set_press_data(*pointer, target);
            let Some(target) = target else {
                tracing::trace!(target: targets::DISPATCH, ?pointer, "pressed over nothing");
                continue;
            };
            match groups.iter_mut().find(|(object, _)| *object == target) {
                Some((_, pointers)) => pointers.push(*pointer),
                None => groups.push((target, vec![*pointer])),
            }
        }

        for (target, pointers) in groups {
            let candidates: Vec<GestureId> = self
                .scene
                .ancestor_chain(target)
                .into_iter()
                .flat_map(|object| self.scene.gestures(object).to_vec())
                .collect();

            for id in candidates {
                let Some(state) = self.gesture(id).map(|g| g.state) else {
                    continue;
                };
                if state.is_terminal() || self.is_blocked_by_started(id, target) {
                    continue;
                }
                let accepted: Vec<PointerId> = pointers
                    .iter()
                    .copied()
                    .filter(|pointer| self.should_receive_pointer(id, *pointer))
                    .collect();
                if accepted.is_empty() {
                    continue;
                }
                for pointer in &accepted {
                    self.pointer_gestures.entry(*pointer).or_default().push(id);
                }
                tracing::trace!(target: targets::DISPATCH, gesture = ?id, pointers = ?accepted, "pressed");
                self.gesture_pressed(id, &accepted);
            }
        }
    }

    pub(crate) fn dispatch_updated(&mut self, batch: &[PointerId]) {
        for (id, pointers) in self.group_by_gesture(batch) {
            if self.is_receiving(id) {
                self.gesture_updated(id, &pointers);
            }
        }
    }

    pub(crate) fn dispatch_released(&mut self, batch: &[PointerId]) {
        for (id, pointers) in self.group_by_gesture(batch) {
            if self.is_receiving(id) {
                self.gesture_released(id, &pointers);
            }
        }
        for pointer in batch {
            self.pointer_gestures.remove(pointer);
        }
    }

    pub(crate) fn dispatch_cancelled(&mut self, batch: &[PointerId]) {
        for (id, pointers) in self.group_by_gesture(batch) {
            if self.is_receiving(id) {
                self.gesture_cancelled(id, &pointers);
            }
        }
        for pointer in batch {
            self.pointer_gestures.remove(pointer);
        }
    }

    /// Run timers of every gesture that is tracking something.
    pub(crate) fn tick(&mut self) {
        let ids: Vec<GestureId> = self
            .gestures
            .iter()
            .filter(|(_, slot)| is_tracking(slot.gesture.state))
            .map(|(id, _)| id)
            .collect();
        for id in ids {
            if self.gesture(id).is_some_and(|g| is_tracking(g.state)) {
                self.with_recognizer(id, |recognizer, cx| recognizer.tick(cx));
            }
        }
    }

    fn is_receiving(&self, id: GestureId) -> bool {
        self.gesture(id).is_some_and(|g| !g.state.is_terminal())
    }

    fn group_by_gesture(&self, batch: &[PointerId]) -> Vec<(GestureId, Vec<PointerId>)> {
        let mut groups: Vec<(GestureId, Vec<PointerId>)> = Vec::new();
        for pointer in batch {
            let Some(gestures) = self.pointer_gestures.get(pointer) else {
                continue;
            };
            for id in gestures {
                match groups.iter_mut().find(|(g, _)| g == id) {
                    Some((_, pointers)) => pointers.push(*pointer),
                    None => groups.push((*id, vec![*pointer])),
                }
            }
        }
        groups
    }

    fn gesture_pressed(&mut self, id: GestureId, batch: &[PointerId]) {
        let Some(slot) = self.gestures.get_mut(id) else {
            return;
        };
        let gesture = &mut slot.gesture;
        gesture.num_state = gesture
            .limits
            .on_pressed(gesture.active_pointers.len(), batch.len());
        gesture.active_pointers.extend_from_slice(batch);
        if gesture.retained {
            for pointer in batch {
                self.pointers.retain(*pointer);
            }
        }
        self.with_recognizer(id, |recognizer, cx| recognizer.pointers_pressed(cx, batch));
    }

    fn gesture_updated(&mut self, id: GestureId, batch: &[PointerId]) {
        let Some(gesture) = self.gesture_mut(id) else {
            return;
        };
        gesture.num_state = gesture.limits.on_updated(gesture.active_pointers.len());
        self.with_recognizer(id, |recognizer, cx| recognizer.pointers_updated(cx, batch));
    }

    /// Remove `batch` from the tracked set, dropping claims on it.
    fn remove_pointers(&mut self, id: GestureId, batch: &[PointerId]) {
        let Some(slot) = self.gestures.get_mut(id) else {
            return;
        };
        let gesture = &mut slot.gesture;
        let removed: Vec<PointerId> = batch
            .iter()
            .copied()
            .filter(|pointer| gesture.active_pointers.contains(pointer))
            .collect();
        let old = gesture.active_pointers.len();
        gesture.active_pointers.retain(|pointer| !removed.contains(pointer));
        gesture.num_state = gesture.limits.on_released(old, removed.len());
        if gesture.retained {
            for pointer in &removed {
                self.pointers.release(*pointer);
            }
        }
    }

    fn gesture_released(&mut self, id: GestureId, batch: &[PointerId]) {
        self.remove_pointers(id, batch);
        self.with_recognizer(id, |recognizer, cx| {
            if cx.pointer_count() == 0
                && let Some(last) = batch.last().copied()
            {
                let (position, previous) = if recognizer.should_cache_pointer_position(cx, last) {
                    cx.pointer(last).map_or((INVALID_POSITION, INVALID_POSITION), |p| {
                        (p.position(), p.previous_position())
                    })
                } else {
                    (INVALID_POSITION, INVALID_POSITION)
                };
                if let Some(gesture) = cx.engine.gesture_mut(id) {
                    gesture.cached_position = position;
                    gesture.cached_previous_position = previous;
                }
            }
            recognizer.pointers_released(cx, batch);
        });
    }

    fn gesture_cancelled(&mut self, id: GestureId, batch: &[PointerId]) {
        self.remove_pointers(id, batch);
        if let Some(gesture) = self.gesture_mut(id)
            && gesture.active_pointers.is_empty()
        {
            gesture.cached_position = INVALID_POSITION;
            gesture.cached_previous_position = INVALID_POSITION;
        }
        self.with_recognizer(id, |recognizer, cx| recognizer.pointers_cancelled(cx, batch));
    }

    /// Report gestures still holding a pointer that is about to be retired.
    pub(crate) fn check_retired(&self, pointer: PointerId) {
        for (id, slot) in &self.gestures {
            let gesture = &slot.gesture;
            if !gesture.state.is_terminal() && gesture.active_pointers.contains(&pointer) {
                tracing::error!(
                    target: targets::DISPATCH,
                    gesture = ?id,
                    ?pointer,
                    "gesture still tracks a retired pointer"
                );
                debug_assert!(false, "gesture still tracks a retired pointer");
            }
        }
    }
}

fn is_tracking(state: GestureState) -> bool {
    matches!(
        state,
        GestureState::Possible | GestureState::Began | GestureState::Changed
    )
}

//! Cross-gesture arbitration.
//!
//! Arbitration decides two things:
//!
//! 1. Whether a gesture may leave Possible (begin or be recognized). A
//!    gesture that is already Began/Changed on the same branch of the
//!    hierarchy can veto it; a successful gesture in turn fails every
//!    Possible gesture it can prevent.
//! 2. Whether a freshly pressed pointer reaches a gesture at all. A gesture
//!    that some started gesture can prevent does not receive new pointers.
//!
//! "A can prevent B" is resolved in this order:
//!
//! - gestures declared friendly never prevent each other;
//! - the context-wide delegate may allow simultaneous recognition;
//! - A's own delegate, if any, decides for A;
//! - otherwise B's own delegate, if any, decides whether B yields;
//! - otherwise passive gestures (meta, press, release) neither prevent nor
//!   are prevented, and everything else prevents everything else.
//!
//! Delegate callbacks are host code. A panic inside one is caught, logged and
//! read as a refusal, so a faulty delegate cannot leave the frame half
//! processed.

use std::panic::{AssertUnwindSafe, catch_unwind};

use touch_lattice_core::logging::targets;
use touch_lattice_core::{GestureId, ObjectId, Pointer, PointerId};

use super::{Gesture, GestureCx, GestureState};
use crate::engine::Engine;

/// Host hooks that veto or allow recognition.
///
/// A delegate can be installed on the whole context and on individual
/// gestures. Both are consulted; either one refusing wins.
pub trait GestureDelegate: Send + Sync {
    /// Veto a gesture leaving Possible.
    fn should_begin(&self, _gesture: &Gesture) -> bool {
        true
    }

    /// Veto a pointer before it joins a gesture's tracked set.
    fn should_receive_pointer(&self, _gesture: &Gesture, _pointer: &Pointer) -> bool {
        true
    }

    /// Allow `gesture` and `other` to be recognized at the same time.
    fn should_recognize_simultaneously(&self, _gesture: &Gesture, _other: &Gesture) -> bool {
        false
    }
}

/// Run a delegate callback, reading a panic as `false`.
pub(crate) fn guarded(callback: &'static str, gesture: GestureId, f: impl FnOnce() -> bool) -> bool {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(answer) => answer,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            tracing::error!(
                target: targets::ARBITRATION,
                ?gesture,
                callback,
                %message,
                "gesture delegate panicked; treating as refusal"
            );
            false
        }
    }
}

impl Engine {
    /// Global and per-gesture `should_begin`.
    pub(crate) fn should_begin(&self, id: GestureId) -> bool {
        let Some(gesture) = self.gesture(id) else {
            return false;
        };
        if let Some(delegate) = &self.delegate
            && !guarded("should_begin", id, || delegate.should_begin(gesture))
        {
            return false;
        }
        match &gesture.delegate {
            Some(delegate) => guarded("should_begin", id, || delegate.should_begin(gesture)),
            None => true,
        }
    }

    /// Global, per-gesture and recognizer pointer filters.
    pub(crate) fn should_receive_pointer(&mut self, id: GestureId, pointer: PointerId) -> bool {
        {
            let (Some(gesture), Some(data)) = (self.gesture(id), self.pointers.get(pointer)) else {
                return false;
            };
            if let Some(delegate) = &self.delegate
                && !guarded("should_receive_pointer", id, || {
                    delegate.should_receive_pointer(gesture, data)
                })
            {
                return false;
            }
            if let Some(delegate) = &gesture.delegate
                && !guarded("should_receive_pointer", id, || {
                    delegate.should_receive_pointer(gesture, data)
                })
            {
                return false;
            }
        }
        self.with_recognizer(id, |recognizer, cx| {
            let cx: &GestureCx<'_> = cx;
            cx.pointer(pointer)
                .is_some_and(|data| recognizer.should_receive_pointer(cx, data))
        })
        .unwrap_or(false)
    }

    fn global_allows_simultaneous(&self, a: &Gesture, b: &Gesture) -> bool {
        match &self.delegate {
            Some(delegate) => guarded("should_recognize_simultaneously", a.id, || {
                delegate.should_recognize_simultaneously(a, b)
            }),
            None => false,
        }
    }

    /// Can `a`, being active, keep `b` from being recognized.
    pub(crate) fn can_prevent(&self, a: GestureId, b: GestureId) -> bool {
        let (Some(first), Some(second)) = (self.gesture(a), self.gesture(b)) else {
            return false;
        };
        if first.is_friendly_with(b) || second.is_friendly_with(a) {
            return false;
        }
        if self.global_allows_simultaneous(first, second) {
            return false;
        }
        can_prevent_gesture(first, second)
    }

    /// Is `id` kept from receiving new pointers by a started gesture on the
    /// branch of `target`.
    pub(crate) fn is_blocked_by_started(&self, id: GestureId, target: ObjectId) -> bool {
        self.gestures
            .iter()
            .filter(|(other, slot)| {
                *other != id
                    && slot.gesture.state.is_started()
                    && self.scene.same_branch(slot.gesture.object, target)
            })
            .any(|(other, _)| self.can_prevent(other, id))
    }

    /// Decide whether `id` may leave Possible, failing every Possible
    /// competitor it prevents when it may.
    pub(crate) fn recognize_if_not_prevented(&mut self, id: GestureId) -> bool {
        if !self.should_begin(id) {
            tracing::debug!(target: targets::ARBITRATION, gesture = ?id, "should_begin refused");
            return false;
        }
        let Some(object) = self.gesture(id).map(|g| g.object) else {
            return false;
        };

        let competitors: Vec<(GestureId, GestureState)> = self
            .gestures
            .iter()
            .filter(|(other, slot)| {
                *other != id
                    && matches!(
                        slot.gesture.state,
                        GestureState::Possible | GestureState::Began | GestureState::Changed
                    )
                    && self.scene.same_branch(slot.gesture.object, object)
            })
            .map(|(other, slot)| (other, slot.gesture.state))
            .collect();

        let mut to_fail = Vec::new();
        for (other, state) in competitors {
            if state.is_started() && self.can_prevent(other, id) {
                tracing::debug!(
                    target: targets::ARBITRATION,
                    gesture = ?id,
                    prevented_by = ?other,
                    "recognition prevented"
                );
                return false;
            }
            if state == GestureState::Possible && self.can_prevent(id, other) {
                to_fail.push(other);
            }
        }

        for other in to_fail {
            if self.gesture(other).is_some_and(|g| g.state == GestureState::Possible) {
                tracing::debug!(
                    target: targets::ARBITRATION,
                    gesture = ?id,
                    failing = ?other,
                    "failing prevented competitor"
                );
                self.set_state(other, GestureState::Failed);
            }
        }
        true
    }
}

/// A's side of the prevention question.
fn can_prevent_gesture(a: &Gesture, b: &Gesture) -> bool {
    match &a.delegate {
        Some(delegate) => !guarded("should_recognize_simultaneously", a.id, || {
            delegate.should_recognize_simultaneously(a, b)
        }),
        None if a.passive => false,
        None => can_be_prevented_by(b, a),
    }
}

/// B's side of the prevention question.
fn can_be_prevented_by(b: &Gesture, a: &Gesture) -> bool {
    match &b.delegate {
        Some(delegate) => !guarded("should_recognize_simultaneously", b.id, || {
            delegate.should_recognize_simultaneously(b, a)
        }),
        None => !b.passive,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Simultaneous;

    impl GestureDelegate for Simultaneous {
        fn should_recognize_simultaneously(&self, _: &Gesture, _: &Gesture) -> bool {
            true
        }
    }

    struct Panicking;

    impl GestureDelegate for Panicking {
        fn should_recognize_simultaneously(&self, _: &Gesture, _: &Gesture) -> bool {
            panic!("delegate blew up")
        }
    }

    fn record(passive: bool) -> Gesture {
        Gesture::new(GestureId::default(), ObjectId::default(), "test", passive)
    }

    // =========================================================================
    // Prevention rules
    // =========================================================================

    #[test]
    fn test_active_gestures_prevent_each_other() {
        let a = record(false);
        let b = record(false);
        assert!(can_prevent_gesture(&a, &b));
        assert!(can_prevent_gesture(&b, &a));
    }

    #[test]
    fn test_passive_gestures_stay_out() {
        let active = record(false);
        let passive = record(true);
        assert!(!can_prevent_gesture(&passive, &active));
        assert!(!can_prevent_gesture(&active, &passive));
    }

    #[test]
    fn test_delegate_overrides_passivity() {
        let mut passive = record(true);
        passive.delegate = Some(Arc::new(Panicking));
        let active = record(false);
        // A panicking delegate refuses simultaneity, so the passive gesture prevents.
        assert!(can_prevent_gesture(&passive, &active));
    }

    #[test]
    fn test_delegate_allows_simultaneous() {
        let mut a = record(false);
        a.delegate = Some(Arc::new(Simultaneous));
        let b = record(false);
        assert!(!can_prevent_gesture(&a, &b));
        // B has no delegate, so A's delegate decides whether A yields.
        assert!(!can_prevent_gesture(&b, &a));
    }

    #[test]
    fn test_guarded_reads_panic_as_refusal() {
        assert!(guarded("test", GestureId::default(), || true));
        assert!(!guarded("test", GestureId::default(), || panic!("nope")));
    }
}

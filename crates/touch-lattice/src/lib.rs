//! Touch Lattice - multi-pointer gesture recognition and arbitration.
//!
//! The engine turns raw pointer input into recognized gestures:
//!
//! - **Frame driver**: [`TouchContext`] buffers pointer input and delivers it
//!   once per frame as pressed, updated, released and cancelled batches
//! - **Scene**: a parent/child hierarchy of objects plus a host-supplied
//!   [`HitTester`](scene::HitTester) that decides what lies under a pointer
//! - **Gestures**: a shared state machine driven by pluggable
//!   [`Recognizer`](gesture::Recognizer)s (tap, long press, press, release,
//!   flick, meta and the transform family)
//! - **Arbitration**: friendliness, delegates and passivity decide which of
//!   several competing gestures wins
//!
//! The leaf types (pointers, signals, geometry, configuration) live in
//! [`touch_lattice_core`] and are re-exported here.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::time::{Duration, Instant};
//!
//! use glam::Vec2;
//! use touch_lattice::prelude::*;
//!
//! let mut ctx = TouchContext::new(TouchConfig::default(), |_: &Pointer, _: ObjectId| {
//!     HitResult::Hit(HitData::default())
//! })?;
//! let card = ctx.create_object(None)?;
//! let pan_config = ctx.config().gestures.transform.clone();
//! let pan = ctx.attach(card, Transform::pan(pan_config)?)?;
//!
//! let moved = Arc::new(AtomicU32::new(0));
//! let counter = moved.clone();
//! ctx.recognizer::<Transform>(pan)
//!     .expect("pan is a transform")
//!     .transformed()
//!     .connect(move |_| {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     });
//!
//! let mut now = Instant::now();
//! let finger = ctx.begin_pointer(Vec2::ZERO, PointerInit::touch(InputSourceId::default()));
//! ctx.process_frame(now);
//! for x in 1..=40 {
//!     now += Duration::from_millis(16);
//!     ctx.move_pointer(finger, Vec2::new(x as f32 * 2.0, 0.0));
//!     ctx.process_frame(now);
//! }
//! assert!(moved.load(Ordering::SeqCst) > 0);
//! # Ok::<(), touch_lattice::Error>(())
//! ```

pub mod context;
mod engine;
pub mod flick;
pub mod gesture;
pub mod long_press;
pub mod meta;
pub mod press;
pub mod release;
pub mod scene;
pub mod tap;
pub mod transform;

pub use touch_lattice_core::*;

pub use context::TouchContext;
pub use gesture::{
    Gesture, GestureCx, GestureDelegate, GestureState, PointerLimits, PointersNumState,
    Recognizer, StateChange,
};
pub use scene::{HitResult, HitTester, Scene};

/// Everything needed to set up a context and attach the stock gestures.
pub mod prelude {
    pub use crate::context::TouchContext;
    pub use crate::flick::{Flick, FlickEvent};
    pub use crate::gesture::{
        Gesture, GestureDelegate, GestureState, PointerLimits, Recognizer, StateChange,
    };
    pub use crate::long_press::LongPress;
    pub use crate::meta::{Meta, MetaEvent};
    pub use crate::press::Press;
    pub use crate::release::Release;
    pub use crate::scene::{HitResult, HitTester};
    pub use crate::tap::{Tap, TapEvent};
    pub use crate::transform::{Transform, TransformDelta, TransformSpace};
    pub use touch_lattice_core::{
        FlickDirection, GestureId, HitData, InputSourceId, ObjectId, Pointer, PointerId,
        PointerInit, TouchConfig, TransformTypes,
    };
}

static_assertions::assert_impl_all!(TouchContext: Send);

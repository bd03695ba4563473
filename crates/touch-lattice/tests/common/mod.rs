//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec2;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use touch_lattice::prelude::*;
use touch_lattice::{Signal, StateChange};

/// One frame at 60 Hz.
pub const FRAME: Duration = Duration::from_millis(16);

/// Route engine logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A context whose every object is hit everywhere.
pub fn context(dots_per_centimeter: f32) -> TouchContext {
    init_tracing();
    let config = TouchConfig::with_dots_per_centimeter(dots_per_centimeter)
        .expect("valid density");
    TouchContext::new(config, |_: &Pointer, _: ObjectId| {
        HitResult::Hit(HitData::default())
    })
    .expect("valid config")
}

/// Deterministic frame clock.
pub struct Clock {
    pub now: Instant,
}

impl Clock {
    pub fn new() -> Self {
        Self { now: Instant::now() }
    }

    /// Advance by one frame and process it.
    pub fn step(&mut self, ctx: &mut TouchContext) {
        self.advance(ctx, FRAME);
    }

    pub fn advance(&mut self, ctx: &mut TouchContext, by: Duration) {
        self.now += by;
        ctx.process_frame(self.now);
    }
}

/// Collects every emission of a signal.
pub struct Recorder<T> {
    events: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> Recorder<T> {
    pub fn attach(signal: &Signal<T>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        signal.connect(move |event: &T| sink.lock().push(event.clone()));
        Self { events }
    }

    pub fn events(&self) -> Vec<T> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}

/// Record the state transitions of a gesture.
pub fn record_states(ctx: &TouchContext, gesture: GestureId) -> Recorder<StateChange> {
    Recorder::attach(ctx.gesture(gesture).expect("gesture exists").state_changed())
}

/// Current states of a recorded gesture, in order.
pub fn states(recorder: &Recorder<StateChange>) -> Vec<GestureState> {
    recorder.events().into_iter().map(|change| change.current).collect()
}

pub fn touch(ctx: &mut TouchContext, x: f32, y: f32) -> PointerId {
    ctx.begin_pointer(Vec2::new(x, y), PointerInit::touch(InputSourceId::default()))
}

pub fn state(ctx: &TouchContext, gesture: GestureId) -> GestureState {
    ctx.gesture(gesture).expect("gesture exists").state()
}

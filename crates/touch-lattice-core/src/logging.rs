//! Logging and tracing facilities for Touch Lattice.
//!
//! This module provides:
//! - Integration with the `tracing` crate for structured logging
//! - Target and span names for filtering individual subsystems
//! - Performance tracing hooks for profiling a frame
//!
//! # Tracing Integration
//!
//! Touch Lattice uses the `tracing` crate for instrumentation. To see logs,
//! install a tracing subscriber in your application:
//!
//! ```ignore
//! use tracing_subscriber::EnvFilter;
//!
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter(EnvFilter::new("touch_lattice::gesture=debug"))
//!         .init();
//!
//!     // Drive your TouchContext...
//! }
//! ```

/// Span names used throughout Touch Lattice for tracing.
///
/// These constants can be used to filter traces for specific subsystems.
pub mod span_names {
    /// One full frame tick of the pointer dispatcher.
    pub const FRAME: &str = "touch_lattice::frame";
    /// Delivery of one pointer batch (began, moved, ended or cancelled).
    pub const BATCH: &str = "touch_lattice::batch";
    /// Lazy recomputation of pointer clusters.
    pub const CLUSTER: &str = "touch_lattice::cluster";
    /// Signal emission span.
    pub const SIGNAL: &str = "touch_lattice::signal";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core framework target.
    pub const CORE: &str = "touch_lattice_core";
    /// Signal system target.
    pub const SIGNAL: &str = "touch_lattice_core::signal";
    /// Pointer table target.
    pub const POINTER: &str = "touch_lattice_core::pointer";
    /// Clustering target.
    pub const CLUSTER: &str = "touch_lattice_core::cluster";
    /// Configuration loading target.
    pub const CONFIG: &str = "touch_lattice_core::config";
    /// Pointer dispatch / frame driver target.
    pub const DISPATCH: &str = "touch_lattice::dispatch";
    /// Gesture state machine target.
    pub const GESTURE: &str = "touch_lattice::gesture";
    /// Arbitration (delegates, prevention) target.
    pub const ARBITRATION: &str = "touch_lattice::arbitration";
    /// Performance spans target.
    pub const PERF: &str = "touch_lattice::perf";
}

/// RAII guard for performance tracing.
///
/// Creates a tracing span when constructed and closes it when dropped.
///
/// # Example
///
/// ```
/// use touch_lattice_core::logging::{span_names, PerfSpan};
///
/// {
///     let _span = PerfSpan::new(span_names::FRAME);
///     // ... work measured under the span ...
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "touch_lattice::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }

    /// Create a performance span tagged with a frame number.
    pub fn with_frame(name: &'static str, frame: u64) -> Self {
        let span =
            tracing::info_span!(target: "touch_lattice::perf", "perf", operation = name, frame);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are re-exported for convenience but are just wrappers around
/// the `tracing` crate macros with consistent target naming.
#[macro_export]
macro_rules! touch_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "touch_lattice_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! touch_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "touch_lattice_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! touch_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "touch_lattice_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! touch_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "touch_lattice_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! touch_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "touch_lattice_core", $($arg)*)
    };
}

//! Core systems for Touch Lattice.
//!
//! This crate provides the leaf layer the gesture engine is built on:
//!
//! - **Pointer Model**: Live contacts, their position history and gesture claims
//! - **Clustering**: Reducing many pointers to one or two stable centroids
//! - **Geometry**: Point/line math and screen/world projection
//! - **Signal/Slot System**: Synchronous observer lists for every notification
//! - **Configuration**: Context and per-gesture settings with TOML/JSON loading
//!
//! # Signal/Slot Example
//!
//! ```
//! use touch_lattice_core::Signal;
//!
//! let long_pressed = Signal::<()>::new();
//! let conn_id = long_pressed.connect(|_| {
//!     println!("held!");
//! });
//!
//! long_pressed.emit(());
//! long_pressed.disconnect(conn_id);
//! ```
//!
//! # Pointer Table Example
//!
//! ```
//! use glam::Vec2;
//! use touch_lattice_core::{InputSourceId, PointerInit, PointerTable};
//!
//! let mut table = PointerTable::new();
//! let id = table.create(Vec2::new(10.0, 20.0), PointerInit::touch(InputSourceId::default()));
//!
//! table.buffer_position(id, Vec2::new(15.0, 20.0));
//! table.commit_position(id);
//! assert_eq!(table.get(id).unwrap().previous_position(), Vec2::new(10.0, 20.0));
//! ```

pub mod cluster;
pub mod config;
mod error;
pub mod geometry;
pub mod logging;
pub mod object;
pub mod pointer;
pub mod signal;
pub mod timed;

pub use cluster::{Cluster, Clusters2D};
pub use config::{FlickDirection, TouchConfig, TransformTypes};
pub use error::{Error, Result};
pub use geometry::{INVALID_POSITION, Plane, ProjectionParams, is_invalid_position};
pub use logging::PerfSpan;
pub use object::{GestureId, ObjectId};
pub use pointer::{
    HitData, InputSourceId, Pointer, PointerButtons, PointerFlags, PointerHit, PointerId,
    PointerInit, PointerKind, PointerTable, Tags,
};
pub use signal::{ConnectionId, Signal};
pub use timed::TimedSequence;

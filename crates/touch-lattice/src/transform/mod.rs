//! Transform gestures: pan, rotate, scale and their combinations.
//!
//! One recognizer covers the whole family. Three independent choices shape
//! what it reports:
//!
//! - **Components**: [`TransformConfig::types`] selects translation, rotation
//!   and scaling. [`Transform::pan`], [`Transform::rotate`] and
//!   [`Transform::scale`] are presets.
//! - **Space**: [`TransformSpace::Screen`] reports pixel deltas,
//!   [`TransformSpace::Plane`] projects pointers onto a world plane through
//!   the object and reports world deltas.
//! - **Reference points**: the first two pointers, or with
//!   [`Transform::clustered`] the centroids of two spatial clusters of every
//!   pointer. A [`Transform::pinned`] transform instead rotates and scales a
//!   single point around the object's own position.
//!
//! Nothing is reported until accumulated movement passes
//! [`TransformConfig::screen_transform_threshold_cm`]. The frame that crosses
//! it reports only the movement past the threshold.

mod clustered;
mod pinned;
mod plane;
mod screen;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use touch_lattice_core::cluster::Clusters2D;
use touch_lattice_core::config::{TransformConfig, TransformTypes};
use touch_lattice_core::geometry::{Plane, ProjectionParams, point_to_line_distance2};
use touch_lattice_core::logging::targets;
use touch_lattice_core::{PointerId, Result, Signal};

use crate::gesture::{GestureCx, GestureState, PointersNumState, Recognizer};

use clustered::{PointSource, TrackedPoint};
use plane::PlaneProjector;

/// Space transform deltas are reported in.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformSpace {
    /// Pixels and screen-space degrees.
    #[default]
    Screen,
    /// World units on a plane through the object.
    ///
    /// Without an explicit normal the plane faces along the hit normal of the
    /// first pointer, or the viewer if the hit carries none.
    Plane { normal: Option<Vec3> },
}

/// One frame's worth of transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformDelta {
    /// Translation, with `z = 0` in screen space.
    pub position: Vec3,
    /// Rotation in degrees.
    pub rotation: f32,
    /// Scale factor, 1 for none.
    pub scale: f32,
    /// Components that changed this frame.
    pub types: TransformTypes,
}

impl Default for TransformDelta {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: 0.0,
            scale: 1.0,
            types: TransformTypes::NONE,
        }
    }
}

/// Threshold accumulators, reset whenever the gesture goes back to Idle.
#[derive(Debug, Clone, Copy)]
struct Buffers {
    translation: Vec2,
    rotation: f32,
    angle: f32,
    scaling: f32,
    scale: f32,
}

impl Default for Buffers {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            rotation: 0.0,
            angle: 0.0,
            scaling: 0.0,
            scale: 1.0,
        }
    }
}

/// Continuous translate/rotate/scale recognizer.
pub struct Transform {
    config: TransformConfig,
    space: TransformSpace,
    source: PointSource,
    pinned: bool,
    plane: Plane,
    transforming: bool,
    buffers: Buffers,
    delta: TransformDelta,
    transform_started: Signal<()>,
    transformed: Signal<TransformDelta>,
    transform_completed: Signal<()>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::with_valid_config(TransformConfig::default())
    }
}

impl Transform {
    /// Free transform reporting the components in `config.types`.
    pub fn new(config: TransformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    /// Translation only.
    pub fn pan(config: TransformConfig) -> Result<Self> {
        Self::new(TransformConfig {
            types: TransformTypes::TRANSLATION,
            ..config
        })
    }

    /// Rotation only.
    pub fn rotate(config: TransformConfig) -> Result<Self> {
        Self::new(TransformConfig {
            types: TransformTypes::ROTATION,
            ..config
        })
    }

    /// Scaling only.
    pub fn scale(config: TransformConfig) -> Result<Self> {
        Self::new(TransformConfig {
            types: TransformTypes::SCALING,
            ..config
        })
    }

    /// Rotate and scale one point around the object's position. Translation
    /// is never reported.
    pub fn pinned(config: TransformConfig) -> Result<Self> {
        let mut transform = Self::new(config)?;
        transform.pinned = true;
        Ok(transform)
    }

    /// Use cluster centroids of all pointers as reference points.
    pub fn clustered(mut self) -> Self {
        self.source = PointSource::Clustered(Clusters2D::new());
        self
    }

    /// Report deltas in `space`.
    pub fn in_space(mut self, space: TransformSpace) -> Self {
        self.space = space;
        self
    }

    fn with_valid_config(config: TransformConfig) -> Self {
        Self {
            config,
            space: TransformSpace::Screen,
            source: PointSource::FirstTwo,
            pinned: false,
            plane: Plane::SCREEN,
            transforming: false,
            buffers: Buffers::default(),
            delta: TransformDelta::default(),
            transform_started: Signal::new(),
            transformed: Signal::new(),
            transform_completed: Signal::new(),
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn space(&self) -> TransformSpace {
        self.space
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn is_clustered(&self) -> bool {
        self.source.is_clustered()
    }

    /// Plane deltas are measured on, fixed when the first pointers land.
    pub fn plane(&self) -> Plane {
        self.plane
    }

    /// True once the threshold has been crossed in the current gesture.
    pub fn is_transforming(&self) -> bool {
        self.transforming
    }

    /// Delta reported by the last [`Transform::transformed`] emission.
    pub fn last_delta(&self) -> TransformDelta {
        self.delta
    }

    /// Emitted when the gesture begins.
    pub fn transform_started(&self) -> &Signal<()> {
        &self.transform_started
    }

    /// Emitted with every non-empty delta.
    pub fn transformed(&self) -> &Signal<TransformDelta> {
        &self.transformed
    }

    /// Emitted when the last pointer lifts after the gesture began.
    pub fn transform_completed(&self) -> &Signal<()> {
        &self.transform_completed
    }

    fn types(&self) -> TransformTypes {
        if self.pinned {
            // Pinned transforms have nothing to translate.
            let mut types = TransformTypes::NONE;
            for component in [TransformTypes::ROTATION, TransformTypes::SCALING] {
                if self.config.types.has(component) {
                    types |= component;
                }
            }
            types
        } else {
            self.config.types
        }
    }

    fn threshold_px(&self, cx: &GestureCx<'_>) -> f32 {
        cx.cm_to_px(self.config.screen_transform_threshold_cm)
    }

    fn projector(&self, params: ProjectionParams) -> Option<PlaneProjector> {
        match self.space {
            TransformSpace::Screen => None,
            TransformSpace::Plane { .. } => Some(PlaneProjector::new(self.plane, params)),
        }
    }

    fn update_plane(&mut self, cx: &mut GestureCx<'_>) {
        let TransformSpace::Plane { normal } = self.space else {
            return;
        };
        let first = cx.active_pointers().first().copied();
        let normal = match (normal, first) {
            (Some(normal), _) => normal,
            (None, Some(pointer)) => cx
                .pointer_hit(pointer)
                .map_or(Plane::SCREEN.normal, |hit| hit.data.normal),
            (None, None) => Plane::SCREEN.normal,
        };
        self.plane = Plane::from_normal_and_point(normal, cx.world_position());
    }

    fn rotation(&self, params: ProjectionParams, old: [Vec2; 2], new: [Vec2; 2]) -> f32 {
        match self.projector(params) {
            None => screen::rotation(old[0], old[1], new[0], new[1]),
            Some(projector) => projector.rotation(old[0], old[1], new[0], new[1]),
        }
    }

    fn scaling(&self, params: ProjectionParams, old: [Vec2; 2], new: [Vec2; 2]) -> f32 {
        match self.projector(params) {
            None => screen::scaling(old[0], old[1], new[0], new[1]),
            Some(projector) => projector.scaling(old[0], old[1], new[0], new[1]),
        }
    }

    fn translation(&self, params: ProjectionParams, old: Vec2, new: Vec2) -> Vec3 {
        match self.projector(params) {
            None => (new - old).extend(0.0),
            Some(projector) => projector.translation(old, new),
        }
    }

    /// Translate a single point, holding back until the threshold is crossed.
    fn one_point_translation(
        &mut self,
        cx: &GestureCx<'_>,
        params: ProjectionParams,
        point: TrackedPoint,
    ) -> Vec3 {
        if self.transforming {
            return self.translation(params, point.old, point.new);
        }
        self.buffers.translation += point.new - point.old;
        let threshold = self.threshold_px(cx);
        let buffer = self.buffers.translation;
        if buffer.length_squared() <= threshold * threshold {
            return Vec3::ZERO;
        }
        self.transforming = true;
        let excess = buffer - buffer.normalize_or_zero() * threshold;
        self.translation(params, point.new - excess, point.new)
    }

    fn two_point_translation(
        &self,
        cx: &GestureCx<'_>,
        params: ProjectionParams,
        old: [Vec2; 2],
        new1: Vec2,
        degrees: f32,
        scale: f32,
    ) -> Vec3 {
        match self.projector(params) {
            None => screen::two_point_translation(old[0], old[1], new1, degrees, scale).extend(0.0),
            Some(projector) => {
                projector.two_point_translation(cx.world_position(), old[0], new1, degrees, scale)
            }
        }
    }

    /// Free transform from one or two reference points.
    fn update_free(&mut self, cx: &mut GestureCx<'_>, moved: &[PointerId]) -> TransformDelta {
        let mut delta = TransformDelta::default();
        let types = self.types();
        let translate = types.has(TransformTypes::TRANSLATION);
        let rotate = types.has(TransformTypes::ROTATION);
        let scale = types.has(TransformTypes::SCALING);

        let min_distance = cx.cm_to_px(self.config.min_screen_points_distance_cm);
        let count = self.source.count(cx, min_distance);
        if count == 0 {
            return delta;
        }
        let Some(params) = cx.active_pointers().first().map(|p| cx.projection_params(*p)) else {
            return delta;
        };

        if count == 1 || (!rotate && !scale) {
            if translate && self.source.is_relevant(cx, moved, 0) {
                let point = self.source.point(cx, 0);
                delta.position = self.one_point_translation(cx, params, point);
            }
            return delta;
        }

        if !self.source.is_relevant(cx, moved, 0) && !self.source.is_relevant(cx, moved, 1) {
            return delta;
        }
        let first = self.source.point(cx, 0);
        let second = self.source.point(cx, 1);
        let old = [first.old, second.old];
        let new = [first.new, second.new];

        if (new[1] - new[0]).length_squared() <= min_distance * min_distance {
            if translate {
                delta.position = self.one_point_translation(cx, params, first);
            }
            return delta;
        }

        let threshold = self.threshold_px(cx);
        if rotate {
            if self.transforming {
                delta.rotation = self.rotation(params, old, new);
            } else {
                let (d1, d2) = point_to_line_distance2(old[0], old[1], new[0], new[1]);
                self.buffers.rotation += d1 - d2;
                self.buffers.angle += self.rotation(params, old, new);
                if self.buffers.rotation * self.buffers.rotation >= threshold * threshold {
                    self.transforming = true;
                    delta.rotation = self.buffers.angle;
                }
            }
        }
        if scale {
            if self.transforming {
                delta.scale *= self.scaling(params, old, new);
            } else {
                self.buffers.scaling += (new[1] - new[0]).length() - (old[1] - old[0]).length();
                self.buffers.scale *= self.scaling(params, old, new);
                if self.buffers.scaling * self.buffers.scaling >= threshold * threshold {
                    self.transforming = true;
                    delta.scale = self.buffers.scale;
                }
            }
        }
        if translate {
            delta.position = if delta.rotation == 0.0 && delta.scale == 1.0 {
                self.one_point_translation(cx, params, first)
            } else {
                self.two_point_translation(cx, params, old, new[0], delta.rotation, delta.scale)
            };
        }
        delta
    }

    /// Move to Began/Changed for a delta with at least one component.
    fn apply(&mut self, cx: &mut GestureCx<'_>, mut delta: TransformDelta) {
        if delta.position != Vec3::ZERO {
            delta.types |= TransformTypes::TRANSLATION;
        }
        if delta.rotation != 0.0 {
            delta.types |= TransformTypes::ROTATION;
        }
        if delta.scale != 1.0 {
            delta.types |= TransformTypes::SCALING;
        }
        if delta.types.is_empty() {
            return;
        }
        if cx.state() == GestureState::Possible {
            cx.set_state(GestureState::Began);
        }
        if cx.state().is_started() {
            self.delta = delta;
            cx.set_state(GestureState::Changed);
        }
    }
}

impl Recognizer for Transform {
    fn kind(&self) -> &'static str {
        if self.pinned { "pinned_transform" } else { "transform" }
    }

    fn pointers_pressed(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        self.source.add(pointers);
        match cx.pointers_num_state() {
            PointersNumState::PassedMaxThreshold | PointersNumState::PassedMinMaxThreshold => {
                if cx.state().is_started() {
                    cx.set_state(GestureState::ENDED);
                }
            }
            PointersNumState::PassedMinThreshold => {
                if cx.pointer_count() == pointers.len() {
                    self.update_plane(cx);
                }
                if cx.state() == GestureState::Idle {
                    cx.set_state(GestureState::Possible);
                }
            }
            _ => {}
        }
    }

    fn pointers_updated(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        self.source.moved(pointers);
        if cx.pointers_num_state() != PointersNumState::InRange {
            return;
        }
        let delta = if self.pinned {
            self.update_pinned(cx, pointers)
        } else {
            self.update_free(cx, pointers)
        };
        self.apply(cx, delta);
    }

    fn pointers_released(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        self.source.remove(pointers);
        if cx.pointers_num_state() == PointersNumState::PassedMinThreshold {
            if cx.state().is_started() {
                cx.set_state(GestureState::ENDED);
            } else if cx.state() == GestureState::Possible {
                cx.set_state(GestureState::Idle);
            }
        }
    }

    fn pointers_cancelled(&mut self, cx: &mut GestureCx<'_>, pointers: &[PointerId]) {
        self.source.remove(pointers);
        cx.cancel_if_pointers_lost();
    }

    fn state_entered(&mut self, cx: &mut GestureCx<'_>, state: GestureState) {
        match state {
            GestureState::Idle => {
                self.transforming = false;
                self.buffers = Buffers::default();
            }
            GestureState::Began => {
                tracing::debug!(target: targets::GESTURE, gesture = ?cx.id(), "transform began");
                self.transform_started.emit(());
            }
            GestureState::Changed => self.transformed.emit(self.delta),
            GestureState::Recognized => self.transform_completed.emit(()),
            _ => {}
        }
    }

    fn reset(&mut self) {
        self.transforming = false;
        self.buffers = Buffers::default();
        self.delta = TransformDelta::default();
        self.source.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_select_components() {
        let config = TransformConfig::default();
        assert_eq!(
            Transform::pan(config.clone()).map(|t| t.config().types).ok(),
            Some(TransformTypes::TRANSLATION)
        );
        assert_eq!(
            Transform::rotate(config.clone()).map(|t| t.config().types).ok(),
            Some(TransformTypes::ROTATION)
        );
        assert_eq!(
            Transform::scale(config).map(|t| t.config().types).ok(),
            Some(TransformTypes::SCALING)
        );
    }

    #[test]
    fn test_pinned_never_translates() {
        let transform = Transform::pinned(TransformConfig::default()).unwrap();
        assert!(transform.is_pinned());
        assert_eq!(
            transform.types(),
            TransformTypes::ROTATION | TransformTypes::SCALING
        );
        assert_eq!(transform.kind(), "pinned_transform");
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = TransformConfig {
            screen_transform_threshold_cm: -1.0,
            ..TransformConfig::default()
        };
        assert!(Transform::new(config).is_err());
    }

    #[test]
    fn test_builders() {
        let transform = Transform::default()
            .clustered()
            .in_space(TransformSpace::Plane { normal: Some(Vec3::Y) });
        assert!(transform.is_clustered());
        assert_eq!(transform.space(), TransformSpace::Plane { normal: Some(Vec3::Y) });
    }

    #[test]
    fn test_reset_clears_buffers() {
        let mut transform = Transform::default();
        transform.transforming = true;
        transform.buffers.translation = Vec2::new(3.0, 0.0);
        transform.buffers.scale = 2.0;
        transform.reset();
        assert!(!transform.is_transforming());
        assert_eq!(transform.buffers.translation, Vec2::ZERO);
        assert_eq!(transform.buffers.scale, 1.0);
        assert_eq!(transform.last_delta(), TransformDelta::default());
    }
}

//! Rotation and scaling of a single point around the object's position.

use touch_lattice_core::config::TransformTypes;
use touch_lattice_core::geometry::point_to_line_distance;
use touch_lattice_core::PointerId;

use crate::gesture::GestureCx;

use super::{Transform, TransformDelta, screen};

impl Transform {
    pub(super) fn update_pinned(&mut self, cx: &mut GestureCx<'_>, moved: &[PointerId]) -> TransformDelta {
        let mut delta = TransformDelta::default();
        let types = self.types();
        let rotate = types.has(TransformTypes::ROTATION);
        let scale = types.has(TransformTypes::SCALING);
        if !rotate && !scale {
            return delta;
        }
        if cx.pointer_count() == 0 || !self.source.is_relevant(cx, moved, 0) {
            return delta;
        }
        let Some(params) = cx.active_pointers().first().map(|p| cx.projection_params(*p)) else {
            return delta;
        };

        let world_center = cx.world_position();
        let screen_center = params.project_from(world_center);
        let point = self.source.single_point(cx);
        let projector = self.projector(params);
        let threshold = self.threshold_px(cx);

        let rotation = || match projector {
            None => screen::rotation(screen_center, point.old, screen_center, point.new),
            Some(projector) => projector.rotation_around(world_center, point.old, point.new),
        };
        let scaling = || match projector {
            None => screen::scaling(screen_center, point.old, screen_center, point.new),
            Some(projector) => projector.scaling_around(world_center, point.old, point.new),
        };

        if rotate {
            if self.transforming {
                delta.rotation = rotation();
            } else {
                self.buffers.rotation += point_to_line_distance(screen_center, point.old, point.new);
                self.buffers.angle += rotation();
                if self.buffers.rotation * self.buffers.rotation >= threshold * threshold {
                    self.transforming = true;
                    delta.rotation = self.buffers.angle;
                }
            }
        }
        if scale {
            if self.transforming {
                delta.scale = scaling();
            } else {
                self.buffers.scaling += (point.new - screen_center).length()
                    - (point.old - screen_center).length();
                self.buffers.scale *= scaling();
                if self.buffers.scaling * self.buffers.scaling >= threshold * threshold {
                    self.transforming = true;
                    delta.scale = self.buffers.scale;
                }
            }
        }
        delta
    }
}

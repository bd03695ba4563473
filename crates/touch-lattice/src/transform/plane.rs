//! World-space delta math on a transform plane.
//!
//! Screen positions are projected onto the plane before comparing them, so
//! translations come out in world units and rotations are signed around the
//! plane normal.

use glam::{Quat, Vec2, Vec3};

use touch_lattice_core::geometry::{Plane, ProjectionParams, angle_between};

use super::screen::ratio;

/// A plane together with the projection of the pointer that drives it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PlaneProjector {
    pub plane: Plane,
    pub params: ProjectionParams,
}

impl PlaneProjector {
    pub(crate) fn new(plane: Plane, params: ProjectionParams) -> Self {
        Self { plane, params }
    }

    pub(crate) fn project(&self, screen: Vec2) -> Vec3 {
        self.params.project_to(screen, &self.plane)
    }

    /// Angle from `from` to `to`, negative when turning clockwise around the normal.
    pub(crate) fn signed_angle(&self, from: Vec3, to: Vec3) -> f32 {
        let angle = angle_between(from, to);
        if from.cross(to).dot(self.plane.normal) < 0.0 {
            -angle
        } else {
            angle
        }
    }

    pub(crate) fn rotation(&self, old1: Vec2, old2: Vec2, new1: Vec2, new2: Vec2) -> f32 {
        let old = self.project(old2) - self.project(old1);
        let new = self.project(new2) - self.project(new1);
        self.signed_angle(old, new)
    }

    pub(crate) fn scaling(&self, old1: Vec2, old2: Vec2, new1: Vec2, new2: Vec2) -> f32 {
        let old = self.project(old2) - self.project(old1);
        let new = self.project(new2) - self.project(new1);
        ratio(new.length(), old.length())
    }

    pub(crate) fn translation(&self, old: Vec2, new: Vec2) -> Vec3 {
        self.project(new) - self.project(old)
    }

    /// Translation of the first point after rotating and scaling its old
    /// projection about `pivot`.
    pub(crate) fn two_point_translation(
        &self,
        pivot: Vec3,
        old1: Vec2,
        new1: Vec2,
        degrees: f32,
        scale: f32,
    ) -> Vec3 {
        let rotation = Quat::from_axis_angle(self.plane.normal, degrees.to_radians());
        let moved = pivot + rotation * (self.project(old1) - pivot) * scale;
        self.project(new1) - moved
    }

    /// Rotation of a single point around a fixed world center.
    pub(crate) fn rotation_around(&self, center: Vec3, old: Vec2, new: Vec2) -> f32 {
        self.signed_angle(self.project(old) - center, self.project(new) - center)
    }

    /// Distance ratio of a single point to a fixed world center.
    pub(crate) fn scaling_around(&self, center: Vec3, old: Vec2, new: Vec2) -> f32 {
        ratio(
            (self.project(new) - center).length(),
            (self.project(old) - center).length(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    fn facing_viewer() -> PlaneProjector {
        PlaneProjector::new(
            Plane::from_normal_and_point(Vec3::Z, Vec3::ZERO),
            ProjectionParams::Screen,
        )
    }

    #[test]
    fn test_translation_in_world_units() {
        let projector = facing_viewer();
        let delta = projector.translation(Vec2::new(1.0, 1.0), Vec2::new(4.0, 5.0));
        assert!(approx(delta.x, 3.0) && approx(delta.y, 4.0) && approx(delta.z, 0.0));
    }

    #[test]
    fn test_rotation_sign_follows_normal() {
        let up = facing_viewer();
        let down = PlaneProjector::new(Plane::SCREEN, ProjectionParams::Screen);
        let args = (
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            Vec2::ZERO,
            Vec2::new(100.0, 100.0),
        );
        assert!(approx(up.rotation(args.0, args.1, args.2, args.3), 45.0));
        assert!(approx(down.rotation(args.0, args.1, args.2, args.3), -45.0));
    }

    #[test]
    fn test_scaling_around_center() {
        let projector = facing_viewer();
        let scale = projector.scaling_around(Vec3::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 30.0));
        assert!(approx(scale, 3.0));
        let angle = projector.rotation_around(Vec3::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 30.0));
        assert!(approx(angle, 90.0));
    }

    #[test]
    fn test_two_point_translation_cancels_rotation() {
        let projector = facing_viewer();
        // Rotating (10, 0) by 90 degrees about the origin lands on (0, 10).
        let delta = projector.two_point_translation(
            Vec3::ZERO,
            Vec2::new(10.0, 0.0),
            Vec2::new(0.0, 10.0),
            90.0,
            1.0,
        );
        assert!(delta.length() < 1e-3);
    }
}

//! Screen-space geometry and screen/world projection.
//!
//! Screen positions are [`glam::Vec2`] in pixels. World positions are
//! [`glam::Vec3`]. All helpers here are pure functions.

use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use serde::{Deserialize, Serialize};

/// Sentinel for "no position", e.g. a gesture holding zero pointers whose
/// last pointer was released outside its target.
pub const INVALID_POSITION: Vec2 = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);

/// Returns true if `position` is the [`INVALID_POSITION`] sentinel.
#[inline]
pub fn is_invalid_position(position: Vec2) -> bool {
    position.x == f32::NEG_INFINITY && position.y == f32::NEG_INFINITY
}

/// Signed distance from `point` to the infinite line through `a` and `b`.
///
/// The sign tells which side of the directed line `a -> b` the point is on.
/// Returns 0 when `a` and `b` coincide.
pub fn point_to_line_distance(a: Vec2, b: Vec2, point: Vec2) -> f32 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return 0.0;
    }
    (dy * point.x - dx * point.y + b.x * a.y - b.y * a.x) / length
}

/// Signed distances of two points to the line through `a` and `b`.
pub fn point_to_line_distance2(a: Vec2, b: Vec2, point1: Vec2, point2: Vec2) -> (f32, f32) {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length = (dx * dx + dy * dy).sqrt();
    if length == 0.0 {
        return (0.0, 0.0);
    }
    let c = b.x * a.y - b.y * a.x;
    (
        (dy * point1.x - dx * point1.y + c) / length,
        (dy * point2.x - dx * point2.y + c) / length,
    )
}

/// Rotate `point` around the origin by `degrees` (counter-clockwise for a y-up frame).
pub fn rotate(point: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(point.x * cos - point.y * sin, point.x * sin + point.y * cos)
}

/// Scale and rotate `point` around `center`.
pub fn scale_and_rotate(point: Vec2, center: Vec2, degrees: f32, scale: f32) -> Vec2 {
    let delta = point - center;
    let delta = if degrees != 0.0 {
        rotate(delta, degrees)
    } else {
        delta
    };
    center + delta * scale
}

/// Unsigned angle in degrees between two vectors.
pub fn angle_between(a: Vec3, b: Vec3) -> f32 {
    let denominator = (a.length_squared() * b.length_squared()).sqrt();
    if denominator < 1e-15 {
        return 0.0;
    }
    (a.dot(b) / denominator).clamp(-1.0, 1.0).acos().to_degrees()
}

/// An infinite plane `normal · p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal of the plane.
    pub normal: Vec3,
    /// Signed distance term.
    pub distance: f32,
}

impl Default for Plane {
    fn default() -> Self {
        Self::SCREEN
    }
}

impl Plane {
    /// The plane `z = 0` facing the viewer.
    pub const SCREEN: Self = Self {
        normal: Vec3::NEG_Z,
        distance: 0.0,
    };

    /// Create a plane through `point` with the given normal.
    pub fn from_normal_and_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or(Vec3::NEG_Z);
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Signed distance from `point` to the plane.
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Intersect a ray with the plane.
    ///
    /// Returns the ray parameter of the hit, or `None` if the ray is parallel
    /// to the plane or points away from it.
    pub fn raycast(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        let denominator = direction.dot(self.normal);
        if denominator.abs() < f32::EPSILON {
            return None;
        }
        let t = -self.distance_to_point(origin) / denominator;
        (t >= 0.0).then_some(t)
    }

    /// Point on the plane closest to the world origin.
    fn origin_projection(&self) -> Vec3 {
        -self.normal * self.distance_to_point(Vec3::ZERO)
    }
}

/// Camera description used to map between screen pixels and world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraProjection {
    view_projection: Mat4,
    inverse_view_projection: Mat4,
    viewport: Vec2,
}

impl CameraProjection {
    /// Create a projection from a combined view-projection matrix and the
    /// viewport size in pixels. Screen `(0, 0)` is the bottom-left corner.
    pub fn new(view_projection: Mat4, viewport: Vec2) -> Self {
        Self {
            view_projection,
            inverse_view_projection: view_projection.inverse(),
            viewport,
        }
    }

    fn screen_to_ndc(&self, screen: Vec2) -> Vec2 {
        Vec2::new(
            screen.x / self.viewport.x * 2.0 - 1.0,
            screen.y / self.viewport.y * 2.0 - 1.0,
        )
    }

    /// World-space ray through a screen position.
    pub fn screen_point_to_ray(&self, screen: Vec2) -> (Vec3, Vec3) {
        let ndc = self.screen_to_ndc(screen);
        let near = self.inverse_view_projection.project_point3(ndc.extend(0.0));
        let far = self.inverse_view_projection.project_point3(ndc.extend(1.0));
        (near, (far - near).normalize_or_zero())
    }

    /// Screen position of a world point.
    pub fn world_to_screen(&self, world: Vec3) -> Vec2 {
        let clip = self.view_projection * world.extend(1.0);
        let ndc = if clip.w.abs() > f32::EPSILON {
            clip.xy() / clip.w
        } else {
            clip.xy()
        };
        Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (ndc.y + 1.0) * 0.5 * self.viewport.y,
        )
    }
}

/// How a pointer's screen position maps into the space of the object it hit.
///
/// Supplied per pointer by the hit-test oracle and consumed by gestures that
/// report world-space deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ProjectionParams {
    /// Screen pixels are world units on the `z = 0` plane.
    #[default]
    Screen,
    /// Perspective or orthographic camera.
    Camera(CameraProjection),
}

impl ProjectionParams {
    /// Project a screen position onto `plane`.
    pub fn project_to(&self, screen: Vec2, plane: &Plane) -> Vec3 {
        let (origin, direction) = match self {
            Self::Screen => (screen.extend(0.0), Vec3::Z),
            Self::Camera(camera) => camera.screen_point_to_ray(screen),
        };
        // Rays parallel to the plane fall back to the plane point nearest the origin.
        match plane.raycast(origin, direction) {
            Some(t) => origin + direction * t,
            None => match plane.raycast(origin, -direction) {
                Some(t) => origin - direction * t,
                None => plane.origin_projection(),
            },
        }
    }

    /// Project a world position back to the screen.
    pub fn project_from(&self, world: Vec3) -> Vec2 {
        match self {
            Self::Screen => world.truncate(),
            Self::Camera(camera) => camera.world_to_screen(world),
        }
    }
}

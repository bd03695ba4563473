//! Screen-space delta math. Positions are pixels, angles degrees.

use glam::Vec2;

use touch_lattice_core::geometry::scale_and_rotate;

/// Wrap an angle into `(-180, 180]`.
pub(crate) fn normalize_degrees(degrees: f32) -> f32 {
    let wrapped = degrees % 360.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// `new / old`, or 1 when the old length is degenerate.
pub(crate) fn ratio(new: f32, old: f32) -> f32 {
    if old <= f32::EPSILON { 1.0 } else { new / old }
}

/// Rotation of the segment `old1 -> old2` into `new1 -> new2`.
pub(crate) fn rotation(old1: Vec2, old2: Vec2, new1: Vec2, new2: Vec2) -> f32 {
    let old = old2 - old1;
    let new = new2 - new1;
    normalize_degrees((new.y.atan2(new.x) - old.y.atan2(old.x)).to_degrees())
}

/// Length ratio of the segment `new1 -> new2` to `old1 -> old2`.
pub(crate) fn scaling(old1: Vec2, old2: Vec2, new1: Vec2, new2: Vec2) -> f32 {
    ratio((new2 - new1).length(), (old2 - old1).length())
}

/// Translation of the first point left over once rotation and scaling about
/// the old midpoint are accounted for.
pub(crate) fn two_point_translation(
    old1: Vec2,
    old2: Vec2,
    new1: Vec2,
    degrees: f32,
    scale: f32,
) -> Vec2 {
    new1 - scale_and_rotate(old1, (old1 + old2) * 0.5, degrees, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_normalize_degrees() {
        assert!(approx(normalize_degrees(190.0), -170.0));
        assert!(approx(normalize_degrees(-180.0), 180.0));
        assert!(approx(normalize_degrees(180.0), 180.0));
        assert!(approx(normalize_degrees(-350.0), 10.0));
        assert!(approx(normalize_degrees(45.0), 45.0));
    }

    #[test]
    fn test_rotation_quarter_turn() {
        let angle = rotation(
            Vec2::ZERO,
            Vec2::new(100.0, 0.0),
            Vec2::ZERO,
            Vec2::new(100.0, 100.0),
        );
        assert!(approx(angle, 45.0));
    }

    #[test]
    fn test_rotation_across_branch_cut() {
        // From just above the negative x axis to just below it.
        let angle = rotation(
            Vec2::ZERO,
            Vec2::new(-100.0, 1.0),
            Vec2::ZERO,
            Vec2::new(-100.0, -1.0),
        );
        assert!(angle.abs() < 2.0);
        assert!(angle > 0.0);
    }

    #[test]
    fn test_scaling_guards_degenerate_segment() {
        assert!(approx(
            scaling(Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::ZERO, Vec2::new(20.0, 0.0)),
            2.0
        ));
        assert_eq!(scaling(Vec2::ONE, Vec2::ONE, Vec2::ZERO, Vec2::new(5.0, 0.0)), 1.0);
    }

    #[test]
    fn test_two_point_translation_pure_move() {
        let delta = two_point_translation(
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
            Vec2::new(3.0, 4.0),
            0.0,
            1.0,
        );
        assert!(approx(delta.x, 3.0) && approx(delta.y, 4.0));
    }
}

//! Where a transform takes its one or two reference points from.

use glam::Vec2;

use touch_lattice_core::cluster::{Cluster, Clusters2D, center_position, previous_center_position};
use touch_lattice_core::PointerId;

use crate::gesture::GestureCx;

/// Current and previous screen position of a reference point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TrackedPoint {
    pub new: Vec2,
    pub old: Vec2,
}

#[derive(Debug, Clone)]
pub(crate) enum PointSource {
    /// The first two active pointers.
    FirstTwo,
    /// Centroids of the two spatial clusters of all active pointers.
    Clustered(Clusters2D),
}

impl PointSource {
    pub(crate) fn is_clustered(&self) -> bool {
        matches!(self, Self::Clustered(_))
    }

    pub(crate) fn add(&mut self, pointers: &[PointerId]) {
        if let Self::Clustered(clusters) = self {
            clusters.add_points(pointers);
        }
    }

    pub(crate) fn remove(&mut self, pointers: &[PointerId]) {
        if let Self::Clustered(clusters) = self {
            clusters.remove_points(pointers);
        }
    }

    pub(crate) fn moved(&mut self, pointers: &[PointerId]) {
        if let Self::Clustered(clusters) = self {
            for pointer in pointers {
                clusters.update_point(*pointer);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        if let Self::Clustered(clusters) = self {
            clusters.remove_all_points();
        }
    }

    /// Number of distinct reference points, zero to two.
    pub(crate) fn count(&mut self, cx: &GestureCx<'_>, min_distance_px: f32) -> usize {
        match self {
            Self::FirstTwo => cx.pointer_count().min(2),
            Self::Clustered(clusters) => {
                clusters.set_min_point_distance(min_distance_px);
                if clusters.points_count() == 0 {
                    0
                } else if clusters.has_clusters(cx.pointers()) {
                    2
                } else {
                    1
                }
            }
        }
    }

    /// True if a moved pointer influences reference point `index`.
    pub(crate) fn is_relevant(&self, cx: &GestureCx<'_>, moved: &[PointerId], index: usize) -> bool {
        match self {
            Self::FirstTwo => cx
                .active_pointers()
                .get(index)
                .is_some_and(|pointer| moved.contains(pointer)),
            Self::Clustered(_) => !moved.is_empty(),
        }
    }

    /// Reference point `index` (0 or 1).
    pub(crate) fn point(&mut self, cx: &GestureCx<'_>, index: usize) -> TrackedPoint {
        match self {
            Self::FirstTwo => {
                let pointer = cx.active_pointers().get(index).and_then(|id| cx.pointer(*id));
                match pointer {
                    Some(pointer) => TrackedPoint {
                        new: pointer.position(),
                        old: pointer.previous_position(),
                    },
                    None => TrackedPoint {
                        new: Vec2::ZERO,
                        old: Vec2::ZERO,
                    },
                }
            }
            Self::Clustered(clusters) => {
                let cluster = if index == 0 {
                    Cluster::First
                } else {
                    Cluster::Second
                };
                TrackedPoint {
                    new: clusters.center_position(cx.pointers(), cluster),
                    old: clusters.previous_center_position(cx.pointers(), cluster),
                }
            }
        }
    }

    /// The single point a pinned transform follows: the first pointer, or
    /// the centroid of every clustered pointer.
    pub(crate) fn single_point(&mut self, cx: &GestureCx<'_>) -> TrackedPoint {
        match self {
            Self::FirstTwo => self.point(cx, 0),
            Self::Clustered(clusters) => TrackedPoint {
                new: center_position(cx.pointers(), clusters.points()),
                old: previous_center_position(cx.pointers(), clusters.points()),
            },
        }
    }
}

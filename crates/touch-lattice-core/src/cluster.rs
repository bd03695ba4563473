//! Reducing many pointers to one or two representative points.
//!
//! Multi-pointer gestures reason about "two interaction points" even when
//! five fingers are down. [`Clusters2D`] partitions its tracked pointers into
//! two spatial groups and reports each group's centroid.
//!
//! # Partitioning
//!
//! The split is recomputed only after the point set changes or
//! [`Clusters2D::invalidate`] is called, and is deterministic for a given
//! insertion order and set of positions:
//!
//! 1. Seed cluster 1 with the first point and cluster 2 with the second.
//! 2. Find the point farthest from each cluster's centroid. If both searches
//!    pick the same point, it anchors cluster 2 and cluster 1 is anchored at
//!    the midpoint of the two old centroids. Otherwise each point anchors the
//!    opposite cluster.
//! 3. Assign every point to the strictly nearer anchor (ties go to cluster 2).
//! 4. Repeat until membership stops changing.
//!
//! Centroids are read from live pointer positions, so repeated reads in one
//! frame are bit-identical.

use glam::Vec2;

use crate::geometry::INVALID_POSITION;
use crate::pointer::{PointerId, PointerTable};

/// Maximum number of refinement rounds in one distribution pass.
pub const MAX_DISTRIBUTION_ROUNDS: usize = 16;

/// Selects one of the two clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cluster {
    /// The cluster seeded with the first tracked point.
    First,
    /// The cluster seeded with the second tracked point.
    Second,
}

/// Centroid of the current positions of `ids`.
///
/// Returns [`INVALID_POSITION`] for an empty slice.
pub fn center_position(table: &PointerTable, ids: &[PointerId]) -> Vec2 {
    centroid(ids.iter().map(|&id| table.position(id)))
}

/// Centroid of the previous-frame positions of `ids`.
pub fn previous_center_position(table: &PointerTable, ids: &[PointerId]) -> Vec2 {
    centroid(
        ids.iter()
            .filter_map(|&id| table.get(id).map(|p| p.previous_position())),
    )
}

/// Centroid of a set of positions, or [`INVALID_POSITION`] when empty.
pub fn centroid(positions: impl IntoIterator<Item = Vec2>) -> Vec2 {
    let mut sum = Vec2::ZERO;
    let mut count = 0u32;
    for position in positions {
        sum += position;
        count += 1;
    }
    match count {
        0 => INVALID_POSITION,
        1 => sum,
        n => sum / n as f32,
    }
}

/// Two-way spatial clustering of tracked pointers.
#[derive(Debug, Clone, Default)]
pub struct Clusters2D {
    points: Vec<PointerId>,
    first: Vec<PointerId>,
    second: Vec<PointerId>,
    min_point_distance: f32,
    has_clusters: bool,
    dirty: bool,
}

impl Clusters2D {
    /// Create an empty clustering with no minimum point distance.
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    /// Number of tracked points.
    pub fn points_count(&self) -> usize {
        self.points.len()
    }

    /// Tracked points in insertion order.
    pub fn points(&self) -> &[PointerId] {
        &self.points
    }

    /// Minimum distance in pixels two points must be apart to form clusters.
    pub fn min_point_distance(&self) -> f32 {
        self.min_point_distance
    }

    /// Set the minimum distance in pixels two points must be apart to form clusters.
    pub fn set_min_point_distance(&mut self, distance: f32) {
        if self.min_point_distance != distance {
            self.min_point_distance = distance;
            self.dirty = true;
        }
    }

    /// Track a pointer. Adding an already tracked pointer does nothing.
    pub fn add_point(&mut self, id: PointerId) {
        if !self.points.contains(&id) {
            self.points.push(id);
            self.dirty = true;
        }
    }

    /// Track several pointers.
    pub fn add_points(&mut self, ids: &[PointerId]) {
        for &id in ids {
            self.add_point(id);
        }
    }

    /// Stop tracking a pointer.
    pub fn remove_point(&mut self, id: PointerId) {
        if let Some(index) = self.points.iter().position(|&p| p == id) {
            self.points.remove(index);
            self.dirty = true;
        }
    }

    /// Stop tracking several pointers.
    pub fn remove_points(&mut self, ids: &[PointerId]) {
        for &id in ids {
            self.remove_point(id);
        }
    }

    /// Stop tracking everything.
    pub fn remove_all_points(&mut self) {
        self.points.clear();
        self.dirty = true;
    }

    /// A tracked pointer moved.
    pub fn update_point(&mut self, id: PointerId) {
        if self.points.contains(&id) {
            self.dirty = true;
        }
    }

    /// Force redistribution on the next read.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// True if the points currently split into two clusters.
    pub fn has_clusters(&mut self, table: &PointerTable) -> bool {
        self.ensure_distributed(table);
        self.has_clusters
    }

    /// Current centroid of a cluster.
    ///
    /// Without clusters both selectors report the centroid of all points,
    /// which is [`INVALID_POSITION`] when nothing is tracked.
    pub fn center_position(&mut self, table: &PointerTable, cluster: Cluster) -> Vec2 {
        self.ensure_distributed(table);
        center_position(table, self.members(cluster))
    }

    /// Previous-frame centroid of a cluster.
    pub fn previous_center_position(&mut self, table: &PointerTable, cluster: Cluster) -> Vec2 {
        self.ensure_distributed(table);
        previous_center_position(table, self.members(cluster))
    }

    fn members(&self, cluster: Cluster) -> &[PointerId] {
        if !self.has_clusters {
            return &self.points;
        }
        match cluster {
            Cluster::First => &self.first,
            Cluster::Second => &self.second,
        }
    }

    fn ensure_distributed(&mut self, table: &PointerTable) {
        if self.dirty {
            self.distribute(table);
            self.dirty = false;
        }
    }

    fn distribute(&mut self, table: &PointerTable) {
        self.first.clear();
        self.second.clear();

        self.has_clusters = self.check_clusters(table);
        if !self.has_clusters {
            return;
        }

        self.first.push(self.points[0]);
        self.second.push(self.points[1]);
        if self.points.len() == 2 {
            return;
        }

        let positions: Vec<(PointerId, Vec2)> = self
            .points
            .iter()
            .map(|&id| (id, table.position(id)))
            .collect();

        let mut rounds = 0;
        loop {
            rounds += 1;
            let center1 = center_position(table, &self.first);
            let center2 = center_position(table, &self.second);

            let farthest_from = |center: Vec2| {
                let mut best = positions[0];
                let mut best_distance = f32::NEG_INFINITY;
                for &(id, position) in &positions {
                    let distance = center.distance_squared(position);
                    if distance > best_distance {
                        best_distance = distance;
                        best = (id, position);
                    }
                }
                best
            };
            let (id1, position1) = farthest_from(center2);
            let (id2, position2) = farthest_from(center1);

            let (anchor1, anchor2) = if id1 == id2 {
                ((center1 + center2) * 0.5, position2)
            } else {
                (position1, position2)
            };

            let mut first = Vec::with_capacity(positions.len());
            let mut second = Vec::with_capacity(positions.len());
            for &(id, position) in &positions {
                if anchor1.distance_squared(position) < anchor2.distance_squared(position) {
                    first.push(id);
                } else {
                    second.push(id);
                }
            }

            // Coincident points can leave one side empty.
            if first.is_empty() {
                first.push(second.remove(0));
            } else if second.is_empty() {
                second.push(first.remove(first.len() - 1));
            }

            let stable = first == self.first && second == self.second;
            self.first = first;
            self.second = second;
            if stable || rounds >= MAX_DISTRIBUTION_ROUNDS {
                break;
            }
        }

        tracing::trace!(
            target: "touch_lattice_core::cluster",
            points = positions.len(),
            first = self.first.len(),
            second = self.second.len(),
            rounds,
            "redistributed clusters"
        );
    }

    fn check_clusters(&self, table: &PointerTable) -> bool {
        if self.points.len() < 2 {
            return false;
        }
        let min_distance_sqr = self.min_point_distance * self.min_point_distance;
        let positions: Vec<Vec2> = self.points.iter().map(|&id| table.position(id)).collect();
        positions.iter().enumerate().any(|(i, a)| {
            positions[i + 1..]
                .iter()
                .any(|b| a.distance_squared(*b) >= min_distance_sqr)
        })
    }
}

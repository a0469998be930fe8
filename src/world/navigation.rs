//! Navigation collaborator contract.
//!
//! The pack controllers never search the navigable surface themselves. They
//! ask a [`Navigator`] for a shortest path between two points and for the
//! nearest valid surface point, and treat the answer as a black box.

use glam::Vec3;

/// Default search radius when snapping a point to the surface.
pub const DEFAULT_SAMPLE_RADIUS: f32 = 2.0;

/// Completeness of a computed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStatus {
    /// The path reaches the requested destination
    Complete,
    /// The path stops at the closest reachable point
    Partial,
    /// No path could be computed
    Invalid,
}

/// A raw path as returned by the navigator: an ordered list of corners.
#[derive(Debug, Clone, PartialEq)]
pub struct NavPath {
    /// Completeness of the path
    pub status: PathStatus,
    /// Polyline corners, start first
    pub corners: Vec<Vec3>,
}

impl NavPath {
    /// A path the navigator could not compute.
    pub fn invalid() -> Self {
        Self {
            status: PathStatus::Invalid,
            corners: Vec::new(),
        }
    }

    /// Whether the path is complete and has at least one segment.
    pub fn is_followable(&self) -> bool {
        self.status == PathStatus::Complete && self.corners.len() >= 2
    }

    /// Total polyline length.
    pub fn length(&self) -> f32 {
        polyline_length(&self.corners)
    }
}

/// Query interface onto the navigable surface.
pub trait Navigator {
    /// Shortest path from `from` to `to` over the surface.
    fn calculate_path(&self, from: Vec3, to: Vec3) -> NavPath;

    /// Nearest surface point within `max_distance` of `point`, if any.
    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3>;

    /// Length of the surface path between two points.
    ///
    /// Follows whatever corners the navigator returns, so a partial path
    /// measures only the reachable part.
    fn path_distance(&self, from: Vec3, to: Vec3) -> f32 {
        self.calculate_path(from, to).length()
    }
}

/// Sum of segment lengths of a polyline.
pub fn polyline_length(points: &[Vec3]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

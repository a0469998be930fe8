//! Track geometry: a navigable corridor and the checkpoints raced along it.
//!
//! A track is a centre-line polyline with a fixed half width. Paths over the
//! corridor follow the centre-line vertices between the projected start and
//! end, which is what the built-in session and the headless runner navigate.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::navigation::{NavPath, Navigator, PathStatus, DEFAULT_SAMPLE_RADIUS};

/// Projection of a point onto the track centre line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackProjection {
    /// Distance along the centre line from its first vertex
    pub distance: f32,
    /// Closest centre-line point
    pub closest: Vec3,
    /// Horizontal distance from the centre line
    pub lateral: f32,
}

/// A corridor-shaped navigable surface.
#[derive(Debug, Clone)]
pub struct TrackNavigator {
    /// Centre-line vertices, start first
    centerline: Vec<Vec3>,
    /// Half the corridor width
    half_width: f32,
    /// Cumulative distance at each vertex
    cumulative: Vec<f32>,
}

impl TrackNavigator {
    /// Build a track from its centre line.
    pub fn new(centerline: Vec<Vec3>, half_width: f32) -> Self {
        let mut cumulative = Vec::with_capacity(centerline.len());
        let mut total = 0.0;
        for (i, point) in centerline.iter().enumerate() {
            if i > 0 {
                total += centerline[i - 1].distance(*point);
            }
            cumulative.push(total);
        }

        Self {
            centerline,
            half_width: half_width.max(0.0),
            cumulative,
        }
    }

    /// A straight track along +Z.
    pub fn straight(length: f32, half_width: f32) -> Self {
        Self::new(vec![Vec3::ZERO, Vec3::new(0.0, 0.0, length)], half_width)
    }

    /// A closed rounded-rectangle circuit, approximated by `segments` vertices
    /// per bend. The second bend ends on the first vertex.
    pub fn circuit(straight_length: f32, radius: f32, segments: usize, half_width: f32) -> Self {
        let segments = segments.max(1);
        let mut points = Vec::new();
        let half = straight_length / 2.0;

        // Two straights along Z joined by semicircular bends.
        let bends = [
            (Vec3::new(radius, 0.0, half), 0.0),
            (Vec3::new(radius, 0.0, -half), std::f32::consts::PI),
        ];
        points.push(Vec3::new(0.0, 0.0, -half));
        for (center, start) in bends {
            for i in 0..=segments {
                let angle = start + std::f32::consts::PI * i as f32 / segments as f32;
                points.push(center + Vec3::new(-radius * angle.cos(), 0.0, radius * angle.sin()));
            }
        }

        Self::new(points, half_width)
    }

    /// Total centre-line length.
    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Corridor half width.
    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    fn cumulative_at(&self, i: usize) -> f32 {
        self.cumulative[i]
    }

    /// Position and unit heading at a given distance along the centre line.
    pub fn point_at(&self, distance: f32) -> (Vec3, Vec3) {
        match self.centerline.len() {
            0 => return (Vec3::ZERO, Vec3::Z),
            1 => return (self.centerline[0], Vec3::Z),
            _ => {}
        }

        let distance = distance.clamp(0.0, self.length());
        for i in 1..self.centerline.len() {
            let end = self.cumulative_at(i);
            if end >= distance {
                let start = self.cumulative_at(i - 1);
                let a = self.centerline[i - 1];
                let b = self.centerline[i];
                let heading = (b - a).normalize_or_zero();
                let segment = end - start;
                if segment > 0.0 {
                    return (a.lerp(b, (distance - start) / segment), heading);
                }
                return (a, heading);
            }
        }

        let n = self.centerline.len();
        let heading = (self.centerline[n - 1] - self.centerline[n - 2]).normalize_or_zero();
        (self.centerline[n - 1], heading)
    }

    /// Point at `distance` along the track, shifted sideways by `lateral`
    /// (positive to the right of travel).
    pub fn offset_point(&self, distance: f32, lateral: f32) -> Vec3 {
        let (point, heading) = self.point_at(distance);
        point + right_of(heading) * lateral
    }

    /// Project a point onto the centre line.
    pub fn project(&self, point: Vec3) -> Option<TrackProjection> {
        if self.centerline.is_empty() {
            return None;
        }
        if self.centerline.len() == 1 {
            let closest = self.centerline[0];
            return Some(TrackProjection {
                distance: 0.0,
                closest,
                lateral: horizontal_distance(point, closest),
            });
        }

        let mut best: Option<TrackProjection> = None;
        for i in 1..self.centerline.len() {
            let a = self.centerline[i - 1];
            let b = self.centerline[i];
            let ab = b - a;
            let len_sq = ab.length_squared();
            let t = if len_sq > 0.0 {
                ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let closest = a + ab * t;
            let lateral = horizontal_distance(point, closest);
            if best.map_or(true, |b| lateral < b.lateral) {
                best = Some(TrackProjection {
                    distance: self.cumulative_at(i - 1) + ab.length() * t,
                    closest,
                    lateral,
                });
            }
        }
        best
    }
}

impl Navigator for TrackNavigator {
    fn calculate_path(&self, from: Vec3, to: Vec3) -> NavPath {
        let Some(start) = self.sample_position(from, DEFAULT_SAMPLE_RADIUS) else {
            return NavPath::invalid();
        };
        let (Some(start_proj), Some(goal_proj)) = (self.project(start), self.project(to)) else {
            return NavPath::invalid();
        };

        // An unreachable goal still yields the path to its closest centre-line point.
        let (end, status) = match self.sample_position(to, DEFAULT_SAMPLE_RADIUS) {
            Some(end) => (end, PathStatus::Complete),
            None => (goal_proj.closest, PathStatus::Partial),
        };

        let mut corners = vec![start];
        let (d0, d1) = (start_proj.distance, goal_proj.distance);
        if d1 >= d0 {
            for i in 0..self.centerline.len() {
                let d = self.cumulative_at(i);
                if d > d0 && d < d1 {
                    corners.push(self.centerline[i]);
                }
            }
        } else {
            for i in (0..self.centerline.len()).rev() {
                let d = self.cumulative_at(i);
                if d < d0 && d > d1 {
                    corners.push(self.centerline[i]);
                }
            }
        }
        corners.push(end);

        NavPath { status, corners }
    }

    fn sample_position(&self, point: Vec3, max_distance: f32) -> Option<Vec3> {
        let projection = self.project(point)?;
        let on_surface = Vec3::new(point.x, projection.closest.y, point.z);

        if projection.lateral <= self.half_width {
            return Some(on_surface);
        }
        if projection.lateral - self.half_width <= max_distance {
            let outward = (on_surface - projection.closest).normalize_or_zero();
            return Some(projection.closest + outward * self.half_width);
        }
        None
    }
}

/// Ordered checkpoints an agent chases; reaching one moves its target on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Checkpoint positions in riding order
    pub checkpoints: Vec<Vec3>,
    /// Distance at which a checkpoint counts as reached
    pub capture_radius: f32,
}

impl Course {
    /// Create a course from checkpoints.
    pub fn new(checkpoints: Vec<Vec3>, capture_radius: f32) -> Self {
        Self {
            checkpoints,
            capture_radius,
        }
    }

    /// Evenly spaced checkpoints along a track.
    ///
    /// The last checkpoint sits one capture radius short of the track end, so
    /// on a closed circuit it cannot be confused with the start.
    pub fn along(track: &TrackNavigator, spacing: f32, capture_radius: f32) -> Self {
        let spacing = spacing.max(1.0);
        let finish = (track.length() - capture_radius).max(0.0);
        let count = (track.length() / spacing).ceil() as usize;
        let checkpoints = (1..=count)
            .map(|i| track.point_at((i as f32 * spacing).min(finish)).0)
            .collect();
        Self::new(checkpoints, capture_radius)
    }

    /// Checkpoint for an index, clamped to the last one.
    pub fn target(&self, index: usize) -> Option<Vec3> {
        if self.checkpoints.is_empty() {
            return None;
        }
        Some(self.checkpoints[index.min(self.checkpoints.len() - 1)])
    }

    /// Index of the next checkpoint after reaching `position`.
    pub fn advance(&self, index: usize, position: Vec3) -> usize {
        match self.target(index) {
            Some(target)
                if index + 1 < self.checkpoints.len()
                    && horizontal_distance(position, target) <= self.capture_radius =>
            {
                index + 1
            }
            _ => index,
        }
    }

    /// Whether the final checkpoint has been reached.
    pub fn is_finished(&self, index: usize, position: Vec3) -> bool {
        index + 1 >= self.checkpoints.len()
            && self
                .target(index)
                .map_or(true, |t| horizontal_distance(position, t) <= self.capture_radius)
    }
}

/// Right-hand direction on the ground plane for a heading.
pub fn right_of(heading: Vec3) -> Vec3 {
    // Left-handed, Y-up: right of +Z is +X.
    Vec3::new(heading.z, 0.0, -heading.x).normalize_or_zero()
}

fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

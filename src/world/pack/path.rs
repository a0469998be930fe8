//! Path smoothing and waypoint following.
//!
//! Raw navigator paths are polylines with hard corners. [`PathSmoother`]
//! resamples them through a Catmull-Rom spline so bikes carve through bends
//! instead of pivoting on a corner, and [`PathPlanner`] keeps one
//! [`WaypointFollower`] per agent walking the result.

use std::collections::HashMap;

use glam::Vec3;

use super::{flatten, Agent, AgentArena, AgentId, PackError, TaskStatus};
use crate::world::navigation::{polyline_length, NavPath, Navigator, DEFAULT_SAMPLE_RADIUS};

/// Default samples per segment minus one.
pub const DEFAULT_SMOOTHING_FACTOR: u32 = 5;
/// Upper bound on the smoothing factor.
pub const MAX_SMOOTHING_FACTOR: u32 = 100;
/// Maximum wait on a single waypoint before moving on.
pub const DEFAULT_WAYPOINT_TIMEOUT_SECS: f32 = 5.0;

/// Evaluate the Catmull-Rom spline through `p1`..`p2` at `t` in [0, 1].
pub fn catmull_rom(t: f32, p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;

    let a0 = -0.5 * t3 + t2 - 0.5 * t;
    let a1 = 1.5 * t3 - 2.5 * t2 + 1.0;
    let a2 = -1.5 * t3 + 2.0 * t2 + 0.5 * t;
    let a3 = 0.5 * t3 - 0.5 * t2;

    p0 * a0 + p1 * a1 + p2 * a2 + p3 * a3
}

/// A resampled, surface-snapped path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmoothedPath {
    points: Vec<Vec3>,
    dropped: usize,
}

impl SmoothedPath {
    /// Sampled points in travel order.
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Number of samples dropped because they could not be snapped to the surface.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total length along the samples.
    pub fn length(&self) -> f32 {
        polyline_length(&self.points)
    }

    /// Take the points.
    pub fn into_points(self) -> Vec<Vec3> {
        self.points
    }
}

/// Catmull-Rom resampler for raw navigator paths.
#[derive(Debug, Clone)]
pub struct PathSmoother {
    smoothing_factor: u32,
    sample_radius: f32,
}

impl Default for PathSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR, DEFAULT_SAMPLE_RADIUS)
    }
}

impl PathSmoother {
    /// Create a smoother. The factor is clamped to 0-100.
    pub fn new(smoothing_factor: u32, sample_radius: f32) -> Self {
        Self {
            smoothing_factor: smoothing_factor.min(MAX_SMOOTHING_FACTOR),
            sample_radius,
        }
    }

    /// Current smoothing factor.
    pub fn smoothing_factor(&self) -> u32 {
        self.smoothing_factor
    }

    /// Smooth a raw path.
    ///
    /// Each corner segment contributes `smoothing_factor + 1` samples, so a
    /// path of `n` corners yields at most `(n - 1) * (smoothing_factor + 1)`
    /// points. A factor of zero samples only the start of each segment.
    /// Samples that cannot be snapped onto the surface are dropped with a
    /// warning. Incomplete paths, paths with fewer than two corners, and
    /// results with fewer than two points are rejected.
    pub fn smooth(&self, path: &NavPath, nav: &dyn Navigator) -> Result<SmoothedPath, PackError> {
        if !path.is_followable() {
            return Err(PackError::InvalidPath(format!(
                "{:?} path with {} corners",
                path.status,
                path.corners.len()
            )));
        }

        let corners = &path.corners;
        let last = corners.len() - 1;
        let mut smoothed = SmoothedPath {
            points: Vec::with_capacity(last * (self.smoothing_factor as usize + 1)),
            dropped: 0,
        };

        for i in 0..last {
            let p0 = corners[i.saturating_sub(1)];
            let p1 = corners[i];
            let p2 = corners[i + 1];
            let p3 = corners[(i + 2).min(last)];

            for step in 0..=self.smoothing_factor {
                let t = if self.smoothing_factor == 0 {
                    0.0
                } else {
                    step as f32 / self.smoothing_factor as f32
                };
                let point = catmull_rom(t, p0, p1, p2, p3);

                match nav.sample_position(point, self.sample_radius) {
                    Some(snapped) => smoothed.points.push(snapped),
                    None => {
                        let err = PackError::ProjectionFailure(point);
                        tracing::warn!("Dropping smoothed sample: {}", err);
                        smoothed.dropped += 1;
                    }
                }
            }
        }

        if smoothed.points.len() < 2 {
            return Err(PackError::InvalidPath(format!(
                "smoothed path has {} usable points",
                smoothed.points.len()
            )));
        }

        Ok(smoothed)
    }
}

/// Walks an agent through a list of waypoints, one destination at a time.
#[derive(Debug, Clone)]
pub struct WaypointFollower {
    waypoints: Vec<Vec3>,
    index: usize,
    timer: f32,
    timeout: f32,
    stopping_distance: f32,
}

impl WaypointFollower {
    /// Create a follower.
    pub fn new(waypoints: Vec<Vec3>, timeout: f32, stopping_distance: f32) -> Self {
        Self {
            waypoints,
            index: 0,
            timer: 0.0,
            timeout,
            stopping_distance,
        }
    }

    /// Waypoints not yet reached, current one first.
    pub fn remaining(&self) -> &[Vec3] {
        &self.waypoints[self.index.min(self.waypoints.len())..]
    }

    /// Whether every waypoint has been visited.
    pub fn is_finished(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    /// Steer the agent toward the current waypoint.
    ///
    /// A waypoint is passed once the agent is within the stopping distance,
    /// or after the timeout so an unreachable point never blocks the route.
    pub fn tick(&mut self, agent: &mut Agent, dt: f32) -> TaskStatus {
        while let Some(&waypoint) = self.waypoints.get(self.index) {
            let reached = flatten(waypoint - agent.position).length() <= self.stopping_distance;
            if reached || self.timer >= self.timeout {
                if !reached {
                    tracing::debug!("Agent {} timed out on waypoint {}", agent.id, self.index);
                }
                self.index += 1;
                self.timer = 0.0;
                continue;
            }

            agent.destination = Some(waypoint);
            self.timer += dt;
            return TaskStatus::Running;
        }

        TaskStatus::Done
    }
}

/// Route planning settings.
#[derive(Debug, Clone)]
pub struct PlannerSettings {
    /// Maximum wait on one waypoint
    pub waypoint_timeout: f32,
    /// Distance at which a waypoint counts as reached
    pub stopping_distance: f32,
    /// Seconds before a route to the same goal is recomputed
    pub replan_interval: f32,
    /// Goal movement that forces a replan
    pub replan_distance: f32,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            waypoint_timeout: DEFAULT_WAYPOINT_TIMEOUT_SECS,
            stopping_distance: 0.5,
            replan_interval: 0.5,
            replan_distance: 1.0,
        }
    }
}

#[derive(Debug)]
struct PlannedRoute {
    goal: Vec3,
    age: f32,
    follower: Option<WaypointFollower>,
}

/// Per-agent smoothed routes.
///
/// Holds at most one follower per agent; planning again replaces it.
#[derive(Debug)]
pub struct PathPlanner {
    smoother: PathSmoother,
    settings: PlannerSettings,
    routes: HashMap<AgentId, PlannedRoute>,
}

impl PathPlanner {
    /// Create a planner.
    pub fn new(smoother: PathSmoother, settings: PlannerSettings) -> Self {
        Self {
            smoother,
            settings,
            routes: HashMap::new(),
        }
    }

    /// The smoother used for every route.
    pub fn smoother(&self) -> &PathSmoother {
        &self.smoother
    }

    /// Route the agent to `goal` along a smoothed path.
    ///
    /// Reuses the current route while the goal has not moved and the route is
    /// fresh. An incomplete navigator path leaves the current route in place;
    /// a path that smooths to fewer than two points stops the agent where it
    /// is. Both are reported as [`PackError::InvalidPath`].
    pub fn set_smoothed_destination(
        &mut self,
        agent: &mut Agent,
        goal: Vec3,
        nav: &dyn Navigator,
    ) -> Result<(), PackError> {
        if let Some(route) = self.routes.get(&agent.id) {
            let goal_moved = route.goal.distance(goal) > self.settings.replan_distance;
            if !goal_moved && route.age < self.settings.replan_interval {
                return Ok(());
            }
        }

        let raw = nav.calculate_path(agent.position, goal);
        let result = if raw.is_followable() {
            self.smoother.smooth(&raw, nav)
        } else {
            Err(PackError::InvalidPath(format!(
                "{:?} path with {} corners",
                raw.status,
                raw.corners.len()
            )))
        };

        let route = self.routes.entry(agent.id).or_insert(PlannedRoute {
            goal,
            age: 0.0,
            follower: None,
        });
        route.goal = goal;
        route.age = 0.0;

        match result {
            Ok(smoothed) => {
                route.follower = Some(WaypointFollower::new(
                    smoothed.into_points(),
                    self.settings.waypoint_timeout,
                    self.settings.stopping_distance,
                ));
                Ok(())
            }
            Err(err) => {
                if raw.is_followable() {
                    route.follower = None;
                    agent.destination = None;
                }
                Err(err)
            }
        }
    }

    /// Advance every follower by one tick.
    pub fn tick(&mut self, arena: &mut AgentArena, dt: f32) {
        for (id, route) in self.routes.iter_mut() {
            route.age += dt;
            let (Some(follower), Some(agent)) = (route.follower.as_mut(), arena.get_mut(*id)) else {
                continue;
            };
            if follower.tick(agent, dt) == TaskStatus::Done {
                route.follower = None;
            }
        }
    }

    /// Waypoints the agent still has to visit.
    pub fn remaining_route(&self, id: AgentId) -> &[Vec3] {
        self.routes
            .get(&id)
            .and_then(|r| r.follower.as_ref())
            .map(|f| f.remaining())
            .unwrap_or(&[])
    }

    /// Whether the agent is currently following a route.
    pub fn is_following(&self, id: AgentId) -> bool {
        self.routes
            .get(&id)
            .is_some_and(|r| r.follower.is_some())
    }

    /// Drop an agent's route.
    pub fn clear(&mut self, id: AgentId) {
        self.routes.remove(&id);
    }
}

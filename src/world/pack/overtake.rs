//! Forward obstacle scan and the sideways overtake maneuver.

use std::collections::HashMap;

use glam::Vec3;

use super::{AgentArena, AgentId, TaskStatus};

/// Overtake tuning.
#[derive(Debug, Clone)]
pub struct OvertakeSettings {
    /// How far along the route to look for obstacles
    pub detection_distance: f32,
    /// Sideways displacement while passing (positive = right)
    pub lateral_offset: f32,
    /// Duration of each sideways transition
    pub maneuver_secs: f32,
    /// Radius of the sphere each bicycle occupies for ray tests
    pub collider_radius: f32,
}

impl Default for OvertakeSettings {
    fn default() -> Self {
        Self {
            detection_distance: 5.0,
            lateral_offset: 2.0,
            maneuver_secs: 1.5,
            collider_radius: 0.75,
        }
    }
}

/// Result of scanning ahead along a route.
#[derive(Debug, Clone, PartialEq)]
pub struct PathScan {
    /// Agents hit on the first blocked segment, nearest first
    pub obstacles: Vec<AgentId>,
    /// Furthest point known to be clear
    pub clear_point: Vec3,
}

impl PathScan {
    /// Whether anything blocks the route.
    pub fn is_blocked(&self) -> bool {
        !self.obstacles.is_empty()
    }
}

/// Distance along the ray at which it first touches a sphere, if it does
/// within `length`.
pub fn ray_sphere(origin: Vec3, direction: Vec3, length: f32, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - origin;
    let along = to_center.dot(direction);
    let miss_sq = to_center.length_squared() - along * along;
    let radius_sq = radius * radius;
    if miss_sq > radius_sq {
        return None;
    }

    let half_chord = (radius_sq - miss_sq).sqrt();
    let entry = along - half_chord;
    let exit = along + half_chord;
    if exit < 0.0 || entry > length {
        return None;
    }
    Some(entry.max(0.0))
}

fn ray_hits(
    arena: &AgentArena,
    exclude: AgentId,
    origin: Vec3,
    direction: Vec3,
    length: f32,
    radius: f32,
) -> Vec<(f32, AgentId)> {
    let mut hits: Vec<(f32, AgentId)> = arena
        .iter()
        .filter(|other| other.id != exclude)
        .filter(|other| (other.world_position() - origin).dot(direction) > 0.0)
        .filter_map(|other| {
            ray_sphere(origin, direction, length, other.world_position(), radius).map(|d| (d, other.id))
        })
        .collect();
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits
}

/// Phase of an overtake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OvertakePhase {
    /// Easing out to the passing line
    MovingOut,
    /// Holding the passing line until every obstacle is behind
    Passing,
    /// Easing back to the original line
    MovingBack,
}

/// One agent's overtake in progress.
#[derive(Debug, Clone)]
pub struct OvertakeTask {
    phase: OvertakePhase,
    elapsed: f32,
    base_offset: f32,
    offset: f32,
    duration: f32,
    obstacles: Vec<AgentId>,
}

fn ease(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

impl OvertakeTask {
    /// Create a task passing `obstacles` from the current lateral line.
    pub fn new(base_offset: f32, settings: &OvertakeSettings, obstacles: Vec<AgentId>) -> Self {
        Self {
            phase: OvertakePhase::MovingOut,
            elapsed: 0.0,
            base_offset,
            offset: settings.lateral_offset,
            duration: settings.maneuver_secs.max(f32::EPSILON),
            obstacles,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> OvertakePhase {
        self.phase
    }

    /// Agents this maneuver is passing.
    pub fn obstacles(&self) -> &[AgentId] {
        &self.obstacles
    }

    fn all_behind(&self, arena: &AgentArena, id: AgentId) -> bool {
        let Some(agent) = arena.get(id) else {
            return true;
        };
        let position = agent.world_position();
        self.obstacles.iter().all(|other| {
            arena
                .get(*other)
                .map_or(true, |o| (o.world_position() - position).dot(agent.heading) <= 0.0)
        })
    }

    /// Advance the maneuver for agent `id`.
    pub fn tick(&mut self, arena: &mut AgentArena, id: AgentId, dt: f32) -> TaskStatus {
        match self.phase {
            OvertakePhase::MovingOut => {
                self.elapsed += dt;
                let progress = ease(self.elapsed / self.duration);
                if let Some(agent) = arena.get_mut(id) {
                    agent.lateral_offset = self.base_offset + self.offset * progress;
                }
                if self.elapsed >= self.duration {
                    self.phase = OvertakePhase::Passing;
                }
                TaskStatus::Running
            }
            OvertakePhase::Passing => {
                if self.all_behind(arena, id) {
                    self.phase = OvertakePhase::MovingBack;
                    self.elapsed = 0.0;
                }
                TaskStatus::Running
            }
            OvertakePhase::MovingBack => {
                self.elapsed += dt;
                let progress = ease(self.elapsed / self.duration);
                if let Some(agent) = arena.get_mut(id) {
                    agent.lateral_offset = self.base_offset + self.offset * (1.0 - progress);
                }
                if self.elapsed >= self.duration {
                    TaskStatus::Done
                } else {
                    TaskStatus::Running
                }
            }
        }
    }
}

/// Detects blocked routes and runs at most one overtake per agent.
#[derive(Debug, Default)]
pub struct OvertakeController {
    settings: OvertakeSettings,
    active: HashMap<AgentId, OvertakeTask>,
}

impl OvertakeController {
    /// Create a controller.
    pub fn new(settings: OvertakeSettings) -> Self {
        Self {
            settings,
            active: HashMap::new(),
        }
    }

    /// Overtake tuning.
    pub fn settings(&self) -> &OvertakeSettings {
        &self.settings
    }

    /// Scan `route` ahead of agent `id` for other bicycles.
    ///
    /// Each segment is ray-tested up to the remaining detection budget. The
    /// scan stops at the first blocked segment or once the budget is spent.
    /// The agent's anticipation marker is moved to the clear point.
    pub fn scan_path(&self, arena: &mut AgentArena, id: AgentId, route: &[Vec3]) -> PathScan {
        let Some(agent) = arena.get(id) else {
            return PathScan {
                obstacles: Vec::new(),
                clear_point: Vec3::ZERO,
            };
        };

        let mut from = agent.world_position();
        let mut clear_point = from;
        let mut budget = self.settings.detection_distance;
        let mut obstacles = Vec::new();

        for &to in route {
            if budget <= 0.0 {
                break;
            }
            let segment = to - from;
            let length = segment.length();
            if length <= f32::EPSILON {
                continue;
            }
            let direction = segment / length;
            let ray_length = length.min(budget);

            let hits = ray_hits(arena, id, from, direction, ray_length, self.settings.collider_radius);
            if let Some(&(distance, _)) = hits.first() {
                clear_point = from + direction * distance;
                obstacles = hits.into_iter().map(|(_, other)| other).collect();
                break;
            }

            clear_point = from + direction * ray_length;
            budget -= ray_length;
            from = to;
        }

        if let Some(agent) = arena.get_mut(id) {
            agent.anticipation_marker = clear_point;
        }
        PathScan {
            obstacles,
            clear_point,
        }
    }

    /// Agents straight ahead of `id` within the detection distance.
    pub fn obstacles_ahead(&self, arena: &AgentArena, id: AgentId) -> Vec<AgentId> {
        let Some(agent) = arena.get(id) else {
            return Vec::new();
        };
        ray_hits(
            arena,
            id,
            agent.world_position(),
            agent.heading,
            self.settings.detection_distance,
            self.settings.collider_radius,
        )
        .into_iter()
        .map(|(_, other)| other)
        .collect()
    }

    /// Start an overtake if the route is blocked or a collision is
    /// anticipated. Returns whether a new maneuver started.
    pub fn try_overtake(&mut self, arena: &mut AgentArena, id: AgentId, route: &[Vec3]) -> bool {
        if self.is_overtaking(id) {
            return false;
        }
        let scan = self.scan_path(arena, id, route);
        let anticipated = arena.get(id).and_then(|a| a.collision.anticipation);
        if !scan.is_blocked() && anticipated.is_none() {
            return false;
        }

        let mut obstacles = self.obstacles_ahead(arena, id);
        for other in scan.obstacles.into_iter().chain(anticipated) {
            if !obstacles.contains(&other) {
                obstacles.push(other);
            }
        }
        self.begin(arena, id, obstacles)
    }

    /// Start an overtake passing `obstacles`.
    ///
    /// Ignored while the agent already has one in progress.
    pub fn begin(&mut self, arena: &AgentArena, id: AgentId, obstacles: Vec<AgentId>) -> bool {
        if self.is_overtaking(id) {
            tracing::trace!("Agent {} already overtaking", id);
            return false;
        }
        let Some(agent) = arena.get(id) else {
            return false;
        };

        tracing::debug!("Agent {} overtaking {:?}", id, obstacles);
        self.active
            .insert(id, OvertakeTask::new(agent.lateral_offset, &self.settings, obstacles));
        true
    }

    /// Whether `id` is mid-overtake.
    pub fn is_overtaking(&self, id: AgentId) -> bool {
        self.active.contains_key(&id)
    }

    /// Phase of `id`'s overtake, if any.
    pub fn phase(&self, id: AgentId) -> Option<OvertakePhase> {
        self.active.get(&id).map(|t| t.phase())
    }

    /// Number of overtakes in progress.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Advance every overtake by one tick.
    pub fn tick(&mut self, arena: &mut AgentArena, dt: f32) {
        self.active.retain(|id, task| {
            let running = task.tick(arena, *id, dt) == TaskStatus::Running;
            if !running {
                tracing::debug!("Agent {} finished overtaking", id);
            }
            running
        });
    }

    /// Drop every in-flight maneuver.
    pub fn clear(&mut self) {
        self.active.clear();
    }
}

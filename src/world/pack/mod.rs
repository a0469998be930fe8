//! Pack dynamics: the simulated bicycles and the controllers that move them.
//!
//! Agents live in an [`AgentArena`] and are referred to everywhere else by
//! their stable [`AgentId`]. Controllers never hold references to agents
//! across ticks; formations are ordered lists of ids, so rotating a paceline
//! cannot invalidate anything another controller is reading.
//!
//! Long-running maneuvers (waypoint following, peel-off, overtake, the race
//! pacing loop) are explicit resumable tasks. Each keeps its own phase and
//! elapsed time and is advanced once per simulation tick.

pub mod formation;
pub mod overtake;
pub mod paceline;
pub mod pacing;
pub mod path;
pub mod zones;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::route::right_of;

/// Errors raised by the pack controllers.
///
/// None of these are fatal: each is logged and absorbed where it occurs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackError {
    /// Route is incomplete or too short to follow
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A smoothed sample could not be placed on the navigable surface
    #[error("Point {0} could not be projected onto the navigable surface")]
    ProjectionFailure(Vec3),

    /// Performance variation count does not match the competitor count
    #[error("Expected {expected} performance variations, got {actual}")]
    ConfigMismatch { expected: usize, actual: usize },

    /// No historical data to build competitors from
    #[error("No performance profile available: {0}")]
    MissingProfile(String),
}

/// Progress of a resumable task after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// The task needs more ticks
    Running,
    /// The task has finished
    Done,
}

/// Stable handle to an agent in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who controls an agent. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// The human rider on the smart trainer
    Player,
    /// An AI rival in race mode
    Competitor,
    /// An AI paceline partner
    Teammate,
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Player => write!(f, "Player"),
            AgentRole::Competitor => write!(f, "Competitor"),
            AgentRole::Teammate => write!(f, "Teammate"),
        }
    }
}

/// Position within a formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormationState {
    /// Leading, setting the pace
    #[default]
    Pulling,
    /// Following the agent ahead
    Drafting,
}

/// Proximity zone around an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneKind {
    /// Directly in front
    Front,
    /// Directly behind
    Back,
    /// Around the anticipated-collision marker
    Anticipation,
}

/// Agents currently inside each proximity zone of an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionState {
    /// Agent in the front zone
    pub front: Option<AgentId>,
    /// Agent in the back zone
    pub back: Option<AgentId>,
    /// Agent at the anticipated collision point
    pub anticipation: Option<AgentId>,
}

impl CollisionState {
    /// Record a zone enter (`Some`) or exit (`None`) event.
    pub fn set(&mut self, kind: ZoneKind, other: Option<AgentId>) {
        match kind {
            ZoneKind::Front => self.front = other,
            ZoneKind::Back => self.back = other,
            ZoneKind::Anticipation => self.anticipation = other,
        }
    }

    /// Current occupant of a zone.
    pub fn get(&self, kind: ZoneKind) -> Option<AgentId> {
        match kind {
            ZoneKind::Front => self.front,
            ZoneKind::Back => self.back,
            ZoneKind::Anticipation => self.anticipation,
        }
    }
}

/// One simulated bicycle.
#[derive(Debug, Clone)]
pub struct Agent {
    /// Arena handle
    pub id: AgentId,
    /// Display name
    pub name: String,
    /// Controller role
    pub role: AgentRole,
    /// Position on the riding line (before any sideways offset)
    pub position: Vec3,
    /// Unit direction of travel on the ground plane
    pub heading: Vec3,
    /// Current speed in simulation units per second
    pub speed: f32,
    /// Waypoint currently steered toward
    pub destination: Option<Vec3>,
    /// Sideways displacement from the riding line (positive = right)
    pub lateral_offset: f32,
    /// Formation role
    pub formation_state: FormationState,
    /// Agent being drafted, if any
    pub draft_target: Option<AgentId>,
    /// Signed path distance to the draft target, refreshed each tick
    pub path_gap: f32,
    /// Proximity zone occupants
    pub collision: CollisionState,
    /// Furthest clear point found by the last forward scan
    pub anticipation_marker: Vec3,
    /// Index of the course checkpoint being chased
    pub goal_index: usize,
}

impl Agent {
    /// Create an agent at rest.
    pub fn new(id: AgentId, name: impl Into<String>, role: AgentRole, position: Vec3, heading: Vec3) -> Self {
        let heading = flatten(heading).normalize_or_zero();
        Self {
            id,
            name: name.into(),
            role,
            position,
            heading: if heading == Vec3::ZERO { Vec3::Z } else { heading },
            speed: 0.0,
            destination: None,
            lateral_offset: 0.0,
            formation_state: FormationState::Pulling,
            draft_target: None,
            path_gap: 0.0,
            collision: CollisionState::default(),
            anticipation_marker: position,
            goal_index: 0,
        }
    }

    /// Whether the agent is driven by AI rather than telemetry.
    pub fn is_ai(&self) -> bool {
        self.role != AgentRole::Player
    }

    /// Position including the sideways overtake offset.
    pub fn world_position(&self) -> Vec3 {
        self.position + right_of(self.heading) * self.lateral_offset
    }

    /// Velocity vector.
    pub fn velocity(&self) -> Vec3 {
        self.heading * self.speed
    }

    /// Straight-line distance left to the current destination.
    pub fn remaining_distance(&self) -> f32 {
        self.destination
            .map_or(0.0, |d| flatten(d - self.position).length())
    }

    /// Set the pace, never below standstill.
    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    /// Assign the agent to lead (`None`) or to draft `target`.
    pub fn assign_draft_target(&mut self, target: Option<AgentId>) {
        self.formation_state = match target {
            Some(_) => FormationState::Drafting,
            None => FormationState::Pulling,
        };
        self.draft_target = target;
    }

    /// Move toward the destination for `dt` seconds at the current speed.
    ///
    /// Stops on the destination rather than overshooting it.
    pub fn advance(&mut self, dt: f32) {
        let Some(destination) = self.destination else {
            return;
        };

        let to_go = destination - self.position;
        let flat = flatten(to_go);
        let distance = flat.length();
        if distance <= f32::EPSILON {
            return;
        }

        self.heading = flat / distance;
        let step = self.speed * dt;
        if step >= distance {
            self.position = destination;
        } else {
            self.position += to_go * (step / distance);
        }
    }
}

/// Owner of every agent in a session.
#[derive(Debug, Default)]
pub struct AgentArena {
    agents: Vec<Agent>,
}

impl AgentArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an agent and return its handle.
    pub fn spawn(&mut self, name: impl Into<String>, role: AgentRole, position: Vec3, heading: Vec3) -> AgentId {
        let id = AgentId(self.agents.len());
        self.agents.push(Agent::new(id, name, role, position, heading));
        id
    }

    /// Look up an agent.
    pub fn get(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.0)
    }

    /// Look up an agent mutably.
    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents.get_mut(id.0)
    }

    /// All agents in spawn order.
    pub fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.agents.iter()
    }

    /// All agents in spawn order, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.agents.iter_mut()
    }

    /// Every agent handle in spawn order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(|a| a.id).collect()
    }

    /// Handles of agents with the given role, in spawn order.
    pub fn with_role(&self, role: AgentRole) -> Vec<AgentId> {
        self.agents
            .iter()
            .filter(|a| a.role == role)
            .map(|a| a.id)
            .collect()
    }

    /// The human-controlled agent, if one was spawned.
    pub fn player(&self) -> Option<AgentId> {
        self.agents
            .iter()
            .find(|a| a.role == AgentRole::Player)
            .map(|a| a.id)
    }

    /// Number of agents.
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Drop the vertical component.
pub(crate) fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

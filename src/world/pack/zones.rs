//! Proximity zones around each bicycle.
//!
//! Every tick the detector works out which agent occupies each zone of each
//! agent and emits enter/exit events for the changes, which are written into
//! the agent's [`CollisionState`](super::CollisionState).

use glam::Vec3;

use super::{Agent, AgentArena, AgentId, ZoneKind};

/// Zone geometry.
#[derive(Debug, Clone)]
pub struct ZoneSettings {
    /// Reach of the front zone along the heading
    pub front_length: f32,
    /// Reach of the back zone against the heading
    pub back_length: f32,
    /// Half width of the front and back zones
    pub half_width: f32,
    /// Radius of the zone around the anticipation marker
    pub anticipation_radius: f32,
}

impl Default for ZoneSettings {
    fn default() -> Self {
        Self {
            front_length: 7.0,
            back_length: 7.0,
            half_width: 1.0,
            anticipation_radius: 1.0,
        }
    }
}

/// A zone occupancy change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneEvent {
    /// Agent owning the zone
    pub agent: AgentId,
    /// Which zone changed
    pub kind: ZoneKind,
    /// New occupant, `None` on exit
    pub other: Option<AgentId>,
}

/// Zone detector.
#[derive(Debug, Clone, Default)]
pub struct ProximityZones {
    settings: ZoneSettings,
}

impl ProximityZones {
    /// Create a detector.
    pub fn new(settings: ZoneSettings) -> Self {
        Self { settings }
    }

    /// Zone geometry.
    pub fn settings(&self) -> &ZoneSettings {
        &self.settings
    }

    /// Nearest agent inside `kind` zone of `agent`.
    pub fn occupant(&self, arena: &AgentArena, agent: &Agent, kind: ZoneKind) -> Option<AgentId> {
        let origin = agent.world_position();
        let right = crate::world::route::right_of(agent.heading);

        arena
            .iter()
            .filter(|other| other.id != agent.id)
            .filter_map(|other| {
                let offset = other.world_position() - origin;
                let along = offset.dot(agent.heading);
                let across = offset.dot(right).abs();
                let inside = match kind {
                    ZoneKind::Front => {
                        along > 0.0 && along <= self.settings.front_length && across <= self.settings.half_width
                    }
                    ZoneKind::Back => {
                        along < 0.0 && -along <= self.settings.back_length && across <= self.settings.half_width
                    }
                    ZoneKind::Anticipation => {
                        horizontal(other.world_position() - agent.anticipation_marker)
                            <= self.settings.anticipation_radius
                    }
                };
                inside.then_some((offset.length(), other.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, id)| id)
    }

    /// Refresh every agent's zones, returning the changes.
    pub fn update(&self, arena: &mut AgentArena) -> Vec<ZoneEvent> {
        const KINDS: [ZoneKind; 3] = [ZoneKind::Front, ZoneKind::Back, ZoneKind::Anticipation];

        let mut events = Vec::new();
        for agent in arena.iter() {
            for kind in KINDS {
                let other = self.occupant(arena, agent, kind);
                if agent.collision.get(kind) != other {
                    events.push(ZoneEvent {
                        agent: agent.id,
                        kind,
                        other,
                    });
                }
            }
        }

        for event in &events {
            if let Some(agent) = arena.get_mut(event.agent) {
                agent.collision.set(event.kind, event.other);
            }
            tracing::trace!("Zone {:?} of {} -> {:?}", event.kind, event.agent, event.other);
        }
        events
    }
}

fn horizontal(v: Vec3) -> f32 {
    super::flatten(v).length()
}

//! Paceline leadership rotation.

use glam::Vec3;

use super::formation::FormationController;
use super::{AgentArena, AgentId, AgentRole};

/// Default seconds each leader spends on the front.
pub const DEFAULT_PULL_TIME_SECS: f32 = 30.0;

/// Ordered formation of agents taking turns at the front.
///
/// Index 0 leads. Every other member drafts the member directly ahead.
#[derive(Debug, Clone)]
pub struct PacelineScheduler {
    order: Vec<AgentId>,
    pull_time: f32,
    timer: f32,
    rotations: u32,
}

impl Default for PacelineScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PULL_TIME_SECS)
    }
}

impl PacelineScheduler {
    /// Create an empty scheduler rotating every `pull_time` seconds.
    pub fn new(pull_time: f32) -> Self {
        Self {
            order: Vec::new(),
            pull_time: pull_time.max(f32::EPSILON),
            timer: 0.0,
            rotations: 0,
        }
    }

    /// Build the line from every agent whose role is in `roles`, closest to
    /// `origin` first, and assign positions.
    pub fn establish(&mut self, arena: &mut AgentArena, roles: &[AgentRole], origin: Vec3) {
        let mut members: Vec<(f32, AgentId)> = arena
            .iter()
            .filter(|a| roles.contains(&a.role))
            .map(|a| (a.position.distance(origin), a.id))
            .collect();
        members.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        self.order = members.into_iter().map(|(_, id)| id).collect();
        self.timer = 0.0;
        self.rotations = 0;
        self.assign_positions(arena);

        tracing::info!("Paceline established with {} riders", self.order.len());
    }

    /// Refresh every member's formation state and draft target from the order.
    pub fn assign_positions(&self, arena: &mut AgentArena) {
        for (index, id) in self.order.iter().enumerate() {
            let target = index.checked_sub(1).map(|ahead| self.order[ahead]);
            if let Some(agent) = arena.get_mut(*id) {
                agent.assign_draft_target(target);
            }
        }
    }

    /// Send the leader to the back, start its peel-off and reassign positions.
    pub fn rotate(&mut self, arena: &mut AgentArena, formation: &mut FormationController) {
        if self.order.len() < 2 {
            return;
        }

        let leader = self.order.remove(0);
        self.order.push(leader);
        formation.begin_peel_off(leader);
        self.assign_positions(arena);
        self.rotations += 1;

        tracing::info!(
            "Paceline rotation {}: {} peels off, {} leads",
            self.rotations,
            leader,
            self.order[0]
        );
    }

    /// Advance the pull timer, rotating when it runs out.
    ///
    /// Returns whether a rotation happened this tick.
    pub fn tick(&mut self, arena: &mut AgentArena, formation: &mut FormationController, dt: f32) -> bool {
        if self.order.is_empty() {
            return false;
        }

        self.timer += dt;
        if self.timer < self.pull_time {
            return false;
        }
        self.timer -= self.pull_time;
        self.rotate(arena, formation);
        true
    }

    /// Members, leader first.
    pub fn order(&self) -> &[AgentId] {
        &self.order
    }

    /// Current leader.
    pub fn leader(&self) -> Option<AgentId> {
        self.order.first().copied()
    }

    /// Rotations performed since the line was established.
    pub fn rotations(&self) -> u32 {
        self.rotations
    }

    /// Seconds between rotations.
    pub fn pull_time(&self) -> f32 {
        self.pull_time
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the line has no members.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Disband the line.
    pub fn clear(&mut self) {
        self.order.clear();
        self.timer = 0.0;
    }
}

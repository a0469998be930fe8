//! Pull/draft pacing and the peel-off maneuver.
//!
//! A drafting agent regulates its speed against the agent ahead using the
//! path distance between them. Between `gap_min` and `gap_max` it simply
//! matches the target's speed; outside that band it runs a fixed increment
//! faster or slower. The human rider only ever gets the slow-down branch.

use std::collections::HashMap;

use glam::Vec3;

use super::path::PathPlanner;
use super::{Agent, AgentArena, AgentId, AgentRole, PackError, TaskStatus};
use crate::world::navigation::Navigator;

/// Gap band and pacing constants for formations.
#[derive(Debug, Clone)]
pub struct FormationSettings {
    /// Below this gap the follower slows down
    pub gap_min: f32,
    /// Above this gap the follower speeds up
    pub gap_max: f32,
    /// Speed offset used to open or close the gap
    pub pace_increment: f32,
    /// How long a peeled-off leader rides below the line's pace
    pub peel_off_secs: f32,
}

impl Default for FormationSettings {
    fn default() -> Self {
        Self {
            gap_min: 4.0,
            gap_max: 6.0,
            pace_increment: 2.0,
            peel_off_secs: 1.5,
        }
    }
}

/// Speed decision for a drafting agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceDecision {
    /// Target speed plus the increment
    Accelerate,
    /// Target speed minus the increment
    Decelerate,
    /// Exactly the target speed
    Match,
    /// Leave the current speed alone
    Hold,
}

/// Choose how a drafting agent should pace for a given gap.
pub fn pace_decision(role: AgentRole, gap: f32, settings: &FormationSettings) -> PaceDecision {
    match role {
        AgentRole::Player if gap < settings.gap_min => PaceDecision::Decelerate,
        AgentRole::Player => PaceDecision::Hold,
        _ if gap > settings.gap_max => PaceDecision::Accelerate,
        _ if gap < settings.gap_min => PaceDecision::Decelerate,
        _ => PaceDecision::Match,
    }
}

/// Path distance from `agent` to `target`, negative when the target is
/// behind the agent's direction of travel.
pub fn signed_path_gap(nav: &dyn Navigator, agent: &Agent, target: &Agent) -> f32 {
    let distance = nav.path_distance(agent.position, target.position);
    let ahead = (target.position - agent.position).dot(agent.heading);
    if ahead < 0.0 {
        -distance
    } else {
        distance
    }
}

/// Phase of a peel-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeelOffPhase {
    /// Riding below the draft target's pace
    FallingBack,
    /// Waiting for the draft target to be the bike directly ahead
    AwaitingRejoin,
}

/// Timed fall-back of a former leader, followed by a rejoin gate.
#[derive(Debug, Clone)]
pub struct PeelOffTask {
    phase: PeelOffPhase,
    elapsed: f32,
    duration: f32,
    increment: f32,
}

impl PeelOffTask {
    /// Create a peel-off lasting `duration` seconds at `increment` below pace.
    pub fn new(duration: f32, increment: f32) -> Self {
        Self {
            phase: PeelOffPhase::FallingBack,
            elapsed: 0.0,
            duration,
            increment,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> PeelOffPhase {
        self.phase
    }

    /// Advance the maneuver for the agent `id`.
    ///
    /// The draft target is read every tick, so the target assigned by the
    /// rotation that triggered the peel-off is the one the agent rejoins.
    pub fn tick(&mut self, arena: &mut AgentArena, id: AgentId, dt: f32) -> TaskStatus {
        let Some(agent) = arena.get(id) else {
            return TaskStatus::Done;
        };
        let target = agent.draft_target;

        match self.phase {
            PeelOffPhase::FallingBack => {
                let target_speed = target.and_then(|t| arena.get(t)).map(|t| t.speed);
                if let (Some(target_speed), Some(agent)) = (target_speed, arena.get_mut(id)) {
                    agent.set_speed(target_speed - self.increment);
                }
                self.elapsed += dt;
                if self.elapsed >= self.duration {
                    self.phase = PeelOffPhase::AwaitingRejoin;
                }
                TaskStatus::Running
            }
            PeelOffPhase::AwaitingRejoin => {
                if agent.collision.front == target {
                    TaskStatus::Done
                } else {
                    TaskStatus::Running
                }
            }
        }
    }
}

/// Drives pulling and drafting agents.
#[derive(Debug, Default)]
pub struct FormationController {
    settings: FormationSettings,
    peel_offs: HashMap<AgentId, PeelOffTask>,
}

impl FormationController {
    /// Create a controller.
    pub fn new(settings: FormationSettings) -> Self {
        Self {
            settings,
            peel_offs: HashMap::new(),
        }
    }

    /// Formation constants.
    pub fn settings(&self) -> &FormationSettings {
        &self.settings
    }

    /// Ride toward a fixed goal at the current pace.
    pub fn take_pull(
        &mut self,
        arena: &mut AgentArena,
        planner: &mut PathPlanner,
        nav: &dyn Navigator,
        id: AgentId,
        goal: Vec3,
    ) -> Result<(), PackError> {
        let Some(agent) = arena.get_mut(id) else {
            return Ok(());
        };
        planner.set_smoothed_destination(agent, goal, nav)
    }

    /// Follow `target` and regulate speed on the path gap to it.
    ///
    /// The agent only routes to its target while the target is ahead and no
    /// peel-off is running. Otherwise it keeps riding on toward `goal` (its
    /// next checkpoint) and the gap rule slows it until the target comes past.
    /// Without a goal the current route is kept.
    ///
    /// A routing failure is logged and the speed is still regulated, so a
    /// follower never keeps a stale pace just because one replan failed.
    pub fn draft(
        &mut self,
        arena: &mut AgentArena,
        planner: &mut PathPlanner,
        nav: &dyn Navigator,
        id: AgentId,
        target: AgentId,
        goal: Option<Vec3>,
    ) -> Option<PaceDecision> {
        let target_position = arena.get(target)?.position;
        let gap = signed_path_gap(nav, arena.get(id)?, arena.get(target)?);

        let destination = if gap < 0.0 || self.is_peeling_off(id) {
            goal
        } else {
            Some(target_position)
        };
        if let Some(destination) = destination {
            let agent = arena.get_mut(id)?;
            if let Err(err) = planner.set_smoothed_destination(agent, destination, nav) {
                tracing::warn!("Agent {} could not route while drafting {}: {}", id, target, err);
            }
        }

        self.apply_draft_gap(arena, id, target, gap)
    }

    /// Apply the gap-keeping rule for a measured gap.
    ///
    /// Returns `None` when either agent is missing or the agent is still
    /// falling back from a peel-off, which owns its speed meanwhile.
    pub fn apply_draft_gap(
        &mut self,
        arena: &mut AgentArena,
        id: AgentId,
        target: AgentId,
        gap: f32,
    ) -> Option<PaceDecision> {
        let target_speed = arena.get(target)?.speed;
        let agent = arena.get_mut(id)?;
        agent.path_gap = gap;

        if self.is_falling_back(id) {
            return None;
        }

        let decision = pace_decision(agent.role, gap, &self.settings);
        // The rider backs off from their own pace, AI from the target's.
        let reference = match agent.role {
            AgentRole::Player => agent.speed,
            _ => target_speed,
        };
        match decision {
            PaceDecision::Accelerate => agent.set_speed(target_speed + self.settings.pace_increment),
            PaceDecision::Decelerate => agent.set_speed(reference - self.settings.pace_increment),
            PaceDecision::Match => agent.set_speed(target_speed),
            PaceDecision::Hold => {}
        }
        tracing::trace!("Agent {} gap {:.2} -> {:?}", id, gap, decision);
        Some(decision)
    }

    /// Start (or restart) a peel-off for `id`.
    pub fn begin_peel_off(&mut self, id: AgentId) {
        tracing::debug!("Agent {} peeling off", id);
        self.peel_offs.insert(
            id,
            PeelOffTask::new(self.settings.peel_off_secs, self.settings.pace_increment),
        );
    }

    /// Whether `id` has a peel-off in progress.
    pub fn is_peeling_off(&self, id: AgentId) -> bool {
        self.peel_offs.contains_key(&id)
    }

    /// Current peel-off phase for `id`.
    pub fn peel_off_phase(&self, id: AgentId) -> Option<PeelOffPhase> {
        self.peel_offs.get(&id).map(|t| t.phase())
    }

    fn is_falling_back(&self, id: AgentId) -> bool {
        self.peel_off_phase(id) == Some(PeelOffPhase::FallingBack)
    }

    /// Advance every peel-off by one tick.
    pub fn tick(&mut self, arena: &mut AgentArena, dt: f32) {
        self.peel_offs.retain(|id, task| {
            let running = task.tick(arena, *id, dt) == TaskStatus::Running;
            if !running {
                tracing::debug!("Agent {} rejoined the paceline", id);
            }
            running
        });
    }

    /// Drop every in-flight maneuver.
    pub fn clear(&mut self) {
        self.peel_offs.clear();
    }
}

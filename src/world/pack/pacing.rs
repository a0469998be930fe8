//! Race-mode competitor pacing from historical performance.
//!
//! Competitors replay the rider's own past sessions second by second. Each
//! competitor gets a fixed percentage variation, and while a historical
//! heart rate is known the power is scaled against the rider's live heart
//! rate: a rider working harder than last time meets easier competitors.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::{AgentArena, AgentId, AgentRole, PackError, TaskStatus};
use crate::world::physics::{DragProfile, SpeedModel};

/// Per-second power and heart-rate series averaged over past sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Watts per elapsed second
    pub power: Vec<f32>,
    /// Beats per minute per elapsed second (0 = no reading)
    pub heart_rate: Vec<f32>,
}

impl PerformanceProfile {
    /// Create a profile from two series.
    pub fn new(power: Vec<f32>, heart_rate: Vec<f32>) -> Self {
        Self { power, heart_rate }
    }

    /// Seconds covered by both series.
    pub fn len(&self) -> usize {
        self.power.len().min(self.heart_rate.len())
    }

    /// Whether the profile has no usable seconds.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pacing tuning.
#[derive(Debug, Clone)]
pub struct PacingSettings {
    /// Seconds of neutral power prepended to the power series
    pub grace_secs: usize,
    /// Power used during the grace period
    pub grace_power: f32,
    /// Seconds between pacing steps
    pub step_secs: f32,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            grace_secs: 5,
            grace_power: 100.0,
            step_secs: 1.0,
        }
    }
}

/// Draw one variation per competitor, in percent, from a normal
/// distribution centred on zero.
pub fn sample_variations(count: usize, spread_percent: f32, rng: &mut impl Rng) -> Vec<f32> {
    let normal = match Normal::new(0.0f32, spread_percent) {
        Ok(normal) if spread_percent > 0.0 => normal,
        _ => return vec![0.0; count],
    };
    (0..count)
        .map(|_| normal.sample(rng).clamp(-50.0, 50.0))
        .collect()
}

/// Competitor power for one second.
///
/// Applies the competitor's variation, then scales by the signed percentage
/// difference between the rider's live heart rate and the historical one.
/// The heart-rate step is skipped when the historical sample is 0. It is
/// also skipped while the strap has not reported yet (live reading 0): a
/// missing reading would count as a 100% drop and double the power.
pub fn adjusted_power(power: f32, variation_percent: f32, historical_hr: f32, live_hr: f32) -> f32 {
    let adjusted = power * (1.0 + variation_percent / 100.0);
    if historical_hr <= 0.0 || live_hr <= 0.0 {
        return adjusted;
    }
    let difference = (live_hr - historical_hr) / historical_hr;
    adjusted - adjusted * difference
}

#[derive(Debug)]
struct PacingRun {
    competitors: Vec<AgentId>,
    variations: Vec<f32>,
    power: Vec<f32>,
    heart_rate: Vec<f32>,
    second: usize,
    until_next: f32,
}

impl PacingRun {
    fn len(&self) -> usize {
        self.power.len().min(self.heart_rate.len())
    }
}

/// Drives competitor speeds from a performance profile.
#[derive(Debug)]
pub struct CompetitorPacingEngine {
    settings: PacingSettings,
    speed_model: SpeedModel,
    drag: DragProfile,
    run: Option<PacingRun>,
    updates: usize,
}

impl CompetitorPacingEngine {
    /// Create an idle engine.
    pub fn new(settings: PacingSettings, speed_model: SpeedModel, drag: DragProfile) -> Self {
        Self {
            settings,
            speed_model,
            drag,
            run: None,
            updates: 0,
        }
    }

    /// Start a run over every competitor in the arena.
    ///
    /// `variations` must hold exactly one entry per competitor. The power
    /// series is prefixed with the grace period; the run then lasts as long
    /// as the shorter of the two series.
    pub fn start(
        &mut self,
        arena: &AgentArena,
        variations: &[f32],
        profile: Option<&PerformanceProfile>,
    ) -> Result<(), PackError> {
        self.run = None;
        self.updates = 0;

        let competitors = arena.with_role(AgentRole::Competitor);
        if variations.len() != competitors.len() {
            return Err(PackError::ConfigMismatch {
                expected: competitors.len(),
                actual: variations.len(),
            });
        }

        let profile = match profile {
            Some(p) if !p.power.is_empty() => p,
            _ => return Err(PackError::MissingProfile("profile has no power samples".into())),
        };

        let mut power = vec![self.settings.grace_power; self.settings.grace_secs];
        power.extend_from_slice(&profile.power);

        let run = PacingRun {
            competitors,
            variations: variations.to_vec(),
            power,
            heart_rate: profile.heart_rate.clone(),
            second: 0,
            until_next: 0.0,
        };
        tracing::info!(
            "Pacing {} competitors over {} seconds",
            run.competitors.len(),
            run.len()
        );
        self.run = Some(run);
        Ok(())
    }

    /// Apply one second of the profile against the rider's live heart rate.
    pub fn step(&mut self, arena: &mut AgentArena, live_heart_rate: f32) -> TaskStatus {
        let Some(run) = self.run.as_mut() else {
            return TaskStatus::Done;
        };
        if run.second >= run.len() {
            tracing::info!("Pacing run finished after {} seconds", run.second);
            self.run = None;
            return TaskStatus::Done;
        }

        let power = run.power[run.second];
        let historical_hr = run.heart_rate[run.second];
        for (id, variation) in run.competitors.iter().zip(&run.variations) {
            let watts = adjusted_power(power, *variation, historical_hr, live_heart_rate);
            let speed = self.speed_model.speed_for(watts, &self.drag);
            if speed <= 0.0 {
                tracing::debug!("Skipping zero speed for competitor {} at {}s", id, run.second);
                continue;
            }
            if let Some(agent) = arena.get_mut(*id) {
                agent.set_speed(speed);
                self.updates += 1;
            }
        }
        run.second += 1;
        TaskStatus::Running
    }

    /// Advance by `dt` seconds, stepping once per elapsed step interval.
    ///
    /// The first second is applied on the first tick after `start`.
    pub fn tick(&mut self, arena: &mut AgentArena, live_heart_rate: f32, dt: f32) -> TaskStatus {
        let step_secs = self.settings.step_secs.max(f32::EPSILON);
        loop {
            let Some(run) = self.run.as_mut() else {
                return TaskStatus::Done;
            };
            if run.until_next > 0.0 {
                run.until_next -= dt;
                if run.until_next > 0.0 {
                    return TaskStatus::Running;
                }
            }
            run.until_next += step_secs;
            if self.step(arena, live_heart_rate) == TaskStatus::Done {
                return TaskStatus::Done;
            }
            if self.run.as_ref().is_some_and(|r| r.until_next > 0.0) {
                return TaskStatus::Running;
            }
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Seconds consumed by the current run.
    pub fn elapsed_seconds(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.second)
    }

    /// Competitor speed updates applied since the last start.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Abandon the current run.
    pub fn stop(&mut self) {
        self.run = None;
    }
}

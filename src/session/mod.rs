//! Session lifecycle and the simulation tick.
//!
//! A [`Session`] owns every agent and controller for one ride. Collaborators
//! (navigation, telemetry, display, historical profile) are handed in through
//! [`SessionSetup`] and live exactly as long as the session.

pub mod display;

use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recording::recorder::SessionRecorder;
use crate::recording::types::{RecorderError, SessionHeader, SessionLog, SessionSample};
use crate::sensors::telemetry::{TelemetryFrame, TelemetryReceiver, TelemetryState};
use crate::storage::config::AppConfig;
use crate::world::navigation::Navigator;
use crate::world::pack::formation::FormationController;
use crate::world::pack::overtake::OvertakeController;
use crate::world::pack::paceline::PacelineScheduler;
use crate::world::pack::pacing::{sample_variations, CompetitorPacingEngine, PerformanceProfile};
use crate::world::pack::path::{PathPlanner, PathSmoother};
use crate::world::pack::zones::{ProximityZones, ZoneSettings};
use crate::world::pack::{AgentArena, AgentId, AgentRole, FormationState};
use crate::world::physics::{DragProfile, SpeedModel};
use crate::world::route::{Course, TrackNavigator};

pub use display::{format_duration, DisplaySink, HudField, LatestReadout, TracingDisplay};

/// Which scenario a session rides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioMode {
    /// Solo ride
    #[default]
    Baseline,
    /// Paceline with AI teammates
    Cooperative,
    /// Race against AI competitors
    Competitive,
}

impl ScenarioMode {
    /// Role of the AI riders spawned for this scenario.
    pub fn ai_role(&self) -> Option<AgentRole> {
        match self {
            ScenarioMode::Baseline => None,
            ScenarioMode::Cooperative => Some(AgentRole::Teammate),
            ScenarioMode::Competitive => Some(AgentRole::Competitor),
        }
    }
}

impl fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioMode::Baseline => write!(f, "Baseline"),
            ScenarioMode::Cooperative => write!(f, "Cooperative"),
            ScenarioMode::Competitive => write!(f, "Competitive"),
        }
    }
}

impl FromStr for ScenarioMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(ScenarioMode::Baseline),
            "cooperative" => Ok(ScenarioMode::Cooperative),
            "competitive" => Ok(ScenarioMode::Competitive),
            other => Err(format!("unknown scenario mode {:?}", other)),
        }
    }
}

/// Spacing between riders on the start grid.
pub const GRID_SPACING: f32 = 5.0;

/// Line riders up on a track: the player first, AI riders ahead of them in
/// single file.
pub fn spawn_field(track: &TrackNavigator, mode: ScenarioMode, ai_riders: usize) -> AgentArena {
    let mut arena = AgentArena::new();
    let start = GRID_SPACING / 2.0;
    let (position, heading) = track.point_at(start);
    arena.spawn("Rider", AgentRole::Player, position, heading);

    if let Some(role) = mode.ai_role() {
        for i in 0..ai_riders {
            let (position, heading) = track.point_at(start + GRID_SPACING * (i + 1) as f32);
            arena.spawn(format!("{} {}", role, i + 1), role, position, heading);
        }
    }
    arena
}

/// Everything a session depends on.
pub struct SessionSetup {
    /// Configuration
    pub config: AppConfig,
    /// Navigable surface
    pub navigator: Box<dyn Navigator>,
    /// Checkpoints every agent chases
    pub course: Course,
    /// Riders, already placed
    pub arena: AgentArena,
    /// Frames from the trainer and heart-rate strap
    pub telemetry: TelemetryReceiver,
    /// Where readouts go
    pub display: Box<dyn DisplaySink>,
    /// Averaged history for race pacing
    pub profile: Option<PerformanceProfile>,
}

/// One ride.
pub struct Session {
    id: Uuid,
    config: AppConfig,
    navigator: Box<dyn Navigator>,
    course: Course,
    arena: AgentArena,
    telemetry_rx: TelemetryReceiver,
    telemetry: TelemetryState,
    display: Box<dyn DisplaySink>,
    profile: Option<PerformanceProfile>,
    speed_model: SpeedModel,
    drag: DragProfile,
    planner: PathPlanner,
    formation: FormationController,
    overtake: OvertakeController,
    paceline: PacelineScheduler,
    pacing: CompetitorPacingEngine,
    zones: ProximityZones,
    recorder: SessionRecorder,
    elapsed: f32,
    logged_seconds: u32,
    started: bool,
}

impl Session {
    /// Wire a session from its collaborators.
    pub fn new(setup: SessionSetup) -> Self {
        let SessionSetup {
            config,
            navigator,
            course,
            arena,
            telemetry,
            display,
            profile,
        } = setup;

        let smoother = PathSmoother::new(config.pack.smoothing_factor, config.pack.sample_radius);
        let speed_model = config.speed_model();
        let drag = config.physics;

        Self {
            id: Uuid::new_v4(),
            planner: PathPlanner::new(smoother, config.pack.planner()),
            formation: FormationController::new(config.pack.formation()),
            overtake: OvertakeController::new(config.pack.overtake()),
            paceline: PacelineScheduler::new(config.session.pull_time_secs),
            pacing: CompetitorPacingEngine::new(config.pacing(), speed_model.clone(), drag),
            zones: ProximityZones::new(ZoneSettings::default()),
            recorder: SessionRecorder::new(config.recorder()),
            speed_model,
            drag,
            config,
            navigator,
            course,
            arena,
            telemetry_rx: telemetry,
            telemetry: TelemetryState::new(),
            display,
            profile,
            elapsed: 0.0,
            logged_seconds: 0,
            started: false,
        }
    }

    /// Start recording and set up the scenario.
    pub fn begin(&mut self) -> Result<(), RecorderError> {
        let mode = self.config.session.mode;
        self.recorder
            .start(SessionHeader::now(self.config.participant.id.clone(), mode))?;

        let initial_speed = self.config.pack.initial_ai_speed;
        for agent in self.arena.iter_mut().filter(|a| a.is_ai()) {
            agent.set_speed(initial_speed);
        }

        match mode {
            ScenarioMode::Baseline => {}
            ScenarioMode::Cooperative => {
                let origin = self.course.target(0).unwrap_or(Vec3::ZERO);
                self.paceline
                    .establish(&mut self.arena, &[AgentRole::Player, AgentRole::Teammate], origin);
            }
            ScenarioMode::Competitive => self.start_pacing(),
        }

        self.started = true;
        tracing::info!("Session {} started in {} mode", self.id, mode);
        Ok(())
    }

    fn start_pacing(&mut self) {
        let competitors = self.arena.with_role(AgentRole::Competitor).len();
        let variations = if self.config.session.performance_variations.is_empty() {
            sample_variations(
                competitors,
                self.config.session.variation_spread_percent,
                &mut rand::thread_rng(),
            )
        } else {
            self.config.session.performance_variations.clone()
        };

        if let Err(err) = self.pacing.start(&self.arena, &variations, self.profile.as_ref()) {
            tracing::error!("Competitor pacing not started: {}", err);
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        if !self.started {
            return;
        }

        self.apply_telemetry();
        self.zones.update(&mut self.arena);

        for agent in self.arena.iter_mut() {
            agent.goal_index = self.course.advance(agent.goal_index, agent.position);
        }

        match self.config.session.mode {
            ScenarioMode::Cooperative => self.tick_paceline(dt),
            ScenarioMode::Baseline | ScenarioMode::Competitive => self.tick_race(dt),
        }

        self.planner.tick(&mut self.arena, dt);
        for agent in self.arena.iter_mut() {
            agent.advance(dt);
        }

        self.elapsed += dt;
        while self.elapsed >= (self.logged_seconds + 1) as f32 {
            self.log_second();
        }
    }

    fn apply_telemetry(&mut self) {
        let player = self.arena.player();
        for frame in self.telemetry_rx.drain() {
            match frame {
                TelemetryFrame::Bike(raw) => match self.telemetry.process_bike_sample(&raw) {
                    Ok(sample) => {
                        let speed = self.speed_model.speed_for(sample.power, &self.drag);
                        if let Some(agent) = player.and_then(|id| self.arena.get_mut(id)) {
                            agent.set_speed(speed);
                        }
                    }
                    Err(err) => tracing::warn!("Dropped trainer frame: {}", err),
                },
                TelemetryFrame::HeartRate(raw) => {
                    if let Err(err) = self.telemetry.process_heart_rate_sample(&raw) {
                        tracing::warn!("Dropped heart-rate frame: {}", err);
                    }
                }
            }
        }
    }

    fn pull_to_course(&mut self, id: AgentId) {
        let Some(goal) = self
            .arena
            .get(id)
            .and_then(|a| self.course.target(a.goal_index))
        else {
            return;
        };
        if let Err(err) =
            self.formation
                .take_pull(&mut self.arena, &mut self.planner, self.navigator.as_ref(), id, goal)
        {
            tracing::debug!("Agent {} cannot route to checkpoint: {}", id, err);
        }
    }

    fn tick_paceline(&mut self, dt: f32) {
        self.paceline.tick(&mut self.arena, &mut self.formation, dt);
        self.formation.tick(&mut self.arena, dt);

        if self.paceline.len() < 2 {
            if let Some(player) = self.arena.player() {
                self.pull_to_course(player);
            }
            return;
        }

        for id in self.paceline.order().to_vec() {
            let Some((draft_target, goal_index)) = self.arena.get(id).map(|a| (a.draft_target, a.goal_index)) else {
                continue;
            };
            match draft_target {
                Some(target) => {
                    let goal = self.course.target(goal_index);
                    self.formation.draft(
                        &mut self.arena,
                        &mut self.planner,
                        self.navigator.as_ref(),
                        id,
                        target,
                        goal,
                    );
                }
                None => self.pull_to_course(id),
            }
        }
    }

    fn tick_race(&mut self, dt: f32) {
        for id in self.arena.ids() {
            self.pull_to_course(id);
        }

        for id in self.arena.with_role(AgentRole::Competitor) {
            self.overtake
                .try_overtake(&mut self.arena, id, self.planner.remaining_route(id));
        }
        self.overtake.tick(&mut self.arena, dt);

        if self.pacing.is_running() {
            self.pacing.tick(&mut self.arena, self.telemetry.heart_rate, dt);
        }
    }

    fn status_text(&self) -> String {
        let mode = self.config.session.mode;
        let state = self
            .arena
            .player()
            .and_then(|id| self.arena.get(id))
            .map(|player| match (mode, player.formation_state) {
                (ScenarioMode::Cooperative, FormationState::Pulling) => "Pulling",
                (ScenarioMode::Cooperative, FormationState::Drafting) => "Drafting",
                (ScenarioMode::Competitive, _) => "Racing",
                (ScenarioMode::Baseline, _) => "Riding",
            })
            .unwrap_or("Waiting");
        format!("{} - {}", mode, state)
    }

    fn log_second(&mut self) {
        let speed = self.player_speed();
        let sample = SessionSample {
            timestamp: self.logged_seconds,
            power: self.telemetry.power,
            cadence: self.telemetry.cadence,
            speed,
            heart_rate: self.telemetry.heart_rate,
        };
        if let Err(err) = self.recorder.record_sample(sample) {
            tracing::warn!("Sample not recorded: {}", err);
        }

        self.logged_seconds += 1;
        let status = self.status_text();
        display::show_readouts(
            self.display.as_mut(),
            sample.power,
            sample.cadence,
            speed,
            sample.heart_rate,
            self.logged_seconds,
            &status,
        );
    }

    /// End the session and return its log.
    pub fn finish(&mut self) -> Result<SessionLog, RecorderError> {
        self.started = false;
        self.pacing.stop();
        self.formation.clear();
        self.overtake.clear();
        self.paceline.clear();
        tracing::info!("Session {} finished after {} seconds", self.id, self.logged_seconds);
        self.recorder.finish()
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Configuration the session runs with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Every rider in the session.
    pub fn arena(&self) -> &AgentArena {
        &self.arena
    }

    /// Last-known trainer and heart-rate values.
    pub fn telemetry(&self) -> &TelemetryState {
        &self.telemetry
    }

    /// Cooperative line order and rotation count.
    pub fn paceline(&self) -> &PacelineScheduler {
        &self.paceline
    }

    /// Competitor pacing replay.
    pub fn pacing(&self) -> &CompetitorPacingEngine {
        &self.pacing
    }

    /// Peel-offs in progress.
    pub fn formation(&self) -> &FormationController {
        &self.formation
    }

    /// In-flight overtakes.
    pub fn overtake(&self) -> &OvertakeController {
        &self.overtake
    }

    /// Per-second log of the ride.
    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Seconds simulated so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds logged so far.
    pub fn logged_seconds(&self) -> u32 {
        self.logged_seconds
    }

    /// The rider's current speed.
    pub fn player_speed(&self) -> f32 {
        self.arena
            .player()
            .and_then(|id| self.arena.get(id))
            .map_or(0.0, |p| p.speed)
    }

    /// Whether the rider has reached the last checkpoint.
    pub fn player_finished(&self) -> bool {
        self.arena
            .player()
            .and_then(|id| self.arena.get(id))
            .is_some_and(|p| self.course.is_finished(p.goal_index, p.position))
    }
}

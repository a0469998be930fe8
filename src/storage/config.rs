//! Simulator configuration, stored as TOML in the data directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::recording::types::RecorderConfig;
use crate::session::ScenarioMode;
use crate::world::pack::formation::FormationSettings;
use crate::world::pack::overtake::OvertakeSettings;
use crate::world::pack::paceline::DEFAULT_PULL_TIME_SECS;
use crate::world::pack::pacing::PacingSettings;
use crate::world::pack::path::{PlannerSettings, DEFAULT_SMOOTHING_FACTOR, DEFAULT_WAYPOINT_TIMEOUT_SECS};
use crate::world::physics::{DragProfile, SpeedModel};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Who is riding
    pub participant: ParticipantSettings,
    /// Scenario and timing
    pub session: SessionSettings,
    /// AI bicycle behaviour
    pub pack: PackSettings,
    /// Resistance model
    pub physics: DragProfile,
    /// Session logs
    pub recording: RecordingSettings,
}

/// Participant settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantSettings {
    /// Identifier written to and matched against session logs
    pub id: String,
    /// Rider mass in kilograms
    pub rider_mass_kg: f32,
}

impl Default for ParticipantSettings {
    fn default() -> Self {
        Self {
            id: "P01".to_string(),
            rider_mass_kg: 80.0,
        }
    }
}

/// Session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Scenario to ride
    pub mode: ScenarioMode,
    /// Seconds each paceline leader pulls
    pub pull_time_secs: f32,
    /// Simulation ticks per second
    pub tick_rate_hz: u32,
    /// Per-competitor performance variations in percent; drawn at random when empty
    pub performance_variations: Vec<f32>,
    /// Standard deviation for random variations, in percent
    pub variation_spread_percent: f32,
    /// Seconds of neutral power before competitors follow the profile
    pub grace_period_secs: usize,
    /// Power ridden during the grace period
    pub grace_power: f32,
    /// Number of AI riders spawned
    pub ai_riders: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: ScenarioMode::Baseline,
            pull_time_secs: DEFAULT_PULL_TIME_SECS,
            tick_rate_hz: 20,
            performance_variations: Vec::new(),
            variation_spread_percent: 5.0,
            grace_period_secs: 5,
            grace_power: 100.0,
            ai_riders: 3,
        }
    }
}

/// Pack behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PackSettings {
    /// Samples per raw segment minus one (0-100)
    pub smoothing_factor: u32,
    /// Search radius when snapping smoothed points to the surface
    pub sample_radius: f32,
    /// Forward obstacle scan distance
    pub detection_distance: f32,
    /// Lower edge of the drafting gap band
    pub gap_min: f32,
    /// Upper edge of the drafting gap band
    pub gap_max: f32,
    /// Speed offset used to open or close a gap
    pub pace_increment: f32,
    /// Duration of the peel-off slow-down
    pub peel_off_secs: f32,
    /// Sideways overtake displacement
    pub overtake_offset: f32,
    /// Duration of each sideways overtake transition
    pub overtake_secs: f32,
    /// Maximum wait on one waypoint
    pub waypoint_timeout_secs: f32,
    /// Distance at which a waypoint counts as reached
    pub stopping_distance: f32,
    /// Seconds before a route to an unchanged goal is recomputed
    pub replan_interval_secs: f32,
    /// Speed AI riders start at
    pub initial_ai_speed: f32,
}

impl Default for PackSettings {
    fn default() -> Self {
        let formation = FormationSettings::default();
        let overtake = OvertakeSettings::default();
        let planner = PlannerSettings::default();
        Self {
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            sample_radius: crate::world::navigation::DEFAULT_SAMPLE_RADIUS,
            detection_distance: overtake.detection_distance,
            gap_min: formation.gap_min,
            gap_max: formation.gap_max,
            pace_increment: formation.pace_increment,
            peel_off_secs: formation.peel_off_secs,
            overtake_offset: overtake.lateral_offset,
            overtake_secs: overtake.maneuver_secs,
            waypoint_timeout_secs: DEFAULT_WAYPOINT_TIMEOUT_SECS,
            stopping_distance: planner.stopping_distance,
            replan_interval_secs: planner.replan_interval,
            initial_ai_speed: 25.0,
        }
    }
}

impl PackSettings {
    /// Formation constants.
    pub fn formation(&self) -> FormationSettings {
        FormationSettings {
            gap_min: self.gap_min,
            gap_max: self.gap_max,
            pace_increment: self.pace_increment,
            peel_off_secs: self.peel_off_secs,
        }
    }

    /// Overtake constants.
    pub fn overtake(&self) -> OvertakeSettings {
        OvertakeSettings {
            detection_distance: self.detection_distance,
            lateral_offset: self.overtake_offset,
            maneuver_secs: self.overtake_secs,
            ..OvertakeSettings::default()
        }
    }

    /// Route planning constants.
    pub fn planner(&self) -> PlannerSettings {
        PlannerSettings {
            waypoint_timeout: self.waypoint_timeout_secs,
            stopping_distance: self.stopping_distance,
            replan_interval: self.replan_interval_secs,
            ..PlannerSettings::default()
        }
    }
}

/// Session log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Write a CSV log at session end
    pub enabled: bool,
    /// Log directory; relative paths are resolved against the data directory
    pub log_dir: PathBuf,
    /// Rows dropped from the end of each log
    pub trim_trailing: usize,
    /// Maximum power filter (values above this are noise)
    pub max_power_filter: f32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        let recorder = RecorderConfig::default();
        Self {
            enabled: true,
            log_dir: PathBuf::from("logs"),
            trim_trailing: recorder.trim_trailing,
            max_power_filter: recorder.max_power_filter,
        }
    }
}

impl AppConfig {
    /// Load the configuration from the data directory.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&get_config_path())
    }

    /// Load the configuration from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(get_data_dir);

        if !path.exists() {
            tracing::info!("No config at {}, using defaults", path.display());
            return Ok(Self {
                data_dir,
                ..Default::default()
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let mut config: AppConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.data_dir = data_dir;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))
    }

    /// Save the configuration to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&get_config_path())
    }

    /// Reject values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let pack = &self.pack;
        if pack.smoothing_factor > crate::world::pack::path::MAX_SMOOTHING_FACTOR {
            return Err(ConfigError::Invalid(format!(
                "smoothing_factor {} is above 100",
                pack.smoothing_factor
            )));
        }
        if pack.gap_min > pack.gap_max {
            return Err(ConfigError::Invalid(format!(
                "gap band {}..{} is inverted",
                pack.gap_min, pack.gap_max
            )));
        }
        if self.session.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be positive".into()));
        }
        Ok(())
    }

    /// Directory session logs are written to and profiles are read from.
    pub fn log_dir(&self) -> PathBuf {
        if self.recording.log_dir.is_absolute() {
            self.recording.log_dir.clone()
        } else {
            self.data_dir.join(&self.recording.log_dir)
        }
    }

    /// Speed model for the configured rider.
    pub fn speed_model(&self) -> SpeedModel {
        SpeedModel::new(self.participant.rider_mass_kg)
    }

    /// Competitor pacing constants.
    pub fn pacing(&self) -> PacingSettings {
        PacingSettings {
            grace_secs: self.session.grace_period_secs,
            grace_power: self.session.grace_power,
            ..PacingSettings::default()
        }
    }

    /// Recorder configuration.
    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            trim_trailing: self.recording.trim_trailing,
            max_power_filter: self.recording.max_power_filter,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "paceline", "Paceline")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

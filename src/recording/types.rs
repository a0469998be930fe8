//! Recording types for session logs.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metrics::SessionStats;
use crate::session::ScenarioMode;

/// Timestamp format of the log header.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status of the session recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStatus {
    /// Not recording
    #[default]
    Idle,
    /// Actively recording
    Recording,
    /// Finishing up
    Finishing,
}

/// One logged second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSample {
    /// Seconds since session start
    pub timestamp: u32,
    /// Watts
    pub power: f32,
    /// RPM
    pub cadence: f32,
    /// km/h
    pub speed: f32,
    /// BPM, 0 without a strap
    pub heart_rate: f32,
}

/// Header block of a session log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Participant the session belongs to
    pub participant_id: String,
    /// Scenario ridden
    pub scenario_mode: ScenarioMode,
    /// Local start time
    pub date: NaiveDateTime,
}

impl SessionHeader {
    /// Header stamped with the current local time.
    pub fn now(participant_id: impl Into<String>, scenario_mode: ScenarioMode) -> Self {
        Self {
            participant_id: participant_id.into(),
            scenario_mode,
            date: chrono::Local::now().naive_local(),
        }
    }
}

/// A finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLog {
    /// Header block
    pub header: SessionHeader,
    /// Logged seconds
    pub samples: Vec<SessionSample>,
    /// Footer statistics
    pub stats: SessionStats,
}

/// Recorder configuration.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Rows dropped from the end of the log on finish
    pub trim_trailing: usize,
    /// Power above this is treated as noise
    pub max_power_filter: f32,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            trim_trailing: 5,
            max_power_filter: 2000.0,
        }
    }
}

/// Errors from the session recorder.
#[derive(Debug, Error, PartialEq)]
pub enum RecorderError {
    /// Already recording
    #[error("Recording already in progress")]
    AlreadyRecording,

    /// Not currently recording
    #[error("Not currently recording")]
    NotRecording,

    /// Nothing left to save
    #[error("No data recorded")]
    NoData,
}

/// Errors from reading or writing session logs.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export
    #[error("No data to export")]
    NoData,

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A log file did not have the expected layout
    #[error("Malformed log at line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// Errors from building a performance profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The log directory could not be read
    #[error("Cannot read log directory: {0}")]
    Io(#[from] std::io::Error),

    /// No usable log for the participant
    #[error("No session logs found for participant {0}")]
    NoLogs(String),
}

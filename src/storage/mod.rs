//! Configuration storage.

pub mod config;

pub use config::{AppConfig, ConfigError, PackSettings, ParticipantSettings, RecordingSettings, SessionSettings};

//! Paceline - pack dynamics and pacing core for a VR cycling simulator
//!
//! Turns smart-trainer telemetry into rider speed, drives AI bicycles along
//! smoothed routes in drafting formations with rotating leadership and
//! overtakes, and replays historical performance to pace race competitors.

pub mod metrics;
pub mod recording;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod world;

// Re-export commonly used types
pub use metrics::calculator::SessionStatsCalculator;
pub use recording::recorder::SessionRecorder;
pub use sensors::telemetry::TelemetryState;
pub use session::{ScenarioMode, Session, SessionSetup};
pub use storage::config::AppConfig;
pub use world::physics::SpeedModel;

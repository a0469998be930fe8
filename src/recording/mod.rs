//! Session recording, CSV logs and performance profiles.

pub mod exporter_csv;
pub mod profile;
pub mod recorder;
pub mod types;

pub use exporter_csv::{export_csv, export_csv_to_dir, parse_csv, read_csv};
pub use profile::load_profile;
pub use recorder::{LiveSummary, SessionRecorder};
pub use types::{
    ExportError, ProfileError, RecorderConfig, RecorderError, RecordingStatus, SessionHeader,
    SessionLog, SessionSample,
};

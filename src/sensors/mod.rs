//! Rider telemetry from the smart trainer and heart-rate strap.

pub mod ftms;
pub mod telemetry;

pub use telemetry::{
    telemetry_channel, BikeSample, RawFrame, TelemetryError, TelemetryFrame, TelemetryReceiver,
    TelemetrySink, TelemetryState,
};

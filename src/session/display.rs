//! Write-only display collaborator.

use std::collections::BTreeMap;
use std::fmt;

/// Readout slots on the rider's display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HudField {
    Power,
    Cadence,
    Speed,
    HeartRate,
    Duration,
    Status,
}

impl fmt::Display for HudField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HudField::Power => "power",
            HudField::Cadence => "cadence",
            HudField::Speed => "speed",
            HudField::HeartRate => "heart_rate",
            HudField::Duration => "duration",
            HudField::Status => "status",
        };
        f.write_str(name)
    }
}

/// Receives formatted readouts. Nothing flows back into the simulation.
pub trait DisplaySink {
    /// Replace the text shown in `field`.
    fn show(&mut self, field: HudField, text: &str);
}

/// Logs every readout at debug level.
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn show(&mut self, field: HudField, text: &str) {
        tracing::debug!(%field, "{}", text);
    }
}

/// Keeps the latest text per field.
#[derive(Debug, Default, Clone)]
pub struct LatestReadout {
    fields: BTreeMap<HudField, String>,
}

impl LatestReadout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest text for a field.
    pub fn get(&self, field: HudField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// One line with every field, in display order.
    pub fn summary(&self) -> String {
        self.fields
            .iter()
            .map(|(field, text)| format!("{}={}", field, text))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl DisplaySink for LatestReadout {
    fn show(&mut self, field: HudField, text: &str) {
        self.fields.insert(field, text.to_string());
    }
}

/// Format a duration in seconds as M:SS or H:MM:SS.
pub fn format_duration(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Push one second of readouts to a display.
pub fn show_readouts(
    display: &mut dyn DisplaySink,
    power: f32,
    cadence: f32,
    speed: f32,
    heart_rate: f32,
    seconds: u32,
    status: &str,
) {
    display.show(HudField::Power, &format!("{:.0} W", power));
    display.show(HudField::Cadence, &format!("{:.0} rpm", cadence));
    display.show(HudField::Speed, &format!("{:.1} km/h", speed));
    let heart_rate = if heart_rate > 0.0 {
        format!("{:.0} bpm", heart_rate)
    } else {
        "-- bpm".to_string()
    };
    display.show(HudField::HeartRate, &heart_rate);
    display.show(HudField::Duration, &format_duration(seconds));
    display.show(HudField::Status, status);
}

//! Session statistics for the log footer.

use serde::{Deserialize, Serialize};

use crate::metrics::smoothing::best_window_average;
use crate::recording::types::SessionSample;

/// Fraction of the best 60-second power taken as threshold power.
pub const FTP_FACTOR: f32 = 0.75;
/// Window for the threshold power estimate, in samples (seconds).
pub const FTP_WINDOW_SECS: usize = 60;

/// Aggregate statistics of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Logged seconds
    pub duration_secs: u32,
    /// Watts
    pub avg_power: f32,
    /// RPM
    pub avg_cadence: f32,
    /// km/h
    pub avg_speed: f32,
    /// BPM over samples with a reading
    pub avg_heart_rate: f32,
    /// Watts
    pub peak_power: f32,
    /// Estimated functional threshold power in watts
    pub ftp: f32,
    /// Peak heart rate minus final heart rate
    pub hr_recovery: f32,
    /// Average power per heart beat
    pub efficiency_factor: f32,
    /// Kilojoules
    pub total_work_kj: f32,
}

/// Computes [`SessionStats`] from logged samples.
#[derive(Debug, Default)]
pub struct SessionStatsCalculator;

impl SessionStatsCalculator {
    /// Create a calculator.
    pub fn new() -> Self {
        Self
    }

    /// Summarise one-second samples.
    pub fn compute(&self, samples: &[SessionSample]) -> SessionStats {
        if samples.is_empty() {
            return SessionStats::default();
        }

        let count = samples.len() as f32;
        let mean = |f: fn(&SessionSample) -> f32| samples.iter().map(f).sum::<f32>() / count;

        let power: Vec<f32> = samples.iter().map(|s| s.power).collect();
        let heart_rates: Vec<f32> = samples
            .iter()
            .map(|s| s.heart_rate)
            .filter(|hr| *hr > 0.0)
            .collect();

        let avg_power = mean(|s| s.power);
        let avg_heart_rate = if heart_rates.is_empty() {
            0.0
        } else {
            heart_rates.iter().sum::<f32>() / heart_rates.len() as f32
        };
        let peak_hr = heart_rates.iter().copied().fold(0.0, f32::max);
        let final_hr = heart_rates.last().copied().unwrap_or_default();

        SessionStats {
            duration_secs: samples.len() as u32,
            avg_power,
            avg_cadence: mean(|s| s.cadence),
            avg_speed: mean(|s| s.speed),
            avg_heart_rate,
            peak_power: power.iter().copied().fold(0.0, f32::max),
            ftp: best_window_average(&power, FTP_WINDOW_SECS).unwrap_or_default() * FTP_FACTOR,
            hr_recovery: peak_hr - final_hr,
            efficiency_factor: if avg_heart_rate > 0.0 {
                avg_power / avg_heart_rate
            } else {
                0.0
            },
            total_work_kj: power.iter().sum::<f32>() / 1000.0,
        }
    }
}

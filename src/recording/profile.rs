//! Performance profiles built from a participant's earlier session logs.

use std::path::{Path, PathBuf};

use crate::recording::exporter_csv::read_csv;
use crate::recording::types::{ProfileError, SessionSample};
use crate::world::pack::pacing::PerformanceProfile;

/// Column-average every log in `log_dir` whose header names `participant_id`.
///
/// Series are aligned by row index; where logs differ in length, each index
/// is averaged over the logs that reach it. Unreadable logs are skipped.
pub fn load_profile(participant_id: &str, log_dir: &Path) -> Result<PerformanceProfile, ProfileError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map(|ext| ext == "csv").unwrap_or(false))
        .collect();
    paths.sort();

    let mut logs: Vec<Vec<SessionSample>> = Vec::new();
    for path in &paths {
        match read_csv(path) {
            Ok((header, samples)) if header.participant_id == participant_id => {
                if !samples.is_empty() {
                    logs.push(samples);
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("Skipping log {}: {}", path.display(), e),
        }
    }

    if logs.is_empty() {
        return Err(ProfileError::NoLogs(participant_id.to_string()));
    }

    tracing::info!(
        "Built performance profile for {} from {} logs",
        participant_id,
        logs.len()
    );
    Ok(PerformanceProfile::new(
        column_average(&logs, |s| s.power),
        column_average(&logs, |s| s.heart_rate),
    ))
}

fn column_average(logs: &[Vec<SessionSample>], field: fn(&SessionSample) -> f32) -> Vec<f32> {
    let longest = logs.iter().map(Vec::len).max().unwrap_or(0);
    (0..longest)
        .map(|i| {
            let values: Vec<f32> = logs.iter().filter_map(|log| log.get(i).map(field)).collect();
            values.iter().sum::<f32>() / values.len() as f32
        })
        .collect()
}

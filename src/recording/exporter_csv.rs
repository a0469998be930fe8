//! CSV session logs.
//!
//! Layout: a two-line header block (`participantID,scenarioMode,date`), the
//! column line `timestamp,power,cadence,speed,heartRate`, one row per logged
//! second, then a two-line statistics footer.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::recording::types::{ExportError, SessionHeader, SessionLog, SessionSample, DATE_FORMAT};

/// First line of every log.
pub const HEADER_COLUMNS: &str = "participantID,scenarioMode,date";
/// Column line preceding the rows.
pub const SAMPLE_COLUMNS: &str = "timestamp,power,cadence,speed,heartRate";
/// Column line of the statistics footer.
pub const FOOTER_COLUMNS: &str = "averagePower,averageCadence,averageSpeed,averageHeartRate,peakPower,ftp,heartRateRecovery,efficiencyFactor,totalWorkKj";

/// Render a finished session as CSV.
pub fn export_csv(log: &SessionLog) -> Result<String, ExportError> {
    if log.samples.is_empty() {
        return Err(ExportError::NoData);
    }

    let mut output = Vec::new();

    writeln!(output, "{}", HEADER_COLUMNS)?;
    writeln!(
        output,
        "{},{},{}",
        log.header.participant_id,
        log.header.scenario_mode,
        log.header.date.format(DATE_FORMAT)
    )?;

    writeln!(output, "{}", SAMPLE_COLUMNS)?;
    for sample in &log.samples {
        writeln!(
            output,
            "{},{:.0},{:.0},{:.2},{:.0}",
            sample.timestamp, sample.power, sample.cadence, sample.speed, sample.heart_rate
        )?;
    }

    let stats = &log.stats;
    writeln!(output, "{}", FOOTER_COLUMNS)?;
    writeln!(
        output,
        "{:.1},{:.1},{:.2},{:.1},{:.0},{:.1},{:.0},{:.2},{:.1}",
        stats.avg_power,
        stats.avg_cadence,
        stats.avg_speed,
        stats.avg_heart_rate,
        stats.peak_power,
        stats.ftp,
        stats.hr_recovery,
        stats.efficiency_factor,
        stats.total_work_kj,
    )?;

    String::from_utf8(output).map_err(|e| ExportError::Malformed {
        line: 0,
        message: e.to_string(),
    })
}

/// File name for a session log.
pub fn generate_csv_filename(header: &SessionHeader) -> String {
    format!(
        "{}_{}_{}.csv",
        header.participant_id,
        header.scenario_mode,
        header.date.format("%Y%m%d_%H%M%S")
    )
}

/// Write a session log into `directory`, returning the file path.
pub fn export_csv_to_dir(log: &SessionLog, directory: &Path) -> Result<PathBuf, ExportError> {
    let content = export_csv(log)?;
    std::fs::create_dir_all(directory)?;
    let path = directory.join(generate_csv_filename(&log.header));
    std::fs::write(&path, content)?;
    tracing::info!("Wrote session log {}", path.display());
    Ok(path)
}

fn malformed(line: usize, message: impl Into<String>) -> ExportError {
    ExportError::Malformed {
        line,
        message: message.into(),
    }
}

fn parse_field(line: usize, name: &str, value: Option<&str>) -> Result<f32, ExportError> {
    let value = value.ok_or_else(|| malformed(line, format!("missing {}", name)))?;
    value
        .trim()
        .parse::<f32>()
        .map_err(|_| malformed(line, format!("{} {:?} is not a number", name, value)))
}

/// Parse a session log back into its header and rows.
///
/// Reading stops at the footer or the first blank line.
pub fn parse_csv(content: &str) -> Result<(SessionHeader, Vec<SessionSample>), ExportError> {
    let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l.trim()));

    match lines.next() {
        Some((_, HEADER_COLUMNS)) => {}
        _ => return Err(malformed(1, "missing header block")),
    }
    let (line, values) = lines.next().ok_or_else(|| malformed(2, "missing header values"))?;
    let mut fields = values.splitn(3, ',');
    let participant_id = fields.next().unwrap_or_default().to_string();
    let scenario_mode = fields
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|e: String| malformed(line, e))?;
    let date = NaiveDateTime::parse_from_str(fields.next().unwrap_or_default(), DATE_FORMAT)
        .map_err(|e| malformed(line, e.to_string()))?;

    match lines.next() {
        Some((_, SAMPLE_COLUMNS)) => {}
        Some((line, _)) => return Err(malformed(line, "missing sample columns")),
        None => return Err(malformed(line + 1, "missing sample columns")),
    }

    let mut samples = Vec::new();
    for (line, row) in lines {
        if row.is_empty() || row == FOOTER_COLUMNS {
            break;
        }
        let mut cols = row.split(',');
        let timestamp = parse_field(line, "timestamp", cols.next())?;
        samples.push(SessionSample {
            timestamp: timestamp as u32,
            power: parse_field(line, "power", cols.next())?,
            cadence: parse_field(line, "cadence", cols.next())?,
            speed: parse_field(line, "speed", cols.next())?,
            heart_rate: parse_field(line, "heartRate", cols.next())?,
        });
    }

    Ok((
        SessionHeader {
            participant_id,
            scenario_mode,
            date,
        },
        samples,
    ))
}

/// Read and parse a session log file.
pub fn read_csv(path: &Path) -> Result<(SessionHeader, Vec<SessionSample>), ExportError> {
    let content = std::fs::read_to_string(path)?;
    parse_csv(&content)
}

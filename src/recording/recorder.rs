//! Per-second session recorder.

use crate::metrics::{PowerFilter, RollingAverage, SessionStatsCalculator};
use crate::recording::types::{
    RecorderConfig, RecorderError, RecordingStatus, SessionHeader, SessionLog, SessionSample,
};

/// Live figures while a session is being recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSummary {
    /// Seconds logged so far
    pub elapsed_seconds: u32,
    /// 3-second average power
    pub power_3s_avg: f32,
    /// Highest power logged
    pub max_power: f32,
}

/// Records one row per logged second.
#[derive(Debug)]
pub struct SessionRecorder {
    /// Configuration
    config: RecorderConfig,
    /// Current recording status
    status: RecordingStatus,
    /// Header of the session being recorded
    header: Option<SessionHeader>,
    /// Recorded samples
    samples: Vec<SessionSample>,
    /// Spike filter for power
    power_filter: PowerFilter,
    /// 3-second power readout
    power_3s: RollingAverage,
    /// Live summary statistics
    live_summary: LiveSummary,
}

impl SessionRecorder {
    /// Create a new recorder.
    pub fn new(config: RecorderConfig) -> Self {
        let power_filter = PowerFilter::with_max_power(config.max_power_filter);
        Self {
            config,
            status: RecordingStatus::Idle,
            header: None,
            samples: Vec::new(),
            power_filter,
            power_3s: RollingAverage::three_second(),
            live_summary: LiveSummary::default(),
        }
    }

    /// Create a recorder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(RecorderConfig::default())
    }

    /// Start recording a new session.
    pub fn start(&mut self, header: SessionHeader) -> Result<(), RecorderError> {
        if self.status == RecordingStatus::Recording {
            return Err(RecorderError::AlreadyRecording);
        }

        tracing::info!(
            "Started recording {} session for participant {}",
            header.scenario_mode,
            header.participant_id
        );
        self.header = Some(header);
        self.samples.clear();
        self.power_filter.reset();
        self.power_3s.reset();
        self.live_summary = LiveSummary::default();
        self.status = RecordingStatus::Recording;
        Ok(())
    }

    /// Record one second.
    pub fn record_sample(&mut self, sample: SessionSample) -> Result<(), RecorderError> {
        if self.status != RecordingStatus::Recording {
            return Err(RecorderError::NotRecording);
        }

        let sample = SessionSample {
            power: self.power_filter.filter(sample.power),
            ..sample
        };

        self.live_summary.elapsed_seconds = sample.timestamp;
        self.live_summary.power_3s_avg = self.power_3s.add(sample.power);
        self.live_summary.max_power = self.live_summary.max_power.max(sample.power);
        self.samples.push(sample);
        Ok(())
    }

    /// Finish recording.
    ///
    /// Drops the configured number of trailing rows, which are recorded
    /// while the rider is already dismounting, and computes the footer.
    pub fn finish(&mut self) -> Result<SessionLog, RecorderError> {
        if self.status == RecordingStatus::Idle {
            return Err(RecorderError::NotRecording);
        }
        self.status = RecordingStatus::Finishing;

        let header = self.header.take();
        let mut samples = std::mem::take(&mut self.samples);
        self.status = RecordingStatus::Idle;

        let header = header.ok_or(RecorderError::NoData)?;
        let keep = samples.len().saturating_sub(self.config.trim_trailing);
        samples.truncate(keep);
        if samples.is_empty() {
            return Err(RecorderError::NoData);
        }

        let stats = SessionStatsCalculator::new().compute(&samples);
        tracing::info!("Finished recording session with {} samples", samples.len());
        Ok(SessionLog {
            header,
            samples,
            stats,
        })
    }

    /// Discard the current recording.
    pub fn discard(&mut self) {
        self.header = None;
        self.samples.clear();
        self.live_summary = LiveSummary::default();
        self.status = RecordingStatus::Idle;
        tracing::info!("Discarded recording");
    }

    /// Current recording status.
    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    /// Samples recorded so far.
    pub fn samples(&self) -> &[SessionSample] {
        &self.samples
    }

    /// Live summary statistics.
    pub fn live_summary(&self) -> &LiveSummary {
        &self.live_summary
    }
}

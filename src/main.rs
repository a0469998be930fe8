//! Paceline - headless session runner
//!
//! Rides one session on a built-in circuit with a simulated trainer and
//! heart-rate strap, then writes the session log.
//!
//! Usage: `paceline [baseline|cooperative|competitive] [--seconds N]`

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use paceline::recording::{export_csv_to_dir, load_profile};
use paceline::sensors::ftms::{HEART_RATE_MEASUREMENT_UUID, INDOOR_BIKE_DATA_UUID};
use paceline::sensors::telemetry::{telemetry_channel, TelemetryError, TelemetryFrame, TelemetrySink};
use paceline::session::{spawn_field, Session, SessionSetup, TracingDisplay};
use paceline::world::route::{Course, TrackNavigator};
use paceline::{AppConfig, ScenarioMode};

const DEFAULT_DURATION_SECS: u64 = 120;

/// Ride one headless session.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Scenario to ride: baseline, cooperative or competitive (defaults to the configured one)
    mode: Option<ScenarioMode>,
    /// How long to ride, in seconds
    #[arg(short, long, default_value_t = DEFAULT_DURATION_SECS)]
    seconds: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Paceline v{}", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load().context("loading configuration")?;
    if let Some(mode) = cli.mode {
        config.session.mode = mode;
    }
    let duration_secs = cli.seconds;

    let profile = if config.session.mode == ScenarioMode::Competitive {
        match load_profile(&config.participant.id, &config.log_dir()) {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!("No performance profile: {}", err);
                None
            }
        }
    } else {
        None
    };

    let track = TrackNavigator::circuit(200.0, 40.0, 12, 3.0);
    let course = Course::along(&track, 25.0, 3.0);
    let arena = spawn_field(&track, config.session.mode, config.session.ai_riders);
    let (sink, telemetry) = telemetry_channel();

    let tick_rate = config.session.tick_rate_hz.max(1);
    let recording = config.recording.enabled;
    let log_dir = config.log_dir();

    let mut session = Session::new(SessionSetup {
        config,
        navigator: Box::new(track),
        course,
        arena,
        telemetry,
        display: Box::new(TracingDisplay),
        profile,
    });
    session.begin()?;

    let trainer = tokio::spawn(simulated_trainer(sink, duration_secs));

    let dt = 1.0 / tick_rate as f32;
    let mut ticker = tokio::time::interval(Duration::from_secs_f32(dt));
    let total_ticks = duration_secs * tick_rate as u64;
    for _ in 0..total_ticks {
        ticker.tick().await;
        session.tick(dt);
        if session.player_finished() {
            tracing::info!("Rider reached the finish");
            break;
        }
    }
    trainer.abort();

    let log = session.finish()?;
    tracing::info!(
        "Average power {:.0} W, FTP estimate {:.0} W over {} s",
        log.stats.avg_power,
        log.stats.ftp,
        log.stats.duration_secs
    );
    if recording {
        let path = export_csv_to_dir(&log, &log_dir)?;
        tracing::info!("Session log saved to {}", path.display());
    }
    Ok(())
}

/// Feed FTMS and heart-rate notifications at 4 Hz and 1 Hz.
async fn simulated_trainer(sink: TelemetrySink, duration_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    for step in 0..duration_secs * 4 {
        ticker.tick().await;
        let t = step as f32 / 4.0;
        let power = 180.0 + 30.0 * (t / 20.0).sin();
        let cadence = 88.0 + 4.0 * (t / 7.0).sin();

        // Flags 0x0044: instantaneous cadence and power present.
        let mut data = vec![0x44, 0x00];
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&((cadence * 2.0) as u16).to_le_bytes());
        data.extend_from_slice(&(power as i16).to_le_bytes());
        send(&sink, TelemetryFrame::from_characteristic(INDOOR_BIKE_DATA_UUID, data));

        if step % 4 == 0 {
            let heart_rate = (130.0 + t / 4.0).min(175.0) as u8;
            send(
                &sink,
                TelemetryFrame::from_characteristic(HEART_RATE_MEASUREMENT_UUID, vec![0x00, heart_rate]),
            );
        }
    }
}

fn send(sink: &TelemetrySink, frame: Result<TelemetryFrame, TelemetryError>) {
    match frame {
        Ok(frame) => {
            sink.send(frame);
        }
        Err(err) => tracing::warn!("Simulated frame rejected: {}", err),
    }
}

//! End-to-end rides: record, log, profile, race

use paceline::recording::{export_csv_to_dir, load_profile, read_csv};
use paceline::sensors::telemetry::{telemetry_channel, TelemetrySink};
use paceline::session::{spawn_field, DisplaySink, HudField, LatestReadout, Session, SessionSetup};
use paceline::world::pack::pacing::PerformanceProfile;
use paceline::world::pack::AgentRole;
use paceline::world::route::{Course, TrackNavigator};
use paceline::{AppConfig, ScenarioMode};
use tempfile::tempdir;

use crate::sensor_mock::MockSensorData;

const DT: f32 = 0.0625;

fn session(
    config: AppConfig,
    profile: Option<PerformanceProfile>,
    ai_riders: usize,
) -> (Session, TelemetrySink) {
    let track = TrackNavigator::circuit(200.0, 40.0, 12, 3.0);
    let (sink, telemetry) = telemetry_channel();
    let mode = config.session.mode;
    let session = Session::new(SessionSetup {
        config,
        course: Course::along(&track, 25.0, 3.0),
        arena: spawn_field(&track, mode, ai_riders),
        navigator: Box::new(track),
        telemetry,
        display: Box::new(LatestReadout::new()),
        profile,
    });
    (session, sink)
}

fn ride(session: &mut Session, sink: &TelemetrySink, seconds: u32, power: impl Fn(u32) -> u16) {
    let ticks_per_second = (1.0 / DT).round() as u32;
    for second in 0..seconds {
        MockSensorData {
            power: power(second),
            ..Default::default()
        }
        .send(sink);
        for _ in 0..ticks_per_second {
            session.tick(DT);
        }
    }
}

#[test]
fn test_baseline_ride_writes_log() {
    let dir = tempdir().unwrap();
    let mut config = AppConfig::default();
    config.participant.id = "P42".into();
    let (mut session, sink) = session(config, None, 0);
    session.begin().unwrap();

    ride(&mut session, &sink, 20, |s| 150 + s as u16);
    assert!(session.player_speed() > 0.0);
    let travelled = session.arena().get(session.arena().player().unwrap()).unwrap().goal_index;
    assert!(travelled > 0, "rider never reached a checkpoint");

    let log = session.finish().unwrap();
    assert_eq!(log.samples.len(), 15);
    assert_eq!(log.header.participant_id, "P42");
    assert!(log.stats.avg_heart_rate > 0.0);

    let path = export_csv_to_dir(&log, dir.path()).unwrap();
    let (header, samples) = read_csv(&path).unwrap();
    assert_eq!(header.scenario_mode, ScenarioMode::Baseline);
    assert_eq!(samples.len(), log.samples.len());
    assert_eq!(samples[0].heart_rate, 145.0);
}

#[test]
fn test_history_paces_a_race() {
    let dir = tempdir().unwrap();

    // Two earlier rides build the profile.
    for (day, watts) in [180u16, 220].into_iter().enumerate() {
        let mut config = AppConfig::default();
        config.participant.id = "P07".into();
        let (mut session, sink) = session(config, None, 0);
        session.begin().unwrap();
        ride(&mut session, &sink, 15, |_| watts);
        let mut log = session.finish().unwrap();
        log.header.date -= chrono::Duration::days(day as i64 + 1);
        export_csv_to_dir(&log, dir.path()).unwrap();
    }

    let profile = load_profile("P07", dir.path()).unwrap();
    assert!((profile.power[0] - 200.0).abs() < 1e-3);

    let mut config = AppConfig::default();
    config.participant.id = "P07".into();
    config.session.mode = ScenarioMode::Competitive;
    config.session.performance_variations = vec![0.0, 5.0];
    let (mut race, sink) = session(config, Some(profile), 2);
    race.begin().unwrap();
    assert!(race.pacing().is_running());

    ride(&mut race, &sink, 8, |_| 200);
    assert_eq!(race.pacing().updates(), 16);

    let rivals = race.arena().with_role(AgentRole::Competitor);
    let steady = race.arena().get(rivals[0]).unwrap().speed;
    let strong = race.arena().get(rivals[1]).unwrap().speed;
    assert!(strong >= steady);
    assert!(race.arena().iter().all(|a| a.speed > 0.0));
}

#[test]
fn test_race_without_history_still_rides() {
    let mut config = AppConfig::default();
    config.session.mode = ScenarioMode::Competitive;
    config.session.performance_variations = vec![0.0];
    let (mut race, sink) = session(config, None, 1);
    race.begin().unwrap();
    assert!(!race.pacing().is_running());

    ride(&mut race, &sink, 3, |_| 200);
    assert_eq!(race.pacing().updates(), 0);
    assert_eq!(race.logged_seconds(), 3);
}

#[test]
fn test_display_receives_readouts() {
    struct Shared(std::rc::Rc<std::cell::RefCell<LatestReadout>>);

    impl DisplaySink for Shared {
        fn show(&mut self, field: HudField, text: &str) {
            self.0.borrow_mut().show(field, text);
        }
    }

    let readout = std::rc::Rc::new(std::cell::RefCell::new(LatestReadout::new()));
    let track = TrackNavigator::straight(300.0, 3.0);
    let (sink, telemetry) = telemetry_channel();
    let mut session = Session::new(SessionSetup {
        config: AppConfig::default(),
        course: Course::along(&track, 25.0, 3.0),
        arena: spawn_field(&track, ScenarioMode::Baseline, 0),
        navigator: Box::new(track),
        telemetry,
        display: Box::new(Shared(readout.clone())),
        profile: None,
    });
    session.begin().unwrap();
    ride(&mut session, &sink, 2, |_| 200);

    let readout = readout.borrow();
    assert_eq!(readout.get(HudField::Power), Some("200 W"));
    assert_eq!(readout.get(HudField::HeartRate), Some("145 bpm"));
    assert_eq!(readout.get(HudField::Duration), Some("0:02"));
    assert_eq!(readout.get(HudField::Status), Some("Baseline - Riding"));
}

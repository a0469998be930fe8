//! Unit tests for competitor pacing

use glam::Vec3;
use paceline::world::pack::pacing::{
    adjusted_power, sample_variations, CompetitorPacingEngine, PacingSettings, PerformanceProfile,
};
use paceline::world::pack::{AgentArena, AgentRole, PackError, TaskStatus};
use paceline::world::physics::{DragProfile, SpeedModel};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn field(competitors: usize) -> AgentArena {
    let mut arena = AgentArena::new();
    arena.spawn("Rider", AgentRole::Player, Vec3::ZERO, Vec3::Z);
    for i in 0..competitors {
        arena.spawn(format!("Rival {}", i), AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    }
    arena
}

fn no_grace() -> PacingSettings {
    PacingSettings {
        grace_secs: 0,
        ..PacingSettings::default()
    }
}

/// Two variations for three competitors: refused, nothing moves
#[test]
fn test_mismatched_variations_refused() {
    let mut arena = field(3);
    let mut engine = CompetitorPacingEngine::new(PacingSettings::default(), SpeedModel::default(), DragProfile::default());
    let profile = PerformanceProfile::new(vec![200.0; 3], vec![140.0; 3]);

    let result = engine.start(&arena, &[0.1, 0.2], Some(&profile));
    assert_eq!(result, Err(PackError::ConfigMismatch { expected: 3, actual: 2 }));
    assert!(!engine.is_running());
    for _ in 0..10 {
        engine.tick(&mut arena, 150.0, 1.0);
    }
    assert_eq!(engine.updates(), 0);
    assert!(arena.iter().all(|a| a.speed == 0.0));
}

/// Flat 100 W history with no heart rate: three unadjusted updates
#[test]
fn test_three_second_profile() {
    let mut arena = field(1);
    let model = SpeedModel::default();
    let drag = DragProfile::default();
    let mut engine = CompetitorPacingEngine::new(no_grace(), model.clone(), drag);
    let profile = PerformanceProfile::new(vec![100.0, 100.0, 100.0], vec![0.0, 0.0, 0.0]);
    engine.start(&arena, &[0.0], Some(&profile)).unwrap();

    while engine.step(&mut arena, 160.0) == TaskStatus::Running {}
    assert_eq!(engine.updates(), 3);
    let rival = arena.with_role(AgentRole::Competitor)[0];
    assert_eq!(arena.get(rival).unwrap().speed, model.speed_for(100.0, &drag));
}

/// Grace seconds run at the neutral power before the history starts
#[test]
fn test_grace_period_prefix() {
    let mut arena = field(1);
    let model = SpeedModel::default();
    let drag = DragProfile::default();
    let mut engine = CompetitorPacingEngine::new(PacingSettings::default(), model.clone(), drag);
    let profile = PerformanceProfile::new(vec![300.0; 10], vec![0.0; 10]);
    engine.start(&arena, &[0.0], Some(&profile)).unwrap();
    let rival = arena.with_role(AgentRole::Competitor)[0];

    for _ in 0..5 {
        engine.step(&mut arena, 0.0);
        assert_eq!(arena.get(rival).unwrap().speed, model.speed_for(100.0, &drag));
    }
    engine.step(&mut arena, 0.0);
    assert_eq!(arena.get(rival).unwrap().speed, model.speed_for(300.0, &drag));
}

/// A working rider makes competitors ease off, a cruising rider makes them push
#[test]
fn test_live_heart_rate_couples_difficulty() {
    let model = SpeedModel::default();
    let drag = DragProfile::default();
    let profile = PerformanceProfile::new(vec![250.0; 4], vec![150.0; 4]);

    let speed_with = |live_hr: f32| {
        let mut arena = field(1);
        let mut engine = CompetitorPacingEngine::new(no_grace(), model.clone(), drag);
        engine.start(&arena, &[0.0], Some(&profile)).unwrap();
        engine.step(&mut arena, live_hr);
        arena.get(arena.with_role(AgentRole::Competitor)[0]).unwrap().speed
    };

    assert!(speed_with(175.0) < speed_with(150.0));
    assert!(speed_with(125.0) > speed_with(150.0));
}

/// Zero-power seconds leave the previous speed in place
#[test]
fn test_zero_power_second_skipped() {
    let mut arena = field(1);
    let mut engine = CompetitorPacingEngine::new(no_grace(), SpeedModel::default(), DragProfile::default());
    let profile = PerformanceProfile::new(vec![180.0, 0.0, 180.0], vec![0.0; 3]);
    engine.start(&arena, &[0.0], Some(&profile)).unwrap();
    let rival = arena.with_role(AgentRole::Competitor)[0];

    engine.step(&mut arena, 0.0);
    let before = arena.get(rival).unwrap().speed;
    engine.step(&mut arena, 0.0);
    assert_eq!(arena.get(rival).unwrap().speed, before);
    assert_eq!(engine.updates(), 1);
}

/// Before the strap reports, competitors ride the history unscaled
#[test]
fn test_missing_live_heart_rate_keeps_history_power() {
    let model = SpeedModel::default();
    let drag = DragProfile::default();
    let mut arena = field(1);
    let mut engine = CompetitorPacingEngine::new(no_grace(), model.clone(), drag);
    let profile = PerformanceProfile::new(vec![250.0; 4], vec![150.0; 4]);
    engine.start(&arena, &[0.0], Some(&profile)).unwrap();

    engine.step(&mut arena, 0.0);
    let rival = arena.with_role(AgentRole::Competitor)[0];
    assert_eq!(arena.get(rival).unwrap().speed, model.speed_for(250.0, &drag));
    assert_eq!(adjusted_power(250.0, 0.0, 150.0, 0.0), 250.0);
    assert_eq!(adjusted_power(250.0, 0.0, 0.0, 160.0), 250.0);
}

#[test]
fn test_variation_and_feedback_compose() {
    // +10% variation, rider 20% over history.
    let watts = adjusted_power(200.0, 10.0, 100.0, 120.0);
    assert!((watts - 176.0).abs() < 1e-3);
}

#[test]
fn test_sampled_variations_are_bounded() {
    let mut rng = StdRng::seed_from_u64(7);
    let variations = sample_variations(200, 30.0, &mut rng);
    assert_eq!(variations.len(), 200);
    assert!(variations.iter().all(|v| (-50.0..=50.0).contains(v)));
    assert_eq!(sample_variations(4, 0.0, &mut rng), vec![0.0; 4]);
}

//! Unit tests for the overtake maneuver

use glam::Vec3;
use paceline::world::pack::overtake::{OvertakeController, OvertakePhase, OvertakeSettings};
use paceline::world::pack::{AgentArena, AgentRole};

fn road() -> Vec<Vec3> {
    vec![Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 0.0, 40.0)]
}

/// Triggering again while a maneuver runs leaves exactly one task
#[test]
fn test_retrigger_while_active_is_ignored() {
    let mut arena = AgentArena::new();
    let me = arena.spawn("Me", AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    arena.spawn("Slow", AgentRole::Competitor, Vec3::new(0.0, 0.0, 4.0), Vec3::Z);
    let mut controller = OvertakeController::default();

    assert!(controller.try_overtake(&mut arena, me, &road()));
    controller.tick(&mut arena, 0.1);
    assert!(!controller.try_overtake(&mut arena, me, &road()));
    assert!(!controller.begin(&arena, me, Vec::new()));
    assert_eq!(controller.active_count(), 1);
    assert_eq!(controller.phase(me), Some(OvertakePhase::MovingOut));
}

/// Nothing within the detection distance: no maneuver
#[test]
fn test_clear_road_does_not_trigger() {
    let mut arena = AgentArena::new();
    let me = arena.spawn("Me", AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    arena.spawn("Far", AgentRole::Competitor, Vec3::new(0.0, 0.0, 12.0), Vec3::Z);
    let mut controller = OvertakeController::default();

    assert!(!controller.try_overtake(&mut arena, me, &road()));
    assert_eq!(controller.active_count(), 0);
    // Marker sits at the end of the scanned distance.
    assert!((arena.get(me).unwrap().anticipation_marker.z - 5.0).abs() < 1e-4);
}

/// A longer detection distance sees further up the road
#[test]
fn test_detection_distance_setting() {
    let mut arena = AgentArena::new();
    let me = arena.spawn("Me", AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    arena.spawn("Far", AgentRole::Competitor, Vec3::new(0.0, 0.0, 12.0), Vec3::Z);
    let mut controller = OvertakeController::new(OvertakeSettings {
        detection_distance: 15.0,
        ..OvertakeSettings::default()
    });
    assert!(controller.try_overtake(&mut arena, me, &road()));
}

/// An anticipated collision alone is enough to start passing
#[test]
fn test_anticipated_collision_triggers() {
    let mut arena = AgentArena::new();
    let me = arena.spawn("Me", AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    let other = arena.spawn("Merging", AgentRole::Competitor, Vec3::new(2.5, 0.0, 3.0), Vec3::Z);
    arena.get_mut(me).unwrap().collision.anticipation = Some(other);
    let mut controller = OvertakeController::default();

    assert!(controller.try_overtake(&mut arena, me, &road()));
    assert!(controller.is_overtaking(me));
}

/// The rider moves out by the configured offset and comes back after passing
#[test]
fn test_full_maneuver_returns_to_line() {
    let mut arena = AgentArena::new();
    let me = arena.spawn("Me", AgentRole::Competitor, Vec3::ZERO, Vec3::Z);
    let slow = arena.spawn("Slow", AgentRole::Competitor, Vec3::new(0.0, 0.0, 4.0), Vec3::Z);
    let mut controller = OvertakeController::default();
    assert!(controller.begin(&arena, me, vec![slow]));

    for _ in 0..20 {
        controller.tick(&mut arena, 0.1);
    }
    assert_eq!(controller.phase(me), Some(OvertakePhase::Passing));
    assert!((arena.get(me).unwrap().lateral_offset - 2.0).abs() < 1e-4);

    arena.get_mut(me).unwrap().position = Vec3::new(0.0, 0.0, 6.0);
    for _ in 0..20 {
        controller.tick(&mut arena, 0.1);
    }
    assert!(!controller.is_overtaking(me));
    assert!(arena.get(me).unwrap().lateral_offset.abs() < 1e-4);
}

//! Unit tests for drafting and paceline rotation

use glam::Vec3;
use paceline::world::pack::formation::{FormationController, FormationSettings, PaceDecision};
use paceline::world::pack::paceline::PacelineScheduler;
use paceline::world::pack::path::{PathPlanner, PathSmoother, PlannerSettings};
use paceline::world::pack::{AgentArena, AgentId, AgentRole, FormationState};
use paceline::world::route::TrackNavigator;

fn planner() -> PathPlanner {
    PathPlanner::new(PathSmoother::default(), PlannerSettings::default())
}

fn assert_line_invariant(arena: &AgentArena, order: &[AgentId]) {
    for (i, id) in order.iter().enumerate() {
        let agent = arena.get(*id).unwrap();
        if i == 0 {
            assert_eq!(agent.draft_target, None);
            assert_eq!(agent.formation_state, FormationState::Pulling);
        } else {
            assert_eq!(agent.draft_target, Some(order[i - 1]));
            assert_eq!(agent.formation_state, FormationState::Drafting);
        }
    }
}

/// Gap measured along the track, held at 5, converges to the target's speed in one tick
#[test]
fn test_draft_dead_zone_on_track() {
    let track = TrackNavigator::straight(100.0, 3.0);
    let mut arena = AgentArena::new();
    let target = arena.spawn("Ahead", AgentRole::Teammate, Vec3::new(0.0, 0.0, 15.0), Vec3::Z);
    let me = arena.spawn("Me", AgentRole::Teammate, Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
    arena.get_mut(target).unwrap().set_speed(24.0);
    arena.get_mut(me).unwrap().set_speed(31.0);

    let mut controller = FormationController::default();
    let mut planner = planner();
    for _ in 0..5 {
        let decision = controller.draft(&mut arena, &mut planner, &track, me, target, None);
        assert_eq!(decision, Some(PaceDecision::Match));
        assert_eq!(arena.get(me).unwrap().speed, 24.0);
        assert!((arena.get(me).unwrap().path_gap - 5.0).abs() < 1e-3);
    }
}

/// A target behind the agent gives a negative gap, so the agent drops back
/// while still riding forward to its checkpoint
#[test]
fn test_target_behind_slows_agent_and_keeps_heading() {
    let track = TrackNavigator::straight(100.0, 3.0);
    let mut arena = AgentArena::new();
    let target = arena.spawn("Behind", AgentRole::Teammate, Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
    let me = arena.spawn("Me", AgentRole::Teammate, Vec3::new(0.0, 0.0, 20.0), Vec3::Z);
    arena.get_mut(target).unwrap().set_speed(20.0);

    let mut controller = FormationController::default();
    let mut planner = planner();
    let goal = Some(Vec3::new(0.0, 0.0, 50.0));
    let decision = controller.draft(&mut arena, &mut planner, &track, me, target, goal);
    assert_eq!(decision, Some(PaceDecision::Decelerate));
    assert!(arena.get(me).unwrap().path_gap < 0.0);
    assert_eq!(arena.get(me).unwrap().speed, 18.0);

    for _ in 0..8 {
        controller.draft(&mut arena, &mut planner, &track, me, target, goal);
        planner.tick(&mut arena, 0.125);
        arena.get_mut(me).unwrap().advance(0.125);
    }
    let agent = arena.get(me).unwrap();
    assert!(agent.position.z > 20.0, "rode backward to {}", agent.position.z);
    assert!(agent.heading.z > 0.99);
    assert!(agent.destination.unwrap().z > 20.0);
}

/// A peel-off keeps the agent on its checkpoint route even with the target ahead
#[test]
fn test_peel_off_routes_to_checkpoint() {
    let track = TrackNavigator::straight(100.0, 3.0);
    let mut arena = AgentArena::new();
    let target = arena.spawn("Ahead", AgentRole::Teammate, Vec3::new(0.0, 0.0, 15.0), Vec3::Z);
    let me = arena.spawn("Me", AgentRole::Teammate, Vec3::new(0.0, 0.0, 10.0), Vec3::Z);
    arena.get_mut(target).unwrap().set_speed(20.0);

    let mut controller = FormationController::default();
    let mut planner = planner();
    controller.begin_peel_off(me);
    let goal = Vec3::new(0.0, 0.0, 60.0);
    assert_eq!(
        controller.draft(&mut arena, &mut planner, &track, me, target, Some(goal)),
        None
    );
    let route = planner.remaining_route(me);
    assert!(!route.is_empty());
    assert!((route[route.len() - 1].z - goal.z).abs() < 0.5);
}

/// Custom band and increment are honoured
#[test]
fn test_custom_band() {
    let mut arena = AgentArena::new();
    let target = arena.spawn("Ahead", AgentRole::Teammate, Vec3::ZERO, Vec3::Z);
    let me = arena.spawn("Me", AgentRole::Teammate, Vec3::ZERO, Vec3::Z);
    arena.get_mut(target).unwrap().set_speed(20.0);

    let mut controller = FormationController::new(FormationSettings {
        gap_min: 2.0,
        gap_max: 3.0,
        pace_increment: 5.0,
        peel_off_secs: 1.0,
    });
    controller.apply_draft_gap(&mut arena, me, target, 4.0);
    assert_eq!(arena.get(me).unwrap().speed, 25.0);
    controller.apply_draft_gap(&mut arena, me, target, 2.5);
    assert_eq!(arena.get(me).unwrap().speed, 20.0);
}

/// Every rotation leaves the leader undrafted and each member drafting the one ahead
#[test]
fn test_rotation_invariant_holds_through_full_cycle() {
    let mut arena = AgentArena::new();
    for i in 0..5 {
        arena.spawn(format!("T{}", i), AgentRole::Teammate, Vec3::new(0.0, 0.0, i as f32 * 5.0), Vec3::Z);
    }
    let mut scheduler = PacelineScheduler::new(30.0);
    let mut formation = FormationController::default();
    scheduler.establish(&mut arena, &[AgentRole::Teammate], Vec3::new(0.0, 0.0, 100.0));
    assert_eq!(scheduler.leader(), Some(AgentId(4)));
    assert_line_invariant(&arena, scheduler.order());

    let initial = scheduler.order().to_vec();
    for _ in 0..5 {
        let leader = scheduler.leader().unwrap();
        scheduler.rotate(&mut arena, &mut formation);
        assert_eq!(*scheduler.order().last().unwrap(), leader);
        assert!(formation.is_peeling_off(leader));
        assert_line_invariant(&arena, scheduler.order());
    }
    assert_eq!(scheduler.order(), initial.as_slice());
    assert_eq!(scheduler.rotations(), 5);
}

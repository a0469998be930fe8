//! Unit tests for the power-to-speed solver

use paceline::world::physics::{DragProfile, SpeedModel, DISPLAY_FACTOR, SPEED_CEILING, SPEED_STEP};

fn profiles() -> Vec<DragProfile> {
    vec![
        DragProfile::default(),
        DragProfile {
            drag_coefficient: 0.63,
            frontal_area: 0.4,
            rolling_resistance: 0.003,
            bike_mass_kg: 7.0,
        },
        DragProfile {
            drag_coefficient: 1.1,
            frontal_area: 0.6,
            rolling_resistance: 0.008,
            bike_mass_kg: 14.0,
        },
    ]
}

/// More power never means less speed, whatever the resistance parameters
#[test]
fn test_speed_monotonic_in_power() {
    let model = SpeedModel::new(72.0);
    for profile in profiles() {
        let speeds: Vec<f32> = (0..=100).map(|i| model.speed_for(i as f32 * 10.0, &profile)).collect();
        for pair in speeds.windows(2) {
            assert!(pair[0] <= pair[1], "{:?} not monotonic: {:?}", profile, pair);
        }
    }
}

/// The explicit-parameter and profile entry points agree
#[test]
fn test_calculate_speed_matches_profile() {
    let model = SpeedModel::default();
    let profile = DragProfile::default();
    let explicit = model.calculate_speed(
        175.0,
        profile.drag_coefficient,
        profile.frontal_area,
        profile.rolling_resistance,
        profile.bike_mass_kg,
    );
    assert_eq!(explicit, model.speed_for(175.0, &profile));
}

/// The solve lands within one step of the exact speed
#[test]
fn test_solution_within_one_step() {
    let model = SpeedModel::new(70.0);
    let profile = DragProfile::default();
    let speed_mps = model.speed_for(250.0, &profile) / DISPLAY_FACTOR;

    let required = |v: f32| {
        model.power_required(
            v,
            profile.drag_coefficient,
            profile.frontal_area,
            profile.rolling_resistance,
            profile.bike_mass_kg,
        )
    };
    assert!(required(speed_mps + 0.001) >= 250.0 - 0.5);
    assert!(required(speed_mps - SPEED_STEP - 0.01) < 250.0);
}

/// Less slippery setups go faster for the same power
#[test]
fn test_lower_drag_is_faster() {
    let model = SpeedModel::default();
    let all = profiles();
    let aero = model.speed_for(220.0, &all[1]);
    let upright = model.speed_for(220.0, &all[2]);
    assert!(aero > upright);
}

/// Absurd power is clamped to the ceiling instead of failing
#[test]
fn test_ceiling() {
    let model = SpeedModel::default();
    let speed = model.speed_for(f32::MAX, &DragProfile::default());
    assert!((speed - SPEED_CEILING * DISPLAY_FACTOR).abs() < 0.01);
}

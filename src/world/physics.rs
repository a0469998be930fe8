//! Power-to-speed model for simulated riders.
//!
//! Converts rider power output into a road speed by balancing pedalling
//! power against aerodynamic drag and rolling resistance on flat ground.

use serde::{Deserialize, Serialize};

/// Physics constants
const AIR_DENSITY: f32 = 1.225; // kg/m³ at sea level
const GRAVITY: f32 = 9.81; // m/s²
const DEFAULT_RIDER_MASS: f32 = 75.0; // kg

/// Trial speed increment for the forward solve (m/s)
pub const SPEED_STEP: f32 = 0.1;
/// Hard speed ceiling for the forward solve (m/s)
pub const SPEED_CEILING: f32 = 50.0;
/// m/s to display units (km/h)
pub const DISPLAY_FACTOR: f32 = 3.6;
/// Decimal places kept in the returned speed
const DISPLAY_PRECISION: i32 = 2;

/// Resistance parameters of one bike/rider combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragProfile {
    /// Aerodynamic drag coefficient (Cd)
    pub drag_coefficient: f32,
    /// Frontal area in m²
    pub frontal_area: f32,
    /// Rolling resistance coefficient (Crr)
    pub rolling_resistance: f32,
    /// Bike mass in kilograms
    pub bike_mass_kg: f32,
}

impl Default for DragProfile {
    fn default() -> Self {
        Self {
            drag_coefficient: 0.88,
            frontal_area: 0.5,
            rolling_resistance: 0.004,
            bike_mass_kg: 8.0,
        }
    }
}

/// Forward-iterating power/speed solver.
#[derive(Debug, Clone)]
pub struct SpeedModel {
    /// Rider mass in kilograms
    pub rider_mass_kg: f32,
}

impl Default for SpeedModel {
    fn default() -> Self {
        Self {
            rider_mass_kg: DEFAULT_RIDER_MASS,
        }
    }
}

impl SpeedModel {
    /// Create a speed model for a rider of the given mass.
    pub fn new(rider_mass_kg: f32) -> Self {
        Self { rider_mass_kg }
    }

    /// Power in watts needed to hold `speed_mps` against drag and rolling resistance.
    pub fn power_required(
        &self,
        speed_mps: f32,
        drag_coefficient: f32,
        frontal_area: f32,
        rolling_resistance: f32,
        bike_mass_kg: f32,
    ) -> f32 {
        let f_air = 0.5 * AIR_DENSITY * drag_coefficient * frontal_area * speed_mps * speed_mps;
        let f_rolling = rolling_resistance * (bike_mass_kg + self.rider_mass_kg) * GRAVITY;
        (f_air + f_rolling) * speed_mps
    }

    /// Calculate display speed (km/h, two decimals) for a power output.
    ///
    /// Steps the trial speed up from zero in [`SPEED_STEP`] increments until
    /// the power it requires meets `power_watts`. The solve stops at
    /// [`SPEED_CEILING`], which acts as the maximum speed. Non-positive power
    /// yields zero.
    pub fn calculate_speed(
        &self,
        power_watts: f32,
        drag_coefficient: f32,
        frontal_area: f32,
        rolling_resistance: f32,
        bike_mass_kg: f32,
    ) -> f32 {
        let max_steps = (SPEED_CEILING / SPEED_STEP).round() as u32;

        // Integer stepping keeps the trial speeds free of accumulated drift.
        let mut v = 0.0;
        for step in 0..=max_steps {
            v = step as f32 * SPEED_STEP;
            let required = self.power_required(
                v,
                drag_coefficient,
                frontal_area,
                rolling_resistance,
                bike_mass_kg,
            );
            if required >= power_watts {
                break;
            }
        }

        round_to(v * DISPLAY_FACTOR, DISPLAY_PRECISION)
    }

    /// Calculate display speed using a stored drag profile.
    pub fn speed_for(&self, power_watts: f32, profile: &DragProfile) -> f32 {
        self.calculate_speed(
            power_watts,
            profile.drag_coefficient,
            profile.frontal_area,
            profile.rolling_resistance,
            profile.bike_mass_kg,
        )
    }

    /// Update rider mass (e.g., from settings change)
    pub fn set_rider_mass(&mut self, mass_kg: f32) {
        self.rider_mass_kg = mass_kg.clamp(30.0, 200.0);
    }
}

fn round_to(value: f32, places: i32) -> f32 {
    let scale = 10f32.powi(places);
    (value * scale).round() / scale
}

//! Session metrics: rolling averages and end-of-session statistics.

pub mod calculator;
pub mod smoothing;

pub use calculator::{SessionStats, SessionStatsCalculator};
pub use smoothing::{best_window_average, PowerFilter, RollingAverage};

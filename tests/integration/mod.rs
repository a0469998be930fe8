//! Integration test modules.

mod sensor_mock;
mod session_ride_test;

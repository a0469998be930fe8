//! Unit tests for trainer and heart-rate frame parsing

use paceline::sensors::ftms::{
    parse_heart_rate_measurement, parse_indoor_bike_data, HEART_RATE_MEASUREMENT_UUID,
    INDOOR_BIKE_DATA_UUID,
};
use paceline::sensors::telemetry::{RawFrame, TelemetryError, TelemetryFrame, TelemetryState};
use uuid::Uuid;

#[test]
fn test_parse_indoor_bike_data_speed_only() {
    // Flags: 0x0000, speed 2500 = 25.00 km/h
    let data = [0x00, 0x00, 0xC4, 0x09];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert!((result.speed_kmh.unwrap() - 25.0).abs() < 0.01);
    assert!(result.power_watts.is_none());
    assert!(result.cadence_rpm.is_none());
}

#[test]
fn test_parse_indoor_bike_data_cadence_and_power() {
    // Flags: 0x0044, speed 35.00 km/h, cadence 190 = 95 RPM, power 300 W
    let data = [0x44, 0x00, 0xAC, 0x0D, 0xBE, 0x00, 0x2C, 0x01];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert!((result.speed_kmh.unwrap() - 35.0).abs() < 0.01);
    assert_eq!(result.cadence_rpm, Some(95.0));
    assert_eq!(result.power_watts, Some(300.0));
}

#[test]
fn test_parse_indoor_bike_data_skips_optional_fields() {
    // Flags: 0x004A = average speed, average cadence, power
    let data = [0x4A, 0x00, 0xB8, 0x0B, 0x00, 0x00, 0x00, 0x00, 0xC8, 0x00];
    let result = parse_indoor_bike_data(&data).unwrap();
    assert_eq!(result.power_watts, Some(200.0));
    assert!(result.cadence_rpm.is_none());
}

#[test]
fn test_parse_indoor_bike_data_truncated() {
    // Power flagged but missing
    let data = [0x40, 0x00, 0xB8, 0x0B];
    assert!(matches!(
        parse_indoor_bike_data(&data),
        Err(TelemetryError::ParseFailure(_))
    ));
}

#[test]
fn test_parse_heart_rate_widths() {
    assert_eq!(parse_heart_rate_measurement(&[0x00, 72]).unwrap(), 72.0);
    assert_eq!(parse_heart_rate_measurement(&[0x01, 0x2C, 0x01]).unwrap(), 300.0);
    assert!(parse_heart_rate_measurement(&[0x01, 0x2C]).is_err());
}

#[test]
fn test_frame_routing_by_characteristic() {
    assert!(matches!(
        TelemetryFrame::from_characteristic(INDOOR_BIKE_DATA_UUID, vec![0x00, 0x00, 0x00, 0x00]),
        Ok(TelemetryFrame::Bike(_))
    ));
    assert!(matches!(
        TelemetryFrame::from_characteristic(HEART_RATE_MEASUREMENT_UUID, vec![0x00, 60]),
        Ok(TelemetryFrame::HeartRate(_))
    ));
    assert!(matches!(
        TelemetryFrame::from_characteristic(Uuid::nil(), vec![]),
        Err(TelemetryError::UnsupportedCharacteristic(_))
    ));
}

#[test]
fn test_bad_frame_keeps_last_known_values() {
    let mut state = TelemetryState::new();
    state
        .process_bike_sample(&RawFrame::Text("power: 210, cadence: 92".into()))
        .unwrap();
    assert!(state.process_bike_sample(&RawFrame::Bytes(vec![0x44])).is_err());
    assert!(state
        .process_bike_sample(&RawFrame::Text("power: fast".into()))
        .is_err());

    assert_eq!(state.power, 210.0);
    assert_eq!(state.cadence, 92.0);
    assert_eq!(state.rejected, 2);
    assert_eq!(state.bike_samples, 1);
}

#[test]
fn test_heart_rate_text_frames() {
    let mut state = TelemetryState::new();
    assert_eq!(state.process_heart_rate_sample(&RawFrame::Text("148".into())).unwrap(), 148.0);
    assert_eq!(
        state.process_heart_rate_sample(&RawFrame::Text("HR: 151".into())).unwrap(),
        151.0
    );
    assert!(state.process_heart_rate_sample(&RawFrame::Text("".into())).is_err());
    assert_eq!(state.heart_rate, 151.0);
}

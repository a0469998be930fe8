//! Mock trainer and strap feeding the telemetry channel.

use paceline::sensors::ftms::{HEART_RATE_MEASUREMENT_UUID, INDOOR_BIKE_DATA_UUID};
use paceline::sensors::telemetry::{telemetry_channel, TelemetryFrame, TelemetrySink, TelemetryState};

/// Mock sensor data generator for testing.
pub struct MockSensorData {
    /// Current power value
    pub power: u16,
    /// Current cadence (0.5 rpm units)
    pub cadence: u16,
    /// Current speed (0.01 km/h units)
    pub speed: u16,
    /// Current heart rate
    pub heart_rate: u8,
}

impl Default for MockSensorData {
    fn default() -> Self {
        Self {
            power: 200,
            cadence: 180,
            speed: 3000,
            heart_rate: 145,
        }
    }
}

impl MockSensorData {
    /// Indoor Bike Data notification with cadence and power.
    pub fn indoor_bike_data(&self) -> Vec<u8> {
        let mut data = vec![0x44, 0x00];
        data.extend_from_slice(&self.speed.to_le_bytes());
        data.extend_from_slice(&self.cadence.to_le_bytes());
        data.extend_from_slice(&(self.power as i16).to_le_bytes());
        data
    }

    /// Heart Rate Measurement notification, 8-bit value.
    pub fn heart_rate_measurement(&self) -> Vec<u8> {
        vec![0x00, self.heart_rate]
    }

    /// Send one trainer and one strap notification.
    pub fn send(&self, sink: &TelemetrySink) {
        let bike = TelemetryFrame::from_characteristic(INDOOR_BIKE_DATA_UUID, self.indoor_bike_data()).unwrap();
        let hr = TelemetryFrame::from_characteristic(HEART_RATE_MEASUREMENT_UUID, self.heart_rate_measurement())
            .unwrap();
        assert!(sink.send(bike));
        assert!(sink.send(hr));
    }
}

#[test]
fn test_mock_frames_through_channel() {
    let (sink, rx) = telemetry_channel();
    let mock = MockSensorData {
        power: 240,
        cadence: 186,
        ..Default::default()
    };
    mock.send(&sink);

    let mut state = TelemetryState::new();
    for frame in rx.drain() {
        match frame {
            TelemetryFrame::Bike(raw) => {
                state.process_bike_sample(&raw).unwrap();
            }
            TelemetryFrame::HeartRate(raw) => {
                state.process_heart_rate_sample(&raw).unwrap();
            }
        }
    }
    assert_eq!(state.power, 240.0);
    assert_eq!(state.cadence, 93.0);
    assert_eq!(state.heart_rate, 145.0);
}

#[test]
fn test_sink_clones_share_the_channel() {
    let (sink, rx) = telemetry_channel();
    let other = sink.clone();
    let handle = std::thread::spawn(move || MockSensorData::default().send(&other));
    MockSensorData::default().send(&sink);
    handle.join().unwrap();
    assert_eq!(rx.drain().len(), 4);
}

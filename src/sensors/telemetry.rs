//! Live rider telemetry.
//!
//! Transports push raw frames into a [`TelemetrySink`] from any thread. The
//! simulation drains them once per tick into [`TelemetryState`], which keeps
//! the last good value of every field; a frame that fails to parse is
//! skipped and the previous values stay in place.

use crossbeam::channel::{Receiver, Sender};
use thiserror::Error;
use uuid::Uuid;

use super::ftms::{
    parse_heart_rate_measurement, parse_indoor_bike_data, HEART_RATE_MEASUREMENT_UUID,
    INDOOR_BIKE_DATA_UUID,
};

/// Telemetry decoding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TelemetryError {
    /// The frame was malformed
    #[error("Malformed telemetry frame: {0}")]
    ParseFailure(String),

    /// The frame came from a characteristic the simulator does not read
    #[error("Unsupported characteristic: {0}")]
    UnsupportedCharacteristic(Uuid),
}

/// An undecoded frame as delivered by a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFrame {
    /// BLE notification payload
    Bytes(Vec<u8>),
    /// Text frame such as `Power: 200, Cadence: 90`
    Text(String),
}

/// A frame tagged with the device it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryFrame {
    /// Smart trainer (power, cadence)
    Bike(RawFrame),
    /// Heart-rate strap
    HeartRate(RawFrame),
}

impl TelemetryFrame {
    /// Tag a BLE notification by its characteristic.
    pub fn from_characteristic(characteristic: Uuid, data: Vec<u8>) -> Result<Self, TelemetryError> {
        if characteristic == INDOOR_BIKE_DATA_UUID {
            Ok(Self::Bike(RawFrame::Bytes(data)))
        } else if characteristic == HEART_RATE_MEASUREMENT_UUID {
            Ok(Self::HeartRate(RawFrame::Bytes(data)))
        } else {
            Err(TelemetryError::UnsupportedCharacteristic(characteristic))
        }
    }
}

/// One decoded trainer sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BikeSample {
    /// Watts
    pub power: f32,
    /// RPM
    pub cadence: f32,
}

/// Parse `key: value` pairs separated by commas, semicolons or newlines.
fn text_fields(text: &str) -> Vec<(String, &str)> {
    text.split(|c: char| c == ',' || c == ';' || c == '\n')
        .filter_map(|pair| {
            let (key, value) = pair.split_once(':')?;
            Some((key.trim().to_ascii_lowercase(), value.trim()))
        })
        .collect()
}

fn parse_number(field: &str, value: &str) -> Result<f32, TelemetryError> {
    let number = value
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .parse::<f32>()
        .map_err(|_| TelemetryError::ParseFailure(format!("{} value {:?} is not a number", field, value)))?;
    if !number.is_finite() || number < 0.0 {
        return Err(TelemetryError::ParseFailure(format!("{} value {} out of range", field, number)));
    }
    Ok(number)
}

/// Decode a trainer frame. Fields missing from the frame are `None`.
pub fn parse_bike_frame(raw: &RawFrame) -> Result<(Option<f32>, Option<f32>), TelemetryError> {
    match raw {
        RawFrame::Bytes(data) => {
            let bike = parse_indoor_bike_data(data)?;
            Ok((bike.power_watts.map(|p| p.max(0.0)), bike.cadence_rpm))
        }
        RawFrame::Text(text) => {
            let mut power = None;
            let mut cadence = None;
            for (key, value) in text_fields(text) {
                match key.as_str() {
                    "power" | "watts" => power = Some(parse_number("power", value)?),
                    "cadence" | "rpm" => cadence = Some(parse_number("cadence", value)?),
                    _ => {}
                }
            }
            if power.is_none() && cadence.is_none() {
                return Err(TelemetryError::ParseFailure(format!(
                    "no power or cadence in {:?}",
                    text
                )));
            }
            Ok((power, cadence))
        }
    }
}

/// Decode a heart-rate frame into BPM.
pub fn parse_heart_rate_frame(raw: &RawFrame) -> Result<f32, TelemetryError> {
    match raw {
        RawFrame::Bytes(data) => parse_heart_rate_measurement(data),
        RawFrame::Text(text) => {
            let fields = text_fields(text);
            if fields.is_empty() {
                return parse_number("heart rate", text);
            }
            fields
                .into_iter()
                .find(|(key, _)| matches!(key.as_str(), "heart rate" | "heartrate" | "hr" | "bpm"))
                .map(|(_, value)| parse_number("heart rate", value))
                .unwrap_or_else(|| {
                    Err(TelemetryError::ParseFailure(format!("no heart rate in {:?}", text)))
                })
        }
    }
}

/// Last known rider telemetry.
#[derive(Debug, Clone, Default)]
pub struct TelemetryState {
    /// Watts
    pub power: f32,
    /// RPM
    pub cadence: f32,
    /// BPM, 0 until the strap reports
    pub heart_rate: f32,
    /// Trainer frames applied
    pub bike_samples: u64,
    /// Strap frames applied
    pub heart_rate_samples: u64,
    /// Frames skipped as malformed
    pub rejected: u64,
}

impl TelemetryState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a trainer frame.
    pub fn process_bike_sample(&mut self, raw: &RawFrame) -> Result<BikeSample, TelemetryError> {
        let (power, cadence) = parse_bike_frame(raw).map_err(|e| {
            self.rejected += 1;
            e
        })?;
        if let Some(power) = power {
            self.power = power;
        }
        if let Some(cadence) = cadence {
            self.cadence = cadence;
        }
        self.bike_samples += 1;
        Ok(BikeSample {
            power: self.power,
            cadence: self.cadence,
        })
    }

    /// Apply a heart-rate frame.
    pub fn process_heart_rate_sample(&mut self, raw: &RawFrame) -> Result<f32, TelemetryError> {
        let bpm = parse_heart_rate_frame(raw).map_err(|e| {
            self.rejected += 1;
            e
        })?;
        self.heart_rate = bpm;
        self.heart_rate_samples += 1;
        Ok(bpm)
    }
}

/// Sending half handed to telemetry transports.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    tx: Sender<TelemetryFrame>,
}

impl TelemetrySink {
    /// Queue a frame. Returns false once the simulation side has gone away.
    pub fn send(&self, frame: TelemetryFrame) -> bool {
        self.tx.send(frame).is_ok()
    }

    /// Queue a trainer frame.
    pub fn send_bike(&self, raw: RawFrame) -> bool {
        self.send(TelemetryFrame::Bike(raw))
    }

    /// Queue a heart-rate frame.
    pub fn send_heart_rate(&self, raw: RawFrame) -> bool {
        self.send(TelemetryFrame::HeartRate(raw))
    }
}

/// Receiving half drained by the simulation.
#[derive(Debug)]
pub struct TelemetryReceiver {
    rx: Receiver<TelemetryFrame>,
}

impl TelemetryReceiver {
    /// Take every queued frame without blocking.
    pub fn drain(&self) -> Vec<TelemetryFrame> {
        self.rx.try_iter().collect()
    }
}

/// Create a connected sink/receiver pair.
pub fn telemetry_channel() -> (TelemetrySink, TelemetryReceiver) {
    let (tx, rx) = crossbeam::channel::unbounded();
    (TelemetrySink { tx }, TelemetryReceiver { rx })
}

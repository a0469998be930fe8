//! BLE frame decoding for the smart trainer and heart-rate strap.
//!
//! Indoor Bike Data (0x2AD2) carries speed, cadence and power from the
//! trainer; Heart Rate Measurement (0x2A37) carries the strap reading.

use uuid::Uuid;

use super::telemetry::TelemetryError;

/// Fitness Machine Service UUID (0x1826)
pub const FTMS_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1826_0000_1000_8000_0080_5f9b_34fb);

/// Indoor Bike Data Characteristic UUID (0x2AD2)
pub const INDOOR_BIKE_DATA_UUID: Uuid = Uuid::from_u128(0x0000_2ad2_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Service UUID (0x180D)
pub const HEART_RATE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Measurement UUID (0x2A37)
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);

/// Trainer fields used by the simulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndoorBikeData {
    /// Instantaneous speed in km/h (if present)
    pub speed_kmh: Option<f32>,
    /// Instantaneous cadence in RPM (if present)
    pub cadence_rpm: Option<f32>,
    /// Instantaneous power in watts (if present)
    pub power_watts: Option<f32>,
    /// Heart rate in BPM, for trainers that relay a strap (if present)
    pub heart_rate_bpm: Option<f32>,
}

/// Little-endian reader over a notification payload.
struct Frame<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Frame<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8], TelemetryError> {
        let end = self.offset + len;
        let bytes = self.data.get(self.offset..end).ok_or_else(|| {
            TelemetryError::ParseFailure(format!(
                "{} needs {} bytes at offset {}, frame has {}",
                field,
                len,
                self.offset,
                self.data.len()
            ))
        })?;
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self, field: &str) -> Result<u8, TelemetryError> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16, TelemetryError> {
        let b = self.take(2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i16(&mut self, field: &str) -> Result<i16, TelemetryError> {
        let b = self.take(2, field)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    fn skip(&mut self, len: usize, field: &str) -> Result<(), TelemetryError> {
        self.take(len, field).map(|_| ())
    }
}

/// Parse an Indoor Bike Data notification.
///
/// Fields appear in flag order after the 16-bit flags word. Instantaneous
/// speed is present when the "more data" bit (0) is clear.
pub fn parse_indoor_bike_data(data: &[u8]) -> Result<IndoorBikeData, TelemetryError> {
    let mut frame = Frame::new(data);
    let flags = frame.u16("flags")?;
    let has = |bit: u16| flags & (1 << bit) != 0;
    let mut result = IndoorBikeData::default();

    if !has(0) {
        // 0.01 km/h
        result.speed_kmh = Some(frame.u16("speed")? as f32 / 100.0);
    }
    if has(1) {
        frame.skip(2, "average speed")?;
    }
    if has(2) {
        // 0.5 rpm
        result.cadence_rpm = Some(frame.u16("cadence")? as f32 / 2.0);
    }
    if has(3) {
        frame.skip(2, "average cadence")?;
    }
    if has(4) {
        frame.skip(3, "total distance")?;
    }
    if has(5) {
        frame.skip(2, "resistance level")?;
    }
    if has(6) {
        result.power_watts = Some(frame.i16("power")? as f32);
    }
    if has(7) {
        frame.skip(2, "average power")?;
    }
    if has(8) {
        // Total, per hour, per minute
        frame.skip(5, "expended energy")?;
    }
    if has(9) {
        result.heart_rate_bpm = Some(frame.u8("heart rate")? as f32);
    }

    Ok(result)
}

/// Parse a Heart Rate Measurement notification into BPM.
pub fn parse_heart_rate_measurement(data: &[u8]) -> Result<f32, TelemetryError> {
    let mut frame = Frame::new(data);
    let flags = frame.u8("flags")?;
    let bpm = if flags & 0x01 != 0 {
        frame.u16("heart rate")?
    } else {
        frame.u8("heart rate")? as u16
    };
    Ok(bpm as f32)
}

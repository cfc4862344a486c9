//! Register map and decoding for the D6F-D010A32.
//!
//! The sensor exposes one block of 14 holding registers, read with Modbus
//! function code 3. Offsets 0-7 are signed velocity components scaled by
//! 1/1000; offsets 8, 10, 12, 13 are unsigned velocity magnitudes scaled by
//! 1/1000; offsets 9 and 11 are unsigned angles scaled by 1/100. The table
//! is taken from the vendor protocol as-is rather than re-derived.
//!
//! Decoding is pure and total: any 14-word block decodes to exactly one
//! [`SensorReading`]. Blocks of any other length are rejected upstream as
//! transport failures before they reach this module.

use chrono::Utc;
use serde::Serialize;

/// Number of holding registers in the sensor's data block.
pub const REGISTER_COUNT: usize = 14;

/// Unit tag for all velocity fields.
pub const VELOCITY_UNIT: &str = "m/s";

/// Unit tag for all angle fields.
pub const ANGLE_UNIT: &str = "degrees";

/// Decode a raw register word with the sensor's sign convention.
///
/// The device encodes negative values as `0xFFFF - |value|`, so the inverse
/// is `-(0xFFFF - raw)` for words above `0x7FFF`. This is deliberately not
/// two's complement: `0x8000` decodes to -32767 and `0xFFFF` to 0, matching
/// the sensor bit-for-bit.
pub fn decode_signed(raw: u16) -> i32 {
    if raw > 0x7FFF {
        -(0xFFFF - i32::from(raw))
    } else {
        i32::from(raw)
    }
}

/// One fully decoded sensor sample.
///
/// Immutable once produced; a reading is either fully decoded or never
/// enters the sample buffer at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    /// Instantaneous X velocity, m/s.
    pub ins_velocity_x: f64,
    /// Instantaneous Y velocity, m/s.
    pub ins_velocity_y: f64,
    /// Averaged X velocity, m/s.
    pub ave_velocity_x: f64,
    /// Averaged Y velocity, m/s.
    pub ave_velocity_y: f64,
    /// Maximum X velocity, m/s.
    pub max_velocity_x: f64,
    /// Maximum Y velocity, m/s.
    pub max_velocity_y: f64,
    /// Minimum X velocity, m/s.
    pub min_velocity_x: f64,
    /// Minimum Y velocity, m/s.
    pub min_velocity_y: f64,
    /// Instantaneous velocity magnitude, m/s.
    pub ins_velocity: f64,
    /// Instantaneous flow angle, degrees.
    pub ins_angle: f64,
    /// Averaged velocity magnitude, m/s.
    pub ave_velocity: f64,
    /// Averaged flow angle, degrees.
    pub ave_angle: f64,
    /// Maximum velocity magnitude, m/s.
    pub max_velocity: f64,
    /// Minimum velocity magnitude, m/s.
    pub min_velocity: f64,
    /// Unit of all velocity fields.
    pub velocity_unit: &'static str,
    /// Unit of all angle fields.
    pub angle_unit: &'static str,
    /// Capture time, seconds since the UNIX epoch (UTC), assigned at decode
    /// time.
    pub timestamp: i64,
}

impl SensorReading {
    /// Decode a register block, stamping the reading with the current time.
    pub fn from_registers(words: &[u16; REGISTER_COUNT]) -> Self {
        Self::from_registers_at(words, Utc::now().timestamp())
    }

    /// Decode a register block with an explicit capture timestamp.
    pub fn from_registers_at(words: &[u16; REGISTER_COUNT], timestamp: i64) -> Self {
        Self {
            ins_velocity_x: f64::from(decode_signed(words[0])) / 1000.0,
            ins_velocity_y: f64::from(decode_signed(words[1])) / 1000.0,
            ave_velocity_x: f64::from(decode_signed(words[2])) / 1000.0,
            ave_velocity_y: f64::from(decode_signed(words[3])) / 1000.0,
            max_velocity_x: f64::from(decode_signed(words[4])) / 1000.0,
            max_velocity_y: f64::from(decode_signed(words[5])) / 1000.0,
            min_velocity_x: f64::from(decode_signed(words[6])) / 1000.0,
            min_velocity_y: f64::from(decode_signed(words[7])) / 1000.0,
            ins_velocity: f64::from(words[8]) / 1000.0,
            ins_angle: f64::from(words[9]) / 100.0,
            ave_velocity: f64::from(words[10]) / 1000.0,
            ave_angle: f64::from(words[11]) / 100.0,
            max_velocity: f64::from(words[12]) / 1000.0,
            min_velocity: f64::from(words[13]) / 1000.0,
            velocity_unit: VELOCITY_UNIT,
            angle_unit: ANGLE_UNIT,
            timestamp,
        }
    }
}

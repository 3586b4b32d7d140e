/// Decoding of validated BMS frames into measurement snapshots
use time::OffsetDateTime;

use super::frame::RawFrame;
use crate::models::MeasurementSnapshot;
use crate::utils::{be_uint, round_to};

// Current sign markers
const CURRENT_INACTIVE: u8 = b'X'; // Sensor not fitted or not reporting
const CURRENT_NEGATIVE: u8 = b'-';

// Status byte bits
const STATUS_CELL_COMM_ERROR: u8 = 0b0000_0100;
const STATUS_DISCHARGE_ALLOWED: u8 = 0b0000_0010;
const STATUS_CHARGE_ALLOWED: u8 = 0b0000_0001;

/// Decode a validated frame into a structured snapshot
///
/// Frame layout (big-endian, unsigned unless noted):
/// - Bytes 0-2: Pack voltage (0.005 V resolution)
/// - Bytes 3-5: Charge current (sign byte + 0.125 A magnitude)
/// - Bytes 6-8: Discharge current (sign byte + 0.125 A magnitude)
/// - Bytes 9-11: Pack current (sign byte + 0.125 A magnitude)
/// - Bytes 12-13: Lowest cell voltage (0.005 V), byte 14: its cell number
/// - Bytes 15-16: Highest cell voltage (0.005 V), byte 17: its cell number
/// - Bytes 18-19: Lowest cell temperature (0.857 °C, -232 °C offset), byte 20: its cell number
/// - Bytes 21-22: Highest cell temperature, byte 23: its cell number
/// - Byte 25: Cell count
/// - Byte 30: Status flags (bit 2 comm error, bit 1 discharge allowed, bit 0 charge allowed)
/// - Byte 40: State of charge (%)
/// - Byte 57: Checksum, already verified
///
/// Decoding cannot fail; every byte pattern maps to some measurement.
pub fn decode_frame(frame: &RawFrame, captured_at: OffsetDateTime) -> MeasurementSnapshot {
    let b = frame.bytes();
    let status = b[30];

    MeasurementSnapshot {
        pack_voltage: decode_voltage(&b[0..3]),
        charge_current: decode_current(&b[3..6]),
        discharge_current: decode_current(&b[6..9]),
        pack_current: decode_current(&b[9..12]),
        soc: b[40],
        lowest_cell_voltage: decode_voltage(&b[12..14]),
        lowest_cell_voltage_cell_index: b[14],
        highest_cell_voltage: decode_voltage(&b[15..17]),
        highest_cell_voltage_cell_index: b[17],
        lowest_cell_temperature: decode_temperature(&b[18..20]),
        lowest_cell_temperature_cell_index: b[20],
        highest_cell_temperature: decode_temperature(&b[21..23]),
        highest_cell_temperature_cell_index: b[23],
        cell_count: b[25],
        cell_communication_error: status & STATUS_CELL_COMM_ERROR != 0,
        allowed_to_discharge: status & STATUS_DISCHARGE_ALLOWED != 0,
        allowed_to_charge: status & STATUS_CHARGE_ALLOWED != 0,
        captured_at,
    }
}

/// Voltage: unsigned integer * 0.005 V, rounded to 2 decimals
fn decode_voltage(raw: &[u8]) -> f64 {
    round_to(f64::from(be_uint(raw)) * 0.005, 2)
}

/// Current: sign byte followed by an unsigned 16-bit magnitude * 0.125 A
fn decode_current(raw: &[u8]) -> f64 {
    let sign = match raw[0] {
        CURRENT_INACTIVE => return 0.0,
        CURRENT_NEGATIVE => -1.0,
        _ => 1.0,
    };
    sign * round_to(f64::from(be_uint(&raw[1..3])) * 0.125, 1)
}

/// Temperature: unsigned 16-bit integer * 0.857 - 232 °C, rounded to whole degrees
fn decode_temperature(raw: &[u8]) -> i32 {
    round_to(f64::from(be_uint(raw)) * 0.857 - 232.0, 0) as i32
}

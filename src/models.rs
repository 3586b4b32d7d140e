use serde::{Serialize, Serializer};
use time::OffsetDateTime;

use crate::utils::format_datetime;

/// One decoded telemetry frame from the BMS
///
/// Field names on the wire follow the status page: cell indices are
/// reported as `*_num` and the capture time as `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementSnapshot {
    /// Pack voltage in V
    pub pack_voltage: f64,
    /// Charge current in A, 0 while the sensor is inactive
    pub charge_current: f64,
    /// Discharge current in A, 0 while the sensor is inactive
    pub discharge_current: f64,
    /// Net pack current in A
    pub pack_current: f64,
    /// State of charge in %
    pub soc: u8,
    pub lowest_cell_voltage: f64,
    #[serde(rename = "lowest_cell_voltage_num")]
    pub lowest_cell_voltage_cell_index: u8,
    pub highest_cell_voltage: f64,
    #[serde(rename = "highest_cell_voltage_num")]
    pub highest_cell_voltage_cell_index: u8,
    /// Temperatures in °C, may be negative
    pub lowest_cell_temperature: i32,
    #[serde(rename = "lowest_cell_temperature_num")]
    pub lowest_cell_temperature_cell_index: u8,
    pub highest_cell_temperature: i32,
    #[serde(rename = "highest_cell_temperature_num")]
    pub highest_cell_temperature_cell_index: u8,
    pub cell_count: u8,
    pub cell_communication_error: bool,
    pub allowed_to_charge: bool,
    pub allowed_to_discharge: bool,
    #[serde(rename = "timestamp", serialize_with = "serialize_timestamp")]
    pub captured_at: OffsetDateTime,
}

impl Default for MeasurementSnapshot {
    /// The power-on values of a monitor that has not decoded anything yet.
    fn default() -> Self {
        Self {
            pack_voltage: 0.0,
            charge_current: 0.0,
            discharge_current: 0.0,
            pack_current: 0.0,
            soc: 0,
            lowest_cell_voltage: 0.0,
            lowest_cell_voltage_cell_index: 0,
            highest_cell_voltage: 0.0,
            highest_cell_voltage_cell_index: 0,
            lowest_cell_temperature: 0,
            lowest_cell_temperature_cell_index: 0,
            highest_cell_temperature: 0,
            highest_cell_temperature_cell_index: 0,
            cell_count: 0,
            cell_communication_error: true,
            allowed_to_charge: false,
            allowed_to_discharge: false,
            captured_at: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

fn serialize_timestamp<S>(captured_at: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    s.serialize_str(&format_datetime(captured_at))
}

/// Lifecycle of the serial link to the BMS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

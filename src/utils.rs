/// Utility functions for measurement rounding and timestamp formatting
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for the status endpoint and logging
///
/// Converts an OffsetDateTime to YYYY-MM-DD HH:MM:SS format.
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Round a value to the given number of decimal places
///
/// Rounds the exact stored value, not a rescaled copy of it: 661 * 0.005
/// is stored as 3.30500000000000016 and becomes 3.31. Exact ties go to
/// the even digit, so `0.25` at one decimal becomes `0.2`.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

/// Read a big-endian unsigned integer of up to four bytes
pub fn be_uint(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats_timestamp_with_seconds() {
        let dt = datetime!(2024-03-07 09:05:01 UTC);
        assert_eq!(format_datetime(&dt), "2024-03-07 09:05:01");
    }

    #[test]
    fn rounds_half_to_even() {
        assert_eq!(round_to(0.25, 1), 0.2);
        assert_eq!(round_to(0.375, 1), 0.4);
        assert_eq!(round_to(-0.61, 0), -1.0);
        assert_eq!(round_to(3.384, 2), 3.38);
    }

    #[test]
    fn rounds_stored_value_not_rescaled_copy() {
        // 3.305 is stored slightly above the tie, 3.315 slightly below
        assert_eq!(round_to(661.0 * 0.005, 2), 3.31);
        assert_eq!(round_to(663.0 * 0.005, 2), 3.31);
        assert_eq!(round_to(0.005, 2), 0.01);
        assert_eq!(round_to(2.675, 2), 2.67);
    }

    #[test]
    fn reads_big_endian_integers() {
        assert_eq!(be_uint(&[0, 200, 0]), 51_200);
        assert_eq!(be_uint(&[0x01, 0x0e]), 270);
        assert_eq!(be_uint(&[]), 0);
    }
}

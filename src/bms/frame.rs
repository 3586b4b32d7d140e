/// Fixed-length BMS telemetry frame and its checksum gate
/// Length of one telemetry frame, checksum byte included
pub const FRAME_LEN: usize = 58;

/// Offset of the checksum byte, the sum of all preceding bytes modulo 256
pub const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

/// A frame whose checksum has been verified
///
/// The only way to obtain one is through `TryFrom<[u8; FRAME_LEN]>`, so
/// the decoder never sees unvalidated bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame([u8; FRAME_LEN]);

impl RawFrame {
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }
}

/// Checksum byte did not match the frame contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("checksum mismatch: computed 0x{computed:02x}, received 0x{received:02x}")]
pub struct ChecksumMismatch {
    pub computed: u8,
    pub received: u8,
}

impl TryFrom<[u8; FRAME_LEN]> for RawFrame {
    type Error = ChecksumMismatch;

    fn try_from(bytes: [u8; FRAME_LEN]) -> Result<Self, Self::Error> {
        let computed = checksum(&bytes[..CHECKSUM_OFFSET]);
        let received = bytes[CHECKSUM_OFFSET];
        if computed == received {
            Ok(RawFrame(bytes))
        } else {
            Err(ChecksumMismatch { computed, received })
        }
    }
}

/// Sum of all bytes modulo 256
pub fn checksum(payload: &[u8]) -> u8 {
    payload
        .iter()
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Overwrite the checksum byte so the frame validates
    pub fn sealed(mut bytes: [u8; FRAME_LEN]) -> [u8; FRAME_LEN] {
        bytes[CHECKSUM_OFFSET] = checksum(&bytes[..CHECKSUM_OFFSET]);
        bytes
    }

    /// A realistic frame: 256 V pack, 8 cells, 87 % charged
    pub fn sample_bytes() -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0..12].copy_from_slice(&[0, 200, 0, b'X', 0, 0, b'-', 0, 80, b'+', 0, 40]);
        // 666 * 0.005 = 3.33 V, 676 * 0.005 = 3.38 V
        bytes[12..15].copy_from_slice(&[0x02, 0x9a, 3]);
        bytes[15..18].copy_from_slice(&[0x02, 0xa4, 7]);
        // 270 -> -1 °C, 300 -> 25 °C
        bytes[18..21].copy_from_slice(&[0x01, 0x0e, 2]);
        bytes[21..24].copy_from_slice(&[0x01, 0x2c, 5]);
        bytes[25] = 8;
        bytes[30] = 0b0000_0011;
        bytes[40] = 87;
        sealed(bytes)
    }

    /// Same layout as `sample_bytes` with a different pack voltage
    pub fn sample_bytes_with_pack_voltage(raw: [u8; 3]) -> [u8; FRAME_LEN] {
        let mut bytes = sample_bytes();
        bytes[0..3].copy_from_slice(&raw);
        sealed(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn accepts_frame_with_matching_checksum() {
        let bytes = sample_bytes();
        let frame = RawFrame::try_from(bytes).unwrap();
        assert_eq!(frame.bytes(), &bytes);
    }

    #[test]
    fn rejects_frame_with_wrong_checksum() {
        let mut bytes = sample_bytes();
        bytes[CHECKSUM_OFFSET] = bytes[CHECKSUM_OFFSET].wrapping_add(1);
        let err = RawFrame::try_from(bytes).unwrap_err();
        assert_eq!(err.received, err.computed.wrapping_add(1));
    }

    #[test]
    fn mismatch_reports_both_checksums() {
        let err = ChecksumMismatch {
            computed: 0x0a,
            received: 0xff,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 0x0a, received 0xff"
        );
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn checksum_wraps_modulo_256() {
        assert_eq!(checksum(&[0xff, 0x02]), 0x01);
        assert_eq!(checksum(&[0u8; 57]), 0);
        assert_eq!(checksum(&[0xff; 57]), ((0xff_u32 * 57) % 256) as u8);
    }
}

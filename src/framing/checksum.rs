//! CRC-16-CCITT as used by the receiver's block checksum

use crc::{CRC_16_XMODEM, Crc};

/// CRC-16-CCITT (polynomial 0x1021, initial value 0, no reflection).
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of a frame: the type and length words followed by the payload, i.e. everything
/// after the checksum field itself.
pub fn frame_checksum(type_and_length: &[u8], payload: &[u8]) -> u16 {
    let mut digest = CRC16.digest();
    digest.update(type_and_length);
    digest.update(payload);
    digest.finalize()
}

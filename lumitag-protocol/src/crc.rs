//! Frame checksum
//!
//! The labels expect a reflected CRC-16 with polynomial 0x8408 *seeded with
//! the polynomial itself* (not the 0xFFFF of CRC-16/X-25). This is a legacy
//! firmware quirk; any substitution must be verified bit-exact against
//! captured frames.

/// Reflected polynomial, also used as the seed.
const CRC_POLY: u16 = 0x8408;

/// Compute the protocol checksum over `data`.
///
/// LSB-first, 8 shift/XOR steps per byte. Pure function of its input.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC_POLY;

    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}

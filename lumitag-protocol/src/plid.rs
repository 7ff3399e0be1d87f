//! Device identifier (PLID) derivation
//!
//! Every label carries a printed 17-character barcode. Characters `[2,7)`
//! and `[7,12)` are decimal fields that combine into a 32-bit value from
//! which the 4 wire-format identifier bytes are drawn.

/// Expected barcode length in bytes.
pub const BARCODE_LEN: usize = 17;

/// 4-byte device identifier derived from a label barcode.
///
/// The all-zero identifier is the "unaddressed" sentinel produced for
/// malformed barcodes. It is a valid value on the wire (no label answers
/// to it), so callers that require a real target must check
/// [`DeviceId::is_unaddressed`] themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId([u8; 4]);

impl DeviceId {
    /// The "no device" sentinel.
    pub const UNADDRESSED: Self = Self([0, 0, 0, 0]);

    /// Create an identifier from its raw bytes.
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Derive the identifier from a printed barcode.
    ///
    /// Barcodes of any length other than 17 yield [`DeviceId::UNADDRESSED`].
    /// Each field parses as its leading decimal digits; a field starting
    /// with a non-digit contributes zero. The combination `lo + (hi << 16)`
    /// wraps at 32 bits, matching the label firmware.
    pub fn from_barcode(barcode: &str) -> Self {
        let raw = barcode.as_bytes();
        if raw.len() != BARCODE_LEN {
            return Self::UNADDRESSED;
        }

        let lo = parse_decimal(&raw[2..7]);
        let hi = parse_decimal(&raw[7..12]);
        let id = lo.wrapping_add(hi << 16);

        // Non-sequential byte order matching the wire format
        Self([
            (id >> 8) as u8,
            id as u8,
            (id >> 24) as u8,
            (id >> 16) as u8,
        ])
    }

    /// Whether this is the all-zero "no device" identifier.
    pub fn is_unaddressed(&self) -> bool {
        self.0 == [0, 0, 0, 0]
    }

    /// Identifier bytes in derivation order.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Identifier bytes in the reversed order frames carry them in.
    pub fn wire_bytes(&self) -> [u8; 4] {
        [self.0[3], self.0[2], self.0[1], self.0[0]]
    }
}

/// Parse the leading decimal digits of a fixed field, stopping at the
/// first non-digit. A field with no leading digits is zero.
fn parse_decimal(field: &[u8]) -> u32 {
    let mut value = 0u32;
    for &ch in field {
        if !ch.is_ascii_digit() {
            break;
        }
        value = value * 10 + u32::from(ch - b'0');
    }
    value
}

//! Bluetooth UUIDs for the heart-rate belt protocol.
//!
//! The dongle transmits attribute UUIDs byte-reversed relative to their
//! canonical big-endian form. Constants here are canonical; use
//! [`reverse_uuid16`] to obtain the wire form before comparing against
//! UUID bytes received from the dongle. UUIDs of other lengths (128-bit
//! UUIDs of non-target services) are stored raw and never reversed.

use crate::error::{ParseError, ParseResult};

// --- Declaration / descriptor UUIDs ---

/// GATT primary service declaration, used as the group type for
/// read-by-group-type during service discovery.
pub const PRIMARY_SERVICE: [u8; 2] = [0x28, 0x00];

/// Client characteristic configuration descriptor, written with
/// `[0x01, 0x00]` to enable notifications.
pub const CLIENT_CHARACTERISTIC_CONFIGURATION: [u8; 2] = [0x29, 0x02];

// --- Heart Rate service UUIDs ---

/// Heart Rate service.
pub const HEART_RATE_SERVICE: [u8; 2] = [0x18, 0x0D];

/// Heart Rate Measurement characteristic.
pub const HEART_RATE_MEASUREMENT: [u8; 2] = [0x2A, 0x37];

/// Reverse a canonical 16-bit UUID into the dongle's wire byte order.
///
/// Only 2-byte UUIDs are ever reversed; any other length is a
/// [`ParseError::MalformedUuid`]. With the fixed constants above this can
/// only fail through programmer error.
///
/// # Examples
///
/// ```
/// use hrbelt_types::uuid::{reverse_uuid16, HEART_RATE_SERVICE};
///
/// assert_eq!(reverse_uuid16(&HEART_RATE_SERVICE).unwrap(), [0x0D, 0x18]);
/// ```
pub fn reverse_uuid16(uuid: &[u8]) -> ParseResult<[u8; 2]> {
    match uuid {
        [a, b] => Ok([*b, *a]),
        other => Err(ParseError::MalformedUuid {
            actual: other.len(),
        }),
    }
}

/// Check wire-order UUID bytes against a canonical 16-bit UUID.
///
/// Returns `false` for any wire UUID that is not exactly 2 bytes long, so
/// 128-bit UUIDs encountered during discovery simply never match.
#[must_use]
pub fn wire_matches(wire: &[u8], canonical: &[u8; 2]) -> bool {
    wire.len() == 2 && wire[0] == canonical[1] && wire[1] == canonical[0]
}

/// Render UUID bytes as lowercase hex for display and service keys.
#[must_use]
pub fn uuid_hex(uuid: &[u8]) -> String {
    let mut out = String::with_capacity(uuid.len() * 2);
    for byte in uuid {
        use std::fmt::Write;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_heart_rate_service() {
        assert_eq!(reverse_uuid16(&HEART_RATE_SERVICE).unwrap(), [0x0D, 0x18]);
    }

    #[test]
    fn test_reverse_is_an_involution() {
        let wire = reverse_uuid16(&HEART_RATE_MEASUREMENT).unwrap();
        assert_eq!(reverse_uuid16(&wire).unwrap(), HEART_RATE_MEASUREMENT);
    }

    #[test]
    fn test_reverse_rejects_three_bytes() {
        let err = reverse_uuid16(&[0x01, 0x02, 0x03]).unwrap_err();
        assert!(matches!(err, ParseError::MalformedUuid { actual: 3 }));
    }

    #[test]
    fn test_reverse_rejects_empty_input() {
        assert!(reverse_uuid16(&[]).is_err());
    }

    #[test]
    fn test_wire_matches_reversed_form() {
        assert!(wire_matches(&[0x37, 0x2A], &HEART_RATE_MEASUREMENT));
        assert!(!wire_matches(&[0x2A, 0x37], &HEART_RATE_MEASUREMENT));
    }

    #[test]
    fn test_wire_matches_skips_long_uuids() {
        // 128-bit UUIDs never match a 16-bit constant.
        let long = [0x37, 0x2A, 0x00, 0x00, 0x00, 0x10, 0x80, 0x00];
        assert!(!wire_matches(&long, &HEART_RATE_MEASUREMENT));
    }

    #[test]
    fn test_uuid_hex() {
        assert_eq!(uuid_hex(&[0x0D, 0x18]), "0d18");
        assert_eq!(uuid_hex(&[]), "");
    }

    #[test]
    fn test_constants_are_distinct() {
        assert_ne!(PRIMARY_SERVICE, CLIENT_CHARACTERISTIC_CONFIGURATION);
        assert_ne!(HEART_RATE_SERVICE, HEART_RATE_MEASUREMENT);
    }
}

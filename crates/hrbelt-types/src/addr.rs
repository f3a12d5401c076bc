//! Bluetooth hardware addresses.

use core::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// A 6-byte Bluetooth hardware address.
///
/// Stored in the order the dongle reports it on the wire. The textual form
/// is the usual colon-separated hex, most significant byte first, e.g.
/// `00:18:31:F0:EE:BE`.
///
/// # Examples
///
/// ```
/// use hrbelt_types::BdAddr;
///
/// let addr: BdAddr = "00:18:31:F0:EE:BE".parse().unwrap();
/// assert_eq!(addr.to_string(), "00:18:31:F0:EE:BE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Create an address from bytes in display order (most significant first).
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The raw address bytes in display order.
    #[must_use]
    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }

    /// Create an address from the little-endian byte order the dongle uses
    /// in scan-response and connect commands.
    #[must_use]
    pub fn from_wire(bytes: [u8; 6]) -> Self {
        let mut out = bytes;
        out.reverse();
        Self(out)
    }

    /// The address in the little-endian byte order expected by the dongle's
    /// connect command.
    #[must_use]
    pub fn to_wire(&self) -> [u8; 6] {
        let mut out = self.0;
        out.reverse();
        out
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for BdAddr {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');

        for byte in &mut bytes {
            let part = parts
                .next()
                .ok_or_else(|| ParseError::InvalidAddress(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| ParseError::InvalidAddress(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(ParseError::InvalidAddress(s.to_string()));
        }

        Ok(Self(bytes))
    }
}

impl TryFrom<String> for BdAddr {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BdAddr> for String {
    fn from(addr: BdAddr) -> Self {
        addr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_roundtrip() {
        let addr: BdAddr = "00:18:31:F0:EE:BE".parse().unwrap();
        assert_eq!(addr.bytes(), [0x00, 0x18, 0x31, 0xF0, 0xEE, 0xBE]);
        assert_eq!(addr.to_string(), "00:18:31:F0:EE:BE");
    }

    #[test]
    fn test_parse_lowercase() {
        let addr: BdAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(addr.to_string(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_parse_rejects_short_input() {
        assert!("00:18:31:F0:EE".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_parse_rejects_extra_parts() {
        assert!("00:18:31:F0:EE:BE:01".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("not an address".parse::<BdAddr>().is_err());
        assert!("zz:18:31:F0:EE:BE".parse::<BdAddr>().is_err());
    }

    #[test]
    fn test_wire_order_is_reversed() {
        let addr = BdAddr::new([0x00, 0x18, 0x31, 0xF0, 0xEE, 0xBE]);
        assert_eq!(addr.to_wire(), [0xBE, 0xEE, 0xF0, 0x31, 0x18, 0x00]);
        assert_eq!(BdAddr::from_wire(addr.to_wire()), addr);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_uses_string_form() {
        let addr: BdAddr = "00:18:31:F0:EE:BE".parse().unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"00:18:31:F0:EE:BE\"");

        let back: BdAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}

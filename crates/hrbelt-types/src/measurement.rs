//! Heart Rate Measurement characteristic decoding.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

// Flags byte layout of the Heart Rate Measurement characteristic.
const FLAG_VALUE_U16: u8 = 0x01;
const FLAG_CONTACT_DETECTED: u8 = 0x02;
const FLAG_CONTACT_SUPPORTED: u8 = 0x04;

/// A decoded heart-rate measurement notification.
///
/// Decoding covers the flags byte and the heart-rate value; the optional
/// energy-expended and RR-interval fields that may follow are ignored.
/// This is a deliberate simplification, not a full decoder for the
/// standard characteristic layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HeartRateSample {
    /// Heart rate in beats per minute. The wire value is u8 or u16
    /// little-endian depending on the flags byte; both fit in a `u16`.
    pub bpm: u16,
    /// Whether skin contact is detected, if the sensor reports it at all.
    pub sensor_contact: Option<bool>,
    /// The raw flags byte, kept for diagnostics.
    pub flags: u8,
}

impl HeartRateSample {
    /// Decode a measurement notification payload.
    ///
    /// Byte 0 is the flags bitfield; bit 0 selects an 8-bit or 16-bit
    /// little-endian heart-rate value in the following byte(s).
    ///
    /// # Errors
    ///
    /// [`ParseError::TruncatedMeasurement`] when the payload is shorter
    /// than the minimum required by its flags byte. The caller drops the
    /// sample and continues.
    pub fn from_notification(payload: &[u8]) -> ParseResult<Self> {
        let Some((&flags, rest)) = payload.split_first() else {
            return Err(ParseError::TruncatedMeasurement {
                expected: 2,
                actual: payload.len(),
            });
        };

        let bpm = if flags & FLAG_VALUE_U16 != 0 {
            match rest {
                [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]),
                _ => {
                    return Err(ParseError::TruncatedMeasurement {
                        expected: 3,
                        actual: payload.len(),
                    });
                }
            }
        } else {
            match rest {
                [value, ..] => u16::from(*value),
                _ => {
                    return Err(ParseError::TruncatedMeasurement {
                        expected: 2,
                        actual: payload.len(),
                    });
                }
            }
        };

        let sensor_contact = if flags & FLAG_CONTACT_SUPPORTED != 0 {
            Some(flags & FLAG_CONTACT_DETECTED != 0)
        } else {
            None
        };

        Ok(Self {
            bpm,
            sensor_contact,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_decode_u8_value() {
        let sample = HeartRateSample::from_notification(&[0x00, 72]).unwrap();
        assert_eq!(sample.bpm, 72);
        assert_eq!(sample.sensor_contact, None);
        assert_eq!(sample.flags, 0x00);
    }

    #[test]
    fn test_decode_u16_value_little_endian() {
        let sample = HeartRateSample::from_notification(&[0x01, 0x2C, 0x01]).unwrap();
        assert_eq!(sample.bpm, 300);
    }

    #[test]
    fn test_decode_ignores_trailing_optional_fields() {
        // Energy expended / RR intervals after the value are skipped.
        let sample = HeartRateSample::from_notification(&[0x10, 65, 0x34, 0x02]).unwrap();
        assert_eq!(sample.bpm, 65);
    }

    #[test]
    fn test_decode_sensor_contact_detected() {
        let sample = HeartRateSample::from_notification(&[0x06, 80]).unwrap();
        assert_eq!(sample.sensor_contact, Some(true));
    }

    #[test]
    fn test_decode_sensor_contact_lost() {
        let sample = HeartRateSample::from_notification(&[0x04, 80]).unwrap();
        assert_eq!(sample.sensor_contact, Some(false));
    }

    #[test]
    fn test_decode_empty_payload() {
        let err = HeartRateSample::from_notification(&[]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TruncatedMeasurement {
                expected: 2,
                actual: 0
            }
        ));
    }

    #[test]
    fn test_decode_flags_only() {
        assert!(HeartRateSample::from_notification(&[0x00]).is_err());
    }

    #[test]
    fn test_decode_u16_flag_with_one_value_byte() {
        let err = HeartRateSample::from_notification(&[0x01, 72]).unwrap_err();
        assert!(matches!(
            err,
            ParseError::TruncatedMeasurement {
                expected: 3,
                actual: 2
            }
        ));
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..8)) {
            let _ = HeartRateSample::from_notification(&payload);
        }

        #[test]
        fn prop_minimum_length_matches_flags(flags in any::<u8>(), value in any::<u16>()) {
            let mut payload = vec![flags];
            if flags & 0x01 != 0 {
                payload.extend_from_slice(&value.to_le_bytes());
            } else {
                payload.push(value as u8);
            }

            let sample = HeartRateSample::from_notification(&payload).unwrap();
            if flags & 0x01 != 0 {
                prop_assert_eq!(sample.bpm, value);
            } else {
                prop_assert_eq!(sample.bpm, u16::from(value as u8));
            }

            // One byte short of the minimum must fail.
            payload.pop();
            prop_assert!(HeartRateSample::from_notification(&payload).is_err());
        }
    }
}

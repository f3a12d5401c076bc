//! Error types for hrbelt-core.
//!
//! Only two conditions propagate to the caller as failures: the serial
//! transport refusing to open ([`Error::TransportUnavailable`]) and the
//! fixed-UUID reversal invariant being violated ([`Error::Parse`]).
//! Everything else the protocol can throw at us — non-zero procedure
//! result codes, truncated measurement payloads, unexpected connection
//! loss — is absorbed where it is detected and surfaced only through
//! logging and the observer event channel.

use thiserror::Error;

use hrbelt_types::ParseError;

/// Errors that can occur when running the heart-rate belt protocol.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The serial transport behind the dongle link could not be opened.
    ///
    /// Fatal to [`ConnectionManager::start`](crate::ConnectionManager::start);
    /// there is no retry.
    #[error("Transport unavailable: {reason}")]
    TransportUnavailable {
        /// Description of why the port could not be opened.
        reason: String,
    },

    /// A GATT procedure completed with a non-zero result code.
    ///
    /// Advisory: the discovery state machine keeps going on the assumption
    /// that partial failure for one service is non-fatal to the overall
    /// enumeration. Carried on the observer channel, never returned from
    /// event handling.
    #[error("Procedure completed with result 0x{result:04X} (attribute 0x{att_handle:04X})")]
    Protocol {
        /// The dongle's result code.
        result: u16,
        /// The attribute handle the procedure was operating on, if any.
        att_handle: u16,
    },

    /// Operation attempted while no connection is active.
    #[error("Not connected to a peripheral")]
    NotConnected,

    /// Payload parsing failed, including the `MalformedUuid` invariant.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// I/O error from the underlying transport.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a transport-unavailable error with a reason.
    pub fn transport_unavailable(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }
}

/// Result type alias using hrbelt-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::transport_unavailable("no such port: /dev/ttyACM0");
        assert!(err.to_string().contains("/dev/ttyACM0"));

        let err = Error::Protocol {
            result: 0x0401,
            att_handle: 0x0012,
        };
        assert!(err.to_string().contains("0x0401"));

        let err = Error::NotConnected;
        assert_eq!(err.to_string(), "Not connected to a peripheral");
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ParseError::MalformedUuid { actual: 3 }.into();
        assert!(matches!(err, Error::Parse(ParseError::MalformedUuid { actual: 3 })));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "port missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("port missing"));
    }
}

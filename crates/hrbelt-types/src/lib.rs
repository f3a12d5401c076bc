//! Transport-agnostic types for the hrbelt heart-rate monitor.
//!
//! This crate provides the shared types used by the protocol core:
//!
//! - [`BdAddr`] — 6-byte Bluetooth hardware addresses
//! - [`uuid`] — 16-bit UUID constants and wire byte-order helpers
//! - [`HeartRateSample`] — Heart Rate Measurement notification decoding
//! - [`ParseError`] — parse failures for the above
//!
//! Nothing here touches the dongle link; link-level errors and the
//! command/event surface live in `hrbelt-core`.
//!
//! # Example
//!
//! ```
//! use hrbelt_types::HeartRateSample;
//!
//! let sample = HeartRateSample::from_notification(&[0x00, 72]).unwrap();
//! assert_eq!(sample.bpm, 72);
//! ```

pub mod addr;
pub mod error;
pub mod measurement;
pub mod uuid;

pub use addr::BdAddr;
pub use error::{ParseError, ParseResult};
pub use measurement::HeartRateSample;

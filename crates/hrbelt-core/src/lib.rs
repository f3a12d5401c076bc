//! GATT client core for a heart-rate belt behind a BGAPI-style dongle.
//!
//! This crate drives a single Bluetooth Low Energy peripheral — a
//! heart-rate belt — through a dongle that exposes a binary command/event
//! protocol on a serial transport. It scans for the belt, connects,
//! performs the nested services → attributes GATT discovery, enables
//! measurement notifications, and decodes incoming samples.
//!
//! # Architecture
//!
//! - [`link`] — the opaque dongle boundary: a command trait and a tagged
//!   event enum
//! - [`registry`] — peripherals observed while scanning, keyed by address
//! - [`discovery`] — the resumable GATT discovery state machine
//! - [`manager`] — the connection lifecycle and the single event loop
//! - [`events`] — broadcast observer events (sightings, measurements,
//!   protocol errors)
//! - [`mock`] — a recording link implementation for tests
//!
//! All dongle events are processed one at a time in arrival order by the
//! [`ConnectionManager`]; outbound commands are fire-and-forget, and the
//! discovery sequence advances only on matching completion events.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hrbelt_core::{event_channel, ConnectionManager, ManagerConfig, MonitorEvent};
//! use hrbelt_core::mock::MockLink;
//!
//! #[tokio::main]
//! async fn main() -> hrbelt_core::Result<()> {
//!     let (tx, mut rx) = event_channel(64);
//!     let link = Arc::new(MockLink::new(tx));
//!
//!     let config = ManagerConfig::new("00:18:31:F0:EE:BE".parse().unwrap());
//!     let mut manager = ConnectionManager::new(link, config);
//!     let mut events = manager.subscribe();
//!
//!     manager.start().await?;
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             if let MonitorEvent::Measurement { sample, .. } = event {
//!                 println!("{} BPM", sample.bpm);
//!             }
//!         }
//!     });
//!     manager.run(&mut rx).await?;
//!     manager.stop().await
//! }
//! ```

pub mod discovery;
pub mod error;
pub mod events;
pub mod link;
pub mod manager;
pub mod mock;
pub mod registry;

pub use discovery::{DiscoveryProgress, DiscoveryState, GattDiscovery, ENABLE_NOTIFICATIONS};
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, MonitorEvent};
pub use link::{event_channel, DiscoverMode, DongleLink, LinkEvent, LinkEventReceiver, LinkEventSender};
pub use manager::{ConnectionManager, ManagerConfig};
pub use registry::{Attribute, DeviceRegistry, Peripheral, Service};

// Re-export the shared types crate for downstream convenience.
pub use hrbelt_types::{BdAddr, HeartRateSample, ParseError};

//! The dongle link boundary.
//!
//! The dongle speaks a binary command/event protocol over a serial port;
//! framing and encoding live behind the [`DongleLink`] trait so the core
//! only ever sees "send command" and "deliver event" primitives. Commands
//! are fire-and-forget: a successful send says nothing about the outcome
//! of the procedure, which arrives later as a [`LinkEvent`].
//!
//! Events are delivered through a single [`tokio::sync::mpsc`] channel and
//! consumed one at a time by the connection manager, which is the only
//! synchronization the core needs (see [`crate::manager`]).

use async_trait::async_trait;
use tokio::sync::mpsc;

use hrbelt_types::BdAddr;

use crate::error::Result;

/// GAP discovery mode for the scan command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DiscoverMode {
    /// Discover limited-discoverable devices only.
    Limited = 0,
    /// Discover generic-discoverable devices.
    Generic = 1,
    /// Observation: report all advertisements.
    Observation = 2,
}

/// Command surface of the dongle.
///
/// Implementations wrap a real serial link or, for tests, record the
/// commands they are given (see [`crate::mock::MockLink`]). All methods
/// take `&self`; implementations use interior mutability where they need
/// state.
#[async_trait]
pub trait DongleLink: Send + Sync {
    /// Open the underlying transport.
    ///
    /// # Errors
    ///
    /// [`crate::Error::TransportUnavailable`] when the serial port cannot
    /// be opened. This is fatal to startup; no retry is attempted.
    async fn open(&self) -> Result<()>;

    /// Close the underlying transport. Halts event delivery immediately;
    /// in-flight procedures are simply abandoned.
    async fn close(&self) -> Result<()>;

    /// Terminate the given connection.
    async fn disconnect(&self, handle: u8) -> Result<()>;

    /// Enable or disable advertising. The core only ever disables it, to
    /// clear stale dongle state before scanning.
    async fn set_advertising(&self, enabled: bool) -> Result<()>;

    /// End any running GAP procedure (e.g. a stale scan).
    async fn end_procedure(&self) -> Result<()>;

    /// Configure scan interval/window (in units the dongle defines) and
    /// active-scan mode.
    async fn set_scan_parameters(&self, interval: u16, window: u16, active: bool) -> Result<()>;

    /// Start scanning in the given discovery mode.
    async fn discover(&self, mode: DiscoverMode) -> Result<()>;

    /// Issue a direct connection request to a peripheral.
    #[allow(clippy::too_many_arguments)]
    async fn connect_direct(
        &self,
        address: BdAddr,
        address_type: u8,
        interval_min: u16,
        interval_max: u16,
        timeout: u16,
        latency: u16,
    ) -> Result<()>;

    /// Enumerate attribute groups of the given type over a handle range.
    /// Results arrive as [`LinkEvent::GroupFound`] followed by one
    /// [`LinkEvent::ProcedureCompleted`].
    async fn read_by_group_type(
        &self,
        conn: u8,
        start: u16,
        end: u16,
        group_type: &[u8],
    ) -> Result<()>;

    /// Enumerate attributes over a handle range. Results arrive as
    /// [`LinkEvent::FindInformationFound`] followed by one
    /// [`LinkEvent::ProcedureCompleted`].
    async fn find_information(&self, conn: u8, start: u16, end: u16) -> Result<()>;

    /// Write a value to an attribute handle.
    async fn attribute_write(&self, conn: u8, att_handle: u16, payload: &[u8]) -> Result<()>;

    /// Request the dongle's version information; the reply arrives as
    /// [`LinkEvent::SystemInfo`].
    async fn request_system_info(&self) -> Result<()>;

    /// Reset the dongle firmware.
    async fn reset(&self, flags: u8) -> Result<()>;
}

/// An asynchronous event delivered by the dongle.
///
/// One variant per wire event; the connection manager dispatches on the
/// variant in a single match (see
/// [`ConnectionManager::handle_event`](crate::ConnectionManager::handle_event)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Dongle firmware version reply.
    SystemInfo {
        major: u16,
        minor: u16,
        patch: u16,
        build: u16,
        ll_version: u16,
        protocol_version: u8,
        hw: u8,
    },
    /// Connection established (`flags != 0`) or lost (`flags == 0`).
    ConnectionStatus {
        conn: u8,
        flags: u8,
        address: BdAddr,
        address_type: u8,
        interval: u16,
        timeout: u16,
        latency: u16,
        bonding: u8,
    },
    /// A service group found during read-by-group-type.
    GroupFound {
        conn: u8,
        start: u16,
        end: u16,
        /// UUID bytes in wire order; 2 bytes for 16-bit UUIDs, 16 for
        /// 128-bit ones.
        uuid: Vec<u8>,
    },
    /// An attribute found during find-information.
    FindInformationFound {
        conn: u8,
        att_handle: u16,
        /// UUID bytes in wire order.
        uuid: Vec<u8>,
    },
    /// The pending GATT procedure finished. `result` is zero on success.
    ProcedureCompleted {
        conn: u8,
        result: u16,
        att_handle: u16,
    },
    /// An attribute value notification or read response.
    AttributeValue {
        conn: u8,
        reason: u8,
        att_handle: u16,
        offset: u16,
        value: Vec<u8>,
    },
    /// A scan response from a nearby peripheral.
    ScanResponse {
        rssi: i8,
        packet_type: u8,
        address: BdAddr,
        address_type: u8,
        bond: u8,
        /// Raw advertising data payload.
        data: Vec<u8>,
    },
}

/// Sender half of the dongle event stream.
pub type LinkEventSender = mpsc::Sender<LinkEvent>;

/// Receiver half of the dongle event stream.
pub type LinkEventReceiver = mpsc::Receiver<LinkEvent>;

/// Create an event channel with the given capacity.
pub fn event_channel(capacity: usize) -> (LinkEventSender, LinkEventReceiver) {
    mpsc::channel(capacity)
}

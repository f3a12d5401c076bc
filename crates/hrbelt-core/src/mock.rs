//! Mock dongle link for testing.
//!
//! [`MockLink`] implements [`DongleLink`] without any hardware: every
//! command is recorded for later assertion, and tests drive the protocol
//! by pushing [`LinkEvent`]s into the channel the manager consumes. An
//! open failure can be injected to exercise the `TransportUnavailable`
//! path.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use hrbelt_types::BdAddr;

use crate::error::{Error, Result};
use crate::link::{DiscoverMode, DongleLink, LinkEventSender};

/// A recorded dongle command, one variant per [`DongleLink`] method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    Open,
    Close,
    Disconnect {
        handle: u8,
    },
    SetAdvertising {
        enabled: bool,
    },
    EndProcedure,
    SetScanParameters {
        interval: u16,
        window: u16,
        active: bool,
    },
    Discover {
        mode: DiscoverMode,
    },
    ConnectDirect {
        address: BdAddr,
        address_type: u8,
        interval_min: u16,
        interval_max: u16,
        timeout: u16,
        latency: u16,
    },
    ReadByGroupType {
        conn: u8,
        start: u16,
        end: u16,
        group_type: Vec<u8>,
    },
    FindInformation {
        conn: u8,
        start: u16,
        end: u16,
    },
    AttributeWrite {
        conn: u8,
        att_handle: u16,
        payload: Vec<u8>,
    },
    RequestSystemInfo,
    Reset {
        flags: u8,
    },
}

/// A recording mock implementation of [`DongleLink`].
pub struct MockLink {
    commands: Mutex<Vec<LinkCommand>>,
    events: LinkEventSender,
    fail_open: AtomicBool,
}

impl std::fmt::Debug for MockLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLink")
            .field("fail_open", &self.fail_open.load(Ordering::Relaxed))
            .finish()
    }
}

impl MockLink {
    /// Create a mock that will deliver events through `events`.
    ///
    /// The sender is held only so callers can clone it back out with
    /// [`event_sender`](Self::event_sender); the mock itself never sends.
    #[must_use]
    pub fn new(events: LinkEventSender) -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            events,
            fail_open: AtomicBool::new(false),
        }
    }

    /// Make the next `open()` call fail with `TransportUnavailable`.
    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::Relaxed);
    }

    /// A sender for injecting dongle events into the test.
    #[must_use]
    pub fn event_sender(&self) -> LinkEventSender {
        self.events.clone()
    }

    /// All commands recorded so far, in issue order.
    pub async fn commands(&self) -> Vec<LinkCommand> {
        self.commands.lock().await.clone()
    }

    /// Number of recorded commands matching `predicate`.
    pub async fn count_commands(&self, predicate: impl Fn(&LinkCommand) -> bool) -> usize {
        self.commands.lock().await.iter().filter(|c| predicate(c)).count()
    }

    /// Drop all recorded commands.
    pub async fn clear_commands(&self) {
        self.commands.lock().await.clear();
    }

    async fn record(&self, command: LinkCommand) -> Result<()> {
        self.commands.lock().await.push(command);
        Ok(())
    }
}

#[async_trait]
impl DongleLink for MockLink {
    async fn open(&self) -> Result<()> {
        if self.fail_open.swap(false, Ordering::Relaxed) {
            return Err(Error::transport_unavailable("mock open failure"));
        }
        self.record(LinkCommand::Open).await
    }

    async fn close(&self) -> Result<()> {
        self.record(LinkCommand::Close).await
    }

    async fn disconnect(&self, handle: u8) -> Result<()> {
        self.record(LinkCommand::Disconnect { handle }).await
    }

    async fn set_advertising(&self, enabled: bool) -> Result<()> {
        self.record(LinkCommand::SetAdvertising { enabled }).await
    }

    async fn end_procedure(&self) -> Result<()> {
        self.record(LinkCommand::EndProcedure).await
    }

    async fn set_scan_parameters(&self, interval: u16, window: u16, active: bool) -> Result<()> {
        self.record(LinkCommand::SetScanParameters {
            interval,
            window,
            active,
        })
        .await
    }

    async fn discover(&self, mode: DiscoverMode) -> Result<()> {
        self.record(LinkCommand::Discover { mode }).await
    }

    async fn connect_direct(
        &self,
        address: BdAddr,
        address_type: u8,
        interval_min: u16,
        interval_max: u16,
        timeout: u16,
        latency: u16,
    ) -> Result<()> {
        self.record(LinkCommand::ConnectDirect {
            address,
            address_type,
            interval_min,
            interval_max,
            timeout,
            latency,
        })
        .await
    }

    async fn read_by_group_type(
        &self,
        conn: u8,
        start: u16,
        end: u16,
        group_type: &[u8],
    ) -> Result<()> {
        self.record(LinkCommand::ReadByGroupType {
            conn,
            start,
            end,
            group_type: group_type.to_vec(),
        })
        .await
    }

    async fn find_information(&self, conn: u8, start: u16, end: u16) -> Result<()> {
        self.record(LinkCommand::FindInformation { conn, start, end }).await
    }

    async fn attribute_write(&self, conn: u8, att_handle: u16, payload: &[u8]) -> Result<()> {
        self.record(LinkCommand::AttributeWrite {
            conn,
            att_handle,
            payload: payload.to_vec(),
        })
        .await
    }

    async fn request_system_info(&self) -> Result<()> {
        self.record(LinkCommand::RequestSystemInfo).await
    }

    async fn reset(&self, flags: u8) -> Result<()> {
        self.record(LinkCommand::Reset { flags }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::event_channel;

    #[tokio::test]
    async fn test_mock_records_commands_in_order() {
        let (tx, _rx) = event_channel(4);
        let mock = MockLink::new(tx);

        mock.open().await.unwrap();
        mock.discover(DiscoverMode::Generic).await.unwrap();
        mock.close().await.unwrap();

        assert_eq!(
            mock.commands().await,
            vec![
                LinkCommand::Open,
                LinkCommand::Discover {
                    mode: DiscoverMode::Generic
                },
                LinkCommand::Close,
            ]
        );
    }

    #[tokio::test]
    async fn test_fail_open_is_one_shot() {
        let (tx, _rx) = event_channel(4);
        let mock = MockLink::new(tx);

        mock.fail_open();
        assert!(matches!(
            mock.open().await,
            Err(Error::TransportUnavailable { .. })
        ));
        assert!(mock.open().await.is_ok());
    }
}

//! Connection lifecycle management.
//!
//! The [`ConnectionManager`] owns the single active connection's lifecycle
//! (scan → connect → ready → disconnect) and mediates between the device
//! registry, the discovery state machine, and the dongle link. All dongle
//! events funnel through [`handle_event`](ConnectionManager::handle_event),
//! one at a time in arrival order, so none of the collaborating components
//! need internal locking.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use hrbelt_types::{BdAddr, HeartRateSample};

use crate::discovery::{DiscoveryProgress, DiscoveryState, GattDiscovery};
use crate::error::Result;
use crate::events::{EventDispatcher, EventReceiver, MonitorEvent};
use crate::link::{DiscoverMode, DongleLink, LinkEvent, LinkEventReceiver};
use crate::registry::DeviceRegistry;

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Hardware address of the heart-rate belt to connect to.
    pub target: BdAddr,
    /// Scan interval, in dongle units. Tuned for fast discovery.
    pub scan_interval: u16,
    /// Scan window, in dongle units.
    pub scan_window: u16,
    /// Whether to scan actively (request scan responses).
    pub active_scan: bool,
    /// Minimum connection interval for the connect request.
    pub conn_interval_min: u16,
    /// Maximum connection interval for the connect request.
    pub conn_interval_max: u16,
    /// Supervision timeout for the connect request.
    pub supervision_timeout: u16,
    /// Slave latency for the connect request.
    pub latency: u16,
    /// One-time wait after opening the link, letting the dongle firmware
    /// stabilize before the first command.
    pub settle_delay: Duration,
    /// Observer event channel capacity.
    pub event_capacity: usize,
}

impl ManagerConfig {
    /// Create a configuration for the given target with default tuning.
    #[must_use]
    pub fn new(target: BdAddr) -> Self {
        Self {
            target,
            scan_interval: 10,
            scan_window: 250,
            active_scan: true,
            conn_interval_min: 0x3C,
            conn_interval_max: 0x3C,
            supervision_timeout: 0x64,
            latency: 0,
            settle_delay: Duration::from_millis(250),
            event_capacity: 100,
        }
    }

    /// Set the settle delay (tests use zero).
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the scan interval and window.
    #[must_use]
    pub fn scan_timing(mut self, interval: u16, window: u16) -> Self {
        self.scan_interval = interval;
        self.scan_window = window;
        self
    }
}

/// The single active connection, if any.
#[derive(Debug, Default)]
struct Connection {
    handle: Option<u8>,
    address: Option<BdAddr>,
    discovery: GattDiscovery,
}

impl Connection {
    fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Reset to the disconnected state, discarding discovery progress.
    fn clear(&mut self) {
        self.handle = None;
        self.address = None;
        self.discovery.reset();
    }
}

/// Drives scanning, connection, discovery, and measurement delivery for
/// one heart-rate belt.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use hrbelt_core::{event_channel, ConnectionManager, ManagerConfig};
/// use hrbelt_core::mock::MockLink;
///
/// # async fn example() -> hrbelt_core::Result<()> {
/// let (tx, mut rx) = event_channel(64);
/// let link = Arc::new(MockLink::new(tx));
/// let config = ManagerConfig::new("00:18:31:F0:EE:BE".parse().unwrap());
///
/// let mut manager = ConnectionManager::new(link, config);
/// let _events = manager.subscribe();
/// manager.start().await?;
/// manager.run(&mut rx).await?;
/// manager.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionManager {
    link: Arc<dyn DongleLink>,
    config: ManagerConfig,
    registry: DeviceRegistry,
    connection: Connection,
    /// A connect request is in flight and has not yet produced a
    /// connection-status event.
    connect_pending: bool,
    events: EventDispatcher,
    started: bool,
}

impl ConnectionManager {
    /// Create a manager over the given link.
    #[must_use]
    pub fn new(link: Arc<dyn DongleLink>, config: ManagerConfig) -> Self {
        let events = EventDispatcher::new(config.event_capacity);
        Self {
            link,
            config,
            registry: DeviceRegistry::new(),
            connection: Connection::default(),
            connect_pending: false,
            events,
            started: false,
        }
    }

    /// Subscribe to observer events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// The manager configuration.
    #[must_use]
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The registry of peripherals seen during scanning.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Current discovery phase.
    #[must_use]
    pub fn discovery_state(&self) -> DiscoveryState {
        self.connection.discovery.state()
    }

    /// The active connection handle, or −1 when disconnected.
    ///
    /// Shutdown logic uses this to decide whether a disconnect is needed
    /// before process exit.
    #[must_use]
    pub fn connection_handle(&self) -> i32 {
        match self.connection.handle {
            Some(handle) => i32::from(handle),
            None => -1,
        }
    }

    /// Open the link and start scanning for the target.
    ///
    /// Resets any stale dongle state first (connection slot, advertising,
    /// in-progress scan), then begins an active scan with the configured
    /// parameters.
    ///
    /// # Errors
    ///
    /// [`crate::Error::TransportUnavailable`] when the underlying port
    /// cannot be opened.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }

        info!(target = %self.config.target, "opening dongle link");
        self.link.open().await?;
        self.started = true;

        // Let the dongle firmware settle before the first command.
        if !self.config.settle_delay.is_zero() {
            sleep(self.config.settle_delay).await;
        }
        self.link.request_system_info().await?;

        // Clear stale dongle state: connection slot 0, advertising, and
        // any scan a previous run left behind.
        self.link.disconnect(0).await?;
        self.link.set_advertising(false).await?;
        self.link.end_procedure().await?;

        self.registry.clear();
        self.link
            .set_scan_parameters(
                self.config.scan_interval,
                self.config.scan_window,
                self.config.active_scan,
            )
            .await?;
        self.link.discover(DiscoverMode::Generic).await?;

        info!("scanning for heart-rate belt");
        Ok(())
    }

    /// Disconnect and close the link. Idempotent; safe to call when
    /// already stopped.
    pub async fn stop(&mut self) -> Result<()> {
        self.registry.clear();

        let address = self.connection.address;
        if let Some(handle) = self.connection.handle {
            debug!(handle, "disconnecting active connection");
            self.link.disconnect(handle).await?;
        }
        self.connection.clear();
        self.connect_pending = false;

        if self.started {
            if address.is_some() {
                self.events.send(MonitorEvent::Disconnected { address });
            }
            info!("resetting and closing dongle link");
            self.link.reset(0).await?;
            self.link.close().await?;
            self.started = false;
        }
        Ok(())
    }

    /// Consume dongle events until the stream closes.
    ///
    /// # Errors
    ///
    /// Only transport write failures propagate; protocol-level conditions
    /// are absorbed and surfaced through logging and observer events.
    pub async fn run(&mut self, events: &mut LinkEventReceiver) -> Result<()> {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await?;
        }
        debug!("dongle event stream closed");
        Ok(())
    }

    /// Dispatch one dongle event to its handler.
    pub async fn handle_event(&mut self, event: LinkEvent) -> Result<()> {
        match event {
            LinkEvent::ScanResponse {
                rssi,
                address,
                address_type,
                data,
                ..
            } => self.on_scan_response(rssi, address, address_type, &data).await,
            LinkEvent::ConnectionStatus {
                conn,
                flags,
                address,
                ..
            } => self.on_connection_status(conn, flags, address).await,
            LinkEvent::GroupFound {
                start, end, uuid, ..
            } => {
                self.on_group_found(start, end, uuid);
                Ok(())
            }
            LinkEvent::FindInformationFound {
                att_handle, uuid, ..
            } => {
                self.on_information_found(att_handle, uuid);
                Ok(())
            }
            LinkEvent::ProcedureCompleted {
                result, att_handle, ..
            } => self.on_procedure_completed(result, att_handle).await,
            LinkEvent::AttributeValue {
                att_handle, value, ..
            } => {
                self.on_attribute_value(att_handle, &value);
                Ok(())
            }
            LinkEvent::SystemInfo {
                major,
                minor,
                patch,
                build,
                ll_version,
                hw,
                ..
            } => {
                info!(major, minor, patch, build, ll_version, hw, "dongle firmware");
                Ok(())
            }
        }
    }

    async fn on_scan_response(
        &mut self,
        rssi: i8,
        address: BdAddr,
        address_type: u8,
        data: &[u8],
    ) -> Result<()> {
        let name = advertised_name(data);
        let peripheral = self.registry.upsert(address, &name, rssi);
        let name = peripheral.name.clone();
        self.events.send(MonitorEvent::DeviceDiscovered {
            address,
            name,
            rssi,
        });

        if address != self.config.target {
            return Ok(());
        }
        if self.connection.is_active() || self.connect_pending {
            return Ok(());
        }

        info!(%address, rssi, "target belt in range, connecting");
        self.connect_pending = true;
        self.link
            .connect_direct(
                address,
                address_type,
                self.config.conn_interval_min,
                self.config.conn_interval_max,
                self.config.supervision_timeout,
                self.config.latency,
            )
            .await
    }

    async fn on_connection_status(&mut self, conn: u8, flags: u8, address: BdAddr) -> Result<()> {
        self.connect_pending = false;

        if flags == 0 {
            warn!(%address, "connection lost");
            let bound = self.connection.address;
            self.connection.clear();
            self.events.send(MonitorEvent::Disconnected { address: bound });
            return Ok(());
        }

        info!(%address, conn, "connection established");
        self.connection.handle = Some(conn);
        self.connection.address = Some(address);
        if self.registry.find(&address).is_none() {
            // Connected to a peripheral we never saw in a scan response;
            // register it so discovery has somewhere to put services.
            self.registry.upsert(address, "", 0);
        }
        self.events.send(MonitorEvent::Connected {
            address,
            handle: conn,
        });

        if address == self.config.target {
            self.connection.discovery.begin(self.link.as_ref(), conn).await?;
        }
        Ok(())
    }

    fn on_group_found(&mut self, start: u16, end: u16, uuid: Vec<u8>) {
        let Some(address) = self.connection.address else {
            return;
        };
        if let Some(peripheral) = self.registry.find_mut(&address) {
            self.connection
                .discovery
                .on_group_found(peripheral, start, end, uuid);
        }
    }

    fn on_information_found(&mut self, att_handle: u16, uuid: Vec<u8>) {
        let Some(address) = self.connection.address else {
            return;
        };
        if let Some(peripheral) = self.registry.find_mut(&address) {
            self.connection
                .discovery
                .on_information_found(peripheral, att_handle, uuid);
        }
    }

    async fn on_procedure_completed(&mut self, result: u16, att_handle: u16) -> Result<()> {
        if result != 0 {
            // Advisory: partial failure for one service is non-fatal to
            // the overall enumeration.
            warn!(result, att_handle, "procedure completed with error");
            self.events.send(MonitorEvent::ProtocolError { result, att_handle });
        }

        let (Some(conn), Some(address)) = (self.connection.handle, self.connection.address) else {
            return Ok(());
        };
        let Some(peripheral) = self.registry.find_mut(&address) else {
            return Ok(());
        };

        let progress = self
            .connection
            .discovery
            .on_procedure_completed(self.link.as_ref(), conn, peripheral)
            .await?;

        if let DiscoveryProgress::Completed {
            notifications_enabled: true,
        } = progress
        {
            let services = peripheral.service_count();
            self.events.send(MonitorEvent::Ready { address, services });
        }
        Ok(())
    }

    fn on_attribute_value(&mut self, att_handle: u16, value: &[u8]) {
        let discovery = &self.connection.discovery;
        if !discovery.notifications_enabled()
            || discovery.measurement_handle() != Some(att_handle)
        {
            debug!(att_handle, len = value.len(), "ignoring attribute value");
            return;
        }
        let Some(address) = self.connection.address else {
            return;
        };

        match HeartRateSample::from_notification(value) {
            Ok(sample) => {
                debug!(bpm = sample.bpm, "heart-rate measurement");
                self.events.send(MonitorEvent::Measurement { address, sample });
            }
            Err(err) => {
                // Drop the sample and keep going.
                warn!(error = %err, "undecodable measurement notification");
            }
        }
    }
}

/// Best-effort device name from raw advertising data.
///
/// The dongle hands us the advertising payload as-is; leading and trailing
/// control bytes are stripped and the rest is taken as the name.
fn advertised_name(data: &[u8]) -> String {
    String::from_utf8_lossy(data)
        .trim_matches(|c: char| (c as u32) <= 0x20 || c == char::REPLACEMENT_CHARACTER)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::event_channel;
    use crate::mock::MockLink;

    fn target() -> BdAddr {
        "00:18:31:F0:EE:BE".parse().unwrap()
    }

    fn manager() -> ConnectionManager {
        let (tx, _rx) = event_channel(16);
        let link = Arc::new(MockLink::new(tx));
        let config = ManagerConfig::new(target()).settle_delay(Duration::ZERO);
        ConnectionManager::new(link, config)
    }

    #[test]
    fn test_connection_handle_defaults_to_minus_one() {
        assert_eq!(manager().connection_handle(), -1);
    }

    #[test]
    fn test_config_defaults() {
        let config = ManagerConfig::new(target());
        assert_eq!(config.scan_interval, 10);
        assert_eq!(config.scan_window, 250);
        assert!(config.active_scan);
        assert_eq!(config.conn_interval_min, 0x3C);
        assert_eq!(config.supervision_timeout, 0x64);
        assert_eq!(config.latency, 0);
    }

    #[test]
    fn test_advertised_name_strips_control_bytes() {
        assert_eq!(advertised_name(b"HRBelt"), "HRBelt");
        assert_eq!(advertised_name(b"\x02\x01\x06 HRBelt\x00"), "HRBelt");
        assert_eq!(advertised_name(b""), "");
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_no_op() {
        let (tx, _rx) = event_channel(16);
        let link = Arc::new(MockLink::new(tx));
        let mut manager = ConnectionManager::new(
            Arc::clone(&link) as Arc<dyn DongleLink>,
            ManagerConfig::new(target()).settle_delay(Duration::ZERO),
        );

        manager.stop().await.unwrap();
        assert!(link.commands().await.is_empty());
    }
}

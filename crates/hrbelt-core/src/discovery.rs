//! GATT discovery state machine.
//!
//! The dongle allows exactly one pending GATT request at a time, so the
//! nested services → attributes discovery sequence cannot be expressed as
//! request/response pairs. Instead [`GattDiscovery`] remembers where it is
//! — a phase plus an index cursor into the peripheral's service list — and
//! is resumed by each incoming procedure-completed event, issuing the next
//! request synchronously in response.
//!
//! There is no timeout or retry if a completion event never arrives (e.g.
//! dropped serial bytes): the machine stays in its current phase until the
//! next completion or until connection loss resets it. This reproduces the
//! behavior of the dongle firmware's one-procedure discipline.

use tracing::{debug, info, warn};

use hrbelt_types::uuid::{
    reverse_uuid16, wire_matches, CLIENT_CHARACTERISTIC_CONFIGURATION, HEART_RATE_MEASUREMENT,
    PRIMARY_SERVICE,
};

use crate::error::Result;
use crate::link::DongleLink;
use crate::registry::{Attribute, Peripheral, Service};

/// Payload written to the client characteristic configuration descriptor
/// to enable notifications.
pub const ENABLE_NOTIFICATIONS: [u8; 2] = [0x01, 0x00];

/// Full attribute handle range of a connection.
const HANDLE_RANGE: (u16, u16) = (0x0001, 0xFFFF);

/// Phase of the discovery sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiscoveryState {
    /// No discovery in progress.
    #[default]
    Idle,
    /// Waiting for group-found events and the services completion.
    DiscoveringServices,
    /// Walking the service list, one find-information request per service.
    DiscoveringAttributes,
}

/// Outcome of feeding a procedure-completed event to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryProgress {
    /// The event was not for us (already idle).
    NotRunning,
    /// Another request was issued; more completion events will follow.
    InProgress,
    /// Discovery finished and the machine returned to idle.
    Completed {
        /// Whether the configuration write enabling notifications was
        /// issued (it is issued at most once per connection).
        notifications_enabled: bool,
    },
}

/// Resumable discovery state for one connection.
///
/// Reset wholesale on connection loss; no partial-discovery state survives
/// into a new connection.
#[derive(Debug, Default)]
pub struct GattDiscovery {
    state: DiscoveryState,
    /// Index of the next service to visit in the attributes phase.
    cursor: usize,
    /// Index of the service whose find-information results are streaming in.
    current: Option<usize>,
    measurement_handle: Option<u16>,
    config_handle: Option<u16>,
    config_written: bool,
}

impl GattDiscovery {
    /// Create an idle state machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> DiscoveryState {
        self.state
    }

    /// Resolved handle of the heart-rate measurement characteristic.
    #[must_use]
    pub fn measurement_handle(&self) -> Option<u16> {
        self.measurement_handle
    }

    /// Resolved handle of the client characteristic configuration
    /// descriptor.
    #[must_use]
    pub fn config_handle(&self) -> Option<u16> {
        self.config_handle
    }

    /// Whether the notification-enable write has been issued on this
    /// connection.
    #[must_use]
    pub fn notifications_enabled(&self) -> bool {
        self.config_written
    }

    /// Forcibly return to idle, discarding the cursor and any resolved
    /// handles. Called on connection loss.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Start service discovery on a freshly established connection.
    ///
    /// Issues one read-by-group-type request over the full handle range,
    /// filtered by the primary-service declaration type. Services then
    /// arrive as group-found events, terminated by a single
    /// procedure-completed event.
    pub async fn begin(&mut self, link: &dyn DongleLink, conn: u8) -> Result<()> {
        info!(conn, "starting service discovery");
        self.state = DiscoveryState::DiscoveringServices;
        let group_type = reverse_uuid16(&PRIMARY_SERVICE)?;
        link.read_by_group_type(conn, HANDLE_RANGE.0, HANDLE_RANGE.1, &group_type)
            .await
    }

    /// Record a service group. Accepted regardless of phase; a re-seen
    /// UUID overwrites the earlier entry, so duplicate or out-of-order
    /// group-found events are harmless.
    pub fn on_group_found(&mut self, peripheral: &mut Peripheral, start: u16, end: u16, uuid: Vec<u8>) {
        let service = Service::new(uuid, start, end);
        debug!(key = %service.key(), start, end, "service group found");
        peripheral.upsert_service(service);
    }

    /// Record an attribute of the service currently being walked and check
    /// it for the two distinguished UUIDs.
    ///
    /// The configuration descriptor is only latched after the measurement
    /// characteristic has been resolved, so a configuration descriptor
    /// belonging to some other characteristic earlier in the table is not
    /// mistaken for ours. Identity checks only apply to 2-byte UUIDs;
    /// longer UUIDs are stored raw and never compared.
    pub fn on_information_found(
        &mut self,
        peripheral: &mut Peripheral,
        att_handle: u16,
        uuid: Vec<u8>,
    ) {
        if self.state != DiscoveryState::DiscoveringAttributes {
            return;
        }
        let Some(service) = self.current.and_then(|i| peripheral.service_at_mut(i)) else {
            return;
        };

        if wire_matches(&uuid, &HEART_RATE_MEASUREMENT) {
            info!(att_handle, "resolved heart-rate measurement characteristic");
            self.measurement_handle = Some(att_handle);
        } else if wire_matches(&uuid, &CLIENT_CHARACTERISTIC_CONFIGURATION)
            && self.measurement_handle.is_some()
        {
            info!(att_handle, "resolved client characteristic configuration");
            self.config_handle = Some(att_handle);
        }

        service.attributes.push(Attribute {
            uuid,
            handle: att_handle,
        });
    }

    /// Resume the sequence on a procedure-completed event.
    ///
    /// In the services phase this advances to the attributes phase and
    /// immediately issues the first find-information request — a single
    /// combined step, because the dongle delivers only one completion per
    /// request. In the attributes phase each completion either moves the
    /// cursor to the next service or, when the list is exhausted, returns
    /// to idle and issues the one-time configuration write.
    pub async fn on_procedure_completed(
        &mut self,
        link: &dyn DongleLink,
        conn: u8,
        peripheral: &mut Peripheral,
    ) -> Result<DiscoveryProgress> {
        if self.state == DiscoveryState::Idle {
            return Ok(DiscoveryProgress::NotRunning);
        }

        if self.state == DiscoveryState::DiscoveringServices {
            info!(
                services = peripheral.service_count(),
                "service enumeration complete"
            );
            self.state = DiscoveryState::DiscoveringAttributes;
            self.cursor = 0;
        }

        if let Some(service) = peripheral.service_at(self.cursor) {
            let (start, end) = (service.start, service.end);
            debug!(key = %service.key(), start, end, "requesting attribute information");
            self.current = Some(self.cursor);
            self.cursor += 1;
            link.find_information(conn, start, end).await?;
            return Ok(DiscoveryProgress::InProgress);
        }

        // Service list exhausted: discovery is complete.
        self.state = DiscoveryState::Idle;
        self.current = None;

        let mut notifications_enabled = false;
        match self.config_handle {
            Some(cfg) if !self.config_written => {
                info!(att_handle = cfg, "enabling heart-rate notifications");
                link.attribute_write(conn, cfg, &ENABLE_NOTIFICATIONS).await?;
                self.config_written = true;
                notifications_enabled = true;
            }
            Some(_) => {}
            None => {
                warn!("discovery finished without resolving a configuration descriptor");
            }
        }

        Ok(DiscoveryProgress::Completed {
            notifications_enabled,
        })
    }
}

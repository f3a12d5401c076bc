//! Registry of peripherals observed while scanning.

use std::collections::HashMap;

use hrbelt_types::uuid::uuid_hex;
use hrbelt_types::BdAddr;

/// A characteristic declaration or descriptor discovered within a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// UUID bytes in wire order.
    pub uuid: Vec<u8>,
    /// Attribute handle, unique within a connection.
    pub handle: u16,
}

/// A GATT service: a contiguous attribute handle range under one UUID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// UUID bytes in wire order (2 bytes for 16-bit UUIDs, 16 for 128-bit).
    pub uuid: Vec<u8>,
    /// First attribute handle of the group.
    pub start: u16,
    /// Last attribute handle of the group (inclusive).
    pub end: u16,
    /// Attributes found during the find-information phase, in arrival order.
    pub attributes: Vec<Attribute>,
}

impl Service {
    /// Create a service with an empty attribute collection.
    #[must_use]
    pub fn new(uuid: Vec<u8>, start: u16, end: u16) -> Self {
        Self {
            uuid,
            start,
            end,
            attributes: Vec::new(),
        }
    }

    /// The UUID's string form, used as the service key.
    #[must_use]
    pub fn key(&self) -> String {
        uuid_hex(&self.uuid)
    }
}

/// A peripheral observed during scanning.
///
/// Created on first sighting and refreshed on every subsequent one. Lives
/// until the registry is cleared for a fresh scan.
#[derive(Debug, Clone)]
pub struct Peripheral {
    /// Hardware address, the registry key.
    pub address: BdAddr,
    /// Best-effort display name. The dongle sometimes delivers a truncated
    /// name before a fuller one, so only a strictly longer non-empty name
    /// replaces the stored one.
    pub name: String,
    /// Signal strength of the last sighting, in dBm.
    pub rssi: i8,
    services: Vec<Service>,
}

impl Peripheral {
    fn new(address: BdAddr) -> Self {
        Self {
            address,
            name: String::new(),
            rssi: 0,
            services: Vec::new(),
        }
    }

    /// Refresh from a scan sighting: signal unconditionally, name only if
    /// the new one is non-empty and strictly longer.
    fn observe(&mut self, name: &str, rssi: i8) {
        self.rssi = rssi;
        if !name.is_empty() && name.len() > self.name.len() {
            self.name = name.to_string();
        }
    }

    /// Insert a service keyed by its UUID string, preserving insertion
    /// order. A re-seen key overwrites the prior service in place, so
    /// duplicate or out-of-order group-found events are tolerated.
    pub fn upsert_service(&mut self, service: Service) {
        let key = service.key();
        match self.services.iter_mut().find(|s| s.key() == key) {
            Some(existing) => *existing = service,
            None => self.services.push(service),
        }
    }

    /// Services in insertion order.
    #[must_use]
    pub fn services(&self) -> &[Service] {
        &self.services
    }

    /// Number of services discovered so far.
    #[must_use]
    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Service at the given discovery position.
    #[must_use]
    pub fn service_at(&self, index: usize) -> Option<&Service> {
        self.services.get(index)
    }

    /// Mutable service at the given discovery position.
    pub fn service_at_mut(&mut self, index: usize) -> Option<&mut Service> {
        self.services.get_mut(index)
    }
}

/// Tracks peripherals seen during scanning, keyed by hardware address.
///
/// No synchronization lives here: all access happens from the manager's
/// sequential event loop. "This address changed" notifications are emitted
/// by the manager on its observer channel after calling [`upsert`](Self::upsert).
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<BdAddr, Peripheral>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all tracked peripherals. Called before a fresh scan so stale
    /// entries never shadow new sightings.
    pub fn clear(&mut self) {
        self.devices.clear();
    }

    /// Look up or create the peripheral for `address` and refresh its
    /// name and signal strength from a sighting.
    pub fn upsert(&mut self, address: BdAddr, name: &str, rssi: i8) -> &mut Peripheral {
        let peripheral = self
            .devices
            .entry(address)
            .or_insert_with(|| Peripheral::new(address));
        peripheral.observe(name, rssi);
        peripheral
    }

    /// O(1) lookup by address.
    #[must_use]
    pub fn find(&self, address: &BdAddr) -> Option<&Peripheral> {
        self.devices.get(address)
    }

    /// Mutable O(1) lookup by address.
    pub fn find_mut(&mut self, address: &BdAddr) -> Option<&mut Peripheral> {
        self.devices.get_mut(address)
    }

    /// Number of tracked peripherals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr() -> BdAddr {
        "00:18:31:F0:EE:BE".parse().unwrap()
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let mut registry = DeviceRegistry::new();

        registry.upsert(addr(), "HR", -60);
        assert_eq!(registry.len(), 1);

        registry.upsert(addr(), "HRBelt", -55);
        assert_eq!(registry.len(), 1);

        let peripheral = registry.find(&addr()).unwrap();
        assert_eq!(peripheral.name, "HRBelt");
        assert_eq!(peripheral.rssi, -55);
    }

    #[test]
    fn test_name_never_shrinks() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(addr(), "HRBelt", -60);

        // A truncated sighting must not clobber the fuller name.
        registry.upsert(addr(), "HRB", -50);
        registry.upsert(addr(), "", -40);

        let peripheral = registry.find(&addr()).unwrap();
        assert_eq!(peripheral.name, "HRBelt");
        assert_eq!(peripheral.rssi, -40);
    }

    #[test]
    fn test_equal_length_name_is_not_replaced() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(addr(), "AAAA", -60);
        registry.upsert(addr(), "BBBB", -60);
        assert_eq!(registry.find(&addr()).unwrap().name, "AAAA");
    }

    #[test]
    fn test_clear_empties_registry() {
        let mut registry = DeviceRegistry::new();
        registry.upsert(addr(), "HRBelt", -60);
        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.find(&addr()).is_none());
    }

    #[test]
    fn test_find_absent() {
        let registry = DeviceRegistry::new();
        assert!(registry.find(&addr()).is_none());
    }

    #[test]
    fn test_service_upsert_preserves_order_and_overwrites() {
        let mut registry = DeviceRegistry::new();
        let peripheral = registry.upsert(addr(), "HRBelt", -60);

        peripheral.upsert_service(Service::new(vec![0x0D, 0x18], 10, 15));
        peripheral.upsert_service(Service::new(vec![0x0F, 0x18], 16, 20));
        // Duplicate group-found for the first service with a wider range.
        peripheral.upsert_service(Service::new(vec![0x0D, 0x18], 10, 18));

        assert_eq!(peripheral.service_count(), 2);
        assert_eq!(peripheral.service_at(0).unwrap().end, 18);
        assert_eq!(peripheral.service_at(1).unwrap().uuid, vec![0x0F, 0x18]);
    }

    proptest! {
        // For any sequence of sightings, exactly one peripheral exists per
        // address and its stored name length is the maximum non-empty name
        // length seen so far.
        #[test]
        fn prop_stored_name_is_longest_seen(
            names in proptest::collection::vec("[a-zA-Z0-9]{0,12}", 1..20),
            rssis in proptest::collection::vec(-90i8..-30, 20),
        ) {
            let mut registry = DeviceRegistry::new();
            let mut longest = 0usize;

            for (name, rssi) in names.iter().zip(rssis.iter()) {
                registry.upsert(addr(), name, *rssi);
                if !name.is_empty() {
                    longest = longest.max(name.len());
                }
                prop_assert_eq!(registry.len(), 1);
                prop_assert_eq!(registry.find(&addr()).unwrap().name.len(), longest);
            }
        }
    }
}

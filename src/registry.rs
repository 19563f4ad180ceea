//! The table of known devices.

use std::time::SystemTime;

use log::debug;

use crate::config::{DeviceConfig, GatewayConfig};
use crate::device::Device;
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Reconciliation fields of one device, as read by the control API.
///
/// Reading an index that does not exist yields the default (all off, nothing
/// pending).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateSummary {
    pub actual: bool,
    pub commanded: bool,
    pub pending_until: Option<SystemTime>,
    pub deadline: Option<SystemTime>,
}

/// Known and auto-discovered devices, indexed by position.
///
/// Indices are stable until the next [`Registry::reload`].
#[derive(Debug, Clone)]
pub struct Registry {
    devices: Vec<Device>,
    capacity: usize,
    changed: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Room left for devices that are discovered but not yet configured.
    pub const DISCOVERY_HEADROOM: usize = 32;

    pub fn new() -> Self {
        Registry {
            devices: Vec::new(),
            capacity: Self::DISCOVERY_HEADROOM,
            changed: false,
        }
    }

    /// Rebuild the registry from a configuration document.
    ///
    /// On error the registry is left untouched.
    pub fn reload(&mut self, config: &GatewayConfig) -> Result<()> {
        let configured = config.devices()?;
        debug!("found {} devices", configured.len());

        let devices = configured
            .iter()
            .map(|c| {
                debug!(
                    "load device {}, MAC address {} ({})",
                    c.name, c.address, c.description
                );
                let mut device = Device::new(&c.name, &c.address, &c.description);
                // Keep the last known state, without timers.
                if let Some(known) = self.devices.iter().find(|d| d.matches_mac(&c.address)) {
                    device.reset(known.actual_state);
                }
                device
            })
            .collect();
        self.devices = devices;
        self.capacity = self.devices.len() + Self::DISCOVERY_HEADROOM;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Device> {
        self.devices.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Device> {
        self.devices.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    /// Index of the device with the given MAC address, ignoring case.
    pub fn find_by_mac(&self, mac: &str) -> Option<usize> {
        self.devices.iter().position(|d| d.matches_mac(mac))
    }

    pub fn state(&self, index: usize) -> StateSummary {
        self.get(index)
            .map(|d| StateSummary {
                actual: d.actual_state,
                commanded: d.commanded_state,
                pending_until: d.pending_until,
                deadline: d.pulse_deadline,
            })
            .unwrap_or_default()
    }

    /// Append a newly seen device, named after its position.
    ///
    /// Returns `None` when the registry is full. The new entry counts as
    /// detected at `now`.
    pub(crate) fn add_discovered(&mut self, mac: &str, now: SystemTime) -> Option<usize> {
        if self.devices.len() >= self.capacity {
            debug!("registry full, ignoring new device {mac}");
            return None;
        }
        let index = self.devices.len();
        let mut device = Device::new(&format!("wiz{}", index + 1), mac, "autogenerated");
        device.last_seen = Some(now);
        self.devices.push(device);
        self.changed = true;
        Some(index)
    }

    /// Report, once, that the device list changed since the last call.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    /// The current device list in configuration form.
    pub fn live_config(&self) -> GatewayConfig {
        GatewayConfig::with_devices(
            self.devices
                .iter()
                .filter(|d| !d.name.is_empty() && !d.mac_address.is_empty())
                .map(|d| DeviceConfig::new(&d.name, &d.mac_address, &d.description))
                .collect(),
        )
    }
}

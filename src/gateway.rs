//! The reconciliation engine.

use std::time::{Duration, SystemTime};

use crate::command::CommandIssuer;
use crate::config::GatewayConfig;
use crate::device::{ACK_WINDOW, DeviceStatus};
use crate::errors::Error;
use crate::history::{EventAction, EventHistory};
use crate::network::{InterfaceSource, SystemInterfaces};
use crate::registry::{Registry, StateSummary};

type Result<T> = std::result::Result<T, Error>;

pub(crate) const DEVICE: &str = "DEVICE";
const CONFIG: &str = "CONFIG";

pub(crate) fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}

/// Owns the device registry and drives it.
///
/// The gateway is single-threaded: the owner calls [`Gateway::periodic`]
/// about once a second and [`Gateway::receive`] for every datagram, then
/// sends whatever [`Gateway::drain_outbox`] returns.
///
/// # Example
///
/// ```
/// use std::time::SystemTime;
/// use wiz_gateway::{DeviceConfig, Gateway, GatewayConfig};
///
/// let mut gateway = Gateway::new(Vec::new());
/// gateway
///     .reload(
///         &GatewayConfig::with_devices(vec![DeviceConfig::new("porch", "a8bb50aabbcc", "")]),
///         "ON STARTUP",
///         SystemTime::now(),
///     )
///     .unwrap();
///
/// assert_eq!(gateway.count(), 1);
/// assert_eq!(gateway.failure(0), Some("silent"));
/// ```
pub struct Gateway {
    pub(crate) registry: Registry,
    pub(crate) issuer: CommandIssuer,
    pub(crate) events: EventHistory,
    pub(crate) interfaces: Box<dyn InterfaceSource>,
    pub(crate) last_discovery: Option<SystemTime>,
    pub(crate) last_scan: Option<SystemTime>,
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new(SystemInterfaces)
    }
}

impl Gateway {
    pub fn new(interfaces: impl InterfaceSource + 'static) -> Self {
        Self::with_issuer(interfaces, CommandIssuer::default())
    }

    pub fn with_issuer(interfaces: impl InterfaceSource + 'static, issuer: CommandIssuer) -> Self {
        Gateway {
            registry: Registry::new(),
            issuer,
            events: EventHistory::new(),
            interfaces: Box::new(interfaces),
            last_discovery: None,
            last_scan: None,
        }
    }

    /// Rebuild the device list from configuration.
    ///
    /// Indices obtained before a successful reload are invalid afterwards.
    /// On error the previous device list is kept.
    pub fn reload(&mut self, config: &GatewayConfig, reason: &str, now: SystemTime) -> Result<()> {
        self.events
            .record(now, CONFIG, "wiz", EventAction::Activating, reason);
        self.registry.reload(config)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn events(&self) -> &EventHistory {
        &self.events
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.registry.get(index).map(|d| d.name())
    }

    /// Last state reported by the device.
    pub fn get(&self, index: usize) -> bool {
        self.registry.state(index).actual
    }

    /// Last state requested for the device.
    pub fn commanded(&self, index: usize) -> bool {
        self.registry.state(index).commanded
    }

    pub fn deadline(&self, index: usize) -> Option<SystemTime> {
        self.registry.state(index).deadline
    }

    pub fn state(&self, index: usize) -> StateSummary {
        self.registry.state(index)
    }

    /// Why the device is not usable, if it is not.
    pub fn failure(&self, index: usize) -> Option<&'static str> {
        match self.registry.get(index) {
            Some(device) if !device.is_detected() => Some("silent"),
            _ => None,
        }
    }

    pub fn status(&self, index: usize, now: SystemTime) -> Option<DeviceStatus> {
        self.registry.get(index).map(|d| d.status(now))
    }

    /// Whether auto-discovery changed the device list since the last call.
    pub fn changed(&mut self) -> bool {
        self.registry.take_changed()
    }

    /// The device list to persist, including auto-discovered devices.
    pub fn live_config(&self) -> GatewayConfig {
        self.registry.live_config()
    }

    /// Request a new state for a device.
    ///
    /// With `pulse` set on an "on" command, the device is switched back off
    /// once the pulse expires. A pulse on an "off" command is ignored, and a
    /// pulse too long to be represented is rejected without touching the
    /// device. The command is sent right away only if the device is
    /// currently detected; otherwise the retry path sends it when the device
    /// reports within the acknowledgment window.
    pub fn set(
        &mut self,
        index: usize,
        state: bool,
        pulse: Option<Duration>,
        cause: &str,
        now: SystemTime,
    ) -> Result<()> {
        let device = self
            .registry
            .get_mut(index)
            .ok_or(Error::DeviceNotFound(index))?;

        // Only an "on" command can be time-limited.
        let pulse = pulse.filter(|p| state && !p.is_zero());
        let deadline = match pulse {
            Some(pulse) => Some(
                now.checked_add(pulse)
                    .ok_or(Error::PulseOutOfRange(pulse.as_secs()))?,
            ),
            None => None,
        };

        device.pulse_deadline = deadline;
        let mut detail = match pulse {
            Some(pulse) => format!("{} FOR {} SECONDS", on_off(state), pulse.as_secs()),
            None => on_off(state).to_string(),
        };
        if !cause.is_empty() {
            detail = format!("{detail} ({cause})");
        }
        device.commanded_state = state;
        device.pending_until = Some(now + ACK_WINDOW);

        self.events
            .record(now, DEVICE, &device.name, EventAction::Set, detail);
        if device.is_detected() {
            self.issuer.control(index, device, state);
        }
        Ok(())
    }

    /// Datagrams to send, in order.
    pub fn drain_outbox(&mut self) -> Vec<crate::command::Datagram> {
        self.issuer.drain()
    }
}

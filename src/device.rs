//! Per-device reconciliation model.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Time allowed for a device to confirm a command.
pub const ACK_WINDOW: Duration = Duration::from_secs(5);
/// A detected device that stays quiet longer than this is considered gone.
pub const SILENCE_THRESHOLD: Duration = Duration::from_secs(100);

/// Where a device stands with respect to its commanded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DeviceState {
    /// The device matches its commanded state.
    Uncommanded,
    /// A command is in flight and may still be retried.
    AwaitingAck,
    /// A command was not confirmed within the acknowledgment window.
    RetryExhausted,
    /// The device is not reporting.
    Silent,
}

/// One physical Wiz device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub(crate) name: String,
    pub(crate) mac_address: String,
    pub(crate) description: String,
    pub(crate) network_address: Option<SocketAddr>,
    pub(crate) actual_state: bool,
    pub(crate) commanded_state: bool,
    pub(crate) pending_until: Option<SystemTime>,
    pub(crate) pulse_deadline: Option<SystemTime>,
    pub(crate) last_seen: Option<SystemTime>,
    pub(crate) last_probe_sent: Option<SystemTime>,
}

impl Device {
    pub fn new(name: &str, mac_address: &str, description: &str) -> Self {
        Device {
            name: name.to_string(),
            mac_address: mac_address.to_string(),
            description: description.to_string(),
            network_address: None,
            actual_state: false,
            commanded_state: false,
            pending_until: None,
            pulse_deadline: None,
            last_seen: None,
            last_probe_sent: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mac_address(&self) -> &str {
        &self.mac_address
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn network_address(&self) -> Option<SocketAddr> {
        self.network_address
    }

    pub fn actual_state(&self) -> bool {
        self.actual_state
    }

    pub fn commanded_state(&self) -> bool {
        self.commanded_state
    }

    pub fn pending_until(&self) -> Option<SystemTime> {
        self.pending_until
    }

    pub fn pulse_deadline(&self) -> Option<SystemTime> {
        self.pulse_deadline
    }

    pub fn last_seen(&self) -> Option<SystemTime> {
        self.last_seen
    }

    /// True once the device has reported and has not gone silent since.
    pub fn is_detected(&self) -> bool {
        self.last_seen.is_some()
    }

    pub(crate) fn matches_mac(&self, mac: &str) -> bool {
        self.mac_address.eq_ignore_ascii_case(mac)
    }

    /// Force both states to `state` and forget any command in flight.
    pub(crate) fn reset(&mut self, state: bool) {
        self.actual_state = state;
        self.commanded_state = state;
        self.pending_until = None;
        self.pulse_deadline = None;
    }

    /// Derive the reconciliation state at `now`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::SystemTime;
    /// use wiz_gateway::{Device, DeviceState};
    ///
    /// let device = Device::new("porch", "a8bb50aabbcc", "");
    /// assert_eq!(device.state(SystemTime::now()), DeviceState::Silent);
    /// ```
    pub fn state(&self, now: SystemTime) -> DeviceState {
        let Some(seen) = self.last_seen else {
            return DeviceState::Silent;
        };
        if seen + SILENCE_THRESHOLD < now {
            return DeviceState::Silent;
        }
        if self.actual_state == self.commanded_state {
            return DeviceState::Uncommanded;
        }
        match self.pending_until {
            Some(until) if until > now => DeviceState::AwaitingAck,
            _ => DeviceState::RetryExhausted,
        }
    }

    pub fn status(&self, now: SystemTime) -> DeviceStatus {
        DeviceStatus {
            name: self.name.clone(),
            mac_address: self.mac_address.clone(),
            description: self.description.clone(),
            state: self.actual_state,
            commanded: self.commanded_state,
            deadline: self.pulse_deadline,
            failure: (!self.is_detected()).then(|| "silent".to_string()),
            reconciliation: self.state(now),
        }
    }
}

/// A read-only snapshot of a device, for the control API.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub name: String,
    pub mac_address: String,
    pub description: String,
    /// Last state reported by the device.
    pub state: bool,
    /// Last state requested by the gateway.
    pub commanded: bool,
    pub deadline: Option<SystemTime>,
    pub failure: Option<String>,
    pub reconciliation: DeviceState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn seen_device() -> Device {
        let mut device = Device::new("porch", "A8BB50AABBCC", "Front porch");
        device.last_seen = Some(t(1000));
        device
    }

    #[test]
    fn test_matches_mac_ignores_case() {
        let device = seen_device();
        assert!(device.matches_mac("a8bb50aabbcc"));
        assert!(!device.matches_mac("a8bb50aabbcd"));
    }

    #[test]
    fn test_state_derivation() {
        let mut device = seen_device();
        assert_eq!(device.state(t(1001)), DeviceState::Uncommanded);

        device.commanded_state = true;
        device.pending_until = Some(t(1005));
        assert_eq!(device.state(t(1002)), DeviceState::AwaitingAck);
        assert_eq!(device.state(t(1005)), DeviceState::RetryExhausted);

        assert_eq!(device.state(t(1101)), DeviceState::Silent);
    }

    #[test]
    fn test_reset() {
        let mut device = seen_device();
        device.commanded_state = true;
        device.pending_until = Some(t(1005));
        device.pulse_deadline = Some(t(1010));
        device.reset(false);
        assert!(!device.actual_state && !device.commanded_state);
        assert_eq!(device.pending_until, None);
        assert_eq!(device.pulse_deadline, None);
    }

    #[test]
    fn test_status_failure() {
        let device = Device::new("porch", "a8bb50aabbcc", "");
        assert_eq!(device.status(t(0)).failure.as_deref(), Some("silent"));
        assert_eq!(seen_device().status(t(1000)).failure, None);
    }
}

//! Periodic reconciliation of commanded and actual device states.

use std::time::{Duration, SystemTime};

use log::debug;

use crate::command::device_id;
use crate::device::{ACK_WINDOW, Device, DeviceState, SILENCE_THRESHOLD};
use crate::gateway::{DEVICE, Gateway, on_off};
use crate::history::{EventAction, EventHistory};

/// Interval between interface enumeration and registration broadcasts.
pub const DISCOVERY_INTERVAL: Duration = Duration::from_secs(60);
/// Minimum interval between two scans of the device list.
pub const SCAN_INTERVAL: Duration = Duration::from_secs(5);
/// Interval between two unicast probes of the same device.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(35);

/// Whether `interval` has passed since `since`. A clock that stepped back
/// past `since` counts as elapsed, so throttled work does not stall until
/// the clock catches up.
fn elapsed(since: Option<SystemTime>, interval: Duration, now: SystemTime) -> bool {
    since.is_none_or(|t| now < t || now >= t + interval)
}

impl Gateway {
    /// Run the reconciliation loop. Call about once per second.
    pub fn periodic(&mut self, now: SystemTime) {
        if elapsed(self.last_discovery, DISCOVERY_INTERVAL, now) {
            self.issuer.set_interfaces(self.interfaces.enumerate());
            self.issuer.register_all();
            self.last_discovery = Some(now);
        }

        if !elapsed(self.last_scan, SCAN_INTERVAL, now) {
            return;
        }
        self.last_scan = Some(now);

        for (index, device) in self.registry.iter_mut().enumerate() {
            if elapsed(device.last_probe_sent, PROBE_INTERVAL, now) {
                if let Some(to) = device.network_address {
                    self.issuer.register(to, device_id(index));
                }
                device.last_probe_sent = Some(now);
            }

            if device.last_seen.is_some_and(|seen| seen + SILENCE_THRESHOLD < now) {
                self.events.record(
                    now,
                    DEVICE,
                    &device.name,
                    EventAction::Silent,
                    format!("MAC ADDRESS {}", device.mac_address),
                );
                device.reset(false);
                device.last_seen = None;
            }

            if device.pulse_deadline.is_some_and(|deadline| now >= deadline) {
                self.events
                    .record(now, DEVICE, &device.name, EventAction::Reset, "END OF PULSE");
                device.commanded_state = false;
                device.pending_until = Some(now + ACK_WINDOW);
                device.pulse_deadline = None;
            }

            match device.state(now) {
                DeviceState::Uncommanded => {}
                DeviceState::AwaitingAck => {
                    let state = device.commanded_state;
                    self.events
                        .record(now, DEVICE, &device.name, EventAction::Retry, on_off(state));
                    self.issuer.control(index, device, state);
                }
                DeviceState::RetryExhausted => expire(&mut self.events, device, now),
                // Nothing to send to; the command stands until its window closes.
                DeviceState::Silent => {
                    let open = device.pending_until.is_some_and(|until| until > now);
                    if device.actual_state != device.commanded_state && !open {
                        expire(&mut self.events, device, now);
                    }
                }
            }
        }
    }
}

/// Give up on an unconfirmed command and follow the device instead.
fn expire(events: &mut EventHistory, device: &mut Device, now: SystemTime) {
    if device.pending_until.is_some() {
        events.record(now, DEVICE, &device.name, EventAction::Timeout, "");
    } else {
        debug!("{} out of sync without a command", device.name);
    }
    let actual = device.actual_state;
    device.reset(actual);
}

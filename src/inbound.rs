//! Handling of reports received from devices.

use std::net::SocketAddr;
use std::time::SystemTime;

use log::{debug, warn};

use crate::gateway::{DEVICE, Gateway, on_off};
use crate::history::EventAction;
use crate::push::{DeviceReport, ReportKind, parse_report};

impl Gateway {
    /// Process one datagram received on the listen port.
    ///
    /// Malformed or irrelevant datagrams are logged and dropped.
    pub fn receive(&mut self, data: &[u8], from: SocketAddr, now: SystemTime) {
        debug!("received from {from}: {}", String::from_utf8_lossy(data));
        match parse_report(data) {
            Ok(Some(report)) => self.apply_report(&report, from, now),
            Ok(None) => debug!("ignoring message from {from}"),
            Err(e) => warn!("{e}: {}", String::from_utf8_lossy(data)),
        }
    }

    /// Update the registry from a device report.
    pub fn apply_report(&mut self, report: &DeviceReport, from: SocketAddr, now: SystemTime) {
        let index = match self.registry.find_by_mac(&report.mac) {
            Some(index) => index,
            None => {
                let Some(index) = self.registry.add_discovered(&report.mac, now) else {
                    return;
                };
                if let Some(device) = self.registry.get(index) {
                    self.events.record(
                        now,
                        DEVICE,
                        &device.name,
                        EventAction::Added,
                        format!("MAC ADDRESS {}", report.mac),
                    );
                }
                index
            }
        };
        let device_port = self.issuer.broadcast_address().port();
        let Some(device) = self.registry.get_mut(index) else {
            return;
        };

        if !device.is_detected() {
            self.events.record(
                now,
                DEVICE,
                &device.name,
                EventAction::Detected,
                format!("MAC ADDRESS {}", report.mac),
            );
        }
        device.last_seen = Some(now);
        device.network_address = Some(SocketAddr::new(from.ip(), device_port));

        let manual = report.kind == ReportKind::FirstBeat;
        let reported = report.kind.state();
        if manual {
            // Someone just switched it on by hand: follow, and acknowledge.
            device.commanded_state = true;
            device.pending_until = None;
            self.issuer.control(index, device, true);
        }

        if device.actual_state != reported {
            let detail = format!(
                "FROM {} TO {}",
                on_off(device.actual_state),
                on_off(reported)
            );
            if device.pending_until.is_some() {
                if reported == device.commanded_state {
                    self.events
                        .record(now, DEVICE, &device.name, EventAction::Confirmed, detail);
                    device.pending_until = None;
                }
            } else {
                let action = if manual {
                    EventAction::Operated
                } else {
                    EventAction::Changed
                };
                self.events.record(now, DEVICE, &device.name, action, detail);
                device.commanded_state = reported;
            }
            device.actual_state = reported;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::config::{DeviceConfig, GatewayConfig};
    use crate::device::DeviceState;
    use pretty_assertions::assert_eq;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn from() -> SocketAddr {
        "192.168.1.50:38899".parse().unwrap()
    }

    fn sync_pilot(mac: &str, state: bool) -> Vec<u8> {
        format!(r#"{{"method":"syncPilot","env":"pro","params":{{"mac":"{mac}","rssi":-60,"src":"","state":{state}}}}}"#)
            .into_bytes()
    }

    fn first_beat(mac: &str) -> Vec<u8> {
        format!(r#"{{"method":"firstBeat","env":"pro","params":{{"mac":"{mac}","fwVersion":"1.25.0"}}}}"#)
            .into_bytes()
    }

    fn gateway() -> Gateway {
        let mut gateway = Gateway::new(Vec::new());
        gateway
            .reload(
                &GatewayConfig::with_devices(vec![DeviceConfig::new("porch", "A8BB50000001", "")]),
                "TEST",
                t(0),
            )
            .unwrap();
        gateway
    }

    #[test]
    fn test_detected_updates_address() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000001", false), "192.168.1.50:40123".parse().unwrap(), t(10));

        let device = gateway.registry().get(0).unwrap();
        assert_eq!(device.last_seen(), Some(t(10)));
        assert_eq!(device.network_address(), Some(from()));
        assert_eq!(gateway.events().count(EventAction::Detected), 1);

        gateway.receive(&sync_pilot("a8bb50000001", false), from(), t(20));
        assert_eq!(gateway.events().count(EventAction::Detected), 1);
    }

    #[test]
    fn test_external_change() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000001", true), from(), t(10));

        assert!(gateway.get(0));
        assert!(gateway.commanded(0));
        assert_eq!(gateway.events().last().unwrap().action, EventAction::Changed);
        assert_eq!(gateway.events().last().unwrap().detail, "FROM off TO on");
    }

    #[test]
    fn test_confirmation() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000001", false), from(), t(10));
        gateway.set(0, true, None, "", t(11)).unwrap();
        assert_eq!(
            gateway.registry().get(0).unwrap().state(t(12)),
            DeviceState::AwaitingAck
        );

        gateway.receive(&sync_pilot("a8bb50000001", true), from(), t(12));
        assert_eq!(gateway.events().count(EventAction::Confirmed), 1);
        assert_eq!(gateway.state(0).pending_until, None);
        assert_eq!(
            gateway.registry().get(0).unwrap().state(t(12)),
            DeviceState::Uncommanded
        );
    }

    #[test]
    fn test_unexpected_report_while_pending() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000001", true), from(), t(10));
        gateway.set(0, false, None, "", t(11)).unwrap();
        gateway.receive(&sync_pilot("a8bb50000001", true), from(), t(12));

        // Same state as before: nothing to record, the command stays pending.
        assert_eq!(gateway.events().count(EventAction::Confirmed), 0);
        assert!(gateway.state(0).pending_until.is_some());
        assert!(!gateway.commanded(0));
    }

    #[test]
    fn test_first_beat() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000001", false), from(), t(10));
        gateway.drain_outbox();

        gateway.receive(&first_beat("a8bb50000001"), from(), t(20));
        assert!(gateway.get(0));
        assert!(gateway.commanded(0));
        assert_eq!(gateway.events().last().unwrap().action, EventAction::Operated);

        let sent = gateway.drain_outbox();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, from());
        assert!(sent[0].text().contains(r#""params":{"state":true}"#));
    }

    #[test]
    fn test_auto_discovery() {
        let mut gateway = gateway();
        gateway.receive(&sync_pilot("a8bb50000009", true), from(), t(10));

        assert_eq!(gateway.count(), 2);
        assert_eq!(gateway.name(1), Some("wiz2"));
        assert!(gateway.changed());
        assert_eq!(gateway.events().count(EventAction::Added), 1);
        assert_eq!(gateway.events().count(EventAction::Detected), 0);
        assert!(gateway.get(1));

        gateway.receive(&sync_pilot("A8BB50000009", true), from(), t(11));
        assert_eq!(gateway.count(), 2);
        assert!(!gateway.changed());
    }

    #[test]
    fn test_malformed_reports_are_dropped() {
        let mut gateway = gateway();
        gateway.receive(b"not json", from(), t(10));
        gateway.receive(br#"{"method":"syncPilot","params":{"mac":"a8bb50000001"}}"#, from(), t(10));
        gateway.receive(br#"{"method":"syncPilot","params":{"state":true}}"#, from(), t(10));
        gateway.receive(br#"{"method":"getPilot","params":{"mac":"a8bb50000001"}}"#, from(), t(10));

        assert_eq!(gateway.count(), 1);
        assert_eq!(gateway.failure(0), Some("silent"));
    }
}

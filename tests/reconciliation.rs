//! End-to-end reconciliation scenarios driven with simulated time.

use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use wiz_gateway::{DeviceConfig, DeviceState, EventAction, Gateway, GatewayConfig, NetworkInterface};

fn t(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000 + secs)
}

fn device_addr() -> SocketAddr {
    "192.168.1.50:38899".parse().unwrap()
}

fn sync_pilot(mac: &str, state: bool) -> Vec<u8> {
    format!(r#"{{"method":"syncPilot","params":{{"mac":"{mac}","state":{state}}}}}"#).into_bytes()
}

fn gateway() -> Gateway {
    let mut gateway = Gateway::new(vec![NetworkInterface {
        name: "eth0".to_string(),
        ip: "192.168.1.10".to_string(),
        mac: "001122334455".to_string(),
    }]);
    gateway
        .reload(
            &GatewayConfig::with_devices(vec![
                DeviceConfig::new("porch", "a8bb50000001", "Front porch"),
                DeviceConfig::new("lamp", "a8bb50000002", "Living room"),
            ]),
            "ON STARTUP",
            t(0),
        )
        .unwrap();
    gateway
}

fn set_pilots(gateway: &mut Gateway) -> usize {
    gateway
        .drain_outbox()
        .iter()
        .filter(|d| d.text().contains("setPilot"))
        .count()
}

#[test]
fn command_converges_after_acknowledgment() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000001", false), device_addr(), t(1));
    gateway.periodic(t(1));
    gateway.drain_outbox();

    gateway.set(0, true, None, "hub", t(2)).unwrap();
    assert_eq!(set_pilots(&mut gateway), 1);

    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(3));
    gateway.periodic(t(6));

    assert!(gateway.get(0));
    assert!(gateway.commanded(0));
    assert_eq!(gateway.events().count(EventAction::Confirmed), 1);
    assert_eq!(gateway.events().count(EventAction::Timeout), 0);
    assert_eq!(set_pilots(&mut gateway), 0);
}

#[test]
fn repeated_report_is_idempotent() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(1));
    let events = gateway.events().len();

    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(2));
    assert_eq!(gateway.events().len(), events);
    assert_eq!(gateway.events().count(EventAction::Changed), 1);
}

#[test]
fn pulse_expires_without_report() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000001", false), device_addr(), t(1));
    gateway.periodic(t(1));

    gateway
        .set(0, true, Some(Duration::from_secs(10)), "doorbell", t(2))
        .unwrap();
    assert_eq!(gateway.deadline(0), Some(t(12)));
    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(3));

    gateway.periodic(t(13));
    assert!(!gateway.commanded(0));
    assert_eq!(gateway.deadline(0), None);
    assert!(gateway.get(0));
    assert_eq!(gateway.events().count(EventAction::Reset), 1);
    assert!(
        gateway
            .events()
            .entries()
            .any(|e| e.action == EventAction::Set && e.detail.contains("FOR 10 SECONDS"))
    );
}

#[test]
fn silent_device_is_turned_off() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(1));
    assert_eq!(gateway.failure(0), None);

    gateway.periodic(t(50));
    gateway.periodic(t(102));

    assert_eq!(gateway.failure(0), Some("silent"));
    assert!(!gateway.get(0));
    assert!(!gateway.commanded(0));
    assert_eq!(
        gateway.registry().get(0).unwrap().state(t(102)),
        DeviceState::Silent
    );

    // A new report brings it back.
    gateway.receive(&sync_pilot("a8bb50000001", false), device_addr(), t(110));
    assert_eq!(gateway.failure(0), None);
    assert_eq!(gateway.events().count(EventAction::Detected), 2);
}

#[test]
fn unknown_device_is_added_once() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000003", false), device_addr(), t(1));
    gateway.receive(&sync_pilot("a8bb50000003", false), device_addr(), t(2));

    assert_eq!(gateway.count(), 3);
    assert_eq!(gateway.name(2), Some("wiz3"));
    assert!(gateway.changed());
    assert!(!gateway.changed());

    let saved = gateway.live_config();
    let devices = saved.devices().unwrap();
    assert_eq!(devices.len(), 3);
    assert_eq!(devices[2].address, "a8bb50000003");
    assert_eq!(devices[2].description, "autogenerated");
}

#[test]
fn manual_switch_on_is_followed() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000002", false), device_addr(), t(1));
    gateway.set(1, false, None, "hub", t(2)).unwrap();
    gateway.drain_outbox();

    gateway.receive(
        br#"{"method":"firstBeat","params":{"mac":"a8bb50000002"}}"#,
        device_addr(),
        t(3),
    );

    assert!(gateway.get(1));
    assert!(gateway.commanded(1));
    assert_eq!(gateway.state(1).pending_until, None);
    let sent = gateway.drain_outbox();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text().contains(r#""id":12001"#));
    assert!(sent[0].text().contains(r#""state":true"#));
}

#[test]
fn unreachable_device_is_never_commanded() {
    let mut gateway = gateway();
    gateway.periodic(t(0));
    gateway.drain_outbox();

    gateway.set(1, true, None, "hub", t(1)).unwrap();
    assert_eq!(gateway.state(1).pending_until, Some(t(6)));
    assert_eq!(set_pilots(&mut gateway), 0);

    gateway.periodic(t(5));
    assert_eq!(set_pilots(&mut gateway), 0);
    assert!(gateway.commanded(1));

    gateway.periodic(t(10));
    assert_eq!(set_pilots(&mut gateway), 0);
    assert!(!gateway.commanded(1));
    assert_eq!(gateway.events().count(EventAction::Timeout), 1);
    assert_eq!(gateway.events().count(EventAction::Retry), 0);
}

#[test]
fn set_rejects_unknown_index() {
    let mut gateway = gateway();
    assert!(gateway.set(2, true, None, "hub", t(1)).is_err());
    assert_eq!(gateway.name(2), None);
    assert!(!gateway.get(2));
    assert_eq!(gateway.failure(2), None);
}

#[test]
fn reload_keeps_last_known_state() {
    let mut gateway = gateway();
    gateway.receive(&sync_pilot("a8bb50000001", true), device_addr(), t(1));
    gateway.receive(&sync_pilot("a8bb50000009", true), device_addr(), t(1));
    assert_eq!(gateway.count(), 3);

    let config = gateway.live_config();
    gateway.reload(&config, "CONFIG CHANGED", t(2)).unwrap();

    assert_eq!(gateway.count(), 3);
    // Last known states survive, detection does not.
    assert!(gateway.get(0));
    assert!(gateway.commanded(0));
    assert_eq!(gateway.state(0).pending_until, None);
    assert_eq!(gateway.failure(0), Some("silent"));
    assert_eq!(gateway.events().count(EventAction::Activating), 2);
}

//! # wiz_gateway
//!
//! A gateway that discovers Philips Wiz Wi-Fi devices (lights, plugs) on the
//! local network and keeps each one in the on/off state requested by a
//! home-automation hub.
//!
//! ## How it works
//!
//! The [`Gateway`] holds one entry per device, keyed by MAC address, with the
//! state the device last reported and the state it was last commanded to.
//! Two callbacks drive it:
//!
//! - [`Gateway::periodic`], called about once a second, broadcasts
//!   registration requests, probes known devices, retries unconfirmed
//!   commands, ends pulses and detects silent devices.
//! - [`Gateway::receive`], called for every datagram, applies `syncPilot`
//!   and `firstBeat` reports and auto-discovers unknown devices.
//!
//! Outgoing messages are queued and sent by the [`Transport`] event loop.
//!
//! ```
//! use std::net::SocketAddr;
//! use std::time::SystemTime;
//! use wiz_gateway::{DeviceConfig, Gateway, GatewayConfig};
//!
//! let mut gateway = Gateway::new(Vec::new());
//! let config = GatewayConfig::with_devices(vec![DeviceConfig::new("porch", "a8bb50aabbcc", "")]);
//! gateway.reload(&config, "ON STARTUP", SystemTime::now()).unwrap();
//!
//! let from: SocketAddr = "192.168.1.50:38899".parse().unwrap();
//! gateway.receive(
//!     br#"{"method":"syncPilot","params":{"mac":"a8bb50aabbcc","state":false}}"#,
//!     from,
//!     SystemTime::now(),
//! );
//! gateway.set(0, true, None, "hub", SystemTime::now()).unwrap();
//! assert!(gateway.commanded(0));
//! assert_eq!(gateway.drain_outbox().len(), 1);
//! ```
//!
//! ## Communication
//!
//! Devices accept commands on UDP port 38899 and push their reports to the
//! gateway on port 38900. All messages are JSON, NUL-terminated on the wire.
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

mod command;
mod config;
mod device;
mod errors;
mod gateway;
mod history;
mod inbound;
mod network;
mod payload;
pub mod push;
mod reconcile;
mod registry;
pub mod runtime;
mod transport;

// Re-export public API
pub use command::{BROADCAST_ID, CommandIssuer, Datagram, ID_OFFSET, device_id};
pub use config::{DeviceConfig, GatewayConfig, WizSection};
pub use device::{ACK_WINDOW, Device, DeviceState, DeviceStatus, SILENCE_THRESHOLD};
pub use errors::Error;
pub use gateway::Gateway;
pub use history::{Event, EventAction, EventHistory};
pub use network::{InterfaceSource, NetworkInterface, SystemInterfaces, format_mac};
pub use payload::{Message, PilotParams, RegistrationParams};
pub use reconcile::{DISCOVERY_INTERVAL, PROBE_INTERVAL, SCAN_INTERVAL};
pub use registry::{Registry, StateSummary};
pub use transport::{TICK, Transport};

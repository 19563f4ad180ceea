//! Outbound command queue.
//!
//! Commands are fire-and-forget: the only acknowledgment is the device's
//! next report. The issuer formats messages into an outbox that the
//! transport drains after every tick and every received datagram.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use log::{debug, error};

use crate::device::Device;
use crate::network::NetworkInterface;
use crate::payload::Message;
use crate::push::RESPOND_PORT;

/// Offset "signing" message ids that carry a device index. Only useful for
/// correlating traffic in captures; ids are never read back.
pub const ID_OFFSET: u32 = 12000;
/// Id of the registration broadcast.
pub const BROADCAST_ID: u32 = 1;

/// Message id used for commands to the device at `index`.
pub fn device_id(index: usize) -> u32 {
    ID_OFFSET.saturating_add(u32::try_from(index).unwrap_or(u32::MAX))
}

/// A datagram waiting to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub to: SocketAddr,
    pub payload: Vec<u8>,
}

impl Datagram {
    /// The payload as text, without the NUL terminator.
    pub fn text(&self) -> String {
        let end = self.payload.iter().position(|b| *b == 0).unwrap_or(self.payload.len());
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct CommandIssuer {
    outbox: Vec<Datagram>,
    interfaces: Vec<NetworkInterface>,
    broadcast: SocketAddr,
}

impl Default for CommandIssuer {
    fn default() -> Self {
        Self::new(RESPOND_PORT)
    }
}

impl CommandIssuer {
    pub fn new(device_port: u16) -> Self {
        CommandIssuer {
            outbox: Vec::new(),
            interfaces: Vec::new(),
            broadcast: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, device_port)),
        }
    }

    pub fn broadcast_address(&self) -> SocketAddr {
        self.broadcast
    }

    pub fn interfaces(&self) -> &[NetworkInterface] {
        &self.interfaces
    }

    pub fn set_interfaces(&mut self, interfaces: Vec<NetworkInterface>) {
        self.interfaces = interfaces;
    }

    /// Ask devices at `to` to report to us, once per local interface.
    pub fn register(&mut self, to: SocketAddr, id: u32) {
        let messages: Vec<Message> = self
            .interfaces
            .iter()
            .map(|iface| Message::registration(id, iface))
            .collect();
        for msg in messages {
            self.queue(to, &msg);
        }
    }

    /// Registration broadcast, answered by every device on the network.
    pub fn register_all(&mut self) {
        self.register(self.broadcast, BROADCAST_ID);
    }

    /// Switch the device at `index`. Nothing is sent to a device whose
    /// address is unknown; returns whether a command was queued.
    pub fn control(&mut self, index: usize, device: &Device, state: bool) -> bool {
        let Some(to) = device.network_address() else {
            debug!("no address for {}, command not sent", device.name());
            return false;
        };
        self.queue(to, &Message::set_pilot(device_id(index), state));
        true
    }

    /// Datagrams queued so far.
    pub fn outbox(&self) -> &[Datagram] {
        &self.outbox
    }

    pub fn drain(&mut self) -> Vec<Datagram> {
        std::mem::take(&mut self.outbox)
    }

    fn queue(&mut self, to: SocketAddr, msg: &Message) {
        match msg.to_bytes() {
            Ok(payload) => {
                debug!("queue packet to {to}: {}", String::from_utf8_lossy(&payload));
                self.outbox.push(Datagram { to, payload });
            }
            Err(e) => error!("cannot format message for {to}: {e}"),
        }
    }
}

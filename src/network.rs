//! Local network interface enumeration.
//!
//! The Wiz registration message identifies the "phone" (here, the gateway)
//! by IP and MAC address, so the gateway registers once per local interface.

use std::net::IpAddr;

use log::{debug, warn};

/// A local network interface usable for device registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    pub name: String,
    /// Dotted IPv4 address.
    pub ip: String,
    /// Lowercase hexadecimal MAC address without separators; empty if unknown.
    pub mac: String,
}

/// Source of the local interface list.
pub trait InterfaceSource: Send {
    fn enumerate(&self) -> Vec<NetworkInterface>;
}

/// Enumerates the interfaces of this host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemInterfaces;

impl SystemInterfaces {
    const MAX_INTERFACES: usize = 8;
}

impl InterfaceSource for SystemInterfaces {
    fn enumerate(&self) -> Vec<NetworkInterface> {
        let addrs = match if_addrs::get_if_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!("cannot list network interfaces: {e}");
                return Vec::new();
            }
        };

        let mut interfaces: Vec<NetworkInterface> = Vec::new();
        for iface in addrs {
            if iface.is_loopback() {
                continue;
            }
            let IpAddr::V4(ip) = iface.ip() else { continue };
            if interfaces.iter().any(|known| known.name == iface.name) {
                continue;
            }
            if interfaces.len() >= Self::MAX_INTERFACES {
                break;
            }
            let mac = match mac_address::mac_address_by_name(&iface.name) {
                Ok(Some(mac)) => format_mac(&mac.bytes()),
                Ok(None) => String::new(),
                Err(e) => {
                    debug!("no MAC address for {}: {e}", iface.name);
                    String::new()
                }
            };
            interfaces.push(NetworkInterface {
                name: iface.name,
                ip: ip.to_string(),
                mac,
            });
        }

        for iface in &interfaces {
            debug!("interface {}: IP {}, MAC {}", iface.name, iface.ip, iface.mac);
        }
        interfaces
    }
}

/// A fixed interface list.
impl InterfaceSource for Vec<NetworkInterface> {
    fn enumerate(&self) -> Vec<NetworkInterface> {
        self.clone()
    }
}

/// Format a hardware address as lowercase hex without separators.
///
/// # Examples
///
/// ```
/// use wiz_gateway::format_mac;
///
/// assert_eq!(format_mac(&[0xA8, 0xBB, 0x50, 0x01, 0x02, 0x0f]), "a8bb5001020f");
/// ```
pub fn format_mac(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

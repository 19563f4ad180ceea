//! Outbound Wiz messages.
//!
//! Only two messages are ever sent by the gateway: `registration`, which
//! asks a device to report its state to us, and `setPilot`, which switches it.

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::network::NetworkInterface;

type Result<T> = std::result::Result<T, Error>;

/// Parameters of a `registration` message.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationParams {
    pub phone_ip: String,
    pub register: bool,
    pub phone_mac: String,
}

/// Parameters of a `setPilot` message.
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PilotParams {
    pub state: Option<bool>,
}

/// A message sent to a Wiz device.
///
/// # Examples
///
/// ```
/// use wiz_gateway::Message;
///
/// let msg = Message::set_pilot(12001, true);
/// assert_eq!(
///     msg.to_json().unwrap(),
///     r#"{"method":"setPilot","id":12001,"env":"pro","params":{"state":true}}"#
/// );
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum Message {
    Registration { id: u32, params: RegistrationParams },
    SetPilot { id: u32, env: String, params: PilotParams },
}

impl Message {
    /// Registration on behalf of one local interface.
    pub fn registration(id: u32, iface: &NetworkInterface) -> Self {
        Message::Registration {
            id,
            params: RegistrationParams {
                phone_ip: iface.ip.clone(),
                register: true,
                phone_mac: iface.mac.clone(),
            },
        }
    }

    /// Switch a device on or off.
    pub fn set_pilot(id: u32, state: bool) -> Self {
        Message::SetPilot {
            id,
            env: "pro".to_string(),
            params: PilotParams { state: Some(state) },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::JsonDump)
    }

    /// Wire form: the JSON text followed by a NUL byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self).map_err(Error::JsonDump)?;
        bytes.push(0);
        Ok(bytes)
    }
}

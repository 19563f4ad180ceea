//! Device reports pushed to the gateway's listen port.
//!
//! Once registered, Wiz devices send `syncPilot` messages whenever their
//! state changes (and periodically), and a `firstBeat` message when they
//! are powered up by hand.

use serde_json::Value;

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Port the gateway listens on for device reports.
pub const LISTEN_PORT: u16 = 38900;
/// Port devices accept commands on.
pub const RESPOND_PORT: u16 = 38899;

/// What a device told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// The device was just switched on locally.
    FirstBeat,
    /// The device reports its current on/off state.
    SyncPilot { state: bool },
}

impl ReportKind {
    /// The on/off state carried by the report. A first beat implies "on".
    pub fn state(&self) -> bool {
        match self {
            ReportKind::FirstBeat => true,
            ReportKind::SyncPilot { state } => *state,
        }
    }
}

/// A parsed device report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub mac: String,
    pub kind: ReportKind,
}

/// Parse a received datagram.
///
/// Returns `Ok(None)` for well-formed messages the gateway does not care
/// about (other methods).
///
/// # Examples
///
/// ```
/// use wiz_gateway::push::{parse_report, ReportKind};
///
/// let report = parse_report(br#"{"method":"syncPilot","params":{"mac":"a8bb50aabbcc","state":true}}"#)
///     .unwrap()
///     .unwrap();
/// assert_eq!(report.mac, "a8bb50aabbcc");
/// assert_eq!(report.kind, ReportKind::SyncPilot { state: true });
/// ```
pub fn parse_report(data: &[u8]) -> Result<Option<DeviceReport>> {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    let text = String::from_utf8(data[..end].to_vec()).map_err(Error::Utf8Decode)?;
    let msg: Value = serde_json::from_str(&text).map_err(Error::JsonLoad)?;

    let method = msg
        .get("method")
        .and_then(|m| m.as_str())
        .ok_or(Error::MissingField("method"))?;
    if method != "firstBeat" && method != "syncPilot" {
        return Ok(None);
    }

    let params = msg.get("params");
    let mac = params
        .and_then(|p| p.get("mac"))
        .and_then(|m| m.as_str())
        .ok_or(Error::MissingField("MAC address"))?;

    let kind = if method == "firstBeat" {
        ReportKind::FirstBeat
    } else {
        let state = params
            .and_then(|p| p.get("state"))
            .and_then(|s| s.as_bool())
            .ok_or(Error::MissingField("state"))?;
        ReportKind::SyncPilot { state }
    };

    Ok(Some(DeviceReport {
        mac: mac.to_string(),
        kind,
    }))
}

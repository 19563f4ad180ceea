//! Gateway configuration document.
//!
//! The configuration is a JSON document listing the known devices:
//!
//! ```json
//! { "wiz": { "devices": [
//!     { "name": "porch", "address": "a8bb50aabbcc", "description": "Front porch" }
//! ] } }
//! ```

use std::io::ErrorKind;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// One configured device.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    #[serde(default)]
    pub name: String,
    /// MAC address of the device, as reported in its `params.mac`.
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
}

impl DeviceConfig {
    pub fn new(name: &str, address: &str, description: &str) -> Self {
        DeviceConfig {
            name: name.to_string(),
            address: address.to_string(),
            description: description.to_string(),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WizSection {
    pub devices: Option<Vec<DeviceConfig>>,
}

/// The whole configuration document.
///
/// Sections other than `wiz` are ignored.
///
/// # Examples
///
/// ```
/// use wiz_gateway::GatewayConfig;
///
/// let config = GatewayConfig::parse(r#"{"wiz":{"devices":[
///     {"name":"porch","address":"a8bb50aabbcc","description":"Front porch"}
/// ]}}"#).unwrap();
/// assert_eq!(config.devices().unwrap().len(), 1);
///
/// assert!(GatewayConfig::parse("").unwrap().devices().unwrap().is_empty());
/// ```
#[serde_with::skip_serializing_none]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub wiz: Option<WizSection>,
}

impl GatewayConfig {
    /// Build a document holding exactly the given devices.
    pub fn with_devices(devices: Vec<DeviceConfig>) -> Self {
        GatewayConfig {
            wiz: Some(WizSection {
                devices: Some(devices),
            }),
        }
    }

    /// Parse a configuration document. Blank text is an empty configuration.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the configuration file. A missing file is an empty configuration.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no configuration file at {}", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Write this configuration to the given file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|e| Error::io(path, e))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::JsonDump)
    }

    /// The configured device list.
    ///
    /// A document without a `wiz` section describes zero devices, but a `wiz`
    /// section without a `devices` array is rejected.
    pub fn devices(&self) -> Result<&[DeviceConfig]> {
        match &self.wiz {
            None => Ok(&[][..]),
            Some(WizSection {
                devices: Some(devices),
            }) => Ok(devices.as_slice()),
            Some(WizSection { devices: None }) => {
                Err(Error::Config("cannot find devices array".to_string()))
            }
        }
    }
}

use std::string::FromUtf8Error;

/// All error types that can occur while running the gateway.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A network socket operation failed.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// A datagram received from a device contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// A device report lacked a required field, or the field had the wrong type.
    #[error("no valid {0} in report")]
    MissingField(&'static str),

    /// The configuration document is structurally invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading or writing the configuration file failed.
    #[error("configuration file {path}: {err:?}")]
    Io { path: String, err: std::io::Error },

    /// No device exists at the given registry index.
    #[error("no device at index {0}")]
    DeviceNotFound(usize),

    /// A pulse duration too large to schedule.
    #[error("pulse of {0} seconds is out of range")]
    PulseOutOfRange(u64),
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new configuration file error
    pub fn io(path: &std::path::Path, err: std::io::Error) -> Self {
        Error::Io {
            path: path.display().to_string(),
            err,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

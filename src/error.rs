//! Error types.
//!
//! Every public operation reports failure synchronously through [`HidResult`].
//! Native failures keep the underlying [`std::io::Error`] as their source, so
//! the OS-formatted message (FormatMessage on Windows, `strerror` on Linux) is
//! available through `Display`.

use std::io;

use thiserror::Error;

use crate::descriptor::DeviceString;
use crate::handle::Handle;

/// Convenience alias used throughout the crate.
pub type HidResult<T> = Result<T, HidError>;

/// Failure taxonomy for enumeration, open, I/O and string queries.
#[derive(Error, Debug)]
pub enum HidError {
    /// Every slot in the handle table is occupied.
    #[error("all {capacity} device slots are in use")]
    CapacityExhausted { capacity: usize },

    /// The handle is out of range or refers to a released slot.
    #[error("invalid device handle {0}")]
    InvalidHandle(Handle),

    /// No enumerated device matched the requested identity.
    #[error("no device matches {vendor_id:04x}:{product_id:04x}{}", serial_suffix(.serial_number))]
    DeviceNotFound {
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<String>,
    },

    /// The OS refused to open the device node, or it does not exist.
    #[error("failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A native read, write, mode change or string query failed mid-operation.
    #[error("{op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The device (or the platform) has no such descriptor string.
    #[error("device does not provide a {0} string")]
    StringUnavailable(DeviceString),

    /// The OS device walk could not be started at all.
    #[error("device enumeration failed: {0}")]
    Enumeration(#[source] io::Error),

    /// Configuration was rejected.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// An enumeration result could not be rendered as JSON.
    #[error("failed to serialise device list: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn serial_suffix(serial: &Option<String>) -> String {
    match serial {
        Some(s) => format!(" with serial {s:?}"),
        None => String::new(),
    }
}

impl HidError {
    /// `true` for failures reported by the OS while talking to a device.
    pub fn is_native(&self) -> bool {
        matches!(self, HidError::OpenFailed { .. } | HidError::Io { .. })
    }

    /// The underlying OS error, if this failure has one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            HidError::OpenFailed { source, .. }
            | HidError::Io { source, .. }
            | HidError::Enumeration(source) => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_includes_serial_only_when_given() {
        let plain = HidError::DeviceNotFound {
            vendor_id: 0x04d8,
            product_id: 0x003f,
            serial_number: None,
        };
        assert_eq!(plain.to_string(), "no device matches 04d8:003f");

        let with_serial = HidError::DeviceNotFound {
            vendor_id: 0x04d8,
            product_id: 0x003f,
            serial_number: Some("12345".into()),
        };
        assert_eq!(
            with_serial.to_string(),
            "no device matches 04d8:003f with serial \"12345\""
        );
    }

    #[test]
    fn native_classification() {
        let io = HidError::Io {
            op: "write",
            source: io::Error::from(io::ErrorKind::BrokenPipe),
        };
        assert!(io.is_native());
        assert!(io.os_error().is_some());

        let full = HidError::CapacityExhausted { capacity: 64 };
        assert!(!full.is_native());
        assert!(full.os_error().is_none());
    }
}

//! Runtime configuration.
//!
//! [`HidConfig`] controls the handle table size and a few native open
//! options. Every field has a default, so an empty TOML document is valid:
//!
//! ```toml
//! max_open_devices = 16
//! enumeration_string_len = 256
//! start_nonblocking = true
//! exclusive = false
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HidError, HidResult};
use crate::handle::BlockingMode;

/// Handle table capacity used when nothing else is configured.
pub const DEFAULT_MAX_OPEN_DEVICES: usize = 64;

/// UTF-16 units read per descriptor string during enumeration.
pub const DEFAULT_ENUMERATION_STRING_LEN: usize = 512;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HidConfig {
    /// Number of devices that may be open at once.
    pub max_open_devices: usize,

    /// Maximum length of serial/manufacturer/product strings captured by enumeration.
    pub enumeration_string_len: usize,

    /// Open new handles in non-blocking read mode.
    pub start_nonblocking: bool,

    /// Windows: deny other processes access while a device is open (share mode 0).
    /// Ignored on Linux.
    pub exclusive: bool,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            max_open_devices: DEFAULT_MAX_OPEN_DEVICES,
            enumeration_string_len: DEFAULT_ENUMERATION_STRING_LEN,
            start_nonblocking: false,
            exclusive: false,
        }
    }
}

impl HidConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> HidResult<Self> {
        let config: HidConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> HidResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| HidError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> HidResult<()> {
        if self.max_open_devices == 0 {
            return Err(HidError::Config(
                "max_open_devices must be at least 1".into(),
            ));
        }
        if self.enumeration_string_len == 0 {
            return Err(HidError::Config(
                "enumeration_string_len must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Mode given to freshly opened handles.
    pub fn initial_mode(&self) -> BlockingMode {
        BlockingMode::from_nonblocking(self.start_nonblocking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(HidConfig::from_toml_str("").unwrap(), HidConfig::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = HidConfig::from_toml_str(
            "max_open_devices = 4\nstart_nonblocking = true\nexclusive = true\n",
        )
        .unwrap();
        assert_eq!(cfg.max_open_devices, 4);
        assert_eq!(cfg.enumeration_string_len, DEFAULT_ENUMERATION_STRING_LEN);
        assert_eq!(cfg.initial_mode(), BlockingMode::NonBlocking);
        assert!(cfg.exclusive);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = HidConfig::from_toml_str("max_open_devices = 0").unwrap_err();
        assert!(matches!(err, HidError::Config(_)));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = HidConfig::from_toml_str("max_devices = 3").unwrap_err();
        assert!(matches!(err, HidError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = HidConfig::load("/nonexistent/hidio.toml").unwrap_err();
        assert!(matches!(err, HidError::Config(_)));
    }
}

//! Device descriptors produced by enumeration.
//!
//! [`DeviceDescriptor`] is an owned snapshot of one HID interface taken during
//! a single enumeration call. It is independent of any open handle; strings
//! queried later through [`HidManager`](crate::manager::HidManager) come from
//! the live device and may differ.
//!
//! # Conventions
//! - `path` is an OS-specific node identifier (`\\?\hid#...` on Windows,
//!   `/dev/hidrawN` on Linux). Treat it as opaque; pass it back to
//!   [`open_path`](crate::manager::HidManager::open_path) unchanged.
//! - String fields are `None` when the OS reports no string or an empty one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::wide::WideString;

/// Snapshot of one HID device found during enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// USB Vendor ID (VID).
    pub vendor_id: u16,

    /// USB Product ID (PID).
    pub product_id: u16,

    /// Platform device node path.
    pub path: String,

    /// iSerialNumber string, if the device has one.
    pub serial_number: Option<WideString>,

    /// iManufacturer string, if the device has one.
    pub manufacturer_string: Option<WideString>,

    /// iProduct string, if the device has one.
    pub product_string: Option<WideString>,
}

impl DeviceDescriptor {
    /// Descriptor with ids and path only; strings start absent.
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            path: path.into(),
            serial_number: None,
            manufacturer_string: None,
            product_string: None,
        }
    }

    /// `true` when this descriptor has the given serial number.
    ///
    /// A device without a serial never matches.
    pub fn has_serial(&self, serial: &WideString) -> bool {
        self.serial_number.as_ref() == Some(serial)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)?;
        if let Some(product) = &self.product_string {
            write!(f, " {product}")?;
        }
        if let Some(serial) = &self.serial_number {
            write!(f, " [{serial}]")?;
        }
        write!(f, " @ {}", self.path)
    }
}

/// Vendor/product filter applied during enumeration.
///
/// `(0, 0)` is the wildcard and matches every device; any other pair must
/// match exactly (a zero in only one position is not a partial wildcard).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceFilter {
    pub const ANY: DeviceFilter = DeviceFilter {
        vendor_id: 0,
        product_id: 0,
    };

    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.vendor_id == 0 && self.product_id == 0
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.is_wildcard() || (self.vendor_id == vendor_id && self.product_id == product_id)
    }
}

/// Which descriptor string to query from a live device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeviceString {
    Manufacturer,
    Product,
    SerialNumber,
    /// Arbitrary USB string descriptor by index.
    Indexed(u32),
}

impl DeviceString {
    /// Short operation name used in diagnostics.
    pub(crate) fn op_name(&self) -> &'static str {
        match self {
            DeviceString::Manufacturer => "get manufacturer string",
            DeviceString::Product => "get product string",
            DeviceString::SerialNumber => "get serial number string",
            DeviceString::Indexed(_) => "get indexed string",
        }
    }
}

impl fmt::Display for DeviceString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceString::Manufacturer => f.write_str("manufacturer"),
            DeviceString::Product => f.write_str("product"),
            DeviceString::SerialNumber => f.write_str("serial number"),
            DeviceString::Indexed(i) => write!(f, "index {i}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_everything() {
        let f = DeviceFilter::ANY;
        assert!(f.is_wildcard());
        assert!(f.matches(0x04d8, 0x003f));
        assert!(f.matches(0xffff, 0x0000));
    }

    #[test]
    fn exact_pair_only() {
        let f = DeviceFilter::new(0x04d8, 0x003f);
        assert!(f.matches(0x04d8, 0x003f));
        assert!(!f.matches(0x04d8, 0x0033));
        assert!(!f.matches(0x045e, 0x003f));

        // Half-zero is not a wildcard.
        let vendor_only = DeviceFilter::new(0x04d8, 0);
        assert!(!vendor_only.matches(0x04d8, 0x003f));
    }

    #[test]
    fn serial_match_requires_a_serial() {
        let mut d = DeviceDescriptor::new(0x04d8, 0x003f, "/dev/hidraw0");
        let wanted = WideString::from("12345");
        assert!(!d.has_serial(&wanted));
        d.serial_number = Some(WideString::from("12345"));
        assert!(d.has_serial(&wanted));
    }

    #[test]
    fn display_is_compact() {
        let mut d = DeviceDescriptor::new(0x04d8, 0x003f, "/dev/hidraw3");
        d.product_string = Some("Simple HID Device Demo".into());
        assert_eq!(
            d.to_string(),
            "04d8:003f Simple HID Device Demo @ /dev/hidraw3"
        );
    }
}

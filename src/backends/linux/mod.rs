//! Linux backend (udev + hidraw).
//!
//! Enumeration walks the udev `hidraw` subsystem. Each node's identity comes
//! from its parent `usb_device` (`idVendor`, `idProduct`, `serial`,
//! `manufacturer`, `product` sysfs attributes). Nodes without a USB parent,
//! such as Bluetooth devices, fall back to the parent `hid` device's
//! `HID_ID`/`HID_UNIQ`/`HID_NAME` properties. Nodes with neither are skipped.
//!
//! Opened devices are plain `/dev/hidrawN` descriptors; see [`hidraw`].

pub mod hidraw;

use std::ffi::OsStr;
use std::io;

use tracing::trace;

use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::device::Backend;
use crate::wide::{parse_hex_u16, WideString};

pub use hidraw::HidrawDevice;

/// udev/hidraw implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct LinuxBackend;

impl LinuxBackend {
    pub fn new() -> io::Result<Self> {
        Ok(Self)
    }
}

impl Backend for LinuxBackend {
    type Device = HidrawDevice;

    fn enumerate(
        &self,
        filter: DeviceFilter,
        config: &HidConfig,
    ) -> io::Result<Vec<DeviceDescriptor>> {
        let mut enumerator = udev::Enumerator::new()?;
        enumerator.match_subsystem("hidraw")?;

        let mut out = Vec::new();
        for node in enumerator.scan_devices()? {
            let Some(devnode) = node.devnode() else {
                trace!(syspath = %node.syspath().display(), "hidraw entry has no device node");
                continue;
            };
            let Some(identity) = Identity::of(&node) else {
                trace!(devnode = %devnode.display(), "skipping hidraw node without usable identity");
                continue;
            };
            let (vendor_id, product_id) = identity.ids();
            if !filter.matches(vendor_id, product_id) {
                continue;
            }

            let maxlen = config.enumeration_string_len;
            out.push(DeviceDescriptor {
                vendor_id,
                product_id,
                path: devnode.to_string_lossy().into_owned(),
                serial_number: identity.string(DeviceString::SerialNumber, maxlen),
                manufacturer_string: identity.string(DeviceString::Manufacturer, maxlen),
                product_string: identity.string(DeviceString::Product, maxlen),
            });
        }
        Ok(out)
    }

    fn open(&self, path: &str, _config: &HidConfig) -> io::Result<HidrawDevice> {
        HidrawDevice::open(path)
    }
}

/// Where a hidraw node's ids and strings were found.
pub(crate) enum Identity {
    Usb {
        vendor_id: u16,
        product_id: u16,
        usb: udev::Device,
    },
    Hid {
        vendor_id: u16,
        product_id: u16,
        hid: udev::Device,
    },
}

impl Identity {
    /// Resolve the identity of a `hidraw` udev device.
    pub(crate) fn of(node: &udev::Device) -> Option<Self> {
        if let Ok(Some(usb)) = node.parent_with_subsystem_devtype("usb", "usb_device") {
            let vendor_id = usb.attribute_value("idVendor").and_then(hex_attr)?;
            let product_id = usb.attribute_value("idProduct").and_then(hex_attr)?;
            return Some(Identity::Usb {
                vendor_id,
                product_id,
                usb,
            });
        }

        let hid = node.parent_with_subsystem("hid").ok()??;
        let (vendor_id, product_id) = hid
            .property_value("HID_ID")
            .and_then(|v| parse_hid_id(&v.to_string_lossy()))?;
        Some(Identity::Hid {
            vendor_id,
            product_id,
            hid,
        })
    }

    pub(crate) fn ids(&self) -> (u16, u16) {
        match self {
            Identity::Usb {
                vendor_id,
                product_id,
                ..
            }
            | Identity::Hid {
                vendor_id,
                product_id,
                ..
            } => (*vendor_id, *product_id),
        }
    }

    /// Descriptor string, `None` when absent or empty.
    pub(crate) fn string(&self, which: DeviceString, maxlen: usize) -> Option<WideString> {
        let raw = match (self, which) {
            (Identity::Usb { usb, .. }, DeviceString::SerialNumber) => usb.attribute_value("serial"),
            (Identity::Usb { usb, .. }, DeviceString::Manufacturer) => {
                usb.attribute_value("manufacturer")
            }
            (Identity::Usb { usb, .. }, DeviceString::Product) => usb.attribute_value("product"),
            (Identity::Hid { hid, .. }, DeviceString::SerialNumber) => hid.property_value("HID_UNIQ"),
            (Identity::Hid { hid, .. }, DeviceString::Product) => hid.property_value("HID_NAME"),
            _ => None,
        }?;
        udev_string(raw, maxlen)
    }
}

fn hex_attr(value: &OsStr) -> Option<u16> {
    parse_hex_u16(&value.to_string_lossy())
}

fn udev_string(value: &OsStr, maxlen: usize) -> Option<WideString> {
    WideString::from(value.to_string_lossy().trim_end())
        .truncated(maxlen)
        .non_empty()
}

/// Parse a kernel `HID_ID` property: `BUS:VENDOR:PRODUCT`, all hexadecimal,
/// vendor and product zero-padded to eight digits.
fn parse_hid_id(raw: &str) -> Option<(u16, u16)> {
    let mut parts = raw.trim().split(':');
    let _bus = parts.next()?;
    let vendor = u32::from_str_radix(parts.next()?, 16).ok()?;
    let product = u32::from_str_radix(parts.next()?, 16).ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((u16::try_from(vendor).ok()?, u16::try_from(product).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hid_id_property() {
        assert_eq!(parse_hid_id("0005:0000046D:0000B342"), Some((0x046d, 0xb342)));
        assert_eq!(parse_hid_id("0003:000004D8:0000003F\n"), Some((0x04d8, 0x003f)));
        assert_eq!(parse_hid_id("0003:000104D8:0000003F"), None);
        assert_eq!(parse_hid_id("0003:04D8"), None);
        assert_eq!(parse_hid_id("garbage"), None);
    }

    #[test]
    fn udev_strings_treat_blank_as_absent() {
        assert_eq!(udev_string(OsStr::new(""), 16), None);
        assert_eq!(udev_string(OsStr::new("\n"), 16), None);
        assert_eq!(udev_string(OsStr::new("Microchip Technology Inc."), 9).unwrap(), "Microchip");
    }

    #[test]
    fn hex_attributes() {
        assert_eq!(hex_attr(OsStr::new("04d8")), Some(0x04d8));
        assert_eq!(hex_attr(OsStr::new("")), None);
    }
}

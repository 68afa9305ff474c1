//! Owned enumeration results.
//!
//! [`DeviceList`] is the result of one [`HidManager::enumerate`](crate::manager::HidManager::enumerate)
//! call: an ordered, owned batch of [`DeviceDescriptor`]s in the order the OS
//! reported them. Dropping the list releases every descriptor and its strings;
//! there is no separate free step and an empty list is just an empty vector.
//!
//! # Example
//! ```no_run
//! use hidio::HidManager;
//!
//! let hid = HidManager::new().expect("init hid");
//! for dev in hid.enumerate(0, 0).expect("enumerate") {
//!     println!("{dev}");
//! }
//! ```

use serde::Serialize;

use crate::descriptor::DeviceDescriptor;
use crate::error::HidResult;
use crate::wide::WideString;

/// Ordered batch of descriptors from one enumeration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DeviceList(Vec<DeviceDescriptor>);

impl DeviceList {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self(devices)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, DeviceDescriptor> {
        self.0.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&DeviceDescriptor> {
        self.0.get(index)
    }

    /// First device with these ids and, if given, this serial number.
    pub fn find(
        &self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&WideString>,
    ) -> Option<&DeviceDescriptor> {
        self.0.iter().find(|d| {
            d.vendor_id == vendor_id
                && d.product_id == product_id
                && serial_number.map_or(true, |s| d.has_serial(s))
        })
    }

    /// Pretty-printed JSON array of the descriptors.
    pub fn to_json(&self) -> HidResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Consume the list and return the inner vector.
    #[inline]
    pub fn into_vec(self) -> Vec<DeviceDescriptor> {
        self.0
    }
}

impl IntoIterator for DeviceList {
    type Item = DeviceDescriptor;
    type IntoIter = std::vec::IntoIter<DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a DeviceDescriptor;
    type IntoIter = std::slice::Iter<'a, DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DeviceList {
        let mut a = DeviceDescriptor::new(0x04d8, 0x003f, "/dev/hidraw0");
        a.serial_number = Some("AAA".into());
        let mut b = DeviceDescriptor::new(0x04d8, 0x003f, "/dev/hidraw1");
        b.serial_number = Some("BBB".into());
        let c = DeviceDescriptor::new(0x045e, 0x028e, "/dev/hidraw2");
        DeviceList::new(vec![a, b, c])
    }

    #[test]
    fn find_prefers_first_match_in_os_order() {
        let list = sample();
        assert_eq!(list.find(0x04d8, 0x003f, None).unwrap().path, "/dev/hidraw0");
    }

    #[test]
    fn find_by_serial() {
        let list = sample();
        let serial = WideString::from("BBB");
        assert_eq!(
            list.find(0x04d8, 0x003f, Some(&serial)).unwrap().path,
            "/dev/hidraw1"
        );
        let missing = WideString::from("CCC");
        assert!(list.find(0x04d8, 0x003f, Some(&missing)).is_none());
        // Devices without a serial never match a requested one.
        assert!(list.find(0x045e, 0x028e, Some(&serial)).is_none());
    }

    #[test]
    fn empty_list_drops_cleanly() {
        let list = DeviceList::default();
        assert!(list.is_empty());
        assert!(list.into_vec().is_empty());
    }

    #[test]
    fn json_uses_plain_strings() {
        let json = sample().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["serial_number"], "AAA");
        assert_eq!(value[2]["serial_number"], serde_json::Value::Null);
        assert_eq!(value[1]["vendor_id"], 0x04d8);
    }
}

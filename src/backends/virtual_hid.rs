//! In-memory HID backend.
//!
//! [`VirtualBackend`] behaves like a tiny device bus: plug in
//! [`VirtualDevice`]s, then enumerate and open them through a
//! [`HidManager`](crate::manager::HidManager) exactly as with real hardware.
//! The [`VirtualPort`] returned by [`VirtualBackend::plug`] plays the
//! firmware side: it queues input reports, records what the host wrote, and
//! can pull the plug mid-operation.
//!
//! ```
//! use hidio::backends::virtual_hid::{VirtualBackend, VirtualDevice};
//! use hidio::{HidConfig, HidManager};
//!
//! let bus = VirtualBackend::new();
//! let port = bus.plug(VirtualDevice::new("virtual:0", 0x04d8, 0x003f));
//! let mut hid = HidManager::with_backend(bus, HidConfig::default()).unwrap();
//!
//! let h = hid.open_path("virtual:0").unwrap();
//! port.push_report(&[0x81, 0x01]);
//! let mut buf = [0u8; 65];
//! assert_eq!(hid.read(h, &mut buf).unwrap(), 2);
//! ```

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::device::{Backend, NativeDevice};
use crate::handle::BlockingMode;
use crate::wide::WideString;

/// Description of a virtual device before it is plugged in.
#[derive(Clone, Debug)]
pub struct VirtualDevice {
    descriptor: DeviceDescriptor,
    indexed: BTreeMap<u32, WideString>,
    write_limit: Option<usize>,
    identifiable: bool,
    access_denied: bool,
}

impl VirtualDevice {
    pub fn new(path: &str, vendor_id: u16, product_id: u16) -> Self {
        Self {
            descriptor: DeviceDescriptor::new(vendor_id, product_id, path),
            indexed: BTreeMap::new(),
            write_limit: None,
            identifiable: true,
            access_denied: false,
        }
    }

    pub fn serial_number(mut self, s: &str) -> Self {
        self.descriptor.serial_number = Some(s.into());
        self
    }

    pub fn manufacturer(mut self, s: &str) -> Self {
        self.descriptor.manufacturer_string = Some(s.into());
        self
    }

    pub fn product(mut self, s: &str) -> Self {
        self.descriptor.product_string = Some(s.into());
        self
    }

    pub fn indexed_string(mut self, index: u32, s: &str) -> Self {
        self.indexed.insert(index, s.into());
        self
    }

    /// Accept at most `limit` bytes per write.
    pub fn write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Fail the identification step, so enumeration skips this device.
    pub fn unidentifiable(mut self) -> Self {
        self.identifiable = false;
        self
    }

    /// List the device but refuse to open it.
    pub fn access_denied(mut self) -> Self {
        self.access_denied = true;
        self
    }
}

struct Node {
    device: VirtualDevice,
    plugged: bool,
    inbox: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    opens: usize,
    fault: Option<io::ErrorKind>,
}

#[derive(Default)]
struct Bus {
    nodes: Vec<Node>,
}

#[derive(Default)]
struct Shared {
    bus: Mutex<Bus>,
    arrived: Condvar,
}

/// In-memory device bus implementing [`Backend`].
#[derive(Clone, Default)]
pub struct VirtualBackend {
    shared: Arc<Shared>,
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device; it shows up in the next enumeration.
    pub fn plug(&self, device: VirtualDevice) -> VirtualPort {
        let mut bus = self.shared.bus.lock();
        bus.nodes.push(Node {
            device,
            plugged: true,
            inbox: VecDeque::new(),
            written: Vec::new(),
            opens: 0,
            fault: None,
        });
        VirtualPort {
            shared: Arc::clone(&self.shared),
            id: bus.nodes.len() - 1,
        }
    }
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "device disconnected")
}

impl Node {
    /// Error for the next operation, if the device is gone or a fault is armed.
    fn check(&mut self) -> io::Result<()> {
        if !self.plugged {
            return Err(disconnected());
        }
        match self.fault.take() {
            Some(kind) => Err(io::Error::new(kind, "injected fault")),
            None => Ok(()),
        }
    }
}

impl Backend for VirtualBackend {
    type Device = VirtualHandle;

    fn enumerate(
        &self,
        filter: DeviceFilter,
        config: &HidConfig,
    ) -> io::Result<Vec<DeviceDescriptor>> {
        let bus = self.shared.bus.lock();
        let maxlen = config.enumeration_string_len;
        let snapshot = |s: &Option<WideString>| {
            s.clone()
                .map(|s| s.truncated(maxlen))
                .and_then(WideString::non_empty)
        };
        Ok(bus
            .nodes
            .iter()
            .filter(|n| n.plugged && n.device.identifiable)
            .map(|n| &n.device.descriptor)
            .filter(|d| filter.matches(d.vendor_id, d.product_id))
            .map(|d| DeviceDescriptor {
                vendor_id: d.vendor_id,
                product_id: d.product_id,
                path: d.path.clone(),
                serial_number: snapshot(&d.serial_number),
                manufacturer_string: snapshot(&d.manufacturer_string),
                product_string: snapshot(&d.product_string),
            })
            .collect())
    }

    fn open(&self, path: &str, _config: &HidConfig) -> io::Result<VirtualHandle> {
        let mut bus = self.shared.bus.lock();
        let (id, node) = bus
            .nodes
            .iter_mut()
            .enumerate()
            .find(|(_, n)| n.plugged && n.device.descriptor.path == path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such device"))?;
        if node.device.access_denied {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "access denied",
            ));
        }
        node.opens += 1;
        Ok(VirtualHandle {
            shared: Arc::clone(&self.shared),
            id,
        })
    }
}

/// Firmware-side view of a plugged virtual device.
#[derive(Clone)]
pub struct VirtualPort {
    shared: Arc<Shared>,
    id: usize,
}

impl VirtualPort {
    pub fn path(&self) -> String {
        self.shared.bus.lock().nodes[self.id]
            .device
            .descriptor
            .path
            .clone()
    }

    /// Queue an input report and wake any blocked reader.
    pub fn push_report(&self, report: &[u8]) {
        self.shared.bus.lock().nodes[self.id]
            .inbox
            .push_back(report.to_vec());
        self.shared.arrived.notify_all();
    }

    /// Reports queued but not yet read.
    pub fn pending(&self) -> usize {
        self.shared.bus.lock().nodes[self.id].inbox.len()
    }

    /// Every report accepted from the host so far, oldest first.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.bus.lock().nodes[self.id].written.clone()
    }

    /// Handles currently open on this device.
    pub fn open_count(&self) -> usize {
        self.shared.bus.lock().nodes[self.id].opens
    }

    /// Fail the next native operation on any handle to this device.
    pub fn fail_next(&self, kind: io::ErrorKind) {
        self.shared.bus.lock().nodes[self.id].fault = Some(kind);
    }

    pub fn is_plugged(&self) -> bool {
        self.shared.bus.lock().nodes[self.id].plugged
    }

    /// Detach the device. Blocked readers wake with an error; later I/O fails.
    pub fn unplug(&self) {
        let mut bus = self.shared.bus.lock();
        let node = &mut bus.nodes[self.id];
        node.plugged = false;
        node.inbox.clear();
        drop(bus);
        self.shared.arrived.notify_all();
    }
}

/// An open virtual device.
pub struct VirtualHandle {
    shared: Arc<Shared>,
    id: usize,
}

impl VirtualHandle {
    fn with_node<T>(&self, f: impl FnOnce(&mut Node) -> io::Result<T>) -> io::Result<T> {
        let mut bus = self.shared.bus.lock();
        let node = &mut bus.nodes[self.id];
        node.check()?;
        f(node)
    }
}

fn deliver(report: Vec<u8>, buf: &mut [u8]) -> usize {
    let n = report.len().min(buf.len());
    buf[..n].copy_from_slice(&report[..n]);
    n
}

impl NativeDevice for VirtualHandle {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.with_node(|node| {
            let accepted = node
                .device
                .write_limit
                .map_or(data.len(), |limit| limit.min(data.len()));
            node.written.push(data[..accepted].to_vec());
            Ok(accepted)
        })
    }

    fn read(&mut self, buf: &mut [u8], mode: BlockingMode) -> io::Result<usize> {
        let mut bus = self.shared.bus.lock();
        loop {
            let node = &mut bus.nodes[self.id];
            node.check()?;
            if let Some(report) = node.inbox.pop_front() {
                return Ok(deliver(report, buf));
            }
            if !mode.is_blocking() {
                return Ok(0);
            }
            self.shared.arrived.wait(&mut bus);
        }
    }

    fn set_blocking_mode(&mut self, _mode: BlockingMode) -> io::Result<()> {
        self.with_node(|_| Ok(()))
    }

    fn query_string(
        &mut self,
        which: DeviceString,
        _maxlen: usize,
    ) -> io::Result<Option<WideString>> {
        self.with_node(|node| {
            let d = &node.device;
            Ok(match which {
                DeviceString::Manufacturer => d.descriptor.manufacturer_string.clone(),
                DeviceString::Product => d.descriptor.product_string.clone(),
                DeviceString::SerialNumber => d.descriptor.serial_number.clone(),
                DeviceString::Indexed(i) => d.indexed.get(&i).cloned(),
            })
        })
    }
}

impl Drop for VirtualHandle {
    fn drop(&mut self) {
        let mut bus = self.shared.bus.lock();
        let node = &mut bus.nodes[self.id];
        node.opens = node.opens.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_skips_unplugged_and_unidentifiable() {
        let bus = VirtualBackend::new();
        let a = bus.plug(VirtualDevice::new("v0", 1, 2));
        bus.plug(VirtualDevice::new("v1", 1, 2).unidentifiable());
        bus.plug(VirtualDevice::new("v2", 3, 4));
        a.unplug();

        let all = bus.enumerate(DeviceFilter::ANY, &HidConfig::default()).unwrap();
        let paths: Vec<_> = all.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, ["v2"]);
    }

    #[test]
    fn enumeration_strings_are_clipped_and_normalised() {
        let bus = VirtualBackend::new();
        bus.plug(
            VirtualDevice::new("v0", 1, 2)
                .serial_number("")
                .product("Long Product Name"),
        );
        let cfg = HidConfig {
            enumeration_string_len: 4,
            ..HidConfig::default()
        };
        let list = bus.enumerate(DeviceFilter::ANY, &cfg).unwrap();
        assert_eq!(list[0].serial_number, None);
        assert_eq!(list[0].product_string.as_ref().unwrap(), "Long");
    }

    #[test]
    fn open_counts_follow_handle_lifetime() {
        let bus = VirtualBackend::new();
        let port = bus.plug(VirtualDevice::new("v0", 1, 2));
        let h = bus.open("v0", &HidConfig::default()).unwrap();
        assert_eq!(port.open_count(), 1);
        drop(h);
        assert_eq!(port.open_count(), 0);
    }

    #[test]
    fn long_reports_are_truncated_to_the_buffer() {
        let bus = VirtualBackend::new();
        let port = bus.plug(VirtualDevice::new("v0", 1, 2));
        let mut h = bus.open("v0", &HidConfig::default()).unwrap();
        port.push_report(&[1, 2, 3, 4, 5]);
        let mut buf = [0u8; 3];
        assert_eq!(h.read(&mut buf, BlockingMode::NonBlocking).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(port.pending(), 0);
    }
}

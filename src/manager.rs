//! Handle-based HID access.
//!
//! [`HidManager`] is the registry object a caller owns for the lifetime of its
//! HID work. It combines the platform [`Backend`], a fixed-size handle table and
//! per-handle diagnostics behind one small contract:
//!
//! - `enumerate` / `open` / `open_path` to find and open devices
//! - `write` / `read` / `set_nonblocking` for report I/O
//! - `manufacturer_string` and friends for live descriptor strings
//! - `last_error` for the most recent native failure on a handle
//! - `close` / `close_all` to release devices (dropping the manager does the same)
//!
//! Every handle-taking method validates the handle first and fails with
//! [`HidError::InvalidHandle`] without touching any native resource when it is
//! out of range or already closed.
//!
//! ## Diagnostics
//! A native failure stores `"<operation>: <os message>"` on the handle,
//! replacing any earlier one. The next native operation that succeeds on the
//! same handle clears it. Failures of other handles never affect it.
//!
//! ## Threads
//! The manager spawns nothing. A blocking `read` or a `write` suspends only the
//! calling thread. Methods that touch a device take `&mut self`, so sharing a
//! manager between threads requires the caller to serialise access.

use std::io;

use tracing::{debug, trace, warn};

use crate::backends::PlatformBackend;
use crate::config::HidConfig;
use crate::descriptor::{DeviceFilter, DeviceString};
use crate::device::{Backend, NativeDevice};
use crate::device_list::DeviceList;
use crate::error::{HidError, HidResult};
use crate::handle::{BlockingMode, Handle, HandleTable, Slot};
use crate::wide::WideString;

/// Caller-owned registry of open HID devices.
pub struct HidManager<B: Backend = PlatformBackend> {
    backend: B,
    config: HidConfig,
    table: HandleTable<B::Device>,
}

impl HidManager<PlatformBackend> {
    /// Manager for the platform backend with default configuration.
    pub fn new() -> HidResult<Self> {
        Self::with_config(HidConfig::default())
    }

    /// Manager for the platform backend.
    pub fn with_config(config: HidConfig) -> HidResult<Self> {
        let backend = PlatformBackend::new().map_err(HidError::Enumeration)?;
        Self::with_backend(backend, config)
    }
}

impl<B: Backend> HidManager<B> {
    /// Manager over an explicit backend.
    pub fn with_backend(backend: B, config: HidConfig) -> HidResult<Self> {
        config.validate()?;
        debug!(
            capacity = config.max_open_devices,
            start_nonblocking = config.start_nonblocking,
            "hid manager ready"
        );
        Ok(Self {
            table: HandleTable::with_capacity(config.max_open_devices),
            backend,
            config,
        })
    }

    pub fn config(&self) -> &HidConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Maximum number of simultaneously open devices.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of currently open devices.
    pub fn open_count(&self) -> usize {
        self.table.len()
    }

    /// Handles of every open device, lowest first.
    pub fn open_handles(&self) -> Vec<Handle> {
        self.table.handles()
    }

    /// List HID devices, optionally restricted to one vendor/product pair.
    ///
    /// `(0, 0)` lists everything. Order is the OS's native enumeration order.
    pub fn enumerate(&self, vendor_id: u16, product_id: u16) -> HidResult<DeviceList> {
        let filter = DeviceFilter::new(vendor_id, product_id);
        let devices = self
            .backend
            .enumerate(filter, &self.config)
            .map_err(HidError::Enumeration)?;
        debug!(
            vendor_id,
            product_id,
            found = devices.len(),
            "enumerated hid devices"
        );
        Ok(DeviceList::new(devices))
    }

    /// Open the first device with these ids (and serial number, if given).
    pub fn open(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        serial_number: Option<&WideString>,
    ) -> HidResult<Handle> {
        let devices = self.enumerate(vendor_id, product_id)?;
        let path = devices
            .find(vendor_id, product_id, serial_number)
            .map(|d| d.path.clone())
            .ok_or_else(|| HidError::DeviceNotFound {
                vendor_id,
                product_id,
                serial_number: serial_number.map(WideString::to_string_lossy),
            })?;
        drop(devices);
        self.open_path(&path)
    }

    /// Open a device node by its enumeration path.
    ///
    /// A full table fails with [`HidError::CapacityExhausted`] before the OS is
    /// asked for anything; an OS refusal fails with [`HidError::OpenFailed`]
    /// and leaves the table unchanged.
    pub fn open_path(&mut self, path: &str) -> HidResult<Handle> {
        let backend = &self.backend;
        let config = &self.config;
        let result = self.table.allocate_with(config.initial_mode(), || {
            let mut device = backend
                .open(path, config)
                .map_err(|source| HidError::OpenFailed {
                    path: path.to_owned(),
                    source,
                })?;
            if !config.initial_mode().is_blocking() {
                device
                    .set_blocking_mode(config.initial_mode())
                    .map_err(|source| HidError::OpenFailed {
                        path: path.to_owned(),
                        source,
                    })?;
            }
            Ok(device)
        });
        match &result {
            Ok(handle) => debug!(%handle, path, "opened hid device"),
            Err(e) => warn!(path, error = %e, "hid open failed"),
        }
        result
    }

    /// Send an output report and wait for the OS to accept it.
    ///
    /// The first byte is the report id (0 for devices without numbered reports).
    pub fn write(&mut self, handle: Handle, data: &[u8]) -> HidResult<usize> {
        let slot = self.table.get_mut(handle)?;
        #[cfg(feature = "debug-log")]
        trace!(%handle, len = data.len(), bytes = ?data, "hid write");
        let written = native(slot, handle, "write", |dev| dev.write(data))?;
        if written < data.len() {
            trace!(%handle, written, requested = data.len(), "partial hid write");
        }
        Ok(written)
    }

    /// Receive an input report.
    ///
    /// In blocking mode this waits for data or a device failure. In
    /// non-blocking mode it returns `Ok(0)` when nothing has arrived.
    pub fn read(&mut self, handle: Handle, buf: &mut [u8]) -> HidResult<usize> {
        let slot = self.table.get_mut(handle)?;
        let mode = slot.mode;
        let n = native(slot, handle, "read", |dev| dev.read(buf, mode))?;
        #[cfg(feature = "debug-log")]
        if n > 0 {
            trace!(%handle, len = n, bytes = ?&buf[..n], "hid read");
        }
        Ok(n)
    }

    /// Switch a handle between blocking and non-blocking reads.
    ///
    /// Only reads issued after this call are affected.
    pub fn set_nonblocking(&mut self, handle: Handle, nonblocking: bool) -> HidResult<()> {
        let slot = self.table.get_mut(handle)?;
        let mode = BlockingMode::from_nonblocking(nonblocking);
        native(slot, handle, "set blocking mode", |dev| {
            dev.set_blocking_mode(mode)
        })?;
        slot.mode = mode;
        trace!(%handle, ?mode, "blocking mode changed");
        Ok(())
    }

    /// Current read mode of a handle.
    pub fn blocking_mode(&self, handle: Handle) -> HidResult<BlockingMode> {
        Ok(self.table.get(handle)?.mode)
    }

    pub fn manufacturer_string(&mut self, handle: Handle, maxlen: usize) -> HidResult<WideString> {
        self.query_string(handle, DeviceString::Manufacturer, maxlen)
    }

    pub fn product_string(&mut self, handle: Handle, maxlen: usize) -> HidResult<WideString> {
        self.query_string(handle, DeviceString::Product, maxlen)
    }

    pub fn serial_number_string(&mut self, handle: Handle, maxlen: usize) -> HidResult<WideString> {
        self.query_string(handle, DeviceString::SerialNumber, maxlen)
    }

    /// Read USB string descriptor `index` from the device.
    pub fn indexed_string(
        &mut self,
        handle: Handle,
        index: u32,
        maxlen: usize,
    ) -> HidResult<WideString> {
        self.query_string(handle, DeviceString::Indexed(index), maxlen)
    }

    /// Query a descriptor string from the live device, at most `maxlen` UTF-16 units.
    ///
    /// A string that is empty after truncation is [`HidError::StringUnavailable`].
    pub fn query_string(
        &mut self,
        handle: Handle,
        which: DeviceString,
        maxlen: usize,
    ) -> HidResult<WideString> {
        let slot = self.table.get_mut(handle)?;
        if maxlen == 0 {
            return Ok(WideString::new());
        }
        native(slot, handle, which.op_name(), |dev| {
            dev.query_string(which, maxlen)
        })?
        .and_then(|s| s.truncated(maxlen).non_empty())
        .ok_or(HidError::StringUnavailable(which))
    }

    /// Most recent native failure on `handle`.
    ///
    /// `None` if nothing failed since the last successful native operation, or
    /// if the handle is not open.
    pub fn last_error(&self, handle: Handle) -> Option<&str> {
        self.table.get(handle).ok().and_then(Slot::last_error)
    }

    /// Close a device and free its slot for reuse.
    ///
    /// Closing an already-closed handle returns [`HidError::InvalidHandle`] and
    /// has no other effect.
    pub fn close(&mut self, handle: Handle) -> HidResult<()> {
        let slot = self.table.release(handle)?;
        drop(slot);
        debug!(%handle, "closed hid device");
        Ok(())
    }

    /// Close every open device.
    pub fn close_all(&mut self) {
        for handle in self.table.handles() {
            // Handles come straight from the table, so release cannot fail here.
            let _ = self.close(handle);
        }
    }
}

/// Run one native operation on a slot, keeping its diagnostic current.
fn native<D, T, F>(slot: &mut Slot<D>, handle: Handle, op: &'static str, f: F) -> HidResult<T>
where
    F: FnOnce(&mut D) -> io::Result<T>,
{
    match f(&mut slot.device) {
        Ok(v) => {
            slot.clear_error();
            Ok(v)
        }
        Err(source) => {
            warn!(%handle, op, error = %source, "hid operation failed");
            slot.record_error(format!("{op}: {source}"));
            Err(HidError::Io { op, source })
        }
    }
}

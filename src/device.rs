//! Backend seam.
//!
//! A [`Backend`] walks the OS device tree and opens device nodes; each opened
//! node is a [`NativeDevice`] owned by exactly one handle-table slot. The
//! platform backend is chosen at build time (see [`crate::backends`]), and
//! [`VirtualBackend`](crate::backends::virtual_hid::VirtualBackend) implements
//! the same traits in memory.
//!
//! Native methods speak `std::io::Result`; mapping into [`HidError`](crate::HidError)
//! and recording diagnostics is done once, by the manager.

use std::io;

use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::handle::BlockingMode;
use crate::wide::WideString;

/// Platform device discovery and open.
pub trait Backend {
    type Device: NativeDevice;

    /// Walk every HID device the OS knows of and describe those `filter` accepts.
    ///
    /// Devices whose identification fails are left out; only a failure to
    /// start the walk is an error.
    fn enumerate(
        &self,
        filter: DeviceFilter,
        config: &HidConfig,
    ) -> io::Result<Vec<DeviceDescriptor>>;

    /// Open a device node for reading and writing.
    fn open(&self, path: &str, config: &HidConfig) -> io::Result<Self::Device>;
}

/// An open device node.
///
/// Dropping the value releases the native resource.
pub trait NativeDevice {
    /// Send one output report, waiting until the OS has accepted it.
    ///
    /// Returns the number of bytes accepted, which may be less than `data.len()`.
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Receive one input report into `buf`.
    ///
    /// In [`BlockingMode::NonBlocking`] this returns `Ok(0)` when nothing is
    /// pending and leaves no request outstanding.
    fn read(&mut self, buf: &mut [u8], mode: BlockingMode) -> io::Result<usize>;

    /// Apply a blocking-mode change at the OS level, where the platform has one.
    fn set_blocking_mode(&mut self, mode: BlockingMode) -> io::Result<()>;

    /// Query a descriptor string from the live device.
    ///
    /// `Ok(None)` means the device or platform has no such string; an `Err`
    /// means the OS refused the query.
    fn query_string(&mut self, which: DeviceString, maxlen: usize)
        -> io::Result<Option<WideString>>;
}

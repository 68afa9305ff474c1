//! Fallback for platforms without a native backend.

use std::io;

use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::device::{Backend, NativeDevice};
use crate::handle::BlockingMode;
use crate::wide::WideString;

/// Finds no devices and refuses every open.
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl UnsupportedBackend {
    pub fn new() -> io::Result<Self> {
        Ok(Self)
    }
}

/// Never constructed; exists to satisfy [`Backend::Device`].
#[derive(Debug)]
pub enum UnsupportedDevice {}

fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "HID access is not implemented on this platform",
    )
}

impl Backend for UnsupportedBackend {
    type Device = UnsupportedDevice;

    fn enumerate(&self, _: DeviceFilter, _: &HidConfig) -> io::Result<Vec<DeviceDescriptor>> {
        Ok(Vec::new())
    }

    fn open(&self, _: &str, _: &HidConfig) -> io::Result<Self::Device> {
        Err(unsupported())
    }
}

impl NativeDevice for UnsupportedDevice {
    fn write(&mut self, _: &[u8]) -> io::Result<usize> {
        match *self {}
    }

    fn read(&mut self, _: &mut [u8], _: BlockingMode) -> io::Result<usize> {
        match *self {}
    }

    fn set_blocking_mode(&mut self, _: BlockingMode) -> io::Result<()> {
        match *self {}
    }

    fn query_string(&mut self, _: DeviceString, _: usize) -> io::Result<Option<WideString>> {
        match *self {}
    }
}

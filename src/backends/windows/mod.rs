#![cfg(target_os = "windows")]

//! Windows backend.
//!
//! - [`hid_discovery`] walks the HID device interface class with SetupDi and
//!   reads attributes and strings through a transient, zero-access handle.
//! - [`hid_device`] wraps an overlapped `CreateFileW` handle and implements
//!   synchronous writes and blocking/non-blocking reads on top of
//!   `ReadFile`/`WriteFile` + `GetOverlappedResult`.
//!
//! Most users should not touch these modules directly; go through
//! [`HidManager`](crate::manager::HidManager).

pub mod hid_device;
pub mod hid_discovery;

use std::io;
use std::ptr::{null, null_mut};

use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_GetIndexedString, HidD_GetManufacturerString, HidD_GetProductString,
    HidD_GetSerialNumberString,
};
use windows_sys::Win32::Foundation::{CloseHandle, HANDLE, INVALID_HANDLE_VALUE};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FILE_FLAGS_AND_ATTRIBUTES, FILE_SHARE_MODE, OPEN_EXISTING,
};

use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::device::Backend;
use crate::wide::WideString;

pub use hid_device::WindowsHidDevice;

/// HidD string calls reject buffers beyond this many UTF-16 units,
/// terminator included.
const MAX_STRING_UNITS: usize = 0xFFF;

/// SetupDi/HidD implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> io::Result<Self> {
        Ok(Self)
    }
}

impl Backend for WindowsBackend {
    type Device = WindowsHidDevice;

    fn enumerate(
        &self,
        filter: DeviceFilter,
        config: &HidConfig,
    ) -> io::Result<Vec<DeviceDescriptor>> {
        hid_discovery::enumerate(filter, config)
    }

    fn open(&self, path: &str, config: &HidConfig) -> io::Result<WindowsHidDevice> {
        WindowsHidDevice::open(path, config.exclusive)
    }
}

/// Owned Win32 handle, closed on drop.
#[derive(Debug)]
pub(crate) struct OwnedHandle(HANDLE);

impl OwnedHandle {
    #[inline]
    pub(crate) fn raw(&self) -> HANDLE {
        self.0
    }

    /// Take ownership of a handle returned by a Win32 call.
    ///
    /// Null and `INVALID_HANDLE_VALUE` become the thread's last OS error.
    pub(crate) fn from_raw(handle: HANDLE) -> io::Result<Self> {
        if handle.is_null() || handle == INVALID_HANDLE_VALUE {
            Err(io::Error::last_os_error())
        } else {
            Ok(Self(handle))
        }
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}

/// Open a device interface path.
pub(crate) fn open_path(
    path: &str,
    access: u32,
    share: FILE_SHARE_MODE,
    flags: FILE_FLAGS_AND_ATTRIBUTES,
) -> io::Result<OwnedHandle> {
    let wide = WideString::from(path).to_nul_terminated();
    let handle = unsafe {
        CreateFileW(
            wide.as_ptr(),
            access,
            share,
            null(),
            OPEN_EXISTING,
            flags,
            null_mut(),
        )
    };
    OwnedHandle::from_raw(handle)
}

/// Buffer size for a `maxlen`-unit string plus its terminator.
fn string_buffer_units(maxlen: usize) -> usize {
    maxlen.min(MAX_STRING_UNITS - 1) + 1
}

/// Read one descriptor string through HidD.
///
/// Failure is whatever `GetLastError` reports; an empty string is `Ok(None)`.
pub(crate) fn hid_string(
    handle: HANDLE,
    which: DeviceString,
    maxlen: usize,
) -> io::Result<Option<WideString>> {
    let units = string_buffer_units(maxlen);
    let mut buf = vec![0u16; units];
    let ptr = buf.as_mut_ptr().cast();
    let bytes = (units * 2) as u32;

    let ok = unsafe {
        match which {
            DeviceString::Manufacturer => HidD_GetManufacturerString(handle, ptr, bytes),
            DeviceString::Product => HidD_GetProductString(handle, ptr, bytes),
            DeviceString::SerialNumber => HidD_GetSerialNumberString(handle, ptr, bytes),
            DeviceString::Indexed(index) => HidD_GetIndexedString(handle, index, ptr, bytes),
        }
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(WideString::from_nul_terminated(&buf)
        .truncated(maxlen)
        .non_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_buffer_stays_within_hidd_limit() {
        assert_eq!(string_buffer_units(1), 2);
        assert_eq!(string_buffer_units(255), 256);
        assert_eq!(string_buffer_units(MAX_STRING_UNITS - 1), MAX_STRING_UNITS);
        assert_eq!(string_buffer_units(MAX_STRING_UNITS), MAX_STRING_UNITS);
        assert_eq!(string_buffer_units(usize::MAX), MAX_STRING_UNITS);
    }
}

//! Windows device discovery.
//!
//! Walks every present interface of the HID device class with SetupDi:
//!
//! - `SetupDiEnumDeviceInterfaces` until it reports no more members
//! - `SetupDiGetDeviceInterfaceDetailW` twice (size query, then fill) for the
//!   interface path
//! - a transient `CreateFileW` with **no** read/write access, which is enough
//!   for `HidD_GetAttributes` and the string calls even on devices the OS holds
//!   exclusively (keyboards, mice)
//!
//! Any per-device failure skips that device. Strings are read only for devices
//! that pass the vendor/product filter.

#![cfg(target_os = "windows")]

use std::io;
use std::mem;
use std::ptr::{addr_of, addr_of_mut, null, null_mut};

use tracing::trace;
use windows_sys::core::GUID;
use windows_sys::Win32::Devices::DeviceAndDriverInstallation::{
    SetupDiDestroyDeviceInfoList, SetupDiEnumDeviceInterfaces, SetupDiGetClassDevsW,
    SetupDiGetDeviceInterfaceDetailW, DIGCF_DEVICEINTERFACE, DIGCF_PRESENT, HDEVINFO,
    SP_DEVICE_INTERFACE_DATA, SP_DEVICE_INTERFACE_DETAIL_DATA_W,
};
use windows_sys::Win32::Devices::HumanInterfaceDevice::{
    HidD_GetAttributes, HidD_GetHidGuid, HIDD_ATTRIBUTES,
};
use windows_sys::Win32::Foundation::INVALID_HANDLE_VALUE;
use windows_sys::Win32::Storage::FileSystem::{FILE_SHARE_READ, FILE_SHARE_WRITE};

use super::{hid_string, open_path, OwnedHandle};
use crate::config::HidConfig;
use crate::descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
use crate::wide::WideString;

/// Device information set, destroyed on drop.
struct DevInfoSet(HDEVINFO);

impl Drop for DevInfoSet {
    fn drop(&mut self) {
        unsafe {
            SetupDiDestroyDeviceInfoList(self.0);
        }
    }
}

/// Enumerate present HID interfaces accepted by `filter`.
pub fn enumerate(filter: DeviceFilter, config: &HidConfig) -> io::Result<Vec<DeviceDescriptor>> {
    let mut guid: GUID = unsafe { mem::zeroed() };
    unsafe { HidD_GetHidGuid(&mut guid) };

    let set = unsafe {
        SetupDiGetClassDevsW(
            &guid,
            null(),
            null_mut(),
            DIGCF_PRESENT | DIGCF_DEVICEINTERFACE,
        )
    };
    if set as isize == INVALID_HANDLE_VALUE as isize {
        return Err(io::Error::last_os_error());
    }
    let set = DevInfoSet(set);

    let mut out = Vec::new();
    let mut index = 0u32;
    loop {
        let mut iface: SP_DEVICE_INTERFACE_DATA = unsafe { mem::zeroed() };
        iface.cbSize = mem::size_of::<SP_DEVICE_INTERFACE_DATA>() as u32;
        let more = unsafe { SetupDiEnumDeviceInterfaces(set.0, null(), &guid, index, &mut iface) };
        if more == 0 {
            // ERROR_NO_MORE_ITEMS
            break;
        }
        index += 1;

        let Some(path) = interface_path(&set, &iface) else {
            trace!(index, "no interface detail; skipping");
            continue;
        };
        match describe(&path, filter, config) {
            Ok(Some(desc)) => out.push(desc),
            Ok(None) => {}
            Err(e) => trace!(path, error = %e, "cannot identify hid interface; skipping"),
        }
    }
    Ok(out)
}

/// Device path of one interface, via the two-call detail pattern.
fn interface_path(set: &DevInfoSet, iface: &SP_DEVICE_INTERFACE_DATA) -> Option<String> {
    let mut required = 0u32;
    unsafe {
        SetupDiGetDeviceInterfaceDetailW(set.0, iface, null_mut(), 0, &mut required, null_mut());
    }
    if required == 0 {
        return None;
    }

    // u32 backing keeps the detail struct aligned.
    let mut buf = vec![0u32; (required as usize).div_ceil(4)];
    let detail = buf.as_mut_ptr().cast::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>();
    let ok = unsafe {
        addr_of_mut!((*detail).cbSize)
            .write_unaligned(mem::size_of::<SP_DEVICE_INTERFACE_DETAIL_DATA_W>() as u32);
        SetupDiGetDeviceInterfaceDetailW(set.0, iface, detail, required, null_mut(), null_mut())
    };
    if ok == 0 {
        return None;
    }

    let path_ptr = unsafe { addr_of!((*detail).DevicePath) }.cast::<u16>();
    let offset = path_ptr as usize - detail as usize;
    let units = (required as usize).saturating_sub(offset) / 2;
    let raw = unsafe { std::slice::from_raw_parts(path_ptr, units) };
    let path = WideString::from_nul_terminated(raw).to_string_lossy();
    (!path.is_empty()).then_some(path)
}

/// Identify one interface; `Ok(None)` when the filter rejects it.
fn describe(
    path: &str,
    filter: DeviceFilter,
    config: &HidConfig,
) -> io::Result<Option<DeviceDescriptor>> {
    let handle: OwnedHandle = open_path(path, 0, FILE_SHARE_READ | FILE_SHARE_WRITE, 0)?;

    let mut attrs: HIDD_ATTRIBUTES = unsafe { mem::zeroed() };
    attrs.Size = mem::size_of::<HIDD_ATTRIBUTES>() as u32;
    if unsafe { HidD_GetAttributes(handle.raw(), &mut attrs) } == 0 {
        return Err(io::Error::last_os_error());
    }
    if !filter.matches(attrs.VendorID, attrs.ProductID) {
        return Ok(None);
    }

    let maxlen = config.enumeration_string_len;
    let string = |which| hid_string(handle.raw(), which, maxlen).ok().flatten();
    Ok(Some(DeviceDescriptor {
        vendor_id: attrs.VendorID,
        product_id: attrs.ProductID,
        path: path.to_owned(),
        serial_number: string(DeviceString::SerialNumber),
        manufacturer_string: string(DeviceString::Manufacturer),
        product_string: string(DeviceString::Product),
    }))
}

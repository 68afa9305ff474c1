//! Native backends for `hidio`.
//!
//! Implementations of [`Backend`](crate::device::Backend) and
//! [`NativeDevice`](crate::device::NativeDevice) for each supported platform.
//! Exactly one is selected at build time as [`PlatformBackend`]:
//!
//! - **Windows**: SetupDi enumeration of the HID interface class, overlapped
//!   `ReadFile`/`WriteFile` on `CreateFileW` handles.
//! - **Linux**: udev enumeration of the `hidraw` subsystem, plain file
//!   descriptors with `poll(2)` readiness.
//! - **anything else**: a stub that finds no devices.
//!
//! [`virtual_hid`] is available everywhere and keeps devices in memory; tests
//! and demos use it in place of real hardware.

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod linux;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub mod unsupported;

pub mod virtual_hid;

#[cfg(target_os = "windows")]
pub type PlatformBackend = windows::WindowsBackend;

#[cfg(target_os = "linux")]
pub type PlatformBackend = linux::LinuxBackend;

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
pub type PlatformBackend = unsupported::UnsupportedBackend;

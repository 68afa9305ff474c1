//! Handle-based access to HID devices on Windows and Linux.
//!
//! Enumerate devices, open them into small integer [`Handle`]s, exchange raw
//! reports, and query their descriptor strings through one [`HidManager`]:
//!
//! ```no_run
//! use hidio::HidManager;
//!
//! let mut hid = HidManager::new()?;
//! for dev in &hid.enumerate(0, 0)? {
//!     println!("{dev}");
//! }
//!
//! let h = hid.open(0x04d8, 0x003f, None)?;
//! let mut report = [0u8; 65];
//! report[1] = 0x80;
//! hid.write(h, &report)?;
//! hid.close(h)?;
//! # Ok::<(), hidio::HidError>(())
//! ```
//!
//! The native implementation is picked at build time ([`PlatformBackend`]).
//! [`backends::virtual_hid`] provides an in-memory bus with the same surface
//! for tests.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod config;
pub mod descriptor;
pub mod device;
pub mod device_list;
pub mod error;
pub mod handle;
pub mod manager;
pub mod wide;

pub use backends::PlatformBackend;
pub use config::HidConfig;
pub use descriptor::{DeviceDescriptor, DeviceFilter, DeviceString};
pub use device::{Backend, NativeDevice};
pub use device_list::DeviceList;
pub use error::{HidError, HidResult};
pub use handle::{BlockingMode, Handle};
pub use manager::HidManager;
pub use wide::WideString;

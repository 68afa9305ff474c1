//! Open Windows HID device.
//!
//! The interface is opened with `FILE_FLAG_OVERLAPPED`. Every transfer is
//! started asynchronously and then settled with `GetOverlappedResult` before
//! the call returns, so the caller's buffer is never touched afterwards.
//!
//! Non-blocking reads check the request's event once. If it is not signalled
//! the request is cancelled with `CancelIo` and reaped; a report that landed
//! during the cancellation window is still returned.

use std::io;
use std::mem;
use std::ptr::null;

use windows_sys::Win32::Foundation::{
    GetLastError, ERROR_IO_PENDING, ERROR_OPERATION_ABORTED, FALSE, GENERIC_READ, GENERIC_WRITE,
    TRUE, WAIT_OBJECT_0,
};
use windows_sys::Win32::Storage::FileSystem::{
    ReadFile, WriteFile, FILE_FLAG_OVERLAPPED, FILE_SHARE_READ, FILE_SHARE_WRITE,
};
use windows_sys::Win32::System::Threading::{CreateEventW, WaitForSingleObject};
use windows_sys::Win32::System::IO::{CancelIo, GetOverlappedResult, OVERLAPPED};

use super::{hid_string, open_path, OwnedHandle};
use crate::descriptor::DeviceString;
use crate::device::NativeDevice;
use crate::handle::BlockingMode;
use crate::wide::WideString;

/// An open HID interface with one event per transfer direction.
#[derive(Debug)]
pub struct WindowsHidDevice {
    handle: OwnedHandle,
    read_event: OwnedHandle,
    write_event: OwnedHandle,
}

fn manual_reset_event() -> io::Result<OwnedHandle> {
    OwnedHandle::from_raw(unsafe { CreateEventW(null(), TRUE, FALSE, null()) })
}

fn transfer_len(len: usize) -> io::Result<u32> {
    u32::try_from(len)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "report too large"))
}

/// `Ok(())` when a transfer was started (or already finished).
fn started(ok: i32) -> io::Result<()> {
    if ok != 0 {
        return Ok(());
    }
    match unsafe { GetLastError() } {
        ERROR_IO_PENDING => Ok(()),
        code => Err(io::Error::from_raw_os_error(code as i32)),
    }
}

impl WindowsHidDevice {
    /// Open `path` for overlapped read/write.
    ///
    /// `exclusive` opens with no sharing, so other handles to the interface fail.
    pub fn open(path: &str, exclusive: bool) -> io::Result<Self> {
        let share = if exclusive {
            0
        } else {
            FILE_SHARE_READ | FILE_SHARE_WRITE
        };
        let handle = open_path(
            path,
            GENERIC_READ | GENERIC_WRITE,
            share,
            FILE_FLAG_OVERLAPPED,
        )?;
        Ok(Self {
            handle,
            read_event: manual_reset_event()?,
            write_event: manual_reset_event()?,
        })
    }

    /// Wait for the request behind `ol` to settle.
    fn settle(&self, ol: &OVERLAPPED) -> io::Result<usize> {
        let mut n = 0u32;
        if unsafe { GetOverlappedResult(self.handle.raw(), ol, &mut n, TRUE) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl NativeDevice for WindowsHidDevice {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let len = transfer_len(data.len())?;
        let mut ol: OVERLAPPED = unsafe { mem::zeroed() };
        ol.hEvent = self.write_event.raw();

        started(unsafe {
            WriteFile(
                self.handle.raw(),
                data.as_ptr(),
                len,
                std::ptr::null_mut(),
                &mut ol,
            )
        })?;
        self.settle(&ol)
    }

    fn read(&mut self, buf: &mut [u8], mode: BlockingMode) -> io::Result<usize> {
        let len = transfer_len(buf.len())?;
        let mut ol: OVERLAPPED = unsafe { mem::zeroed() };
        ol.hEvent = self.read_event.raw();

        started(unsafe {
            ReadFile(
                self.handle.raw(),
                buf.as_mut_ptr(),
                len,
                std::ptr::null_mut(),
                &mut ol,
            )
        })?;

        if !mode.is_blocking()
            && unsafe { WaitForSingleObject(self.read_event.raw(), 0) } != WAIT_OBJECT_0
        {
            unsafe { CancelIo(self.handle.raw()) };
            return match self.settle(&ol) {
                Ok(n) => Ok(n),
                Err(e) if e.raw_os_error() == Some(ERROR_OPERATION_ABORTED as i32) => Ok(0),
                Err(e) => Err(e),
            };
        }
        self.settle(&ol)
    }

    fn set_blocking_mode(&mut self, _mode: BlockingMode) -> io::Result<()> {
        // The mode is applied per read.
        Ok(())
    }

    fn query_string(
        &mut self,
        which: DeviceString,
        maxlen: usize,
    ) -> io::Result<Option<WideString>> {
        hid_string(self.handle.raw(), which, maxlen)
    }
}

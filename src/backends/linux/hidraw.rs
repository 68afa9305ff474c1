//! Low-level hidraw device I/O.
//!
//! Opens `/dev/hidrawN` read/write and exchanges raw reports with plain
//! `read(2)`/`write(2)`. Readiness is checked with `poll(2)` before every read:
//!
//! - blocking mode waits indefinitely, but a node that reports
//!   `POLLERR`/`POLLHUP`/`POLLNVAL` (device unplugged) fails the read instead
//!   of hanging once any reports already queued have been drained;
//! - non-blocking mode polls with a zero timeout and returns `Ok(0)` when no
//!   report is queued.
//!
//! The descriptor's `O_NONBLOCK` flag is kept in step with the handle's mode so
//! a spurious readiness never turns into an unexpected block.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::{AsFd, AsRawFd};
use std::os::unix::fs::MetadataExt;

use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, OFlag};
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use super::Identity;
use crate::descriptor::DeviceString;
use crate::device::NativeDevice;
use crate::handle::BlockingMode;
use crate::wide::WideString;

enum Readiness {
    /// Nothing queued yet.
    Idle,
    Readable { hangup: bool },
    /// Disconnected with nothing left to read.
    Gone,
}

fn disconnected() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected")
}

/// An open `/dev/hidrawN` node.
#[derive(Debug)]
pub struct HidrawDevice {
    file: File,
}

impl HidrawDevice {
    /// Open a hidraw node by path (e.g. `/dev/hidraw3`).
    pub fn open(path: &str) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Wait for the node to become readable.
    fn wait_readable(&self, mode: BlockingMode) -> io::Result<Readiness> {
        let timeout = if mode.is_blocking() {
            PollTimeout::NONE
        } else {
            PollTimeout::ZERO
        };
        loop {
            let mut fds = [PollFd::new(self.file.as_fd(), PollFlags::POLLIN)];
            match poll(&mut fds, timeout) {
                Ok(0) => return Ok(Readiness::Idle),
                Ok(_) => {
                    let revents = fds[0].revents().unwrap_or(PollFlags::empty());
                    let hangup = revents
                        .intersects(PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL);
                    // Reports queued before a disconnect are still delivered.
                    return Ok(if revents.contains(PollFlags::POLLIN) {
                        Readiness::Readable { hangup }
                    } else if hangup {
                        Readiness::Gone
                    } else {
                        Readiness::Idle
                    });
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn udev_identity(&self) -> io::Result<Option<Identity>> {
        let rdev = self.file.metadata()?.rdev();
        let node = udev::Device::from_devnum(udev::DeviceType::Character, rdev as libc::dev_t)?;
        Ok(Identity::of(&node))
    }
}

impl NativeDevice for HidrawDevice {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        loop {
            match self.file.write(data) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn read(&mut self, buf: &mut [u8], mode: BlockingMode) -> io::Result<usize> {
        loop {
            let hangup = match self.wait_readable(mode)? {
                Readiness::Gone => return Err(disconnected()),
                Readiness::Idle if mode.is_blocking() => continue,
                Readiness::Idle => return Ok(0),
                Readiness::Readable { hangup } => hangup,
            };
            match self.file.read(buf) {
                Ok(0) if hangup => return Err(disconnected()),
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    if mode.is_blocking() {
                        continue;
                    }
                    return Ok(0);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn set_blocking_mode(&mut self, mode: BlockingMode) -> io::Result<()> {
        let fd = self.file.as_raw_fd();
        let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
        let flags = match mode {
            BlockingMode::Blocking => flags - OFlag::O_NONBLOCK,
            BlockingMode::NonBlocking => flags | OFlag::O_NONBLOCK,
        };
        fcntl(fd, FcntlArg::F_SETFL(flags))?;
        Ok(())
    }

    fn query_string(
        &mut self,
        which: DeviceString,
        maxlen: usize,
    ) -> io::Result<Option<WideString>> {
        // hidraw has no request for arbitrary string descriptors.
        if let DeviceString::Indexed(_) = which {
            return Ok(None);
        }
        Ok(self
            .udev_identity()?
            .and_then(|identity| identity.string(which, maxlen)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    /// A device whose "kernel side" is the returned socket.
    fn pair() -> (HidrawDevice, UnixStream) {
        let (ours, theirs) = UnixStream::pair().unwrap();
        let dev = HidrawDevice {
            file: File::from(OwnedFd::from(ours)),
        };
        (dev, theirs)
    }

    fn is_nonblocking(dev: &HidrawDevice) -> bool {
        let flags = fcntl(dev.file.as_raw_fd(), FcntlArg::F_GETFL).unwrap();
        OFlag::from_bits_truncate(flags).contains(OFlag::O_NONBLOCK)
    }

    #[test]
    fn nonblocking_read_with_nothing_queued_is_zero() {
        let (mut dev, _kernel) = pair();
        let mut buf = [0u8; 8];
        assert_eq!(dev.read(&mut buf, BlockingMode::NonBlocking).unwrap(), 0);
    }

    #[test]
    fn nonblocking_read_returns_queued_report() {
        let (mut dev, mut kernel) = pair();
        kernel.write_all(&[0x00, 0x81, 0x01]).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(dev.read(&mut buf, BlockingMode::NonBlocking).unwrap(), 3);
        assert_eq!(&buf[..3], &[0x00, 0x81, 0x01]);
    }

    #[test]
    fn blocking_read_after_hangup_fails() {
        let (mut dev, kernel) = pair();
        drop(kernel);
        let mut buf = [0u8; 8];
        let err = dev.read(&mut buf, BlockingMode::Blocking).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(err.to_string(), "device disconnected");
    }

    #[test]
    fn queued_reports_are_drained_before_hangup_is_reported() {
        let (mut dev, mut kernel) = pair();
        kernel.write_all(&[0x00, 0x42]).unwrap();
        drop(kernel);

        let mut buf = [0u8; 8];
        assert_eq!(dev.read(&mut buf, BlockingMode::Blocking).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x00, 0x42]);
        assert!(dev.read(&mut buf, BlockingMode::Blocking).is_err());
        assert!(dev.read(&mut buf, BlockingMode::NonBlocking).is_err());
    }

    #[test]
    fn blocking_mode_follows_the_descriptor_flag() {
        let (mut dev, _kernel) = pair();
        assert!(!is_nonblocking(&dev));
        dev.set_blocking_mode(BlockingMode::NonBlocking).unwrap();
        assert!(is_nonblocking(&dev));
        dev.set_blocking_mode(BlockingMode::Blocking).unwrap();
        assert!(!is_nonblocking(&dev));
    }

    #[test]
    fn writes_reach_the_other_side() {
        let (mut dev, mut kernel) = pair();
        assert_eq!(dev.write(&[0x00, 0x80]).unwrap(), 2);
        let mut got = [0u8; 2];
        kernel.read_exact(&mut got).unwrap();
        assert_eq!(got, [0x00, 0x80]);
    }

    #[test]
    fn indexed_strings_are_not_available() {
        let (mut dev, _kernel) = pair();
        assert_eq!(dev.query_string(DeviceString::Indexed(3), 32).unwrap(), None);
    }
}

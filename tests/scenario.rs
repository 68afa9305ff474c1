//! End-to-end exchange with a PIC32-style demo device on the virtual bus.

use std::thread;
use std::time::Duration;

use hidio::backends::virtual_hid::{VirtualBackend, VirtualDevice, VirtualPort};
use hidio::{HidConfig, HidError, HidManager};

const VID: u16 = 0x04d8;
const PID: u16 = 0x003f;

fn single_device() -> (HidManager<VirtualBackend>, VirtualPort) {
    let bus = VirtualBackend::new();
    bus.plug(VirtualDevice::new("kbd", 0x046d, 0xc31c));
    let port = bus.plug(
        VirtualDevice::new("pic32", VID, PID)
            .manufacturer("Microchip Technology Inc.")
            .product("Simple HID Device Demo"),
    );
    let hid = HidManager::with_backend(bus, HidConfig::default()).unwrap();
    (hid, port)
}

#[test]
fn enumerate_open_write_read() {
    let (mut hid, port) = single_device();

    let list = hid.enumerate(VID, PID).unwrap();
    assert_eq!(list.len(), 1);
    let path = list.get(0).unwrap().path.clone();
    drop(list);

    let h = hid.open_path(&path).unwrap();

    let mut report = [0u8; 65];
    report[1] = 0x81;
    assert_eq!(hid.write(h, &report).unwrap(), 65);
    assert_eq!(port.written().last().unwrap()[1], 0x81);

    // Firmware answers from another thread while the host is blocked.
    let firmware = port.clone();
    let responder = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        let mut answer = vec![0u8; 65];
        answer[1] = 0x81;
        answer[2] = 0x01;
        firmware.push_report(&answer);
    });

    let mut buf = [0u8; 65];
    let n = hid.read(h, &mut buf).unwrap();
    responder.join().unwrap();
    assert!(n <= 65);
    assert_eq!(&buf[1..3], &[0x81, 0x01]);

    hid.close(h).unwrap();
    assert_eq!(port.open_count(), 0);
}

#[test]
fn blocking_read_fails_when_device_is_unplugged() {
    let (mut hid, port) = single_device();
    let h = hid.open(VID, PID, None).unwrap();

    let unplugger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        port.unplug();
    });

    let mut buf = [0u8; 65];
    let err = hid.read(h, &mut buf).unwrap_err();
    unplugger.join().unwrap();

    assert!(matches!(err, HidError::Io { op: "read", .. }));
    assert!(hid.last_error(h).unwrap().starts_with("read: "));

    // The slot stays allocated until the caller closes it.
    assert_eq!(hid.open_count(), 1);
    hid.close(h).unwrap();
    assert_eq!(hid.open_count(), 0);
}

#[test]
fn nonblocking_poll_loop_drains_reports_in_order() {
    let (mut hid, port) = single_device();
    let h = hid.open(VID, PID, None).unwrap();
    hid.set_nonblocking(h, true).unwrap();

    for i in 0..3u8 {
        port.push_report(&[0x00, i]);
    }

    let mut seen = Vec::new();
    let mut buf = [0u8; 8];
    loop {
        match hid.read(h, &mut buf).unwrap() {
            0 => break,
            n => seen.push(buf[..n].to_vec()),
        }
    }
    assert_eq!(seen, vec![vec![0, 0], vec![0, 1], vec![0, 2]]);
    assert_eq!(port.pending(), 0);
}

use std::thread;
use std::time::Duration;

use hidio::backends::virtual_hid::{VirtualBackend, VirtualDevice};
use hidio::{HidConfig, HidManager};

/// Non-blocking poll loop against an in-memory device.
fn main() {
    let bus = VirtualBackend::new();
    let port = bus.plug(
        VirtualDevice::new("virtual:demo", 0x04d8, 0x003f)
            .manufacturer("Virtual Devices")
            .product("Demo Pad")
            .serial_number("VD-0001"),
    );

    let config = HidConfig {
        start_nonblocking: true,
        ..HidConfig::default()
    };
    let mut hid = HidManager::with_backend(bus, config).expect("manager");

    for dev in &hid.enumerate(0, 0).expect("enumerate") {
        println!("(Virtual) {dev}");
    }
    let h = hid.open(0x04d8, 0x003f, None).expect("open");

    let firmware = thread::spawn(move || {
        for i in 0..5u8 {
            thread::sleep(Duration::from_millis(30));
            port.push_report(&[0x00, 0x81, i]);
        }
        thread::sleep(Duration::from_millis(30));
        port.unplug();
    });

    let mut buf = [0u8; 64];
    let mut idle = 0usize;
    loop {
        match hid.read(h, &mut buf) {
            Ok(0) => {
                idle += 1;
                thread::sleep(Duration::from_millis(5));
            }
            Ok(n) => println!("(Virtual) report {:02x?}", &buf[..n]),
            Err(e) => {
                println!("(Virtual) {e}");
                println!("(Virtual) last error: {:?}", hid.last_error(h));
                break;
            }
        }
    }
    println!("(Virtual) {idle} empty polls");

    firmware.join().expect("firmware thread");
    hid.close_all();
}

use hidio::{DeviceString, HidManager};
use tracing_subscriber::EnvFilter;

// Microchip PIC32 HID demo firmware.
const VID: u16 = 0x04d8;
const PID: u16 = 0x003f;

/// Talks to the PIC32 generic HID demo: toggles the LEDs (0x80) and reads the
/// pushbutton state (0x81).
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut hid = HidManager::new().expect("init hid manager");
    let h = match hid.open(VID, PID, None) {
        Ok(h) => h,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    for which in [
        DeviceString::Manufacturer,
        DeviceString::Product,
        DeviceString::SerialNumber,
    ] {
        match hid.query_string(h, which, 255) {
            Ok(s) => println!("{which}: {s}"),
            Err(e) => println!("{which}: <{e}>"),
        }
    }

    // Byte 0 is the report id; the firmware uses unnumbered reports.
    let mut report = [0u8; 65];
    report[1] = 0x80;
    let n = hid.write(h, &report).expect("toggle leds");
    println!("toggle leds: wrote {n} bytes");

    report[1] = 0x81;
    hid.write(h, &report).expect("request button state");

    let mut buf = [0u8; 65];
    let n = hid.read(h, &mut buf).expect("read button state");
    if n >= 2 {
        let pressed = buf[1] == 0x00;
        println!("button: {}", if pressed { "pressed" } else { "released" });
    } else {
        println!("short report ({n} bytes)");
        if let Some(diag) = hid.last_error(h) {
            println!("last error: {diag}");
        }
    }

    hid.close(h).expect("close");
}

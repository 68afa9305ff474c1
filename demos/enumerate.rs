use hidio::HidManager;
use tracing_subscriber::EnvFilter;

/// Lists HID devices.
///
/// `enumerate [VID PID] [--json]`, ids in hex. Set `RUST_LOG=hidio=debug` for
/// backend logging.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut json = false;
    let mut ids = Vec::new();
    for arg in std::env::args().skip(1) {
        if arg == "--json" {
            json = true;
        } else {
            let raw = arg.trim_start_matches("0x");
            ids.push(u16::from_str_radix(raw, 16).expect("ids are hex u16"));
        }
    }
    let (vid, pid) = match ids.as_slice() {
        [] => (0, 0),
        [vid, pid] => (*vid, *pid),
        _ => panic!("usage: enumerate [VID PID] [--json]"),
    };

    let hid = HidManager::new().expect("init hid manager");
    let devices = hid.enumerate(vid, pid).expect("enumerate");

    if json {
        println!("{}", devices.to_json().expect("serialize"));
        return;
    }

    println!("Found {} HID device(s)", devices.len());
    for dev in &devices {
        println!("== {:04x}:{:04x} ==", dev.vendor_id, dev.product_id);
        println!("  path         {}", dev.path);
        if let Some(s) = &dev.manufacturer_string {
            println!("  manufacturer {s}");
        }
        if let Some(s) = &dev.product_string {
            println!("  product      {s}");
        }
        if let Some(s) = &dev.serial_number {
            println!("  serial       {s}");
        }
    }
}

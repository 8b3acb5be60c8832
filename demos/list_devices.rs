//! Enumerate the playback endpoints the output driver would offer the
//! host, through the real platform backend.

use mixout::OutputDriver;

fn main() {
    tracing_subscriber::fmt().init();

    let backend = match mixout::backend::create() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Audio subsystem unavailable: {e}");
            std::process::exit(1);
        }
    };
    let driver = OutputDriver::new(backend);

    let count = driver.num_drivers();
    println!("{count} output driver slot(s)");
    for index in 0..count {
        match driver.driver_info(index) {
            Ok(info) => println!(
                "  [{index}] {}: {} Hz, {} ch, {:?}",
                info.name, info.system_rate, info.channels, info.layout
            ),
            Err(e) => println!("  [{index}] unavailable: {e}"),
        }
    }
}

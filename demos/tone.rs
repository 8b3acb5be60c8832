//! Open the default output through the real backend and play a short
//! 440 Hz tone through the relay, then tear everything down. Exercises
//! the same path a host middleware would drive.

use mixout::format::SampleEncoding;
use mixout::host::{Mixer, MixerError, OpenRequest};
use mixout::OutputDriver;
use std::f32::consts::TAU;
use std::thread;
use std::time::Duration;

struct SineMixer {
    phase: f32,
    step: f32,
    channels: usize,
}

impl Mixer for SineMixer {
    fn read(&mut self, dest: &mut [u8], frames: usize) -> Result<(), MixerError> {
        for frame in 0..frames {
            let sample = self.phase.sin() * 0.2;
            self.phase = (self.phase + self.step) % TAU;
            for ch in 0..self.channels {
                let offset = (frame * self.channels + ch) * 4;
                dest[offset..offset + 4].copy_from_slice(&sample.to_ne_bytes());
            }
        }
        Ok(())
    }
}

fn main() {
    tracing_subscriber::fmt().init();

    let backend = mixout::backend::create().expect("audio subsystem unavailable");
    let mut driver = OutputDriver::new(backend);

    let info = driver.driver_info(0).expect("no usable default output");
    println!(
        "Default output: {} ({} Hz, {} ch)",
        info.name, info.system_rate, info.channels
    );

    let mixer = SineMixer {
        phase: 0.0,
        step: TAU * 440.0 / info.system_rate as f32,
        channels: info.channels as usize,
    };
    let request = OpenRequest {
        rate: info.system_rate,
        channels: info.channels,
        encoding: SampleEncoding::Float32,
        frames_per_callback: 512,
        buffer_count: 2,
    };
    let (mut device, negotiated) = driver
        .init(0, request, Some("mixout tone demo"), Box::new(mixer))
        .expect("failed to open the default output");

    if negotiated.encoding != SampleEncoding::Float32
        || negotiated.rate != request.rate
        || negotiated.channels != request.channels
    {
        println!("Device granted {negotiated:?}, which the demo mixer cannot render");
        device.close();
        return;
    }

    println!("Playing at {} Hz, {} channels", negotiated.rate, negotiated.channels);
    device.start().expect("failed to start playback");
    thread::sleep(Duration::from_secs(2));
    device.stop().expect("failed to stop playback");
    device.close();
    println!("Done");
}

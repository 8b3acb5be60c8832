//! The real-time relay between the mixer and the backend. Runs on the
//! backend's I/O thread: no locks, no allocation, bounded time. Mixer
//! failure never reaches the backend; the relay substitutes silence and
//! keeps the stream clocked.

use crate::backend::{StreamQueue, StreamSource};
use crate::host::Mixer;

/// Render `dest.len() / frame_size` frames from the mixer into `dest`,
/// zeroing the whole destination if the mixer fails. The backend requests
/// whole-frame-aligned lengths.
pub fn fill_from_mixer(mixer: &mut dyn Mixer, frame_size: usize, dest: &mut [u8]) {
    let frames = dest.len() / frame_size;
    if mixer.read(dest, frames).is_err() {
        dest.fill(0);
    }
}

/// Relay source for fill-delivery backends: the backend hands over its own
/// buffer and the mixer renders straight into it.
pub fn fill_source(mut mixer: Box<dyn Mixer>, frame_size: usize) -> StreamSource {
    StreamSource::Fill(Box::new(move |dest| {
        fill_from_mixer(&mut *mixer, frame_size, dest);
    }))
}

/// Relay source for demand-delivery backends: render into the staging
/// buffer, then push the bytes into the stream queue. The staging buffer
/// is sized at open time and never grows; oversized demands are clamped
/// to its capacity.
pub fn demand_source(mixer: Box<dyn Mixer>, staging: Vec<u8>, frame_size: usize) -> StreamSource {
    let mut pump = DemandPump {
        mixer,
        staging,
        frame_size,
    };
    StreamSource::Demand(Box::new(move |queue, len| pump.pump(queue, len)))
}

struct DemandPump {
    mixer: Box<dyn Mixer>,
    staging: Vec<u8>,
    frame_size: usize,
}

impl DemandPump {
    fn pump(&mut self, queue: &mut dyn StreamQueue, len: usize) {
        let len = len.min(self.staging.len());
        let dest = &mut self.staging[..len];
        fill_from_mixer(&mut *self.mixer, self.frame_size, dest);
        queue.push(dest);
    }
}

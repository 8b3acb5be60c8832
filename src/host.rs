//! The middleware-facing side of the plugin: what the host provides to us
//! (the mixer, the registration surface) and what we report back to it.

use crate::format::{SampleEncoding, SpeakerLayout};
use crate::output::OutputDriver;
use serde::{Deserialize, Serialize};

/// Opaque mixer failure. The relay never inspects it; any failure means
/// the callback substitutes silence for the whole request.
#[derive(Debug, Clone, Copy)]
pub struct MixerError;

/// The host middleware's mixer. `read` renders exactly `frames` frames of
/// interleaved audio in the negotiated format into `dest`.
///
/// Called from the backend's real-time thread; implementations must not
/// block beyond their own render work.
pub trait Mixer: Send {
    fn read(&mut self, dest: &mut [u8], frames: usize) -> Result<(), MixerError>;
}

/// What the host sees for one enumerated output slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    pub name: String,
    /// Stable hardware identity. All-zero for the synthetic default slot,
    /// which has none.
    pub guid: [u8; 16],
    pub system_rate: u32,
    pub layout: SpeakerLayout,
    pub channels: u16,
}

/// The format actually granted by the hardware. The host must treat these
/// values, not its original request, as the operating format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedFormat {
    pub rate: u32,
    pub channels: u16,
    pub layout: SpeakerLayout,
    pub encoding: SampleEncoding,
}

/// The host's open parameters. Zero rate or channels means "no
/// preference, use what the device has".
#[derive(Debug, Clone, Copy)]
pub struct OpenRequest {
    pub rate: u32,
    pub channels: u16,
    pub encoding: SampleEncoding,
    pub frames_per_callback: usize,
    pub buffer_count: usize,
}

/// The operation table handed to the host at registration.
pub struct OutputDescription {
    pub name: &'static str,
    pub version: u32,
    pub driver: OutputDriver,
}

/// The middleware's registration surface. The host contract guarantees
/// that registering a well-formed description succeeds; only subsystem
/// bring-up can fail, before this trait is ever reached.
pub trait HostSystem {
    fn register_output(&mut self, description: OutputDescription) -> u32;
    fn set_output(&mut self, handle: u32);
}

//! Output driver plugin that bridges a host middleware's mixer to the
//! system audio stack. The host registers the driver once, opens a single
//! output device with a negotiated format, and the backend's real-time
//! thread pulls mixed audio through the relay callback.

pub mod backend;
pub mod config;
pub mod error;
pub mod format;
pub mod host;
pub mod output;
pub mod preload;
pub mod relay;

pub use error::OutputError;
pub use host::{DriverInfo, HostSystem, Mixer, MixerError, NegotiatedFormat, OpenRequest, OutputDescription};
pub use output::{Device, OutputDriver, register, register_with};

pub const PLUGIN_NAME: &str = "mixout";
pub const PLUGIN_VERSION: u32 = 1;

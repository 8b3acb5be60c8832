//! The output adapter: enumeration, format negotiation, and lifecycle of
//! the single open device.

use crate::backend::{self, Backend, Delivery, DeviceSelector, NativeFormat, StreamSpec, Stream};
use crate::config::Overrides;
use crate::error::OutputError;
use crate::format;
use crate::host::{
    DriverInfo, HostSystem, Mixer, NegotiatedFormat, OpenRequest, OutputDescription,
};
use crate::relay;
use tracing::{debug, error, info};

pub const DEFAULT_DRIVER_NAME: &str = "System Default";

const FALLBACK_RATE: u32 = 48_000;
const FALLBACK_CHANNELS: u16 = 2;

pub struct OutputDriver {
    backend: Box<dyn Backend>,
}

impl OutputDriver {
    pub fn new(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Playback endpoint count. Index 0 is the synthetic "system default"
    /// slot, offered only when at least one real device exists.
    pub fn num_drivers(&self) -> usize {
        match self.backend.device_count() {
            Ok(0) => 0,
            Ok(count) => count + 1,
            Err(e) => {
                error!("Failed to enumerate output devices: {e}");
                0
            }
        }
    }

    pub fn driver_info(&self, index: usize) -> Result<DriverInfo, OutputError> {
        self.driver_info_with(index, Overrides::from_env())
    }

    pub fn driver_info_with(
        &self,
        index: usize,
        overrides: Overrides,
    ) -> Result<DriverInfo, OutputError> {
        let name = if index == 0 {
            DEFAULT_DRIVER_NAME.to_string()
        } else {
            self.backend
                .device_name(index - 1)
                .map_err(OutputError::BackendOpen)?
        };
        let resolved = self.resolved_format(index, overrides);
        let layout = format::layout_for_channels(resolved.channels)
            .ok_or(OutputError::UnsupportedLayout(resolved.channels))?;
        Ok(DriverInfo {
            name,
            // The default slot has no stable hardware identity, and real
            // devices get none either: the host keys on the index.
            guid: [0; 16],
            system_rate: resolved.rate,
            layout,
            channels: resolved.channels,
        })
    }

    /// Open the selected device with the host's requested format and wire
    /// the mixer into the backend's callback. Returns the device handle
    /// and the format the hardware actually granted.
    pub fn init(
        &mut self,
        driver_index: usize,
        request: OpenRequest,
        stream_name: Option<&str>,
        mixer: Box<dyn Mixer>,
    ) -> Result<(Device, NegotiatedFormat), OutputError> {
        self.init_with(driver_index, request, stream_name, mixer, Overrides::from_env())
    }

    pub fn init_with(
        &mut self,
        driver_index: usize,
        request: OpenRequest,
        stream_name: Option<&str>,
        mixer: Box<dyn Mixer>,
        overrides: Overrides,
    ) -> Result<(Device, NegotiatedFormat), OutputError> {
        let selector = if driver_index == 0 {
            DeviceSelector::Default
        } else {
            DeviceSelector::Index(driver_index - 1)
        };

        // A concrete caller value beats everything; otherwise the same
        // resolution ladder as enumeration fills the gap.
        let baseline = self.resolved_format(driver_index, overrides);
        let rate = if request.rate > 0 { request.rate } else { baseline.rate };
        let channels = if request.channels > 0 {
            request.channels
        } else {
            baseline.channels
        };

        let kind = format::native_kind(request.encoding).ok_or_else(|| {
            OutputError::UnsupportedEncoding(format!(
                "{:?} has no native sample format",
                request.encoding
            ))
        })?;

        let want = StreamSpec {
            rate,
            channels,
            kind,
            frames_per_buffer: request.frames_per_callback,
            buffer_count: request.buffer_count,
        };
        debug!(
            "Opening output {driver_index}: {}Hz {}ch {:?}",
            want.rate, want.channels, want.kind
        );
        let pending = self
            .backend
            .open(selector, &want, stream_name)
            .map_err(|e| {
                error!("Output open failed: {e}");
                OutputError::BackendOpen(e)
            })?;
        let granted = pending.granted();

        // Whatever the hardware granted must map back through the same
        // tables; a miss rolls the open back (dropping the pending stream
        // releases the device).
        let Some(layout) = format::layout_for_channels(granted.channels) else {
            error!("Backend granted {} channels, which has no layout", granted.channels);
            return Err(OutputError::UnsupportedLayout(granted.channels));
        };
        let Some((encoding, bytes)) = format::granted_encoding(granted.kind) else {
            error!("Backend granted sample kind {:?}, which has no encoding", granted.kind);
            return Err(OutputError::UnsupportedEncoding(format!(
                "backend granted {:?}",
                granted.kind
            )));
        };
        let frame_size = bytes * granted.channels as usize;

        let source = match self.backend.delivery() {
            Delivery::Fill => relay::fill_source(mixer, frame_size),
            Delivery::Demand => {
                let staging_len = granted.frames_per_buffer * frame_size;
                let mut staging = Vec::new();
                staging
                    .try_reserve_exact(staging_len)
                    .map_err(|e| OutputError::Allocation(e.to_string()))?;
                staging.resize(staging_len, 0);
                relay::demand_source(mixer, staging, frame_size)
            }
        };
        let stream = pending.attach(source).map_err(OutputError::BackendOpen)?;

        let negotiated = NegotiatedFormat {
            rate: granted.rate,
            channels: granted.channels,
            layout,
            encoding,
        };
        info!(
            "Output open: requested {}Hz {}ch {:?}, granted {}Hz {}ch {:?}",
            rate, channels, request.encoding, negotiated.rate, negotiated.channels, negotiated.encoding
        );
        Ok((
            Device {
                stream,
                frame_size,
                format: negotiated,
            },
            negotiated,
        ))
    }

    /// Rate and channels for one enumerated slot, before any caller
    /// request is applied: override, then device probe (or the richest
    /// layout across all devices for an unprobeable default slot), then
    /// the fixed fallback.
    fn resolved_format(&self, index: usize, overrides: Overrides) -> NativeFormat {
        let probed = if index == 0 {
            if self.backend.probes_default() {
                self.backend.default_format()
            } else {
                self.scan_richest()
            }
        } else {
            self.backend.native_format(index - 1)
        };
        NativeFormat {
            rate: overrides
                .rate
                .or(probed.map(|f| f.rate))
                .unwrap_or(FALLBACK_RATE),
            channels: overrides
                .channels
                .or(probed.map(|f| f.channels))
                .unwrap_or(FALLBACK_CHANNELS),
        }
    }

    /// Adopt the highest channel count across all real devices, with its
    /// paired rate. The audio server can migrate a running stream to a
    /// richer device behind our back; targeting the richest layout up
    /// front spares the host a full reinit when that happens. This is an
    /// approximation of the active default, and intentionally stays one.
    fn scan_richest(&self) -> Option<NativeFormat> {
        let count = self.backend.device_count().ok()?;
        let mut best: Option<NativeFormat> = None;
        for index in 0..count {
            let Some(candidate) = self.backend.native_format(index) else {
                continue;
            };
            if best.is_none_or(|b| candidate.channels > b.channels) {
                best = Some(candidate);
            }
        }
        best
    }
}

/// One open output. The host holds exactly one per successful init and
/// gives it back through close.
pub struct Device {
    stream: Box<dyn Stream>,
    frame_size: usize,
    format: NegotiatedFormat,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("frame_size", &self.frame_size)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Device {
    /// Unmute. The backend treats a second start as a no-op.
    pub fn start(&mut self) -> Result<(), OutputError> {
        self.stream.play().map_err(OutputError::BackendOpen)
    }

    /// Mute. Callbacks may keep firing; the backend discards the output.
    pub fn stop(&mut self) -> Result<(), OutputError> {
        self.stream.pause().map_err(OutputError::BackendOpen)
    }

    /// Stop the hardware stream and release everything. Consuming `self`
    /// makes a second close unrepresentable.
    pub fn close(mut self) {
        if let Err(e) = self.stream.pause() {
            debug!("Pause during close failed: {e}");
        }
        debug!("Output device closed");
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn format(&self) -> NegotiatedFormat {
        self.format
    }
}

/// Host-facing entry point: bring up the audio subsystem, hand the
/// operation table to the host, and select it as the active output.
pub fn register<H: HostSystem>(host: &mut H) -> Result<u32, OutputError> {
    register_with(host, backend::create())
}

/// Same registration sequence over an explicit subsystem bring-up result,
/// so alternate backends (or a failed bring-up) can be injected.
pub fn register_with<H: HostSystem>(
    host: &mut H,
    backend: Result<Box<dyn Backend>, String>,
) -> Result<u32, OutputError> {
    let backend = match backend {
        Ok(backend) => backend,
        Err(e) => {
            error!("Audio subsystem unavailable, output driver not registered: {e}");
            return Err(OutputError::SubsystemInit(e));
        }
    };
    let driver = OutputDriver::new(backend);
    let handle = host.register_output(OutputDescription {
        name: crate::PLUGIN_NAME,
        version: crate::PLUGIN_VERSION,
        driver,
    });
    host.set_output(handle);
    info!("Registered output driver '{}' as plugin {handle}", crate::PLUGIN_NAME);
    Ok(handle)
}

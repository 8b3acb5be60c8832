use super::{
    Backend, Delivery, DeviceSelector, NativeFormat, PendingStream, SampleKind, Stream,
    StreamSource, StreamSpec,
};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleFormat, SampleRate, SizedSample, StreamConfig};
use std::slice;
use tracing::{debug, error, warn};

pub struct CpalBackend {
    host: Host,
}

impl CpalBackend {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            host: cpal::default_host(),
        })
    }

    fn device_at(&self, index: usize) -> Result<Device, String> {
        self.host
            .output_devices()
            .map_err(|e| format!("Failed to enumerate output devices: {e}"))?
            .nth(index)
            .ok_or_else(|| format!("Output device index out of range: {index}"))
    }

    fn resolve(&self, selector: DeviceSelector) -> Result<Device, String> {
        match selector {
            DeviceSelector::Default => self
                .host
                .default_output_device()
                .ok_or_else(|| "No default output device".to_string()),
            DeviceSelector::Index(index) => self.device_at(index),
        }
    }
}

// cpal's platform host handles carry no thread affinity of their own; all
// control calls happen on the host middleware's single control thread.
unsafe impl Send for CpalBackend {}

impl Backend for CpalBackend {
    fn device_count(&self) -> Result<usize, String> {
        Ok(self
            .host
            .output_devices()
            .map_err(|e| format!("Failed to enumerate output devices: {e}"))?
            .count())
    }

    fn device_name(&self, index: usize) -> Result<String, String> {
        self.device_at(index)?
            .name()
            .map_err(|e| format!("Failed to read device name: {e}"))
    }

    fn native_format(&self, index: usize) -> Option<NativeFormat> {
        let config = self.device_at(index).ok()?.default_output_config().ok()?;
        Some(NativeFormat {
            rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    fn probes_default(&self) -> bool {
        true
    }

    fn default_format(&self) -> Option<NativeFormat> {
        let config = self
            .host
            .default_output_device()?
            .default_output_config()
            .ok()?;
        Some(NativeFormat {
            rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    fn delivery(&self) -> Delivery {
        Delivery::Fill
    }

    fn open(
        &mut self,
        selector: DeviceSelector,
        want: &StreamSpec,
        name_hint: Option<&str>,
    ) -> Result<Box<dyn PendingStream>, String> {
        let device = self.resolve(selector)?;
        if let Some(name) = name_hint {
            // cpal identifies streams by process, so the hint is log-only.
            debug!("Opening output stream '{name}'");
        }
        let (config, kind) = negotiate(&device, want)?;
        Ok(Box::new(CpalPending {
            device,
            config,
            kind,
            frames: want.frames_per_buffer,
            buffers: want.buffer_count,
        }))
    }
}

fn kind_of(format: SampleFormat) -> Option<SampleKind> {
    match format {
        SampleFormat::U8 => Some(SampleKind::U8),
        SampleFormat::I8 => Some(SampleKind::I8),
        SampleFormat::I16 => Some(SampleKind::I16),
        SampleFormat::U16 => Some(SampleKind::U16),
        SampleFormat::I32 => Some(SampleKind::I32),
        SampleFormat::F32 => Some(SampleKind::F32),
        SampleFormat::F64 => Some(SampleKind::F64),
        _ => None,
    }
}

fn sample_format_of(kind: SampleKind) -> SampleFormat {
    match kind {
        SampleKind::U8 => SampleFormat::U8,
        SampleKind::I8 => SampleFormat::I8,
        SampleKind::I16 => SampleFormat::I16,
        SampleKind::U16 => SampleFormat::U16,
        SampleKind::I32 => SampleFormat::I32,
        SampleKind::F32 => SampleFormat::F32,
        SampleKind::F64 => SampleFormat::F64,
    }
}

/// Pick the closest supported configuration. Negotiation is advisory: the
/// caller gets whatever the device can actually do, which may differ from
/// the request in rate, channels, and sample kind.
fn negotiate(device: &Device, want: &StreamSpec) -> Result<(StreamConfig, SampleKind), String> {
    let ranges: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| format!("Failed to query output stream configs: {e}"))?
        .collect();

    let preferred = [
        want.kind,
        SampleKind::F32,
        SampleKind::I16,
        SampleKind::I32,
        SampleKind::I8,
    ];
    let range = preferred
        .iter()
        .find_map(|kind| {
            let format = sample_format_of(*kind);
            ranges
                .iter()
                .find(|r| r.sample_format() == format && r.channels() == want.channels)
                .or_else(|| ranges.iter().find(|r| r.sample_format() == format))
        })
        .or_else(|| ranges.iter().find(|r| kind_of(r.sample_format()).is_some()))
        .ok_or_else(|| "No usable output stream configuration was found".to_string())?;

    let min = range.min_sample_rate().0;
    let max = range.max_sample_rate().0;
    let supported = if (min..=max).contains(&want.rate) {
        range.clone().with_sample_rate(SampleRate(want.rate))
    } else {
        range.clone().with_max_sample_rate()
    };
    let kind = kind_of(supported.sample_format()).ok_or_else(|| {
        format!(
            "Backend sample format {:?} is not representable",
            supported.sample_format()
        )
    })?;
    Ok((supported.config(), kind))
}

struct CpalPending {
    device: Device,
    config: StreamConfig,
    kind: SampleKind,
    frames: usize,
    buffers: usize,
}

impl PendingStream for CpalPending {
    fn granted(&self) -> StreamSpec {
        StreamSpec {
            rate: self.config.sample_rate.0,
            channels: self.config.channels,
            kind: self.kind,
            frames_per_buffer: self.frames,
            buffer_count: self.buffers,
        }
    }

    fn attach(self: Box<Self>, source: StreamSource) -> Result<Box<dyn Stream>, String> {
        let StreamSource::Fill(fill) = source else {
            return Err("cpal streams consume by filling the device buffer".to_string());
        };
        let stream = match self.kind {
            SampleKind::U8 => build_stream::<u8>(&self.device, &self.config, fill),
            SampleKind::I8 => build_stream::<i8>(&self.device, &self.config, fill),
            SampleKind::I16 => build_stream::<i16>(&self.device, &self.config, fill),
            SampleKind::U16 => build_stream::<u16>(&self.device, &self.config, fill),
            SampleKind::I32 => build_stream::<i32>(&self.device, &self.config, fill),
            SampleKind::F32 => build_stream::<f32>(&self.device, &self.config, fill),
            SampleKind::F64 => build_stream::<f64>(&self.device, &self.config, fill),
        }?;
        // Streams come up muted; the host unmutes through start(). Some
        // hosts create streams already running, hence the explicit pause.
        if let Err(e) = stream.pause() {
            warn!("New output stream does not pause: {e}");
        }
        Ok(Box::new(CpalStream { inner: stream }))
    }
}

fn build_stream<T: SizedSample>(
    device: &Device,
    config: &StreamConfig,
    mut fill: Box<dyn FnMut(&mut [u8]) + Send>,
) -> Result<cpal::Stream, String> {
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _| {
                // The relay works in raw bytes; reinterpret the typed
                // buffer in place.
                let bytes = unsafe {
                    slice::from_raw_parts_mut(
                        data.as_mut_ptr() as *mut u8,
                        std::mem::size_of_val(data),
                    )
                };
                fill(bytes);
            },
            move |e| error!("Output stream error: {e}"),
            None,
        )
        .map_err(|e| format!("Failed to build output stream: {e}"))
}

struct CpalStream {
    inner: cpal::Stream,
}

// SAFETY: the host middleware serializes start/stop/close on one control
// thread; the stream handle never moves while a callback is in flight.
unsafe impl Send for CpalStream {}

impl Stream for CpalStream {
    fn play(&mut self) -> Result<(), String> {
        self.inner
            .play()
            .map_err(|e| format!("Failed to start output stream: {e}"))
    }

    fn pause(&mut self) -> Result<(), String> {
        self.inner
            .pause()
            .map_err(|e| format!("Failed to pause output stream: {e}"))
    }
}

//! Deterministic in-memory backend. Drives the adapter through the same
//! trait as the real hardware for tests and CI, records every control
//! call, and lets a test fire the relay callback by hand.

use super::{
    Backend, Delivery, DeviceSelector, NativeFormat, PendingStream, SampleKind, Stream,
    StreamQueue, StreamSource, StreamSpec,
};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Open,
    Attach,
    Play,
    Pause,
    Close,
}

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
    pub format: Option<NativeFormat>,
}

impl MockDevice {
    pub fn new(name: &str, rate: u32, channels: u16) -> Self {
        Self {
            name: name.to_string(),
            format: Some(NativeFormat { rate, channels }),
        }
    }

    /// A device whose native format the backend cannot report.
    pub fn opaque(name: &str) -> Self {
        Self {
            name: name.to_string(),
            format: None,
        }
    }
}

#[derive(Default)]
struct Shared {
    calls: Vec<Call>,
    source: Option<StreamSource>,
    name_hint: Option<String>,
    requested: Option<StreamSpec>,
}

pub struct MockBackend {
    devices: Vec<MockDevice>,
    probes_default: bool,
    default_format: Option<NativeFormat>,
    delivery: Delivery,
    grant: Option<(u32, u16, SampleKind)>,
    fail_open: bool,
    shared: Arc<Mutex<Shared>>,
}

impl MockBackend {
    pub fn new(devices: Vec<MockDevice>) -> Self {
        Self {
            devices,
            probes_default: false,
            default_format: None,
            delivery: Delivery::Fill,
            grant: None,
            fail_open: false,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Report a probed default-device format instead of forcing the
    /// scan-all-devices path.
    pub fn probe_default(mut self, format: NativeFormat) -> Self {
        self.probes_default = true;
        self.default_format = Some(format);
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    /// Grant this format from open() regardless of what was requested.
    pub fn grant(mut self, rate: u32, channels: u16, kind: SampleKind) -> Self {
        self.grant = Some((rate, channels, kind));
        self
    }

    pub fn refuse_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: self.shared.clone(),
        }
    }
}

impl Backend for MockBackend {
    fn device_count(&self) -> Result<usize, String> {
        Ok(self.devices.len())
    }

    fn device_name(&self, index: usize) -> Result<String, String> {
        self.devices
            .get(index)
            .map(|d| d.name.clone())
            .ok_or_else(|| format!("Output device index out of range: {index}"))
    }

    fn native_format(&self, index: usize) -> Option<NativeFormat> {
        self.devices.get(index)?.format
    }

    fn probes_default(&self) -> bool {
        self.probes_default
    }

    fn default_format(&self) -> Option<NativeFormat> {
        self.default_format
    }

    fn delivery(&self) -> Delivery {
        self.delivery
    }

    fn open(
        &mut self,
        _selector: DeviceSelector,
        want: &StreamSpec,
        name_hint: Option<&str>,
    ) -> Result<Box<dyn PendingStream>, String> {
        if self.fail_open {
            return Err("mock backend refuses to open".to_string());
        }
        let mut granted = want.clone();
        if let Some((rate, channels, kind)) = self.grant {
            granted.rate = rate;
            granted.channels = channels;
            granted.kind = kind;
        }
        let mut shared = self.shared.lock().expect("mock state poisoned");
        shared.calls.push(Call::Open);
        shared.requested = Some(want.clone());
        shared.name_hint = name_hint.map(str::to_string);
        drop(shared);
        Ok(Box::new(MockPending {
            granted,
            shared: self.shared.clone(),
            attached: false,
        }))
    }
}

struct MockPending {
    granted: StreamSpec,
    shared: Arc<Mutex<Shared>>,
    attached: bool,
}

impl PendingStream for MockPending {
    fn granted(&self) -> StreamSpec {
        self.granted.clone()
    }

    fn attach(mut self: Box<Self>, source: StreamSource) -> Result<Box<dyn Stream>, String> {
        self.attached = true;
        let mut shared = self.shared.lock().expect("mock state poisoned");
        shared.calls.push(Call::Attach);
        shared.source = Some(source);
        drop(shared);
        Ok(Box::new(MockStream {
            shared: self.shared.clone(),
        }))
    }
}

impl Drop for MockPending {
    fn drop(&mut self) {
        // A pending stream dropped before attach is a negotiation that got
        // rolled back; the device must be released exactly like a live one.
        if !self.attached {
            let mut shared = self.shared.lock().expect("mock state poisoned");
            shared.calls.push(Call::Close);
        }
    }
}

struct MockStream {
    shared: Arc<Mutex<Shared>>,
}

impl Stream for MockStream {
    fn play(&mut self) -> Result<(), String> {
        let mut shared = self.shared.lock().expect("mock state poisoned");
        shared.calls.push(Call::Play);
        Ok(())
    }

    fn pause(&mut self) -> Result<(), String> {
        let mut shared = self.shared.lock().expect("mock state poisoned");
        shared.calls.push(Call::Pause);
        Ok(())
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        let mut shared = self.shared.lock().expect("mock state poisoned");
        shared.calls.push(Call::Close);
        shared.source = None;
    }
}

/// Test-side view of the mock's recorded state. Stays valid after the
/// backend itself has been moved into a driver.
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<Mutex<Shared>>,
}

impl MockHandle {
    pub fn calls(&self) -> Vec<Call> {
        self.shared.lock().expect("mock state poisoned").calls.clone()
    }

    pub fn name_hint(&self) -> Option<String> {
        self.shared
            .lock()
            .expect("mock state poisoned")
            .name_hint
            .clone()
    }

    pub fn requested(&self) -> Option<StreamSpec> {
        self.shared
            .lock()
            .expect("mock state poisoned")
            .requested
            .clone()
    }

    /// Fire a fill-delivery callback for `len` bytes and return the buffer
    /// the relay produced. The buffer is prefilled with a nonzero pattern
    /// so silence substitution is observable.
    pub fn fill(&self, len: usize) -> Vec<u8> {
        let mut source = self
            .shared
            .lock()
            .expect("mock state poisoned")
            .source
            .take();
        let mut buffer = vec![0xAA_u8; len];
        match source.as_mut() {
            Some(StreamSource::Fill(fill)) => fill(&mut buffer),
            _ => panic!("no fill source attached"),
        }
        self.shared.lock().expect("mock state poisoned").source = source;
        buffer
    }

    /// Fire a demand-delivery callback for `len` bytes and return whatever
    /// the relay pushed into the stream queue.
    pub fn demand(&self, len: usize) -> Vec<u8> {
        let mut source = self
            .shared
            .lock()
            .expect("mock state poisoned")
            .source
            .take();
        let mut sink = VecQueue(Vec::new());
        match source.as_mut() {
            Some(StreamSource::Demand(demand)) => demand(&mut sink, len),
            _ => panic!("no demand source attached"),
        }
        self.shared.lock().expect("mock state poisoned").source = source;
        sink.0
    }
}

struct VecQueue(Vec<u8>);

impl StreamQueue for VecQueue {
    fn push(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

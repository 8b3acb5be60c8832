//! Seam between the adapter and the platform audio stack. The shipped
//! implementation wraps cpal; the mock implementation drives the same
//! trait deterministically for tests.

pub mod cpal;
pub mod mock;

/// Sample kinds a backend can natively grant. Wider than what the host
/// side accepts: unsigned and double grants exist in the wild and must be
/// refusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleKind {
    U8,
    I8,
    I16,
    U16,
    I32,
    F32,
    F64,
}

/// A device's current native rate and channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeFormat {
    pub rate: u32,
    pub channels: u16,
}

/// Stream parameters, requested or granted. The backend may substitute
/// rate, channels, or kind; `frames_per_buffer` and `buffer_count` are
/// hints that backends honor where their API allows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSpec {
    pub rate: u32,
    pub channels: u16,
    pub kind: SampleKind,
    pub frames_per_buffer: usize,
    pub buffer_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSelector {
    /// The system default playback device.
    Default,
    /// A concrete device by enumeration index.
    Index(usize),
}

/// How the backend consumes audio from the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The backend hands the relay a destination buffer to fill in place.
    Fill,
    /// The backend announces how many bytes it wants and the relay pushes
    /// pre-rendered bytes into the stream queue.
    Demand,
}

/// Byte sink for demand-delivery streams.
pub trait StreamQueue {
    fn push(&mut self, bytes: &[u8]);
}

/// The relay callback in the shape the backend's delivery model expects.
/// Both closures run on the backend's real-time thread.
pub enum StreamSource {
    Fill(Box<dyn FnMut(&mut [u8]) + Send>),
    Demand(Box<dyn FnMut(&mut dyn StreamQueue, usize) + Send>),
}

/// An opened, running or paused hardware stream. Dropping the handle
/// destroys the stream; the backend quiesces its callback thread first.
pub trait Stream: Send {
    fn play(&mut self) -> Result<(), String>;
    fn pause(&mut self) -> Result<(), String>;
}

/// A negotiated but not yet wired stream. `granted` reports what the
/// hardware actually agreed to; `attach` installs the relay source and
/// produces the live stream. Dropping a pending stream without attaching
/// releases the negotiated device.
pub trait PendingStream {
    fn granted(&self) -> StreamSpec;
    fn attach(self: Box<Self>, source: StreamSource) -> Result<Box<dyn Stream>, String>;
}

pub trait Backend: Send {
    fn device_count(&self) -> Result<usize, String>;
    fn device_name(&self, index: usize) -> Result<String, String>;

    /// Current native format of a real device, if the backend can tell.
    fn native_format(&self, index: usize) -> Option<NativeFormat>;

    /// Whether this backend can query the default playback device
    /// directly. When it cannot, the adapter falls back to scanning every
    /// real device.
    fn probes_default(&self) -> bool;
    fn default_format(&self) -> Option<NativeFormat>;

    fn delivery(&self) -> Delivery;

    /// Negotiate a stream on the selected device. The optional name hint
    /// is display-only and never affects the outcome.
    fn open(
        &mut self,
        selector: DeviceSelector,
        want: &StreamSpec,
        name_hint: Option<&str>,
    ) -> Result<Box<dyn PendingStream>, String>;
}

/// Bring up the platform audio subsystem and return the backend for it.
pub fn create() -> Result<Box<dyn Backend>, String> {
    Ok(Box::new(cpal::CpalBackend::new()?))
}

use thiserror::Error;

/// Failure kinds surfaced to the host middleware. Every variant maps to a
/// result code on the host side; none of them abort the process.
#[derive(Debug, Error)]
pub enum OutputError {
    /// The requested or granted sample encoding has no entry in the
    /// encoding table.
    #[error("unsupported sample encoding: {0}")]
    UnsupportedEncoding(String),

    /// The channel count has no entry in the speaker layout table.
    #[error("unsupported channel layout: {0} channels")]
    UnsupportedLayout(u16),

    /// The hardware backend refused to enumerate, open, or control a
    /// stream.
    #[error("output device failure: {0}")]
    BackendOpen(String),

    /// The staging buffer for a demand-delivery stream could not be
    /// allocated.
    #[error("staging buffer allocation failed: {0}")]
    Allocation(String),

    /// The audio subsystem could not be brought up; registration is
    /// abandoned and the host keeps running without an output driver.
    #[error("audio subsystem initialization failed: {0}")]
    SubsystemInit(String),
}

pub type Result<T> = std::result::Result<T, OutputError>;

use crate::backend::SampleKind;
use serde::{Deserialize, Serialize};

/// Sample encodings the host middleware can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleEncoding {
    Pcm8,
    Pcm16,
    Pcm24,
    Pcm32,
    Float32,
}

/// Speaker layouts the host middleware understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeakerLayout {
    Mono,
    Stereo,
    Quad,
    Surround,
    FivePointOne,
    SevenPointOne,
    SevenPointOneFour,
}

// Channel count to layout, exact matches only. Counts outside this table
// are an unsupported-layout failure, never a guess.
pub const LAYOUTS: [(u16, SpeakerLayout); 7] = [
    (1, SpeakerLayout::Mono),
    (2, SpeakerLayout::Stereo),
    (4, SpeakerLayout::Quad),
    (5, SpeakerLayout::Surround),
    (6, SpeakerLayout::FivePointOne),
    (8, SpeakerLayout::SevenPointOne),
    (12, SpeakerLayout::SevenPointOneFour),
];

// Host encoding to backend-native sample kind. Pcm24 has no native
// counterpart and must be refused before anything is opened.
pub const NATIVE_KINDS: [(SampleEncoding, SampleKind); 4] = [
    (SampleEncoding::Pcm8, SampleKind::I8),
    (SampleEncoding::Pcm16, SampleKind::I16),
    (SampleEncoding::Pcm32, SampleKind::I32),
    (SampleEncoding::Float32, SampleKind::F32),
];

// Reverse direction: what the backend granted, back to a host encoding and
// its per-sample byte size. Kinds outside this table (unsigned or double
// grants) fail the open.
pub const GRANTED_ENCODINGS: [(SampleKind, SampleEncoding, usize); 4] = [
    (SampleKind::I8, SampleEncoding::Pcm8, 1),
    (SampleKind::I16, SampleEncoding::Pcm16, 2),
    (SampleKind::I32, SampleEncoding::Pcm32, 4),
    (SampleKind::F32, SampleEncoding::Float32, 4),
];

pub fn layout_for_channels(channels: u16) -> Option<SpeakerLayout> {
    LAYOUTS
        .iter()
        .find(|(count, _)| *count == channels)
        .map(|(_, layout)| *layout)
}

pub fn native_kind(encoding: SampleEncoding) -> Option<SampleKind> {
    NATIVE_KINDS
        .iter()
        .find(|(candidate, _)| *candidate == encoding)
        .map(|(_, kind)| *kind)
}

pub fn granted_encoding(kind: SampleKind) -> Option<(SampleEncoding, usize)> {
    GRANTED_ENCODINGS
        .iter()
        .find(|(candidate, _, _)| *candidate == kind)
        .map(|(_, encoding, bytes)| (*encoding, *bytes))
}

/// Frame size in bytes for a granted kind and channel count.
pub fn frame_size(kind: SampleKind, channels: u16) -> Option<usize> {
    granted_encoding(kind).map(|(_, bytes)| bytes * channels as usize)
}

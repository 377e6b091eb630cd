//! Transport-neutral frame type.

use bytes::Bytes;

/// Kind of a unit read from a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// UTF-8 text payload.
    Text,
    /// Binary payload.
    Binary,
    /// The peer asked to close.
    Close,
}

/// One unit read from or written to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload.
    Text(String),
    /// Binary payload.
    Binary(Bytes),
    /// Close signal.
    Close,
}

impl Frame {
    /// Builds a text frame.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Builds a binary frame.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self::Binary(data.into())
    }

    /// Returns the frame's kind.
    pub fn frame_type(&self) -> FrameType {
        match self {
            Self::Text(_) => FrameType::Text,
            Self::Binary(_) => FrameType::Binary,
            Self::Close => FrameType::Close,
        }
    }

    /// Payload bytes; empty for a close frame.
    pub fn payload(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(data) => data,
            Self::Close => &[],
        }
    }
}

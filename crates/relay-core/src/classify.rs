//! Transport-boundary classification of inbound frames.

use bytes::Bytes;

use crate::envelope::Envelope;
use crate::errors::MalformedMessage;

/// JPEG start-of-image marker.
pub const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

/// A frame as the transport handed it over.
#[derive(Clone, Debug)]
pub enum RawFrame {
    /// A binary WebSocket message.
    Binary(Bytes),
    /// A text WebSocket message.
    Text(String),
}

/// The result of classifying a [`RawFrame`]. Produced once; downstream code
/// never inspects raw payload types again.
#[derive(Debug)]
pub enum Inbound {
    /// Opaque bytes, normally a camera JPEG.
    Binary(Bytes),
    /// A decoded JSON envelope.
    Text(Envelope),
    /// Text that failed to decode.
    Malformed(MalformedMessage),
}

/// Whether `data` starts with the JPEG start-of-image marker.
pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&JPEG_SOI)
}

/// Byte buffers are binary frames; text must decode as an [`Envelope`].
///
/// A text frame can never carry the JPEG marker (`0xFF` is not valid
/// UTF-8), so the transport tag alone decides. [`is_jpeg`] remains for
/// diagnostics on the binary path.
pub fn classify(frame: RawFrame) -> Inbound {
    match frame {
        RawFrame::Binary(data) => Inbound::Binary(data),
        RawFrame::Text(text) => match Envelope::parse(&text) {
            Ok(envelope) => Inbound::Text(envelope),
            Err(e) => Inbound::Malformed(e),
        },
    }
}

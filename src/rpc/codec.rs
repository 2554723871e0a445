//! NDJSON codec for protocol and agent streams.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length so an
//! unterminated or oversized message cannot exhaust memory. The same codec
//! frames the frontend's stdin and the agent CLI's stdout.

use std::io::ErrorKind;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted by the codec: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// One unit decoded from an NDJSON stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, without its terminator.
    Line(String),
    /// A line that was discarded: longer than the limit or not UTF-8. Carries
    /// the reason.
    Rejected(String),
}

/// Newline-delimited JSON line codec.
///
/// Each `\n`-terminated UTF-8 string is one complete message. A line longer
/// than [`MAX_LINE_BYTES`] is reported once as [`Frame::Rejected`] and the
/// codec discards input up to the next newline. Rejected lines are items, not
/// errors: `FramedRead` stops after the first decoder error.
#[derive(Debug)]
pub struct FrameCodec(LinesCodec);

impl FrameCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_length))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = AppError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        classify(self.0.decode(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        classify(self.0.decode_eof(src))
    }
}

impl Encoder<String> for FrameCodec {
    type Error = AppError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(|e| AppError::Io(e.to_string()))
    }
}

fn classify(decoded: std::result::Result<Option<String>, LinesCodecError>) -> Result<Option<Frame>> {
    match decoded {
        Ok(line) => Ok(line.map(Frame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => {
            warn!("line too long, discarding up to the next newline");
            Ok(Some(Frame::Rejected(
                "line too long: exceeded maximum frame length".into(),
            )))
        }
        // LinesCodec only produces I/O errors itself for invalid UTF-8; the
        // line has already been consumed.
        Err(LinesCodecError::Io(err)) if err.kind() == ErrorKind::InvalidData => {
            warn!(%err, "line is not valid utf-8, discarding");
            Ok(Some(Frame::Rejected(format!("invalid utf-8: {err}"))))
        }
        Err(LinesCodecError::Io(err)) => Err(AppError::Io(err.to_string())),
    }
}

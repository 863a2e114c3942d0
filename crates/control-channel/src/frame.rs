//! Transport framing for control messages on stream sockets.
//!
//! Stream sockets carry no message boundaries, so every transport message is
//! prefixed with a three byte header: the frame kind and the payload length
//! as a big-endian `u16`. Error frames carry a single [`ErrorCode`] byte; this
//! is the transport's error channel, kept separate from reply payloads.

use std::fmt;
use std::io::{self, Read, Write};

use thiserror::Error;

/// Length of the frame header in bytes.
pub const HEADER_LEN: usize = 3;

/// Role of a transport message.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Fire-and-forget message from the client.
    Send = 0,
    /// Message for which the client waits for a reply.
    SendWithReply = 1,
    /// Successful reply from the server.
    Reply = 2,
    /// Failure reply from the server carrying an [`ErrorCode`].
    Error = 3,
}

impl FrameKind {
    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Send),
            1 => Some(Self::SendWithReply),
            2 => Some(Self::Reply),
            3 => Some(Self::Error),
            _ => None,
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Send => "send",
            Self::SendWithReply => "send-with-reply",
            Self::Reply => "reply",
            Self::Error => "error",
        };
        formatter.write_str(name)
    }
}

/// Errno-style reason carried by an error frame.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The message kind is not permitted on this channel (`EPERM`).
    NotPermitted = 1,
    /// The command handler failed (`EIO`).
    HandlerFailed = 5,
    /// The message is malformed (`EINVAL`).
    InvalidArgument = 22,
    /// The message exceeds the protocol's maximum size (`EMSGSIZE`).
    MessageTooLarge = 90,
}

impl ErrorCode {
    /// Wire value of the code.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a wire value.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::NotPermitted),
            5 => Some(Self::HandlerFailed),
            22 => Some(Self::InvalidArgument),
            90 => Some(Self::MessageTooLarge),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotPermitted => "operation not permitted",
            Self::HandlerFailed => "handler failed",
            Self::InvalidArgument => "invalid argument",
            Self::MessageTooLarge => "message too large",
        };
        write!(formatter, "{reason} (code {})", self.as_u8())
    }
}

/// A complete transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Role of the message.
    pub kind: FrameKind,
    /// Message bytes.
    pub payload: Vec<u8>,
}

/// Errors raised while reading or writing frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The underlying stream failed.
    #[error("frame I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The payload exceeds the permitted size. When reading, the payload has
    /// already been discarded and the stream remains usable.
    #[error("frame payload of {size} bytes exceeds the {max}-byte limit")]
    TooLarge {
        /// Kind of the oversized frame, when the header named a known one.
        kind: Option<FrameKind>,
        /// Announced or supplied payload size.
        size: usize,
        /// Permitted maximum.
        max: usize,
    },
    /// The header names an unknown frame kind. The payload has been discarded.
    #[error("unknown frame kind {value}")]
    UnknownKind {
        /// Received kind byte.
        value: u8,
    },
}

impl FrameError {
    /// Whether the stream is still aligned on a frame boundary.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::TooLarge { .. } | Self::UnknownKind { .. })
    }

    /// Whether the peer awaits an answer to the frame that failed. Oversized
    /// fire-and-forget frames are dropped without one.
    #[must_use]
    pub const fn expects_answer(&self) -> bool {
        !matches!(
            self,
            Self::TooLarge {
                kind: Some(FrameKind::Send),
                ..
            }
        )
    }
}

/// Writes one frame and flushes the writer.
///
/// # Errors
///
/// Returns [`FrameError::TooLarge`] when the payload cannot be described by
/// the length field, or [`FrameError::Io`] when writing fails.
pub fn write_frame<W: Write>(
    writer: &mut W,
    kind: FrameKind,
    payload: &[u8],
) -> Result<(), FrameError> {
    let length = u16::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        kind: Some(kind),
        size: payload.len(),
        max: usize::from(u16::MAX),
    })?;
    let [high, low] = encode_length(length);
    writer.write_all(&[kind as u8, high, low])?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Writes an error frame carrying `code`.
///
/// # Errors
///
/// Returns [`FrameError::Io`] when writing fails.
pub fn write_error<W: Write>(writer: &mut W, code: ErrorCode) -> Result<(), FrameError> {
    write_frame(writer, FrameKind::Error, &[code.as_u8()])
}

/// Reads one frame whose payload may not exceed `max_payload` bytes.
///
/// Returns `Ok(None)` when the peer closed the stream on a frame boundary.
///
/// # Errors
///
/// Returns [`FrameError::Io`] on stream failures, including a stream closed
/// mid-frame. Oversized payloads and unknown kinds are drained from the stream
/// and reported as recoverable errors.
pub fn read_frame<R: Read>(
    reader: &mut R,
    max_payload: usize,
) -> Result<Option<Frame>, FrameError> {
    let mut header = [0_u8; HEADER_LEN];
    if !read_header(reader, &mut header)? {
        return Ok(None);
    }
    let [kind_byte, high, low] = header;
    let length = decode_length([high, low]);
    let size = usize::from(length);

    if size > max_payload {
        discard(reader, length)?;
        return Err(FrameError::TooLarge {
            kind: FrameKind::from_u8(kind_byte),
            size,
            max: max_payload,
        });
    }

    let mut payload = vec![0_u8; size];
    reader.read_exact(&mut payload)?;

    let Some(kind) = FrameKind::from_u8(kind_byte) else {
        return Err(FrameError::UnknownKind { value: kind_byte });
    };
    Ok(Some(Frame { kind, payload }))
}

#[expect(clippy::big_endian_bytes, reason = "frame lengths use network byte order")]
const fn encode_length(length: u16) -> [u8; 2] {
    length.to_be_bytes()
}

#[expect(clippy::big_endian_bytes, reason = "frame lengths use network byte order")]
const fn decode_length(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

/// Fills `header`, returning `false` on a clean end of stream before the first
/// byte.
fn read_header<R: Read>(reader: &mut R, header: &mut [u8; HEADER_LEN]) -> io::Result<bool> {
    let (first, rest) = header.split_at_mut(1);
    loop {
        match reader.read(first) {
            Ok(0) => return Ok(false),
            Ok(_) => break,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    reader.read_exact(rest)?;
    Ok(true)
}

fn discard<R: Read>(reader: &mut R, length: u16) -> io::Result<()> {
    let expected = u64::from(length);
    let drained = io::copy(&mut reader.take(expected), &mut io::sink())?;
    if drained < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream closed inside an oversized frame",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn encoded(kind: FrameKind, payload: &[u8]) -> Vec<u8> {
        let mut buffer = Vec::new();
        write_frame(&mut buffer, kind, payload).expect("write frame");
        buffer
    }

    #[test]
    fn header_carries_kind_and_big_endian_length() {
        assert_eq!(
            encoded(FrameKind::SendWithReply, &[0x01]),
            vec![0x01, 0x00, 0x01, 0x01]
        );
    }

    #[test]
    fn reads_frames_back_in_order() {
        let mut bytes = encoded(FrameKind::SendWithReply, &[0x00]);
        bytes.extend(encoded(FrameKind::Reply, &[]));
        let mut cursor = Cursor::new(bytes);

        let first = read_frame(&mut cursor, 8).expect("read").expect("frame");
        assert_eq!(first.kind, FrameKind::SendWithReply);
        assert_eq!(first.payload, vec![0x00]);

        let second = read_frame(&mut cursor, 8).expect("read").expect("frame");
        assert_eq!(second.kind, FrameKind::Reply);
        assert!(second.payload.is_empty());

        assert!(read_frame(&mut cursor, 8).expect("read").is_none());
    }

    #[test]
    fn oversized_payload_is_drained_and_stream_stays_aligned() {
        let mut bytes = encoded(FrameKind::SendWithReply, &[0xAA; 16]);
        bytes.extend(encoded(FrameKind::SendWithReply, &[0x01]));
        let mut cursor = Cursor::new(bytes);

        let error = read_frame(&mut cursor, 1).expect_err("payload exceeds limit");
        assert!(error.is_recoverable());
        assert!(matches!(
            error,
            FrameError::TooLarge {
                kind: Some(FrameKind::SendWithReply),
                size: 16,
                max: 1
            }
        ));
        assert!(error.expects_answer());

        let next = read_frame(&mut cursor, 1).expect("read").expect("frame");
        assert_eq!(next.payload, vec![0x01]);
    }

    #[test]
    fn oversized_fire_and_forget_frames_expect_no_answer() {
        let mut cursor = Cursor::new(encoded(FrameKind::Send, &[0x00, 0x00]));
        let error = read_frame(&mut cursor, 1).expect_err("payload exceeds limit");
        assert!(matches!(
            error,
            FrameError::TooLarge {
                kind: Some(FrameKind::Send),
                ..
            }
        ));
        assert!(!error.expects_answer());
    }

    #[test]
    fn unknown_kind_is_recoverable() {
        let mut cursor = Cursor::new(vec![0x09, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00]);
        let error = read_frame(&mut cursor, 8).expect_err("kind 9 is undefined");
        assert!(matches!(error, FrameError::UnknownKind { value: 9 }));
        let next = read_frame(&mut cursor, 8).expect("read").expect("frame");
        assert_eq!(next.kind, FrameKind::SendWithReply);
    }

    #[rstest]
    #[case(vec![0x01])]
    #[case(vec![0x01, 0x00])]
    #[case(vec![0x01, 0x00, 0x02, 0x00])]
    fn truncated_frames_are_io_errors(#[case] bytes: Vec<u8>) {
        let error = read_frame(&mut Cursor::new(bytes), 8).expect_err("truncated");
        assert!(matches!(error, FrameError::Io(ref source) if source.kind() == io::ErrorKind::UnexpectedEof));
        assert!(!error.is_recoverable());
    }

    #[rstest]
    #[case(ErrorCode::NotPermitted)]
    #[case(ErrorCode::HandlerFailed)]
    #[case(ErrorCode::InvalidArgument)]
    #[case(ErrorCode::MessageTooLarge)]
    fn error_codes_survive_the_wire(#[case] code: ErrorCode) {
        assert_eq!(ErrorCode::from_u8(code.as_u8()), Some(code));
    }
}

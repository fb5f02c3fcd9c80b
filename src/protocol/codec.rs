//! RESP Codec Module
//!
//! Incremental RESP2 decoding and encoding for use with `tokio_util::codec::Framed`.
//!
//! The decoder never consumes a partial frame: if the buffer ends mid-frame it
//! returns `Ok(None)` and waits for the next read to append more bytes.

use bytes::{Buf, Bytes, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use super::Frame;

/// Largest bulk string accepted from the store (512 MB, same as Redis).
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Deepest array nesting accepted before the stream is considered corrupt.
pub const MAX_DEPTH: usize = 32;

// == Protocol Error ==
/// Errors raised while framing the store's byte stream.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unknown frame prefix {0:#04x}")]
    UnknownPrefix(u8),

    #[error("invalid length or integer: {0}")]
    InvalidNumber(String),

    #[error("bulk string of {0} bytes exceeds limit")]
    BulkTooLarge(usize),

    #[error("array nesting deeper than {}", MAX_DEPTH)]
    TooDeep,

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// == Codec ==
/// RESP2 codec. Stateless; every call re-parses from the start of the buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct RespCodec;

impl RespCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RespCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        match parse_frame(&src[..], 0)? {
            Some((frame, consumed)) => {
                src.advance(consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

impl Encoder<Frame> for RespCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        frame.write_to(dst);
        Ok(())
    }
}

// == Parsing ==
/// Parses one frame from the front of `buf`.
///
/// Returns the frame and the number of bytes it occupied, or `None` when `buf`
/// holds only part of a frame.
fn parse_frame(buf: &[u8], depth: usize) -> Result<Option<(Frame, usize)>, ProtocolError> {
    if depth > MAX_DEPTH {
        return Err(ProtocolError::TooDeep);
    }
    let Some(&prefix) = buf.first() else {
        return Ok(None);
    };
    let Some((line, after_line)) = read_line(buf, 1) else {
        return Ok(None);
    };

    match prefix {
        b'+' => Ok(Some((Frame::Simple(utf8(line)?), after_line))),
        b'-' => Ok(Some((Frame::Error(utf8(line)?), after_line))),
        b':' => Ok(Some((Frame::Integer(number(line)?), after_line))),
        b'$' => {
            let len = number(line)?;
            if len == -1 {
                return Ok(Some((Frame::Null, after_line)));
            }
            let len = usize::try_from(len)
                .map_err(|_| ProtocolError::InvalidNumber(format!("bulk length {len}")))?;
            if len > MAX_BULK_LEN {
                return Err(ProtocolError::BulkTooLarge(len));
            }
            let end = after_line + len;
            if buf.len() < end + 2 {
                return Ok(None);
            }
            if &buf[end..end + 2] != b"\r\n" {
                return Err(ProtocolError::Malformed(
                    "bulk string not terminated by CRLF".to_string(),
                ));
            }
            let data = Bytes::copy_from_slice(&buf[after_line..end]);
            Ok(Some((Frame::Bulk(data), end + 2)))
        }
        b'*' => {
            let count = number(line)?;
            if count == -1 {
                return Ok(Some((Frame::Null, after_line)));
            }
            let count = usize::try_from(count)
                .map_err(|_| ProtocolError::InvalidNumber(format!("array length {count}")))?;

            let mut items = Vec::with_capacity(count.min(1024));
            let mut offset = after_line;
            for _ in 0..count {
                match parse_frame(&buf[offset..], depth + 1)? {
                    Some((item, used)) => {
                        items.push(item);
                        offset += used;
                    }
                    None => return Ok(None),
                }
            }
            Ok(Some((Frame::Array(items), offset)))
        }
        other => Err(ProtocolError::UnknownPrefix(other)),
    }
}

/// Finds the CRLF-terminated line starting at `start`.
fn read_line(buf: &[u8], start: usize) -> Option<(&[u8], usize)> {
    buf.get(start..)?
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|pos| (&buf[start..start + pos], start + pos + 2))
}

fn utf8(line: &[u8]) -> Result<String, ProtocolError> {
    String::from_utf8(line.to_vec()).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

fn number(line: &[u8]) -> Result<i64, ProtocolError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| ProtocolError::InvalidNumber(String::from_utf8_lossy(line).into_owned()))?;
    text.parse::<i64>()
        .map_err(|_| ProtocolError::InvalidNumber(text.to_string()))
}

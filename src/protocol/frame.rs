//! RESP Frame Module
//!
//! A single RESP2 value as exchanged with the store.

use bytes::{BufMut, Bytes, BytesMut};

// == Frame ==
/// One RESP2 value.
///
/// Commands go out as arrays of bulk strings; replies can be any variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+OK\r\n`
    Simple(String),
    /// `-ERR message\r\n`
    Error(String),
    /// `:42\r\n`
    Integer(i64),
    /// `$5\r\nhello\r\n`
    Bulk(Bytes),
    /// `$-1\r\n` or `*-1\r\n`
    Null,
    /// `*2\r\n...`
    Array(Vec<Frame>),
}

impl Frame {
    // == Command Builder ==
    /// Builds a command frame from its name and arguments.
    pub fn command<I, A>(parts: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: AsRef<[u8]>,
    {
        Frame::Array(
            parts
                .into_iter()
                .map(|part| Frame::Bulk(Bytes::copy_from_slice(part.as_ref())))
                .collect(),
        )
    }

    // == Encoding ==
    /// Appends the wire form of this frame to `dst`.
    pub fn write_to(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(s) => {
                dst.put_u8(b'+');
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Frame::Error(s) => {
                dst.put_u8(b'-');
                dst.put_slice(s.as_bytes());
                dst.put_slice(b"\r\n");
            }
            Frame::Integer(n) => {
                dst.put_u8(b':');
                dst.put_slice(n.to_string().as_bytes());
                dst.put_slice(b"\r\n");
            }
            Frame::Bulk(data) => {
                dst.put_u8(b'$');
                dst.put_slice(data.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                dst.put_slice(data);
                dst.put_slice(b"\r\n");
            }
            Frame::Null => dst.put_slice(b"$-1\r\n"),
            Frame::Array(items) => {
                dst.put_u8(b'*');
                dst.put_slice(items.len().to_string().as_bytes());
                dst.put_slice(b"\r\n");
                for item in items {
                    item.write_to(dst);
                }
            }
        }
    }

    // == Accessors ==
    /// Returns the text of a simple or bulk string, if it is valid UTF-8.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Frame::Simple(s) => Some(s.clone()),
            Frame::Bulk(data) => String::from_utf8(data.to_vec()).ok(),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Simple(_) => "simple string",
            Frame::Error(_) => "error",
            Frame::Integer(_) => "integer",
            Frame::Bulk(_) => "bulk string",
            Frame::Null => "null",
            Frame::Array(_) => "array",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(frame: &Frame) -> Vec<u8> {
        let mut buf = BytesMut::new();
        frame.write_to(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_command_encodes_as_bulk_array() {
        let frame = Frame::command(["SETEX", "message", "120", "hi"]);
        assert_eq!(
            encode(&frame),
            b"*4\r\n$5\r\nSETEX\r\n$7\r\nmessage\r\n$3\r\n120\r\n$2\r\nhi\r\n".to_vec()
        );
    }

    #[test]
    fn test_null_and_integer_encoding() {
        assert_eq!(encode(&Frame::Null), b"$-1\r\n".to_vec());
        assert_eq!(encode(&Frame::Integer(-7)), b":-7\r\n".to_vec());
    }

    #[test]
    fn test_as_text() {
        assert_eq!(Frame::Simple("OK".into()).as_text().as_deref(), Some("OK"));
        assert_eq!(
            Frame::Bulk(Bytes::from_static(b"v")).as_text().as_deref(),
            Some("v")
        );
        assert!(Frame::Integer(1).as_text().is_none());
        assert!(Frame::Bulk(Bytes::from_static(&[0xff, 0xfe])).as_text().is_none());
    }
}

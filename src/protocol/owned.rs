//! Owned Replies
//!
//! [`OwnedReply`] is a reply that does not borrow from an arena. Use
//! [`Reply::to_owned_reply`] to keep a decoded value after its arena is reset,
//! or build one directly and [`serialize`](OwnedReply::serialize) it to get
//! the RESP bytes a server would send.

use crate::protocol::types::{prefix, AccessError, Reply, CRLF};
use bytes::Bytes;

/// An arena-independent Redis reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnedReply {
    /// Status line. Format: `+<text>\r\n`
    Status(Bytes),

    /// Error line. Format: `-<error message>\r\n`
    Error(Bytes),

    /// 64-bit signed integer. Format: `:<integer>\r\n`
    Integer(i64),

    /// Binary-safe bulk string. Format: `$<length>\r\n<data>\r\n`
    String(Bytes),

    /// Nil bulk string or nil array. Serialized as `$-1\r\n`
    Nil,

    /// Array of replies. Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<OwnedReply>),
}

impl OwnedReply {
    /// Creates a status reply.
    ///
    /// # Example
    /// ```
    /// use flashresp::protocol::OwnedReply;
    /// let ok = OwnedReply::status("OK");
    /// assert_eq!(ok.serialize(), b"+OK\r\n");
    /// ```
    pub fn status(text: impl Into<Bytes>) -> Self {
        OwnedReply::Status(text.into())
    }

    /// Creates an error reply.
    pub fn error(text: impl Into<Bytes>) -> Self {
        OwnedReply::Error(text.into())
    }

    pub fn integer(n: i64) -> Self {
        OwnedReply::Integer(n)
    }

    /// Creates a bulk string reply.
    pub fn string(data: impl Into<Bytes>) -> Self {
        OwnedReply::String(data.into())
    }

    pub fn array(values: Vec<OwnedReply>) -> Self {
        OwnedReply::Array(values)
    }

    /// Serializes the reply to its RESP wire format.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        match self {
            OwnedReply::Status(text) => {
                buf.push(prefix::STATUS);
                buf.extend_from_slice(text);
                buf.extend_from_slice(CRLF);
            }
            OwnedReply::Error(text) => {
                buf.push(prefix::ERROR);
                buf.extend_from_slice(text);
                buf.extend_from_slice(CRLF);
            }
            OwnedReply::Integer(n) => {
                buf.push(prefix::INTEGER);
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(CRLF);
            }
            OwnedReply::String(data) => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                buf.extend_from_slice(data);
                buf.extend_from_slice(CRLF);
            }
            OwnedReply::Nil => {
                buf.push(prefix::BULK_STRING);
                buf.extend_from_slice(b"-1");
                buf.extend_from_slice(CRLF);
            }
            OwnedReply::Array(values) => {
                buf.push(prefix::ARRAY);
                buf.extend_from_slice(values.len().to_string().as_bytes());
                buf.extend_from_slice(CRLF);
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }
}

impl Reply<'_> {
    /// Copies a fully decoded reply out of its arena.
    ///
    /// Fails with [`AccessError::Incomplete`] if this reply, or any element
    /// below it, is still being decoded.
    pub fn to_owned_reply(&self) -> Result<OwnedReply, AccessError> {
        Ok(match self {
            Reply::Uninitialized => return Err(AccessError::Incomplete),
            Reply::String(s) => OwnedReply::String(Bytes::copy_from_slice(s.as_bytes())),
            Reply::Status(s) => OwnedReply::Status(Bytes::copy_from_slice(s.as_bytes())),
            Reply::Error(s) => OwnedReply::Error(Bytes::copy_from_slice(s.as_bytes())),
            Reply::Integer(n) => OwnedReply::Integer(*n),
            Reply::Nil => OwnedReply::Nil,
            Reply::Array(array) => {
                if array.is_suspended() {
                    return Err(AccessError::Incomplete);
                }
                OwnedReply::Array(
                    array
                        .iter()
                        .map(Reply::to_owned_reply)
                        .collect::<Result<_, _>>()?,
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::{parse_reply, Progress, ReplyParser};
    use bumpalo::Bump;
    use bytes::BytesMut;

    #[test]
    fn test_status_serialize() {
        assert_eq!(OwnedReply::status("OK").serialize(), b"+OK\r\n");
    }

    #[test]
    fn test_error_serialize() {
        let value = OwnedReply::error("ERR unknown command");
        assert_eq!(value.serialize(), b"-ERR unknown command\r\n");
    }

    #[test]
    fn test_integer_serialize() {
        assert_eq!(OwnedReply::integer(1000).serialize(), b":1000\r\n");
        assert_eq!(OwnedReply::integer(-42).serialize(), b":-42\r\n");
    }

    #[test]
    fn test_bulk_string_serialize() {
        let value = OwnedReply::string(Bytes::from("hello"));
        assert_eq!(value.serialize(), b"$5\r\nhello\r\n");
    }

    #[test]
    fn test_nil_serialize() {
        assert_eq!(OwnedReply::Nil.serialize(), b"$-1\r\n");
    }

    #[test]
    fn test_nested_array_serialize() {
        let value = OwnedReply::array(vec![
            OwnedReply::integer(1),
            OwnedReply::array(vec![OwnedReply::integer(2), OwnedReply::integer(3)]),
        ]);
        assert_eq!(value.serialize(), b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n");
    }

    #[test]
    fn test_serialized_reply_decodes_back() {
        let original = OwnedReply::array(vec![
            OwnedReply::status("QUEUED"),
            OwnedReply::string("a value longer than inline storage"),
            OwnedReply::array(vec![]),
            OwnedReply::error("WRONGTYPE Operation against a key"),
        ]);

        let serialized = original.serialize();
        let arena = Bump::new();
        let (reply, consumed) = parse_reply(&serialized, &arena).unwrap().unwrap();
        assert_eq!(consumed, serialized.len());
        assert_eq!(reply.to_owned_reply().unwrap(), original);
    }

    #[test]
    fn test_owned_reply_outlives_arena() {
        let owned = {
            let arena = Bump::new();
            let (reply, _) = parse_reply(b"$20\r\n01234567890123456789\r\n", &arena)
                .unwrap()
                .unwrap();
            reply.to_owned_reply().unwrap()
        };
        assert_eq!(owned, OwnedReply::string("01234567890123456789"));
    }

    #[test]
    fn test_incomplete_reply_cannot_be_owned() {
        assert_eq!(
            Reply::new().to_owned_reply(),
            Err(AccessError::Incomplete)
        );

        let arena = Bump::new();
        let mut reply = Reply::new();
        let mut buf = BytesMut::from(&b"*2\r\n:1\r\n"[..]);
        let progress = ReplyParser::new()
            .advance(&mut reply, &mut buf, &arena)
            .unwrap();
        assert_eq!(progress, Progress::Incomplete);
        assert_eq!(reply.to_owned_reply(), Err(AccessError::Incomplete));
    }
}

//! Human-readable rendering of replies, in the style of `redis-cli`.
//!
//! ```text
//! "hello"                 bulk string
//! OK                      status
//! (error) ERR wrong type  error
//! (integer) 42            integer
//! (nil)                   nil
//! ["a", (integer) 1]      array
//! ```
//!
//! Bytes outside printable ASCII are written as `\u00XX` so the output is
//! always safe to print on a terminal.

use crate::protocol::types::{Reply, ReplyType};
use std::fmt::{self, Write};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Writes `data`, escaping every byte outside `0x20..=0x7E` as `\u00XX`.
pub fn write_escaped<W: Write + ?Sized>(out: &mut W, data: &[u8]) -> fmt::Result {
    for &byte in data {
        if (0x20..=0x7e).contains(&byte) {
            out.write_char(byte as char)?;
        } else {
            out.write_str("\\u00")?;
            out.write_char(HEX_DIGITS[usize::from(byte >> 4)] as char)?;
            out.write_char(HEX_DIGITS[usize::from(byte & 0x0f)] as char)?;
        }
    }
    Ok(())
}

impl fmt::Display for Reply<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::String(s) => {
                f.write_char('"')?;
                write_escaped(f, s.as_bytes())?;
                f.write_char('"')
            }
            Reply::Array(array) => {
                f.write_char('[')?;
                for (i, element) in array.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{element}")?;
                }
                f.write_char(']')
            }
            Reply::Integer(n) => write!(f, "(integer) {n}"),
            Reply::Nil => f.write_str("(nil)"),
            Reply::Status(s) => write_escaped(f, s.as_bytes()),
            Reply::Error(s) => {
                f.write_str("(error) ")?;
                write_escaped(f, s.as_bytes())
            }
            Reply::Uninitialized => f.write_str("(uninitialized)"),
        }
    }
}

impl fmt::Display for ReplyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::parser::{parse_reply, Progress, ReplyParser};
    use bumpalo::Bump;
    use bytes::BytesMut;

    fn render(input: &[u8]) -> String {
        let arena = Bump::new();
        let (reply, _) = parse_reply(input, &arena).unwrap().unwrap();
        reply.to_string()
    }

    #[test]
    fn test_render_error() {
        assert_eq!(render(b"-ERR wrong type\r\n"), "(error) ERR wrong type");
    }

    #[test]
    fn test_render_integer() {
        assert_eq!(render(b":-1\r\n"), "(integer) -1");
    }

    #[test]
    fn test_render_status_is_bare() {
        assert_eq!(render(b"+OK\r\n"), "OK");
    }

    #[test]
    fn test_render_string_is_quoted() {
        assert_eq!(render(b"$5\r\nhello\r\n"), "\"hello\"");
        assert_eq!(render(b"$0\r\n\r\n"), "\"\"");
    }

    #[test]
    fn test_render_nil() {
        assert_eq!(render(b"$-1\r\n"), "(nil)");
        assert_eq!(render(b"*-1\r\n"), "(nil)");
    }

    #[test]
    fn test_render_arrays() {
        assert_eq!(render(b"*0\r\n"), "[]");
        assert_eq!(
            render(b"*3\r\n$3\r\nfoo\r\n:1\r\n*2\r\n$-1\r\n+OK\r\n"),
            "[\"foo\", (integer) 1, [(nil), OK]]"
        );
    }

    #[test]
    fn test_render_escapes_binary() {
        assert_eq!(
            render(b"$4\r\na\x00\xff\x1b\r\n"),
            "\"a\\u0000\\u00FF\\u001B\""
        );
        assert_eq!(
            render(b"$20\r\nlong\tpayload\x7f.......\r\n"),
            "\"long\\u0009payload\\u007F.......\""
        );
    }

    #[test]
    fn test_render_partial_array() {
        let arena = Bump::new();
        let mut reply = Reply::new();
        let mut buf = BytesMut::from(&b"*2\r\n:1\r\n"[..]);
        let progress = ReplyParser::new()
            .advance(&mut reply, &mut buf, &arena)
            .unwrap();
        assert_eq!(progress, Progress::Incomplete);
        assert_eq!(reply.to_string(), "[(integer) 1, (uninitialized)]");
    }

    #[test]
    fn test_write_escaped_into_string() {
        let mut out = String::new();
        write_escaped(&mut out, b"ok\n").unwrap();
        assert_eq!(out, "ok\\u000A");
    }

    #[test]
    fn test_reply_type_display() {
        assert_eq!(ReplyType::Status.to_string(), "status");
        assert_eq!(Reply::Nil.reply_type().to_string(), "nil");
    }
}

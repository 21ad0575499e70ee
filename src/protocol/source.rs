//! Byte Source
//!
//! The decoder never touches a socket or a slice directly. It reads through
//! [`ByteSource`], a FIFO byte queue that can be inspected without consuming
//! and drained once a decision is final. This is what lets a decode attempt
//! back off with nothing consumed when a unit is not fully buffered yet.
//!
//! `BytesMut` (the buffer connections read into) implements it.

use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;

/// A sequential byte queue the decoder reads from.
pub trait ByteSource {
    /// Number of bytes currently buffered.
    fn buffered_len(&self) -> usize;

    /// The next byte, without consuming it.
    fn peek_first_byte(&self) -> Option<u8>;

    /// Consumes everything up to and including the first `delimiter`,
    /// returning the bytes before it.
    ///
    /// Returns `None` and consumes nothing if the delimiter is not buffered.
    fn extract_until(&mut self, delimiter: &[u8]) -> Option<Bytes>;

    /// Copies up to `dst.len()` leading bytes into `dst` without consuming
    /// them. Returns how many bytes were copied.
    fn copy_bounded(&self, dst: &mut [u8]) -> usize;

    /// Discards `n` bytes. `n` must not exceed [`buffered_len`](Self::buffered_len).
    fn skip(&mut self, n: usize);

    /// Consumes exactly `dst.len()` bytes into `dst`.
    /// `dst.len()` must not exceed [`buffered_len`](Self::buffered_len).
    fn extract_exact(&mut self, dst: &mut [u8]);
}

impl ByteSource for BytesMut {
    fn buffered_len(&self) -> usize {
        self.len()
    }

    fn peek_first_byte(&self) -> Option<u8> {
        self.first().copied()
    }

    fn extract_until(&mut self, delimiter: &[u8]) -> Option<Bytes> {
        let pos = memmem::find(&self[..], delimiter)?;
        let line = self.split_to(pos).freeze();
        self.advance(delimiter.len());
        Some(line)
    }

    fn copy_bounded(&self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.len());
        dst[..n].copy_from_slice(&self[..n]);
        n
    }

    fn skip(&mut self, n: usize) {
        self.advance(n);
    }

    fn extract_exact(&mut self, dst: &mut [u8]) {
        self.copy_to_slice(dst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_does_not_consume() {
        let buf = BytesMut::from(&b"+OK\r\n"[..]);
        assert_eq!(buf.peek_first_byte(), Some(b'+'));
        assert_eq!(buf.buffered_len(), 5);
    }

    #[test]
    fn test_peek_empty() {
        let buf = BytesMut::new();
        assert_eq!(buf.peek_first_byte(), None);
    }

    #[test]
    fn test_extract_until_consumes_delimiter() {
        let mut buf = BytesMut::from(&b"+OK\r\n:1\r\n"[..]);
        let line = buf.extract_until(b"\r\n").unwrap();
        assert_eq!(&line[..], b"+OK");
        assert_eq!(&buf[..], b":1\r\n");
    }

    #[test]
    fn test_extract_until_missing_delimiter() {
        let mut buf = BytesMut::from(&b"+OK\r"[..]);
        assert!(buf.extract_until(b"\r\n").is_none());
        assert_eq!(&buf[..], b"+OK\r");
    }

    #[test]
    fn test_copy_bounded() {
        let buf = BytesMut::from(&b":12\r\n"[..]);

        let mut small = [0u8; 3];
        assert_eq!(buf.copy_bounded(&mut small), 3);
        assert_eq!(&small, b":12");

        let mut large = [0u8; 32];
        assert_eq!(buf.copy_bounded(&mut large), 5);
        assert_eq!(&large[..5], b":12\r\n");

        assert_eq!(buf.buffered_len(), 5);
    }

    #[test]
    fn test_skip_and_extract_exact() {
        let mut buf = BytesMut::from(&b"$3\r\nfoo\r\n"[..]);
        buf.skip(4);
        let mut data = [0u8; 3];
        buf.extract_exact(&mut data);
        assert_eq!(&data, b"foo");
        assert_eq!(&buf[..], b"\r\n");
    }
}

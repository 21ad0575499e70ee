//! Reply Reader
//!
//! This module drives the decoder from an async byte stream. The decoder
//! itself never performs I/O; the reader owns the buffer, calls
//! [`ReplyParser::advance`], and reads more bytes whenever the reply is
//! incomplete.
//!
//! ## Read Loop
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  advance(reply, buffer)      │◄──────────┐
//! └──────────────┬───────────────┘           │
//!                │                           │
//!      Complete  │  Incomplete               │
//!     ┌──────────┴──────────┐                │
//!     ▼                     ▼                │
//! return reply     ┌─────────────────┐       │
//!                  │ read more bytes │───────┘
//!                  └─────────────────┘
//! ```
//!
//! ## Buffer Management
//!
//! Bytes are accumulated in a `BytesMut`. A bulk string is only decoded
//! once its whole payload is buffered, so the buffer limit also bounds the
//! largest bulk string the reader can accept.

use crate::protocol::{ParseError, ParserConfig, Progress, Reply, ReplyParser};
use bumpalo::Bump;
use bytes::{BufMut, BytesMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{error, trace, warn};

/// Maximum size for the read buffer (512 MB, same as the Redis bulk limit)
pub const MAX_BUFFER_SIZE: usize = 512 * 1024 * 1024;

/// Initial buffer capacity
pub const INITIAL_BUFFER_SIZE: usize = 4096;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Decoder limits and policies
    pub parser: ParserConfig,
    /// Refuse to buffer more than this many bytes
    pub max_buffer_size: usize,
    /// Capacity the buffer starts with
    pub initial_buffer_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            max_buffer_size: MAX_BUFFER_SIZE,
            initial_buffer_size: INITIAL_BUFFER_SIZE,
        }
    }
}

/// Statistics for reply reading
#[derive(Debug, Default)]
pub struct ReaderStats {
    /// Total replies fully decoded
    pub replies_decoded: AtomicU64,
    /// Total read calls that returned data
    pub reads: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total decode attempts that failed
    pub decode_errors: AtomicU64,
}

impl ReaderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_decoded(&self) {
        self.replies_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// Errors that can occur while reading replies.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream is not valid RESP, or the arena is exhausted
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// End of stream in the middle of a reply
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,

    /// An earlier read failed, or was dropped after consuming part of a reply
    #[error("Reader abandoned in the middle of a reply")]
    Poisoned,
}

/// Reads successive replies from an async byte stream.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use flashresp::stream::ReplyReader;
///
/// # tokio_test::block_on(async {
/// let mut reader = ReplyReader::new(&b"+OK\r\n:1\r\n"[..]);
/// let arena = Bump::new();
///
/// let reply = reader.read_reply(&arena).await?.unwrap();
/// assert_eq!(reply.as_str().unwrap(), "OK");
///
/// let reply = reader.read_reply(&arena).await?.unwrap();
/// assert_eq!(reply.integer().unwrap(), 1);
///
/// assert!(reader.read_reply(&arena).await?.is_none());
/// # Ok::<(), flashresp::stream::ReaderError>(())
/// # }).unwrap();
/// ```
pub struct ReplyReader<R> {
    /// The stream replies are read from
    stream: R,

    /// Bytes read but not yet decoded
    buffer: BytesMut,

    parser: ReplyParser,

    max_buffer_size: usize,

    /// Set while bytes of an unfinished reply have been consumed
    partial: bool,

    /// Reader statistics (shared)
    stats: Arc<ReaderStats>,
}

impl<R: AsyncRead + Unpin> ReplyReader<R> {
    /// Creates a reader with the default configuration.
    pub fn new(stream: R) -> Self {
        Self::with_config(stream, ReaderConfig::default(), Arc::new(ReaderStats::new()))
    }

    pub fn with_config(stream: R, config: ReaderConfig, stats: Arc<ReaderStats>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(config.initial_buffer_size),
            parser: ReplyParser::with_config(config.parser),
            max_buffer_size: config.max_buffer_size,
            partial: false,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<ReaderStats> {
        &self.stats
    }

    /// Number of bytes read but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Reads the next reply, allocating its storage from `arena`.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly between replies.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe only while no byte of the next reply has
    /// been consumed. The header and finished elements of an array are
    /// drained from the buffer as they decode, and they live only in the
    /// dropped future. Once such a read is cancelled the stream position is
    /// lost, and every later call fails with [`ReaderError::Poisoned`]. The
    /// same holds after a call returned a decode error.
    pub async fn read_reply<'a>(
        &mut self,
        arena: &'a Bump,
    ) -> Result<Option<Reply<'a>>, ReaderError> {
        if self.partial {
            return Err(ReaderError::Poisoned);
        }

        let mut reply = Reply::new();

        loop {
            match self.parser.advance(&mut reply, &mut self.buffer, arena) {
                Ok(Progress::Complete) => {
                    self.partial = false;
                    self.stats.reply_decoded();
                    trace!(
                        reply_type = %reply.reply_type(),
                        remaining = self.buffer.len(),
                        "Decoded reply"
                    );
                    return Ok(Some(reply));
                }
                Ok(Progress::Incomplete) => {
                    // Nothing is consumed until the reply leaves Uninitialized
                    self.partial = !reply.is_uninitialized();
                    trace!(
                        buffered = self.buffer.len(),
                        "Incomplete reply, need more data"
                    );
                }
                Err(e) => {
                    self.partial = true;
                    self.stats.decode_error();
                    warn!(error = %e, "Failed to decode reply");
                    return Err(ReaderError::Parse(e));
                }
            }

            if self.read_more_data().await? == 0 {
                if self.buffer.is_empty() && reply.is_uninitialized() {
                    return Ok(None);
                }
                return Err(ReaderError::UnexpectedEof);
            }
        }
    }

    /// Reads more data from the stream into the buffer.
    ///
    /// Returns the number of bytes read; 0 means end of stream.
    async fn read_more_data(&mut self) -> Result<usize, ReaderError> {
        // Check buffer size limit
        let remaining = self.max_buffer_size.saturating_sub(self.buffer.len());
        if remaining == 0 {
            error!(
                size = self.buffer.len(),
                limit = self.max_buffer_size,
                "Buffer size limit exceeded"
            );
            return Err(ReaderError::BufferFull);
        }

        // Ensure we have some capacity, never more than the limit allows
        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(remaining.min(4096));
        }

        let mut dst = (&mut self.buffer).limit(remaining);
        let n = self.stream.read_buf(&mut dst).await?;
        if n > 0 {
            self.stats.bytes_read(n);
            trace!(bytes = n, "Read data");
        }
        Ok(n)
    }
}

//! Resumable RESP Reply Decoder
//!
//! This module turns bytes from a [`ByteSource`] into a [`Reply`] tree whose
//! long strings and array elements live in a `bumpalo::Bump` arena.
//!
//! ## Design Philosophy
//!
//! 1. **Resumable**: A reply may arrive in any number of fragments. The
//!    decoder makes as much progress as the buffered bytes allow and records
//!    where it stopped inside the reply itself.
//! 2. **No re-parsing**: Array headers and completed elements are consumed
//!    exactly once. A later call continues at the first unfinished element.
//! 3. **Errors are final**: "need more bytes" is a normal outcome, never an
//!    error. A [`ParseError`] means the input is not valid RESP (or the arena
//!    is exhausted) and the session must be torn down.
//!
//! ## How the Decoder Works
//!
//! [`ReplyParser::advance`] returns:
//! - `Ok(Progress::Complete)` - the reply is fully decoded
//! - `Ok(Progress::Incomplete)` - more bytes are needed; call again with the
//!   same reply once they are buffered
//! - `Err(ParseError)` - invalid protocol data
//!
//! A call that returns `Incomplete` leaves the unit it could not finish
//! untouched in the byte source: an unterminated status line, a bulk string
//! whose payload is not fully buffered, or a header without its CRLF. Bytes
//! of array headers and of already completed array elements stay consumed;
//! the array remembers the index to continue from.

use crate::protocol::source::ByteSource;
use crate::protocol::types::{prefix, Reply, ReplyArray, ReplyBytes, CRLF, INLINE_CAPACITY};
use bumpalo::Bump;
use bytes::BytesMut;
use memchr::memmem;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors that can occur while decoding a reply.
///
/// Every variant except [`ParseError::ArenaExhausted`] is a protocol
/// violation. None of them can be fixed by supplying more bytes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unknown type prefix byte
    #[error("unknown reply type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// Header value is not a 64-bit decimal
    #[error("invalid integer: {0:?}")]
    InvalidInteger(String),

    /// No CRLF within the header lookahead window
    #[error("header exceeds {0} bytes without CRLF")]
    HeaderTooLong(usize),

    /// Bulk string length over the configured maximum
    #[error("bulk string too long: {len} bytes (max: {max})")]
    BulkTooLong { len: u64, max: u64 },

    /// Array element count over the configured maximum
    #[error("array too long: {count} elements (max: {max})")]
    ArrayTooLong { count: u64, max: u64 },

    /// Arrays nested deeper than the configured maximum
    #[error("maximum nesting depth exceeded: {0}")]
    NestingTooDeep(usize),

    /// Bulk string payload not followed by CRLF (strict mode only)
    #[error("bulk string missing trailing CRLF")]
    MissingTrailingCrlf,

    /// The arena refused an allocation
    #[error("arena exhausted while allocating {bytes} bytes")]
    ArenaExhausted { bytes: usize },
}

impl ParseError {
    /// Returns true for malformed input, false for resource exhaustion.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, ParseError::ArenaExhausted { .. })
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Outcome of a successful [`ReplyParser::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Progress {
    /// The reply is fully decoded.
    Complete,
    /// The byte source ran dry; call again once more bytes are buffered.
    Incomplete,
}

impl Progress {
    pub fn is_complete(self) -> bool {
        self == Progress::Complete
    }
}

/// Maximum bulk string length (2^32 - 1)
pub const MAX_BULK_LEN: u64 = u32::MAX as u64;

/// Maximum array element count (2^32 - 1)
pub const MAX_ARRAY_LEN: u64 = u32::MAX as u64;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Bytes inspected when looking for the CRLF of a `:`, `$` or `*` header.
///
/// The longest valid header is `:-9223372036854775808\r\n` (23 bytes), so a
/// full window without CRLF can never become valid.
pub const HEADER_LOOKAHEAD: usize = 32;

/// Limits and policies applied while decoding.
///
/// An array header allocates its whole element block up front, so with the
/// default `max_array_len` a 13-byte header can request over 100 GB. When
/// replies come from an untrusted peer, cap the arena with
/// [`Bump::set_allocation_limit`] (such requests then fail with
/// [`ParseError::ArenaExhausted`]) or lower `max_array_len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    /// Longest accepted bulk string
    pub max_bulk_len: u64,
    /// Largest accepted array element count. Each element costs
    /// `size_of::<Reply>()` arena bytes as soon as the header is decoded.
    pub max_array_len: u64,
    /// Deepest accepted array nesting; a top-level array is at depth 0
    pub max_depth: usize,
    /// Reject bulk strings whose payload is not followed by CRLF.
    /// When false, the mismatch is logged and the string is kept.
    pub strict_trailing_crlf: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_bulk_len: MAX_BULK_LEN,
            max_array_len: MAX_ARRAY_LEN,
            max_depth: MAX_NESTING_DEPTH,
            strict_trailing_crlf: false,
        }
    }
}

/// A resumable RESP reply decoder.
///
/// The parser holds only configuration; all progress is recorded in the
/// [`Reply`] being decoded, so one parser can serve any number of sessions.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use bytes::BytesMut;
/// use flashresp::protocol::{Progress, Reply, ReplyParser};
///
/// let arena = Bump::new();
/// let parser = ReplyParser::new();
/// let mut reply = Reply::new();
/// let mut buffer = BytesMut::from(&b"*2\r\n$3\r\nfoo"[..]);
///
/// assert_eq!(parser.advance(&mut reply, &mut buffer, &arena)?, Progress::Incomplete);
///
/// buffer.extend_from_slice(b"\r\n:7\r\n");
/// assert_eq!(parser.advance(&mut reply, &mut buffer, &arena)?, Progress::Complete);
/// assert_eq!(reply.to_string(), r#"["foo", (integer) 7]"#);
/// # Ok::<(), flashresp::protocol::ParseError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct ReplyParser {
    config: ParserConfig,
}

/// A parsed `<prefix><decimal>\r\n` header.
struct Header {
    value: i64,
    /// Header size including prefix and CRLF
    len: usize,
}

impl ReplyParser {
    /// Creates a parser with the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Decodes as much of `reply` as the buffered bytes allow.
    ///
    /// `reply` must be either `Uninitialized` or the reply a previous call
    /// returned `Incomplete` for. All variable-length storage comes from
    /// `arena`.
    ///
    /// # Returns
    ///
    /// - `Ok(Progress::Complete)` - `reply` holds a fully decoded value
    /// - `Ok(Progress::Incomplete)` - need more bytes, call again later
    /// - `Err(e)` - invalid input or arena exhaustion; `reply` and `src` are
    ///   left in an unspecified state
    pub fn advance<'a, S>(
        &self,
        reply: &mut Reply<'a>,
        src: &mut S,
        arena: &'a Bump,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        self.advance_at(reply, src, arena, 0)
    }

    fn advance_at<'a, S>(
        &self,
        reply: &mut Reply<'a>,
        src: &mut S,
        arena: &'a Bump,
        depth: usize,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        // A suspended array already consumed its header; never look at the
        // type prefix again.
        if let Reply::Array(array) = reply {
            if array.is_suspended() {
                return self.resume_array(array, src, arena, depth);
            }
        }

        let Some(first) = src.peek_first_byte() else {
            return Ok(Progress::Incomplete);
        };

        match first {
            prefix::STATUS | prefix::ERROR => Self::parse_line(reply, src, arena, first),
            prefix::INTEGER | prefix::BULK_STRING | prefix::ARRAY => {
                let Some(header) = Self::read_header(src)? else {
                    return Ok(Progress::Incomplete);
                };
                match first {
                    prefix::INTEGER => {
                        src.skip(header.len);
                        *reply = Reply::Integer(header.value);
                        Ok(Progress::Complete)
                    }
                    prefix::BULK_STRING => self.parse_bulk_string(reply, src, arena, header),
                    _ => self.parse_array(reply, src, arena, header, depth),
                }
            }
            other => {
                debug!(prefix = other, "Unknown reply type prefix");
                Err(ParseError::UnknownPrefix(other))
            }
        }
    }

    /// Parses a status or error line: `+<text>\r\n` / `-<text>\r\n`
    fn parse_line<'a, S>(
        reply: &mut Reply<'a>,
        src: &mut S,
        arena: &'a Bump,
        kind: u8,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        let Some(line) = src.extract_until(CRLF) else {
            return Ok(Progress::Incomplete);
        };

        let text = store_bytes(&line[1..], arena)?;
        *reply = if kind == prefix::ERROR {
            Reply::Error(text)
        } else {
            Reply::Status(text)
        };
        Ok(Progress::Complete)
    }

    /// Parses a bulk string once header, payload and trailer are buffered:
    /// `$<length>\r\n<data>\r\n`
    fn parse_bulk_string<'a, S>(
        &self,
        reply: &mut Reply<'a>,
        src: &mut S,
        arena: &'a Bump,
        header: Header,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        // Any negative length is a nil bulk string
        if header.value < 0 {
            src.skip(header.len);
            *reply = Reply::Nil;
            return Ok(Progress::Complete);
        }

        let max = self.config.max_bulk_len;
        let too_long = |len: u64| {
            debug!(len, max, "Bulk string too long");
            ParseError::BulkTooLong { len, max }
        };
        let requested = header.value as u64;
        if requested > max {
            return Err(too_long(requested));
        }
        let len = usize::try_from(requested).map_err(|_| too_long(requested))?;

        let needed = header
            .len
            .checked_add(len)
            .and_then(|n| n.checked_add(CRLF.len()))
            .ok_or_else(|| too_long(requested))?;
        if src.buffered_len() < needed {
            return Ok(Progress::Incomplete);
        }

        let data = if len < INLINE_CAPACITY {
            src.skip(header.len);
            let mut buf = [0u8; INLINE_CAPACITY];
            src.extract_exact(&mut buf[..len]);
            ReplyBytes::from_inline(buf, len)
        } else {
            let block = alloc_bytes(arena, len)?;
            src.skip(header.len);
            src.extract_exact(&mut block[..len]);
            ReplyBytes::from_arena(block)
        };

        let mut trailer = [0u8; 2];
        src.extract_exact(&mut trailer);
        if trailer[..] != *CRLF {
            if self.config.strict_trailing_crlf {
                debug!(trailer = ?trailer, "Bulk string missing trailing CRLF");
                return Err(ParseError::MissingTrailingCrlf);
            }
            warn!(trailer = ?trailer, "Bulk string is not terminated by CRLF");
        }

        *reply = Reply::String(data);
        Ok(Progress::Complete)
    }

    /// Parses an array header and as many elements as are buffered:
    /// `*<count>\r\n<elements...>`
    fn parse_array<'a, S>(
        &self,
        reply: &mut Reply<'a>,
        src: &mut S,
        arena: &'a Bump,
        header: Header,
        depth: usize,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        // Any negative count is a nil array
        if header.value < 0 {
            src.skip(header.len);
            *reply = Reply::Nil;
            return Ok(Progress::Complete);
        }

        if header.value == 0 {
            src.skip(header.len);
            *reply = Reply::Array(ReplyArray::empty());
            return Ok(Progress::Complete);
        }

        let max = self.config.max_array_len;
        let too_long = |count: u64| {
            debug!(count, max, "Array too long");
            ParseError::ArrayTooLong { count, max }
        };
        let requested = header.value as u64;
        if requested > max {
            return Err(too_long(requested));
        }
        let count = usize::try_from(requested).map_err(|_| too_long(requested))?;

        if depth >= self.config.max_depth {
            debug!(depth, "Array nesting too deep");
            return Err(ParseError::NestingTooDeep(self.config.max_depth));
        }

        let elements = arena
            .try_alloc_slice_fill_with(count, |_| Reply::Uninitialized)
            .map_err(|_| {
                let bytes = count.saturating_mul(std::mem::size_of::<Reply<'_>>());
                error!(count, bytes, "Failed to allocate array elements");
                ParseError::ArenaExhausted { bytes }
            })?;
        src.skip(header.len);

        let mut array = ReplyArray::suspended(elements);
        let progress = self.resume_array(&mut array, src, arena, depth);
        *reply = Reply::Array(array);
        progress
    }

    /// Continues decoding at the first unfinished element of `array`.
    fn resume_array<'a, S>(
        &self,
        array: &mut ReplyArray<'a>,
        src: &mut S,
        arena: &'a Bump,
        depth: usize,
    ) -> ParseResult<Progress>
    where
        S: ByteSource + ?Sized,
    {
        while let Some(index) = array.resume_at {
            let element = &mut array.elements[index];
            match self.advance_at(element, src, arena, depth + 1)? {
                Progress::Incomplete => return Ok(Progress::Incomplete),
                Progress::Complete => {
                    let next = index + 1;
                    array.resume_at = (next < array.elements.len()).then_some(next);
                }
            }
        }
        Ok(Progress::Complete)
    }

    /// Reads a `<prefix><decimal>\r\n` header without consuming it.
    ///
    /// Returns `Ok(None)` if the CRLF is not buffered yet.
    fn read_header<S>(src: &S) -> ParseResult<Option<Header>>
    where
        S: ByteSource + ?Sized,
    {
        let mut window = [0u8; HEADER_LOOKAHEAD];
        let copied = src.copy_bounded(&mut window);
        let body = &window[1..copied];

        let Some(crlf) = memmem::find(body, CRLF) else {
            if copied == HEADER_LOOKAHEAD {
                debug!(
                    header = %String::from_utf8_lossy(&window),
                    "Header exceeds lookahead window"
                );
                return Err(ParseError::HeaderTooLong(HEADER_LOOKAHEAD));
            }
            // Reject as soon as the partial header cannot become a decimal
            let partial = body.strip_suffix(b"\r").unwrap_or(body);
            if !partial
                .iter()
                .all(|&b| b.is_ascii_digit() || b == b'-' || b == b'+')
            {
                return Err(invalid_integer(partial));
            }
            return Ok(None);
        };

        let digits = &body[..crlf];
        let value = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| invalid_integer(digits))?;

        Ok(Some(Header {
            value,
            len: 1 + crlf + CRLF.len(),
        }))
    }
}

fn invalid_integer(digits: &[u8]) -> ParseError {
    let text = String::from_utf8_lossy(digits).into_owned();
    debug!(%text, "Not a valid 64-bit decimal");
    ParseError::InvalidInteger(text)
}

/// Allocates `len` payload bytes plus the NUL sentinel, all zeroed.
fn alloc_bytes(arena: &Bump, len: usize) -> ParseResult<&mut [u8]> {
    let bytes = len.saturating_add(1);
    arena.try_alloc_slice_fill_copy(bytes, 0u8).map_err(|_| {
        error!(bytes, "Failed to allocate string");
        ParseError::ArenaExhausted { bytes }
    })
}

/// Stores a payload inline or in the arena, depending on its length.
fn store_bytes<'a>(data: &[u8], arena: &'a Bump) -> ParseResult<ReplyBytes<'a>> {
    if data.len() < INLINE_CAPACITY {
        return Ok(ReplyBytes::inline(data));
    }
    let block = alloc_bytes(arena, data.len())?;
    block[..data.len()].copy_from_slice(data);
    Ok(ReplyBytes::from_arena(block))
}

/// Helper function to parse a single reply from a complete byte slice.
///
/// Returns the reply and the number of bytes it occupied, or `Ok(None)` if
/// `input` ends before the reply does. `input` itself is never modified, so
/// an incomplete attempt can simply be repeated with a longer slice.
pub fn parse_reply<'a>(input: &[u8], arena: &'a Bump) -> ParseResult<Option<(Reply<'a>, usize)>> {
    let mut buf = BytesMut::from(input);
    let mut reply = Reply::new();
    match ReplyParser::new().advance(&mut reply, &mut buf, arena)? {
        Progress::Complete => Ok(Some((reply, input.len() - buf.len()))),
        Progress::Incomplete => Ok(None),
    }
}

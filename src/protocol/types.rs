//! Redis Reply Value Model
//!
//! This module defines the value a decoded RESP reply is stored in.
//! A [`Reply`] is a plain sum type, but its variable-length payloads are not
//! owned by the node itself:
//!
//! - Byte strings shorter than [`INLINE_CAPACITY`] live inside the node.
//! - Longer byte strings and the element block of an array are borrowed from
//!   a `bumpalo::Bump` arena. The `'a` lifetime ties every reply to that
//!   arena, so a reply tree can never outlive the memory it points into.
//!
//! ## Protocol Format
//!
//! Each RESP reply starts with a type prefix byte:
//! - `+` Status
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String (`$-1` is nil)
//! - `*` Array (`*-1` is nil, `*0` is the empty array)
//!
//! All headers are terminated with CRLF (`\r\n`).

use std::ffi::CStr;
use std::fmt;
use thiserror::Error;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// RESP protocol type prefixes
pub mod prefix {
    pub const STATUS: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// Byte strings strictly shorter than this are stored inline.
///
/// The inline buffer is exactly this size, so the longest inline string
/// still leaves room for its NUL sentinel.
pub const INLINE_CAPACITY: usize = 15;

/// The kind of a [`Reply`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplyType {
    String,
    Array,
    Integer,
    Nil,
    Status,
    Error,
    /// Not yet started decoding.
    Uninitialized,
}

impl ReplyType {
    /// Returns the lowercase name of this reply type.
    pub fn as_str(self) -> &'static str {
        match self {
            ReplyType::String => "string",
            ReplyType::Array => "array",
            ReplyType::Integer => "integer",
            ReplyType::Nil => "nil",
            ReplyType::Status => "status",
            ReplyType::Error => "error",
            ReplyType::Uninitialized => "uninitialized",
        }
    }
}

/// Misuse of a [`Reply`] accessor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The accessor does not apply to this variant
    #[error("wrong reply type: expected {expected}, found {actual}")]
    WrongType {
        expected: &'static str,
        actual: ReplyType,
    },

    /// Array index past the element count
    #[error("index {index} out of bounds for array of {len} elements")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The reply (or one of its elements) is still being decoded
    #[error("reply is not fully decoded")]
    Incomplete,

    /// String payload is not UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Payload of a string, status or error reply.
///
/// Consumers only see the bytes; whether they sit inline or in the arena is
/// decided by length alone. Both storages keep a NUL byte right after the
/// payload so the data can also be handed out as a C string.
#[derive(Clone, Copy)]
pub struct ReplyBytes<'a> {
    repr: Repr<'a>,
}

#[derive(Clone, Copy)]
enum Repr<'a> {
    Inline { len: u8, buf: [u8; INLINE_CAPACITY] },
    /// Payload followed by the NUL sentinel.
    Arena(&'a [u8]),
}

impl<'a> ReplyBytes<'a> {
    /// Wraps an inline buffer whose first `len` bytes are the payload.
    ///
    /// Every byte from `len` on must be zero.
    pub(crate) fn from_inline(buf: [u8; INLINE_CAPACITY], len: usize) -> Self {
        debug_assert!(len < INLINE_CAPACITY);
        debug_assert!(buf[len..].iter().all(|&b| b == 0));
        Self {
            repr: Repr::Inline {
                len: len as u8,
                buf,
            },
        }
    }

    /// Copies a short payload into inline storage.
    pub(crate) fn inline(data: &[u8]) -> Self {
        let mut buf = [0u8; INLINE_CAPACITY];
        buf[..data.len()].copy_from_slice(data);
        Self::from_inline(buf, data.len())
    }

    /// Wraps an arena block holding the payload and its trailing NUL.
    pub(crate) fn from_arena(block: &'a [u8]) -> Self {
        debug_assert_eq!(block.last(), Some(&0));
        Self {
            repr: Repr::Arena(block),
        }
    }

    /// Number of payload bytes (the sentinel is not counted).
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Inline { len, .. } => *len as usize,
            Repr::Arena(block) => block.len() - 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        let with_nul = self.as_bytes_with_nul();
        &with_nul[..with_nul.len() - 1]
    }

    /// The payload bytes followed by the NUL sentinel.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        match &self.repr {
            Repr::Inline { len, buf } => &buf[..*len as usize + 1],
            Repr::Arena(block) => block,
        }
    }

    /// The payload as a C string, cut at the first NUL byte.
    ///
    /// Binary payloads containing NUL are truncated, as any C consumer
    /// would see them.
    pub fn as_c_str(&self) -> &CStr {
        CStr::from_bytes_until_nul(self.as_bytes_with_nul()).unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) fn is_inline(&self) -> bool {
        matches!(self.repr, Repr::Inline { .. })
    }
}

impl PartialEq for ReplyBytes<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for ReplyBytes<'_> {}

impl fmt::Debug for ReplyBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b\"{}\"", self.as_bytes().escape_ascii())
    }
}

/// Elements of an array reply.
///
/// The element block is allocated once, from the arena, when the array
/// header is decoded; its length never changes afterwards.
#[derive(Debug)]
pub struct ReplyArray<'a> {
    pub(crate) elements: &'a mut [Reply<'a>],
    /// Index of the first element that is not fully decoded yet,
    /// `None` once every element is complete.
    pub(crate) resume_at: Option<usize>,
}

impl<'a> ReplyArray<'a> {
    /// An empty array. Needs no arena memory.
    pub(crate) fn empty() -> Self {
        Self {
            elements: Default::default(),
            resume_at: None,
        }
    }

    /// A freshly allocated, non-empty block of `Uninitialized` elements.
    pub(crate) fn suspended(elements: &'a mut [Reply<'a>]) -> Self {
        debug_assert!(!elements.is_empty());
        Self {
            elements,
            resume_at: Some(0),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether decoding stopped inside this array.
    pub fn is_suspended(&self) -> bool {
        self.resume_at.is_some()
    }

    pub fn as_slice(&self) -> &[Reply<'a>] {
        self.elements
    }

    pub fn get(&self, index: usize) -> Option<&Reply<'a>> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Reply<'a>> {
        self.elements.iter()
    }
}

impl PartialEq for ReplyArray<'_> {
    fn eq(&self, other: &Self) -> bool {
        *self.elements == *other.elements
    }
}

/// A decoded (or partially decoded) Redis reply.
///
/// Fresh replies are [`Reply::Uninitialized`]. Only the decoder moves a reply
/// to one of the other variants; the payload types cannot be built outside
/// this crate.
#[derive(Debug, Default, PartialEq)]
pub enum Reply<'a> {
    /// No byte of this reply has been decoded yet
    #[default]
    Uninitialized,

    /// Bulk string: `$<length>\r\n<data>\r\n`
    String(ReplyBytes<'a>),

    /// Array of replies: `*<count>\r\n<element1><element2>...`
    Array(ReplyArray<'a>),

    /// 64-bit signed integer: `:<integer>\r\n`
    Integer(i64),

    /// Nil bulk string or nil array
    Nil,

    /// Status line: `+<text>\r\n`
    Status(ReplyBytes<'a>),

    /// Error line: `-<text>\r\n`
    Error(ReplyBytes<'a>),
}

impl<'a> Reply<'a> {
    /// Creates an `Uninitialized` reply, ready to be decoded into.
    pub fn new() -> Self {
        Reply::Uninitialized
    }

    pub fn reply_type(&self) -> ReplyType {
        match self {
            Reply::Uninitialized => ReplyType::Uninitialized,
            Reply::String(_) => ReplyType::String,
            Reply::Array(_) => ReplyType::Array,
            Reply::Integer(_) => ReplyType::Integer,
            Reply::Nil => ReplyType::Nil,
            Reply::Status(_) => ReplyType::Status,
            Reply::Error(_) => ReplyType::Error,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Reply::Uninitialized)
    }

    /// Returns true once this reply and everything below it is decoded.
    pub fn is_complete(&self) -> bool {
        match self {
            Reply::Uninitialized => false,
            Reply::Array(array) => !array.is_suspended(),
            _ => true,
        }
    }

    /// The value of an integer reply.
    pub fn integer(&self) -> Result<i64, AccessError> {
        match self {
            Reply::Integer(n) => Ok(*n),
            other => Err(other.wrong_type("integer")),
        }
    }

    /// The payload of a string, status or error reply.
    pub fn data(&self) -> Result<&[u8], AccessError> {
        self.reply_bytes().map(ReplyBytes::as_bytes)
    }

    /// The payload of a string, status or error reply as UTF-8.
    pub fn as_str(&self) -> Result<&str, AccessError> {
        Ok(std::str::from_utf8(self.data()?)?)
    }

    /// The payload of a string, status or error reply as a C string.
    pub fn c_str(&self) -> Result<&CStr, AccessError> {
        self.reply_bytes().map(ReplyBytes::as_c_str)
    }

    /// Element count for arrays, payload length for strings, 0 otherwise.
    pub fn len(&self) -> usize {
        match self {
            Reply::String(s) | Reply::Status(s) | Reply::Error(s) => s.len(),
            Reply::Array(array) => array.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements of an array reply.
    pub fn elements(&self) -> Result<&[Reply<'a>], AccessError> {
        match self {
            Reply::Array(array) => Ok(array.as_slice()),
            other => Err(other.wrong_type("array")),
        }
    }

    /// The element at `index` of an array reply.
    pub fn element(&self, index: usize) -> Result<&Reply<'a>, AccessError> {
        let elements = self.elements()?;
        elements.get(index).ok_or(AccessError::IndexOutOfBounds {
            index,
            len: elements.len(),
        })
    }

    fn reply_bytes(&self) -> Result<&ReplyBytes<'a>, AccessError> {
        match self {
            Reply::String(s) | Reply::Status(s) | Reply::Error(s) => Ok(s),
            other => Err(other.wrong_type("string, status or error")),
        }
    }

    fn wrong_type(&self, expected: &'static str) -> AccessError {
        AccessError::WrongType {
            expected,
            actual: self.reply_type(),
        }
    }
}

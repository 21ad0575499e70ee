//! # FlashRESP - A Resumable Redis Reply Decoder
//!
//! FlashRESP decodes Redis Serialization Protocol (RESP) replies from a byte
//! stream that may arrive in arbitrary fragments. It never needs the whole
//! reply up front: each call makes as much progress as the buffered bytes
//! allow and the next call continues exactly where the last one stopped.
//!
//! ## Features
//!
//! - **Resumable**: Partial input is a normal outcome, not an error
//! - **Arena-Backed**: Long strings and array elements are bump-allocated;
//!   the borrow checker guarantees no reply outlives its arena
//! - **Inline Small Strings**: Payloads under 15 bytes need no allocation
//! - **Strict Error Split**: "need more bytes" and "invalid RESP" are
//!   distinct outcomes, so callers never retry malformed input forever
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             FlashRESP                               │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────────────┐  │
//! │  │ AsyncRead   │───>│ ReplyReader │───>│      ReplyParser        │  │
//! │  │ (socket)    │    │ (BytesMut)  │    │  advance(reply, bytes)  │  │
//! │  └─────────────┘    └─────────────┘    └────────────┬────────────┘  │
//! │                                                     │               │
//! │                                                     ▼               │
//! │  ┌─────────────┐    ┌──────────────────────────────────────────┐    │
//! │  │  Renderer   │<───│               Reply<'arena>              │    │
//! │  │ (Display)   │    │  inline bytes │ arena bytes │ arena array│    │
//! │  └─────────────┘    └──────────────────────────────────────────┘    │
//! │                                           ▲                         │
//! │                                           │                         │
//! │                          ┌────────────────┴─────────────────┐       │
//! │                          │        bumpalo::Bump arena       │       │
//! │                          └──────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use bytes::BytesMut;
//! use flashresp::{Progress, Reply, ReplyParser};
//!
//! let arena = Bump::new();
//! let parser = ReplyParser::new();
//! let mut reply = Reply::new();
//! let mut buffer = BytesMut::new();
//!
//! for fragment in [&b"*2\r\n:1"[..], &b"\r\n$5\r\nhel"[..], &b"lo\r\n"[..]] {
//!     buffer.extend_from_slice(fragment);
//!     if parser.advance(&mut reply, &mut buffer, &arena)? == Progress::Complete {
//!         break;
//!     }
//! }
//!
//! assert_eq!(reply.to_string(), r#"[(integer) 1, "hello"]"#);
//! # Ok::<(), flashresp::ParseError>(())
//! ```
//!
//! ## Supported Replies
//!
//! | Prefix | Reply | Grammar |
//! |---|---|---|
//! | `+` | Status | `+<text>\r\n` |
//! | `-` | Error | `-<text>\r\n` |
//! | `:` | Integer | `:<signed 64-bit decimal>\r\n` |
//! | `$` | Bulk string / nil | `$<len>\r\n<bytes>\r\n`, `$-1\r\n` |
//! | `*` | Array / nil | `*<count>\r\n<replies>`, `*-1\r\n` |
//!
//! ## Module Overview
//!
//! - [`protocol`]: Reply model, resumable decoder, renderer
//! - [`stream`]: Async read loop driving the decoder
//!
//! ## Design Highlights
//!
//! ### Progress Lives in the Reply
//!
//! An array whose elements are not all buffered yet remembers the index of
//! its first unfinished element. Its header and finished elements are never
//! parsed twice.
//!
//! ### Backing Off Without Side Effects
//!
//! A status line, integer or bulk string that is not fully buffered is left
//! untouched in the byte source. Only array headers and completed elements
//! are consumed ahead of the reply's completion.

pub mod protocol;
pub mod stream;

// Re-export commonly used types for convenience
pub use protocol::{
    parse_reply, OwnedReply, ParseError, ParserConfig, Progress, Reply, ReplyParser, ReplyType,
};
pub use stream::{ReaderConfig, ReaderError, ReaderStats, ReplyReader};

/// Version of FlashRESP
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

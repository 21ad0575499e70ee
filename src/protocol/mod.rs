//! RESP Reply Decoding
//!
//! This module decodes Redis Serialization Protocol (RESP) replies that may
//! arrive in arbitrary fragments.
//!
//! ## Overview
//!
//! A caller keeps a [`Reply`] and a byte buffer for as long as one reply is
//! in flight. Each time more bytes arrive it calls
//! [`ReplyParser::advance`], which either completes the reply or reports
//! [`Progress::Incomplete`] and records where to continue.
//!
//! ## Modules
//!
//! - `types`: The `Reply` value model and its accessors
//! - `source`: The `ByteSource` queue the decoder reads from
//! - `parser`: The resumable decoder
//! - `render`: `redis-cli` style rendering
//! - `owned`: Arena-independent replies and RESP serialization
//!
//! ## Example
//!
//! ```
//! use bumpalo::Bump;
//! use flashresp::protocol::parse_reply;
//!
//! let arena = Bump::new();
//! let (reply, consumed) = parse_reply(b"-ERR wrong type\r\n", &arena)?.unwrap();
//!
//! assert_eq!(consumed, 17);
//! assert!(reply.is_error());
//! assert_eq!(reply.to_string(), "(error) ERR wrong type");
//! # Ok::<(), flashresp::protocol::ParseError>(())
//! ```

pub mod owned;
pub mod parser;
pub mod render;
pub mod source;
pub mod types;

// Re-export commonly used types for convenience
pub use owned::OwnedReply;
pub use parser::{parse_reply, ParseError, ParseResult, ParserConfig, Progress, ReplyParser};
pub use render::write_escaped;
pub use source::ByteSource;
pub use types::{AccessError, Reply, ReplyArray, ReplyBytes, ReplyType};

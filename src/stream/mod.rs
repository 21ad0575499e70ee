//! Async Reply Streams
//!
//! The decoder in [`crate::protocol`] only reports that a reply is
//! incomplete; something has to fetch more bytes and call it again. This
//! module provides that loop for any `tokio::io::AsyncRead`.
//!
//! ## Features
//!
//! - **Resumption**: A reply split across reads is decoded without re-parsing
//! - **Pipelining**: Replies that arrive together are returned one by one
//!   without further reads
//! - **Bounded Buffering**: The read buffer has a configurable size limit
//! - **Statistics**: Tracks reads, bytes and decoded replies
//!
//! ## Example
//!
//! ```ignore
//! use bumpalo::Bump;
//! use flashresp::stream::ReplyReader;
//! use tokio::net::TcpStream;
//!
//! let stream = TcpStream::connect("127.0.0.1:6379").await?;
//! let mut reader = ReplyReader::new(stream);
//! let mut arena = Bump::new();
//!
//! while let Some(reply) = reader.read_reply(&arena).await? {
//!     println!("{reply}");
//!     drop(reply);
//!     arena.reset();
//! }
//! ```

pub mod reader;

// Re-export commonly used types
pub use reader::{ReaderConfig, ReaderError, ReaderStats, ReplyReader};

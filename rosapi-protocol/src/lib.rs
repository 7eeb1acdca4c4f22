//! # rosapi-protocol
//!
//! Wire protocol implementation for the RouterOS API service.
//!
//! This crate provides:
//! - Variable-length word framing (1-5 byte self-describing length prefix)
//! - Sentence encoding and a buffered streaming decoder
//! - Reply assembly (`!re` rows plus the `!done`/`!trap`/`!fatal` trailer)
//! - Command sentence construction for the query direction
//!
//! Everything here is sans-I/O: encoding produces byte buffers, decoding
//! consumes them. Socket handling lives in `rosapi-client`.

pub mod codec;
pub mod command;
pub mod error;
pub mod length;
pub mod reply;
pub mod word;

pub use codec::{Decoder, Encoder};
pub use command::Command;
pub use error::ProtocolError;
pub use reply::{ParsedReply, ReplyBuilder, ReplyKind, ReplyWord};

/// Default port for the plaintext API service.
pub const DEFAULT_PORT: u16 = 8728;

/// Default port for the TLS-wrapped API service.
pub const DEFAULT_TLS_PORT: u16 = 8729;

/// Maximum encodable word length. Longer words cannot be framed.
pub const MAX_WORD_LEN: u32 = u32::MAX;

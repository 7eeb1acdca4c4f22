//! Protocol error types.

use thiserror::Error;

/// Protocol-level errors that can occur during framing or reply handling.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The first byte of a length prefix is not one of the documented
    /// forms (`11110000` is the only legal byte with five leading ones
    /// or more).
    #[error("invalid length prefix byte {0:#04x}")]
    InvalidLengthPrefix(u8),

    /// A word exceeds the largest length the prefix can express.
    #[error("word too large: {size} bytes (max {max})")]
    WordTooLarge { size: u64, max: u32 },

    /// The peer closed the stream in the middle of a frame.
    #[error("stream ended mid-frame with {buffered} bytes pending")]
    UnexpectedEof { buffered: usize },
}

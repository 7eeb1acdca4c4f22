//! Client error types.

use crate::config::ConfigError;
use rosapi_protocol::ProtocolError;
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("not connected")]
    NotConnected,

    #[error("connection closed by server")]
    ConnectionClosed,

    #[error("operation timed out")]
    Timeout,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The server rejected the login (`!trap` or `!fatal` during the
    /// handshake).
    #[error("login denied: {message}")]
    AuthDenied { message: String },

    /// The legacy login challenge was not 16 hex-encoded bytes.
    #[error("malformed login challenge: {0}")]
    MalformedChallenge(String),

    /// The reply had a shape the current exchange does not allow.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),

    /// The server sent `!fatal`; the connection has been closed.
    #[error("fatal reply from server: {reason}")]
    ServerFatal { reason: String },

    /// Every connect cycle failed; carries the final failure.
    #[error("all {attempts} connection attempts failed: {last}")]
    ConnectionFailed { attempts: u32, last: Box<ClientError> },

    /// Caller-side contract violation, e.g. issuing a second request
    /// before consuming the previous reply.
    #[error("protocol misuse: {0}")]
    Misuse(&'static str),
}

//! The two-mode login handshake.
//!
//! Current servers (6.43 and later) take the credentials in the first
//! sentence. Older servers hand out a 16-byte challenge and expect
//! `MD5(0x00 || password || challenge)` back; the `legacy` config flag
//! selects that mode.

use crate::config::Config;
use crate::connection::Connection;
use crate::error::ClientError;
use md5::{Digest, Md5};
use rosapi_protocol::reply::{ParsedReply, ReplyKind};

/// Drives the configured handshake on a freshly opened connection.
pub(crate) async fn login(conn: &mut Connection, config: &Config) -> Result<(), ClientError> {
    if config.legacy {
        legacy_login(conn, config).await
    } else {
        plain_login(conn, config).await
    }
}

/// One round trip: credentials in the clear, `!done` on success.
async fn plain_login(conn: &mut Connection, config: &Config) -> Result<(), ClientError> {
    tracing::debug!(user = %config.user, "plain login");
    conn.write_sentence([
        "/login".to_string(),
        format!("=name={}", config.user),
        format!("=password={}", config.pass),
    ])
    .await?;

    let reply = conn.read_reply().await?;
    check_denied(&reply)?;

    if reply.trailer.contains_key("ret") {
        // A challenge in response to plain credentials means the server
        // ignored them; it only speaks the old handshake.
        return Err(ClientError::UnexpectedReply(
            "server answered with a challenge; enable legacy login".to_string(),
        ));
    }
    Ok(())
}

/// Two round trips: fetch the challenge, answer with the MD5 digest.
async fn legacy_login(conn: &mut Connection, config: &Config) -> Result<(), ClientError> {
    tracing::debug!(user = %config.user, "legacy challenge/response login");
    conn.write_sentence(["/login"]).await?;

    let reply = conn.read_reply().await?;
    check_denied(&reply)?;
    let challenge = challenge_from(&reply)?;

    conn.write_sentence([
        "/login".to_string(),
        format!("=name={}", config.user),
        format!(
            "=response=00{}",
            challenge_digest(&config.pass, &challenge)
        ),
    ])
    .await?;

    check_denied(&conn.read_reply().await?)
}

/// `MD5(0x00 || password || challenge)` as 32 lowercase hex characters.
pub fn challenge_digest(password: &str, challenge: &[u8; 16]) -> String {
    let mut hasher = Md5::new();
    hasher.update([0u8]);
    hasher.update(password.as_bytes());
    hasher.update(challenge);
    hex::encode(hasher.finalize())
}

/// Extracts and decodes the `ret` challenge from a login reply.
fn challenge_from(reply: &ParsedReply) -> Result<[u8; 16], ClientError> {
    let ret = reply.trailer.get("ret").ok_or_else(|| {
        ClientError::UnexpectedReply("login reply carried no challenge".to_string())
    })?;

    if ret.len() != 32 {
        return Err(ClientError::MalformedChallenge(format!(
            "expected 32 hex characters, got {}",
            ret.len()
        )));
    }
    let bytes =
        hex::decode(ret).map_err(|e| ClientError::MalformedChallenge(e.to_string()))?;

    let mut challenge = [0u8; 16];
    challenge.copy_from_slice(&bytes);
    Ok(challenge)
}

/// Any `!trap` or `!fatal` during the handshake is a login denial.
fn check_denied(reply: &ParsedReply) -> Result<(), ClientError> {
    match reply.kind {
        ReplyKind::Done => Ok(()),
        ReplyKind::Trap | ReplyKind::Fatal => Err(ClientError::AuthDenied {
            message: reply
                .message()
                .unwrap_or("login rejected")
                .to_string(),
        }),
    }
}

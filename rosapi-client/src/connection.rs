//! Connection management: transport open/close and framed sentence I/O.

use crate::config::Config;
use crate::error::ClientError;
use crate::stream::ClientStream;
use crate::tls;
use rosapi_protocol::codec::{Decoder, Encoder};
use rosapi_protocol::reply::{ParsedReply, ReplyBuilder};
use rosapi_protocol::ProtocolError;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Read buffer size for socket reads (8 KiB).
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// One open transport to a device, with framing on top.
///
/// The connection is exclusively owned; all I/O is sequential. Any
/// transport or protocol failure tears the connection down, after which
/// operations fail with [`ClientError::NotConnected`].
#[derive(Debug)]
pub struct Connection {
    stream: Option<ClientStream>,
    decoder: Decoder,
    /// Deadline applied to connect and to each read/write operation.
    timeout: Duration,
    buf: Vec<u8>,
}

impl Connection {
    /// Opens the transport: TCP connect, then the TLS handshake when
    /// `ssl` is configured. Bounded by the configured timeout.
    pub async fn open(config: &Config) -> Result<Self, ClientError> {
        tracing::debug!(host = %config.host, port = config.port, ssl = config.ssl, "connecting");

        let tcp = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(ClientError::Io)?;

        tcp.set_nodelay(true).ok();

        let stream = if config.ssl {
            let (connector, server_name) = tls::connector(&config.tls, &config.host)?;
            tracing::debug!("performing TLS handshake");
            let tls_stream =
                tokio::time::timeout(config.timeout, connector.connect(server_name, tcp))
                    .await
                    .map_err(|_| ClientError::Timeout)?
                    .map_err(|e| ClientError::TlsHandshake(e.to_string()))?;
            ClientStream::Tls(Box::new(tls_stream))
        } else {
            ClientStream::Plain(tcp)
        };

        tracing::debug!("transport open");
        Ok(Self {
            stream: Some(stream),
            decoder: Decoder::new(),
            timeout: config.timeout,
            buf: vec![0u8; READ_BUFFER_SIZE],
        })
    }

    /// Returns whether the transport is open.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Writes one sentence: every word in order, then the empty
    /// terminator word.
    pub async fn write_sentence<I, W>(&mut self, words: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        let encoded = Encoder::encode_sentence(words)?;
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let result = tokio::time::timeout(self.timeout, async {
            stream.write_all(&encoded).await?;
            stream.flush().await
        })
        .await;

        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                self.teardown();
                Err(ClientError::Io(e))
            }
            Err(_) => {
                self.teardown();
                Err(ClientError::Timeout)
            }
        }
    }

    /// Reads sentences until the terminating `!done` or `!fatal`
    /// completes the reply.
    pub async fn read_reply(&mut self) -> Result<ParsedReply, ClientError> {
        let mut builder = ReplyBuilder::new();
        loop {
            match self.decoder.decode_sentence() {
                Ok(Some(sentence)) => {
                    if let Some(reply) = builder.push_sentence(&sentence) {
                        return Ok(reply);
                    }
                }
                Ok(None) => {
                    if let Err(e) = self.fill_buffer().await {
                        self.teardown();
                        return Err(e);
                    }
                }
                Err(e) => {
                    self.teardown();
                    return Err(e.into());
                }
            }
        }
    }

    /// Reads more transport bytes into the decoder.
    async fn fill_buffer(&mut self) -> Result<(), ClientError> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let n = tokio::time::timeout(self.timeout, stream.read(&mut self.buf))
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(ClientError::Io)?;

        if n == 0 {
            return Err(if self.decoder.mid_frame() {
                ProtocolError::UnexpectedEof {
                    buffered: self.decoder.buffered(),
                }
                .into()
            } else {
                ClientError::ConnectionClosed
            });
        }

        self.decoder.extend(&self.buf[..n]);
        Ok(())
    }

    /// Drops the transport without a graceful shutdown. Used on failure
    /// paths where the stream state is no longer trustworthy.
    fn teardown(&mut self) {
        self.stream = None;
        self.decoder.clear();
    }

    /// Shuts the transport down. Idempotent.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            tracing::debug!("closing connection");
            let _ = stream.shutdown().await;
        }
        self.decoder.clear();
    }
}

//! High-level client: bounded-retry connect and request/reply exchange.

use crate::config::Config;
use crate::connection::Connection;
use crate::error::ClientError;
use crate::login;
use rosapi_protocol::command::Command;
use rosapi_protocol::reply::{ParsedReply, ReplyKind};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Disconnected,
    /// Transport being opened.
    Opening,
    /// Transport open, handshake in progress.
    LoggingIn,
    /// Logged in, no request in flight.
    Ready,
    /// A request has been written and its reply not yet consumed.
    AwaitingReply,
    Closing,
}

/// A logged-in session with one device.
///
/// The exchange is strictly sequential: one request in flight, replies
/// consumed in order. Callers wanting parallelism own multiple clients.
pub struct Client {
    config: Config,
    conn: Option<Connection>,
    state: State,
}

impl Client {
    /// Creates a client from a validated configuration. No I/O happens
    /// until [`connect`](Client::connect).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            conn: None,
            state: State::Disconnected,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == State::Ready
    }

    /// Connects and logs in, driving up to `attempts` cycles of
    /// open-transport → login. Each failed cycle closes the transport and
    /// sleeps `delay` before the next try.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if self.state != State::Disconnected {
            return Err(ClientError::Misuse("connect on an already-connected client"));
        }

        let attempts = self.config.attempts;
        let mut last = None;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tracing::debug!(delay = ?self.config.delay, "sleeping before retry");
                tokio::time::sleep(self.config.delay).await;
            }

            tracing::debug!(attempt, attempts, "starting connection cycle");
            match self.try_connect().await {
                Ok(()) => {
                    self.state = State::Ready;
                    tracing::debug!("login complete, session ready");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "connection cycle failed");
                    last = Some(e);
                }
            }
        }

        Err(ClientError::ConnectionFailed {
            attempts,
            last: Box::new(last.unwrap_or(ClientError::NotConnected)),
        })
    }

    /// One open → login cycle. The transport is closed on every failure
    /// path.
    async fn try_connect(&mut self) -> Result<(), ClientError> {
        self.state = State::Opening;
        let mut conn = match Connection::open(&self.config).await {
            Ok(conn) => conn,
            Err(e) => {
                self.state = State::Disconnected;
                return Err(e);
            }
        };

        self.state = State::LoggingIn;
        if let Err(e) = login::login(&mut conn, &self.config).await {
            conn.close().await;
            self.state = State::Disconnected;
            return Err(e);
        }

        self.conn = Some(conn);
        Ok(())
    }

    /// Writes a command sentence. The previous reply must have been
    /// consumed first.
    pub async fn send(&mut self, command: &Command) -> Result<(), ClientError> {
        match self.state {
            State::Ready => {}
            State::AwaitingReply => {
                return Err(ClientError::Misuse(
                    "a reply is pending; read it before sending another request",
                ))
            }
            _ => return Err(ClientError::NotConnected),
        }
        if !command.is_well_formed() {
            return Err(ClientError::Misuse("command word must begin with '/'"));
        }

        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
        match conn.write_sentence(command.words()).await {
            Ok(()) => {
                self.state = State::AwaitingReply;
                Ok(())
            }
            Err(e) => {
                self.drop_connection();
                Err(e)
            }
        }
    }

    /// Reads the reply to the in-flight request.
    ///
    /// A `!trap` reply is returned as an ordinary [`ParsedReply`] so the
    /// caller can inspect `trailer["message"]`; the session stays usable.
    /// A `!fatal` reply closes the connection and surfaces its reason.
    pub async fn read_reply(&mut self) -> Result<ParsedReply, ClientError> {
        match self.state {
            State::AwaitingReply => {}
            State::Ready => return Err(ClientError::Misuse("no request in flight")),
            _ => return Err(ClientError::NotConnected),
        }

        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
        match conn.read_reply().await {
            Ok(reply) if reply.kind == ReplyKind::Fatal => {
                let reason = reply.message().unwrap_or_default().to_string();
                tracing::debug!(%reason, "fatal reply, closing connection");
                self.close().await;
                Err(ClientError::ServerFatal { reason })
            }
            Ok(reply) => {
                self.state = State::Ready;
                Ok(reply)
            }
            Err(e) => {
                self.drop_connection();
                Err(e)
            }
        }
    }

    /// Sends a command and reads its reply.
    pub async fn execute(&mut self, command: &Command) -> Result<ParsedReply, ClientError> {
        self.send(command).await?;
        self.read_reply().await
    }

    /// Closes the session. Idempotent.
    pub async fn close(&mut self) {
        self.state = State::Closing;
        if let Some(mut conn) = self.conn.take() {
            conn.close().await;
        }
        self.state = State::Disconnected;
    }

    /// Failure path: the transport state is no longer trustworthy.
    fn drop_connection(&mut self) {
        self.conn = None;
        self.state = State::Disconnected;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosapi_protocol::codec::{Decoder, Encoder};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn config_for(port: u16) -> Config {
        Config::builder("127.0.0.1")
            .user("admin")
            .password("secret")
            .port(port)
            .attempts(1)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    /// Reads one complete sentence from the socket.
    async fn read_words(sock: &mut TcpStream, decoder: &mut Decoder) -> Vec<String> {
        loop {
            if let Some(sentence) = decoder.decode_sentence().unwrap() {
                return sentence
                    .iter()
                    .map(|w| String::from_utf8_lossy(w).into_owned())
                    .collect();
            }
            let mut buf = [0u8; 1024];
            let n = sock.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed while a sentence was expected");
            decoder.extend(&buf[..n]);
        }
    }

    async fn send_sentences(sock: &mut TcpStream, sentences: &[&[&str]]) {
        for words in sentences {
            let buf = Encoder::encode_sentence(words.iter().copied()).unwrap();
            sock.write_all(&buf).await.unwrap();
        }
    }

    /// Accepts one client and answers the plain login.
    async fn accept_and_login(listener: &TcpListener) -> (TcpStream, Decoder) {
        let (mut sock, _) = listener.accept().await.unwrap();
        let mut decoder = Decoder::new();
        let words = read_words(&mut sock, &mut decoder).await;
        assert_eq!(words[0], "/login");
        send_sentences(&mut sock, &[&["!done"]]).await;
        (sock, decoder)
    }

    #[tokio::test]
    async fn test_plain_login_success() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut decoder = Decoder::new();
            let words = read_words(&mut sock, &mut decoder).await;
            assert_eq!(words, ["/login", "=name=admin", "=password=secret"]);
            send_sentences(&mut sock, &[&["!done"]]).await;
        });

        let mut client = Client::new(config_for(port));
        assert_eq!(client.state(), State::Disconnected);
        client.connect().await.unwrap();
        assert!(client.is_ready());

        server.await.unwrap();
        client.close().await;
        assert_eq!(client.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn test_legacy_login_challenge_response() {
        let (listener, port) = listener().await;

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut decoder = Decoder::new();

            let words = read_words(&mut sock, &mut decoder).await;
            assert_eq!(words, ["/login"]);
            send_sentences(
                &mut sock,
                &[&["!done", "=ret=ebddf7535953c936c93b75502bfb9982"]],
            )
            .await;

            let words = read_words(&mut sock, &mut decoder).await;
            assert_eq!(
                words,
                [
                    "/login",
                    "=name=admin",
                    "=response=00a12b59fef13fcc334c302cd991e0f30c",
                ]
            );
            send_sentences(&mut sock, &[&["!done"]]).await;
        });

        let config = Config::builder("127.0.0.1")
            .user("admin")
            .password("abc")
            .port(port)
            .legacy(true)
            .attempts(1)
            .build()
            .unwrap();

        let mut client = Client::new(config);
        client.connect().await.unwrap();
        assert!(client.is_ready());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_denied() {
        let (listener, port) = listener().await;

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut decoder = Decoder::new();
            read_words(&mut sock, &mut decoder).await;
            send_sentences(
                &mut sock,
                &[&["!trap", "=message=cannot log in"], &["!done"]],
            )
            .await;
        });

        let mut client = Client::new(config_for(port));
        let err = client.connect().await.unwrap_err();
        match err {
            ClientError::ConnectionFailed { attempts, last } => {
                assert_eq!(attempts, 1);
                assert!(matches!(
                    *last,
                    ClientError::AuthDenied { ref message } if message == "cannot log in"
                ));
            }
            other => panic!("expected ConnectionFailed, got {:?}", other),
        }
        assert_eq!(client.state(), State::Disconnected);
    }

    #[tokio::test]
    async fn test_interface_listing_reply() {
        let (listener, port) = listener().await;

        tokio::spawn(async move {
            let (mut sock, mut decoder) = accept_and_login(&listener).await;
            let words = read_words(&mut sock, &mut decoder).await;
            assert_eq!(words, ["/interface/print"]);
            send_sentences(
                &mut sock,
                &[
                    &["!re", "=.id=*1", "=name=ether1"],
                    &["!re", "=name=ether2"],
                    &["!done"],
                ],
            )
            .await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let reply = client
            .execute(&Command::new("/interface/print"))
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Done);
        assert_eq!(reply.rows.len(), 2);
        assert_eq!(reply.rows[0].get(".id").unwrap(), "*1");
        assert_eq!(reply.rows[0].get("name").unwrap(), "ether1");
        assert_eq!(reply.rows[1].get("name").unwrap(), "ether2");
        assert!(reply.trailer.is_empty());
        assert!(client.is_ready());
    }

    #[tokio::test]
    async fn test_trap_reply_keeps_session_usable() {
        let (listener, port) = listener().await;

        tokio::spawn(async move {
            let (mut sock, mut decoder) = accept_and_login(&listener).await;

            read_words(&mut sock, &mut decoder).await;
            send_sentences(
                &mut sock,
                &[
                    &["!trap", "=category=0", "=message=no such item"],
                    &["!done"],
                ],
            )
            .await;

            // The session must still work after the trap.
            let words = read_words(&mut sock, &mut decoder).await;
            assert_eq!(words, ["/system/resource/print"]);
            send_sentences(&mut sock, &[&["!done"]]).await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let reply = client
            .execute(&Command::new("/interface/remove").attribute("numbers", "*9"))
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Trap);
        assert_eq!(reply.trailer.get("category").unwrap(), "0");
        assert_eq!(reply.message(), Some("no such item"));
        assert!(client.is_ready());

        let reply = client
            .execute(&Command::new("/system/resource/print"))
            .await
            .unwrap();
        assert_eq!(reply.kind, ReplyKind::Done);
    }

    #[tokio::test]
    async fn test_fatal_reply_closes_connection() {
        let (listener, port) = listener().await;

        tokio::spawn(async move {
            let (mut sock, mut decoder) = accept_and_login(&listener).await;
            read_words(&mut sock, &mut decoder).await;
            send_sentences(&mut sock, &[&["!fatal", "session terminated"]]).await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let err = client
            .execute(&Command::new("/quit"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::ServerFatal { ref reason } if reason == "session terminated"
        ));
        assert_eq!(client.state(), State::Disconnected);

        let err = client.send(&Command::new("/interface/print")).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_second_send_before_read_is_misuse() {
        let (listener, port) = listener().await;

        tokio::spawn(async move {
            let (mut sock, mut decoder) = accept_and_login(&listener).await;
            // Swallow the command, never reply.
            read_words(&mut sock, &mut decoder).await;
            std::future::pending::<()>().await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        client.send(&Command::new("/interface/print")).await.unwrap();
        assert_eq!(client.state(), State::AwaitingReply);

        let err = client.send(&Command::new("/interface/print")).await.unwrap_err();
        assert!(matches!(err, ClientError::Misuse(_)));
    }

    #[tokio::test]
    async fn test_read_without_request_is_misuse() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (_sock, _decoder) = accept_and_login(&listener).await;
            std::future::pending::<()>().await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let err = client.read_reply().await.unwrap_err();
        assert!(matches!(err, ClientError::Misuse(_)));
    }

    #[tokio::test]
    async fn test_connect_twice_is_misuse() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (_sock, _decoder) = accept_and_login(&listener).await;
            std::future::pending::<()>().await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::Misuse(_)));
    }

    #[tokio::test]
    async fn test_malformed_command_rejected() {
        let (listener, port) = listener().await;
        tokio::spawn(async move {
            let (_sock, _decoder) = accept_and_login(&listener).await;
            std::future::pending::<()>().await;
        });

        let mut client = Client::new(config_for(port));
        client.connect().await.unwrap();

        let err = client.send(&Command::new("interface/print")).await.unwrap_err();
        assert!(matches!(err, ClientError::Misuse(_)));
        // The rejected send leaves the session ready.
        assert!(client.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_sleeps_between_attempts() {
        // Bind and drop to find a port that refuses connections.
        let (listener, port) = listener().await;
        drop(listener);

        let config = Config::builder("127.0.0.1")
            .user("admin")
            .password("secret")
            .port(port)
            .attempts(3)
            .delay(Duration::from_secs(1))
            .build()
            .unwrap();

        let mut client = Client::new(config);
        let started = tokio::time::Instant::now();
        let err = client.connect().await.unwrap_err();

        match err {
            ClientError::ConnectionFailed { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected ConnectionFailed, got {:?}", other),
        }
        // Two inter-attempt delays of one second each.
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(client.state(), State::Disconnected);
    }
}

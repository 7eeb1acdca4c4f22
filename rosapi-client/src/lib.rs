//! # rosapi-client
//!
//! Client library for the RouterOS API service (port 8728 plaintext,
//! 8729 TLS).
//!
//! This crate provides:
//! - Typed, validated connection configuration
//! - Plain and TLS transports (verification on by default)
//! - Both login modes: plain credentials and the pre-6.43 MD5
//!   challenge/response
//! - Bounded-retry connect with explicit connection states
//! - Strict request/reply exchange: one request in flight per connection
//!
//! ```no_run
//! use rosapi_client::{Client, Config};
//! use rosapi_protocol::Command;
//!
//! # async fn run() -> Result<(), rosapi_client::ClientError> {
//! let config = Config::builder("192.168.88.1")
//!     .user("admin")
//!     .password("secret")
//!     .build()?;
//!
//! let mut client = Client::new(config);
//! client.connect().await?;
//!
//! let reply = client.execute(&Command::new("/interface/print")).await?;
//! for row in &reply.rows {
//!     println!("{:?}", row.get("name"));
//! }
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod login;
pub mod stream;
pub mod tls;

pub use client::{Client, State};
pub use config::{Config, ConfigBuilder, ConfigError, TlsOptions};
pub use connection::Connection;
pub use error::ClientError;

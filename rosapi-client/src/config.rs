//! Connection configuration.
//!
//! [`Config`] carries the validated parameters of one device connection.
//! Validation happens once, in [`ConfigBuilder::build`]; the rest of the
//! crate can rely on the invariants (non-empty host and user, `attempts`
//! at least 1, a resolved port).

use rosapi_protocol::{DEFAULT_PORT, DEFAULT_TLS_PORT};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default connect and per-operation deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of connect/login cycles before giving up.
pub const DEFAULT_ATTEMPTS: u32 = 5;

/// Default sleep between failed connect cycles.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

/// TLS options for `ssl` connections.
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Skip server certificate verification entirely (INSECURE).
    ///
    /// Historical API clients disabled verification to talk to the
    /// self-signed certificates devices ship with. Verification is on by
    /// default here; prefer `ca_cert_path` pointing at the device
    /// certificate, and enable this only as a last resort. Use is logged
    /// with a warning.
    pub insecure: bool,
    /// PEM CA bundle used to verify the server. Mozilla roots otherwise.
    pub ca_cert_path: Option<PathBuf>,
    /// Server name for SNI and verification (defaults to `host`).
    pub server_name: Option<String>,
}

/// Validated connection parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Destination address (hostname or IP).
    pub host: String,
    /// Login name.
    pub user: String,
    /// Login password. May be empty; factory-default devices have one.
    pub pass: String,
    /// Destination port, resolved from `ssl` when not set explicitly.
    pub port: u16,
    /// TLS-wrap the transport.
    pub ssl: bool,
    /// Use the pre-6.43 MD5 challenge/response login.
    pub legacy: bool,
    /// Deadline for connect and for each read/write operation.
    pub timeout: Duration,
    /// Total connect/login cycles before giving up. At least 1.
    pub attempts: u32,
    /// Sleep between failed cycles.
    pub delay: Duration,
    /// TLS posture, used when `ssl` is set.
    pub tls: TlsOptions,
}

impl Config {
    /// Starts building a configuration for the given device address.
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    user: Option<String>,
    pass: Option<String>,
    port: Option<u16>,
    ssl: bool,
    legacy: bool,
    timeout: Duration,
    attempts: u32,
    delay: Duration,
    tls: TlsOptions,
}

impl ConfigBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: None,
            pass: None,
            port: None,
            ssl: false,
            legacy: false,
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
            tls: TlsOptions::default(),
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, pass: impl Into<String>) -> Self {
        self.pass = Some(pass.into());
        self
    }

    /// Overrides the port. Defaults to 8728, or 8729 with `ssl`.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Selects the pre-6.43 MD5 challenge/response login.
    pub fn legacy(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Convenience for `TlsOptions { insecure: true, .. }`.
    pub fn insecure_tls(mut self) -> Self {
        self.tls.insecure = true;
        self
    }

    pub fn ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.tls.ca_cert_path = Some(path.into());
        self
    }

    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.tls.server_name = Some(name.into());
        self
    }

    /// Validates and produces the final configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::Invalid {
                field: "host",
                reason: "must not be empty",
            });
        }
        let user = self.user.ok_or(ConfigError::Missing("user"))?;
        if user.is_empty() {
            return Err(ConfigError::Invalid {
                field: "user",
                reason: "must not be empty",
            });
        }
        let pass = self.pass.ok_or(ConfigError::Missing("pass"))?;
        if self.attempts < 1 {
            return Err(ConfigError::Invalid {
                field: "attempts",
                reason: "must be at least 1",
            });
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid {
                field: "timeout",
                reason: "must be non-zero",
            });
        }

        let port = self.port.unwrap_or(if self.ssl {
            DEFAULT_TLS_PORT
        } else {
            DEFAULT_PORT
        });

        Ok(Config {
            host: self.host,
            user,
            pass,
            port,
            ssl: self.ssl,
            legacy: self.legacy,
            timeout: self.timeout,
            attempts: self.attempts,
            delay: self.delay,
            tls: self.tls,
        })
    }
}

/// Configuration error, raised eagerly at build time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required option `{0}`")]
    Missing(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

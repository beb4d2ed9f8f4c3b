//! Static directory connection settings.
//!
//! Settings are loaded once at process start and passed by reference into
//! the directory client; nothing in this crate reads ambient global state.

use crate::Error;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;
use validator::Validate;

/// Default LDAP port (plaintext).
pub const DEFAULT_PORT: u16 = 389;
/// Default connection timeout (seconds).
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default per-operation timeout (seconds).
pub const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

/// Configuration for connecting to the directory server.
///
/// The encryption mode is part of the static configuration, never selected
/// per call. When no service bind DN is configured, read operations use an
/// anonymous bind.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DirectorySettings {
    /// Directory server host name
    #[validate(length(min = 1))]
    pub host: String,

    /// Directory server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Whether to use implicit TLS for the transport
    #[serde(default)]
    pub tls: bool,

    /// Whether to verify the server TLS certificate
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Optional path to a custom CA certificate
    #[serde(default)]
    pub tls_ca_cert: Option<PathBuf>,

    /// Search base distinguished name for person entries
    #[validate(length(min = 1))]
    pub base_dn: String,

    /// Optional service identity used for read binds (anonymous when absent)
    #[serde(default)]
    pub service_bind_dn: Option<String>,

    /// Password for the service identity
    #[serde(default)]
    pub service_bind_password: Option<SecretString>,

    /// Connection establishment timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-operation timeout in seconds
    #[validate(range(min = 1, max = 300))]
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

const fn default_tls_verify() -> bool {
    true
}

const fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

const fn default_operation_timeout_secs() -> u64 {
    DEFAULT_OPERATION_TIMEOUT_SECS
}

impl DirectorySettings {
    /// Creates settings for the given host and search base with defaults for
    /// everything else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if validation fails or the resulting
    /// endpoint is not a valid URL.
    pub fn new(host: impl Into<String>, base_dn: impl Into<String>) -> Result<Self, Error> {
        let settings = Self {
            host: host.into(),
            port: default_port(),
            tls: false,
            tls_verify: default_tls_verify(),
            tls_ca_cert: None,
            base_dn: base_dn.into(),
            service_bind_dn: None,
            service_bind_password: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            operation_timeout_secs: default_operation_timeout_secs(),
        };
        settings.check()?;
        Ok(settings)
    }

    /// Loads settings from a JSON file and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or if
    /// validation fails.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::Config(format!(
                "failed to read settings file {}: {err}",
                path.display()
            ))
        })?;
        let settings: Self = serde_json::from_str(&contents)?;
        settings.check()?;
        Ok(settings)
    }

    fn check(&self) -> Result<(), Error> {
        self.validate()?;
        Url::parse(&self.endpoint())?;
        Ok(())
    }

    /// Returns the directory endpoint URL (`ldap://` or `ldaps://`).
    #[must_use]
    pub fn endpoint(&self) -> String {
        let scheme = if self.tls { "ldaps" } else { "ldap" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Returns the connection establishment timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the per-operation timeout.
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Overrides the port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables or disables implicit TLS.
    #[must_use]
    pub const fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Enables or disables TLS certificate verification.
    #[must_use]
    pub const fn with_tls_verification(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Sets a custom CA certificate path.
    #[must_use]
    pub fn with_tls_ca_cert(mut self, path: PathBuf) -> Self {
        self.tls_ca_cert = Some(path);
        self
    }

    /// Sets the service identity used for read binds.
    #[must_use]
    pub fn with_service_bind(mut self, dn: impl Into<String>, password: SecretString) -> Self {
        self.service_bind_dn = Some(dn.into());
        self.service_bind_password = Some(password);
        self
    }

    /// Overrides the connection timeout in seconds.
    #[must_use]
    pub const fn with_connect_timeout_secs(mut self, seconds: u64) -> Self {
        self.connect_timeout_secs = seconds;
        self
    }

    /// Overrides the per-operation timeout in seconds.
    #[must_use]
    pub const fn with_operation_timeout_secs(mut self, seconds: u64) -> Self {
        self.operation_timeout_secs = seconds;
        self
    }
}

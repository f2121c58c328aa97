//! # Server Configuration Module
//!
//! Provides configuration management for the backup server.
//!
//! ## Overview
//!
//! Configuration is assembled with [`ServerConfigBuilder`] or read from the
//! process environment with [`ServerConfig::from_env`]. Both paths end in
//! [`ServerConfig::validate`], which fails fast with an actionable message
//! when a required value is missing.
//!
//! ## Environment Variables
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `APS_CLIENT_ID` | yes | |
//! | `APS_CLIENT_SECRET` | yes | |
//! | `APS_CALLBACK_URL` | yes | |
//! | `BIND_ADDRESS` | no | `0.0.0.0` |
//! | `PORT` | no | `8080` |
//! | `EXPORT_CALL_TIMEOUT_SECS` | no | `15` |
//! | `EXPORT_STREAM_BUFFER_KB` | no | `64` |
//! | `EXPORT_MAX_DEPTH` | no | `128` |
//! | `LOG_FORMAT` | no | pretty (debug) / json (release) |
//! | `LOG_LEVEL` | no | `info` |
//! | `LOG_FILTER` | no | |
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ServerConfig;
//!
//! let config = ServerConfig::builder()
//!     .client_id("abc")
//!     .client_secret("shh")
//!     .callback_url("http://localhost:8080/api/auth/callback")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};
use bridge_traits::time::LogLevel;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Default bound applied to each remote call during an export.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Default size of the in-memory pipe between archive writer and response body.
pub const DEFAULT_STREAM_BUFFER_KB: usize = 64;

/// Default folder nesting limit for a single project walk.
pub const DEFAULT_MAX_DEPTH: usize = 128;

pub const DEFAULT_PORT: u16 = 8080;

/// OAuth client registration.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("callback_url", &self.callback_url)
            .finish()
    }
}

/// Export pipeline tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    /// Bound for each remote listing call, content open and chunk read.
    pub call_timeout: Duration,
    /// Capacity of the pipe feeding the HTTP response, in KiB.
    pub stream_buffer_kb: usize,
    /// Folder nesting beyond which a subtree is skipped.
    pub max_depth: usize,
    /// File name advertised in `Content-Disposition`.
    pub archive_file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            stream_buffer_kb: DEFAULT_STREAM_BUFFER_KB,
            max_depth: DEFAULT_MAX_DEPTH,
            archive_file_name: "backup.zip".to_string(),
        }
    }
}

/// Complete server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub credentials: ClientCredentials,
    pub export: ExportSettings,
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Creates a new builder for constructing a `ServerConfig`.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = ServerConfig::builder();

        if let Some(v) = get("APS_CLIENT_ID") {
            builder = builder.client_id(v);
        }
        if let Some(v) = get("APS_CLIENT_SECRET") {
            builder = builder.client_secret(v);
        }
        if let Some(v) = get("APS_CALLBACK_URL") {
            builder = builder.callback_url(v);
        }
        if let Some(v) = get("BIND_ADDRESS") {
            let ip: IpAddr = v
                .parse()
                .map_err(|e| Error::Config(format!("BIND_ADDRESS '{}' is invalid: {}", v, e)))?;
            builder = builder.bind_ip(ip);
        }
        if let Some(v) = get("PORT") {
            builder = builder.port(parse_number("PORT", &v)?);
        }
        if let Some(v) = get("EXPORT_CALL_TIMEOUT_SECS") {
            builder = builder.call_timeout(Duration::from_secs(parse_number(
                "EXPORT_CALL_TIMEOUT_SECS",
                &v,
            )?));
        }
        if let Some(v) = get("EXPORT_STREAM_BUFFER_KB") {
            builder = builder.stream_buffer_kb(parse_number("EXPORT_STREAM_BUFFER_KB", &v)?);
        }
        if let Some(v) = get("EXPORT_MAX_DEPTH") {
            builder = builder.max_depth(parse_number("EXPORT_MAX_DEPTH", &v)?);
        }
        if let Some(v) = get("LOG_FORMAT") {
            builder = builder.log_format(v.parse()?);
        }
        if let Some(v) = get("LOG_LEVEL") {
            let level: LogLevel = v
                .parse()
                .map_err(|e| Error::Config(format!("LOG_LEVEL: {}", e)))?;
            builder = builder.log_level(level);
        }
        if let Some(v) = get("LOG_FILTER") {
            builder = builder.log_filter(v);
        }

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.credentials.client_id.is_empty() {
            return Err(Error::Config(
                "APS client id is missing. Set APS_CLIENT_ID.".to_string(),
            ));
        }
        if self.credentials.client_secret.is_empty() {
            return Err(Error::Config(
                "APS client secret is missing. Set APS_CLIENT_SECRET.".to_string(),
            ));
        }
        if self.credentials.callback_url.is_empty() {
            return Err(Error::Config(
                "OAuth callback URL is missing. Set APS_CALLBACK_URL.".to_string(),
            ));
        }
        if !self.credentials.callback_url.starts_with("http://")
            && !self.credentials.callback_url.starts_with("https://")
        {
            return Err(Error::Config(format!(
                "OAuth callback URL '{}' must be an absolute http(s) URL",
                self.credentials.callback_url
            )));
        }
        if self.export.call_timeout.is_zero() {
            return Err(Error::Config(
                "Export call timeout must be greater than 0 seconds".to_string(),
            ));
        }
        if self.export.stream_buffer_kb == 0 || self.export.stream_buffer_kb > 16 * 1024 {
            return Err(Error::Config(
                "Export stream buffer must be between 1 KiB and 16 MiB".to_string(),
            ));
        }
        if self.export.max_depth == 0 {
            return Err(Error::Config(
                "Export max depth must be at least 1".to_string(),
            ));
        }
        if self.export.archive_file_name.is_empty()
            || self.export.archive_file_name.contains(['"', '/', '\\'])
        {
            return Err(Error::Config(format!(
                "Archive file name '{}' is not a plain file name",
                self.export.archive_file_name
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{} '{}' is invalid: {}", key, value, e)))
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    bind_ip: IpAddr,
    port: u16,
    client_id: String,
    client_secret: String,
    callback_url: String,
    export: ExportSettings,
    logging: LoggingConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            client_id: String::new(),
            client_secret: String::new(),
            callback_url: String::new(),
            export: ExportSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ServerConfigBuilder {
    /// Sets the OAuth client id.
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Sets the OAuth client secret.
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = client_secret.into();
        self
    }

    /// Sets the OAuth redirect URL registered for the client.
    pub fn callback_url(mut self, callback_url: impl Into<String>) -> Self {
        self.callback_url = callback_url.into();
        self
    }

    pub fn bind_ip(mut self, ip: IpAddr) -> Self {
        self.bind_ip = ip;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the per-call bound used by the export pipeline.
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.export.call_timeout = timeout;
        self
    }

    pub fn stream_buffer_kb(mut self, kb: usize) -> Self {
        self.export.stream_buffer_kb = kb;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.export.max_depth = depth;
        self
    }

    pub fn archive_file_name(mut self, name: impl Into<String>) -> Self {
        self.export.archive_file_name = name.into();
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.logging = self.logging.with_format(format);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.logging = self.logging.with_level(level);
        self
    }

    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.logging = self.logging.with_filter(filter);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<ServerConfig> {
        let config = ServerConfig {
            listen_addr: SocketAddr::new(self.bind_ip, self.port),
            credentials: ClientCredentials {
                client_id: self.client_id,
                client_secret: self.client_secret,
                callback_url: self.callback_url,
            },
            export: self.export,
            logging: self.logging,
        };
        config.validate()?;
        Ok(config)
    }
}

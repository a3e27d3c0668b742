//! Connection Parameters
//!
//! An immutable description of where and how to connect. Parameters can be
//! built in code, parsed from a URI, or loaded from a TOML table.
//!
//! ```text
//! tcp://127.0.0.1:6379?database=15&timeout=0.5&read_write_timeout=2
//! redis://:secret@10.0.0.5:6380/3
//! unix:///var/run/redis.sock?database=2
//! ```

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::{Host, Url};

/// The default port of a Redis-compatible server
pub const DEFAULT_PORT: u16 = 6379;

/// The default host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default connect-phase timeout in seconds
pub const DEFAULT_TIMEOUT: f64 = 5.0;

/// Errors raised while building or parsing parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParametersError {
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("tcp connections require a host")]
    MissingHost,

    #[error("tcp connections require a non-zero port")]
    InvalidPort,

    #[error("unix connections require a socket path")]
    MissingPath,

    #[error("invalid {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be a non-negative number of seconds, got {value}")]
    InvalidTimeout { name: &'static str, value: f64 },

    #[error("invalid URI: {0}")]
    InvalidUri(String),

    #[error("invalid TOML: {0}")]
    Toml(String),
}

/// Transport selected by the `scheme` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Tcp,
    Unix,
}

impl FromStr for Scheme {
    type Err = ParametersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "redis" => Ok(Scheme::Tcp),
            "unix" => Ok(Scheme::Unix),
            other => Err(ParametersError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Tcp => write!(f, "tcp"),
            Scheme::Unix => write!(f, "unix"),
        }
    }
}

/// Validated, immutable connection parameters.
///
/// Timeouts are stored as durations. A `read_write_timeout` of `None`
/// means reads and writes may block indefinitely.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionParameters {
    scheme: Scheme,
    host: String,
    port: u16,
    path: Option<PathBuf>,
    database: Option<u32>,
    password: Option<String>,
    timeout: Duration,
    read_write_timeout: Option<Duration>,
}

impl ConnectionParameters {
    /// Starts a builder with the default TCP target.
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Parameters for a TCP connection to `host:port` with defaults.
    pub fn tcp(host: impl Into<String>, port: u16) -> Result<Self, ParametersError> {
        Self::builder().host(host).port(port).build()
    }

    /// Parameters for a Unix domain socket at `path` with defaults.
    pub fn unix(path: impl Into<PathBuf>) -> Result<Self, ParametersError> {
        Self::builder().scheme(Scheme::Unix).path(path).build()
    }

    /// Parses parameters from a TOML document.
    ///
    /// ```
    /// use flashkv_client::connection::ConnectionParameters;
    ///
    /// let params = ConnectionParameters::from_toml_str(r#"
    ///     host = "10.0.0.5"
    ///     port = 6380
    ///     database = 15
    ///     timeout = 0.5
    /// "#).unwrap();
    /// assert_eq!(params.port(), 6380);
    /// assert_eq!(params.database(), Some(15));
    /// ```
    pub fn from_toml_str(contents: &str) -> Result<Self, ParametersError> {
        let raw: RawParameters =
            toml::from_str(contents).map_err(|e| ParametersError::Toml(e.to_string()))?;
        raw.into_builder().build()
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn database(&self) -> Option<u32> {
        self.database
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Upper bound on the connect phase.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upper bound on every read or write after connecting.
    pub fn read_write_timeout(&self) -> Option<Duration> {
        self.read_write_timeout
    }

    /// Human-readable address, used in logs and error messages.
    pub fn address(&self) -> String {
        match self.scheme {
            Scheme::Tcp if self.host.contains(':') => format!("[{}]:{}", self.host, self.port),
            Scheme::Tcp => format!("{}:{}", self.host, self.port),
            Scheme::Unix => self
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

impl Default for ConnectionParameters {
    fn default() -> Self {
        Self {
            scheme: Scheme::Tcp,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: None,
            database: None,
            password: None,
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT),
            read_write_timeout: None,
        }
    }
}

impl fmt::Display for ConnectionParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scheme {
            Scheme::Tcp => write!(f, "tcp://{}", self.address()),
            Scheme::Unix => write!(f, "unix://{}", self.address()),
        }
    }
}

impl FromStr for ConnectionParameters {
    type Err = ParametersError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        parse_uri(uri)?.build()
    }
}

/// Builder for [`ConnectionParameters`]. Validation happens in `build`.
#[derive(Debug, Clone, Default)]
pub struct ParametersBuilder {
    scheme: Option<Scheme>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<PathBuf>,
    database: Option<u32>,
    password: Option<String>,
    timeout: Option<f64>,
    read_write_timeout: Option<f64>,
}

impl ParametersBuilder {
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn database(mut self, database: u32) -> Self {
        self.database = Some(database);
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Connect-phase timeout in seconds.
    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    /// Read/write timeout in seconds. Zero disables it.
    ///
    /// The limit covers a whole operation: writing and flushing one request,
    /// or reading one complete reply however many socket reads it takes.
    pub fn read_write_timeout(mut self, seconds: f64) -> Self {
        self.read_write_timeout = Some(seconds);
        self
    }

    pub fn build(self) -> Result<ConnectionParameters, ParametersError> {
        let scheme = self.scheme.unwrap_or_default();

        let timeout = seconds("timeout", self.timeout.unwrap_or(DEFAULT_TIMEOUT))?;

        let read_write_timeout = match self.read_write_timeout {
            Some(secs) => Some(seconds("read_write_timeout", secs)?).filter(|d| !d.is_zero()),
            None => None,
        };

        let host = self.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = self.port.unwrap_or(DEFAULT_PORT);

        match scheme {
            Scheme::Tcp => {
                if host.is_empty() {
                    return Err(ParametersError::MissingHost);
                }
                if port == 0 {
                    return Err(ParametersError::InvalidPort);
                }
            }
            Scheme::Unix => {
                if self.path.as_ref().map_or(true, |p| p.as_os_str().is_empty()) {
                    return Err(ParametersError::MissingPath);
                }
            }
        }

        Ok(ConnectionParameters {
            scheme,
            host,
            port,
            path: self.path,
            database: self.database,
            password: self.password.filter(|p| !p.is_empty()),
            timeout,
            read_write_timeout,
        })
    }
}

/// Rejects negative, non-finite, and out-of-range values.
fn seconds(name: &'static str, value: f64) -> Result<Duration, ParametersError> {
    Duration::try_from_secs_f64(value).map_err(|_| ParametersError::InvalidTimeout { name, value })
}

/// Parameters as they appear in a TOML table.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawParameters {
    #[serde(default)]
    scheme: Option<Scheme>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<PathBuf>,
    database: Option<u32>,
    password: Option<String>,
    timeout: Option<f64>,
    read_write_timeout: Option<f64>,
}

impl RawParameters {
    fn into_builder(self) -> ParametersBuilder {
        ParametersBuilder {
            scheme: self.scheme,
            host: self.host,
            port: self.port,
            path: self.path,
            database: self.database,
            password: self.password,
            timeout: self.timeout,
            read_write_timeout: self.read_write_timeout,
        }
    }
}

/// Reads `scheme://[:password@]host[:port][/db][?key=value&...]` or
/// `unix://path[?key=value&...]`.
fn parse_uri(uri: &str) -> Result<ParametersBuilder, ParametersError> {
    // Bare `host:port` would otherwise parse with `host` as the scheme.
    if !uri.contains("://") {
        return Err(ParametersError::InvalidUri(uri.to_string()));
    }
    let url = Url::parse(uri).map_err(|e| match e {
        url::ParseError::EmptyHost => ParametersError::MissingHost,
        url::ParseError::InvalidPort => ParametersError::InvalidValue {
            name: "port",
            value: uri.to_string(),
        },
        other => ParametersError::InvalidUri(format!("{}: {}", uri, other)),
    })?;

    let scheme: Scheme = url.scheme().parse()?;
    let mut builder = ParametersBuilder::default().scheme(scheme);

    match scheme {
        Scheme::Unix => {
            let path = decode("path", url.path())?;
            if !path.is_empty() {
                builder = builder.path(path);
            }
        }
        Scheme::Tcp => {
            let host = match url.host() {
                Some(Host::Domain(domain)) => decode("host", domain)?,
                Some(Host::Ipv4(addr)) => addr.to_string(),
                Some(Host::Ipv6(addr)) => addr.to_string(),
                None => String::new(),
            };
            builder = builder.host(host);
            if let Some(port) = url.port() {
                builder = builder.port(port);
            }

            if let Some(password) = url.password() {
                builder = builder.password(decode("password", password)?);
            }

            let db = url.path().trim_start_matches('/');
            if !db.is_empty() {
                builder = builder.database(parse_value("database", db)?);
            }
        }
    }

    for (key, value) in url.query_pairs() {
        builder = match key.as_ref() {
            "database" | "db" => builder.database(parse_value("database", &value)?),
            "password" => builder.password(value.into_owned()),
            "timeout" => builder.timeout(parse_value("timeout", &value)?),
            "read_write_timeout" => {
                builder.read_write_timeout(parse_value("read_write_timeout", &value)?)
            }
            // Unknown query keys are tolerated so URIs can carry options
            // meant for other layers.
            _ => builder,
        };
    }

    Ok(builder)
}

fn decode(name: &'static str, raw: &str) -> Result<String, ParametersError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ParametersError::InvalidValue {
            name,
            value: raw.to_string(),
        })
}

fn parse_value<T: FromStr>(name: &'static str, value: &str) -> Result<T, ParametersError> {
    value.parse().map_err(|_| ParametersError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

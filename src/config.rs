//! Stream session configuration
//!
//! Configuration is plain data: build it in code, or load it from YAML.
//!
//! ```rust
//! use depthview::{StreamConfig, ViewMode};
//!
//! let config = StreamConfig::from_yaml_str(
//!     "host: 192.168.1.40\ntoken: abc123\nview_mode: color\n",
//! ).unwrap();
//!
//! assert_eq!(config.view_mode, ViewMode::Color);
//! assert_eq!(
//!     config.endpoint_url().unwrap().as_str(),
//!     "ws://192.168.1.40:8000/v1/ws/depth?token=abc123"
//! );
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::types::ViewMode;
use crate::{Result, StreamError};

/// Default device socket port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default socket path for the depth stream.
pub const DEFAULT_PATH: &str = "/v1/ws/depth";

/// Smallest width the color path will draw at.
pub const MIN_DISPLAY_WIDTH: u32 = 200;

/// A session is online while messages keep arriving within this window.
pub const DEFAULT_LIVENESS_THRESHOLD: Duration = Duration::from_millis(1500);

/// Connection target and display tuning for a stream session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Device host name or address
    pub host: String,
    /// Opaque access token, passed verbatim as a query parameter
    pub token: String,
    pub port: u16,
    pub path: String,
    /// Decoder used for completed cycles until changed at runtime
    pub view_mode: ViewMode,
    /// Width available on the host surface for the color path
    pub display_width: u32,
    pub liveness_threshold_ms: u64,
    pub connect_timeout_ms: u64,
    /// Period of the diagnostic tick; disabled when unset
    pub diagnostic_interval_ms: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            token: String::new(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            view_mode: ViewMode::default(),
            display_width: 640,
            liveness_threshold_ms: DEFAULT_LIVENESS_THRESHOLD.as_millis() as u64,
            connect_timeout_ms: 5000,
            diagnostic_interval_ms: None,
        }
    }
}

impl StreamConfig {
    /// Create a configuration for `host` with the access `token`.
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self { host: host.into(), token: token.into(), ..Self::default() }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_view_mode(mut self, mode: ViewMode) -> Self {
        self.view_mode = mode;
        self
    }

    pub fn with_display_width(mut self, width: u32) -> Self {
        self.display_width = width;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_diagnostic_interval(mut self, interval: Duration) -> Self {
        self.diagnostic_interval_ms = Some(interval.as_millis() as u64);
        self
    }

    /// Parse a YAML document. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| StreamError::Io { path: path.to_path_buf(), source })?;
        Self::from_yaml_str(&text)
    }

    /// Check the preconditions for a connection attempt.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(StreamError::configuration("host", "device host is empty"));
        }
        if self.token.trim().is_empty() {
            return Err(StreamError::configuration("token", "access token is empty"));
        }
        if !self.path.starts_with('/') {
            let reason = format!("'{}' must start with '/'", self.path);
            return Err(StreamError::configuration("path", reason));
        }
        Ok(())
    }

    /// Socket URL: `ws://<host>:<port><path>?token=<token>`, token URL-encoded.
    pub fn endpoint_url(&self) -> Result<Url> {
        self.validate()?;

        let base = format!("ws://{}:{}{}", self.host.trim(), self.port, self.path);
        let mut url = Url::parse(&base).map_err(|e| {
            StreamError::configuration("host", format!("invalid endpoint '{base}': {e}"))
        })?;
        url.query_pairs_mut().append_pair("token", &self.token);
        Ok(url)
    }

    /// Width the color decoder scales to, never below [`MIN_DISPLAY_WIDTH`].
    pub fn target_display_width(&self) -> u32 {
        self.display_width.max(MIN_DISPLAY_WIDTH)
    }

    pub fn liveness_threshold(&self) -> Duration {
        Duration::from_millis(self.liveness_threshold_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn diagnostic_interval(&self) -> Option<Duration> {
        self.diagnostic_interval_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCategory;
    use std::io::Write;

    #[test]
    fn empty_host_or_token_is_a_configuration_error() {
        for (host, token, field) in [("", "t", "host"), ("  ", "t", "host"), ("h", "", "token")] {
            let err = StreamConfig::new(host, token).validate().unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Configuration);
            match err {
                StreamError::Configuration { field: f, .. } => assert_eq!(f, field),
                other => panic!("unexpected error {other:?}"),
            }
        }
    }

    #[test]
    fn endpoint_url_encodes_token() {
        let config = StreamConfig::new("sensor.local", "a b&c=d/é");
        let url = config.endpoint_url().unwrap();

        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.host_str(), Some("sensor.local"));
        assert_eq!(url.port(), Some(8000));
        assert_eq!(url.path(), "/v1/ws/depth");

        let token: Vec<_> = url.query_pairs().filter(|(k, _)| k == "token").collect();
        assert_eq!(token.len(), 1);
        assert_eq!(token[0].1, "a b&c=d/é");
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn endpoint_url_refuses_invalid_config() {
        assert!(StreamConfig::new("", "token").endpoint_url().is_err());
        assert!(StreamConfig::new("bad host name", "token").endpoint_url().is_err());
    }

    #[test]
    fn display_width_has_a_floor() {
        assert_eq!(StreamConfig::default().with_display_width(50).target_display_width(), 200);
        assert_eq!(StreamConfig::default().with_display_width(800).target_display_width(), 800);
    }

    #[test]
    fn yaml_defaults_fill_missing_fields() {
        let config = StreamConfig::from_yaml_str("host: cam\ntoken: t\nport: 9000\n").unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.path, DEFAULT_PATH);
        assert_eq!(config.liveness_threshold(), Duration::from_millis(1500));
        assert_eq!(config.diagnostic_interval(), None);
        assert_eq!(config.view_mode, ViewMode::Depth);
    }

    #[test]
    fn yaml_errors_are_reported() {
        let err = StreamConfig::from_yaml_str("port: [not, a, port]").unwrap_err();
        assert!(matches!(err, StreamError::ConfigParse { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host: cam\ntoken: t\ndiagnostic_interval_ms: 250").unwrap();

        let config = StreamConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.diagnostic_interval(), Some(Duration::from_millis(250)));

        let missing = StreamConfig::from_yaml_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, StreamError::Io { .. }));
    }
}

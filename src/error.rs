//! Error types for depth stream processing.
//!
//! All errors implement `std::error::Error` and carry structured context. Every
//! variant maps onto one of four categories:
//!
//! - **Configuration**: missing host or token. The connection is never attempted.
//! - **Transport**: socket open failures, timeouts and abrupt closes. No automatic retry.
//! - **Framing**: malformed headers or payloads arriving with no pending header.
//!   The message is dropped and the sequencer recovers on the next header.
//! - **Decode**: payloads that cannot be turned into pixels. The previously
//!   rendered frame stays visible.
//!
//! Only configuration errors prevent a session from running:
//!
//! ```rust
//! use depthview::{ErrorCategory, StreamError};
//!
//! let error = StreamError::configuration("token", "access token is empty");
//! assert_eq!(error.category(), ErrorCategory::Configuration);
//! assert!(!error.is_recoverable());
//!
//! let error = StreamError::framing("binary payload without header");
//! assert!(error.is_recoverable());
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for stream operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Coarse classification of a [`StreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    Framing,
    Decode,
}

/// Main error type for stream operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Invalid configuration for '{field}': {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("Failed to read configuration: {source}")]
    ConfigParse {
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("Configuration file error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream transport error: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Connection attempt timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Malformed frame header: {source}")]
    HeaderParse {
        #[source]
        source: serde_json::Error,
    },

    #[error("Framing error: {reason}")]
    Framing { reason: String },

    #[error("Unexpected binary payload ({len} bytes) with no pending header")]
    UnexpectedPayload { len: usize },

    #[error("Failed to decode {format} payload: {reason}")]
    Decode { format: String, reason: String },

    #[error("{what} payload too short: expected {expected} bytes, got {actual}")]
    PayloadSize { what: &'static str, expected: usize, actual: usize },
}

impl StreamError {
    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Configuration { .. } => ErrorCategory::Configuration,
            StreamError::ConfigParse { .. } => ErrorCategory::Configuration,
            StreamError::Io { .. } => ErrorCategory::Configuration,
            StreamError::Transport { .. } => ErrorCategory::Transport,
            StreamError::Timeout { .. } => ErrorCategory::Transport,
            StreamError::HeaderParse { .. } => ErrorCategory::Framing,
            StreamError::Framing { .. } => ErrorCategory::Framing,
            StreamError::UnexpectedPayload { .. } => ErrorCategory::Framing,
            StreamError::Decode { .. } => ErrorCategory::Decode,
            StreamError::PayloadSize { .. } => ErrorCategory::Decode,
        }
    }

    /// Returns whether the session can keep running after this error.
    ///
    /// Configuration errors stop a connection before it starts; everything
    /// else is handled locally or surfaced through the connection status.
    pub fn is_recoverable(&self) -> bool {
        self.category() != ErrorCategory::Configuration
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::Configuration { field, .. } => match *field {
                "host" => {
                    vec!["Provide a non-empty device host", "Check the host forms a valid URL"]
                }
                "token" => vec!["Provide a non-empty access token"],
                "path" => vec!["Use a socket path starting with '/'"],
                _ => vec!["Check the configuration value"],
            },
            StreamError::ConfigParse { .. } => vec![
                "Check the configuration file is valid YAML",
                "Compare field names against StreamConfig",
            ],
            StreamError::Io { .. } => {
                vec!["Check the configuration file exists and is readable", "Check permissions"]
            }
            StreamError::Transport { .. } => vec![
                "Verify the depth sensor is powered and reachable",
                "Check the host and port",
                "Reconnect once the device is available",
            ],
            StreamError::Timeout { .. } => vec![
                "Increase connect_timeout_ms",
                "Check network latency to the device",
                "Reconnect once the device is available",
            ],
            StreamError::HeaderParse { .. } | StreamError::Framing { .. } => vec![
                "Check the device firmware speaks the frame header protocol",
                "Wait for the next header to resynchronise",
            ],
            StreamError::UnexpectedPayload { .. } => {
                vec!["Wait for the next header to resynchronise", "Check for dropped messages"]
            }
            StreamError::Decode { .. } | StreamError::PayloadSize { .. } => vec![
                "Check the declared stream format matches the payload",
                "Check the declared resolution matches the payload size",
            ],
        }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(field: &'static str, reason: impl Into<String>) -> Self {
        StreamError::Configuration { field, reason: reason.into() }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        StreamError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for framing errors.
    pub fn framing(reason: impl Into<String>) -> Self {
        StreamError::Framing { reason: reason.into() }
    }

    /// Helper constructor for decode errors.
    pub fn decode(format: impl Into<String>, reason: impl Into<String>) -> Self {
        StreamError::Decode { format: format.into(), reason: reason.into() }
    }
}

impl From<serde_json::Error> for StreamError {
    fn from(err: serde_json::Error) -> Self {
        StreamError::HeaderParse { source: err }
    }
}

impl From<serde_yaml_ng::Error> for StreamError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StreamError::ConfigParse { source: err }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for StreamError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        StreamError::Transport { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn messages_contain_their_context(
                reason in "[a-zA-Z0-9 ]{1,40}",
                format in "[a-z0-9]{1,8}",
                expected in 1usize..1_000_000,
                actual in 0usize..1_000_000,
            ) {
                let transport = StreamError::transport(reason.clone());
                prop_assert!(transport.to_string().contains(&reason));

                let decode = StreamError::decode(format.clone(), reason.clone());
                let msg = decode.to_string();
                prop_assert!(msg.contains(&format));
                prop_assert!(msg.contains(&reason));

                let size = StreamError::PayloadSize { what: "depth", expected, actual };
                let msg = size.to_string();
                prop_assert!(msg.contains(&expected.to_string()));
                prop_assert!(msg.contains(&actual.to_string()));
            }

            #[test]
            fn only_configuration_errors_are_fatal(reason in ".*", len in 0usize..100_000) {
                prop_assert!(!StreamError::configuration("host", reason.clone()).is_recoverable());
                prop_assert!(StreamError::transport(reason.clone()).is_recoverable());
                prop_assert!(StreamError::framing(reason.clone()).is_recoverable());
                let unexpected = StreamError::UnexpectedPayload { len };
                prop_assert!(unexpected.is_recoverable());
                prop_assert!(StreamError::decode("png", reason).is_recoverable());
            }
        }
    }

    #[test]
    fn categories_follow_taxonomy() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let header: StreamError = parse_err.into();

        assert_eq!(header.category(), ErrorCategory::Framing);
        let config = StreamError::configuration("host", "empty");
        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(
            StreamError::Timeout { duration: Duration::from_secs(5) }.category(),
            ErrorCategory::Transport
        );
        assert_eq!(
            StreamError::PayloadSize { what: "depth", expected: 8, actual: 4 }.category(),
            ErrorCategory::Decode
        );
    }

    #[test]
    fn transport_source_is_chained() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let error = StreamError::transport_with_source("open failed", Box::new(io));

        let source = std::error::Error::source(&error).expect("source should be kept");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();
    }

    #[test]
    fn every_error_has_suggestions() {
        let errors = [
            StreamError::configuration("token", "empty"),
            StreamError::transport("closed"),
            StreamError::Timeout { duration: Duration::from_millis(10) },
            StreamError::framing("bad"),
            StreamError::UnexpectedPayload { len: 3 },
            StreamError::decode("jpeg", "truncated"),
        ];

        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "{error} has no suggestions");
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn configuration_suggestions_name_the_field() {
        let token = StreamError::configuration("token", "empty").recovery_suggestions();
        assert_eq!(token, vec!["Provide a non-empty access token"]);

        let host = StreamError::configuration("host", "empty").recovery_suggestions();
        assert!(host.iter().all(|s| !s.contains("token")));

        let path = StreamError::configuration("path", "no slash").recovery_suggestions();
        assert!(path[0].contains('/'));
    }
}

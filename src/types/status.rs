//! Externally observable connection status

use std::fmt;

/// Lifecycle of a stream session's socket.
///
/// Transitions: `Disconnected -> Connecting -> Connected`, or `Connecting -> Error`.
/// Any close, local or remote, returns to `Disconnected`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error {
        message: String,
    },
}

impl ConnectionStatus {
    /// Status string shown by the host UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error { .. } => "error",
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// Error message, if the status is `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ConnectionStatus::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Error { message } => write!(f, "error: {message}"),
            other => f.write_str(other.as_str()),
        }
    }
}

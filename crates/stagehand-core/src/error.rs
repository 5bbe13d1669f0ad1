//! Error types for Stagehand.
//!
//! The taxonomy separates caller misuse (surfaced immediately) from expected
//! environmental failures (editor not running, connect timeout), which the
//! registry folds into a degraded connection status instead of propagating.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the Stagehand core.
#[derive(Debug, Error)]
pub enum StagehandError {
    // Target errors
    #[error("Invalid target {path:?}: {reason}")]
    InvalidTarget { path: PathBuf, reason: String },

    #[error("No connection for target: {0:?}")]
    NotConnected(PathBuf),

    #[error("No active connection and no target specified")]
    NoActiveConnection,

    #[error("No editor attached to {0:?} (project-only connection)")]
    EditorRequired(PathBuf),

    // Process enumeration errors
    #[error("Process enumeration failed: {message}")]
    Locate {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Transport errors
    #[error("Connect to {endpoint} timed out after {timeout:?}")]
    ConnectTimeout { endpoint: String, timeout: Duration },

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Editor disconnected")]
    PeerDisconnected,

    // Correlator errors
    #[error("Request '{command}' timed out after {timeout:?}")]
    RequestTimeout { command: String, timeout: Duration },

    #[error("Editor returned error for '{command}': {message}")]
    CommandFailed { command: String, message: String },

    // Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    // Generic errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;

impl From<std::io::Error> for StagehandError {
    fn from(err: std::io::Error) -> Self {
        StagehandError::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for StagehandError {
    fn from(err: serde_json::Error) -> Self {
        StagehandError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl StagehandError {
    /// True for failures that reflect caller misuse rather than the
    /// environment. These always propagate across the registry boundary.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            StagehandError::InvalidTarget { .. }
                | StagehandError::NotConnected(_)
                | StagehandError::NoActiveConnection
                | StagehandError::EditorRequired(_)
        )
    }

    /// True for failures the registry folds into a `ProjectOnly` status
    /// instead of surfacing (no live editor is an expected condition).
    pub fn is_degraded_connect(&self) -> bool {
        matches!(
            self,
            StagehandError::ConnectTimeout { .. }
                | StagehandError::Transport { .. }
                | StagehandError::PeerDisconnected
                | StagehandError::Locate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StagehandError::EditorRequired(PathBuf::from("/proj/a"));
        assert_eq!(
            err.to_string(),
            "No editor attached to \"/proj/a\" (project-only connection)"
        );
    }

    #[test]
    fn test_caller_error_classification() {
        assert!(StagehandError::NoActiveConnection.is_caller_error());
        assert!(!StagehandError::PeerDisconnected.is_caller_error());
    }

    #[test]
    fn test_degraded_connect_classification() {
        let err = StagehandError::ConnectTimeout {
            endpoint: "/tmp/stagehand-1".to_string(),
            timeout: Duration::from_secs(5),
        };
        assert!(err.is_degraded_connect());
        assert!(!StagehandError::NoActiveConnection.is_degraded_connect());
    }
}

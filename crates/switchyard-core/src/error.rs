//! Error types shared by the transport boundary and the state store.
//!
//! Framework-level errors (loading, reloading, dispatch) live in
//! `switchyard-framework`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a [`Transport`](crate::transport::Transport) implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The session is not connected, or was replaced after a reconnect.
    #[error("transport is not connected")]
    NotConnected,

    /// The remote side rejected or failed to deliver an outbound message.
    #[error("failed to send message to '{chat}': {reason}")]
    SendFailed {
        /// Target chat identifier.
        chat: String,
        /// Reason for failure.
        reason: String,
    },

    /// Media could not be fetched for a message.
    #[error("failed to download media: {0}")]
    DownloadFailed(String),

    /// The transport does not implement this capability.
    #[error("operation '{0}' is not supported by this transport")]
    Unsupported(&'static str),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Creates a send failure for `chat`.
    pub fn send_failed(chat: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            chat: chat.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Errors produced by a [`StateStore`](crate::store::StateStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("state store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document is not valid JSON, or a key holds a value of the wrong shape.
    #[error("state key '{key}' holds malformed data: {reason}")]
    Malformed {
        /// The offending key (or `<document>` for the whole file).
        key: String,
        /// Decoder message.
        reason: String,
    },
}

impl StoreError {
    /// Creates a malformed-data error for `key`.
    pub fn malformed(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::Malformed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for state store operations.
pub type StoreResult<T> = Result<T, StoreError>;

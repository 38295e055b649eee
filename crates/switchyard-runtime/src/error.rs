//! Runtime error types.

use thiserror::Error;

use switchyard_core::{DisconnectReason, TransportError};
use switchyard_framework::LoadError;

use crate::config::ConfigError;

/// Why a session loop ended with an error.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The backend closed the session for a reason that rules out reconnecting.
    #[error("session closed permanently: {0}")]
    Terminated(DisconnectReason),

    /// The session closed and reconnecting is disabled.
    #[error("session closed ({0}) and reconnect is disabled")]
    ReconnectDisabled(DisconnectReason),

    /// Every reconnect attempt failed.
    #[error("gave up after {attempts} reconnect attempt(s); last error: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

/// Result type for session loops.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The modules directory could not be scanned.
    #[error("failed to load modules: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// Opening a session failed outright.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

//! The inbound side of a messaging session.
//!
//! A [`Connector`] opens a [`Session`]: a fresh [`Transport`](crate::transport::Transport)
//! handle plus the stream of [`SessionEvent`]s that session produces. The
//! runtime reconnects by calling [`Connector::connect`] again.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportResult;
use crate::model::{GroupParticipantsUpdate, RawMessage};
use crate::transport::BoxedTransport;

// =============================================================================
// Events
// =============================================================================

/// Whether a batch holds live traffic or history backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchKind {
    /// Newly arrived messages.
    Notify,
    /// Historical messages synced after connecting.
    Append,
}

/// A group of messages delivered together.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageBatch {
    pub kind: BatchKind,
    pub messages: Vec<RawMessage>,
}

impl MessageBatch {
    /// A live batch.
    pub fn notify(messages: Vec<RawMessage>) -> Self {
        Self {
            kind: BatchKind::Notify,
            messages,
        }
    }

    /// A backfill batch.
    pub fn append(messages: Vec<RawMessage>) -> Self {
        Self {
            kind: BatchKind::Append,
            messages,
        }
    }
}

/// Why a session closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Credentials were revoked; reconnecting cannot succeed.
    LoggedOut,
    /// The server asked the client to restart the connection.
    RestartRequired,
    ConnectionLost,
    TimedOut,
    /// Anything else, with the transport's description.
    Other(String),
}

impl DisconnectReason {
    /// Returns `true` if the bridge should open a new session.
    pub fn should_reconnect(&self) -> bool {
        !matches!(self, Self::LoggedOut)
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LoggedOut => f.write_str("logged out"),
            Self::RestartRequired => f.write_str("restart required"),
            Self::ConnectionLost => f.write_str("connection lost"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

/// Connection state transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    Connecting,
    Open,
    Close { reason: DisconnectReason },
}

/// Everything a session reports to the router.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Messages(MessageBatch),
    Connection(ConnectionUpdate),
    GroupParticipants(GroupParticipantsUpdate),
}

// =============================================================================
// Connector
// =============================================================================

/// One connected session.
pub struct Session {
    pub transport: BoxedTransport,
    /// Closed by the transport when the session ends.
    pub events: mpsc::Receiver<SessionEvent>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("self_id", &self.transport.self_id())
            .finish_non_exhaustive()
    }
}

/// Opens sessions against a messaging backend.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Human-readable backend name for logs.
    fn name(&self) -> &str;

    /// Opens a new session. Called again after every eligible disconnect.
    async fn connect(&self) -> TransportResult<Session>;
}

//! # Switchyard Core
//!
//! The vocabulary shared between the router and the messaging backend it runs on.
//!
//! ## Contents
//!
//! - **Inbound model** ([`model`]): raw messages, content types, group updates
//! - **Identifiers** ([`jid`]): normalising and classifying chat/user identifiers
//! - **Transport** ([`transport`]): the capability handle used to act on chats
//! - **Session** ([`session`]): connectors, session events and disconnect reasons
//! - **State** ([`store`]): persisted ban list, toggles, bindings and templates
//!
//! ```text
//! ┌───────────┐  SessionEvent   ┌──────────┐  dispatch   ┌───────────┐
//! │ Connector │────────────────▶│  Bridge  │────────────▶│ Pipeline  │
//! │ (adapter) │                 │(runtime) │             │(framework)│
//! └───────────┘                 └──────────┘             └─────┬─────┘
//!       ▲                                                      │
//!       └──────────────────── Transport ◀──────────────────────┘
//! ```

pub mod error;
pub mod jid;
pub mod model;
pub mod session;
pub mod store;
pub mod transport;

pub use error::{StoreError, StoreResult, TransportError, TransportResult};
pub use model::{
    ContentType, ContextInfo, GroupMetadata, GroupParticipant, GroupParticipantsUpdate,
    MessageContent, MessageKey, ParticipantAction, ParticipantResult, ParticipantStatus, Payload,
    RawMessage,
};
pub use session::{
    BatchKind, ConnectionUpdate, Connector, DisconnectReason, MessageBatch, Session, SessionEvent,
};
pub use store::{
    BotState, Greeting, GreetingKind, JsonFileStateStore, MemoryStateStore, StateStore,
};
pub use transport::{BoxedTransport, MediaSource, OutgoingContent, OutgoingMessage, Transport};

/// Prelude for common imports.
pub mod prelude {
    pub use super::model::*;
    pub use super::session::*;
    pub use super::store::{BotState, StateStore};
    pub use super::transport::*;
}

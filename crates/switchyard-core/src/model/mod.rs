//! Inbound data model.
//!
//! - [`message`]: raw messages as delivered by the transport
//! - [`group`]: group metadata and membership updates

pub mod group;
pub mod message;

pub use group::{
    GroupMetadata, GroupParticipant, GroupParticipantsUpdate, ParticipantAction, ParticipantResult,
    ParticipantStatus,
};
pub use message::{
    ContentType, ContextInfo, MessageContent, MessageKey, Payload, RawMessage, Wrapped,
};

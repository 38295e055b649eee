//! The outbound side of a messaging session.
//!
//! A [`Transport`] is the capability handle the router uses to act on a chat:
//! send, react, edit, delete and download. Group administration (membership,
//! subject, description, announce mode, invite links) is optional; those
//! methods default to [`TransportError::Unsupported`]. Implementations are
//! supplied by an adapter crate and replaced wholesale after every reconnect.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{TransportError, TransportResult};
use crate::model::{GroupMetadata, MessageKey, ParticipantAction, ParticipantResult, Payload};

// =============================================================================
// Outbound Content
// =============================================================================

/// Where outbound media comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Fetched by the transport.
    Url(String),
    /// Inline bytes.
    Bytes(Vec<u8>),
}

/// The body of an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingContent {
    Text(String),
    Image {
        source: MediaSource,
        caption: Option<String>,
    },
    Video {
        source: MediaSource,
        caption: Option<String>,
    },
    Audio {
        source: MediaSource,
        voice_note: bool,
    },
    Document {
        source: MediaSource,
        file_name: String,
        mimetype: String,
    },
    Sticker(MediaSource),
}

impl OutgoingContent {
    /// Text shown for this content in logs and plain-text transports.
    pub fn preview(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image { caption, .. } => format!("[image] {}", caption.as_deref().unwrap_or("")),
            Self::Video { caption, .. } => format!("[video] {}", caption.as_deref().unwrap_or("")),
            Self::Audio { .. } => "[audio]".to_string(),
            Self::Document { file_name, .. } => format!("[document] {file_name}"),
            Self::Sticker(_) => "[sticker]".to_string(),
        }
    }
}

/// A message ready to be handed to [`Transport::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: OutgoingContent,
    /// Identifiers to notify.
    pub mentions: Vec<String>,
    /// Message this one replies to.
    pub quoted: Option<MessageKey>,
}

impl OutgoingMessage {
    pub fn new(content: OutgoingContent) -> Self {
        Self {
            content,
            mentions: Vec::new(),
            quoted: None,
        }
    }

    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(OutgoingContent::Text(text.into()))
    }

    pub fn with_mentions(mut self, mentions: impl IntoIterator<Item = String>) -> Self {
        self.mentions.extend(mentions);
        self
    }

    pub fn quoting(mut self, key: MessageKey) -> Self {
        self.quoted = Some(key);
        self
    }
}

impl From<&str> for OutgoingMessage {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for OutgoingMessage {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Capability handle for one connected session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The bot account's own identifier (may carry a device suffix).
    fn self_id(&self) -> String;

    /// Sends a message to `chat`, returning the key of the sent message.
    async fn send(&self, chat: &str, message: OutgoingMessage) -> TransportResult<MessageKey>;

    /// Reacts to a message with an emoji. An empty emoji removes the reaction.
    async fn react(&self, chat: &str, key: &MessageKey, emoji: &str) -> TransportResult<()>;

    /// Replaces the text of a previously sent message.
    async fn edit(&self, chat: &str, key: &MessageKey, text: &str) -> TransportResult<()>;

    /// Deletes a message for everyone.
    async fn delete(&self, chat: &str, key: &MessageKey) -> TransportResult<()>;

    /// Downloads the media referenced by a payload.
    async fn download(&self, payload: &Payload) -> TransportResult<Vec<u8>>;

    /// Fetches group metadata.
    async fn group_metadata(&self, _group: &str) -> TransportResult<GroupMetadata> {
        Err(TransportError::Unsupported("group_metadata"))
    }

    // ─── Group administration ───────────────────────────────────────────────

    /// Adds, removes, promotes or demotes participants. Requires bot admin.
    async fn update_participants(
        &self,
        _group: &str,
        _participants: &[String],
        _action: ParticipantAction,
    ) -> TransportResult<Vec<ParticipantResult>> {
        Err(TransportError::Unsupported("update_participants"))
    }

    async fn set_subject(&self, _group: &str, _subject: &str) -> TransportResult<()> {
        Err(TransportError::Unsupported("set_subject"))
    }

    /// An empty description clears it.
    async fn set_description(&self, _group: &str, _desc: &str) -> TransportResult<()> {
        Err(TransportError::Unsupported("set_description"))
    }

    /// `true` lets only admins send messages.
    async fn set_announce(&self, _group: &str, _announce: bool) -> TransportResult<()> {
        Err(TransportError::Unsupported("set_announce"))
    }

    /// The current invite code (the part after `chat.whatsapp.com/`).
    async fn invite_code(&self, _group: &str) -> TransportResult<String> {
        Err(TransportError::Unsupported("invite_code"))
    }

    /// Invalidates the current invite code and returns the new one.
    async fn revoke_invite(&self, _group: &str) -> TransportResult<String> {
        Err(TransportError::Unsupported("revoke_invite"))
    }
}

impl std::fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("self_id", &self.self_id())
            .finish_non_exhaustive()
    }
}

/// Shared transport handle.
pub type BoxedTransport = Arc<dyn Transport>;

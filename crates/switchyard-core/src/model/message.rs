//! Raw inbound message model.
//!
//! # Shape
//!
//! ```text
//! RawMessage { key, pushName, messageTimestamp }
//! └── message: MessageContent
//!     ├── conversation: "plain text"
//!     ├── <type>Message: Payload { text, caption, ..., contextInfo }
//!     │                                              └── ContextInfo { mentionedJid, quotedMessage, ... }
//!     └── ephemeralMessage / viewOnceMessage { message: MessageContent }   (wrappers)
//! ```
//!
//! Field names follow the transport's camelCase JSON. Every field is optional
//! on the wire; absent fields deserialise to their defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Envelope
// ============================================================================

/// One inbound message as delivered by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMessage {
    /// Addressing information.
    pub key: MessageKey,
    /// Display name chosen by the sender.
    pub push_name: Option<String>,
    /// Unix timestamp in seconds.
    pub message_timestamp: Option<u64>,
    /// Message body; `None` for stubs such as receipts.
    pub message: Option<MessageContent>,
}

/// Identity of a message within a chat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageKey {
    /// Chat the message belongs to.
    pub remote_jid: Option<String>,
    /// `true` when sent by the bot's own account.
    pub from_me: bool,
    /// Transport-assigned message id.
    pub id: String,
    /// Author inside a group chat.
    pub participant: Option<String>,
}

impl MessageKey {
    /// Creates a key for a message in `chat`.
    pub fn new(chat: impl Into<String>, id: impl Into<String>, from_me: bool) -> Self {
        Self {
            remote_jid: Some(chat.into()),
            from_me,
            id: id.into(),
            participant: None,
        }
    }
}

// ============================================================================
// Content
// ============================================================================

/// The content-type discriminator.
///
/// Variants are probed in declaration order; wrapper types are unwrapped
/// before probing and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Conversation,
    ExtendedText,
    Image,
    Video,
    Sticker,
    Audio,
    Document,
    Location,
    Contact,
    Buttons,
    ButtonsResponse,
    ListResponse,
    Reaction,
}

impl ContentType {
    /// The transport's name for this content type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::ExtendedText => "extendedTextMessage",
            Self::Image => "imageMessage",
            Self::Video => "videoMessage",
            Self::Sticker => "stickerMessage",
            Self::Audio => "audioMessage",
            Self::Document => "documentMessage",
            Self::Location => "locationMessage",
            Self::Contact => "contactMessage",
            Self::Buttons => "buttonsMessage",
            Self::ButtonsResponse => "buttonsResponseMessage",
            Self::ListResponse => "listResponseMessage",
            Self::Reaction => "reactionMessage",
        }
    }

    /// Returns `true` for types that carry downloadable media.
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::Image | Self::Video | Self::Sticker | Self::Audio | Self::Document
        )
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message body: at most one content field is normally populated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<Payload>,
    pub image_message: Option<Payload>,
    pub video_message: Option<Payload>,
    pub sticker_message: Option<Payload>,
    pub audio_message: Option<Payload>,
    pub document_message: Option<Payload>,
    pub location_message: Option<Payload>,
    pub contact_message: Option<Payload>,
    pub buttons_message: Option<Payload>,
    pub buttons_response_message: Option<Payload>,
    pub list_response_message: Option<Payload>,
    pub reaction_message: Option<Payload>,

    pub ephemeral_message: Option<Box<Wrapped>>,
    pub view_once_message: Option<Box<Wrapped>>,
    pub view_once_message_v2: Option<Box<Wrapped>>,
    pub document_with_caption_message: Option<Box<Wrapped>>,

    /// Protocol bookkeeping; never a content type.
    pub sender_key_distribution_message: Option<Value>,
    /// Protocol bookkeeping; never a content type.
    pub message_context_info: Option<Value>,
}

/// A wrapper such as `ephemeralMessage` that nests another message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wrapped {
    pub message: Option<MessageContent>,
}

impl MessageContent {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            conversation: Some(text.into()),
            ..Default::default()
        }
    }

    /// Unwraps ephemeral / view-once / captioned-document wrappers.
    pub fn unwrap_content(&self) -> &MessageContent {
        let wrapped = [
            &self.ephemeral_message,
            &self.view_once_message,
            &self.view_once_message_v2,
            &self.document_with_caption_message,
        ]
        .into_iter()
        .flatten()
        .find_map(|w| w.message.as_ref());

        match wrapped {
            Some(inner) => inner.unwrap_content(),
            None => self,
        }
    }

    /// Determines the content type, or `None` when nothing recognisable is present.
    pub fn content_type(&self) -> Option<ContentType> {
        if self.conversation.is_some() {
            return Some(ContentType::Conversation);
        }
        [
            (ContentType::ExtendedText, &self.extended_text_message),
            (ContentType::Image, &self.image_message),
            (ContentType::Video, &self.video_message),
            (ContentType::Sticker, &self.sticker_message),
            (ContentType::Audio, &self.audio_message),
            (ContentType::Document, &self.document_message),
            (ContentType::Location, &self.location_message),
            (ContentType::Contact, &self.contact_message),
            (ContentType::Buttons, &self.buttons_message),
            (ContentType::ButtonsResponse, &self.buttons_response_message),
            (ContentType::ListResponse, &self.list_response_message),
            (ContentType::Reaction, &self.reaction_message),
        ]
        .into_iter()
        .find_map(|(ty, payload)| payload.as_ref().map(|_| ty))
    }

    /// The payload for `ty`. [`ContentType::Conversation`] has none.
    pub fn payload(&self, ty: ContentType) -> Option<&Payload> {
        match ty {
            ContentType::Conversation => None,
            ContentType::ExtendedText => self.extended_text_message.as_ref(),
            ContentType::Image => self.image_message.as_ref(),
            ContentType::Video => self.video_message.as_ref(),
            ContentType::Sticker => self.sticker_message.as_ref(),
            ContentType::Audio => self.audio_message.as_ref(),
            ContentType::Document => self.document_message.as_ref(),
            ContentType::Location => self.location_message.as_ref(),
            ContentType::Contact => self.contact_message.as_ref(),
            ContentType::Buttons => self.buttons_message.as_ref(),
            ContentType::ButtonsResponse => self.buttons_response_message.as_ref(),
            ContentType::ListResponse => self.list_response_message.as_ref(),
            ContentType::Reaction => self.reaction_message.as_ref(),
        }
    }

    /// Decoded body text.
    ///
    /// Probes plain text first, then the type-specific text, caption,
    /// content text, selected display text and title fields, and returns the
    /// first non-empty one.
    pub fn body(&self) -> String {
        let typed = self
            .content_type()
            .and_then(|ty| self.payload(ty))
            .map(Payload::text_fields)
            .unwrap_or_default();

        std::iter::once(self.conversation.as_deref())
            .chain(typed)
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Fields carried by the typed (non-`conversation`) content variants.
///
/// The transport uses one loosely-typed object per content type; the union of
/// fields the router reads is modelled here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Payload {
    pub text: Option<String>,
    pub caption: Option<String>,
    pub content_text: Option<String>,
    pub selected_display_text: Option<String>,
    pub title: Option<String>,

    pub url: Option<String>,
    pub mimetype: Option<String>,
    /// Content hash, as transmitted (base64).
    pub file_sha256: Option<String>,
    pub file_length: Option<u64>,
    pub file_name: Option<String>,
    pub seconds: Option<u32>,

    pub degrees_latitude: Option<f64>,
    pub degrees_longitude: Option<f64>,
    pub display_name: Option<String>,
    pub vcard: Option<String>,

    pub context_info: Option<ContextInfo>,
}

impl Payload {
    /// Candidate body fields in probing order.
    pub fn text_fields(&self) -> [Option<&str>; 5] {
        [
            self.text.as_deref(),
            self.caption.as_deref(),
            self.content_text.as_deref(),
            self.selected_display_text.as_deref(),
            self.title.as_deref(),
        ]
    }

    /// Content fingerprint used for sticker → command bindings.
    pub fn fingerprint(&self) -> Option<&str> {
        self.file_sha256.as_deref().filter(|s| !s.is_empty())
    }
}

/// Reply / mention context attached to a payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContextInfo {
    /// Raw identifiers mentioned in the message.
    pub mentioned_jid: Vec<String>,
    /// Author of the quoted message.
    pub participant: Option<String>,
    /// Id of the quoted message.
    pub stanza_id: Option<String>,
    /// Content of the quoted message.
    pub quoted_message: Option<Box<MessageContent>>,
}

//! The normalized message record and its bound actions.

use std::fmt;

use switchyard_core::{
    BoxedTransport, ContentType, MessageContent, MessageKey, OutgoingMessage, Payload,
    TransportError, TransportResult,
};

// =============================================================================
// Actions
// =============================================================================

/// Outbound actions bound to one message's chat and identity.
#[derive(Clone)]
pub struct MessageActions {
    transport: BoxedTransport,
    chat: String,
    key: MessageKey,
}

impl MessageActions {
    pub fn new(transport: BoxedTransport, chat: impl Into<String>, key: MessageKey) -> Self {
        Self {
            transport,
            chat: chat.into(),
            key,
        }
    }

    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    /// Sends to the message's chat.
    pub async fn send(&self, message: impl Into<OutgoingMessage>) -> TransportResult<MessageKey> {
        self.transport.send(&self.chat, message.into()).await
    }

    /// Sends text quoting the message.
    pub async fn reply(&self, text: impl Into<String>) -> TransportResult<MessageKey> {
        let message = OutgoingMessage::text(text).quoting(self.key.clone());
        self.transport.send(&self.chat, message).await
    }

    pub async fn react(&self, emoji: &str) -> TransportResult<()> {
        self.transport.react(&self.chat, &self.key, emoji).await
    }

    /// Replaces the message's text. Only meaningful for the bot's own messages.
    pub async fn edit(&self, text: &str) -> TransportResult<()> {
        self.transport.edit(&self.chat, &self.key, text).await
    }

    /// Edits another message in the same chat, typically one just sent.
    pub async fn edit_sent(&self, key: &MessageKey, text: &str) -> TransportResult<()> {
        self.transport.edit(&self.chat, key, text).await
    }

    pub async fn delete(&self) -> TransportResult<()> {
        self.transport.delete(&self.chat, &self.key).await
    }
}

// =============================================================================
// Record
// =============================================================================

/// Which kinds of attachment a message carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaFlags {
    pub image: bool,
    pub video: bool,
    pub sticker: bool,
    pub audio: bool,
    pub document: bool,
    pub location: bool,
    pub contact: bool,
}

impl MediaFlags {
    pub fn of(content: &MessageContent) -> Self {
        Self {
            image: content.image_message.is_some(),
            video: content.video_message.is_some(),
            sticker: content.sticker_message.is_some(),
            audio: content.audio_message.is_some(),
            document: content.document_message.is_some(),
            location: content.location_message.is_some(),
            contact: content.contact_message.is_some(),
        }
    }
}

/// Mention information for a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mention {
    /// Identifiers mentioned, as received.
    pub jids: Vec<String>,
    /// The bot itself was mentioned.
    pub bot: bool,
    /// At least one owner was mentioned.
    pub owner: bool,
}

/// A message quoted by the current one.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotedMessage {
    pub content: MessageContent,
    pub content_type: Option<ContentType>,
    /// Normalised author.
    pub sender: String,
    pub chat: String,
    pub id: Option<String>,
    pub text: String,
    /// Quoted message was sent by the bot.
    pub from_me: bool,
}

impl QuotedMessage {
    /// Key for reacting to, editing or deleting the quoted message.
    pub fn key(&self) -> MessageKey {
        MessageKey {
            remote_jid: Some(self.chat.clone()),
            from_me: self.from_me,
            id: self.id.clone().unwrap_or_default(),
            participant: Some(self.sender.clone()),
        }
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.content_type.and_then(|ty| self.content.payload(ty))
    }
}

/// Canonical per-message record consumed by the pipeline and handlers.
#[derive(Clone)]
pub struct NormalizedMessage {
    pub key: MessageKey,
    pub chat: String,
    /// Normalised author.
    pub sender: String,
    /// Digits of the sender's identifier.
    pub number: String,
    pub push_name: String,
    /// Normalised identifier of the bot account.
    pub bot_id: String,
    pub from_me: bool,
    /// Sent by another bot client.
    pub is_bot: bool,
    pub is_group: bool,
    /// Sender is the bot itself or a configured owner.
    pub is_creator: bool,
    pub content_type: ContentType,
    /// Content with wrappers removed.
    pub content: MessageContent,
    pub body: String,
    pub media: MediaFlags,
    pub mention: Mention,
    /// `None` when nothing is quoted.
    pub reply: Option<QuotedMessage>,
    pub timestamp: Option<u64>,
    actions: MessageActions,
}

impl NormalizedMessage {
    pub(crate) fn assemble(parts: MessageParts, actions: MessageActions) -> Self {
        let MessageParts {
            key,
            chat,
            sender,
            number,
            push_name,
            bot_id,
            is_bot,
            is_creator,
            content_type,
            content,
            body,
            mention,
            reply,
            timestamp,
        } = parts;
        Self {
            from_me: key.from_me,
            is_group: switchyard_core::jid::is_group(&chat),
            media: MediaFlags::of(&content),
            key,
            chat,
            sender,
            number,
            push_name,
            bot_id,
            is_bot,
            is_creator,
            content_type,
            content,
            body,
            mention,
            reply,
            timestamp,
            actions,
        }
    }

    pub fn id(&self) -> &str {
        &self.key.id
    }

    /// Payload of the message's own content type.
    pub fn payload(&self) -> Option<&Payload> {
        self.content.payload(self.content_type)
    }

    /// Fingerprint of an attached sticker.
    pub fn sticker_fingerprint(&self) -> Option<&str> {
        self.content
            .sticker_message
            .as_ref()
            .and_then(Payload::fingerprint)
    }

    pub fn actions(&self) -> &MessageActions {
        &self.actions
    }

    pub fn transport(&self) -> &BoxedTransport {
        self.actions.transport()
    }

    pub async fn send(&self, message: impl Into<OutgoingMessage>) -> TransportResult<MessageKey> {
        self.actions.send(message).await
    }

    pub async fn reply(&self, text: impl Into<String>) -> TransportResult<MessageKey> {
        self.actions.reply(text).await
    }

    pub async fn react(&self, emoji: &str) -> TransportResult<()> {
        self.actions.react(emoji).await
    }

    pub async fn delete(&self) -> TransportResult<()> {
        self.actions.delete().await
    }

    /// Downloads this message's media.
    pub async fn download(&self) -> TransportResult<Vec<u8>> {
        let payload = self
            .payload()
            .filter(|_| self.content_type.is_media())
            .ok_or_else(|| TransportError::DownloadFailed("message carries no media".into()))?;
        self.transport().download(payload).await
    }

    /// Downloads the quoted message's media.
    pub async fn download_quoted(&self) -> TransportResult<Vec<u8>> {
        let payload = self
            .reply
            .as_ref()
            .filter(|q| q.content_type.is_some_and(|ty| ty.is_media()))
            .and_then(QuotedMessage::payload)
            .ok_or_else(|| TransportError::DownloadFailed("quoted message carries no media".into()))?;
        self.transport().download(payload).await
    }
}

impl fmt::Debug for NormalizedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedMessage")
            .field("id", &self.key.id)
            .field("chat", &self.chat)
            .field("sender", &self.sender)
            .field("content_type", &self.content_type)
            .field("body", &self.body)
            .field("is_creator", &self.is_creator)
            .field("reply", &self.reply.is_some())
            .finish_non_exhaustive()
    }
}

/// Derived fields handed from the normalizer to [`NormalizedMessage::assemble`].
pub(crate) struct MessageParts {
    pub key: MessageKey,
    pub chat: String,
    pub sender: String,
    pub number: String,
    pub push_name: String,
    pub bot_id: String,
    pub is_bot: bool,
    pub is_creator: bool,
    pub content_type: ContentType,
    pub content: MessageContent,
    pub body: String,
    pub mention: Mention,
    pub reply: Option<QuotedMessage>,
    pub timestamp: Option<u64>,
}

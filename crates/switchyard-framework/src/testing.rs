//! Test doubles shared by the framework's unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use switchyard_core::{
    BotState, BoxedTransport, GroupMetadata, GroupParticipant, MemoryStateStore, MessageContent,
    MessageKey, OutgoingContent, OutgoingMessage, ParticipantAction, ParticipantResult,
    ParticipantStatus, Payload, RawMessage, Transport, TransportError, TransportResult,
};

use crate::catalog::HandlerCatalog;
use crate::context::Services;
use crate::control::ControlSurface;
use crate::loader::Loader;
use crate::registry::Registry;
use crate::settings::DispatchSettings;

pub(crate) const BOT_JID: &str = "100:1@s.whatsapp.net";

/// An outbound action captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Recorded {
    Send { chat: String, message: OutgoingMessage },
    React { chat: String, id: String, emoji: String },
    Edit { chat: String, id: String, text: String },
    Delete { chat: String, id: String },
    Participants { chat: String, ids: Vec<String>, action: ParticipantAction },
    /// A group setting change, e.g. `subject=New name` or `announce=true`.
    Setting { chat: String, change: String },
}

/// Transport that records every call instead of performing it.
///
/// Group operations need [`RecordingTransport::with_group`]. Adding a member
/// reports `AlreadyMember`; adding a number starting with `403` reports
/// `InviteRequired`.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    calls: Mutex<Vec<Recorded>>,
    group: Option<GroupMetadata>,
}

impl RecordingTransport {
    pub fn with_group(group: GroupMetadata) -> Self {
        Self {
            group: Some(group),
            ..Default::default()
        }
    }

    fn group(&self, chat: &str, operation: &'static str) -> TransportResult<&GroupMetadata> {
        self.group
            .as_ref()
            .filter(|g| g.id == chat)
            .ok_or(TransportError::Unsupported(operation))
    }

    fn setting(&self, chat: &str, operation: &'static str, change: String) -> TransportResult<()> {
        self.group(chat, operation)?;
        self.calls.lock().push(Recorded::Setting {
            chat: chat.to_string(),
            change,
        });
        Ok(())
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    /// `(chat, text)` of every sent text message.
    pub fn sent_texts(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Recorded::Send {
                    chat,
                    message:
                        OutgoingMessage {
                            content: OutgoingContent::Text(text),
                            ..
                        },
                } => Some((chat.clone(), text.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    fn self_id(&self) -> String {
        BOT_JID.to_string()
    }

    async fn send(&self, chat: &str, message: OutgoingMessage) -> TransportResult<MessageKey> {
        let mut calls = self.calls.lock();
        calls.push(Recorded::Send {
            chat: chat.to_string(),
            message,
        });
        Ok(MessageKey::new(chat, format!("OUT{}", calls.len()), true))
    }

    async fn react(&self, chat: &str, key: &MessageKey, emoji: &str) -> TransportResult<()> {
        self.calls.lock().push(Recorded::React {
            chat: chat.to_string(),
            id: key.id.clone(),
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn edit(&self, chat: &str, key: &MessageKey, text: &str) -> TransportResult<()> {
        self.calls.lock().push(Recorded::Edit {
            chat: chat.to_string(),
            id: key.id.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete(&self, chat: &str, key: &MessageKey) -> TransportResult<()> {
        self.calls.lock().push(Recorded::Delete {
            chat: chat.to_string(),
            id: key.id.clone(),
        });
        Ok(())
    }

    async fn download(&self, _payload: &Payload) -> TransportResult<Vec<u8>> {
        Err(TransportError::Unsupported("download"))
    }

    async fn group_metadata(&self, group: &str) -> TransportResult<GroupMetadata> {
        self.group(group, "group_metadata").cloned()
    }

    async fn update_participants(
        &self,
        group: &str,
        participants: &[String],
        action: ParticipantAction,
    ) -> TransportResult<Vec<ParticipantResult>> {
        let metadata = self.group(group, "update_participants")?;
        let results = participants
            .iter()
            .map(|id| {
                let status = match action {
                    ParticipantAction::Add if metadata.is_member(id) => {
                        ParticipantStatus::AlreadyMember
                    }
                    ParticipantAction::Add if id.starts_with("403") => {
                        ParticipantStatus::InviteRequired
                    }
                    _ => ParticipantStatus::Done,
                };
                ParticipantResult {
                    id: id.clone(),
                    status,
                }
            })
            .collect();
        self.calls.lock().push(Recorded::Participants {
            chat: group.to_string(),
            ids: participants.to_vec(),
            action,
        });
        Ok(results)
    }

    async fn set_subject(&self, group: &str, subject: &str) -> TransportResult<()> {
        self.setting(group, "set_subject", format!("subject={subject}"))
    }

    async fn set_description(&self, group: &str, desc: &str) -> TransportResult<()> {
        self.setting(group, "set_description", format!("desc={desc}"))
    }

    async fn set_announce(&self, group: &str, announce: bool) -> TransportResult<()> {
        self.setting(group, "set_announce", format!("announce={announce}"))
    }

    async fn invite_code(&self, group: &str) -> TransportResult<String> {
        self.group(group, "invite_code")?;
        Ok("InviteCode1".to_string())
    }

    async fn revoke_invite(&self, group: &str) -> TransportResult<String> {
        self.setting(group, "revoke_invite", "invite=revoked".to_string())?;
        Ok("InviteCode2".to_string())
    }
}

/// A recording transport and the same handle as a [`BoxedTransport`].
pub(crate) fn transport() -> (Arc<RecordingTransport>, BoxedTransport) {
    let recording = Arc::new(RecordingTransport::default());
    let boxed: BoxedTransport = recording.clone();
    (recording, boxed)
}

/// A group whose admins are the bot and `admins`, with `members` as regular
/// participants.
pub(crate) fn group(id: &str, admins: &[&str], members: &[&str]) -> GroupMetadata {
    let admin = |id: &str| GroupParticipant {
        id: id.to_string(),
        admin: Some("admin".to_string()),
    };
    let mut participants = vec![admin(BOT_JID)];
    participants.extend(admins.iter().map(|id| admin(*id)));
    participants.extend(members.iter().map(|id| GroupParticipant {
        id: id.to_string(),
        admin: None,
    }));
    GroupMetadata {
        id: id.to_string(),
        subject: "Test Group".to_string(),
        participants,
        ..Default::default()
    }
}

/// Services over a fresh registry, catalog and in-memory state.
pub(crate) fn services(
    registry: Arc<Registry>,
    catalog: Arc<HandlerCatalog>,
    settings: DispatchSettings,
) -> Services {
    let loader = Arc::new(Loader::new("modules", registry, catalog));
    let state = BotState::new(Arc::new(MemoryStateStore::new()));
    Services::new(ControlSurface::new(loader), state, settings)
}

/// A live text message from `participant` (or the chat itself) in `chat`.
pub(crate) fn text_message(id: &str, chat: &str, participant: Option<&str>, text: &str) -> RawMessage {
    RawMessage {
        key: MessageKey {
            remote_jid: Some(chat.to_string()),
            from_me: false,
            id: id.to_string(),
            participant: participant.map(str::to_string),
        },
        push_name: Some("Tester".to_string()),
        message_timestamp: Some(1_700_000_000),
        message: Some(MessageContent::text(text)),
    }
}

/// A sticker message whose file hash is `fingerprint`.
pub(crate) fn sticker_message(id: &str, chat: &str, fingerprint: &str) -> RawMessage {
    RawMessage {
        message: Some(MessageContent {
            sticker_message: Some(Payload {
                file_sha256: Some(fingerprint.to_string()),
                mimetype: Some("image/webp".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..text_message(id, chat, None, "")
    }
}

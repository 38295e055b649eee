//! Outbound side: prints every action as one line.
//!
//! ```text
//! [15550001@s.whatsapp.net] Pong! (3 ms)
//! [15550001@s.whatsapp.net] ~ 5F0C…: edited text
//! [15550001@s.whatsapp.net] 👍 on 5F0C…
//! [120363…@g.us] * promote 5@s.whatsapp.net (Done)
//! ```
//!
//! Group administration acts on the simulated [`GroupState`], so `.promote`
//! followed by `.kick` behaves the way it would in a real group.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

use switchyard_core::{
    GroupMetadata, GroupParticipant, MessageKey, OutgoingMessage, ParticipantAction,
    ParticipantResult, ParticipantStatus, Payload, Transport, TransportError, TransportResult,
};

use crate::config::ConsoleConfig;

/// Shared output sink.
pub type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// The simulated group, shared by the reader and every session's transport.
pub type SharedGroup = Arc<parking_lot::Mutex<GroupState>>;

const NOT_FOUND: u16 = 404;

/// Membership and settings of the simulated group.
///
/// Starts with the typing sender as super-admin and the bot as admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    /// Member id to admin role.
    members: BTreeMap<String, Option<String>>,
    subject: String,
    desc: Option<String>,
    announce: bool,
    invite: String,
}

impl GroupState {
    pub fn new(config: &ConsoleConfig) -> Self {
        let mut members = BTreeMap::new();
        members.insert(config.sender.clone(), Some("superadmin".to_string()));
        members.insert(config.self_id.clone(), Some("admin".to_string()));
        Self {
            members,
            subject: config.group_subject.clone(),
            desc: None,
            announce: false,
            invite: fresh_invite(),
        }
    }

    /// Applies one membership change.
    pub fn apply(&mut self, action: ParticipantAction, id: &str) -> ParticipantStatus {
        let present = self.members.contains_key(id);
        match (action, present) {
            (ParticipantAction::Add, true) => ParticipantStatus::AlreadyMember,
            (ParticipantAction::Add, false) => {
                self.members.insert(id.to_string(), None);
                ParticipantStatus::Done
            }
            (_, false) => ParticipantStatus::Rejected(NOT_FOUND),
            (ParticipantAction::Remove, true) => {
                self.members.remove(id);
                ParticipantStatus::Done
            }
            (ParticipantAction::Promote, true) => {
                self.members.insert(id.to_string(), Some("admin".to_string()));
                ParticipantStatus::Done
            }
            (ParticipantAction::Demote, true) => {
                self.members.insert(id.to_string(), None);
                ParticipantStatus::Done
            }
        }
    }

    pub fn metadata(&self, group: &str) -> GroupMetadata {
        GroupMetadata {
            id: group.to_string(),
            subject: self.subject.clone(),
            desc: self.desc.clone(),
            participants: self
                .members
                .iter()
                .map(|(id, admin)| GroupParticipant {
                    id: id.clone(),
                    admin: admin.clone(),
                })
                .collect(),
            announce: self.announce,
        }
    }

    pub fn invite(&self) -> &str {
        &self.invite
    }
}

/// [`Transport`] that writes to the console.
pub struct ConsoleTransport {
    config: ConsoleConfig,
    out: SharedWriter,
    group: SharedGroup,
}

impl std::fmt::Debug for ConsoleTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleTransport")
            .field("self_id", &self.config.self_id)
            .finish_non_exhaustive()
    }
}

impl ConsoleTransport {
    pub fn new(config: ConsoleConfig, out: SharedWriter, group: SharedGroup) -> Self {
        Self { config, out, group }
    }

    async fn write_line(&self, line: String) -> TransportResult<()> {
        trace!(%line, "Console output");
        let mut out = self.out.lock().await;
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(())
    }

    fn simulated(&self, group: &str, operation: &'static str) -> TransportResult<()> {
        if self.config.group.as_deref() == Some(group) {
            Ok(())
        } else {
            Err(TransportError::Unsupported(operation))
        }
    }

    /// Settings changes need the bot to hold admin, as on a real server.
    fn administered(&self, group: &str, operation: &'static str) -> TransportResult<()> {
        self.simulated(group, operation)?;
        if self.group.lock().metadata(group).is_admin(&self.config.self_id) {
            Ok(())
        } else {
            Err(TransportError::send_failed(group, "bot is not an admin"))
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn self_id(&self) -> String {
        self.config.self_id.clone()
    }

    async fn send(&self, chat: &str, message: OutgoingMessage) -> TransportResult<MessageKey> {
        let mut line = format!("[{chat}] {}", message.content.preview());
        if !message.mentions.is_empty() {
            line.push_str(&format!("  (mentions: {})", message.mentions.join(", ")));
        }
        self.write_line(line).await?;
        Ok(MessageKey::new(chat, new_id(), true))
    }

    async fn react(&self, chat: &str, key: &MessageKey, emoji: &str) -> TransportResult<()> {
        self.write_line(format!("[{chat}] {emoji} on {}", key.id)).await
    }

    async fn edit(&self, chat: &str, key: &MessageKey, text: &str) -> TransportResult<()> {
        self.write_line(format!("[{chat}] ~ {}: {text}", key.id)).await
    }

    async fn delete(&self, chat: &str, key: &MessageKey) -> TransportResult<()> {
        self.write_line(format!("[{chat}] (deleted {})", key.id)).await
    }

    async fn download(&self, _payload: &Payload) -> TransportResult<Vec<u8>> {
        Err(TransportError::Unsupported("download"))
    }

    async fn group_metadata(&self, group: &str) -> TransportResult<GroupMetadata> {
        self.simulated(group, "group_metadata")?;
        Ok(self.group.lock().metadata(group))
    }

    async fn update_participants(
        &self,
        group: &str,
        participants: &[String],
        action: ParticipantAction,
    ) -> TransportResult<Vec<ParticipantResult>> {
        self.administered(group, "update_participants")?;
        let results: Vec<ParticipantResult> = {
            let mut state = self.group.lock();
            participants
                .iter()
                .map(|id| ParticipantResult {
                    id: id.clone(),
                    status: state.apply(action, id),
                })
                .collect()
        };
        for result in &results {
            self.write_line(format!(
                "[{group}] * {} {} ({:?})",
                action.as_str(),
                result.id,
                result.status
            ))
            .await?;
        }
        Ok(results)
    }

    async fn set_subject(&self, group: &str, subject: &str) -> TransportResult<()> {
        self.administered(group, "set_subject")?;
        self.group.lock().subject = subject.to_string();
        self.write_line(format!("[{group}] * subject: {subject}")).await
    }

    async fn set_description(&self, group: &str, desc: &str) -> TransportResult<()> {
        self.administered(group, "set_description")?;
        self.group.lock().desc = Some(desc.to_string()).filter(|d| !d.is_empty());
        self.write_line(format!("[{group}] * description: {desc}")).await
    }

    async fn set_announce(&self, group: &str, announce: bool) -> TransportResult<()> {
        self.administered(group, "set_announce")?;
        self.group.lock().announce = announce;
        let mode = if announce { "on" } else { "off" };
        self.write_line(format!("[{group}] * announce {mode}")).await
    }

    async fn invite_code(&self, group: &str) -> TransportResult<String> {
        self.administered(group, "invite_code")?;
        Ok(self.group.lock().invite.clone())
    }

    async fn revoke_invite(&self, group: &str) -> TransportResult<String> {
        self.administered(group, "revoke_invite")?;
        let code = fresh_invite();
        self.group.lock().invite.clone_from(&code);
        self.write_line(format!("[{group}] * invite revoked")).await?;
        Ok(code)
    }
}

/// A fresh message id in the transport's upper-case hex style.
pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string().to_uppercase()
}

fn fresh_invite() -> String {
    Uuid::new_v4().simple().to_string()[..22].to_string()
}

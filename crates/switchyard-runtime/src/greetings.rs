//! Welcome and exit messages for group membership changes.
//!
//! Each group stores its own templates. Besides the standard template
//! variables a greeting may use `&mention`, `&jid`, `&gname`, `&desc`,
//! `&size` and `&admins`. When the rendered text contains a URL the message
//! is sent as media: a video for `.mp4` links, otherwise an image, with the
//! remaining text as caption.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use switchyard_core::jid;
use switchyard_core::{
    BoxedTransport, GreetingKind, GroupMetadata, GroupParticipantsUpdate, MediaSource, MessageKey,
    OutgoingContent, OutgoingMessage, ParticipantAction,
};
use switchyard_framework::{Services, TemplateVars};

static URL: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"https?://\S+").ok());

/// Sends stored greetings on membership changes.
#[derive(Debug, Clone)]
pub struct Greeter {
    services: Services,
}

impl Greeter {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Sends the welcome (join) or exit (leave) greeting for `update`, if the
    /// group has one enabled. Returns the key of the sent message.
    pub async fn greet(
        &self,
        update: &GroupParticipantsUpdate,
        transport: &BoxedTransport,
    ) -> Option<MessageKey> {
        let kind = match update.action {
            ParticipantAction::Add => GreetingKind::Welcome,
            ParticipantAction::Remove => GreetingKind::Exit,
            ParticipantAction::Promote | ParticipantAction::Demote => return None,
        };

        let greeting = match self.services.state.greeting(&update.group, kind).await {
            Ok(Some(greeting)) if greeting.enabled && !greeting.message.trim().is_empty() => {
                greeting
            }
            Ok(_) => return None,
            Err(e) => {
                warn!(group = %update.group, error = %e, "Failed to read greeting");
                return None;
            }
        };

        let metadata = match transport.group_metadata(&update.group).await {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!(group = %update.group, error = %e, "Group metadata unavailable");
                GroupMetadata {
                    id: update.group.clone(),
                    ..Default::default()
                }
            }
        };

        let vars = self.vars(update, &metadata);
        let mut message = greeting_message(&vars.render(&greeting.message));
        if TemplateVars::references(&greeting.message, "mention") {
            message = message.with_mentions(update.participants.iter().cloned());
        }

        match transport.send(&update.group, message).await {
            Ok(key) => {
                info!(group = %update.group, kind = ?kind, "Sent greeting");
                Some(key)
            }
            Err(e) => {
                warn!(group = %update.group, error = %e, "Failed to send greeting");
                None
            }
        }
    }

    fn vars(&self, update: &GroupParticipantsUpdate, metadata: &GroupMetadata) -> TemplateVars {
        let mention = update
            .participants
            .first()
            .map(|p| format!("@{}", jid::number_of(p)))
            .unwrap_or_default();

        self.services
            .base_vars()
            .with("mention", mention)
            .with("jid", metadata.id.as_str())
            .with("gname", metadata.subject.as_str())
            .with("desc", metadata.desc.clone().unwrap_or_default())
            .with("size", metadata.participants.len().to_string())
            .with("admins", metadata.admins().count().to_string())
    }
}

/// Builds the outbound message for rendered greeting text.
fn greeting_message(text: &str) -> OutgoingMessage {
    let url = URL
        .as_ref()
        .and_then(|re| re.find(text))
        .map(|m| m.as_str().to_string());

    let Some(url) = url else {
        return OutgoingMessage::text(text.trim());
    };

    let caption = text.replacen(&url, "", 1).trim().to_string();
    let caption = (!caption.is_empty()).then_some(caption);
    let source = MediaSource::Url(url.clone());

    let content = if url.ends_with(".mp4") {
        OutgoingContent::Video { source, caption }
    } else {
        OutgoingContent::Image { source, caption }
    };
    OutgoingMessage::new(content)
}

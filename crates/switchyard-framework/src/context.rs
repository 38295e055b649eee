//! Context types passed to handlers.
//!
//! Every invocation receives the shared [`Services`] plus what triggered it:
//!
//! - [`CommandContext`]: the message, the argument text and the command name
//! - [`EventContext`]: the message, or a group membership update

use std::sync::Arc;
use std::time::Instant;

use time::OffsetDateTime;

use switchyard_core::{
    BotState, BoxedTransport, GroupMetadata, GroupParticipantsUpdate, MessageKey, OutgoingMessage,
    TransportResult,
};

use crate::control::ControlSurface;
use crate::message::NormalizedMessage;
use crate::settings::DispatchSettings;
use crate::template::{TemplateVars, format_date, format_uptime};
use crate::unit::Access;

// =============================================================================
// Services
// =============================================================================

/// Long-lived collaborators available to every handler.
#[derive(Clone)]
pub struct Services {
    pub control: ControlSurface,
    pub state: BotState,
    pub settings: Arc<DispatchSettings>,
    /// When the router started.
    pub started: Instant,
}

impl Services {
    pub fn new(control: ControlSurface, state: BotState, settings: DispatchSettings) -> Self {
        Self {
            control,
            state,
            settings: Arc::new(settings),
            started: Instant::now(),
        }
    }

    /// Variables available to every template.
    pub fn base_vars(&self) -> TemplateVars {
        TemplateVars::new()
            .with("version", self.settings.version.as_str())
            .with("platform", std::env::consts::OS)
            .with("uptime", format_uptime(self.started.elapsed()))
            .with("date", format_date(OffsetDateTime::now_utc()))
            .with("mode", self.settings.mode.as_str())
            .with("prefix", self.settings.prefix.clone().unwrap_or_default())
    }

    /// Base variables plus the sender and chat of `message`.
    pub fn message_vars(&self, message: &NormalizedMessage) -> TemplateVars {
        self.base_vars()
            .with("sender", format!("@{}", message.number))
            .with("pushname", message.push_name.as_str())
            .with("number", message.number.as_str())
            .with("chat", message.chat.as_str())
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Command Context
// =============================================================================

/// Everything a command handler receives.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub message: Arc<NormalizedMessage>,
    /// Text after the command name, leading whitespace removed.
    pub args: String,
    /// The command name as typed (or as bound to a sticker).
    pub command: String,
    /// Flags of the matched command.
    pub access: Access,
    pub services: Services,
}

/// Result of [`CommandContext::check_group_admin`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdminCheck {
    Granted(GroupMetadata),
    NotGroup,
    /// `only_admin` is set and the bot holds no admin role.
    BotNotAdmin,
    /// The sender is neither a group admin nor an owner.
    SenderNotAdmin,
}

impl CommandContext {
    pub fn state(&self) -> &BotState {
        &self.services.state
    }

    pub fn control(&self) -> &ControlSurface {
        &self.services.control
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.services.settings
    }

    /// Sends to the originating chat.
    pub async fn send(&self, message: impl Into<OutgoingMessage>) -> TransportResult<MessageKey> {
        self.message.send(message).await
    }

    /// Sends text quoting the originating message.
    pub async fn reply(&self, text: impl Into<String>) -> TransportResult<MessageKey> {
        self.message.reply(text).await
    }

    /// Template variables for this invocation.
    pub fn vars(&self) -> TemplateVars {
        self.services
            .message_vars(&self.message)
            .with("args", self.args.as_str())
            .with("command", self.command.as_str())
    }

    /// Checks the admin requirements of a group administration command.
    ///
    /// The bot must be an admin when the command sets `only_admin`; the sender
    /// must be a group admin unless they are an owner.
    pub async fn check_group_admin(&self) -> TransportResult<AdminCheck> {
        if !self.message.is_group {
            return Ok(AdminCheck::NotGroup);
        }
        let metadata = self
            .message
            .transport()
            .group_metadata(&self.message.chat)
            .await?;

        if self.access.only_admin && !metadata.is_admin(&self.message.bot_id) {
            return Ok(AdminCheck::BotNotAdmin);
        }
        if !self.message.is_creator && !metadata.is_admin(&self.message.sender) {
            return Ok(AdminCheck::SenderNotAdmin);
        }
        Ok(AdminCheck::Granted(metadata))
    }

    /// Renders `text` and sends it, mentioning the sender when `&sender` is used.
    pub async fn send_template(&self, text: &str) -> TransportResult<MessageKey> {
        let rendered = self.vars().render(text);
        let mut outgoing = OutgoingMessage::text(rendered);
        if TemplateVars::references(text, "sender") {
            outgoing = outgoing.with_mentions([self.message.sender.clone()]);
        }
        self.send(outgoing).await
    }
}

// =============================================================================
// Event Context
// =============================================================================

/// What fired an event.
#[derive(Debug, Clone)]
pub enum EventTrigger {
    Message(Arc<NormalizedMessage>),
    GroupParticipants {
        update: Arc<GroupParticipantsUpdate>,
        transport: BoxedTransport,
    },
}

/// Everything an event handler receives.
#[derive(Debug, Clone)]
pub struct EventContext {
    pub trigger: EventTrigger,
    pub services: Services,
}

impl EventContext {
    /// The triggering message, for message events.
    pub fn message(&self) -> Option<&NormalizedMessage> {
        match &self.trigger {
            EventTrigger::Message(message) => Some(message),
            EventTrigger::GroupParticipants { .. } => None,
        }
    }

    /// The triggering update, for group membership events.
    pub fn group_update(&self) -> Option<&GroupParticipantsUpdate> {
        match &self.trigger {
            EventTrigger::Message(_) => None,
            EventTrigger::GroupParticipants { update, .. } => Some(update),
        }
    }

    pub fn transport(&self) -> &BoxedTransport {
        match &self.trigger {
            EventTrigger::Message(message) => message.transport(),
            EventTrigger::GroupParticipants { transport, .. } => transport,
        }
    }

    pub fn state(&self) -> &BotState {
        &self.services.state
    }

    /// Sends to the chat the trigger came from.
    pub async fn send(&self, message: impl Into<OutgoingMessage>) -> TransportResult<MessageKey> {
        let chat = match &self.trigger {
            EventTrigger::Message(message) => message.chat.as_str(),
            EventTrigger::GroupParticipants { update, .. } => update.group.as_str(),
        };
        self.transport().send(chat, message.into()).await
    }
}

//! Turns typed lines into session events.
//!
//! | Input | Event |
//! |---|---|
//! | `/sticker <sha256>` | sticker message with that fingerprint |
//! | `/join <id>` / `/leave <id>` | membership change in the configured group |
//! | `/quit` | session close (logged out) |
//! | anything else | text message |
//!
//! A line starting with `//` is sent as text with one slash removed.

use switchyard_core::{
    ConnectionUpdate, DisconnectReason, GroupParticipantsUpdate, MessageBatch, MessageContent,
    MessageKey, ParticipantAction, Payload, RawMessage, SessionEvent,
};

use crate::config::ConsoleConfig;

/// What one input line means.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Event(SessionEvent),
    /// Nothing to deliver, with a hint for the operator.
    Ignored(String),
    /// Blank input.
    Empty,
}

/// Parses one line. `id` becomes the message id.
pub fn parse_line(line: &str, id: &str, timestamp: u64, config: &ConsoleConfig) -> Line {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Line::Empty;
    }

    if let Some(text) = line.strip_prefix("//") {
        return Line::Event(text_event(&format!("/{text}"), id, timestamp, config));
    }

    let Some(command) = line.strip_prefix('/') else {
        return Line::Event(text_event(line, id, timestamp, config));
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(n, a)| (n, a.trim()))
        .unwrap_or((command, ""));

    match name {
        "quit" => Line::Event(SessionEvent::Connection(ConnectionUpdate::Close {
            reason: DisconnectReason::LoggedOut,
        })),
        "sticker" if !arg.is_empty() => {
            let content = MessageContent {
                sticker_message: Some(Payload {
                    file_sha256: Some(arg.to_string()),
                    mimetype: Some("image/webp".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            };
            Line::Event(message_event(content, id, timestamp, config))
        }
        "join" | "leave" if !arg.is_empty() => match &config.group {
            Some(group) => Line::Event(SessionEvent::GroupParticipants(GroupParticipantsUpdate {
                group: group.clone(),
                participants: vec![arg.to_string()],
                action: if name == "join" {
                    ParticipantAction::Add
                } else {
                    ParticipantAction::Remove
                },
            })),
            None => Line::Ignored(format!("/{name} needs a group chat (set `group`)")),
        },
        _ => Line::Ignored(format!(
            "unknown or incomplete command '/{name}'; try /sticker <sha>, /join <id>, /leave <id>, /quit"
        )),
    }
}

fn text_event(text: &str, id: &str, timestamp: u64, config: &ConsoleConfig) -> SessionEvent {
    message_event(MessageContent::text(text), id, timestamp, config)
}

fn message_event(
    content: MessageContent,
    id: &str,
    timestamp: u64,
    config: &ConsoleConfig,
) -> SessionEvent {
    let participant = config.group.as_ref().map(|_| config.sender.clone());
    let raw = RawMessage {
        key: MessageKey {
            remote_jid: Some(config.chat().to_string()),
            from_me: false,
            id: id.to_string(),
            participant,
        },
        push_name: Some(config.push_name.clone()),
        message_timestamp: Some(timestamp),
        message: Some(content),
    };
    SessionEvent::Messages(MessageBatch::notify(vec![raw]))
}

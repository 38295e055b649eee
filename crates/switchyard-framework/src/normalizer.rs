//! Turns raw transport messages into [`NormalizedMessage`]s.

use switchyard_core::jid;
use switchyard_core::{BoxedTransport, ContextInfo, MessageContent, RawMessage};

use crate::message::{MessageActions, MessageParts, Mention, NormalizedMessage, QuotedMessage};
use crate::settings::DispatchSettings;

const DEFAULT_PUSH_NAME: &str = "No Name";

/// Normalises a raw message against the current transport and settings.
///
/// Returns `None` when the message has no usable content (receipts,
/// protocol stubs) or no chat.
pub fn normalize(
    raw: &RawMessage,
    transport: &BoxedTransport,
    settings: &DispatchSettings,
) -> Option<NormalizedMessage> {
    let content = raw.message.as_ref()?.unwrap_content();
    let content_type = content.content_type()?;

    let chat = raw
        .key
        .remote_jid
        .as_deref()
        .filter(|c| !c.is_empty())
        .or(raw.key.participant.as_deref())
        .map(jid::normalize_user)
        .filter(|c| !c.is_empty())?;

    let self_id = transport.self_id();
    let bot_id = jid::normalize_user(&self_id);
    let sender = if raw.key.from_me {
        bot_id.clone()
    } else {
        jid::normalize_user(raw.key.participant.as_deref().unwrap_or(chat.as_str()))
    };

    let owners = settings.owner_set(&bot_id);
    let is_creator = owners.contains(&sender);

    let context = content.payload(content_type).and_then(|p| p.context_info.as_ref());
    let mention = mentions(context, &bot_id, &owners);
    let reply = context.and_then(|ctx| quoted(ctx, &chat, &self_id));

    let id = raw.key.id.clone();
    let is_bot = id.starts_with("BAE5") && id.len() == 16;

    let parts = MessageParts {
        number: jid::number_of(&sender),
        push_name: raw
            .push_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_PUSH_NAME.to_string()),
        key: raw.key.clone(),
        body: content.body(),
        content: content.clone(),
        content_type,
        sender,
        bot_id,
        is_bot,
        is_creator,
        mention,
        reply,
        timestamp: raw.message_timestamp,
        chat: chat.clone(),
    };
    let actions = MessageActions::new(transport.clone(), chat, raw.key.clone());
    Some(NormalizedMessage::assemble(parts, actions))
}

fn mentions(context: Option<&ContextInfo>, bot_id: &str, owners: &[String]) -> Mention {
    let jids = context.map(|c| c.mentioned_jid.clone()).unwrap_or_default();
    let normalized: Vec<String> = jids.iter().map(|j| jid::normalize_user(j)).collect();
    Mention {
        bot: normalized.iter().any(|j| j == bot_id),
        owner: owners.iter().any(|o| normalized.contains(o)),
        jids,
    }
}

fn quoted(context: &ContextInfo, chat: &str, self_id: &str) -> Option<QuotedMessage> {
    let content: &MessageContent = context.quoted_message.as_deref()?;
    let content_type = content.content_type();
    let participant = context.participant.as_deref().unwrap_or_default();

    let text = content
        .conversation
        .clone()
        .or_else(|| {
            content
                .extended_text_message
                .as_ref()
                .and_then(|p| p.text.clone())
        })
        .or_else(|| {
            content_type
                .and_then(|ty| content.payload(ty))
                .and_then(|p| p.caption.clone())
        })
        .unwrap_or_default();

    Some(QuotedMessage {
        content: content.clone(),
        content_type,
        sender: jid::normalize_user(participant),
        chat: chat.to_string(),
        id: context.stanza_id.clone(),
        text,
        from_me: jid::same_user(participant, self_id),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use switchyard_core::{ContentType, MessageKey, Payload};

    use super::*;
    use crate::testing::RecordingTransport;

    fn transport() -> BoxedTransport {
        Arc::new(RecordingTransport::default())
    }

    fn settings() -> DispatchSettings {
        DispatchSettings::default().with_owners(["555"])
    }

    fn raw(chat: &str, participant: Option<&str>, content: MessageContent) -> RawMessage {
        RawMessage {
            key: MessageKey {
                remote_jid: Some(chat.into()),
                from_me: false,
                id: "3EB0C0FFEE".into(),
                participant: participant.map(str::to_string),
            },
            push_name: Some("Ana".into()),
            message_timestamp: Some(1_700_000_000),
            message: Some(content),
        }
    }

    #[test]
    fn test_plain_private_message() {
        let msg = normalize(
            &raw("42@s.whatsapp.net", None, MessageContent::text("hi")),
            &transport(),
            &settings(),
        )
        .unwrap();

        assert_eq!(msg.chat, "42@s.whatsapp.net");
        assert_eq!(msg.sender, "42@s.whatsapp.net");
        assert_eq!(msg.number, "42");
        assert_eq!(msg.body, "hi");
        assert_eq!(msg.content_type, ContentType::Conversation);
        assert!(!msg.is_group);
        assert!(!msg.is_creator);
        assert!(msg.reply.is_none());
        assert_eq!(msg.bot_id, "100@s.whatsapp.net");
    }

    #[test]
    fn test_group_owner_mentions_bot() {
        let content = MessageContent {
            extended_text_message: Some(Payload {
                text: Some("@100 hello".into()),
                context_info: Some(ContextInfo {
                    mentioned_jid: vec!["100@s.whatsapp.net".into(), "555@s.whatsapp.net".into()],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let msg = normalize(
            &raw("123@g.us", Some("555:2@s.whatsapp.net"), content),
            &transport(),
            &settings(),
        )
        .unwrap();

        assert!(msg.is_group);
        assert_eq!(msg.sender, "555@s.whatsapp.net");
        assert!(msg.is_creator);
        assert!(msg.mention.bot);
        assert!(msg.mention.owner);
        assert_eq!(msg.body, "@100 hello");
    }

    #[test]
    fn test_from_me_is_creator() {
        let mut message = raw("42@s.whatsapp.net", None, MessageContent::text(".ping"));
        message.key.from_me = true;
        let msg = normalize(&message, &transport(), &DispatchSettings::default()).unwrap();
        assert_eq!(msg.sender, "100@s.whatsapp.net");
        assert!(msg.is_creator);
    }

    #[test]
    fn test_quoted_message() {
        let content = MessageContent {
            extended_text_message: Some(Payload {
                text: Some("look".into()),
                context_info: Some(ContextInfo {
                    participant: Some("100:4@s.whatsapp.net".into()),
                    stanza_id: Some("Q1".into()),
                    quoted_message: Some(Box::new(MessageContent {
                        image_message: Some(Payload {
                            caption: Some("cat".into()),
                            ..Default::default()
                        }),
                        ..Default::default()
                    })),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        };
        let msg = normalize(&raw("42@s.whatsapp.net", None, content), &transport(), &settings())
            .unwrap();

        let quoted = msg.reply.as_ref().unwrap();
        assert_eq!(quoted.content_type, Some(ContentType::Image));
        assert_eq!(quoted.text, "cat");
        assert_eq!(quoted.sender, "100@s.whatsapp.net");
        assert!(quoted.from_me);
        assert_eq!(quoted.key().id, "Q1");
    }

    #[test]
    fn test_absent_payload() {
        let mut message = raw("42@s.whatsapp.net", None, MessageContent::default());
        assert!(normalize(&message, &transport(), &settings()).is_none());
        message.message = None;
        assert!(normalize(&message, &transport(), &settings()).is_none());
    }

    #[test]
    fn test_bot_client_and_default_push_name() {
        let mut message = raw("42@s.whatsapp.net", None, MessageContent::text("x"));
        message.key.id = "BAE5AAAABBBBCCCC".into();
        message.push_name = None;
        let msg = normalize(&message, &transport(), &settings()).unwrap();
        assert!(msg.is_bot);
        assert_eq!(msg.push_name, "No Name");
    }
}

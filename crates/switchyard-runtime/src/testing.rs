//! Test doubles for the runtime's unit tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use switchyard_core::{
    BotState, BoxedTransport, Connector, GroupMetadata, MemoryStateStore, MessageContent,
    MessageKey, OutgoingContent, OutgoingMessage, Payload, RawMessage, Session, SessionEvent,
    Transport, TransportError, TransportResult,
};
use switchyard_framework::{
    ControlSurface, DispatchSettings, HandlerCatalog, Loader, Registry, Services,
};

pub(crate) const BOT_JID: &str = "100@s.whatsapp.net";

/// Transport that records sent messages.
#[derive(Debug, Default)]
pub(crate) struct RecordingTransport {
    pub metadata: Option<GroupMetadata>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
}

impl RecordingTransport {
    pub fn with_metadata(metadata: GroupMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter_map(|(_, message)| match &message.content {
                OutgoingContent::Text(text) => Some(text.clone()),
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
        let mut sent = self.sent.lock();
        sent.push((chat.to_string(), message));
        Ok(MessageKey::new(chat, format!("OUT{}", sent.len()), true))
    }

    async fn react(&self, _: &str, _: &MessageKey, _: &str) -> TransportResult<()> {
        Ok(())
    }

    async fn edit(&self, _: &str, _: &MessageKey, _: &str) -> TransportResult<()> {
        Ok(())
    }

    async fn delete(&self, _: &str, _: &MessageKey) -> TransportResult<()> {
        Ok(())
    }

    async fn download(&self, _: &Payload) -> TransportResult<Vec<u8>> {
        Err(TransportError::Unsupported("download"))
    }

    async fn group_metadata(&self, _group: &str) -> TransportResult<GroupMetadata> {
        self.metadata
            .clone()
            .ok_or(TransportError::Unsupported("group_metadata"))
    }
}

/// What one call to [`ScriptedConnector::connect`] produces.
pub(crate) enum Script {
    /// A session that delivers these events, then ends its stream.
    Events(Vec<SessionEvent>),
    /// A session that delivers these events and stays open.
    Hold(Vec<SessionEvent>),
    /// `connect` fails.
    Fail,
}

/// Connector that plays back scripted sessions over one recording transport.
pub(crate) struct ScriptedConnector {
    scripts: Mutex<VecDeque<Script>>,
    held: Mutex<Vec<mpsc::Sender<SessionEvent>>>,
    connects: AtomicUsize,
    pub transport: Arc<RecordingTransport>,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self::with_transport(scripts, RecordingTransport::default())
    }

    pub fn with_transport(scripts: Vec<Script>, transport: RecordingTransport) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            held: Mutex::new(Vec::new()),
            connects: AtomicUsize::new(0),
            transport: Arc::new(transport),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(&self) -> TransportResult<Session> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().pop_front().unwrap_or(Script::Fail);
        let (events, hold) = match script {
            Script::Events(events) => (events, false),
            Script::Hold(events) => (events, true),
            Script::Fail => return Err(TransportError::NotConnected),
        };

        let (tx, rx) = mpsc::channel(events.len() + 1);
        for event in events {
            tx.try_send(event).map_err(|e| TransportError::Io(e.to_string()))?;
        }
        if hold {
            self.held.lock().push(tx);
        }

        let transport: BoxedTransport = self.transport.clone();
        Ok(Session {
            transport,
            events: rx,
        })
    }
}

/// Services over an in-memory store and a loader rooted at `modules`.
pub(crate) fn services(modules: &Path, catalog: HandlerCatalog, settings: DispatchSettings) -> Services {
    let loader = Arc::new(Loader::new(modules, Arc::new(Registry::new()), Arc::new(catalog)));
    let state = BotState::new(Arc::new(MemoryStateStore::new()));
    Services::new(ControlSurface::new(loader), state, settings)
}

/// A live text message from a private chat.
pub(crate) fn text_message(id: &str, chat: &str, text: &str) -> RawMessage {
    RawMessage {
        key: MessageKey {
            remote_jid: Some(chat.to_string()),
            from_me: false,
            id: id.to_string(),
            participant: None,
        },
        push_name: Some("Tester".to_string()),
        message_timestamp: Some(1_700_000_000),
        message: Some(MessageContent::text(text)),
    }
}

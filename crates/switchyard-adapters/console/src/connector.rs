//! Inbound side: reads lines and emits session events.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, BufReader, Lines};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

use switchyard_core::{
    BoxedTransport, ConnectionUpdate, Connector, DisconnectReason, Session, SessionEvent,
    TransportResult,
};

use crate::config::ConsoleConfig;
use crate::parse::{Line, parse_line};
use crate::transport::{ConsoleTransport, GroupState, SharedGroup, SharedWriter, new_id};

type BoxedLines = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;

const EVENT_BUFFER: usize = 16;

/// [`Connector`] over a line reader and a writer, by default stdin/stdout.
///
/// The reader and the simulated group outlive individual sessions, so a
/// reconnect continues with the next unread line and the same members. End of
/// input closes the session as logged out.
pub struct ConsoleConnector {
    config: ConsoleConfig,
    input: Arc<Mutex<BoxedLines>>,
    out: SharedWriter,
    group: SharedGroup,
}

impl std::fmt::Debug for ConsoleConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConsoleConnector {
    /// Reads stdin and writes stdout.
    pub fn stdio(config: ConsoleConfig) -> Self {
        Self::new(config, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }

    pub fn new<R, W>(config: ConsoleConfig, input: R, output: W) -> Self
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let input: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(input);
        let output: Box<dyn AsyncWrite + Send + Unpin> = Box::new(output);
        Self {
            group: Arc::new(parking_lot::Mutex::new(GroupState::new(&config))),
            config,
            input: Arc::new(Mutex::new(input.lines())),
            out: Arc::new(Mutex::new(output)),
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for ConsoleConnector {
    fn name(&self) -> &str {
        "console"
    }

    async fn connect(&self) -> TransportResult<Session> {
        let transport: BoxedTransport = Arc::new(ConsoleTransport::new(
            self.config.clone(),
            self.out.clone(),
            self.group.clone(),
        ));
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        tokio::spawn(read_loop(
            self.config.clone(),
            self.input.clone(),
            self.group.clone(),
            tx,
        ));

        info!(chat = %self.config.chat(), "Console session opened");
        Ok(Session {
            transport,
            events: rx,
        })
    }
}

async fn read_loop(
    config: ConsoleConfig,
    input: Arc<Mutex<BoxedLines>>,
    group: SharedGroup,
    tx: mpsc::Sender<SessionEvent>,
) {
    if tx
        .send(SessionEvent::Connection(ConnectionUpdate::Open))
        .await
        .is_err()
    {
        return;
    }

    let mut lines = input.lock().await;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read console input");
                let _ = tx
                    .send(SessionEvent::Connection(ConnectionUpdate::Close {
                        reason: DisconnectReason::Other(e.to_string()),
                    }))
                    .await;
                return;
            }
        };

        let event = match parse_line(&line, &new_id(), unix_now(), &config) {
            Line::Event(event) => event,
            Line::Ignored(hint) => {
                warn!("{hint}");
                continue;
            }
            Line::Empty => continue,
        };

        if let SessionEvent::GroupParticipants(update) = &event {
            let mut group = group.lock();
            for participant in &update.participants {
                group.apply(update.action, participant);
            }
        }

        let closes = matches!(
            event,
            SessionEvent::Connection(ConnectionUpdate::Close { .. })
        );
        if tx.send(event).await.is_err() || closes {
            return;
        }
    }

    let _ = tx
        .send(SessionEvent::Connection(ConnectionUpdate::Close {
            reason: DisconnectReason::LoggedOut,
        }))
        .await;
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

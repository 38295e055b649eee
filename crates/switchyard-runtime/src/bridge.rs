//! Session Event Bridge.
//!
//! Connects through a [`Connector`], consumes the [`SessionEvent`] stream and
//! keeps the session alive across disconnects.
//!
//! ```text
//!             ┌──────── bridge task ────────┐
//! Connector ─▶│ Connection: log, reconnect  │      ┌── task per item ───────────┐
//!             │ Messages(Notify) ───────────┼─────▶│ Pipeline::process_batch    │
//!             │ Messages(Append): dropped   │      ├────────────────────────────┤
//!             │ GroupParticipants ──────────┼─────▶│ dispatch_group_update      │
//!             └─────────────────────────────┘      │ Greeter::greet             │
//!                                                  └────────────────────────────┘
//! ```
//!
//! Messages of one batch run one after another, each to completion. Every
//! batch gets its own task, so a handler that never finishes holds up only
//! the rest of its own batch. The bridge loop never waits on handlers and
//! always sees connection updates.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use switchyard_core::{
    BatchKind, BoxedTransport, ConnectionUpdate, Connector, DisconnectReason,
    GroupParticipantsUpdate, MessageBatch, Session, SessionEvent,
};
use switchyard_framework::{DispatchOutcome, Pipeline};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::greetings::Greeter;

/// How one connected session ended.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    Closed {
        reason: DisconnectReason,
        opened: bool,
    },
}

/// Drives sessions from a connector into the pipeline.
pub struct SessionBridge {
    connector: Arc<dyn Connector>,
    pipeline: Pipeline,
    greeter: Greeter,
    config: SessionConfig,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl std::fmt::Debug for SessionBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBridge")
            .field("connector", &self.connector.name())
            .field("config", &self.config)
            .field("in_flight", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl SessionBridge {
    pub fn new(
        connector: Arc<dyn Connector>,
        pipeline: Pipeline,
        config: SessionConfig,
        cancel: CancellationToken,
    ) -> Self {
        let greeter = Greeter::new(pipeline.services().clone());
        Self {
            connector,
            pipeline,
            greeter,
            config,
            cancel,
            tasks: TaskTracker::new(),
        }
    }

    /// Runs until cancelled (`Ok`) or until the session cannot continue.
    ///
    /// Running handlers get `shutdown_grace_ms` to finish before this returns.
    pub async fn run(&self) -> SessionResult<()> {
        self.tasks.reopen();
        let result = self.session_loop().await;
        self.settle().await;
        result
    }

    async fn settle(&self) {
        self.tasks.close();
        if self.tasks.is_empty() {
            return;
        }

        let grace = self.config.shutdown_grace();
        debug!(in_flight = self.tasks.len(), ?grace, "Waiting for running handlers");
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            warn!(
                in_flight = self.tasks.len(),
                "Handlers still running after the shutdown grace period, leaving them behind"
            );
        }
    }

    fn spawn_batch(&self, batch: MessageBatch, transport: BoxedTransport) {
        let pipeline = self.pipeline.clone();
        self.tasks.spawn(async move {
            let outcomes = pipeline.process_batch(&batch, &transport).await;
            let commands = outcomes
                .iter()
                .filter(|o| matches!(o, DispatchOutcome::Command { .. }))
                .count();
            debug!(messages = outcomes.len(), commands, "Batch processed");
        });
    }

    fn spawn_group_update(&self, update: GroupParticipantsUpdate, transport: BoxedTransport) {
        let pipeline = self.pipeline.clone();
        let greeter = self.greeter.clone();
        self.tasks.spawn(async move {
            let report = pipeline
                .dispatch_group_update(update.clone(), &transport)
                .await;
            debug!(?report, "Group update processed");
            greeter.greet(&update, &transport).await;
        });
    }

    async fn session_loop(&self) -> SessionResult<()> {
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                connected = self.connector.connect() => connected,
            };

            let last = match connected {
                Ok(session) => {
                    info!(connector = self.connector.name(), "Session started");
                    match self.drive(session).await {
                        SessionEnd::Cancelled => return Ok(()),
                        SessionEnd::Closed { reason, opened } => {
                            warn!(%reason, "Connection closed");
                            if !reason.should_reconnect() {
                                return Err(SessionError::Terminated(reason));
                            }
                            if !self.config.reconnect {
                                return Err(SessionError::ReconnectDisabled(reason));
                            }
                            if opened {
                                attempt = 0;
                            }
                            reason.to_string()
                        }
                    }
                }
                Err(e) => {
                    warn!(connector = self.connector.name(), error = %e, "Failed to connect");
                    if !self.config.reconnect {
                        return Err(SessionError::ReconnectDisabled(DisconnectReason::Other(
                            e.to_string(),
                        )));
                    }
                    e.to_string()
                }
            };

            attempt += 1;
            if attempt > self.config.retry.max_retries {
                return Err(SessionError::RetriesExhausted {
                    attempts: self.config.retry.max_retries,
                    last,
                });
            }

            let delay = self.config.retry.delay_for(attempt);
            info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Consumes one session's events until it closes.
    async fn drive(&self, session: Session) -> SessionEnd {
        let Session {
            transport,
            mut events,
        } = session;
        let mut opened = false;

        loop {
            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
                event = events.recv() => event,
            };

            match event {
                None => {
                    return SessionEnd::Closed {
                        reason: DisconnectReason::ConnectionLost,
                        opened,
                    };
                }
                Some(SessionEvent::Connection(update)) => match update {
                    ConnectionUpdate::Connecting => info!("Connecting"),
                    ConnectionUpdate::Open => {
                        opened = true;
                        info!(self_id = %transport.self_id(), "Connected");
                    }
                    ConnectionUpdate::Close { reason } => {
                        return SessionEnd::Closed { reason, opened };
                    }
                },
                Some(SessionEvent::Messages(batch)) => match batch.kind {
                    BatchKind::Notify => self.spawn_batch(batch, transport.clone()),
                    BatchKind::Append => {
                        debug!(count = batch.messages.len(), "Dropping backfill batch");
                    }
                },
                Some(SessionEvent::GroupParticipants(update)) => {
                    self.spawn_group_update(update, transport.clone());
                }
            }
        }
    }
}

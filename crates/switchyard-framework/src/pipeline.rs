//! The dispatch pipeline.
//!
//! Each inbound message passes through ordered gates and stops at the first
//! one that claims it:
//!
//! ```text
//! raw ─▶ normalize ─▶ suppression ─▶ sticker binding ─▶ prefix ─▶ event fan-out
//!           │              │                │              │
//!           ▼              ▼                ▼              ▼
//!        Skipped      Suppressed       Command / Unmatched (always terminal)
//! ```
//!
//! At most one command runs per message. Events run only when no command gate
//! claimed the message, and every event runs even if an earlier one failed.
//! Handler errors and panics are contained here: a failing command produces a
//! generic notice in the chat, a failing event is only logged.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{Instrument, debug, error, info, info_span, trace, warn};

use switchyard_core::{BatchKind, BoxedTransport, GroupParticipantsUpdate, MessageBatch, RawMessage};

use crate::context::{CommandContext, EventContext, EventTrigger, Services};
use crate::error::HandlerError;
use crate::message::NormalizedMessage;
use crate::normalizer::normalize;
use crate::permission::{Denial, check_group_update, check_message};
use crate::registry::Registry;
use crate::unit::{Command, Event, EventKind};

/// Sent to the chat when a command handler fails.
pub const COMMAND_FAILURE_NOTICE: &str = "❌ An error occurred while executing the command.";

// =============================================================================
// Outcomes
// =============================================================================

/// Why a message was dropped before any lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suppression {
    /// The chat is on the ban list.
    Banned,
    /// The bot is shut off.
    ShutOff,
}

/// Which gate selected a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Sticker,
    Prefix,
}

/// Result of one command selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Completed,
    /// The handler returned an error or panicked; the chat was notified.
    Failed,
    /// The permission or toggle check refused the caller. Nothing was sent.
    Denied(Denial),
}

/// Counts from one event fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventReport {
    pub invoked: usize,
    pub failed: usize,
    pub denied: usize,
}

/// What the pipeline did with one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The raw message carried no usable content.
    Skipped,
    Suppressed(Suppression),
    Command {
        /// Name as typed, or as stored in the sticker binding.
        name: String,
        unit_id: String,
        trigger: Trigger,
        status: CommandStatus,
    },
    /// A command gate claimed the message but no command matched the name.
    Unmatched { name: String, trigger: Trigger },
    Events(EventReport),
}

// =============================================================================
// Pipeline
// =============================================================================

/// Routes normalized messages to commands and events.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Arc<Registry>,
    services: Services,
}

impl Pipeline {
    pub fn new(services: Services) -> Self {
        Self {
            registry: services.control.registry().clone(),
            services,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatches a batch. Only live batches are processed; messages run one
    /// after another, each to completion.
    pub async fn process_batch(
        &self,
        batch: &MessageBatch,
        transport: &BoxedTransport,
    ) -> Vec<DispatchOutcome> {
        if batch.kind != BatchKind::Notify {
            debug!(count = batch.messages.len(), "Ignoring backfill batch");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(batch.messages.len());
        for raw in &batch.messages {
            outcomes.push(self.dispatch(raw, transport).await);
        }
        outcomes
    }

    /// Normalizes and dispatches one raw message.
    pub async fn dispatch(&self, raw: &RawMessage, transport: &BoxedTransport) -> DispatchOutcome {
        let Some(message) = normalize(raw, transport, &self.services.settings) else {
            trace!(id = %raw.key.id, "Message has no usable content");
            return DispatchOutcome::Skipped;
        };

        let span = info_span!("dispatch", chat = %message.chat, id = %message.id());
        self.dispatch_message(Arc::new(message)).instrument(span).await
    }

    /// Runs the gates for an already normalized message.
    pub async fn dispatch_message(&self, message: Arc<NormalizedMessage>) -> DispatchOutcome {
        if let Some(reason) = self.suppression(&message.chat).await {
            debug!(?reason, "Message suppressed");
            return DispatchOutcome::Suppressed(reason);
        }

        if let Some(outcome) = self.sticker_gate(&message).await {
            return outcome;
        }

        if let Some(outcome) = self.prefix_gate(&message).await {
            return outcome;
        }

        DispatchOutcome::Events(self.fan_out(&message).await)
    }

    /// Fires `group_participants` events for a membership change.
    ///
    /// Suppression does not apply: there is no message to suppress.
    pub async fn dispatch_group_update(
        &self,
        update: GroupParticipantsUpdate,
        transport: &BoxedTransport,
    ) -> EventReport {
        let span = info_span!("group_update", group = %update.group, action = update.action.as_str());
        let trigger = EventTrigger::GroupParticipants {
            update: Arc::new(update),
            transport: transport.clone(),
        };

        async {
            let mut report = EventReport::default();
            for event in self.registry.lookup_events(EventKind::GroupParticipants) {
                if let Err(denial) = check_group_update(&event.access) {
                    trace!(unit = %event.unit_id, %denial, "Event skipped");
                    report.denied += 1;
                    continue;
                }
                self.fire(&event, trigger.clone(), &mut report).await;
            }
            report
        }
        .instrument(span)
        .await
    }

    // ─── Gates ───────────────────────────────────────────────────────────────

    /// Store failures are logged and read as "not suppressed".
    async fn suppression(&self, chat: &str) -> Option<Suppression> {
        let state = &self.services.state;

        match state.is_banned(chat).await {
            Ok(true) => return Some(Suppression::Banned),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Cannot read ban list"),
        }

        match state.is_shut_off().await {
            Ok(true) => Some(Suppression::ShutOff),
            Ok(false) => None,
            Err(e) => {
                warn!(error = %e, "Cannot read shut-off flag");
                None
            }
        }
    }

    async fn sticker_gate(&self, message: &Arc<NormalizedMessage>) -> Option<DispatchOutcome> {
        let fingerprint = message.sticker_fingerprint()?;
        let name = match self.services.state.sticker_command(fingerprint).await {
            Ok(name) => name?,
            Err(e) => {
                warn!(error = %e, "Cannot read sticker bindings");
                return None;
            }
        };
        Some(self.run_command(message, &name, String::new(), Trigger::Sticker).await)
    }

    async fn prefix_gate(&self, message: &Arc<NormalizedMessage>) -> Option<DispatchOutcome> {
        let prefix = self
            .services
            .settings
            .prefix
            .as_deref()
            .filter(|p| !p.is_empty())?;
        let rest = message.body.strip_prefix(prefix)?;
        let (name, args) = split_command(rest);
        Some(self.run_command(message, name, args.to_string(), Trigger::Prefix).await)
    }

    // ─── Invocation ──────────────────────────────────────────────────────────

    async fn run_command(
        &self,
        message: &Arc<NormalizedMessage>,
        name: &str,
        args: String,
        trigger: Trigger,
    ) -> DispatchOutcome {
        let Some(command) = self.registry.find_command(name) else {
            debug!(command = %name, ?trigger, "No command matched");
            return DispatchOutcome::Unmatched {
                name: name.to_string(),
                trigger,
            };
        };

        let status = match self.authorize(&command, message).await {
            Err(denial) => {
                debug!(command = %name, %denial, "Command denied");
                CommandStatus::Denied(denial)
            }
            Ok(()) => self.invoke(&command, message, name, args).await,
        };

        DispatchOutcome::Command {
            name: name.to_string(),
            unit_id: command.unit_id.clone(),
            trigger,
            status,
        }
    }

    async fn authorize(&self, command: &Command, message: &NormalizedMessage) -> Result<(), Denial> {
        check_message(&command.access, message, &self.services.settings)?;
        match self.services.state.is_command_disabled(command.pattern()).await {
            Ok(true) => Err(Denial::Disabled),
            Ok(false) => Ok(()),
            Err(e) => {
                warn!(error = %e, "Cannot read command toggles");
                Ok(())
            }
        }
    }

    async fn invoke(
        &self,
        command: &Command,
        message: &Arc<NormalizedMessage>,
        name: &str,
        args: String,
    ) -> CommandStatus {
        info!(command = %name, unit = %command.unit_id, from = %message.push_name, "Running command");

        let ctx = CommandContext {
            message: message.clone(),
            args,
            command: name.to_string(),
            access: command.access,
            services: self.services.clone(),
        };
        let result = AssertUnwindSafe(command.handler.call(ctx)).catch_unwind().await;

        match settle(result) {
            Ok(()) => CommandStatus::Completed,
            Err(e) => {
                error!(command = %name, unit = %command.unit_id, error = %e, "Command failed");
                if let Err(e) = message.send(COMMAND_FAILURE_NOTICE).await {
                    warn!(error = %e, "Failed to send failure notice");
                }
                CommandStatus::Failed
            }
        }
    }

    async fn fan_out(&self, message: &Arc<NormalizedMessage>) -> EventReport {
        let mut events = self.registry.lookup_events(EventKind::All);
        if !message.body.is_empty() {
            events.extend(self.registry.lookup_events(EventKind::Text));
        }
        if message.mention.bot {
            events.extend(self.registry.lookup_events(EventKind::Mention));
        }

        let mut report = EventReport::default();
        for event in events {
            if let Err(denial) = check_message(&event.access, message, &self.services.settings) {
                trace!(unit = %event.unit_id, kind = %event.kind, %denial, "Event skipped");
                report.denied += 1;
                continue;
            }
            self.fire(&event, EventTrigger::Message(message.clone()), &mut report)
                .await;
        }
        report
    }

    async fn fire(&self, event: &Event, trigger: EventTrigger, report: &mut EventReport) {
        let ctx = EventContext {
            trigger,
            services: self.services.clone(),
        };
        report.invoked += 1;

        let result = AssertUnwindSafe(event.handler.call(ctx)).catch_unwind().await;
        if let Err(e) = settle(result) {
            report.failed += 1;
            warn!(unit = %event.unit_id, kind = %event.kind, error = %e, "Event handler failed");
        }
    }
}

/// Splits command text into the name and the argument text.
///
/// The name ends at the first whitespace; the arguments are the rest with
/// leading whitespace removed.
pub fn split_command(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim_start()),
        None => (text, ""),
    }
}

fn settle(result: Result<anyhow::Result<()>, Box<dyn Any + Send>>) -> Result<(), HandlerError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.downcast::<HandlerError>().unwrap_or_else(HandlerError::Failed)),
        Err(panic) => Err(HandlerError::from_panic(panic)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use switchyard_core::{MessageContent, ParticipantAction};

    use super::*;
    use crate::catalog::HandlerCatalog;
    use crate::handler::{command_fn, event_fn};
    use crate::settings::{DispatchSettings, WorkMode};
    use crate::testing::{self, Recorded, RecordingTransport, sticker_message, text_message};
    use crate::unit::{Access, ExtensionUnit, UnitInfo};

    const CHAT: &str = "42@s.whatsapp.net";

    type Calls = Arc<Mutex<Vec<(String, String)>>>;

    /// A command handler that records `(command, args)`.
    fn recording_command(calls: &Calls) -> crate::handler::BoxedCommandHandler {
        let calls = calls.clone();
        command_fn(move |ctx: CommandContext| {
            let calls = calls.clone();
            async move {
                calls.lock().push((ctx.command.clone(), ctx.args.clone()));
                Ok(())
            }
        })
    }

    fn public() -> DispatchSettings {
        DispatchSettings::default().with_mode(WorkMode::Public)
    }

    fn pipeline(settings: DispatchSettings) -> (Pipeline, Arc<RecordingTransport>, BoxedTransport) {
        let registry = Arc::new(Registry::new());
        let services = testing::services(registry, Arc::new(HandlerCatalog::new()), settings);
        let (recording, transport) = testing::transport();
        (Pipeline::new(services), recording, transport)
    }

    fn ping_unit(calls: &Calls, access: Access) -> ExtensionUnit {
        ExtensionUnit::new("core", UnitInfo::new("Core")).with_command(
            Command::new("ping", recording_command(calls))
                .unwrap()
                .with_access(access),
        )
    }

    #[tokio::test]
    async fn test_prefix_command_invoked_once_with_empty_args() {
        let (pipeline, recording, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".ping"), &transport)
            .await;

        assert_eq!(*calls.lock(), vec![("ping".to_string(), String::new())]);
        assert!(matches!(
            outcome,
            DispatchOutcome::Command {
                status: CommandStatus::Completed,
                trigger: Trigger::Prefix,
                ..
            }
        ));
        assert!(recording.calls().is_empty());
    }

    #[tokio::test]
    async fn test_args_and_case_insensitive_name() {
        let (pipeline, _, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));

        pipeline
            .dispatch(&text_message("M1", CHAT, None, ". PING  one two "), &transport)
            .await;

        assert_eq!(*calls.lock(), vec![("PING".to_string(), "one two".to_string())]);
    }

    #[tokio::test]
    async fn test_owner_only_command_refused_silently() {
        let (pipeline, recording, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(
            &calls,
            Access {
                from_me: true,
                ..Default::default()
            },
        ));

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".ping"), &transport)
            .await;

        assert!(calls.lock().is_empty());
        assert!(recording.calls().is_empty());
        assert!(matches!(
            outcome,
            DispatchOutcome::Command {
                status: CommandStatus::Denied(Denial::OwnerOnly),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_private_mode_allows_bot_itself() {
        let (pipeline, _, transport) = pipeline(DispatchSettings::default());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));

        let stranger = text_message("M1", CHAT, None, ".ping");
        let mut own = text_message("M2", CHAT, None, ".ping");
        own.key.from_me = true;

        pipeline.dispatch(&stranger, &transport).await;
        pipeline.dispatch(&own, &transport).await;

        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_banned_chat_is_suppressed() {
        let (pipeline, _, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));
        pipeline.services().state.ban(CHAT).await.unwrap();

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".ping"), &transport)
            .await;

        assert_eq!(outcome, DispatchOutcome::Suppressed(Suppression::Banned));
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_shut_off_suppresses_everything() {
        let (pipeline, _, transport) = pipeline(public());
        pipeline.services().state.set_shut_off(true).await.unwrap();

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, "hello"), &transport)
            .await;
        assert_eq!(outcome, DispatchOutcome::Suppressed(Suppression::ShutOff));
    }

    #[tokio::test]
    async fn test_toggled_off_command_is_denied() {
        let (pipeline, _, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));
        pipeline
            .services()
            .state
            .set_command_enabled("ping", false)
            .await
            .unwrap();

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".Ping"), &transport)
            .await;

        assert!(calls.lock().is_empty());
        assert!(matches!(
            outcome,
            DispatchOutcome::Command {
                status: CommandStatus::Denied(Denial::Disabled),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_command_terminates_without_events() {
        let (pipeline, recording, transport) = pipeline(public());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        pipeline.registry().register(
            ExtensionUnit::new("log", UnitInfo::new("Log")).with_event(Event::new(
                EventKind::All,
                event_fn(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )),
        );

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".nope arg"), &transport)
            .await;

        assert_eq!(
            outcome,
            DispatchOutcome::Unmatched {
                name: "nope".to_string(),
                trigger: Trigger::Prefix
            }
        );
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(recording.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failing_command_sends_notice() {
        let (pipeline, recording, transport) = pipeline(public());
        pipeline.registry().register(
            ExtensionUnit::new("bad", UnitInfo::new("Bad")).with_command(
                Command::new("boom", command_fn(|_| async { anyhow::bail!("kaput") })).unwrap(),
            ),
        );

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".boom"), &transport)
            .await;

        assert!(matches!(
            outcome,
            DispatchOutcome::Command {
                status: CommandStatus::Failed,
                ..
            }
        ));
        assert_eq!(
            recording.sent_texts(),
            vec![(CHAT.to_string(), COMMAND_FAILURE_NOTICE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_panicking_command_is_contained() {
        let (pipeline, recording, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(
            ExtensionUnit::new("bad", UnitInfo::new("Bad"))
                .with_command(
                    Command::new(
                        "panic",
                        command_fn(|_| async {
                            if true {
                                panic!("handler bug");
                            }
                            Ok(())
                        }),
                    )
                    .unwrap(),
                )
                .with_command(Command::new("ping", recording_command(&calls)).unwrap()),
        );

        let first = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".panic"), &transport)
            .await;
        pipeline
            .dispatch(&text_message("M2", CHAT, None, ".ping"), &transport)
            .await;

        assert!(matches!(
            first,
            DispatchOutcome::Command {
                status: CommandStatus::Failed,
                ..
            }
        ));
        assert_eq!(recording.sent_texts().len(), 1);
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sticker_binding_runs_command() {
        let (pipeline, _, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));
        pipeline
            .services()
            .state
            .bind_sticker("c3RpY2tlcg==", "ping")
            .await
            .unwrap();

        let bound = pipeline
            .dispatch(&sticker_message("S1", CHAT, "c3RpY2tlcg=="), &transport)
            .await;
        let unbound = pipeline
            .dispatch(&sticker_message("S2", CHAT, "b3RoZXI="), &transport)
            .await;

        assert_eq!(*calls.lock(), vec![("ping".to_string(), String::new())]);
        assert!(matches!(
            bound,
            DispatchOutcome::Command {
                trigger: Trigger::Sticker,
                status: CommandStatus::Completed,
                ..
            }
        ));
        assert!(matches!(unbound, DispatchOutcome::Events(_)));
    }

    #[tokio::test]
    async fn test_events_fire_in_order_and_survive_failures() {
        let (pipeline, _, transport) = pipeline(public());
        let order = Arc::new(Mutex::new(Vec::new()));

        let log = |tag: &'static str, fail: bool| {
            let order = order.clone();
            event_fn(move |_| {
                let order = order.clone();
                async move {
                    order.lock().push(tag);
                    if fail {
                        anyhow::bail!("{tag} failed");
                    }
                    Ok(())
                }
            })
        };

        pipeline.registry().register(
            ExtensionUnit::new("events", UnitInfo::new("Events"))
                .with_event(Event::new(EventKind::Text, log("text", false)))
                .with_event(Event::new(EventKind::All, log("all-1", true)))
                .with_event(Event::new(EventKind::Mention, log("mention", false)))
                .with_event(Event::new(EventKind::All, log("all-2", false))),
        );

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, "hello"), &transport)
            .await;

        assert_eq!(*order.lock(), vec!["all-1", "all-2", "text"]);
        assert_eq!(
            outcome,
            DispatchOutcome::Events(EventReport {
                invoked: 3,
                failed: 1,
                denied: 0
            })
        );
    }

    #[tokio::test]
    async fn test_mention_events_need_bot_mention() {
        let (pipeline, _, transport) = pipeline(public());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        pipeline.registry().register(
            ExtensionUnit::new("m", UnitInfo::new("M")).with_event(Event::new(
                EventKind::Mention,
                event_fn(move |_| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
            )),
        );

        let mut mentioned = text_message("M1", "9@g.us", Some("42@s.whatsapp.net"), "");
        mentioned.message = Some(MessageContent {
            extended_text_message: Some(switchyard_core::Payload {
                text: Some("@100 hi".into()),
                context_info: Some(switchyard_core::ContextInfo {
                    mentioned_jid: vec!["100@s.whatsapp.net".into()],
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        });

        pipeline
            .dispatch(&text_message("M0", CHAT, None, "plain"), &transport)
            .await;
        pipeline.dispatch(&mentioned, &transport).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_all_events_across_reload() {
        let (pipeline, _, transport) = pipeline(public());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let logger_unit = |seen: &Arc<Mutex<Vec<String>>>| {
            let seen = seen.clone();
            ExtensionUnit::new("logger", UnitInfo::new("Logger")).with_event(Event::new(
                EventKind::All,
                event_fn(move |ctx: EventContext| {
                    let seen = seen.clone();
                    async move {
                        if let Some(message) = ctx.message() {
                            seen.lock().push(message.id().to_string());
                        }
                        Ok(())
                    }
                }),
            ))
        };

        pipeline.registry().register(logger_unit(&seen));
        pipeline
            .dispatch(&text_message("M1", CHAT, None, "one"), &transport)
            .await;
        pipeline.registry().replace(logger_unit(&seen));
        pipeline
            .dispatch(&text_message("M2", CHAT, None, "two"), &transport)
            .await;
        pipeline
            .dispatch(&text_message("M3", CHAT, None, "three"), &transport)
            .await;

        assert_eq!(*seen.lock(), vec!["M1", "M2", "M3"]);
    }

    #[tokio::test]
    async fn test_backfill_batches_are_ignored() {
        let (pipeline, _, transport) = pipeline(public());
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));

        let messages = vec![
            text_message("M1", CHAT, None, ".ping"),
            text_message("M2", CHAT, None, ".ping"),
        ];
        let skipped = pipeline
            .process_batch(&MessageBatch::append(messages.clone()), &transport)
            .await;
        let live = pipeline
            .process_batch(&MessageBatch::notify(messages), &transport)
            .await;

        assert!(skipped.is_empty());
        assert_eq!(live.len(), 2);
        assert_eq!(calls.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_payload_is_skipped() {
        let (pipeline, _, transport) = pipeline(public());
        let mut raw = text_message("M1", CHAT, None, "x");
        raw.message = None;
        assert_eq!(pipeline.dispatch(&raw, &transport).await, DispatchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_disabled_prefix_routes_to_events() {
        let (pipeline, _, transport) = pipeline(public().with_prefix("false"));
        let calls = Calls::default();
        pipeline.registry().register(ping_unit(&calls, Access::default()));

        let outcome = pipeline
            .dispatch(&text_message("M1", CHAT, None, ".ping"), &transport)
            .await;
        assert!(matches!(outcome, DispatchOutcome::Events(_)));
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_group_update_events() {
        let (pipeline, recording, transport) = pipeline(DispatchSettings::default());
        pipeline.registry().register(
            ExtensionUnit::new("greet", UnitInfo::new("Greet"))
                .with_event(
                    Event::new(
                        EventKind::GroupParticipants,
                        event_fn(|ctx: EventContext| async move {
                            let update = ctx.group_update().cloned();
                            if let Some(update) = update {
                                ctx.send(format!("{} {}", update.action.as_str(), update.participants.len()))
                                    .await?;
                            }
                            Ok(())
                        }),
                    )
                    .with_access(Access {
                        only_group: true,
                        ..Default::default()
                    }),
                )
                .with_event(
                    Event::new(EventKind::GroupParticipants, event_fn(|_| async { Ok(()) })).with_access(
                        Access {
                            from_me: true,
                            ..Default::default()
                        },
                    ),
                ),
        );

        let report = pipeline
            .dispatch_group_update(
                GroupParticipantsUpdate {
                    group: "9@g.us".into(),
                    participants: vec!["1@s.whatsapp.net".into()],
                    action: ParticipantAction::Add,
                },
                &transport,
            )
            .await;

        assert_eq!(
            report,
            EventReport {
                invoked: 1,
                failed: 0,
                denied: 1
            }
        );
        assert_eq!(
            recording.calls(),
            vec![Recorded::Send {
                chat: "9@g.us".into(),
                message: "add 1".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_dispatch_completes_only_with_its_handler() {
        let gate = Arc::new(tokio::sync::Notify::new());
        let handler = {
            let gate = gate.clone();
            command_fn(move |_| {
                let gate = gate.clone();
                async move {
                    gate.notified().await;
                    Ok(())
                }
            })
        };
        let (pipeline, _, transport) = pipeline(public());
        pipeline.registry().register(
            ExtensionUnit::new("core", UnitInfo::new("Core"))
                .with_command(Command::new("wait", handler).unwrap()),
        );
        let raw = text_message("M1", CHAT, None, ".wait");

        let mut dispatch = tokio_test::task::spawn(pipeline.dispatch(&raw, &transport));
        tokio_test::assert_pending!(dispatch.poll());

        gate.notify_one();
        assert!(dispatch.is_woken());
        let outcome = tokio_test::assert_ready!(dispatch.poll());
        assert!(matches!(
            outcome,
            DispatchOutcome::Command {
                status: CommandStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("ping"), ("ping", ""));
        assert_eq!(split_command(" alive  set  hi "), ("alive", "set  hi"));
        assert_eq!(split_command("a\nb"), ("a", "b"));
        assert_eq!(split_command(""), ("", ""));
    }
}

//! Handlers that manifests declare inline instead of naming a native handler.
//!
//! - [`ReplyAction`]: sends a `&token` template back to the chat
//! - [`ExecAction`]: runs a shell command and sends its output
//!
//! # Exec protocol
//!
//! The command runs under `sh -c` with a JSON [`ExecPayload`] on stdin.
//!
//! - Exit 0, non-empty stdout → stdout (trimmed) is sent to the chat
//! - Exit 0, empty stdout → nothing is sent
//! - Non-zero exit or timeout → handler failure

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use switchyard_core::OutgoingMessage;

use crate::context::{CommandContext, EventContext, EventTrigger};
use crate::error::HandlerError;
use crate::handler::{CommandHandler, EventHandler};
use crate::message::NormalizedMessage;

/// Default limit for `exec` actions.
pub const DEFAULT_EXEC_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Reply
// =============================================================================

/// Sends a rendered template.
#[derive(Debug, Clone)]
pub struct ReplyAction {
    text: String,
}

impl ReplyAction {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl CommandHandler for ReplyAction {
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()> {
        ctx.send_template(&self.text).await?;
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ReplyAction {
    async fn call(&self, ctx: EventContext) -> anyhow::Result<()> {
        let vars = match &ctx.trigger {
            EventTrigger::Message(message) => ctx.services.message_vars(message),
            EventTrigger::GroupParticipants { update, .. } => ctx
                .services
                .base_vars()
                .with("jid", update.group.as_str())
                .with("action", update.action.as_str()),
        };
        ctx.send(vars.render(&self.text)).await?;
        Ok(())
    }
}

// =============================================================================
// Exec
// =============================================================================

/// Message summary passed to `exec` commands.
#[derive(Debug, Clone, Serialize)]
pub struct ExecMessage<'a> {
    pub id: &'a str,
    pub chat: &'a str,
    pub sender: &'a str,
    pub push_name: &'a str,
    pub body: &'a str,
    pub is_group: bool,
    pub is_creator: bool,
    pub content_type: &'static str,
}

impl<'a> From<&'a NormalizedMessage> for ExecMessage<'a> {
    fn from(message: &'a NormalizedMessage) -> Self {
        Self {
            id: message.id(),
            chat: &message.chat,
            sender: &message.sender,
            push_name: &message.push_name,
            body: &message.body,
            is_group: message.is_group,
            is_creator: message.is_creator,
            content_type: message.content_type.as_str(),
        }
    }
}

/// JSON written to an `exec` command's stdin.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "trigger", rename_all = "snake_case")]
pub enum ExecPayload<'a> {
    Command {
        command: &'a str,
        args: &'a str,
        message: ExecMessage<'a>,
    },
    Event {
        message: ExecMessage<'a>,
    },
    GroupParticipants {
        group: &'a str,
        participants: &'a [String],
        action: &'static str,
    },
}

/// Runs a shell command per invocation.
#[derive(Debug, Clone)]
pub struct ExecAction {
    command: String,
    timeout: Duration,
}

impl ExecAction {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// Runs the command and returns its trimmed stdout.
    pub async fn run(&self, payload: &ExecPayload<'_>) -> anyhow::Result<String> {
        let payload_json = serde_json::to_string(payload).context("failed to serialize payload")?;

        debug!(command = %self.command, payload_len = payload_json.len(), "Spawning exec action");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", self.command))?;

        // The payload is fed while the command runs, under the same deadline:
        // a command that never reads stdin must not stall the write.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(payload_json.as_bytes()).await {
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };
        let completed = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed?;
            output
        };

        let output = tokio::time::timeout(self.timeout, completed)
            .await
            .map_err(|_| HandlerError::TimedOut {
                command: self.command.clone(),
                secs: self.timeout.as_secs(),
            })?
            .with_context(|| format!("'{}' failed to complete", self.command))?;

        if !output.status.success() {
            return Err(HandlerError::Exit {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CommandHandler for ExecAction {
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()> {
        let payload = ExecPayload::Command {
            command: &ctx.command,
            args: &ctx.args,
            message: ExecMessage::from(ctx.message.as_ref()),
        };
        let stdout = self.run(&payload).await?;
        if !stdout.is_empty() {
            ctx.send(stdout).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl EventHandler for ExecAction {
    async fn call(&self, ctx: EventContext) -> anyhow::Result<()> {
        let stdout = match &ctx.trigger {
            EventTrigger::Message(message) => {
                let payload = ExecPayload::Event {
                    message: ExecMessage::from(message.as_ref()),
                };
                self.run(&payload).await?
            }
            EventTrigger::GroupParticipants { update, .. } => {
                let payload = ExecPayload::GroupParticipants {
                    group: &update.group,
                    participants: &update.participants,
                    action: update.action.as_str(),
                };
                self.run(&payload).await?
            }
        };
        if !stdout.is_empty() {
            ctx.send(OutgoingMessage::text(stdout)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> ExecPayload<'static> {
        ExecPayload::GroupParticipants {
            group: "1@g.us",
            participants: &[],
            action: "add",
        }
    }

    #[tokio::test]
    async fn test_exec_reads_stdin() {
        let action = ExecAction::new("cat", DEFAULT_EXEC_TIMEOUT);
        let out = action.run(&payload()).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["trigger"], "group_participants");
        assert_eq!(json["group"], "1@g.us");
    }

    #[tokio::test]
    async fn test_exec_nonzero_exit_fails() {
        let action = ExecAction::new("echo boom >&2; exit 3", DEFAULT_EXEC_TIMEOUT);
        let err = action.run(&payload()).await.unwrap_err();
        let handler_err = err.downcast_ref::<HandlerError>().unwrap();
        assert!(matches!(handler_err, HandlerError::Exit { stderr, .. } if stderr == "boom"));
    }

    fn crowd(size: usize) -> Vec<String> {
        (0..size).map(|i| format!("{i:012}@s.whatsapp.net")).collect()
    }

    #[tokio::test]
    async fn test_exec_large_payload_fully_delivered() {
        let participants = crowd(20_000);
        let payload = ExecPayload::GroupParticipants {
            group: "1@g.us",
            participants: &participants,
            action: "add",
        };
        let expected = serde_json::to_string(&payload).unwrap().len();
        assert!(expected > 64 * 1024);

        let action = ExecAction::new("wc -c", DEFAULT_EXEC_TIMEOUT);
        let out = action.run(&payload).await.unwrap();
        assert_eq!(out.trim().parse::<usize>().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_exec_timeout_covers_unread_stdin() {
        let participants = crowd(20_000);
        let payload = ExecPayload::GroupParticipants {
            group: "1@g.us",
            participants: &participants,
            action: "add",
        };
        let action = ExecAction::new("sleep 3", Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = action.run(&payload).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(matches!(
            err.downcast_ref::<HandlerError>(),
            Some(HandlerError::TimedOut { .. })
        ));
    }

    #[tokio::test]
    async fn test_exec_timeout() {
        let action = ExecAction::new("sleep 5", Duration::from_millis(100));
        let err = action.run(&payload()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HandlerError>(),
            Some(HandlerError::TimedOut { .. })
        ));
    }
}

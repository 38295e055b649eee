//! Handler traits for commands and events.
//!
//! A handler is anything implementing [`CommandHandler`] or [`EventHandler`].
//! Plain async functions are adapted with [`command_fn`] / [`event_fn`]:
//!
//! ```rust,ignore
//! use switchyard_framework::handler::command_fn;
//!
//! let ping = command_fn(|ctx: CommandContext| async move {
//!     ctx.reply("Pong!").await?;
//!     Ok(())
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{CommandContext, EventContext};

// ============================================================================
// Handler Traits
// ============================================================================

/// Body of a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command. An error is logged and reported to the chat.
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()>;
}

/// Body of a passive event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Runs the event. An error is logged and otherwise ignored.
    async fn call(&self, ctx: EventContext) -> anyhow::Result<()>;
}

/// Shared command handler.
pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

/// Shared event handler.
pub type BoxedEventHandler = Arc<dyn EventHandler>;

// ============================================================================
// Function Wrappers
// ============================================================================

/// Adapts an async function into a [`CommandHandler`].
pub struct CommandFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> CommandHandler for CommandFn<F>
where
    F: Fn(CommandContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()> {
        (self.f)(ctx).await
    }
}

/// Adapts an async function into an [`EventHandler`].
pub struct EventFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> EventHandler for EventFn<F>
where
    F: Fn(EventContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn call(&self, ctx: EventContext) -> anyhow::Result<()> {
        (self.f)(ctx).await
    }
}

/// Wraps an async function as a shared command handler.
pub fn command_fn<F, Fut>(f: F) -> BoxedCommandHandler
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(CommandFn { f })
}

/// Wraps an async function as a shared event handler.
pub fn event_fn<F, Fut>(f: F) -> BoxedEventHandler
where
    F: Fn(EventContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(EventFn { f })
}

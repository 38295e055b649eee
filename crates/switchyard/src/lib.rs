//! # Switchyard
//!
//! A message router for chat bots. Incoming messages are normalized, checked
//! against the ban list, shut-off flag and work mode, and dispatched to
//! extension units loaded from TOML manifests.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌─────────┐     ┌──────────┐     ┌──────────────────────────┐
//! │ Connector │────▶│ Runtime │────▶│ Pipeline │────▶│ unit "core"  (commands)  │
//! │ (adapter) │     │ (bridge)│     │          │────▶│ unit "admin" (commands)  │
//! └───────────┘     └─────────┘     └──────────┘────▶│ unit ...     (events)    │
//!                                                    └──────────────────────────┘
//! ```
//!
//! - **Core** ([`core`]): transport vocabulary, identifiers, persisted state
//! - **Framework** ([`framework`]): units, registry, loader, dispatch pipeline
//! - **Runtime** ([`runtime`]): configuration, logging, session bridge, greetings
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = HandlerCatalog::new();
//!     catalog.add_command("hello.world", command_fn(|ctx| async move {
//!         ctx.reply("hello").await?;
//!         Ok(())
//!     }));
//!
//!     let runtime = Runtime::builder().catalog(catalog).build()?;
//!     runtime.run(ConsoleConnector::stdio(ConsoleConfig::default())).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `builtin`: `core.*` / `admin.*` native handlers (default)
//! - `toml-config` / `yaml-config`: configuration file formats
//! - `json-log`: JSON log output
//! - `console`: the console connector (default)

pub use switchyard_core as core;
pub use switchyard_framework as framework;
pub use switchyard_runtime as runtime;

#[cfg(feature = "console")]
pub use switchyard_adapter_console as console;

/// Common imports for building a bot.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use switchyard_runtime::{Runtime, RuntimeBuilder, SwitchyardConfig};

    // Handlers and their contexts
    pub use switchyard_framework::{
        CommandContext, EventContext, HandlerCatalog, NormalizedMessage, command_fn, event_fn,
    };

    // Management
    pub use switchyard_framework::{ControlSurface, WorkMode};

    // Transport vocabulary
    pub use switchyard_core::{Connector, OutgoingMessage, Transport};

    #[cfg(feature = "console")]
    pub use switchyard_adapter_console::{ConsoleConfig, ConsoleConnector};
}

//! # Switchyard Framework
//!
//! The routing core: extension units, their registry, the manifest loader,
//! message normalization and the dispatch pipeline.
//!
//! ```text
//!  modules/*.toml ──▶ Loader ──▶ Registry ◀── ControlSurface
//!                       ▲           │
//!               HandlerCatalog      ▼ lookups
//!  RawMessage ──▶ normalize ──▶ Pipeline ──▶ CommandHandler / EventHandler
//! ```
//!
//! - [`unit`]: [`ExtensionUnit`], [`Command`], [`Event`]
//! - [`registry`]: pattern, event-type and category views, updated atomically
//! - [`loader`]: discovery and (re)materialization of TOML manifests
//! - [`normalizer`]: raw transport message to [`NormalizedMessage`]
//! - [`pipeline`]: suppression, sticker and prefix gates, event fan-out
//! - [`control`]: list, stats and reload for management layers

pub mod actions;
pub mod catalog;
pub mod context;
pub mod control;
pub mod error;
pub mod handler;
pub mod loader;
pub mod manifest;
pub mod message;
pub mod normalizer;
pub mod permission;
pub mod pipeline;
pub mod registry;
pub mod settings;
pub mod template;
pub mod unit;

#[cfg(feature = "builtin")]
pub mod builtin;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::HandlerCatalog;
pub use context::{AdminCheck, CommandContext, EventContext, EventTrigger, Services};
pub use control::{ControlSurface, UnitSummary};
pub use error::{HandlerError, LoadError, LoadResult, PatternError, ReloadError, ReloadResult};
pub use handler::{
    BoxedCommandHandler, BoxedEventHandler, CommandHandler, EventHandler, command_fn, event_fn,
};
pub use loader::{LoadSummary, Loader, ReloadReport};
pub use message::{MediaFlags, Mention, MessageActions, NormalizedMessage, QuotedMessage};
pub use normalizer::normalize;
pub use permission::Denial;
pub use pipeline::{
    COMMAND_FAILURE_NOTICE, CommandStatus, DispatchOutcome, EventReport, Pipeline, Suppression,
    Trigger,
};
pub use registry::{Menu, MenuCategory, MenuEntry, Registry, RegistryStats};
pub use settings::{DispatchSettings, WorkMode, parse_prefix};
pub use template::TemplateVars;
pub use unit::{Access, Command, Event, EventKind, ExtensionUnit, UnitInfo};

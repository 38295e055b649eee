//! Named native handlers that manifests can refer to.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::handler::{BoxedCommandHandler, BoxedEventHandler};

/// Lookup table from handler name to Rust handler.
///
/// Commands and events are separate namespaces. Registering a name twice
/// replaces the earlier handler; units loaded afterwards pick up the new one.
#[derive(Default)]
pub struct HandlerCatalog {
    commands: RwLock<HashMap<String, BoxedCommandHandler>>,
    events: RwLock<HashMap<String, BoxedEventHandler>>,
}

impl HandlerCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&self, name: impl Into<String>, handler: BoxedCommandHandler) -> &Self {
        self.commands.write().insert(name.into(), handler);
        self
    }

    pub fn add_event(&self, name: impl Into<String>, handler: BoxedEventHandler) -> &Self {
        self.events.write().insert(name.into(), handler);
        self
    }

    pub fn command(&self, name: &str) -> Option<BoxedCommandHandler> {
        self.commands.read().get(name).cloned()
    }

    pub fn event(&self, name: &str) -> Option<BoxedEventHandler> {
        self.events.read().get(name).cloned()
    }

    /// Sorted names of all command handlers.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.commands.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted names of all event handlers.
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.events.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerCatalog")
            .field("commands", &self.command_names())
            .field("events", &self.event_names())
            .finish()
    }
}

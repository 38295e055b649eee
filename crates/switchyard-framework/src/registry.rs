//! The registry of loaded extension units.
//!
//! [`Registry`] owns four views over the same data:
//!
//! | View | Key | Value |
//! |------|-----|-------|
//! | units | unit id | [`ExtensionUnit`] |
//! | commands | pattern | [`Command`] (last registration wins) |
//! | events | [`EventKind`] | [`Event`]s in registration order |
//! | categories | category name | unit ids in registration order |
//!
//! All four live behind one lock and are updated together, so a concurrent
//! lookup never observes a half-registered or half-removed unit.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::unit::{Command, Event, EventKind, ExtensionUnit};

// =============================================================================
// Views
// =============================================================================

/// Counts reported by [`Registry::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub modules: usize,
    pub commands: usize,
    pub events: usize,
    pub categories: usize,
}

/// One command line in the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub pattern: String,
    pub desc: String,
    pub usage: String,
}

/// One category block in the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuCategory {
    pub name: String,
    pub modules: usize,
    pub commands: Vec<MenuEntry>,
}

/// Read-only summary of the registry, computed on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Menu {
    pub categories: Vec<MenuCategory>,
    pub total_commands: usize,
    pub total_modules: usize,
}

impl Menu {
    /// Renders the menu as chat text.
    ///
    /// `info` is the operator's `owner;botname` string; its first field is
    /// shown as the owner.
    pub fn render(&self, info: &str, version: &str) -> String {
        let owner = info
            .split([';', ',', '|'])
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Switchyard");

        let mut text = String::from("*╭─「 SWITCHYARD 」*\n");
        text.push_str(&format!("*│ Owner: {owner}*\n"));
        text.push_str(&format!("*│ Modules: {}*\n", self.total_modules));
        text.push_str(&format!("*│ Commands: {}*\n", self.total_commands));
        text.push_str(&format!("*│ Version: {version}*\n"));
        text.push_str("*╰────────────────*\n\n");

        for category in &self.categories {
            text.push_str(&format!("*╭─「 {} 」*\n", category.name.to_uppercase()));
            for entry in &category.commands {
                text.push_str(&format!("*│* `{}`\n", entry.pattern));
                text.push_str(&format!("*│* _{}_\n", entry.desc));
            }
            text.push_str("*╰────────────────*\n\n");
        }
        text
    }
}

// =============================================================================
// Registry
// =============================================================================

#[derive(Default)]
struct Inner {
    units: Vec<Arc<ExtensionUnit>>,
    commands: Vec<Arc<Command>>,
    events: HashMap<EventKind, Vec<Arc<Event>>>,
    categories: Vec<(String, Vec<String>)>,
}

impl Inner {
    fn insert(&mut self, unit: ExtensionUnit) {
        for command in &unit.commands {
            let command = Arc::new(command.clone());
            match self
                .commands
                .iter_mut()
                .find(|c| c.pattern() == command.pattern())
            {
                Some(slot) => {
                    debug!(
                        pattern = %command.pattern(),
                        previous = %slot.unit_id,
                        unit = %unit.id,
                        "Command pattern overwritten"
                    );
                    *slot = command;
                }
                None => self.commands.push(command),
            }
        }

        for event in &unit.events {
            self.events
                .entry(event.kind)
                .or_default()
                .push(Arc::new(event.clone()));
        }

        if let Some(category) = &unit.info.category {
            match self.categories.iter_mut().find(|(name, _)| name == category) {
                Some((_, ids)) => ids.push(unit.id.clone()),
                None => self
                    .categories
                    .push((category.clone(), vec![unit.id.clone()])),
            }
        }

        self.units.push(Arc::new(unit));
    }

    fn remove(&mut self, unit_id: &str) -> Option<Arc<ExtensionUnit>> {
        self.commands.retain(|c| c.unit_id != unit_id);

        self.events.retain(|_, events| {
            events.retain(|e| e.unit_id != unit_id);
            !events.is_empty()
        });

        self.categories.retain_mut(|(_, ids)| {
            ids.retain(|id| id != unit_id);
            !ids.is_empty()
        });

        let pos = self.units.iter().position(|u| u.id == unit_id)?;
        Some(self.units.remove(pos))
    }
}

/// Authoritative store of loaded units and their contributions.
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Mutation ────────────────────────────────────────────────────────────

    /// Adds a unit and its contributions.
    ///
    /// A unit already registered under the same id is removed first, in the
    /// same critical section.
    pub fn register(&self, unit: ExtensionUnit) {
        let mut inner = self.inner.write();
        inner.remove(&unit.id);
        inner.insert(unit);
    }

    /// Removes a unit and everything it contributed. Unknown ids are a no-op.
    ///
    /// Returns the removed unit.
    pub fn unregister(&self, unit_id: &str) -> Option<Arc<ExtensionUnit>> {
        self.inner.write().remove(unit_id)
    }

    /// Atomically swaps the unit registered under `unit.id` for `unit`.
    ///
    /// Returns the previous version, if any.
    pub fn replace(&self, unit: ExtensionUnit) -> Option<Arc<ExtensionUnit>> {
        let mut inner = self.inner.write();
        let previous = inner.remove(&unit.id);
        inner.insert(unit);
        previous
    }

    // ─── Lookup ──────────────────────────────────────────────────────────────

    /// The command registered under exactly `pattern`.
    pub fn lookup(&self, pattern: &str) -> Option<Arc<Command>> {
        self.inner
            .read()
            .commands
            .iter()
            .find(|c| c.pattern() == pattern)
            .cloned()
    }

    /// The first command, in registration order, whose pattern matches `name`.
    pub fn find_command(&self, name: &str) -> Option<Arc<Command>> {
        self.inner
            .read()
            .commands
            .iter()
            .find(|c| c.matches(name))
            .cloned()
    }

    /// Events of one kind, in registration order.
    pub fn lookup_events(&self, kind: EventKind) -> Vec<Arc<Event>> {
        self.inner
            .read()
            .events
            .get(&kind)
            .cloned()
            .unwrap_or_default()
    }

    pub fn unit(&self, unit_id: &str) -> Option<Arc<ExtensionUnit>> {
        self.inner
            .read()
            .units
            .iter()
            .find(|u| u.id == unit_id)
            .cloned()
    }

    /// All units, in registration order.
    pub fn units(&self) -> Vec<Arc<ExtensionUnit>> {
        self.inner.read().units.clone()
    }

    /// Registered patterns, in registration order.
    pub fn patterns(&self) -> Vec<String> {
        self.inner
            .read()
            .commands
            .iter()
            .map(|c| c.pattern().to_string())
            .collect()
    }

    // ─── Views ───────────────────────────────────────────────────────────────

    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        RegistryStats {
            modules: inner.units.len(),
            commands: inner.commands.len(),
            events: inner.events.values().map(Vec::len).sum(),
            categories: inner.categories.len(),
        }
    }

    /// Builds the menu from the current contents.
    ///
    /// A command shadowed by a later unit's identical pattern is listed only
    /// under the unit that currently owns the pattern.
    pub fn snapshot(&self) -> Menu {
        let inner = self.inner.read();

        let categories = inner
            .categories
            .iter()
            .map(|(name, ids)| {
                let commands = ids
                    .iter()
                    .filter_map(|id| inner.units.iter().find(|u| &u.id == id))
                    .flat_map(|unit| unit.commands.iter())
                    .filter(|cmd| {
                        inner
                            .commands
                            .iter()
                            .any(|c| c.pattern() == cmd.pattern() && c.unit_id == cmd.unit_id)
                    })
                    .map(|cmd| MenuEntry {
                        pattern: cmd.pattern().to_string(),
                        desc: cmd.desc.clone(),
                        usage: cmd.usage.clone(),
                    })
                    .collect();
                MenuCategory {
                    name: name.clone(),
                    modules: ids.len(),
                    commands,
                }
            })
            .collect();

        Menu {
            categories,
            total_commands: inner.commands.len(),
            total_modules: inner.units.len(),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("stats", &self.stats())
            .finish()
    }
}

//! TOML manifests describing extension units.
//!
//! ```toml
//! [info]
//! name = "Core Commands"
//! category = "core"
//!
//! [[commands]]
//! pattern = "ping"
//! action = { type = "native", name = "core.ping" }
//!
//! [[events]]
//! type = "all"
//! action = { type = "native", name = "core.logger" }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::actions::{DEFAULT_EXEC_TIMEOUT, ExecAction, ReplyAction};
use crate::catalog::HandlerCatalog;
use crate::error::{LoadError, LoadResult};
use crate::handler::{BoxedCommandHandler, BoxedEventHandler};
use crate::unit::{Access, Command, Event, EventKind, ExtensionUnit, UnitInfo};

// =============================================================================
// Schema
// =============================================================================

#[derive(Debug, Deserialize)]
struct Manifest {
    info: Option<InfoSpec>,
    #[serde(default)]
    commands: Vec<CommandSpec>,
    #[serde(default)]
    events: Vec<EventSpec>,
}

#[derive(Debug, Deserialize)]
struct InfoSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommandSpec {
    #[serde(default)]
    pattern: String,
    desc: Option<String>,
    usage: Option<String>,
    #[serde(default)]
    from_me: bool,
    #[serde(default)]
    only_group: bool,
    #[serde(default)]
    only_admin: bool,
    action: ActionSpec,
}

#[derive(Debug, Deserialize)]
struct EventSpec {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    from_me: bool,
    #[serde(default)]
    only_group: bool,
    action: ActionSpec,
}

/// How a command or event body is provided.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionSpec {
    /// A Rust handler from the [`HandlerCatalog`].
    Native { name: String },
    /// A `&token` template sent back to the chat.
    Reply { text: String },
    /// A shell command; see [`ExecAction`].
    Exec {
        command: String,
        timeout_secs: Option<u64>,
    },
}

impl ActionSpec {
    fn timeout(secs: Option<u64>) -> Duration {
        secs.map(Duration::from_secs).unwrap_or(DEFAULT_EXEC_TIMEOUT)
    }

    fn command_handler(&self, unit: &str, catalog: &HandlerCatalog) -> LoadResult<BoxedCommandHandler> {
        match self {
            Self::Native { name } => catalog.command(name).ok_or_else(|| LoadError::UnknownHandler {
                unit: unit.to_string(),
                name: name.clone(),
            }),
            Self::Reply { text } => Ok(Arc::new(ReplyAction::new(text.clone()))),
            Self::Exec {
                command,
                timeout_secs,
            } => Ok(Arc::new(ExecAction::new(command.clone(), Self::timeout(*timeout_secs)))),
        }
    }

    fn event_handler(&self, unit: &str, catalog: &HandlerCatalog) -> LoadResult<BoxedEventHandler> {
        match self {
            Self::Native { name } => catalog.event(name).ok_or_else(|| LoadError::UnknownHandler {
                unit: unit.to_string(),
                name: name.clone(),
            }),
            Self::Reply { text } => Ok(Arc::new(ReplyAction::new(text.clone()))),
            Self::Exec {
                command,
                timeout_secs,
            } => Ok(Arc::new(ExecAction::new(command.clone(), Self::timeout(*timeout_secs)))),
        }
    }
}

// =============================================================================
// Materialisation
// =============================================================================

/// Builds a unit from manifest text.
///
/// `path` is recorded as the unit's source and used in error messages.
pub fn materialize(
    id: &str,
    path: &Path,
    text: &str,
    catalog: &HandlerCatalog,
) -> LoadResult<ExtensionUnit> {
    let manifest: Manifest = toml::from_str(text).map_err(|e| LoadError::parse(path, e))?;

    let info = manifest
        .info
        .filter(|info| !info.name.trim().is_empty())
        .ok_or_else(|| LoadError::MissingName {
            unit: id.to_string(),
        })?;

    let mut unit = ExtensionUnit::new(
        id,
        UnitInfo {
            name: info.name,
            description: info.description,
            version: info.version,
            category: info.category.filter(|c| !c.trim().is_empty()),
        },
    )
    .with_source(path);

    for (index, spec) in manifest.commands.iter().enumerate() {
        let handler = spec.action.command_handler(id, catalog)?;
        let mut command =
            Command::new(spec.pattern.as_str(), handler).map_err(|source| LoadError::InvalidPattern {
                unit: id.to_string(),
                index,
                source,
            })?;
        if let Some(desc) = &spec.desc {
            command = command.with_desc(desc.as_str());
        }
        if let Some(usage) = &spec.usage {
            command = command.with_usage(usage.as_str());
        }
        unit = unit.with_command(command.with_access(Access {
            from_me: spec.from_me,
            only_group: spec.only_group,
            only_admin: spec.only_admin,
        }));
    }

    for spec in &manifest.events {
        let kind: EventKind = spec.kind.parse().map_err(|kind| LoadError::UnknownEventType {
            unit: id.to_string(),
            kind,
        })?;
        let handler = spec.action.event_handler(id, catalog)?;
        unit = unit.with_event(Event::new(kind, handler).with_access(Access {
            from_me: spec.from_me,
            only_group: spec.only_group,
            only_admin: false,
        }));
    }

    Ok(unit)
}

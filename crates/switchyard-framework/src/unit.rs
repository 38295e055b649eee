//! Extension units and the commands and events they contribute.
//!
//! An [`ExtensionUnit`] is the unit of loading and reloading. Its commands and
//! events carry the owning unit's id, so the registry can purge everything a
//! unit contributed in one pass.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::PatternError;
use crate::handler::{BoxedCommandHandler, BoxedEventHandler};

// =============================================================================
// Metadata
// =============================================================================

/// Descriptive metadata of a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    /// Menu section; uncategorised units are not listed in the menu.
    #[serde(default)]
    pub category: Option<String>,
}

impl UnitInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Permission flags shared by commands and events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Access {
    /// Caller must be an owner.
    pub from_me: bool,
    /// Chat must be a group.
    pub only_group: bool,
    /// Bot must be a group admin. Checked by the handler itself, through
    /// [`CommandContext::check_group_admin`](crate::CommandContext::check_group_admin).
    pub only_admin: bool,
}

// =============================================================================
// Command
// =============================================================================

/// A pattern-triggered action.
#[derive(Clone)]
pub struct Command {
    pattern: String,
    matcher: Regex,
    pub desc: String,
    pub usage: String,
    pub access: Access,
    /// Set when the command is added to a unit.
    pub unit_id: String,
    pub handler: BoxedCommandHandler,
}

impl Command {
    /// Creates a command. The pattern is a literal, matched case-insensitively
    /// against a whole command name.
    pub fn new(pattern: impl Into<String>, handler: BoxedCommandHandler) -> Result<Self, PatternError> {
        let pattern = pattern.into();
        if pattern.trim().is_empty() {
            return Err(PatternError::Empty);
        }
        let matcher = RegexBuilder::new(&format!("^(?:{})$", regex::escape(&pattern)))
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            desc: "No description".to_string(),
            usage: pattern.clone(),
            pattern,
            matcher,
            access: Access::default(),
            unit_id: String::new(),
            handler,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns `true` if `name` selects this command.
    pub fn matches(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = desc.into();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Restricts the command to owners.
    pub fn owner_only(mut self) -> Self {
        self.access.from_me = true;
        self
    }

    pub fn group_only(mut self) -> Self {
        self.access.only_group = true;
        self
    }

    /// Requires the bot to hold admin in the group.
    pub fn admin_only(mut self) -> Self {
        self.access.only_admin = true;
        self
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("pattern", &self.pattern)
            .field("unit_id", &self.unit_id)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Event
// =============================================================================

/// The closed set of event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Every dispatched message.
    All,
    /// Messages with a non-empty body.
    Text,
    /// Messages that mention the bot.
    Mention,
    /// Group membership changes.
    GroupParticipants,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Text => "text",
            Self::Mention => "mention",
            Self::GroupParticipants => "group_participants",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "text" => Ok(Self::Text),
            "mention" => Ok(Self::Mention),
            "group_participants" => Ok(Self::GroupParticipants),
            other => Err(other.to_string()),
        }
    }
}

/// A condition-triggered action.
#[derive(Clone)]
pub struct Event {
    pub kind: EventKind,
    pub access: Access,
    /// Set when the event is added to a unit.
    pub unit_id: String,
    pub handler: BoxedEventHandler,
}

impl Event {
    pub fn new(kind: EventKind, handler: BoxedEventHandler) -> Self {
        Self {
            kind,
            access: Access::default(),
            unit_id: String::new(),
            handler,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("kind", &self.kind)
            .field("unit_id", &self.unit_id)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ExtensionUnit
// =============================================================================

/// A loaded extension.
#[derive(Debug, Clone)]
pub struct ExtensionUnit {
    pub id: String,
    /// Manifest the unit was read from; `None` for units built in code.
    pub source: Option<PathBuf>,
    pub info: UnitInfo,
    pub commands: Vec<Command>,
    pub events: Vec<Event>,
}

impl ExtensionUnit {
    pub fn new(id: impl Into<String>, info: UnitInfo) -> Self {
        Self {
            id: id.into(),
            source: None,
            info,
            commands: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a command, stamping it with this unit's id.
    pub fn with_command(mut self, mut command: Command) -> Self {
        command.unit_id = self.id.clone();
        self.commands.push(command);
        self
    }

    /// Adds an event, stamping it with this unit's id.
    pub fn with_event(mut self, mut event: Event) -> Self {
        event.unit_id = self.id.clone();
        self.events.push(event);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::command_fn;

    fn noop() -> BoxedCommandHandler {
        command_fn(|_| async { Ok(()) })
    }

    #[test]
    fn test_pattern_is_case_insensitive_whole_token() {
        let cmd = Command::new("ping", noop()).unwrap();
        assert!(cmd.matches("PING"));
        assert!(cmd.matches("Ping"));
        assert!(!cmd.matches("pingx"));
        assert!(!cmd.matches("xping"));
        assert!(!cmd.matches(""));
    }

    #[test]
    fn test_pattern_is_literal() {
        let cmd = Command::new("a.b|c", noop()).unwrap();
        assert!(cmd.matches("A.B|C"));
        assert!(!cmd.matches("axb|c"));
        assert!(!cmd.matches("c"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(Command::new("  ", noop()), Err(PatternError::Empty)));
    }

    #[test]
    fn test_defaults_and_unit_stamp() {
        let unit = ExtensionUnit::new("core", UnitInfo::new("Core"))
            .with_command(Command::new("menu", noop()).unwrap());
        let cmd = &unit.commands[0];
        assert_eq!(cmd.desc, "No description");
        assert_eq!(cmd.usage, "menu");
        assert_eq!(cmd.unit_id, "core");
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("mention".parse::<EventKind>(), Ok(EventKind::Mention));
        assert_eq!(
            "group_participants".parse::<EventKind>(),
            Ok(EventKind::GroupParticipants)
        );
        assert_eq!("typing".parse::<EventKind>(), Err("typing".to_string()));
    }
}

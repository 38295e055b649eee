//! Configuration for the console adapter.
//!
//! ```toml
//! self_id = "100@s.whatsapp.net"
//! sender = "15550001@s.whatsapp.net"
//! push_name = "Console"
//! # Messages appear in this group instead of a private chat.
//! group = "120363000000000001@g.us"
//! group_subject = "Console Group"
//! ```

use serde::{Deserialize, Serialize};

/// Console adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Identifier of the bot account.
    pub self_id: String,

    /// Identifier typed lines are sent from.
    pub sender: String,

    /// Display name attached to typed lines.
    pub push_name: String,

    /// Group chat to simulate; `None` means a private chat with the bot.
    pub group: Option<String>,

    /// Subject reported as group metadata.
    pub group_subject: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            self_id: "100@s.whatsapp.net".to_string(),
            sender: "15550001@s.whatsapp.net".to_string(),
            push_name: "Console".to_string(),
            group: None,
            group_subject: "Console Group".to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = sender.into();
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// The chat typed lines are delivered in.
    pub fn chat(&self) -> &str {
        self.group.as_deref().unwrap_or(&self.sender)
    }
}

//! Operator settings read by the normalizer and the pipeline.

use serde::{Deserialize, Serialize};

use switchyard_core::jid;

/// Who may use the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkMode {
    /// Anyone.
    Public,
    /// Owners only.
    #[default]
    Private,
}

impl WorkMode {
    /// Returns `true` if non-owners are refused.
    pub fn is_restrictive(&self) -> bool {
        matches!(self, Self::Private)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

/// Parses an operator prefix setting.
///
/// Blank, `"false"` and `"null"` disable prefix commands. A bracketed form
/// such as `"^[.]"` selects the first character inside the brackets.
pub fn parse_prefix(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "false" || raw == "null" {
        return None;
    }
    if let Some(open) = raw.find('[')
        && raw[open..].contains(']')
    {
        return raw[open + 1..]
            .chars()
            .next()
            .filter(|c| *c != ']')
            .map(String::from);
    }
    Some(raw.to_string())
}

/// Settings consumed by dispatch.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Command prefix; `None` disables the prefix gate.
    pub prefix: Option<String>,
    pub mode: WorkMode,
    /// Normalised owner identifiers, excluding the bot itself.
    pub owners: Vec<String>,
    /// Menu header info (`owner;botname`).
    pub info: String,
    /// Version shown in the menu and templates.
    pub version: String,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            prefix: Some(".".to_string()),
            mode: WorkMode::default(),
            owners: Vec::new(),
            info: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl DispatchSettings {
    pub fn with_prefix(mut self, raw: &str) -> Self {
        self.prefix = parse_prefix(raw);
        self
    }

    pub fn with_mode(mut self, mode: WorkMode) -> Self {
        self.mode = mode;
        self
    }

    /// Adds owner entries; bare numbers gain the user server suffix.
    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.owners
            .extend(owners.into_iter().filter_map(|o| jid::owner_jid(o.as_ref())));
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// The bot's own identifier followed by the configured owners.
    pub fn owner_set(&self, bot_id: &str) -> Vec<String> {
        std::iter::once(bot_id.to_string())
            .chain(self.owners.iter().cloned())
            .collect()
    }
}

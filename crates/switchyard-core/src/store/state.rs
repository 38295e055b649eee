use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::StateStore;
use crate::error::{StoreError, StoreResult};

/// Alive text used until an owner sets one.
pub const DEFAULT_ALIVE_TEXT: &str = "_hey I am alive now &sender_";

const BAN_KEY: &str = "ban";
const SHUTOFF_KEY: &str = "shutoff";
const TOGGLE_KEY: &str = "toggle";
const STICKER_KEY: &str = "sticker_cmd";
const ALIVE_KEY: &str = "alive";
const GREETINGS_KEY: &str = "greetings";

/// Which greeting to send on a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GreetingKind {
    Welcome,
    Exit,
}

/// A per-group greeting template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Greeting {
    pub enabled: bool,
    pub message: String,
}

/// Both greetings of one group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupGreetings {
    pub welcome: Option<Greeting>,
    pub exit: Option<Greeting>,
}

impl GroupGreetings {
    pub fn get(&self, kind: GreetingKind) -> Option<&Greeting> {
        match kind {
            GreetingKind::Welcome => self.welcome.as_ref(),
            GreetingKind::Exit => self.exit.as_ref(),
        }
    }

    fn slot(&mut self, kind: GreetingKind) -> &mut Option<Greeting> {
        match kind {
            GreetingKind::Welcome => &mut self.welcome,
            GreetingKind::Exit => &mut self.exit,
        }
    }
}

/// Typed view over a [`StateStore`].
///
/// Read-modify-write operations are serialised through an internal lock, so
/// two concurrent `ban` calls never lose an entry.
#[derive(Clone)]
pub struct BotState {
    store: Arc<dyn StateStore>,
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for BotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotState").finish_non_exhaustive()
    }
}

impl BotState {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying store, for keys this type does not model.
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    async fn load<T: DeserializeOwned + Default>(&self, key: &str) -> StoreResult<T> {
        match self.store.get(key).await? {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(value) => {
                serde_json::from_value(value).map_err(|e| StoreError::malformed(key, e))
            }
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(|e| StoreError::malformed(key, e))?;
        self.store.set(key, value).await
    }

    // -------------------------------------------------------------------------
    // Ban list
    // -------------------------------------------------------------------------

    pub async fn is_banned(&self, chat: &str) -> StoreResult<bool> {
        let banned: Vec<String> = self.load(BAN_KEY).await?;
        Ok(banned.iter().any(|c| c == chat))
    }

    /// Adds `chat` to the ban list. Returns `false` if it was already banned.
    pub async fn ban(&self, chat: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut banned: Vec<String> = self.load(BAN_KEY).await?;
        if banned.iter().any(|c| c == chat) {
            return Ok(false);
        }
        banned.push(chat.to_string());
        self.save(BAN_KEY, &banned).await?;
        Ok(true)
    }

    /// Removes `chat` from the ban list. Returns `false` if it was not banned.
    pub async fn unban(&self, chat: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut banned: Vec<String> = self.load(BAN_KEY).await?;
        let before = banned.len();
        banned.retain(|c| c != chat);
        if banned.len() == before {
            return Ok(false);
        }
        self.save(BAN_KEY, &banned).await?;
        Ok(true)
    }

    pub async fn banned(&self) -> StoreResult<Vec<String>> {
        self.load(BAN_KEY).await
    }

    // -------------------------------------------------------------------------
    // Shut-off flag
    // -------------------------------------------------------------------------

    pub async fn is_shut_off(&self) -> StoreResult<bool> {
        self.load(SHUTOFF_KEY).await
    }

    pub async fn set_shut_off(&self, off: bool) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save(SHUTOFF_KEY, &off).await
    }

    // -------------------------------------------------------------------------
    // Command toggles
    // -------------------------------------------------------------------------

    /// Returns `true` if `name` was switched off. Names compare case-insensitively.
    pub async fn is_command_disabled(&self, name: &str) -> StoreResult<bool> {
        let toggles: BTreeMap<String, bool> = self.load(TOGGLE_KEY).await?;
        Ok(toggles.get(&name.to_lowercase()) == Some(&false))
    }

    pub async fn set_command_enabled(&self, name: &str, enabled: bool) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut toggles: BTreeMap<String, bool> = self.load(TOGGLE_KEY).await?;
        if enabled {
            toggles.remove(&name.to_lowercase());
        } else {
            toggles.insert(name.to_lowercase(), false);
        }
        self.save(TOGGLE_KEY, &toggles).await
    }

    // -------------------------------------------------------------------------
    // Sticker bindings
    // -------------------------------------------------------------------------

    /// Command name bound to a media fingerprint.
    pub async fn sticker_command(&self, fingerprint: &str) -> StoreResult<Option<String>> {
        let bindings: BTreeMap<String, String> = self.load(STICKER_KEY).await?;
        Ok(bindings.get(fingerprint).cloned())
    }

    pub async fn bind_sticker(&self, fingerprint: &str, command: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut bindings: BTreeMap<String, String> = self.load(STICKER_KEY).await?;
        bindings.insert(fingerprint.to_string(), command.to_string());
        self.save(STICKER_KEY, &bindings).await
    }

    /// Returns `false` if no binding existed.
    pub async fn unbind_sticker(&self, fingerprint: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut bindings: BTreeMap<String, String> = self.load(STICKER_KEY).await?;
        if bindings.remove(fingerprint).is_none() {
            return Ok(false);
        }
        self.save(STICKER_KEY, &bindings).await?;
        Ok(true)
    }

    /// Removes every binding to `command`. Returns how many were removed.
    pub async fn unbind_command(&self, command: &str) -> StoreResult<usize> {
        let _guard = self.write_lock.lock().await;
        let mut bindings: BTreeMap<String, String> = self.load(STICKER_KEY).await?;
        let before = bindings.len();
        bindings.retain(|_, bound| !bound.eq_ignore_ascii_case(command));
        let removed = before - bindings.len();
        if removed > 0 {
            self.save(STICKER_KEY, &bindings).await?;
        }
        Ok(removed)
    }

    /// All bindings as `(fingerprint, command)`, ordered by fingerprint.
    pub async fn sticker_bindings(&self) -> StoreResult<Vec<(String, String)>> {
        let bindings: BTreeMap<String, String> = self.load(STICKER_KEY).await?;
        Ok(bindings.into_iter().collect())
    }

    // -------------------------------------------------------------------------
    // Templates
    // -------------------------------------------------------------------------

    pub async fn alive_text(&self) -> StoreResult<String> {
        let text: Option<String> = self.load(ALIVE_KEY).await?;
        Ok(text
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_ALIVE_TEXT.to_string()))
    }

    pub async fn set_alive_text(&self, text: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save(ALIVE_KEY, &text).await
    }

    pub async fn greeting(&self, group: &str, kind: GreetingKind) -> StoreResult<Option<Greeting>> {
        let greetings: BTreeMap<String, GroupGreetings> = self.load(GREETINGS_KEY).await?;
        Ok(greetings.get(group).and_then(|g| g.get(kind)).cloned())
    }

    pub async fn set_greeting(
        &self,
        group: &str,
        kind: GreetingKind,
        greeting: Greeting,
    ) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut greetings: BTreeMap<String, GroupGreetings> = self.load(GREETINGS_KEY).await?;
        *greetings.entry(group.to_string()).or_default().slot(kind) = Some(greeting);
        self.save(GREETINGS_KEY, &greetings).await
    }
}

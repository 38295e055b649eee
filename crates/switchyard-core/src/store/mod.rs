//! Persisted key/value state.
//!
//! # Layers
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`StateStore`] | JSON-valued key/value backend |
//! | [`MemoryStateStore`] | Process-local backend, used in tests and ephemeral bots |
//! | [`JsonFileStateStore`] | Single JSON document on disk, rewritten atomically |
//! | [`BotState`] | Typed accessors for the keys the router reads |

mod file;
mod memory;
mod state;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

pub use file::JsonFileStateStore;
pub use memory::MemoryStateStore;
pub use state::{BotState, DEFAULT_ALIVE_TEXT, Greeting, GreetingKind, GroupGreetings};

/// JSON-valued key/value storage.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Reads a key. Missing keys yield `Ok(None)`.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Writes a key, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Deletes a key. Returns `true` if it existed.
    async fn remove(&self, key: &str) -> StoreResult<bool>;
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex;

use super::StateStore;
use crate::error::{StoreError, StoreResult};

/// [`StateStore`] backed by one JSON object on disk.
///
/// The document is read lazily on first access and cached. Every mutation
/// rewrites the whole file through a sibling temp file and a rename, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct JsonFileStateStore {
    path: PathBuf,
    document: Mutex<Option<Map<String, Value>>>,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> StoreResult<Map<String, Value>> {
        if !fs::try_exists(&self.path).await? {
            return Ok(Map::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::malformed("<document>", "top level is not an object")),
            Err(e) => Err(StoreError::malformed("<document>", e)),
        }
    }

    async fn write_document(&self, document: &Map<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::malformed("<document>", e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;
        fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), keys = document.len(), "State written");
        Ok(())
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let mut guard = self.document.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_document().await?);
        }
        Ok(guard.as_ref().and_then(|doc| doc.get(key).cloned()))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut guard = self.document.lock().await;
        let mut document = match guard.take() {
            Some(doc) => doc,
            None => self.read_document().await?,
        };
        let previous = document.insert(key.to_string(), value);
        let result = self.write_document(&document).await;
        if result.is_err() {
            restore(&mut document, key, previous);
        }
        *guard = Some(document);
        result
    }

    async fn remove(&self, key: &str) -> StoreResult<bool> {
        let mut guard = self.document.lock().await;
        let mut document = match guard.take() {
            Some(doc) => doc,
            None => self.read_document().await?,
        };
        let previous = document.remove(key);
        let existed = previous.is_some();
        let result = if existed {
            self.write_document(&document).await
        } else {
            Ok(())
        };
        if result.is_err() {
            restore(&mut document, key, previous);
        }
        *guard = Some(document);
        result.map(|()| existed)
    }
}

/// Puts `key` back the way it was before a failed write.
fn restore(document: &mut Map<String, Value>, key: &str, previous: Option<Value>) {
    match previous {
        Some(value) => document.insert(key.to_string(), value),
        None => document.remove(key),
    };
}

//! Discovers manifests on disk and registers the units they describe.
//!
//! Discovery (listing `*.toml` in the modules directory) is separate from
//! materialisation (reading and parsing one manifest), so a single unit can be
//! reloaded without touching the others. Manifests are read from disk on every
//! load; nothing is cached between loads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::catalog::HandlerCatalog;
use crate::error::{LoadError, LoadResult, ReloadError, ReloadResult};
use crate::manifest;
use crate::registry::Registry;
use crate::unit::ExtensionUnit;

const MANIFEST_EXTENSION: &str = "toml";

/// Outcome of [`Loader::load_all`].
#[derive(Debug, Default)]
pub struct LoadSummary {
    /// Ids of units registered, in load order.
    pub loaded: Vec<String>,
    /// Sources that failed, with the reason.
    pub failed: Vec<(PathBuf, LoadError)>,
}

/// Outcome of a successful [`Loader::reload`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadReport {
    pub id: String,
    pub name: String,
    pub commands: usize,
    pub events: usize,
}

impl ReloadReport {
    fn of(unit: &ExtensionUnit) -> Self {
        Self {
            id: unit.id.clone(),
            name: unit.info.name.clone(),
            commands: unit.commands.len(),
            events: unit.events.len(),
        }
    }
}

/// Loads manifests from one directory into a [`Registry`].
pub struct Loader {
    dir: PathBuf,
    registry: Arc<Registry>,
    catalog: Arc<HandlerCatalog>,
}

impl Loader {
    pub fn new(dir: impl Into<PathBuf>, registry: Arc<Registry>, catalog: Arc<HandlerCatalog>) -> Self {
        Self {
            dir: dir.into(),
            registry,
            catalog,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn catalog(&self) -> &Arc<HandlerCatalog> {
        &self.catalog
    }

    /// Lists manifest files, sorted by name. Creates the directory if absent.
    pub async fn discover(&self) -> LoadResult<Vec<PathBuf>> {
        let dir_err = |source: std::io::Error| LoadError::Directory {
            path: self.dir.clone(),
            source,
        };

        if !fs::try_exists(&self.dir).await.map_err(dir_err)? {
            fs::create_dir_all(&self.dir).await.map_err(dir_err)?;
            info!(path = %self.dir.display(), "Created modules directory");
        }

        let mut entries = fs::read_dir(&self.dir).await.map_err(dir_err)?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == MANIFEST_EXTENSION) && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Loads every manifest in the directory.
    ///
    /// A failing manifest is logged and skipped; only a directory that cannot
    /// be listed is an error.
    pub async fn load_all(&self) -> LoadResult<LoadSummary> {
        info!(path = %self.dir.display(), "Loading modules");

        let mut summary = LoadSummary::default();
        for path in self.discover().await? {
            match self.load_one(&path).await {
                Ok(id) => summary.loaded.push(id),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to load module");
                    summary.failed.push((path, e));
                }
            }
        }

        let stats = self.registry.stats();
        info!(
            modules = stats.modules,
            commands = stats.commands,
            failed = summary.failed.len(),
            "Modules loaded"
        );
        Ok(summary)
    }

    /// Reads, validates and registers one manifest. Returns the unit id.
    pub async fn load_one(&self, path: &Path) -> LoadResult<String> {
        let unit = self.materialize(path).await?;
        let id = unit.id.clone();
        info!(unit = %id, name = %unit.info.name, commands = unit.commands.len(), "Loaded module");
        self.registry.register(unit);
        Ok(id)
    }

    /// Re-reads a unit's manifest and swaps it in.
    ///
    /// The new version is fully materialised before the old one is removed;
    /// if it fails to load, the old version stays registered.
    pub async fn reload(&self, unit_id: &str) -> ReloadResult<ReloadReport> {
        let current = self
            .registry
            .unit(unit_id)
            .ok_or_else(|| ReloadError::NotFound(unit_id.to_string()))?;
        let source = current
            .source
            .clone()
            .ok_or_else(|| ReloadError::NoSource(unit_id.to_string()))?;

        let unit = self.materialize(&source).await?;
        let report = ReloadReport::of(&unit);
        self.registry.replace(unit);
        info!(unit = %unit_id, commands = report.commands, "Reloaded module");
        Ok(report)
    }

    async fn materialize(&self, path: &Path) -> LoadResult<ExtensionUnit> {
        let id = unit_id(path).ok_or_else(|| LoadError::parse(path, "file name is not valid UTF-8"))?;
        debug!(unit = %id, path = %path.display(), "Reading manifest");
        let text = fs::read_to_string(path).await.map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        manifest::materialize(&id, path, &text, &self.catalog)
    }
}

/// The unit id for a manifest path: its file stem.
pub fn unit_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::command_fn;
    use crate::unit::EventKind;

    const PING: &str = r#"
[info]
name = "Ping"
category = "core"

[[commands]]
pattern = "ping"
action = { type = "native", name = "ping" }

[[events]]
type = "all"
action = { type = "reply", text = "seen" }
"#;

    fn loader(dir: &Path) -> Loader {
        let catalog = Arc::new(HandlerCatalog::new());
        catalog.add_command("ping", command_fn(|_| async { Ok(()) }));
        Loader::new(dir, Arc::new(Registry::new()), catalog)
    }

    #[tokio::test]
    async fn test_load_all_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("modules");
        let loader = loader(&dir);

        let summary = loader.load_all().await.unwrap();
        assert!(dir.is_dir());
        assert!(summary.loaded.is_empty());
    }

    #[tokio::test]
    async fn test_one_bad_manifest_does_not_abort_the_rest() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a_broken.toml"), "[info]\ndescription = \"no name\"").unwrap();
        std::fs::write(tmp.path().join("b_ping.toml"), PING).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let loader = loader(tmp.path());
        let summary = loader.load_all().await.unwrap();

        assert_eq!(summary.loaded, vec!["b_ping"]);
        assert_eq!(summary.failed.len(), 1);
        assert!(matches!(summary.failed[0].1, LoadError::MissingName { .. }));
        assert!(loader.registry().lookup("ping").is_some());
    }

    #[tokio::test]
    async fn test_reload_observes_edits() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("core.toml");
        std::fs::write(&path, PING).unwrap();

        let loader = loader(tmp.path());
        loader.load_all().await.unwrap();

        std::fs::write(&path, PING.replace("pattern = \"ping\"", "pattern = \"pong\"")).unwrap();
        let report = loader.reload("core").await.unwrap();

        assert_eq!(report.commands, 1);
        assert!(loader.registry().lookup("ping").is_none());
        assert!(loader.registry().lookup("pong").is_some());
        assert_eq!(loader.registry().lookup_events(EventKind::All).len(), 1);
    }

    #[tokio::test]
    async fn test_reload_twice_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("core.toml"), PING).unwrap();
        let loader = loader(tmp.path());
        loader.load_all().await.unwrap();

        let registry = loader.registry();
        let before = (registry.patterns(), registry.stats(), registry.snapshot());
        loader.reload("core").await.unwrap();
        loader.reload("core").await.unwrap();
        let after = (registry.patterns(), registry.stats(), registry.snapshot());
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_reload_unknown_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = loader(tmp.path());
        assert!(matches!(
            loader.reload("ghost").await,
            Err(ReloadError::NotFound(id)) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_version() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("core.toml");
        std::fs::write(&path, PING).unwrap();
        let loader = loader(tmp.path());
        loader.load_all().await.unwrap();

        std::fs::write(&path, "[info\n").unwrap();
        assert!(matches!(
            loader.reload("core").await,
            Err(ReloadError::Load(LoadError::Parse { .. }))
        ));
        assert!(loader.registry().lookup("ping").is_some());
    }
}

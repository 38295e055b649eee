//! Operations exposed to an external management layer (HTTP, CLI, chat).

use std::sync::Arc;

use serde::Serialize;

use crate::error::ReloadResult;
use crate::loader::{Loader, ReloadReport};
use crate::registry::{Menu, Registry, RegistryStats};

/// One row of [`ControlSurface::list_units`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub category: Option<String>,
    pub command_count: usize,
}

/// Management handle over the registry and loader.
///
/// Cheap to clone; every clone sees the same registry.
#[derive(Clone)]
pub struct ControlSurface {
    registry: Arc<Registry>,
    loader: Arc<Loader>,
}

impl ControlSurface {
    pub fn new(loader: Arc<Loader>) -> Self {
        Self {
            registry: loader.registry().clone(),
            loader,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn loader(&self) -> &Arc<Loader> {
        &self.loader
    }

    /// Loaded units, in registration order.
    pub fn list_units(&self) -> Vec<UnitSummary> {
        self.registry
            .units()
            .iter()
            .map(|unit| UnitSummary {
                id: unit.id.clone(),
                name: unit.info.name.clone(),
                description: unit.info.description.clone(),
                version: unit.info.version.clone(),
                category: unit.info.category.clone(),
                command_count: unit.commands.len(),
            })
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Re-reads one unit from its source.
    ///
    /// Returns [`ReloadError::NotFound`](crate::error::ReloadError::NotFound)
    /// for an unknown id.
    pub async fn reload_unit(&self, unit_id: &str) -> ReloadResult<ReloadReport> {
        self.loader.reload(unit_id).await
    }

    pub fn menu(&self) -> Menu {
        self.registry.snapshot()
    }
}

impl std::fmt::Debug for ControlSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSurface")
            .field("modules_dir", &self.loader.dir())
            .field("stats", &self.registry.stats())
            .finish()
    }
}

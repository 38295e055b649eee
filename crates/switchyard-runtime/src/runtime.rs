//! The runtime entry point.
//!
//! ```rust,ignore
//! use switchyard_runtime::Runtime;
//!
//! let runtime = Runtime::builder()
//!     .config_file("switchyard.toml")
//!     .build()?;
//! runtime.run(MyConnector::new()).await?;
//! ```
//!
//! Building loads the configuration, installs logging and wires the registry,
//! loader, state store and pipeline together. [`Runtime::run`] loads the
//! modules directory, then drives sessions until Ctrl+C or SIGTERM.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use switchyard_core::{BotState, Connector, JsonFileStateStore, StateStore};
use switchyard_framework::{
    ControlSurface, HandlerCatalog, LoadSummary, Loader, Pipeline, Registry, Services,
};

use crate::bridge::SessionBridge;
use crate::config::{ConfigLoader, SwitchyardConfig};
use crate::error::RuntimeResult;
use crate::logging;

/// A configured message router, ready to attach to a connector.
#[derive(Debug)]
pub struct Runtime {
    config: SwitchyardConfig,
    pipeline: Pipeline,
    cancel: CancellationToken,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Wires a runtime from a loaded configuration.
    ///
    /// State is kept in `bot.state_file`. Logging is initialized from
    /// `logging` unless a subscriber is already installed.
    pub fn from_config(config: SwitchyardConfig, catalog: HandlerCatalog) -> Self {
        let store = Arc::new(JsonFileStateStore::new(&config.bot.state_file));
        Self::with_store(config, catalog, store)
    }

    /// Like [`Runtime::from_config`] with an explicit state store.
    pub fn with_store(
        config: SwitchyardConfig,
        catalog: HandlerCatalog,
        store: Arc<dyn StateStore>,
    ) -> Self {
        logging::init_from_config(&config.logging);

        let registry = Arc::new(Registry::new());
        let loader = Arc::new(Loader::new(
            &config.bot.modules_dir,
            registry,
            Arc::new(catalog),
        ));
        let services = Services::new(
            ControlSurface::new(loader),
            BotState::new(store),
            config.bot.to_dispatch_settings(),
        );

        info!(
            mode = config.bot.mode.as_str(),
            prefix = services.settings.prefix.as_deref().unwrap_or("<none>"),
            modules_dir = %config.bot.modules_dir.display(),
            "Runtime initialized from configuration"
        );

        Self {
            config,
            pipeline: Pipeline::new(services),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    /// Listing, stats and reload for management layers.
    pub fn control(&self) -> &ControlSurface {
        &self.pipeline.services().control
    }

    /// Persisted bot state, e.g. to clear the shut-off flag.
    pub fn state(&self) -> &BotState {
        &self.pipeline.services().state
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Cancelling this token stops a running [`Runtime::run`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Loads every manifest in the modules directory.
    pub async fn load_modules(&self) -> RuntimeResult<LoadSummary> {
        Ok(self.control().loader().load_all().await?)
    }

    /// Loads modules and runs until Ctrl+C, SIGTERM or the shutdown token.
    pub async fn run<C>(&self, connector: C) -> RuntimeResult<()>
    where
        C: Connector + 'static,
    {
        self.run_until(connector, wait_for_shutdown()).await
    }

    /// Loads modules and runs until `shutdown` completes.
    ///
    /// Queued messages are processed before this returns.
    pub async fn run_until<C, F>(&self, connector: C, shutdown: F) -> RuntimeResult<()>
    where
        C: Connector + 'static,
        F: Future<Output = ()>,
    {
        let summary = self.load_modules().await?;
        if !summary.failed.is_empty() {
            warn!(failed = summary.failed.len(), "Some modules failed to load");
        }

        let connector_name = connector.name().to_string();
        let bridge = SessionBridge::new(
            Arc::new(connector),
            self.pipeline.clone(),
            self.config.session.clone(),
            self.cancel.clone(),
        );

        info!(connector = %connector_name, "Switchyard is running");

        let run = bridge.run();
        tokio::pin!(run);
        let result = tokio::select! {
            result = &mut run => result,
            _ = shutdown => {
                self.cancel.cancel();
                run.await
            }
        };

        match &result {
            Ok(()) => info!("Runtime stopped"),
            Err(e) => error!(error = %e, "Session ended"),
        }
        Ok(result?)
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`Runtime`] with custom configuration sources.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    catalog: HandlerCatalog,
    store: Option<Arc<dyn StateStore>>,
    builtins: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalog: HandlerCatalog::new(),
            store: None,
            builtins: true,
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Overrides one dotted configuration key.
    pub fn set<T: serde::Serialize>(mut self, key: &str, value: T) -> Self {
        self.config_loader = self.config_loader.set(key, value);
        self
    }

    /// Uses `catalog` for native handlers; built-ins are added to it unless disabled.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Skips registering the `core.*` / `admin.*` handlers.
    pub fn without_builtins(mut self) -> Self {
        self.builtins = false;
        self
    }

    /// Keeps state in `store` instead of `bot.state_file`.
    pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> RuntimeResult<Runtime> {
        let config = self.config_loader.load()?;

        #[cfg(feature = "builtin")]
        if self.builtins {
            switchyard_framework::builtin::register_builtins(&self.catalog);
        }

        Ok(match self.store {
            Some(store) => Runtime::with_store(config, self.catalog, store),
            None => Runtime::from_config(config, self.catalog),
        })
    }
}

impl std::fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("config_loader", &self.config_loader)
            .field("catalog", &self.catalog)
            .field("custom_store", &self.store.is_some())
            .field("builtins", &self.builtins)
            .finish()
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

use crate::commands::CommandRegistry;
use crate::content::ContentSource;
use crate::coordinator::{AutoRunOutcome, ResolutionCoordinator};
use crate::error::Result;
use crate::host::{CommandPalette, GraphHost, SettingsBackend};
use crate::resolver::InsertionResolver;
use crate::settings::{ReconcileOutcome, Settings, SettingsEvent, SettingsStore};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// High-level embedded facade wiring settings, resolver, coordinator and
/// command registration against a host.
///
/// # Example
/// ```rust,no_run
/// use graphfeed_core::{Graphfeed, MemoryGraph, MemoryPalette, MemorySettings};
/// use graphfeed_core::content::ContentSource;
/// use std::sync::Arc;
///
/// # async fn run(source: Arc<dyn ContentSource>) -> graphfeed_core::Result<()> {
/// let feed = Graphfeed::new(
///     Arc::new(MemoryGraph::new()),
///     Arc::new(MemorySettings::new()),
///     Arc::new(MemoryPalette::new()),
///     source,
/// );
/// feed.load().await?;
/// feed.run_all_sources().await;
/// feed.unload().await;
/// # Ok(())
/// # }
/// ```
pub struct Graphfeed {
    store: SettingsStore,
    backend: Arc<dyn SettingsBackend>,
    coordinator: Arc<ResolutionCoordinator>,
    registry: Arc<CommandRegistry>,
    events: Mutex<Option<mpsc::UnboundedReceiver<SettingsEvent>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Graphfeed {
    pub fn new(
        host: Arc<dyn GraphHost>,
        backend: Arc<dyn SettingsBackend>,
        palette: Arc<dyn CommandPalette>,
        source: Arc<dyn ContentSource>,
    ) -> Self {
        let (store, events) = SettingsStore::new(backend.clone());
        let settings = store.settings();
        let resolver = Arc::new(InsertionResolver::new(host.clone(), settings.clone()));
        let coordinator = Arc::new(ResolutionCoordinator::new(
            resolver,
            settings,
            source,
            host,
        ));
        let registry = Arc::new(CommandRegistry::new(palette));
        Self {
            store,
            backend,
            coordinator,
            registry,
            events: Mutex::new(Some(events)),
            listener: Mutex::new(None),
        }
    }

    /// Load-time sequence: reconcile persisted settings, register commands,
    /// start watching for source-list changes, then attempt an automatic run.
    /// Never fails the host's startup: every step degrades to a log line.
    /// Returns what the automatic run did so callers don't repeat it.
    pub async fn load(&self) -> Result<AutoRunOutcome> {
        self.store.reconcile_all(&self.backend.get_all_raw());

        let sources = self.store.snapshot().sources;
        if let Err(err) = self.registry.install(&sources).await {
            warn!(%err, "command installation failed");
        }

        let receiver = self
            .events
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take();
        if let Some(mut receiver) = receiver {
            let registry = self.registry.clone();
            let handle = tokio::spawn(async move {
                while let Some(SettingsEvent::SourcesChanged(sources)) = receiver.recv().await {
                    if let Err(err) = registry.reinstall(&sources).await {
                        warn!(%err, "command re-registration failed");
                    }
                }
            });
            *self.listener.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        }

        let outcome = self.coordinator.run_automatic().await;
        info!(?outcome, "loaded");
        Ok(outcome)
    }

    /// Unload-time sequence: deregister commands. In-flight runs are not
    /// interrupted.
    pub async fn unload(&self) {
        if let Some(handle) = self.listener.lock().unwrap_or_else(|p| p.into_inner()).take() {
            handle.abort();
        }
        if let Err(err) = self.registry.uninstall().await {
            warn!(%err, "command removal failed");
        }
        info!("unloaded");
    }

    pub async fn run_single_source(&self, source_id: &str) -> bool {
        self.coordinator.run_single_source(source_id).await
    }

    pub async fn run_all_sources(&self) -> bool {
        self.coordinator.run_all_sources().await
    }

    pub async fn run_automatic(&self) -> AutoRunOutcome {
        self.coordinator.run_automatic().await
    }

    pub fn reconcile_all(&self, raw: &std::collections::BTreeMap<String, Value>) {
        self.store.reconcile_all(raw)
    }

    pub fn reconcile_one(&self, raw_key: &str, raw_value: Option<&Value>) -> ReconcileOutcome {
        self.store.reconcile_one(raw_key, raw_value)
    }

    /// Debounced UI-edit entry point.
    pub fn edit_setting(&self, raw_key: &str, raw_value: Value) {
        self.store.edit(raw_key, raw_value)
    }

    pub fn settings(&self) -> Settings {
        self.store.snapshot()
    }
}

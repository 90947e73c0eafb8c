use crate::content::{filter_items, format_item, format_notice, ContentSource, PREFIX_ERROR, PREFIX_NOTE};
use crate::error::{GraphfeedError, Result};
use crate::host::GraphHost;
use crate::resolver::InsertionResolver;
use crate::settings::Settings;
use crate::types::Position;
use crate::DISPLAY_NAME;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// What an automatic run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoRunOutcome {
    /// The eligibility gate was closed (disabled, no day node, or the anchor
    /// already existed).
    Skipped,
    /// The gate was open and all sources ran.
    Ran { inserted: bool },
}

/// Orchestrates runs: resolves anchors, obtains filtered and formatted
/// content, and inserts each item independently.
pub struct ResolutionCoordinator {
    resolver: Arc<InsertionResolver>,
    settings: Arc<RwLock<Settings>>,
    source: Arc<dyn ContentSource>,
    host: Arc<dyn GraphHost>,
}

impl ResolutionCoordinator {
    pub fn new(
        resolver: Arc<InsertionResolver>,
        settings: Arc<RwLock<Settings>>,
        source: Arc<dyn ContentSource>,
        host: Arc<dyn GraphHost>,
    ) -> Self {
        Self { resolver, settings, source, host }
    }

    /// Run one source. Success means at least one content item was inserted;
    /// notices (fetch failures, empty results) do not count.
    pub async fn run_single_source(&self, source_id: &str) -> bool {
        let settings = self.snapshot();
        let items = match self.source.fetch_ranked_items(source_id, &settings.sort).await {
            Ok(items) => filter_items(items, &settings),
            Err(err) => {
                warn!(source_id, %err, "fetch failed");
                self.insert_notice(&err.to_string(), PREFIX_ERROR, &settings).await;
                return false;
            }
        };

        if items.is_empty() {
            let text = format!(
                "got nothing back from '{source_id}', maybe check the {DISPLAY_NAME} settings"
            );
            self.insert_notice(&text, PREFIX_NOTE, &settings).await;
            return false;
        }

        let mut inserted = 0usize;
        for item in &items {
            let text = format_item(item, &settings);
            // Item insertions are independent; one failure doesn't block the rest.
            match self.insert_content(&text, settings.group).await {
                Ok(()) => inserted += 1,
                Err(err) => warn!(source_id, %err, "failed to insert item"),
            }
        }
        info!(source_id, inserted, of = items.len(), "run finished");
        inserted > 0
    }

    /// Run every configured source, fanned out and awaited jointly.
    /// Succeeds if any source succeeded.
    pub async fn run_all_sources(&self) -> bool {
        let sources = self.snapshot().sources;
        let runs = sources.iter().map(|source| self.run_single_source(source));
        let results = futures::future::join_all(runs).await;
        let succeeded = results.into_iter().any(|inserted| inserted);
        debug!(succeeded, "all-sources run finished");
        succeeded
    }

    /// Run all sources if the once-per-day eligibility gate is open.
    pub async fn run_automatic(&self) -> AutoRunOutcome {
        if !self.resolver.is_auto_run_eligible().await {
            debug!("automatic run skipped");
            return AutoRunOutcome::Skipped;
        }
        let inserted = self.run_all_sources().await;
        AutoRunOutcome::Ran { inserted }
    }

    /// Insert one node of text under a freshly resolved anchor. The anchor is
    /// resolved per insertion: grouped items share the anchor they all find,
    /// ungrouped items each land directly under the search node.
    async fn insert_content(&self, text: &str, grouped: bool) -> Result<()> {
        let search = self.resolver.resolve_search_node(false).await?;
        let anchor = self.resolver.resolve_anchor(&search, grouped).await?;
        self.host
            .create_child(&anchor.node.key, text, Position::Last)
            .await
            .map_err(|err| GraphfeedError::Insertion(err.to_string()))
    }

    async fn insert_notice(&self, text: &str, prefix: &str, settings: &Settings) {
        let notice = format_notice(text, prefix, settings);
        if let Err(err) = self.insert_content(&notice, settings.group).await {
            warn!(%err, "failed to insert notice");
        }
    }

    fn snapshot(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

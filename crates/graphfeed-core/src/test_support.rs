//! Shared fixtures for the crate's unit tests.

use crate::content::ContentSource;
use crate::error::{GraphfeedError, Result};
use crate::types::RankedItem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

pub(crate) fn ranked_item(title: &str, score: u32) -> RankedItem {
    RankedItem {
        title: title.to_string(),
        body: "a body".to_string(),
        author: "tester".to_string(),
        source_ref: "[r/test](https://example.invalid/p/1)".to_string(),
        score,
    }
}

/// Scripted [`ContentSource`]: known source ids return their items, unknown
/// ids fail with a fetch error. Records every call.
#[derive(Default)]
pub(crate) struct StubSource {
    items: HashMap<String, Vec<RankedItem>>,
    calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub(crate) fn with_items(source_id: &str, items: Vec<RankedItem>) -> Self {
        let mut map = HashMap::new();
        map.insert(source_id.to_string(), items);
        Self { items: map, calls: Mutex::new(Vec::new()) }
    }

    pub(crate) fn failing(_source_id: &str) -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl ContentSource for StubSource {
    async fn fetch_ranked_items(&self, source_id: &str, _sort: &str) -> Result<Vec<RankedItem>> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(source_id.to_string());
        match self.items.get(source_id) {
            Some(items) => Ok(items.clone()),
            None => Err(GraphfeedError::Fetch {
                source_id: source_id.to_string(),
                reason: "scripted failure".to_string(),
            }),
        }
    }
}

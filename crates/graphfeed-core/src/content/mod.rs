mod filter;
mod format;

pub use filter::filter_items;
pub use format::{format_item, format_notice, PREFIX_ERROR, PREFIX_NOTE};

use crate::error::Result;
use crate::types::RankedItem;
use async_trait::async_trait;

/// An external provider of ranked content items.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch ranked items for one source identifier, in the given ranking
    /// order. Fails with [`GraphfeedError::Fetch`](crate::GraphfeedError::Fetch)
    /// when the source is unreachable or returns a non-success status.
    async fn fetch_ranked_items(&self, source_id: &str, sort: &str) -> Result<Vec<RankedItem>>;
}

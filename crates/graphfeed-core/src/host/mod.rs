mod memory;

pub use memory::{MemoryGraph, MemoryPalette, MemorySettings};

use crate::error::Result;
use crate::types::{NodeId, NodeKey, NodeRef, Position};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;

/// Narrow capability set over the host document graph.
///
/// The host is the only source of truth for structure. `create_child`
/// deliberately returns no identifiers because the underlying host API does
/// not; callers re-query after creating (see
/// [`InsertionResolver::resolve_anchor`](crate::resolver::InsertionResolver::resolve_anchor)).
#[async_trait]
pub trait GraphHost: Send + Sync {
    /// Key of the currently open or focused node, if any.
    async fn open_or_focused_node_key(&self) -> Result<Option<NodeKey>>;

    /// Key of the node representing the current calendar day.
    /// Deterministic within a day; the node itself may not exist yet.
    async fn today_node_key(&self) -> Result<NodeKey>;

    /// Expand a stable key into a full node reference, or `None` if the key
    /// does not name a live node.
    async fn expand_key(&self, key: &NodeKey) -> Result<Option<NodeRef>>;

    /// First direct or transitive child of `ancestor` whose full text equals
    /// `text`, in document order.
    async fn find_descendant_by_text(&self, ancestor: NodeId, text: &str)
        -> Result<Option<NodeRef>>;

    /// Append a child node under `parent`. Returns no identifiers.
    async fn create_child(&self, parent: &NodeKey, text: &str, position: Position) -> Result<()>;
}

/// Raw persisted settings store provided by the host.
///
/// Synchronous on purpose: the suppression window around a self-corrected
/// default write-back must not contain a suspension point.
pub trait SettingsBackend: Send + Sync {
    fn get_all_raw(&self) -> BTreeMap<String, Value>;

    fn set_raw(&self, key: &str, value: Value);
}

/// Host command palette registration.
#[async_trait]
pub trait CommandPalette: Send + Sync {
    async fn add_command(&self, label: &str) -> Result<()>;

    async fn remove_command(&self, label: &str) -> Result<()>;
}

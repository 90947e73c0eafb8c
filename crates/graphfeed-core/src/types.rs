use serde::{Deserialize, Serialize};
use std::fmt;

/// Host-assigned structural identifier for a document node. Opaque; only
/// meaningful for structural queries against the same host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Host-assigned stable key for a document node, used for host API calls
/// (creation, expansion). Stable across sessions, unlike [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeKey(pub String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// A fully resolved graph location: structural id plus stable key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub key: NodeKey,
}

/// Where a created child lands among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Last,
    First,
}

/// One ranked item from a content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub title: String,
    pub body: String,
    pub author: String,
    /// Pre-rendered origin reference, e.g. `[r/rust](https://...)`.
    pub source_ref: String,
    pub score: u32,
}

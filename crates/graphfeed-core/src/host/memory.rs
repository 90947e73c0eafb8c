use crate::error::{GraphfeedError, Result};
use crate::host::{CommandPalette, GraphHost, SettingsBackend};
use crate::types::{NodeId, NodeKey, NodeRef, Position};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Single-writer usage; recover the data on poisoning instead of panicking.
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Debug, Clone)]
struct MemNode {
    id: NodeId,
    key: NodeKey,
    text: String,
    children: Vec<NodeId>,
}

#[derive(Default)]
struct GraphInner {
    nodes: HashMap<NodeId, MemNode>,
    by_key: HashMap<NodeKey, NodeId>,
    roots: Vec<NodeId>,
    next_id: u64,
    focused: Option<NodeKey>,
    today_key: Option<NodeKey>,
    create_calls: u64,
    fail_creates: bool,
    /// Per-create outcomes: `false` means the created node's text does not
    /// land as requested, so a follow-up lookup misses. Simulates a lost or
    /// raced write. Empty queue means every create lands.
    create_outcomes: VecDeque<bool>,
}

/// In-memory [`GraphHost`] implementation.
///
/// Backs the test suite and the demo binary. Creation allocates host-style
/// identifiers internally and, matching the real host API, returns none of
/// them to the caller.
#[derive(Default)]
pub struct MemoryGraph {
    inner: Mutex<GraphInner>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node with an explicit key. Returns its reference.
    pub fn add_root(&self, key: impl Into<String>, text: impl Into<String>) -> NodeRef {
        let mut inner = lock(&self.inner);
        let node = Self::alloc(&mut inner, Some(NodeKey::new(key)), text.into());
        let node_ref = NodeRef { id: node.id, key: node.key.clone() };
        inner.roots.push(node.id);
        inner.nodes.insert(node.id, node);
        node_ref
    }

    pub fn set_focused(&self, key: Option<NodeKey>) {
        lock(&self.inner).focused = key;
    }

    /// Override the day-node key. Defaults to the current local date in the
    /// host's `MM-DD-YYYY` convention.
    pub fn set_today_key(&self, key: NodeKey) {
        lock(&self.inner).today_key = Some(key);
    }

    pub fn create_calls(&self) -> u64 {
        lock(&self.inner).create_calls
    }

    /// Make every subsequent `create_child` fail with a host error.
    pub fn fail_creates(&self, fail: bool) {
        lock(&self.inner).fail_creates = fail;
    }

    /// Script the next creations: `false` entries produce a node whose text
    /// does not match the request, so the resolver's re-query misses.
    pub fn set_create_outcomes(&self, outcomes: Vec<bool>) {
        lock(&self.inner).create_outcomes = outcomes.into();
    }

    /// Texts of the direct children of `key`, in document order.
    pub fn children_text(&self, key: &NodeKey) -> Vec<String> {
        let inner = lock(&self.inner);
        let Some(id) = inner.by_key.get(key) else {
            return Vec::new();
        };
        inner.nodes[id]
            .children
            .iter()
            .map(|c| inner.nodes[c].text.clone())
            .collect()
    }

    pub fn text_of(&self, key: &NodeKey) -> Option<String> {
        let inner = lock(&self.inner);
        let id = inner.by_key.get(key)?;
        Some(inner.nodes[id].text.clone())
    }

    /// Render the whole graph as an indented outline.
    pub fn outline(&self) -> String {
        let inner = lock(&self.inner);
        let mut out = String::new();
        for root in &inner.roots {
            Self::render(&inner, *root, 0, &mut out);
        }
        out
    }

    fn render(inner: &GraphInner, id: NodeId, depth: usize, out: &mut String) {
        let node = &inner.nodes[&id];
        for line in node.text.lines() {
            out.push_str(&"  ".repeat(depth));
            out.push_str("- ");
            out.push_str(line);
            out.push('\n');
        }
        for child in &node.children {
            Self::render(inner, *child, depth + 1, out);
        }
    }

    fn alloc(inner: &mut GraphInner, key: Option<NodeKey>, text: String) -> MemNode {
        inner.next_id += 1;
        let id = NodeId(inner.next_id);
        let key = key.unwrap_or_else(|| NodeKey::new(format!("gf-{}", inner.next_id)));
        inner.by_key.insert(key.clone(), id);
        MemNode { id, key, text, children: Vec::new() }
    }
}

#[async_trait]
impl GraphHost for MemoryGraph {
    async fn open_or_focused_node_key(&self) -> Result<Option<NodeKey>> {
        Ok(lock(&self.inner).focused.clone())
    }

    async fn today_node_key(&self) -> Result<NodeKey> {
        if let Some(key) = lock(&self.inner).today_key.clone() {
            return Ok(key);
        }
        Ok(NodeKey::new(chrono::Local::now().format("%m-%d-%Y").to_string()))
    }

    async fn expand_key(&self, key: &NodeKey) -> Result<Option<NodeRef>> {
        let inner = lock(&self.inner);
        Ok(inner
            .by_key
            .get(key)
            .map(|id| NodeRef { id: *id, key: key.clone() }))
    }

    async fn find_descendant_by_text(
        &self,
        ancestor: NodeId,
        text: &str,
    ) -> Result<Option<NodeRef>> {
        let inner = lock(&self.inner);
        let Some(start) = inner.nodes.get(&ancestor) else {
            return Ok(None);
        };
        // Breadth-first over child edges, depth >= 1: the ancestor itself is
        // never a candidate.
        let mut queue: VecDeque<NodeId> = start.children.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            let node = &inner.nodes[&id];
            if node.text == text {
                return Ok(Some(NodeRef { id: node.id, key: node.key.clone() }));
            }
            queue.extend(node.children.iter().copied());
        }
        Ok(None)
    }

    async fn create_child(&self, parent: &NodeKey, text: &str, position: Position) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.create_calls += 1;
        if inner.fail_creates {
            return Err(GraphfeedError::Host(format!(
                "create_child rejected for parent '{parent}'"
            )));
        }
        let landed = inner.create_outcomes.pop_front().unwrap_or(true);
        let Some(parent_id) = inner.by_key.get(parent).copied() else {
            return Err(GraphfeedError::Host(format!("unknown parent key '{parent}'")));
        };
        let stored_text = if landed {
            text.to_string()
        } else {
            format!("{text} [raced]")
        };
        let node = Self::alloc(&mut inner, None, stored_text);
        let id = node.id;
        inner.nodes.insert(id, node);
        let parent_node = inner
            .nodes
            .get_mut(&parent_id)
            .ok_or_else(|| GraphfeedError::Host(format!("dangling parent id for '{parent}'")))?;
        match position {
            Position::Last => parent_node.children.push(id),
            Position::First => parent_node.children.insert(0, id),
        }
        Ok(())
    }
}

/// In-memory [`SettingsBackend`] that records every write.
#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<Vec<(String, Value)>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: BTreeMap<String, Value>) -> Self {
        Self { values: Mutex::new(values), writes: Mutex::new(Vec::new()) }
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        lock(&self.values).insert(key.into(), value);
    }

    /// Every `set_raw` call observed, in order.
    pub fn writes(&self) -> Vec<(String, Value)> {
        lock(&self.writes).clone()
    }
}

impl SettingsBackend for MemorySettings {
    fn get_all_raw(&self) -> BTreeMap<String, Value> {
        lock(&self.values).clone()
    }

    fn set_raw(&self, key: &str, value: Value) {
        lock(&self.values).insert(key.to_string(), value.clone());
        lock(&self.writes).push((key.to_string(), value));
    }
}

/// In-memory [`CommandPalette`] that records registered labels.
#[derive(Default)]
pub struct MemoryPalette {
    labels: Mutex<Vec<String>>,
}

impl MemoryPalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        lock(&self.labels).clone()
    }
}

#[async_trait]
impl CommandPalette for MemoryPalette {
    async fn add_command(&self, label: &str) -> Result<()> {
        lock(&self.labels).push(label.to_string());
        Ok(())
    }

    async fn remove_command(&self, label: &str) -> Result<()> {
        lock(&self.labels).retain(|l| l != label);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_descendant_is_transitive_but_not_reflexive() {
        let graph = MemoryGraph::new();
        let root = graph.add_root("root", "needle");
        graph.create_child(&root.key, "branch", Position::Last).await.unwrap();
        let branch = graph
            .find_descendant_by_text(root.id, "branch")
            .await
            .unwrap()
            .unwrap();
        graph.create_child(&branch.key, "needle", Position::Last).await.unwrap();

        let found = graph.find_descendant_by_text(root.id, "needle").await.unwrap();
        // The root's own text never matches; the grandchild does.
        assert!(found.is_some());
        assert_ne!(found.unwrap().id, root.id);
    }

    #[tokio::test]
    async fn create_child_returns_no_identifiers_but_is_queryable() {
        let graph = MemoryGraph::new();
        let root = graph.add_root("root", "day");
        graph.create_child(&root.key, "entry", Position::Last).await.unwrap();
        assert_eq!(graph.children_text(&root.key), vec!["entry"]);
        assert_eq!(graph.create_calls(), 1);
    }
}

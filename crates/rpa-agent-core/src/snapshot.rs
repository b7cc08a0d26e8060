//! In-memory UI tree that satisfies [`UiTreeProvider`].
//!
//! A snapshot is an arena of nodes addressed by [`NodeHandle`] indices, built
//! from a nested [`SnapshotNode`] description (usually JSON). It records every
//! action invoked on it so callers can assert on what the agent did.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{GlobalAction, NodeAction, NodeAttributes, NodeHandle, UiTreeProvider};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to read tree snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tree snapshot: {0}")]
    Parse(#[from] serde_json::Error),
}

fn default_true() -> bool {
    true
}

/// Nested, serializable description of a node and its subtree.
///
/// A `null` entry in `children` describes a null child reference: it counts
/// towards the parent's child count but resolves to no node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotNode {
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default = "default_true")]
    pub visible_to_user: bool,
    #[serde(default)]
    pub scrollable: bool,
    /// What `perform_action` reports for this node.
    #[serde(default = "default_true")]
    pub action_result: bool,
    #[serde(default)]
    pub children: Vec<Option<SnapshotNode>>,
}

impl SnapshotNode {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            text: None,
            clickable: false,
            visible_to_user: true,
            scrollable: false,
            action_result: true,
            children: Vec::new(),
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible_to_user = false;
        self
    }

    pub fn failing_actions(mut self) -> Self {
        self.action_result = false;
        self
    }

    pub fn child(mut self, child: SnapshotNode) -> Self {
        self.children.push(Some(child));
        self
    }

    pub fn null_child(mut self) -> Self {
        self.children.push(None);
        self
    }
}

#[derive(Debug)]
struct Slot {
    attributes: NodeAttributes,
    children: Vec<Option<NodeHandle>>,
    parent: Option<NodeHandle>,
    action_result: bool,
    stale: bool,
}

#[derive(Debug)]
pub struct UiTreeSnapshot {
    slots: Vec<Slot>,
    root: Option<NodeHandle>,
    global_action_result: bool,
    actions: Mutex<Vec<(NodeHandle, NodeAction)>>,
    global_actions: Mutex<Vec<GlobalAction>>,
}

impl Default for UiTreeSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl UiTreeSnapshot {
    /// A host with no active window.
    pub fn empty() -> Self {
        Self {
            slots: Vec::new(),
            root: None,
            global_action_result: true,
            actions: Mutex::new(Vec::new()),
            global_actions: Mutex::new(Vec::new()),
        }
    }

    pub fn from_root(root: SnapshotNode) -> Self {
        let mut snapshot = Self::empty();
        let handle = snapshot.insert(root, None);
        snapshot.root = Some(handle);
        snapshot
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let root: Option<SnapshotNode> = serde_json::from_str(json)?;
        Ok(root.map(Self::from_root).unwrap_or_default())
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn with_global_action_result(mut self, result: bool) -> Self {
        self.global_action_result = result;
        self
    }

    fn insert(&mut self, node: SnapshotNode, parent: Option<NodeHandle>) -> NodeHandle {
        let handle = NodeHandle(self.slots.len() as u64);
        self.slots.push(Slot {
            attributes: NodeAttributes {
                class_name: node.class_name,
                text: node.text,
                clickable: node.clickable,
                visible_to_user: node.visible_to_user,
                scrollable: node.scrollable,
                child_count: node.children.len(),
            },
            children: Vec::with_capacity(node.children.len()),
            parent,
            action_result: node.action_result,
            stale: false,
        });

        for child in node.children {
            let child_handle = child.map(|c| self.insert(c, Some(handle)));
            self.slots[handle.0 as usize].children.push(child_handle);
        }
        handle
    }

    fn slot(&self, node: NodeHandle) -> Option<&Slot> {
        self.slots.get(node.0 as usize).filter(|slot| !slot.stale)
    }

    /// Resolves a path of child indices starting at the root.
    pub fn node_at(&self, path: &[usize]) -> Option<NodeHandle> {
        let mut current = self.root?;
        for &index in path {
            current = (*self.slot(current)?.children.get(index)?)?;
        }
        Some(current)
    }

    /// Marks a node as removed by the host; its handle stops resolving.
    pub fn invalidate(&mut self, node: NodeHandle) {
        if let Some(slot) = self.slots.get_mut(node.0 as usize) {
            slot.stale = true;
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn actions(&self) -> Vec<(NodeHandle, NodeAction)> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn global_actions(&self) -> Vec<GlobalAction> {
        self.global_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl UiTreeProvider for UiTreeSnapshot {
    fn root(&self) -> Option<NodeHandle> {
        self.root.filter(|root| self.slot(*root).is_some())
    }

    fn attributes(&self, node: NodeHandle) -> Option<NodeAttributes> {
        self.slot(node).map(|slot| slot.attributes.clone())
    }

    fn child(&self, node: NodeHandle, index: usize) -> Option<NodeHandle> {
        let child = (*self.slot(node)?.children.get(index)?)?;
        self.slot(child).map(|_| child)
    }

    fn parent(&self, node: NodeHandle) -> Option<NodeHandle> {
        self.slot(node)?.parent
    }

    fn perform_action(&self, node: NodeHandle, action: NodeAction) -> bool {
        let Some(slot) = self.slot(node) else {
            return false;
        };
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((node, action));
        slot.action_result
    }

    fn perform_global_action(&self, action: GlobalAction) -> bool {
        self.global_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(action);
        self.global_action_result
    }
}

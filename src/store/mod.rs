//! Node Store
//!
//! Point lookups and adjacency queries over attachment records keyed by id.
//! Every node carries a nullable parent reference (`upper_id`) and a local path
//! segment; the hierarchy itself only exists as these flat parent pointers.

pub mod memory;
pub mod persistence;

use crate::error::StorageError;
use crate::types::{NodeId, Timestamp, FOLDER_TYPE};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

pub use memory::MemoryNodeStore;
pub use persistence::SledNodeStore;

/// Node: one attachment (file or folder)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Display name without extension
    pub name: String,
    /// File extension without the dot, or [`FOLDER_TYPE`] for folders
    #[serde(rename = "type")]
    pub node_type: String,
    /// Storage-relative path segment of this node only
    pub path: String,
    pub size: u64,
    pub upper_id: Option<NodeId>,
    pub create_on: Timestamp,
    pub modify_on: Timestamp,
    pub creator: String,
    pub modifier: String,
}

impl Node {
    /// New file node stamped with the current time.
    pub fn file(
        id: impl Into<NodeId>,
        name: impl Into<String>,
        node_type: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Node {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            path: path.into(),
            size: 0,
            upper_id: None,
            create_on: now,
            modify_on: now,
            creator: "System".to_string(),
            modifier: "System".to_string(),
        }
    }

    /// New folder node stamped with the current time.
    pub fn folder(id: impl Into<NodeId>, name: impl Into<String>, path: impl Into<String>) -> Self {
        Node::file(id, name, FOLDER_TYPE, path)
    }

    /// Place this node under `upper_id`.
    pub fn under(mut self, upper_id: impl Into<NodeId>) -> Self {
        self.upper_id = Some(upper_id.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == FOLDER_TYPE
    }

    pub fn is_root(&self) -> bool {
        self.upper_id.is_none()
    }

    /// File name with extension; folders and untyped files have none.
    pub fn file_name(&self) -> String {
        if self.is_folder() || self.node_type.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.node_type)
        }
    }
}

/// One field changed by a [`NodeUpdate`], with the value it held before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: &'static str,
    pub original: Option<String>,
}

/// Sparse update: only the fields that are set get applied.
///
/// `upper_id` is doubly optional: `Some(None)` moves the node to the forest root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub name: Option<String>,
    pub node_type: Option<String>,
    pub path: Option<String>,
    pub size: Option<u64>,
    pub upper_id: Option<Option<NodeId>>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.node_type.is_none()
            && self.path.is_none()
            && self.size.is_none()
            && self.upper_id.is_none()
    }

    /// Apply the present fields to `node`, returning what actually changed.
    pub fn apply(&self, node: &mut Node) -> Vec<FieldChange> {
        let mut changes = Vec::new();

        if let Some(name) = &self.name {
            if *name != node.name {
                changes.push(FieldChange {
                    field: "name",
                    original: Some(std::mem::replace(&mut node.name, name.clone())),
                });
            }
        }
        if let Some(node_type) = &self.node_type {
            if *node_type != node.node_type {
                changes.push(FieldChange {
                    field: "type",
                    original: Some(std::mem::replace(&mut node.node_type, node_type.clone())),
                });
            }
        }
        if let Some(path) = &self.path {
            if *path != node.path {
                changes.push(FieldChange {
                    field: "path",
                    original: Some(std::mem::replace(&mut node.path, path.clone())),
                });
            }
        }
        if let Some(size) = self.size {
            if size != node.size {
                let original = std::mem::replace(&mut node.size, size);
                changes.push(FieldChange {
                    field: "size",
                    original: Some(original.to_string()),
                });
            }
        }
        if let Some(upper_id) = &self.upper_id {
            if *upper_id != node.upper_id {
                changes.push(FieldChange {
                    field: "upper_id",
                    original: std::mem::replace(&mut node.upper_id, upper_id.clone()),
                });
            }
        }

        changes
    }

    /// Whether the changes relocate the node's physical content.
    pub fn relocates(changes: &[FieldChange]) -> bool {
        changes
            .iter()
            .any(|c| c.field == "path" || c.field == "upper_id")
    }
}

/// Node store interface
///
/// Backends supply point lookups and the direct-children index; the provided
/// traversals build on those and guard against corrupt parent pointers.
pub trait NodeStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Node>, StorageError>;
    fn put(&self, node: &Node) -> Result<(), StorageError>;
    /// Remove a single node; its children are left in place.
    fn remove(&self, id: &str) -> Result<Option<Node>, StorageError>;
    /// Direct children, in a stable order.
    fn children_of(&self, id: &str) -> Result<Vec<Node>, StorageError>;
    /// Nodes without a parent, in a stable order.
    fn roots(&self) -> Result<Vec<Node>, StorageError>;

    /// Ancestors of `id`, root-first, excluding the node itself.
    ///
    /// Fails with `NodeNotFound` if `id` is absent and with `CorruptHierarchy` on a
    /// dangling parent reference or when the chain grows past `max_depth`.
    fn ancestors_of(&self, id: &str, max_depth: usize) -> Result<Vec<Node>, StorageError> {
        let node = self
            .get(id)?
            .ok_or_else(|| StorageError::NodeNotFound(id.to_string()))?;

        let mut chain: Vec<Node> = Vec::new();
        let mut current_id = node.id;
        let mut next = node.upper_id;
        while let Some(upper_id) = next {
            if chain.len() >= max_depth {
                return Err(StorageError::CorruptHierarchy {
                    id: id.to_string(),
                    reason: format!("ancestor chain exceeds {} levels", max_depth),
                });
            }
            let upper = self
                .get(&upper_id)?
                .ok_or_else(|| StorageError::CorruptHierarchy {
                    id: current_id.clone(),
                    reason: format!("dangling parent reference {}", upper_id),
                })?;
            current_id = upper.id.clone();
            next = upper.upper_id.clone();
            chain.push(upper);
        }

        chain.reverse();
        Ok(chain)
    }

    /// All transitive descendants of `id`, excluding the node itself.
    fn descendants_of(&self, id: &str) -> Result<Vec<Node>, StorageError> {
        if self.get(id)?.is_none() {
            return Err(StorageError::NodeNotFound(id.to_string()));
        }

        let mut visited: HashSet<NodeId> = HashSet::from([id.to_string()]);
        let mut queue: VecDeque<NodeId> = VecDeque::from([id.to_string()]);
        let mut descendants = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in self.children_of(&current)? {
                if !visited.insert(child.id.clone()) {
                    return Err(StorageError::CorruptHierarchy {
                        id: child.id,
                        reason: format!("reached twice while descending from {}", id),
                    });
                }
                queue.push_back(child.id.clone());
                descendants.push(child);
            }
        }

        Ok(descendants)
    }
}

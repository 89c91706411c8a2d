//! Sled-backed node store
//!
//! Two trees: `nodes` maps id → bincode-encoded [`NodeRecord`], and `children`
//! holds one empty-valued key per parent/child edge so direct children come back
//! from a single prefix scan.

use super::{Node, NodeStore};
use crate::error::StorageError;
use crate::types::{NodeId, Timestamp};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ROOT_PREFIX: &[u8] = b"r\0";

/// Stored shape of a node in this backend; timestamps are epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub name: String,
    pub node_type: String,
    pub path: String,
    pub size: u64,
    pub upper_id: Option<String>,
    pub create_on_ms: i64,
    pub modify_on_ms: i64,
    pub creator: String,
    pub modifier: String,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        NodeRecord {
            id: node.id.clone(),
            name: node.name.clone(),
            node_type: node.node_type.clone(),
            path: node.path.clone(),
            size: node.size,
            upper_id: node.upper_id.clone(),
            create_on_ms: node.create_on.timestamp_millis(),
            modify_on_ms: node.modify_on.timestamp_millis(),
            creator: node.creator.clone(),
            modifier: node.modifier.clone(),
        }
    }
}

impl TryFrom<NodeRecord> for Node {
    type Error = StorageError;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        let create_on = millis_to_timestamp(&record.id, record.create_on_ms)?;
        let modify_on = millis_to_timestamp(&record.id, record.modify_on_ms)?;
        Ok(Node {
            id: record.id,
            name: record.name,
            node_type: record.node_type,
            path: record.path,
            size: record.size,
            upper_id: record.upper_id,
            create_on,
            modify_on,
            creator: record.creator,
            modifier: record.modifier,
        })
    }
}

fn millis_to_timestamp(id: &str, millis: i64) -> Result<Timestamp, StorageError> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| StorageError::InvalidRecord {
        id: id.to_string(),
        reason: format!("timestamp {} out of range", millis),
    })
}

fn parent_prefix(upper_id: Option<&str>) -> Vec<u8> {
    match upper_id {
        Some(parent) => {
            let mut key = Vec::with_capacity(parent.len() + 3);
            key.extend_from_slice(b"p:");
            key.extend_from_slice(parent.as_bytes());
            key.push(0);
            key
        }
        None => ROOT_PREFIX.to_vec(),
    }
}

fn edge_key(upper_id: Option<&str>, id: &str) -> Vec<u8> {
    let mut key = parent_prefix(upper_id);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Persistent node store on top of sled
pub struct SledNodeStore {
    db: sled::Db,
    nodes: sled::Tree,
    children: sled::Tree,
}

impl SledNodeStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Open a throwaway store that is removed when dropped.
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let nodes = db.open_tree("nodes")?;
        let children = db.open_tree("children")?;
        Ok(SledNodeStore {
            db,
            nodes,
            children,
        })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    fn decode(bytes: &[u8]) -> Result<Node, StorageError> {
        let record: NodeRecord = bincode::deserialize(bytes)?;
        Node::try_from(record)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<Node>, StorageError> {
        let mut found = Vec::new();
        for entry in self.children.scan_prefix(prefix) {
            let (key, _) = entry?;
            let child_id = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
            match self.nodes.get(child_id.as_bytes())? {
                Some(bytes) => found.push(Self::decode(&bytes)?),
                None => {
                    tracing::warn!(child_id = %child_id, "Stale child edge without node record");
                }
            }
        }
        Ok(found)
    }
}

impl NodeStore for SledNodeStore {
    fn get(&self, id: &str) -> Result<Option<Node>, StorageError> {
        match self.nodes.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, node: &Node) -> Result<(), StorageError> {
        let encoded = bincode::serialize(&NodeRecord::from(node))?;
        let previous = self.nodes.insert(node.id.as_bytes(), encoded)?;
        if let Some(bytes) = previous {
            let previous: NodeRecord = bincode::deserialize(&bytes)?;
            if previous.upper_id != node.upper_id {
                self.children
                    .remove(edge_key(previous.upper_id.as_deref(), &previous.id))?;
            }
        }
        self.children
            .insert(edge_key(node.upper_id.as_deref(), &node.id), &[] as &[u8])?;
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Option<Node>, StorageError> {
        let removed = match self.nodes.remove(id.as_bytes())? {
            Some(bytes) => Self::decode(&bytes)?,
            None => return Ok(None),
        };
        self.children
            .remove(edge_key(removed.upper_id.as_deref(), &removed.id))?;
        Ok(Some(removed))
    }

    fn children_of(&self, id: &str) -> Result<Vec<Node>, StorageError> {
        self.scan(&parent_prefix(Some(id)))
    }

    fn roots(&self) -> Result<Vec<Node>, StorageError> {
        self.scan(ROOT_PREFIX)
    }
}

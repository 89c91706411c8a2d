//! In-memory node store: an id → node arena plus a parent → children index.

use super::{Node, NodeStore};
use crate::error::StorageError;
use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};

#[derive(Default)]
struct Arena {
    nodes: HashMap<NodeId, Node>,
    /// Parent id (None for roots) → child ids
    children: HashMap<Option<NodeId>, BTreeSet<NodeId>>,
}

impl Arena {
    fn unlink(&mut self, node: &Node) {
        if let Some(siblings) = self.children.get_mut(&node.upper_id) {
            siblings.remove(&node.id);
            if siblings.is_empty() {
                self.children.remove(&node.upper_id);
            }
        }
    }

    fn collect(&self, parent: &Option<NodeId>) -> Vec<Node> {
        self.children
            .get(parent)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.nodes.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Node store held entirely in memory
#[derive(Default)]
pub struct MemoryNodeStore {
    arena: RwLock<Arena>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `nodes`.
    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        {
            let mut arena = store.arena.write();
            for node in nodes {
                Self::insert(&mut arena, node);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.arena.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(arena: &mut Arena, node: Node) {
        if let Some(previous) = arena.nodes.get(&node.id).cloned() {
            arena.unlink(&previous);
        }
        arena
            .children
            .entry(node.upper_id.clone())
            .or_default()
            .insert(node.id.clone());
        arena.nodes.insert(node.id.clone(), node);
    }
}

impl NodeStore for MemoryNodeStore {
    fn get(&self, id: &str) -> Result<Option<Node>, StorageError> {
        Ok(self.arena.read().nodes.get(id).cloned())
    }

    fn put(&self, node: &Node) -> Result<(), StorageError> {
        Self::insert(&mut self.arena.write(), node.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<Option<Node>, StorageError> {
        let mut arena = self.arena.write();
        let removed = arena.nodes.remove(id);
        if let Some(node) = &removed {
            arena.unlink(node);
        }
        Ok(removed)
    }

    fn children_of(&self, id: &str) -> Result<Vec<Node>, StorageError> {
        Ok(self.arena.read().collect(&Some(id.to_string())))
    }

    fn roots(&self) -> Result<Vec<Node>, StorageError> {
        Ok(self.arena.read().collect(&None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryNodeStore {
        MemoryNodeStore::with_nodes(vec![
            Node::folder("a", "A", "a"),
            Node::folder("b", "B", "b").under("a"),
            Node::file("c", "c", "txt", "c.txt").under("b"),
            Node::file("d", "d", "txt", "d.txt").under("a"),
        ])
    }

    #[test]
    fn ancestors_are_root_first() {
        let store = sample();
        let chain = store.ancestors_of("c", 10).unwrap();
        let ids: Vec<_> = chain.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn ancestors_of_missing_node_is_not_found() {
        let store = sample();
        assert!(matches!(
            store.ancestors_of("zz", 10),
            Err(StorageError::NodeNotFound(_))
        ));
    }

    #[test]
    fn dangling_parent_is_corruption() {
        let store = MemoryNodeStore::with_nodes(vec![Node::folder("x", "X", "x").under("ghost")]);
        assert!(matches!(
            store.ancestors_of("x", 10),
            Err(StorageError::CorruptHierarchy { .. })
        ));
    }

    #[test]
    fn parent_cycle_trips_depth_guard() {
        let store = MemoryNodeStore::with_nodes(vec![
            Node::folder("x", "X", "x").under("y"),
            Node::folder("y", "Y", "y").under("x"),
        ]);
        match store.ancestors_of("x", 50) {
            Err(StorageError::CorruptHierarchy { reason, .. }) => {
                assert!(reason.contains("50"));
            }
            other => panic!("expected corruption, got {other:?}"),
        }
    }

    #[test]
    fn descendants_cover_whole_subtree() {
        let store = sample();
        let mut ids: Vec<_> = store
            .descendants_of("a")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["b", "c", "d"]);
    }

    #[test]
    fn put_moves_node_between_parents() {
        let store = sample();
        let moved = store.get("c").unwrap().unwrap().under("a");
        store.put(&moved).unwrap();

        assert!(store.children_of("b").unwrap().is_empty());
        let under_a: Vec<_> = store
            .children_of("a")
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(under_a, vec!["b", "c", "d"]);
    }

    #[test]
    fn remove_unlinks_from_parent_index() {
        let store = sample();
        store.remove("d").unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.children_of("a").unwrap().len(), 1);
        assert_eq!(store.roots().unwrap().len(), 1);
    }
}

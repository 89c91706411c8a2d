//! Breadth-first expansion over a flat descendant set
//!
//! Descendants arrive from the store as one unordered batch. They are grouped by
//! parent id in a single pass; the walk then pops nodes off a queue and takes each
//! node's children from the index in O(1). Every visit derives a payload from its
//! parent's payload, which is how both the descendant tree and the zip planner
//! accumulate per-node state without re-deriving it from the root.

use crate::error::ApiError;
use crate::store::Node;
use crate::types::NodeId;
use std::collections::{HashMap, VecDeque};

/// Descendants grouped by parent id
pub struct ChildIndex {
    by_parent: HashMap<NodeId, Vec<Node>>,
    remaining: usize,
}

impl ChildIndex {
    /// Group `descendants` by `upper_id`. Each group is ordered by name, then id.
    pub fn group(descendants: Vec<Node>) -> Self {
        let remaining = descendants.len();
        let mut by_parent: HashMap<NodeId, Vec<Node>> = HashMap::new();
        for node in descendants {
            match &node.upper_id {
                Some(parent) => by_parent.entry(parent.clone()).or_default().push(node),
                None => {
                    by_parent.entry(String::new()).or_default().push(node);
                }
            }
        }
        for group in by_parent.values_mut() {
            group.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        }
        ChildIndex {
            by_parent,
            remaining,
        }
    }

    /// Remove and return the direct children of `id`.
    pub fn take(&mut self, id: &str) -> Vec<Node> {
        let children = self.by_parent.remove(id).unwrap_or_default();
        self.remaining -= children.len();
        children
    }

    /// Number of descendants not yet attached.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    fn leftover_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .by_parent
            .values()
            .flatten()
            .map(|n| n.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// One visited node with the index of its parent visit.
#[derive(Debug, Clone)]
pub struct Visit<P> {
    pub node: Node,
    pub parent: Option<usize>,
    pub payload: P,
}

/// Walk `root` and its `descendants` breadth-first.
///
/// Visits come back in queue order, root first; a child always appears after its
/// parent. `derive` computes a child's payload from its parent's payload. Any
/// descendant left unattached when the queue drains is reported as corruption.
pub fn breadth_first<P, F>(
    root: Node,
    root_payload: P,
    descendants: Vec<Node>,
    mut derive: F,
) -> Result<Vec<Visit<P>>, ApiError>
where
    F: FnMut(&P, &Node) -> P,
{
    let root_id = root.id.clone();
    let mut index = ChildIndex::group(descendants);
    let mut visits = vec![Visit {
        node: root,
        parent: None,
        payload: root_payload,
    }];
    let mut queue: VecDeque<usize> = VecDeque::from([0]);

    while let Some(current) = queue.pop_front() {
        if index.remaining() == 0 {
            break;
        }
        let children = index.take(&visits[current].node.id);
        let derived: Vec<(Node, P)> = children
            .into_iter()
            .map(|child| {
                let payload = derive(&visits[current].payload, &child);
                (child, payload)
            })
            .collect();
        for (node, payload) in derived {
            queue.push_back(visits.len());
            visits.push(Visit {
                node,
                parent: Some(current),
                payload,
            });
        }
    }

    if index.remaining() > 0 {
        let leftover = index.leftover_ids();
        return Err(ApiError::corrupt(
            root_id,
            format!(
                "{} descendant(s) not connected to the subtree: {}",
                leftover.len(),
                leftover.join(", ")
            ),
        ));
    }

    Ok(visits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_orders_siblings_by_name() {
        let mut index = ChildIndex::group(vec![
            Node::file("2", "zeta", "txt", "z").under("r"),
            Node::file("1", "alpha", "txt", "a").under("r"),
        ]);
        let names: Vec<_> = index.take("r").into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(index.remaining(), 0);
    }

    #[test]
    fn payload_accumulates_from_parent() {
        let visits = breadth_first(
            Node::folder("r", "R", "r"),
            "R".to_string(),
            vec![
                Node::folder("a", "a", "a").under("r"),
                Node::file("b", "b", "txt", "b").under("a"),
            ],
            |parent, node| format!("{}/{}", parent, node.name),
        )
        .unwrap();

        let payloads: Vec<_> = visits.iter().map(|v| v.payload.as_str()).collect();
        assert_eq!(payloads, vec!["R", "R/a", "R/a/b"]);
        assert_eq!(visits[2].parent, Some(1));
    }

    #[test]
    fn disconnected_descendants_are_reported() {
        let result = breadth_first(
            Node::folder("r", "R", "r"),
            (),
            vec![Node::file("x", "x", "txt", "x").under("elsewhere")],
            |_, _| (),
        );
        match result {
            Err(ApiError::CorruptHierarchy { id, reason }) => {
                assert_eq!(id, "r");
                assert!(reason.contains('x'));
            }
            other => panic!("expected corruption, got {other:?}"),
        }
    }
}

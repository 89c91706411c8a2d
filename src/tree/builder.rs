//! Descendant tree building
//!
//! One bulk descendant fetch, then a breadth-first assembly through
//! [`breadth_first`](super::traverse::breadth_first).

use super::node::DescendantTree;
use super::traverse::breadth_first;
use crate::error::ApiError;
use crate::store::NodeStore;
use std::time::Instant;

/// Builds [`DescendantTree`]s from a node store.
pub struct TreeBuilder<'a> {
    store: &'a dyn NodeStore,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(store: &'a dyn NodeStore) -> Self {
        TreeBuilder { store }
    }

    /// Build the full subtree rooted at `root_id`.
    pub fn build(&self, root_id: &str) -> Result<DescendantTree, ApiError> {
        let start = Instant::now();
        let root = self
            .store
            .get(root_id)?
            .ok_or_else(|| ApiError::NotFound(root_id.to_string()))?;
        let descendants = self.store.descendants_of(root_id)?;

        let visits = breadth_first(root, (), descendants, |_, _| ())?;
        let count = visits.len();

        // Children always follow their parent, so folding from the back completes
        // every subtree before it is attached upward.
        let mut slots: Vec<Option<(Option<usize>, DescendantTree)>> = visits
            .into_iter()
            .map(|v| Some((v.parent, DescendantTree::leaf(v.node))))
            .collect();
        for i in (1..slots.len()).rev() {
            let Some((Some(parent), mut tree)) = slots[i].take() else {
                continue;
            };
            if let Some(children) = tree.children.as_mut() {
                children.reverse();
            }
            if let Some((_, parent_tree)) = slots[parent].as_mut() {
                parent_tree.children.get_or_insert_with(Vec::new).push(tree);
            }
        }
        let (_, mut tree) = slots
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| ApiError::NotFound(root_id.to_string()))?;
        if let Some(children) = tree.children.as_mut() {
            children.reverse();
        }

        tracing::debug!(
            root_id = %root_id,
            nodes = count,
            duration_ms = start.elapsed().as_millis() as u64,
            "Built descendant tree"
        );
        Ok(tree)
    }
}

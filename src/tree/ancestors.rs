//! Ancestor resolution and full path assembly

use crate::error::ApiError;
use crate::store::{Node, NodeStore};
use crate::types::{DEFAULT_MAX_DEPTH, PATH_SEPARATOR};

/// Ordered nodes from the forest root (or a cutoff ancestor) down to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorChain {
    nodes: Vec<Node>,
}

impl AncestorChain {
    /// `nodes` must be root-first and end with the target.
    pub fn new(nodes: Vec<Node>) -> Self {
        AncestorChain { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn target(&self) -> Option<&Node> {
        self.nodes.last()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// `path` segments joined by `/`.
    pub fn path(&self) -> String {
        join(self.nodes.iter().map(|n| n.path.as_str()))
    }

    /// `name` segments joined by `/`.
    pub fn name_path(&self) -> String {
        join(self.nodes.iter().map(|n| n.name.as_str()))
    }
}

pub(crate) fn join<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for segment in segments {
        if !joined.is_empty() {
            joined.push(PATH_SEPARATOR);
        }
        joined.push_str(segment);
    }
    joined
}

/// Resolves ancestor chains through a [`NodeStore`], bounded by `max_depth`.
pub struct AncestorResolver<'a> {
    store: &'a dyn NodeStore,
    max_depth: usize,
}

impl<'a> AncestorResolver<'a> {
    pub fn new(store: &'a dyn NodeStore) -> Self {
        Self::with_max_depth(store, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(store: &'a dyn NodeStore, max_depth: usize) -> Self {
        AncestorResolver { store, max_depth }
    }

    pub fn store(&self) -> &'a dyn NodeStore {
        self.store
    }

    /// Chain from the forest root down to and including `id`.
    pub fn chain(&self, id: &str) -> Result<AncestorChain, ApiError> {
        let node = self
            .store
            .get(id)?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        let mut nodes = self.store.ancestors_of(id, self.max_depth)?;
        nodes.push(node);
        Ok(AncestorChain::new(nodes))
    }

    /// Chain from `ancestor_id` (inclusive) down to `id`.
    pub fn chain_from(&self, id: &str, ancestor_id: &str) -> Result<AncestorChain, ApiError> {
        let chain = self.chain(id)?;
        let start = chain
            .position(ancestor_id)
            .ok_or_else(|| ApiError::NotFound(ancestor_id.to_string()))?;
        Ok(AncestorChain::new(chain.nodes[start..].to_vec()))
    }

    /// Storage-relative full path of `id`: every ancestor's `path` plus its own.
    pub fn full_path(&self, id: &str) -> Result<String, ApiError> {
        let path = self.chain(id)?.path();
        tracing::debug!(id = %id, path = %path, "Resolved full path");
        Ok(path)
    }

    /// Path of `id` relative to `ancestor_id`, excluding the ancestor's own segment.
    pub fn full_path_from(&self, id: &str, ancestor_id: &str) -> Result<String, ApiError> {
        let chain = self.chain_from(id, ancestor_id)?;
        Ok(join(chain.nodes().iter().skip(1).map(|n| n.path.as_str())))
    }
}

//! Least-common-ancestor reduction for multi-root export
//!
//! Each selected root is expanded into its ancestor chain (root-first, including
//! the node itself). Chains in a forest share ancestry only as a common prefix, so
//! the least common ancestor is the last node of the longest shared prefix; a
//! selected root can itself be that ancestor when another root sits below it.

use super::ancestors::{AncestorChain, AncestorResolver};
use crate::error::ApiError;
use crate::store::Node;
use crate::types::NodeId;
use std::collections::HashSet;

/// A selected root together with its ancestor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    pub root_id: NodeId,
    pub chain: AncestorChain,
}

impl Lineage {
    pub fn root(&self) -> Option<&Node> {
        self.chain.target()
    }
}

/// Result of reducing a root selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reduction {
    /// Least common ancestor of every selected root, if one exists
    pub common_ancestor: Option<Node>,
    /// Lineages in selection order, duplicates removed
    pub lineages: Vec<Lineage>,
}

impl Reduction {
    pub fn common_ancestor_id(&self) -> Option<&str> {
        self.common_ancestor.as_ref().map(|n| n.id.as_str())
    }

    pub fn lineage(&self, root_id: &str) -> Option<&Lineage> {
        self.lineages.iter().find(|l| l.root_id == root_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lineages.is_empty()
    }

    /// Chain segments below the common ancestor for `lineage`.
    ///
    /// Without a common ancestor this is the whole chain. When the root is the
    /// common ancestor itself the residual is the root alone.
    pub fn residual<'l>(&self, lineage: &'l Lineage) -> &'l [Node] {
        let nodes = lineage.chain.nodes();
        match self
            .common_ancestor_id()
            .and_then(|id| lineage.chain.position(id))
        {
            Some(pos) if pos + 1 < nodes.len() => &nodes[pos + 1..],
            Some(_) => &nodes[nodes.len().saturating_sub(1)..],
            None => nodes,
        }
    }

    /// Drop selected roots that sit below another selected root.
    ///
    /// The outer root's walk already covers them; the common ancestor is recomputed
    /// over what remains.
    pub fn outermost(self) -> Reduction {
        let kept: Vec<Lineage> = {
            let selected: HashSet<&str> =
                self.lineages.iter().map(|l| l.root_id.as_str()).collect();
            self.lineages
                .iter()
                .filter(|lineage| {
                    !lineage
                        .chain
                        .nodes()
                        .iter()
                        .any(|n| n.id != lineage.root_id && selected.contains(n.id.as_str()))
                })
                .cloned()
                .collect()
        };
        if kept.len() == self.lineages.len() {
            return self;
        }
        tracing::debug!(
            dropped = self.lineages.len() - kept.len(),
            "Dropped roots nested below other selected roots"
        );
        Reduction {
            common_ancestor: common_ancestor(&kept),
            lineages: kept,
        }
    }
}

/// Reduce `root_ids` to their least common ancestor and per-root chains.
///
/// Fewer than two distinct roots never have a common ancestor. An empty selection
/// yields an empty reduction.
pub fn reduce<S: AsRef<str>>(
    resolver: &AncestorResolver<'_>,
    root_ids: &[S],
) -> Result<Reduction, ApiError> {
    let mut seen = HashSet::new();
    let mut lineages = Vec::new();
    for id in root_ids.iter().map(AsRef::as_ref) {
        if !seen.insert(id.to_string()) {
            continue;
        }
        lineages.push(Lineage {
            root_id: id.to_string(),
            chain: resolver.chain(id)?,
        });
    }

    let common_ancestor = common_ancestor(&lineages);

    tracing::debug!(
        roots = lineages.len(),
        common_ancestor = ?common_ancestor.as_ref().map(|n| n.id.as_str()),
        "Reduced root selection"
    );

    Ok(Reduction {
        common_ancestor,
        lineages,
    })
}

fn common_ancestor(lineages: &[Lineage]) -> Option<Node> {
    if lineages.len() < 2 {
        None
    } else {
        shared_prefix(lineages).last().cloned()
    }
}

fn shared_prefix(lineages: &[Lineage]) -> &[Node] {
    let Some((first, rest)) = lineages.split_first() else {
        return &[];
    };
    let base = first.chain.nodes();
    let len = rest.iter().fold(base.len(), |len, lineage| {
        base.iter()
            .zip(lineage.chain.nodes())
            .take(len)
            .take_while(|(a, b)| a.id == b.id)
            .count()
    });
    &base[..len]
}

//! Descendant tree representation

use crate::store::Node;
use serde::Serialize;

/// A node with its (optionally expanded) children.
///
/// `children == None` means the node has not been expanded; `Some(vec![])` means
/// it was expanded and has no children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescendantTree {
    #[serde(flatten)]
    pub node: Node,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DescendantTree>>,
}

impl DescendantTree {
    pub fn unexpanded(node: Node) -> Self {
        DescendantTree {
            node,
            children: None,
        }
    }

    pub fn leaf(node: Node) -> Self {
        DescendantTree {
            node,
            children: Some(Vec::new()),
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.children.is_some()
    }

    pub fn children(&self) -> &[DescendantTree] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Number of nodes in this tree, itself included.
    pub fn len(&self) -> usize {
        1 + self.children().iter().map(DescendantTree::len).sum::<usize>()
    }

    /// Pre-order iterator over every node.
    pub fn iter(&self) -> impl Iterator<Item = &DescendantTree> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let next = stack.pop()?;
            stack.extend(next.children().iter().rev());
            Some(next)
        })
    }

    pub fn find(&self, id: &str) -> Option<&DescendantTree> {
        self.iter().find(|t| t.node.id == id)
    }
}

//! Hierarchy traversal: ancestor chains, descendant trees and common-ancestor
//! reduction over the flat parent pointers held by a node store.

pub mod ancestors;
pub mod builder;
pub mod lca;
pub mod node;
pub mod traverse;

pub use ancestors::{AncestorChain, AncestorResolver};
pub use builder::TreeBuilder;
pub use lca::{reduce, Lineage, Reduction};
pub use node::DescendantTree;
pub use traverse::{breadth_first, ChildIndex, Visit};

//! Arbor: Attachment Hierarchy Paths and Zip Export
//!
//! Resolves storage paths through flat parent pointers, builds descendant trees,
//! reduces root selections to their least common ancestor, and packages the
//! selected subtrees into deflate zip archives.

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod service;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;

pub use archive::{PackEntry, PathMapper, ZipPlan, ZipPlanEntry, ZipPlanner};
pub use error::{ApiError, StorageError};
pub use service::AttachmentService;
pub use store::{MemoryNodeStore, Node, NodeStore, NodeUpdate, SledNodeStore};
pub use tree::{AncestorResolver, DescendantTree, TreeBuilder};

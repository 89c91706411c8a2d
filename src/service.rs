//! Attachment Service
//!
//! Ties the node store, the content directory and the archive pipeline together:
//! node lifecycle (create, upload, update with physical moves, recursive delete)
//! plus path resolution and packaging of selected subtrees.

use crate::archive::{
    archive_file_name, pack, FsContentResolver, PackEntry, PackOutcome, PathMapper, ZipPlan,
    ZipPlanner,
};
use crate::config::{ArborConfig, DEFAULT_PACK_LIMITS};
use crate::error::ApiError;
use crate::store::{FieldChange, Node, NodeStore, NodeUpdate};
use crate::tree::{AncestorResolver, DescendantTree, TreeBuilder};
use crate::types::{NodeId, DEFAULT_MAX_DEPTH};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A packaged archive together with the name it should be offered under.
#[derive(Debug)]
pub struct Package<W> {
    pub file_name: String,
    pub outcome: PackOutcome<W>,
}

/// Attachment operations over a shared node store and a content directory.
pub struct AttachmentService {
    store: Arc<dyn NodeStore>,
    content: FsContentResolver,
    max_depth: usize,
    pack_limits: usize,
}

impl AttachmentService {
    pub fn new(store: Arc<dyn NodeStore>, file_root: impl Into<PathBuf>) -> Self {
        AttachmentService {
            store,
            content: FsContentResolver::new(file_root),
            max_depth: DEFAULT_MAX_DEPTH,
            pack_limits: DEFAULT_PACK_LIMITS,
        }
    }

    /// Service with limits taken from `config`.
    pub fn with_config(
        store: Arc<dyn NodeStore>,
        file_root: impl Into<PathBuf>,
        config: &ArborConfig,
    ) -> Self {
        AttachmentService {
            max_depth: config.hierarchy.max_depth,
            pack_limits: config.pack.pack_limits,
            ..Self::new(store, file_root)
        }
    }

    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    pub fn file_root(&self) -> &Path {
        self.content.root()
    }

    fn resolver(&self) -> AncestorResolver<'_> {
        AncestorResolver::with_max_depth(self.store.as_ref(), self.max_depth)
    }

    /// Insert `nodes`; parents must exist already or appear earlier in the batch.
    pub fn create(&self, nodes: &[Node]) -> Result<Vec<NodeId>, ApiError> {
        let mut batch: HashSet<&str> = HashSet::with_capacity(nodes.len());
        for node in nodes {
            if self.store.get(&node.id)?.is_some() || !batch.insert(node.id.as_str()) {
                return Err(ApiError::InvalidUpdate(format!(
                    "node {} already exists",
                    node.id
                )));
            }
            if let Some(upper_id) = node.upper_id.as_deref() {
                if !batch.contains(upper_id) && self.store.get(upper_id)?.is_none() {
                    return Err(ApiError::NotFound(upper_id.to_string()));
                }
            }
        }

        for node in nodes {
            self.store.put(node)?;
        }
        tracing::info!(count = nodes.len(), "Created nodes");
        Ok(nodes.iter().map(|n| n.id.clone()).collect())
    }

    /// Store `node` and stream its content from `reader` to its full path.
    pub fn upload<R: Read + ?Sized>(&self, mut node: Node, reader: &mut R) -> Result<Node, ApiError> {
        if self.store.get(&node.id)?.is_some() {
            return Err(ApiError::InvalidUpdate(format!(
                "node {} already exists",
                node.id
            )));
        }
        let full_path = self.prospective_path(node.upper_id.as_deref(), &node.path)?;
        let location = self.locate(&full_path)?;
        if let Some(parent) = location.parent() {
            fs::create_dir_all(parent).map_err(|e| ApiError::io(full_path.as_str(), e))?;
        }

        let mut file = fs::File::create(&location).map_err(|e| ApiError::io(full_path.as_str(), e))?;
        node.size = io::copy(reader, &mut file).map_err(|e| ApiError::io(full_path.as_str(), e))?;
        file.flush().map_err(|e| ApiError::io(full_path.as_str(), e))?;

        if let Err(err) = self.store.put(&node) {
            let _ = fs::remove_file(&location);
            return Err(err.into());
        }
        tracing::info!(id = %node.id, path = %full_path, size = node.size, "Uploaded attachment");
        Ok(node)
    }

    pub fn get(&self, id: &str) -> Result<Node, ApiError> {
        self.store
            .get(id)?
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    pub fn full_path(&self, id: &str) -> Result<String, ApiError> {
        self.resolver().full_path(id)
    }

    /// Full path of `id` relative to `ancestor_id`.
    pub fn full_path_from(&self, id: &str, ancestor_id: &str) -> Result<String, ApiError> {
        self.resolver().full_path_from(id, ancestor_id)
    }

    /// Direct children of `upper_id`, or the forest roots for `None`.
    pub fn find_children(&self, upper_id: Option<&str>) -> Result<Vec<Node>, ApiError> {
        match upper_id {
            Some(id) => {
                self.get(id)?;
                Ok(self.store.children_of(id)?)
            }
            None => Ok(self.store.roots()?),
        }
    }

    pub fn find_descendants(&self, id: &str) -> Result<DescendantTree, ApiError> {
        TreeBuilder::new(self.store.as_ref()).build(id)
    }

    /// Apply `update` to `id`, moving its content when its location changes.
    pub fn update(&self, id: &str, update: &NodeUpdate) -> Result<Vec<FieldChange>, ApiError> {
        let mut node = self.get(id)?;
        if update.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(Some(upper_id)) = &update.upper_id {
            self.check_move_target(id, upper_id)?;
        }

        let old_path = self.full_path(id)?;
        let changes = update.apply(&mut node);
        if changes.is_empty() {
            return Ok(changes);
        }

        let relocated = NodeUpdate::relocates(&changes);
        let new_path = if relocated {
            let new_path = self.prospective_path(node.upper_id.as_deref(), &node.path)?;
            self.move_content(&old_path, &new_path)?;
            Some(new_path)
        } else {
            None
        };

        if let Err(err) = self.store.put(&node) {
            if let Some(new_path) = &new_path {
                let _ = self.move_content(new_path, &old_path);
            }
            return Err(err.into());
        }

        tracing::info!(
            id = %id,
            fields = ?changes.iter().map(|c| c.field).collect::<Vec<_>>(),
            moved_to = ?new_path,
            "Updated node"
        );
        Ok(changes)
    }

    /// Remove `ids` with all their descendants and content; returns the removed full paths.
    pub fn delete<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<String>, ApiError> {
        let mut removed_paths = Vec::new();
        let mut removed: HashSet<NodeId> = HashSet::new();

        for id in ids.iter().map(AsRef::as_ref) {
            if removed.contains(id) {
                continue;
            }
            let full_path = self.full_path(id)?;
            let descendants = self.store.descendants_of(id)?;

            for node in descendants.iter().rev() {
                self.store.remove(&node.id)?;
                removed.insert(node.id.clone());
            }
            self.store.remove(id)?;
            removed.insert(id.to_string());

            self.remove_content(&full_path)?;
            tracing::info!(id = %id, path = %full_path, descendants = descendants.len(), "Deleted node");
            removed_paths.push(full_path);
        }

        Ok(removed_paths)
    }

    /// Plan the archive for `ids` without packing it.
    pub fn plan<S: AsRef<str>>(&self, ids: &[S]) -> Result<ZipPlan, ApiError> {
        ZipPlanner::new(self.store.as_ref(), self.max_depth).plan(ids)
    }

    /// Plan and pack `ids` into `sink`.
    pub fn package<S, W>(
        &self,
        ids: &[S],
        sink: W,
        mapper: &PathMapper,
        auto_close: bool,
    ) -> Result<Package<W>, ApiError>
    where
        S: AsRef<str>,
        W: Write + Seek,
    {
        let plan = self.plan(ids)?;
        if plan.is_empty() {
            let requested: Vec<&str> = ids.iter().map(AsRef::as_ref).collect();
            return Err(ApiError::NotFound(requested.join(",")));
        }
        self.package_plan(&plan, sink, mapper, auto_close)
    }

    /// Pack an existing plan into `sink`; only files count toward the pack limit.
    pub fn package_plan<W>(
        &self,
        plan: &ZipPlan,
        sink: W,
        mapper: &PathMapper,
        auto_close: bool,
    ) -> Result<Package<W>, ApiError>
    where
        W: Write + Seek,
    {
        let files = plan.files().count();
        if files > self.pack_limits {
            return Err(ApiError::PackLimitExceeded {
                limit: self.pack_limits,
                requested: files,
            });
        }

        let entries: Vec<PackEntry> = plan.entries.iter().map(PackEntry::from_plan).collect();
        let file_name = archive_file_name(plan);
        let outcome = pack(sink, &entries, &self.content, mapper, auto_close)?;
        tracing::info!(
            archive = %file_name,
            files,
            folders = entries.len() - files,
            "Packaged attachments"
        );
        Ok(Package { file_name, outcome })
    }

    /// [`package`](Self::package) on the blocking thread pool.
    pub async fn package_in_background<W>(
        self: Arc<Self>,
        ids: Vec<NodeId>,
        sink: W,
        mapper: PathMapper,
        auto_close: bool,
    ) -> Result<Package<W>, ApiError>
    where
        W: Write + Seek + Send + 'static,
    {
        tokio::task::spawn_blocking(move || self.package(&ids, sink, &mapper, auto_close))
            .await
            .map_err(|e| ApiError::TaskFailed(e.to_string()))?
    }

    /// Full path a node would have under `upper_id` with local segment `path`.
    fn prospective_path(&self, upper_id: Option<&str>, path: &str) -> Result<String, ApiError> {
        match upper_id {
            Some(upper_id) => {
                let parent = self.resolver().full_path(upper_id)?;
                Ok(format!("{}/{}", parent, path))
            }
            None => Ok(path.to_string()),
        }
    }

    fn check_move_target(&self, id: &str, upper_id: &str) -> Result<(), ApiError> {
        if upper_id == id {
            return Err(ApiError::InvalidUpdate(format!(
                "node {} cannot be its own parent",
                id
            )));
        }
        let ancestors = self.store.ancestors_of(upper_id, self.max_depth)?;
        if ancestors.iter().any(|n| n.id == id) {
            return Err(ApiError::InvalidUpdate(format!(
                "node {} cannot move below its descendant {}",
                id, upper_id
            )));
        }
        Ok(())
    }

    fn locate(&self, full_path: &str) -> Result<PathBuf, ApiError> {
        self.content
            .locate(full_path)
            .map_err(|e| ApiError::io(full_path, e))
    }

    fn move_content(&self, from: &str, to: &str) -> Result<(), ApiError> {
        let source = self.locate(from)?;
        if !source.exists() {
            tracing::debug!(path = %from, "No content to move");
            return Ok(());
        }
        let target = self.locate(to)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| ApiError::io(to, e))?;
        }
        fs::rename(&source, &target).map_err(|e| ApiError::io(from, e))
    }

    fn remove_content(&self, full_path: &str) -> Result<(), ApiError> {
        let location = self.locate(full_path)?;
        let result = if location.is_dir() {
            fs::remove_dir_all(&location)
        } else {
            fs::remove_file(&location)
        };
        match result {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(ApiError::io(full_path, e)),
            _ => Ok(()),
        }
    }
}

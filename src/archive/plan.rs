//! Zip path planning
//!
//! Turns a root selection into one flat, deduplicated list of archive entries.
//! Each selected root gets an archive folder named by its chain below the common
//! ancestor; its subtree is then walked breadth-first, extending the parent's
//! archive path with the child's name and the parent's physical path with the
//! child's storage segment.

use crate::error::ApiError;
use crate::store::{Node, NodeStore};
use crate::tree::ancestors::{join, AncestorResolver};
use crate::tree::lca::{reduce, Reduction};
use crate::tree::traverse::breadth_first;
use crate::types::{NodeId, Timestamp, FOLDER_TYPE, PATH_SEPARATOR};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// One planned archive entry.
///
/// Identified by `(origin, terminus)`: the common ancestor of the selection (if
/// any) and the node this entry represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZipPlanEntry {
    pub origin: Option<NodeId>,
    pub terminus: NodeId,
    /// Archive-relative path without extension
    pub zip_path: String,
    /// Storage-relative path to the bytes
    pub physical_path: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub name: String,
    pub size: u64,
    pub create_on: Timestamp,
    pub modify_on: Timestamp,
    /// Selected root this entry was expanded from
    pub root_id: NodeId,
    /// Archive folder of that selected root
    pub root_path: String,
}

impl ZipPlanEntry {
    pub fn key(&self) -> (Option<&str>, &str) {
        (self.origin.as_deref(), self.terminus.as_str())
    }

    /// Composite id in the `"origin"-"terminus"` form, `null-"terminus"` without origin.
    pub fn id(&self) -> String {
        match &self.origin {
            Some(origin) => format!("\"{}\"-\"{}\"", origin, self.terminus),
            None => format!("null-\"{}\"", self.terminus),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == FOLDER_TYPE
    }

    /// Name this entry occupies inside the archive.
    pub fn archive_path(&self) -> String {
        if self.is_folder() {
            format!("{}/", self.zip_path)
        } else if self.node_type.is_empty() {
            self.zip_path.clone()
        } else {
            format!("{}.{}", self.zip_path, self.node_type)
        }
    }
}

/// A complete plan for one export request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ZipPlan {
    pub common_ancestor: Option<Node>,
    /// Selected roots, in selection order
    pub roots: Vec<Node>,
    pub entries: Vec<ZipPlanEntry>,
}

impl ZipPlan {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries carrying byte content.
    pub fn files(&self) -> impl Iterator<Item = &ZipPlanEntry> {
        self.entries.iter().filter(|e| !e.is_folder())
    }
}

/// Plans archive entries for root selections.
pub struct ZipPlanner<'a> {
    resolver: AncestorResolver<'a>,
}

impl<'a> ZipPlanner<'a> {
    pub fn new(store: &'a dyn NodeStore, max_depth: usize) -> Self {
        ZipPlanner {
            resolver: AncestorResolver::with_max_depth(store, max_depth),
        }
    }

    /// Plan the archive for `root_ids`, processed in the given order.
    ///
    /// Entry paths start below the common ancestor; its own name is not a segment.
    /// Roots nested under another selected root are folded into the outer one.
    pub fn plan<S: AsRef<str>>(&self, root_ids: &[S]) -> Result<ZipPlan, ApiError> {
        let start = Instant::now();
        let store = self.resolver.store();
        let reduction = reduce(&self.resolver, root_ids)?.outermost();
        let origin = reduction.common_ancestor_id().map(str::to_string);
        let folders = archive_folders(&reduction);

        let mut roots = Vec::with_capacity(reduction.lineages.len());
        let mut entries: Vec<ZipPlanEntry> = Vec::new();
        let mut seen: HashSet<(Option<NodeId>, NodeId)> = HashSet::new();

        for (lineage, root_path) in reduction.lineages.iter().zip(folders) {
            let root = lineage
                .root()
                .cloned()
                .ok_or_else(|| ApiError::NotFound(lineage.root_id.clone()))?;
            let physical_root = lineage.chain.path();
            let descendants = store.descendants_of(&root.id)?;

            let visits = breadth_first(
                root.clone(),
                (root_path.clone(), physical_root),
                descendants,
                |(zip_path, physical_path), node| {
                    (
                        format!("{}/{}", zip_path, node.name),
                        format!("{}/{}", physical_path, node.path),
                    )
                },
            )?;

            for visit in visits {
                let key = (origin.clone(), visit.node.id.clone());
                if !seen.insert(key) {
                    tracing::debug!(
                        terminus = %visit.node.id,
                        root_id = %root.id,
                        "Skipping entry already planned by an overlapping root"
                    );
                    continue;
                }
                let (zip_path, physical_path) = visit.payload;
                entries.push(ZipPlanEntry {
                    origin: origin.clone(),
                    terminus: visit.node.id,
                    zip_path,
                    physical_path,
                    node_type: visit.node.node_type,
                    name: visit.node.name,
                    size: visit.node.size,
                    create_on: visit.node.create_on,
                    modify_on: visit.node.modify_on,
                    root_id: root.id.clone(),
                    root_path: root_path.clone(),
                });
            }
            roots.push(root);
        }

        check_collisions(&entries)?;

        tracing::info!(
            roots = roots.len(),
            entries = entries.len(),
            common_ancestor = ?origin,
            duration_ms = start.elapsed().as_millis() as u64,
            "Planned archive entries"
        );

        Ok(ZipPlan {
            common_ancestor: reduction.common_ancestor.clone(),
            roots,
            entries,
        })
    }
}

/// Archive folder for each lineage.
///
/// A lone root is named by itself, otherwise by its residual name chain. Roots
/// without a common ancestor whose chains read the same get their id appended.
fn archive_folders(reduction: &Reduction) -> Vec<String> {
    if let [lineage] = reduction.lineages.as_slice() {
        return vec![lineage.root().map(|n| n.name.clone()).unwrap_or_default()];
    }
    let folders: Vec<String> = reduction
        .lineages
        .iter()
        .map(|lineage| join(reduction.residual(lineage).iter().map(|n| n.name.as_str())))
        .collect();
    if reduction.common_ancestor.is_some() {
        return folders;
    }

    let mut claims: HashMap<&str, usize> = HashMap::new();
    for folder in &folders {
        *claims.entry(folder.as_str()).or_default() += 1;
    }
    folders
        .iter()
        .zip(&reduction.lineages)
        .map(|(folder, lineage)| {
            if claims[folder.as_str()] > 1 {
                format!("{} ({})", folder, lineage.root_id.replace(PATH_SEPARATOR, "_"))
            } else {
                folder.clone()
            }
        })
        .collect()
}

fn check_collisions(entries: &[ZipPlanEntry]) -> Result<(), ApiError> {
    let mut claimed: HashMap<String, &ZipPlanEntry> = HashMap::with_capacity(entries.len());
    for entry in entries {
        let archive_path = entry.archive_path();
        if let Some(previous) = claimed.insert(archive_path.clone(), entry) {
            return Err(ApiError::DuplicateEntryConflict {
                zip_path: archive_path,
                first: previous.terminus.clone(),
                second: entry.terminus.clone(),
            });
        }
    }
    Ok(())
}

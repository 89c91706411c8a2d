//! CLI Tooling
//!
//! Command-line interface over a workspace-scoped attachment store: import a
//! directory tree, inspect hierarchy paths, plan and pack archives.

use crate::archive::PathMapper;
use crate::config::{ArborConfig, ConfigLoader};
use crate::error::ApiError;
use crate::logging::LoggingConfig;
use crate::service::AttachmentService;
use crate::store::{Node, NodeStore, SledNodeStore};
use crate::tree::DescendantTree;
use crate::types::NodeId;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use walkdir::WalkDir;

/// Arbor CLI - attachment hierarchies and zip export
#[derive(Parser)]
#[command(name = "arbor")]
#[command(about = "Resolve attachment hierarchy paths and package subtrees as zip archives")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    /// Fold the logging flags over the configured logging section.
    pub fn apply_logging_overrides(&self, logging: &mut LoggingConfig) {
        if let Some(level) = &self.log_level {
            logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            logging.format = format.clone();
        }
        if let Some(output) = &self.log_output {
            logging.output = output.clone();
        }
        if let Some(file) = &self.log_file {
            logging.file = Some(file.clone());
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a directory tree as attachments
    Import {
        /// Directory to import
        dir: PathBuf,
        /// Parent node for the imported tree
        #[arg(long)]
        under: Option<NodeId>,
    },
    /// List direct children of a node, or the roots
    List {
        #[arg(long)]
        upper: Option<NodeId>,
    },
    /// Print the full storage path of a node
    Path {
        id: NodeId,
        /// Resolve relative to this ancestor
        #[arg(long)]
        from: Option<NodeId>,
    },
    /// Print the descendant tree of a node
    Tree {
        id: NodeId,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the archive entries planned for a selection
    Plan {
        #[arg(required = true)]
        ids: Vec<NodeId>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Package a selection into a zip archive
    Pack {
        #[arg(required = true)]
        ids: Vec<NodeId>,
        /// Archive to write; defaults to the derived archive name in the current directory
        #[arg(long)]
        output: Option<PathBuf>,
        /// Folder mapper: JSON object or a single replacement folder name
        #[arg(long, default_value = "")]
        mapper: String,
    },
    /// Delete nodes with their descendants and content
    Delete {
        #[arg(required = true)]
        ids: Vec<NodeId>,
    },
}

/// CLI context for one workspace
pub struct CliContext {
    service: Arc<AttachmentService>,
    store: Arc<SledNodeStore>,
    config: ArborConfig,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };

        let (store_path, file_root) = config.storage.resolve_paths(&workspace_root)?;
        for dir in [&store_path, &file_root] {
            std::fs::create_dir_all(dir)
                .map_err(|e| ApiError::io(dir.display().to_string(), e))?;
        }

        let store = Arc::new(SledNodeStore::open(&store_path)?);
        let service = Arc::new(AttachmentService::with_config(
            store.clone(),
            file_root,
            &config,
        ));

        Ok(Self {
            service,
            store,
            config,
        })
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    pub fn service(&self) -> &AttachmentService {
        &self.service
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Import { dir, under } => self.handle_import(dir, under.as_deref()),
            Commands::List { upper } => {
                let children = self.service.find_children(upper.as_deref())?;
                Ok(children
                    .iter()
                    .map(|n| format!("{}\t{}\t{}", n.id, n.node_type, n.file_name()))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            Commands::Path { id, from } => match from {
                Some(ancestor) => self.service.full_path_from(id, ancestor),
                None => self.service.full_path(id),
            },
            Commands::Tree { id, format } => {
                let tree = self.service.find_descendants(id)?;
                match format.as_str() {
                    "json" => to_json(&tree),
                    _ => {
                        let mut lines = Vec::new();
                        render_tree(&tree, 0, &mut lines);
                        Ok(lines.join("\n"))
                    }
                }
            }
            Commands::Plan { ids, format } => {
                let plan = self.service.plan(ids)?;
                match format.as_str() {
                    "json" => to_json(&plan),
                    _ => Ok(plan
                        .entries
                        .iter()
                        .map(|e| format!("{}\t{}", e.archive_path(), e.physical_path))
                        .collect::<Vec<_>>()
                        .join("\n")),
                }
            }
            Commands::Pack {
                ids,
                output,
                mapper,
            } => self.handle_pack(ids, output.as_deref(), mapper),
            Commands::Delete { ids } => {
                let removed = self.service.delete(ids)?;
                self.store.flush()?;
                Ok(removed
                    .iter()
                    .map(|p| format!("Deleted {}", p))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
    }

    fn handle_import(&self, dir: &Path, under: Option<&str>) -> Result<String, ApiError> {
        let base = match under {
            Some(upper_id) => {
                self.service.get(upper_id)?;
                format!("{}/", upper_id)
            }
            None => String::new(),
        };

        let mut ids: HashMap<PathBuf, NodeId> = HashMap::new();
        let mut folders = 0usize;
        let mut files = 0usize;
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().map(|p| p.display().to_string()).unwrap_or_default();
                ApiError::io(path, e.into())
            })?;
            let relative = entry
                .path()
                .strip_prefix(dir.parent().unwrap_or(dir))
                .unwrap_or(entry.path());
            let id = format!("{}{}", base, relative.to_string_lossy().replace('\\', "/"));
            let upper_id = match entry.path().parent().and_then(|p| ids.get(p)) {
                Some(parent) => Some(parent.clone()),
                None => under.map(str::to_string),
            };
            let file_name = entry.file_name().to_string_lossy().into_owned();

            let mut node = if entry.file_type().is_dir() {
                Node::folder(id.clone(), file_name.clone(), file_name)
            } else {
                let path = Path::new(&file_name);
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.clone());
                let node_type = path
                    .extension()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Node::file(id.clone(), name, node_type, file_name)
            };
            node.upper_id = upper_id;

            if entry.file_type().is_dir() {
                self.service.create(std::slice::from_ref(&node))?;
                folders += 1;
            } else {
                let mut source = File::open(entry.path())
                    .map_err(|e| ApiError::io(entry.path().display().to_string(), e))?;
                self.service.upload(node, &mut source)?;
                files += 1;
            }
            ids.insert(entry.path().to_path_buf(), id);
        }
        self.store.flush()?;

        Ok(format!(
            "Imported {} folders and {} files from {}",
            folders,
            files,
            dir.display()
        ))
    }

    fn handle_pack(
        &self,
        ids: &[NodeId],
        output: Option<&Path>,
        mapper: &str,
    ) -> Result<String, ApiError> {
        let mapper = PathMapper::parse(mapper)?;
        let plan = self.service.plan(ids)?;
        if plan.is_empty() {
            return Err(ApiError::NotFound(ids.join(",")));
        }
        let output = match output {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(crate::archive::archive_file_name(&plan)),
        };

        let file = File::create(&output)
            .map_err(|e| ApiError::io(output.display().to_string(), e))?;
        match self.service.package_plan(&plan, BufWriter::new(file), &mapper, true) {
            Ok(package) => Ok(format!(
                "Packed {} files ({} bytes) into {} as {}",
                plan.files().count(),
                package.outcome.bytes_written,
                output.display(),
                package.file_name
            )),
            Err(err) => {
                // A failed pack leaves an unusable archive behind.
                let _ = std::fs::remove_file(&output);
                Err(err)
            }
        }
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Import { .. } => "import",
        Commands::List { .. } => "list",
        Commands::Path { .. } => "path",
        Commands::Tree { .. } => "tree",
        Commands::Plan { .. } => "plan",
        Commands::Pack { .. } => "pack",
        Commands::Delete { .. } => "delete",
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize output: {}", e)))
}

fn render_tree(tree: &DescendantTree, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}{} ({})",
        "  ".repeat(depth),
        tree.node.file_name(),
        tree.node.id
    ));
    for child in tree.children() {
        render_tree(child, depth + 1, lines);
    }
}

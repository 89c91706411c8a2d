//! Core types shared across the attachment hierarchy and archive layers.

use chrono::{DateTime, Utc};

/// NodeId: Opaque, globally unique identifier of an attachment node
pub type NodeId = String;

/// Timestamp: Creation/modification instant carried by every node
pub type Timestamp = DateTime<Utc>;

/// Reserved `type` value marking a folder node (no byte content of its own)
pub const FOLDER_TYPE: &str = ":d";

/// Separator used for logical and physical paths
pub const PATH_SEPARATOR: char = '/';

/// Default bound on parent-chain walks
pub const DEFAULT_MAX_DEPTH: usize = 1000;

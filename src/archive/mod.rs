//! Archive export: planning archive paths for a root selection and streaming the
//! planned files into a zip.

pub mod content;
pub mod naming;
pub mod pack;
pub mod plan;

pub use content::{ContentResolver, FsContentResolver, MemoryContent};
pub use naming::{archive_file_name, content_disposition};
pub use pack::{pack, PackEntry, PackOutcome, PathMapper, FALLBACK_KEY};
pub use plan::{ZipPlan, ZipPlanEntry, ZipPlanner};

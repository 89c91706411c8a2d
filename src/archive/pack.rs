//! Archive packing
//!
//! Streams entry content into a deflate zip, one source handle at a time, and
//! writes a directory entry for every folder. The destination is wrapped in a
//! [`GuardedSink`] that refuses further writes once packing has failed, so the
//! zip writer's drop cannot quietly finalize a partial archive into something
//! that looks complete.

use super::content::ContentResolver;
use super::plan::ZipPlanEntry;
use crate::error::ApiError;
use crate::types::{Timestamp, FOLDER_TYPE, PATH_SEPARATOR};
use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Mapper key consulted when a folder has no exact entry.
pub const FALLBACK_KEY: &str = "_";

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Folder rename table: exact match, then [`FALLBACK_KEY`], then the folder itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathMapper {
    entries: HashMap<String, String>,
}

impl PathMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a caller-supplied mapper.
    ///
    /// Empty input maps nothing, input starting with `{` is a JSON object, and
    /// anything else renames every folder to that value.
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::default());
        }
        if raw.starts_with('{') {
            let entries: HashMap<String, String> = serde_json::from_str(raw).map_err(|e| {
                ApiError::InvalidUpdate(format!("path mapper is not a string map: {}", e))
            })?;
            return Ok(PathMapper { entries });
        }
        Ok(PathMapper::from_iter([(FALLBACK_KEY, raw)]))
    }

    pub fn insert(&mut self, folder: impl Into<String>, replacement: impl Into<String>) {
        self.entries.insert(folder.into(), replacement.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve<'a>(&'a self, folder: &'a str) -> &'a str {
        self.entries
            .get(folder)
            .or_else(|| self.entries.get(FALLBACK_KEY))
            .map(String::as_str)
            .unwrap_or(folder)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathMapper {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        PathMapper {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One file or folder to write into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    /// Logical folder; the key looked up in the [`PathMapper`]
    pub folder: String,
    /// Sub-path between the folder and the entry
    pub relative: String,
    /// Empty for a selected folder, which is the mapped folder itself
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub size: u64,
    pub physical_path: String,
    pub create_on: Timestamp,
    pub modify_on: Timestamp,
}

impl PackEntry {
    /// Pack entry for a planned file or folder.
    ///
    /// The folder is the selected root's archive folder, so one mapper key renames
    /// a whole exported subtree. A selected file sits in its parent folder.
    pub fn from_plan(entry: &ZipPlanEntry) -> PackEntry {
        let selected = entry.terminus == entry.root_id;
        let (folder, relative, name) = if selected && entry.is_folder() {
            (entry.root_path.clone(), String::new(), String::new())
        } else if selected {
            (
                parent_of(&entry.root_path).to_string(),
                String::new(),
                entry.name.clone(),
            )
        } else {
            let parent = parent_of(&entry.zip_path);
            let relative = parent
                .strip_prefix(entry.root_path.as_str())
                .map(|rest| rest.trim_start_matches(PATH_SEPARATOR))
                .unwrap_or(parent);
            (entry.root_path.clone(), relative.to_string(), entry.name.clone())
        };
        PackEntry {
            folder,
            relative,
            name,
            node_type: entry.node_type.clone(),
            size: entry.size,
            physical_path: entry.physical_path.clone(),
            create_on: entry.create_on,
            modify_on: entry.modify_on,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.node_type == FOLDER_TYPE
    }

    pub fn file_name(&self) -> String {
        if self.node_type.is_empty() || self.is_folder() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.node_type)
        }
    }

    /// Entry name inside the archive after folder remapping, without a leading `/`.
    ///
    /// Folder entries end with `/`.
    pub fn archive_path(&self, mapper: &PathMapper) -> String {
        let folder = mapper.resolve(&self.folder);
        let file_name = self.file_name();
        let path = [
            folder.trim_matches(PATH_SEPARATOR),
            self.relative.trim_matches(PATH_SEPARATOR),
            file_name.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
        if self.is_folder() {
            format!("{}/", path)
        } else {
            path
        }
    }
}

fn parent_of(path: &str) -> &str {
    path.rfind(PATH_SEPARATOR).map(|i| &path[..i]).unwrap_or("")
}

/// Result of a successful [`pack`].
#[derive(Debug)]
pub struct PackOutcome<W> {
    pub entries_written: usize,
    pub bytes_written: u64,
    /// The destination, handed back when it was not auto-closed
    pub sink: Option<W>,
}

/// Write `entries` into a zip on `destination`, in order.
///
/// Each source is opened, streamed and dropped before the next one. On failure the
/// destination is left partially written and unusable; the caller discards it.
pub fn pack<W, R>(
    destination: W,
    entries: &[PackEntry],
    resolver: &R,
    mapper: &PathMapper,
    auto_close: bool,
) -> Result<PackOutcome<W>, ApiError>
where
    W: Write + Seek,
    R: ContentResolver + ?Sized,
{
    let start = Instant::now();
    let poisoned = Arc::new(AtomicBool::new(false));
    let mut zip = ZipWriter::new(GuardedSink::new(destination, poisoned.clone()));
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut bytes_written = 0u64;
    let mut entries_written = 0usize;
    let mut directories: HashSet<String> = HashSet::new();

    for entry in entries {
        let result = if entry.is_folder() {
            write_directory(&mut zip, entry, mapper, &mut directories)
        } else {
            write_entry(&mut zip, entry, resolver, mapper, &mut buffer).map(Some)
        };
        match result {
            Ok(Some(copied)) => {
                bytes_written += copied;
                entries_written += 1;
            }
            Ok(None) => {}
            Err(err) => {
                poisoned.store(true, Ordering::SeqCst);
                tracing::error!(
                    physical_path = %entry.physical_path,
                    error = %err,
                    "Packing aborted"
                );
                return Err(err);
            }
        }
    }

    let mut sink = zip
        .finish()
        .inspect_err(|_| poisoned.store(true, Ordering::SeqCst))?
        .into_inner();
    sink.flush().map_err(|e| ApiError::io("<archive>", e))?;

    tracing::info!(
        entries = entries_written,
        bytes = bytes_written,
        auto_close,
        duration_ms = start.elapsed().as_millis() as u64,
        "Packed archive"
    );

    Ok(PackOutcome {
        entries_written,
        bytes_written,
        sink: if auto_close { None } else { Some(sink) },
    })
}

fn write_entry<W, R>(
    zip: &mut ZipWriter<W>,
    entry: &PackEntry,
    resolver: &R,
    mapper: &PathMapper,
    buffer: &mut [u8],
) -> Result<u64, ApiError>
where
    W: Write + Seek,
    R: ContentResolver + ?Sized,
{
    let name = entry.archive_path(mapper);
    let mut source = resolver
        .open(&entry.physical_path)
        .map_err(|e| ApiError::io(entry.physical_path.as_str(), e))?;

    zip.start_file(name.as_str(), entry_options(entry))?;

    let mut copied = 0u64;
    loop {
        let n = match source.read(buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ApiError::io(entry.physical_path.as_str(), e)),
        };
        zip.write_all(&buffer[..n])
            .map_err(|e| ApiError::io(name.as_str(), e))?;
        copied += n as u64;
    }

    tracing::debug!(entry = %name, bytes = copied, "Wrote archive entry");
    Ok(copied)
}

/// Directory entry; a name already written (two folders mapped together) is skipped.
fn write_directory<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    entry: &PackEntry,
    mapper: &PathMapper,
    written: &mut HashSet<String>,
) -> Result<Option<u64>, ApiError> {
    let name = entry.archive_path(mapper);
    if name == "/" || !written.insert(name.clone()) {
        return Ok(None);
    }
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(zip_time(&entry.modify_on));
    zip.add_directory(name.as_str(), options)?;
    tracing::debug!(entry = %name, "Wrote archive directory");
    Ok(Some(0))
}

fn entry_options(entry: &PackEntry) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip_time(&entry.modify_on))
        .large_file(entry.size > u32::MAX as u64)
}

/// DOS time for the standard header; dates before 1980 clamp to the format minimum.
fn zip_time(ts: &Timestamp) -> zip::DateTime {
    zip::DateTime::from_date_and_time(
        ts.year().clamp(1980, 2107) as u16,
        ts.month() as u8,
        ts.day() as u8,
        ts.hour() as u8,
        ts.minute() as u8,
        ts.second().min(59) as u8,
    )
    .unwrap_or_default()
}

/// Destination wrapper that fails every operation once poisoned.
struct GuardedSink<W> {
    inner: W,
    poisoned: Arc<AtomicBool>,
}

impl<W> GuardedSink<W> {
    fn new(inner: W, poisoned: Arc<AtomicBool>) -> Self {
        GuardedSink { inner, poisoned }
    }

    fn into_inner(self) -> W {
        self.inner
    }

    fn check(&self) -> io::Result<()> {
        if self.poisoned.load(Ordering::SeqCst) {
            Err(io::Error::new(
                io::ErrorKind::Other,
                "archive aborted after a failed entry",
            ))
        } else {
            Ok(())
        }
    }
}

impl<W: Write> Write for GuardedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}

impl<W: Seek> Seek for GuardedSink<W> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.check()?;
        self.inner.seek(pos)
    }
}

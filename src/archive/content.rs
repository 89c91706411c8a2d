//! Content resolution: physical path → readable byte source

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// Opens the bytes stored under a storage-relative physical path.
pub trait ContentResolver {
    fn open(&self, physical_path: &str) -> io::Result<Box<dyn Read + '_>>;
}

/// Resolves physical paths below a file root directory.
#[derive(Debug, Clone)]
pub struct FsContentResolver {
    root: PathBuf,
}

impl FsContentResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsContentResolver { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of `physical_path`; paths escaping the root are rejected.
    pub fn locate(&self, physical_path: &str) -> io::Result<PathBuf> {
        let relative = Path::new(physical_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("physical path escapes file root: {}", physical_path),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentResolver for FsContentResolver {
    fn open(&self, physical_path: &str) -> io::Result<Box<dyn Read + '_>> {
        let file = File::open(self.locate(physical_path)?)?;
        Ok(Box::new(file))
    }
}

/// In-memory content keyed by physical path.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, physical_path: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.files.insert(physical_path.into(), bytes.into());
    }
}

impl ContentResolver for MemoryContent {
    fn open(&self, physical_path: &str) -> io::Result<Box<dyn Read + '_>> {
        match self.files.get(physical_path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no content for {}", physical_path),
            )),
        }
    }
}

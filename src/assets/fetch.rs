use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::Context;

use crate::foundation::error::{StageError, StageResult};

/// Supplies encoded image bytes for a URL-like source string.
///
/// The stage is indifferent to where bytes come from; fetching happens before
/// any stack mutation so a failed load can never leave a partial insert.
pub trait ImageFetcher {
    fn fetch(&self, source: &str) -> StageResult<Vec<u8>>;
}

/// Fetcher resolving normalized relative paths under a root directory.
#[derive(Clone, Debug)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ImageFetcher for FsFetcher {
    fn fetch(&self, source: &str) -> StageResult<Vec<u8>> {
        let norm = normalize_rel_path(source)?;
        let path = self.root.join(Path::new(&norm));
        std::fs::read(&path)
            .with_context(|| format!("read image bytes from '{}'", path.display()))
            .map_err(StageError::from)
    }
}

/// In-memory fetcher keyed by source string. Used by tests.
#[derive(Clone, Debug, Default)]
pub struct MemoryFetcher {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, bytes: Vec<u8>) {
        self.entries.insert(source.into(), bytes);
    }
}

impl ImageFetcher for MemoryFetcher {
    fn fetch(&self, source: &str) -> StageResult<Vec<u8>> {
        self.entries
            .get(source)
            .cloned()
            .ok_or_else(|| StageError::image_load(format!("unknown image source '{source}'")))
    }
}

/// Normalize and validate root-relative image paths.
///
/// The normalized result uses `/` separators, removes `.` segments, and rejects
/// absolute paths or parent traversals (`..`).
pub fn normalize_rel_path(source: &str) -> StageResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') {
        return Err(StageError::validation("image paths must be relative"));
    }
    if s.is_empty() {
        return Err(StageError::validation("image path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(StageError::validation("image paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(StageError::validation("image path must contain a file name"));
    }

    Ok(out.join("/"))
}

//! Read-only view over the test corpus, snapshotted into memory at
//! construction so concurrent runner tasks never contend on the filesystem.
//!
//! Mirrors the Go implementation's use of `fs.FS` / `fstest.MapFS`: one real
//! on-disk implementation, one in-memory test double.

use std::collections::HashMap;
use std::path::Path;

/// A keyed, read-only mapping from corpus-relative path to file bytes.
pub trait Corpus: Send + Sync {
    /// Reads a file by its path relative to the corpus root
    /// (e.g. `valid/string/simple.toml`).
    fn read(&self, path: &str) -> Option<&[u8]>;

    /// Lists every path under the corpus, in arbitrary order.
    fn paths(&self) -> Vec<&str>;
}

/// A corpus snapshotted from an on-disk directory tree.
pub struct FsCorpus {
    files: HashMap<String, Vec<u8>>,
}

impl FsCorpus {
    /// Walks `root` recursively and loads every regular file into memory,
    /// keyed by its path relative to `root` with `/` separators.
    pub fn load(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref();
        let mut files = HashMap::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            for entry in fs_err::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    stack.push(path);
                    continue;
                }
                let rel = path
                    .strip_prefix(root)
                    .expect("walked path is under root")
                    .to_string_lossy()
                    .replace(std::path::MAIN_SEPARATOR, "/");
                let bytes = fs_err::read(&path)?;
                if std::str::from_utf8(&bytes).is_err() {
                    tracing::warn!(path = %rel, "corpus file is not valid UTF-8");
                }
                files.insert(rel, bytes);
            }
        }
        Ok(FsCorpus { files })
    }
}

impl Corpus for FsCorpus {
    fn read(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    fn paths(&self) -> Vec<&str> {
        self.files.keys().map(|s| s.as_str()).collect()
    }
}

/// An in-memory corpus for tests, analogous to Go's `fstest.MapFS`.
#[derive(Default)]
pub struct MapCorpus {
    files: HashMap<String, Vec<u8>>,
}

impl MapCorpus {
    pub fn new() -> Self {
        MapCorpus::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), data.into());
        self
    }
}

impl Corpus for MapCorpus {
    fn read(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    fn paths(&self) -> Vec<&str> {
        self.files.keys().map(|s| s.as_str()).collect()
    }
}

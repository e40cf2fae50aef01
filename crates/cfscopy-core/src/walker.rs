//! Deterministic source tree traversal
//!
//! [`TreeWalker`] yields every directory and regular file below a root in
//! pre-order, so a directory always comes before anything inside it. Entries
//! within one directory are sorted by file name, which keeps the order (and
//! therefore the run log) reproducible for an unchanged tree.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kind of a source entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A directory to recreate
    Directory,
    /// A regular file to copy
    File,
}

/// One step of the traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    /// Path relative to the source root
    pub relative_path: PathBuf,
    /// Directory or file
    pub kind: EntryKind,
}

impl PathEntry {
    /// Absolute location under `root` (source or destination)
    pub fn rooted_at(&self, root: &Path) -> PathBuf {
        root.join(&self.relative_path)
    }
}

/// Lazy pre-order walk of a source tree
pub struct TreeWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

impl TreeWalker {
    /// Create a walker rooted at `root`; the root itself is not yielded
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        let inner = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Self { root, inner }
    }
}

impl Iterator for TreeWalker {
    type Item = Result<PathEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(Error::Walk(e.to_string()))),
            };

            let file_type = entry.file_type();
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() {
                EntryKind::File
            } else {
                tracing::debug!("Skipping non-regular entry {:?}", entry.path());
                continue;
            };

            let relative_path = match entry.path().strip_prefix(&self.root) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => {
                    return Some(Err(Error::Walk(format!(
                        "{} is outside {}",
                        entry.path().display(),
                        self.root.display()
                    ))))
                }
            };

            return Some(Ok(PathEntry {
                relative_path,
                kind,
            }));
        }
    }
}

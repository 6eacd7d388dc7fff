//! Directory snapshots and changesets
//!
//! A [`DirectorySnapshot`] records the content hash of every file under
//! a root. [`ChangeSet::diff`] compares two snapshots as a pure
//! function; the resulting changeset is ordered by path and never
//! mutated after creation.

use crate::error::{CrucibleError, CrucibleResult};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Kind of file-level change between two trees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Present in the new tree only
    Added,
    /// Present in the base tree only
    Removed,
    /// Present in both with different content
    Modified,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "A"),
            Self::Removed => write!(f, "D"),
            Self::Modified => write!(f, "M"),
        }
    }
}

/// A single file-level difference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path relative to the snapshot root, '/'-separated
    pub path: String,
    /// What happened to the file
    pub kind: ChangeKind,
}

/// Content state of a directory tree at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    root: PathBuf,
    files: BTreeMap<String, String>,
}

impl DirectorySnapshot {
    /// Capture the current state of `root`.
    ///
    /// Hashes every regular file; symlinks and other special entries
    /// are skipped. Paths are recorded relative to `root`.
    pub fn capture(root: &Path) -> CrucibleResult<Self> {
        if !root.is_dir() {
            return Err(CrucibleError::PathNotFound(root.to_path_buf()));
        }

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|e| {
                CrucibleError::io(
                    format!("walking {}", root.display()),
                    e.into_io_error()
                        .unwrap_or_else(|| std::io::Error::other("walkdir loop")),
                )
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|e| CrucibleError::Internal(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");

            let content = std::fs::read(entry.path())
                .map_err(|e| CrucibleError::io(format!("reading {}", entry.path().display()), e))?;
            files.insert(rel, hex::encode(Sha256::digest(&content)));
        }

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Root the snapshot was captured from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of files captured
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot contains no files
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Ordered collection of file-level differences between two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<FileChange>,
    result_root: PathBuf,
}

impl ChangeSet {
    /// Compute the differences of `new` relative to `base`.
    ///
    /// Pure comparison over the captured hashes; ordered by path. The
    /// changeset remembers the new tree's root so the changes can later
    /// be materialized.
    pub fn diff(new: &DirectorySnapshot, base: &DirectorySnapshot) -> Self {
        let mut changes = Vec::new();

        for (path, hash) in &new.files {
            match base.files.get(path) {
                None => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Added,
                }),
                Some(base_hash) if base_hash != hash => changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                }),
                Some(_) => {}
            }
        }
        for path in base.files.keys() {
            if !new.files.contains_key(path) {
                changes.push(FileChange {
                    path: path.clone(),
                    kind: ChangeKind::Removed,
                });
            }
        }
        changes.sort_by(|a, b| a.path.cmp(&b.path));

        Self {
            changes,
            result_root: new.root.clone(),
        }
    }

    /// Changes ordered by path
    pub fn changes(&self) -> &[FileChange] {
        &self.changes
    }

    /// Number of changed files
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the two trees were identical
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Root of the tree the changes were taken from
    pub fn result_root(&self) -> &Path {
        &self.result_root
    }

    /// Apply the changes onto `dest`.
    ///
    /// Copies added/modified files from the result tree and deletes
    /// removed ones. Unchanged files are left untouched.
    pub fn materialize(&self, dest: &Path) -> CrucibleResult<()> {
        for change in &self.changes {
            let target = dest.join(&change.path);
            match change.kind {
                ChangeKind::Added | ChangeKind::Modified => {
                    if let Some(parent) = target.parent() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            CrucibleError::io(format!("creating {}", parent.display()), e)
                        })?;
                    }
                    std::fs::copy(self.result_root.join(&change.path), &target).map_err(|e| {
                        CrucibleError::io(format!("writing {}", target.display()), e)
                    })?;
                }
                ChangeKind::Removed => {
                    std::fs::remove_file(&target).map_err(|e| {
                        CrucibleError::io(format!("removing {}", target.display()), e)
                    })?;
                }
            }
        }
        Ok(())
    }
}

//! Async depth-first directory scanner.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use tokio::fs::{self, ReadDir};

use cleanmate_core::{CleanConfig, CleanError, PathValidator, ScanEntry, Verdict, is_writable};

/// Walks whitelisted roots and yields their contents without mutating anything.
#[derive(Debug, Clone, Default)]
pub struct RecursiveScanner {
    follow_symlinks: bool,
}

impl RecursiveScanner {
    /// Create a scanner that never follows symbolic links.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner from configuration.
    pub fn with_config(config: &CleanConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
        }
    }

    /// Report symlinks whose resolved target stays inside the allowed roots.
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Start a fresh traversal of `root`.
    ///
    /// The root is validated first; a denied or missing root yields an
    /// empty walk. Only a root that exists but cannot be listed is an error.
    pub async fn walk(
        &self,
        root: &Path,
        category: impl Into<CompactString>,
        validator: &PathValidator,
    ) -> Result<Walk, CleanError> {
        let category = category.into();

        // Resolution walks the filesystem; keep it off the runtime threads.
        let check = {
            let validator = validator.clone();
            let root = root.to_path_buf();
            tokio::task::spawn_blocking(move || validator.check(&root))
        };
        let verdict = check
            .await
            .unwrap_or_else(|err| Verdict::Denied(format!("validation task failed: {err}")));

        let resolved = match verdict {
            Verdict::Allowed(resolved) => resolved,
            Verdict::Denied(reason) => {
                if fs::symlink_metadata(root).await.is_ok() {
                    tracing::warn!(root = %root.display(), %reason, "root denied, skipping");
                } else {
                    tracing::debug!(root = %root.display(), "root does not exist");
                }
                return Ok(Walk::empty(category, validator.clone()));
            }
        };

        let reader = match fs::read_dir(&resolved).await {
            Ok(reader) => reader,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Walk::empty(category, validator.clone()));
            }
            Err(source) => {
                return Err(CleanError::RootInaccessible {
                    path: resolved,
                    source,
                });
            }
        };

        Ok(Walk {
            stack: vec![Frame {
                dir: resolved,
                reader: Some(reader),
            }],
            category,
            follow_symlinks: self.follow_symlinks,
            validator: validator.clone(),
        })
    }

    /// Walk `root` to completion and collect every entry.
    pub async fn scan(
        &self,
        root: &Path,
        category: impl Into<CompactString>,
        validator: &PathValidator,
    ) -> Result<Vec<ScanEntry>, CleanError> {
        Ok(self.walk(root, category, validator).await?.collect().await)
    }
}

/// A directory on the traversal stack.
struct Frame {
    dir: PathBuf,
    reader: Option<ReadDir>,
}

/// A single, non-restartable traversal.
///
/// Entries come out depth-first in directory-listing order. A directory is
/// yielded only after all of its descendants; the root itself is never yielded.
/// Only real directories are descended into, so every file is seen once.
pub struct Walk {
    stack: Vec<Frame>,
    category: CompactString,
    follow_symlinks: bool,
    validator: PathValidator,
}

impl Walk {
    fn empty(category: CompactString, validator: PathValidator) -> Self {
        Self {
            stack: Vec::new(),
            category,
            follow_symlinks: false,
            validator,
        }
    }

    /// Category assigned to every entry of this walk.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Yield the next entry, or `None` once the walk is exhausted.
    pub async fn next_entry(&mut self) -> Option<ScanEntry> {
        loop {
            let depth = self.stack.len();
            let frame = self.stack.last_mut()?;

            if frame.reader.is_none() {
                match fs::read_dir(&frame.dir).await {
                    Ok(reader) => frame.reader = Some(reader),
                    Err(err) => {
                        // Unreadable subdirectory: drop it and everything below.
                        tracing::debug!(path = %frame.dir.display(), error = %err, "skipping unreadable directory");
                        self.stack.pop();
                        continue;
                    }
                }
            }

            let next = match frame.reader.as_mut() {
                Some(reader) => reader.next_entry().await,
                None => Ok(None),
            };

            let dir_entry = match next {
                Ok(Some(dir_entry)) => dir_entry,
                Ok(None) | Err(_) => {
                    let finished = self.stack.pop()?;
                    if depth > 1 {
                        return Some(ScanEntry::directory(finished.dir, self.category.clone()));
                    }
                    continue;
                }
            };

            let path = dir_entry.path();
            let metadata = match fs::symlink_metadata(&path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "entry vanished or unreadable");
                    continue;
                }
            };

            let file_type = metadata.file_type();
            if file_type.is_dir() {
                self.stack.push(Frame {
                    dir: path,
                    reader: None,
                });
            } else if file_type.is_file() {
                return Some(ScanEntry::file(
                    path,
                    metadata.len(),
                    is_writable(&metadata),
                    self.category.clone(),
                ));
            } else if file_type.is_symlink() {
                if let Some(entry) = self.follow(path).await {
                    return Some(entry);
                }
            }
        }
    }

    /// Decide what a symlink contributes. Links are only reported when
    /// enabled and when their target resolves inside an allowed root.
    ///
    /// Whatever the target is, it already lies under an allowed root and is
    /// counted by the walk of that root. The link itself is reported as a
    /// zero-byte entry and never descended into.
    async fn follow(&self, link: PathBuf) -> Option<ScanEntry> {
        if !self.follow_symlinks {
            tracing::trace!(path = %link.display(), "not following symlink");
            return None;
        }

        let target = fs::canonicalize(&link).await.ok()?;
        let target = dunce::simplified(&target).to_path_buf();
        if !self.validator.allows_resolved(&target) {
            tracing::warn!(link = %link.display(), target = %target.display(), "symlink escapes allowed roots");
            return None;
        }

        tracing::trace!(link = %link.display(), target = %target.display(), "reporting symlink");
        Some(ScanEntry::file(link, 0, true, self.category.clone()))
    }

    /// Drain the walk into a vector.
    pub async fn collect(mut self) -> Vec<ScanEntry> {
        let mut entries = Vec::new();
        while let Some(entry) = self.next_entry().await {
            entries.push(entry);
        }
        entries
    }
}

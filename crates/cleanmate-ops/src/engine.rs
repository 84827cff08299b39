//! Best-effort, deepest-first removal of scanned entries.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use cleanmate_core::{
    DeletionError, DeletionErrorKind, DeletionOutcome, PathValidator, ProgressEvent, ProgressPhase,
    ProgressTracker, ScanEntry, Verdict,
};

use crate::lock::CleanupPermit;

/// Deletes entries under a fixed set of allowed roots.
///
/// The engine holds no state between runs. Exclusivity is enforced by
/// requiring a [`CleanupPermit`] for every run. Validation and removal of
/// each item run on the blocking pool.
#[derive(Debug, Clone)]
pub struct DeletionEngine {
    validator: Arc<PathValidator>,
}

enum Removal {
    Removed,
    Vanished,
    Failed(DeletionError),
}

impl DeletionEngine {
    /// Create an engine that only touches paths the validator allows.
    pub fn new(validator: PathValidator) -> Self {
        Self {
            validator: Arc::new(validator),
        }
    }

    /// Order entries longest path first, ties by path.
    ///
    /// A child path is always longer than its parent, so children come first.
    pub fn plan(mut entries: Vec<ScanEntry>) -> Vec<ScanEntry> {
        entries.sort_by(|a, b| {
            b.path
                .as_os_str()
                .len()
                .cmp(&a.path.as_os_str().len())
                .then_with(|| a.path.cmp(&b.path))
        });
        entries
    }

    /// Delete every entry, continuing past individual failures.
    ///
    /// A progress event is emitted after each processed item; an empty
    /// input emits a single completed event.
    pub async fn delete(
        &self,
        _permit: &CleanupPermit,
        entries: Vec<ScanEntry>,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> DeletionOutcome {
        let entries = Self::plan(entries);
        let mut tracker = ProgressTracker::new(ProgressPhase::Deleting, entries.len() as u64, progress);
        let mut outcome = DeletionOutcome::default();

        tracing::info!(items = entries.len(), "deletion started");

        if entries.is_empty() {
            tracker.report("nothing to delete");
        }

        for entry in &entries {
            let removal = {
                let validator = Arc::clone(&self.validator);
                let item = entry.clone();
                tokio::task::spawn_blocking(move || remove(&validator, &item))
            };
            let removal = removal.await.unwrap_or_else(|err| {
                Removal::Failed(DeletionError::new(
                    &entry.path,
                    DeletionErrorKind::Other,
                    format!("deletion task failed: {err}"),
                ))
            });

            match removal {
                Removal::Removed => {
                    outcome.items_deleted += 1;
                    if entry.is_file() {
                        outcome.freed_bytes += entry.size_bytes;
                    }
                }
                Removal::Vanished => {
                    tracing::trace!(path = %entry.path.display(), "already gone");
                    outcome.items_vanished += 1;
                }
                Removal::Failed(error) => {
                    tracing::debug!(path = %error.path.display(), kind = %error.kind, "deletion failed");
                    outcome.errors.push(error);
                }
            }
            tracker.advance(entry.label());
        }

        tracing::info!(
            deleted = outcome.items_deleted,
            vanished = outcome.items_vanished,
            failed = outcome.errors.len(),
            freed_bytes = outcome.freed_bytes,
            "deletion finished"
        );
        outcome
    }
}

/// Validate and remove one entry. Blocking; runs on the blocking pool.
fn remove(validator: &PathValidator, entry: &ScanEntry) -> Removal {
    let path = match validator.check_entry(&entry.path) {
        Verdict::Allowed(resolved) => resolved,
        Verdict::Denied(reason) => {
            // A parent removed out from under us fails resolution too.
            if entry.path.is_absolute() && is_missing(&entry.path) {
                return Removal::Vanished;
            }
            tracing::warn!(path = %entry.path.display(), %reason, "refusing to delete");
            return Removal::Failed(DeletionError::new(
                &entry.path,
                DeletionErrorKind::Denied,
                reason,
            ));
        }
    };

    if validator.is_root(&path) {
        tracing::warn!(path = %path.display(), "refusing to delete an allowed root");
        return Removal::Failed(DeletionError::new(
            &entry.path,
            DeletionErrorKind::Denied,
            "allowed roots are never deleted",
        ));
    }

    let metadata = match fs::symlink_metadata(&path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Removal::Vanished,
        Err(err) => return Removal::Failed(DeletionError::from_io(&entry.path, &err)),
    };

    let result = if metadata.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };

    match result {
        Ok(()) => Removal::Removed,
        Err(err) if err.kind() == ErrorKind::NotFound => Removal::Vanished,
        Err(err) => Removal::Failed(DeletionError::from_io(&entry.path, &err)),
    }
}

fn is_missing(path: &Path) -> bool {
    matches!(fs::symlink_metadata(path), Err(err) if err.kind() == ErrorKind::NotFound)
}

//! Analysis and cleanup result containers.

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::entry::ScanEntry;
use crate::error::DeletionError;

/// Bytes per megabyte used for reporting.
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Convert bytes to megabytes rounded to two decimal places.
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MB * 100.0).round() / 100.0
}

/// Per-category byte and file totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Total file bytes in this category.
    pub bytes: u64,
    /// Number of files in this category.
    pub count: u64,
}

/// Aggregate snapshot of one scan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Sum of file sizes.
    pub total_recoverable_bytes: u64,
    /// Number of files.
    pub file_count: u64,
    /// Number of directories discovered under the roots.
    pub dir_count: u64,
    /// Largest files, size descending, ties by path.
    pub top_entries: Vec<ScanEntry>,
    /// Files with every write bit cleared.
    pub read_only_entries: Vec<ScanEntry>,
    /// Totals keyed by category, in discovery order.
    pub category_totals: IndexMap<CompactString, CategoryTotal>,
}

impl AnalysisResult {
    /// Recoverable space in megabytes.
    pub fn recoverable_mb(&self) -> f64 {
        bytes_to_mb(self.total_recoverable_bytes)
    }

    /// Check if nothing was found.
    pub fn is_empty(&self) -> bool {
        self.file_count == 0 && self.dir_count == 0
    }
}

/// Result of an analyze call, with caller-facing warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analysis {
    /// The aggregate result.
    pub result: AnalysisResult,
    /// Notes for the user, e.g. roots skipped for lack of privilege.
    pub warnings: Vec<String>,
}

/// Result of one cleanup pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionOutcome {
    /// Bytes freed by successful file deletions.
    pub freed_bytes: u64,
    /// Files and directories removed.
    pub items_deleted: u64,
    /// Items that vanished before they could be removed.
    pub items_vanished: u64,
    /// Failures, in processing order.
    pub errors: Vec<DeletionError>,
}

impl DeletionOutcome {
    /// Freed space in megabytes.
    pub fn freed_mb(&self) -> f64 {
        bytes_to_mb(self.freed_bytes)
    }

    /// Check if every item was handled without failure.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get a human-readable summary of the pass.
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            format!("Deleted {} items, freed {} MB", self.items_deleted, self.freed_mb())
        } else {
            format!(
                "Deleted {} items, {} failed (freed {} MB)",
                self.items_deleted,
                self.errors.len(),
                self.freed_mb()
            )
        }
    }
}

/// Result of a clean call, with caller-facing warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cleanup {
    /// The deletion outcome.
    pub outcome: DeletionOutcome,
    /// Recoverable bytes of the scan the deletion was derived from.
    pub scanned_bytes: u64,
    /// Notes for the user.
    pub warnings: Vec<String>,
}

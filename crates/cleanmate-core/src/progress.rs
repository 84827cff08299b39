//! Progress reporting shared by scanning and deletion.

use serde::{Deserialize, Serialize};

/// Which part of an operation is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    Scanning,
    Deleting,
}

impl std::fmt::Display for ProgressPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scanning => write!(f, "Scanning"),
            Self::Deleting => write!(f, "Deleting"),
        }
    }
}

/// A progress update emitted during an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Phase that produced this event.
    pub phase: ProgressPhase,
    /// 0 to 100, never decreasing within one operation.
    pub percent_complete: u8,
    /// Human-readable path fragment.
    pub current_item_label: String,
    /// Items processed so far.
    pub processed_count: u64,
    /// Items expected in total (0 if unknown).
    pub total_count: u64,
}

/// Compute `round(processed / total * 100)`, clamped to 100.
pub fn percent(processed: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Builds a strictly ordered, monotonic stream of [`ProgressEvent`]s and
/// forwards each one to a caller-supplied sink.
pub struct ProgressTracker<'a> {
    phase: ProgressPhase,
    total: u64,
    processed: u64,
    last_percent: u8,
    sink: &'a mut (dyn FnMut(ProgressEvent) + Send),
}

impl<'a> ProgressTracker<'a> {
    /// Create a tracker for `total` items.
    pub fn new(
        phase: ProgressPhase,
        total: u64,
        sink: &'a mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Self {
        Self {
            phase,
            total,
            processed: 0,
            last_percent: 0,
            sink,
        }
    }

    /// Items processed so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Mark one item as processed and emit an event.
    pub fn advance(&mut self, label: impl Into<String>) {
        self.processed += 1;
        self.emit(label.into());
    }

    /// Emit an event for the current position without advancing.
    pub fn report(&mut self, label: impl Into<String>) {
        self.emit(label.into());
    }

    fn emit(&mut self, label: String) {
        let pct = percent(self.processed, self.total).max(self.last_percent);
        self.last_percent = pct;
        (self.sink)(ProgressEvent {
            phase: self.phase,
            percent_complete: pct,
            current_item_label: label,
            processed_count: self.processed,
            total_count: self.total,
        });
    }
}

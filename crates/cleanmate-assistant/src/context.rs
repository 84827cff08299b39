//! Snapshot of everything an advisor may look at.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use cleanmate_core::{Analysis, Cleanup};

use crate::monitor::SystemMetrics;
use crate::store::{Report, ReportKind};

/// Conversation focus chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Find recoverable space.
    #[default]
    Analysis,
    /// Tune performance.
    Optimization,
    /// Inspect hardware load.
    Hardware,
}

impl ChatMode {
    /// Display name.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Analysis => "Analysis",
            Self::Optimization => "Optimization",
            Self::Hardware => "Hardware",
        }
    }
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::Optimization => write!(f, "optimization"),
            Self::Hardware => write!(f, "hardware"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analysis" => Ok(Self::Analysis),
            "optimization" => Ok(Self::Optimization),
            "hardware" => Ok(Self::Hardware),
            other => Err(format!(
                "unknown mode '{other}' (expected analysis, optimization or hardware)"
            )),
        }
    }
}

/// Figures kept from the most recent analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    /// Recoverable size in MB.
    pub recoverable_mb: f64,
    /// Files found.
    pub file_count: u64,
    /// Files without write permission.
    pub read_only_count: u64,
}

/// Figures kept from the most recent cleanup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupSnapshot {
    /// Freed size in MB.
    pub freed_mb: f64,
    /// Items removed.
    pub items_deleted: u64,
    /// Withheld targets and per-item failures.
    pub warnings: Vec<String>,
}

/// Explicit state handed to an advisor. Built by the shell, never read by
/// the scanner or deletion engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantContext {
    /// Conversation focus.
    pub mode: ChatMode,
    /// Latest load sample.
    pub metrics: SystemMetrics,
    /// Whether the process runs elevated.
    pub admin: bool,
    /// Most recent analysis, if any.
    pub last_analysis: Option<AnalysisSnapshot>,
    /// Most recent cleanup, if any.
    pub last_cleanup: Option<CleanupSnapshot>,
    /// Stored reports, newest first.
    pub reports: Vec<Report>,
}

impl AssistantContext {
    /// Create a context with no analysis or cleanup recorded.
    pub fn new(mode: ChatMode, metrics: SystemMetrics, admin: bool) -> Self {
        Self {
            mode,
            metrics,
            admin,
            ..Default::default()
        }
    }

    /// Attach stored reports and seed the last snapshots from the newest
    /// report of each kind.
    pub fn with_reports(mut self, reports: Vec<Report>) -> Self {
        if self.last_analysis.is_none() {
            self.last_analysis = reports
                .iter()
                .find(|r| r.kind == ReportKind::Analysis)
                .map(|r| AnalysisSnapshot {
                    recoverable_mb: r.stats.recoverable_mb,
                    file_count: r.stats.file_count,
                    read_only_count: r.stats.read_only_count,
                });
        }
        if self.last_cleanup.is_none() {
            self.last_cleanup = reports
                .iter()
                .find(|r| r.kind == ReportKind::Cleanup)
                .map(|r| CleanupSnapshot {
                    freed_mb: r.stats.freed_mb,
                    items_deleted: r.stats.files_deleted,
                    warnings: r.warnings.clone(),
                });
        }
        self.reports = reports;
        self
    }

    /// Remember an analysis.
    pub fn record_analysis(&mut self, analysis: &Analysis) {
        let result = &analysis.result;
        self.last_analysis = Some(AnalysisSnapshot {
            recoverable_mb: result.recoverable_mb(),
            file_count: result.file_count,
            read_only_count: result.read_only_entries.len() as u64,
        });
    }

    /// Remember a cleanup.
    pub fn record_cleanup(&mut self, cleanup: &Cleanup) {
        let outcome = &cleanup.outcome;
        let mut warnings = cleanup.warnings.clone();
        warnings.extend(outcome.errors.iter().map(ToString::to_string));
        self.last_cleanup = Some(CleanupSnapshot {
            freed_mb: outcome.freed_mb(),
            items_deleted: outcome.items_deleted,
            warnings,
        });
    }

    /// Recoverable megabytes from the last analysis, or zero.
    pub fn recoverable_mb(&self) -> f64 {
        self.last_analysis.map_or(0.0, |a| a.recoverable_mb)
    }
}

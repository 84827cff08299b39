//! JSON persistence for chat history and cleanup reports.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;

use cleanmate_core::{Analysis, Cleanup};

use crate::action::ActionSuggestion;

/// File holding chat history inside the data dir.
pub const HISTORY_FILE: &str = "chat-history.json";

/// File holding reports inside the data dir.
pub const REPORTS_FILE: &str = "reports.json";

/// Errors writing a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the user.
    User,
    /// Produced by the advisor.
    Assistant,
}

/// Load figures captured alongside a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSnapshot {
    /// CPU usage in percent.
    pub cpu: u8,
    /// RAM usage in percent.
    pub ram: u8,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// When the message was stored.
    pub timestamp: DateTime<Utc>,
    /// Author.
    pub role: Role,
    /// Message text.
    pub message: String,
    /// Action the assistant proposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionSuggestion>,
    /// Load at the time a user message was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load: Option<LoadSnapshot>,
}

impl ChatEntry {
    /// A user message with the current load.
    pub fn user(message: impl Into<String>, load: LoadSnapshot) -> Self {
        Self {
            timestamp: Utc::now(),
            role: Role::User,
            message: message.into(),
            action: None,
            load: Some(load),
        }
    }

    /// An assistant reply.
    pub fn assistant(message: impl Into<String>, action: Option<ActionSuggestion>) -> Self {
        Self {
            timestamp: Utc::now(),
            role: Role::Assistant,
            message: message.into(),
            action,
            load: None,
        }
    }
}

/// What produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Produced by an analyze call.
    Analysis,
    /// Produced by a clean call.
    Cleanup,
}

/// Figures recorded in a report. Fields not relevant to the kind stay zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    /// Recoverable size in MB.
    pub recoverable_mb: f64,
    /// Files found by an analysis.
    pub file_count: u64,
    /// Read-only files found by an analysis.
    pub read_only_count: u64,
    /// Freed size in MB.
    pub freed_mb: f64,
    /// Items removed by a cleanup.
    pub files_deleted: u64,
    /// Items a cleanup could not remove.
    pub failed: u64,
}

/// A persisted summary of one analyze or clean call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Creation time in milliseconds since the epoch.
    pub id: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Which call produced the report.
    pub kind: ReportKind,
    /// Recorded figures.
    pub stats: ReportStats,
    /// Warnings raised during the call.
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl Report {
    fn stamped(kind: ReportKind, stats: ReportStats, warnings: Vec<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            id: timestamp.timestamp_millis().to_string(),
            timestamp,
            kind,
            stats,
            warnings,
        }
    }

    /// Summarize an analysis.
    pub fn from_analysis(analysis: &Analysis) -> Self {
        let result = &analysis.result;
        let stats = ReportStats {
            recoverable_mb: result.recoverable_mb(),
            file_count: result.file_count,
            read_only_count: result.read_only_entries.len() as u64,
            ..Default::default()
        };
        Self::stamped(ReportKind::Analysis, stats, analysis.warnings.clone())
    }

    /// Summarize a cleanup. Per-item failures become warnings.
    pub fn from_cleanup(cleanup: &Cleanup) -> Self {
        let outcome = &cleanup.outcome;
        let stats = ReportStats {
            recoverable_mb: cleanmate_core::bytes_to_mb(cleanup.scanned_bytes),
            freed_mb: outcome.freed_mb(),
            files_deleted: outcome.items_deleted,
            failed: outcome.errors.len() as u64,
            ..Default::default()
        };
        let mut warnings = cleanup.warnings.clone();
        warnings.extend(outcome.errors.iter().map(ToString::to_string));
        Self::stamped(ReportKind::Cleanup, stats, warnings)
    }
}

/// Chat history, oldest first, capped at a fixed length.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
}

impl HistoryStore {
    /// Open the history file inside `dir`.
    pub fn new(dir: impl AsRef<Path>, limit: usize) -> Self {
        Self {
            path: dir.as_ref().join(HISTORY_FILE),
            limit,
        }
    }

    /// Location of the history file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored entries. A missing or corrupt file reads as empty.
    pub async fn load(&self) -> Vec<ChatEntry> {
        read_list(&self.path).await
    }

    /// Append an entry, dropping the oldest beyond the limit.
    pub async fn append(&self, entry: ChatEntry) -> Result<(), StoreError> {
        let mut entries = self.load().await;
        entries.push(entry);
        if entries.len() > self.limit {
            let excess = entries.len() - self.limit;
            entries.drain(..excess);
        }
        write_list(&self.path, &entries).await
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<(), StoreError> {
        write_list::<ChatEntry>(&self.path, &[]).await
    }
}

/// Reports, newest first, capped at a fixed length.
#[derive(Debug, Clone)]
pub struct ReportStore {
    path: PathBuf,
    limit: usize,
}

impl ReportStore {
    /// Open the report file inside `dir`.
    pub fn new(dir: impl AsRef<Path>, limit: usize) -> Self {
        Self {
            path: dir.as_ref().join(REPORTS_FILE),
            limit,
        }
    }

    /// Location of the report file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored reports, newest first.
    pub async fn load(&self) -> Vec<Report> {
        read_list(&self.path).await
    }

    /// Store a report at the front.
    pub async fn save(&self, report: Report) -> Result<Report, StoreError> {
        let mut reports = self.load().await;
        reports.insert(0, report.clone());
        reports.truncate(self.limit);
        write_list(&self.path, &reports).await?;
        tracing::info!(total = reports.len(), kind = ?report.kind, "report saved");
        Ok(report)
    }
}

async fn read_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "cannot read store");
            return Vec::new();
        }
    };
    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        tracing::error!(path = %path.display(), error = %err, "corrupt store, starting empty");
        Vec::new()
    })
}

async fn write_list<T: Serialize>(path: &Path, items: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_vec_pretty(items)?;

    // Write a sibling first so an interrupted write never clobbers the store.
    let staging = staging_path(path);
    fs::write(&staging, json).await.map_err(|source| StoreError::Io {
        path: staging.clone(),
        source,
    })?;
    fs::rename(&staging, path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_history_keeps_newest_entries() {
        let temp = TempDir::new().unwrap();
        let store = HistoryStore::new(temp.path(), 3);

        for i in 0..5 {
            store
                .append(ChatEntry::assistant(format!("message {i}"), None))
                .await
                .unwrap();
        }

        let entries = store.load().await;
        let messages: Vec<&str> = entries.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["message 2", "message 3", "message 4"]);
    }

    #[tokio::test]
    async fn test_interrupted_write_keeps_previous_contents() {
        let temp = TempDir::new().unwrap();
        let store = HistoryStore::new(temp.path(), 10);
        store
            .append(ChatEntry::assistant("kept", None))
            .await
            .unwrap();

        // A half-written staging file left behind by a crash.
        let staging = staging_path(store.path());
        std::fs::write(&staging, "[{\"timestamp\": ").unwrap();

        let entries = store.load().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");

        store
            .append(ChatEntry::assistant("next", None))
            .await
            .unwrap();
        assert_eq!(store.load().await.len(), 2);
        assert!(!staging.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = ReportStore::new(temp.path(), 10);
        std::fs::write(store.path(), "{not json").unwrap();
        assert!(store.load().await.is_empty());
    }
}

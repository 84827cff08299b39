//! Error types for analyze and clean operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort an analyze or clean call.
///
/// Per-entry problems never surface here; they are swallowed during a scan
/// or recorded as [`DeletionError`] values during a clean.
#[derive(Debug, Error)]
pub enum CleanError {
    /// Caller referenced a whitelist key that is not registered.
    #[error("Unknown cleanup target: {name}")]
    UnknownTarget { name: String },

    /// Path resolved outside every allowed root, or could not be resolved.
    #[error("Path denied: {path} ({reason})")]
    PathDenied { path: PathBuf, reason: String },

    /// Another destructive pass is already running in this process.
    #[error("A cleanup is already running")]
    AlreadyRunning,

    /// A whitelisted root exists but could not be listed.
    #[error("Cannot access root {path}: {source}")]
    RootInaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CleanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a path denial.
    pub fn denied(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::PathDenied {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller should simply retry later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::AlreadyRunning)
    }
}

/// Classification of a single failed deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionErrorKind {
    /// The OS refused access.
    PermissionDenied,
    /// The item is held open by another process.
    Locked,
    /// The item did not pass path validation and was skipped.
    Denied,
    /// Any other I/O failure.
    Other,
}

impl DeletionErrorKind {
    /// Classify an I/O error.
    pub fn from_io(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::ResourceBusy | std::io::ErrorKind::WouldBlock => Self::Locked,
            _ => match error.raw_os_error() {
                // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
                Some(32) | Some(33) if cfg!(windows) => Self::Locked,
                _ => Self::Other,
            },
        }
    }
}

impl std::fmt::Display for DeletionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Locked => write!(f, "in use"),
            Self::Denied => write!(f, "outside allowed roots"),
            Self::Other => write!(f, "I/O error"),
        }
    }
}

/// A deletion that failed; the pass continued past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletionError {
    /// The path that could not be removed.
    pub path: PathBuf,
    /// Failure classification.
    pub kind: DeletionErrorKind,
    /// Human-readable reason.
    pub message: String,
}

impl DeletionError {
    /// Create a new deletion error.
    pub fn new(path: impl Into<PathBuf>, kind: DeletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }

    /// Build a deletion error from an I/O failure.
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        Self::new(path, DeletionErrorKind::from_io(error), error.to_string())
    }
}

impl std::fmt::Display for DeletionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path.display(), self.message, self.kind)
    }
}

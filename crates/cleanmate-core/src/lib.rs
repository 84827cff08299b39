//! Core types for cleanmate.
//!
//! This crate provides the data model shared by the scanner, the
//! aggregator and the deletion engine, together with the two safety
//! components every filesystem operation goes through: the
//! [`PathWhitelist`] of deletable roots and the [`PathValidator`].

mod config;
mod entry;
mod error;
mod outcome;
mod privilege;
mod progress;
mod validator;
mod whitelist;

pub use config::{APP_DIR, CONFIG_FILE, CleanConfig, CleanConfigBuilder};
pub use entry::{EntryKind, ScanEntry, is_writable, label_for};
pub use error::{CleanError, DeletionError, DeletionErrorKind};
pub use outcome::{
    Analysis, AnalysisResult, BYTES_PER_MB, CategoryTotal, Cleanup, DeletionOutcome, bytes_to_mb,
};
pub use privilege::{FixedProbe, PrivilegeProbe, SystemProbe};
pub use progress::{ProgressEvent, ProgressPhase, ProgressTracker, percent};
pub use validator::{PathValidator, Verdict};
pub use whitelist::{PathWhitelist, Privilege, ResolvedTarget, WhitelistTarget};

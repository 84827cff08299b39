//! Filesystem scanning engine for cleanmate.
//!
//! `cleanmate-scan` walks whitelisted roots and reports every file and
//! directory beneath them. Key properties:
//!
//! - **Async, lazy traversal** via `tokio::fs`; each walk is a fresh pass
//! - **Post-order**: a directory is yielded after all of its descendants
//! - **Best effort**: unreadable entries are skipped, never fatal
//! - **Contained**: symlinks are not followed out of the allowed roots
//!
//! # Example
//!
//! ```rust,no_run
//! use cleanmate_scan::{PathValidator, RecursiveScanner};
//!
//! # async fn run() -> Result<(), cleanmate_scan::CleanError> {
//! let root = std::env::temp_dir();
//! let validator = PathValidator::new([&root]);
//! let mut walk = RecursiveScanner::new().walk(&root, "temp", &validator).await?;
//!
//! while let Some(entry) = walk.next_entry().await {
//!     println!("{} ({} bytes)", entry.path.display(), entry.size_bytes);
//! }
//! # Ok(())
//! # }
//! ```

mod scanner;

pub use scanner::{RecursiveScanner, Walk};

// Re-export core types for convenience
pub use cleanmate_core::{CleanError, EntryKind, PathValidator, ScanEntry};

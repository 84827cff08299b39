//! Analysis of scan output for cleanmate.
//!
//! The [`Aggregator`] is a pure reduction over entries that were already
//! collected into memory:
//!
//! - **Recoverable bytes** - exact integer sum of file sizes
//! - **Category breakdown** - bytes and file count per whitelist target
//! - **Top entries** - the N largest files, size descending
//! - **Read-only files** - files with every write bit cleared
//!
//! ```rust
//! use cleanmate_analyze::Aggregator;
//! use cleanmate_core::ScanEntry;
//!
//! let entries = vec![
//!     ScanEntry::file("/tmp/a.tmp", 2048, true, "temp"),
//!     ScanEntry::directory("/tmp/sub", "temp"),
//! ];
//! let result = Aggregator::new().aggregate(&entries);
//!
//! assert_eq!(result.file_count, 1);
//! assert_eq!(result.total_recoverable_bytes, 2048);
//! ```

mod aggregate;

pub use aggregate::{AggregateConfig, AggregateConfigBuilder, Aggregator};

// Re-export core types
pub use cleanmate_core::{AnalysisResult, CategoryTotal, ScanEntry};

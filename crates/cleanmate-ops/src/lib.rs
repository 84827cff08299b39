//! Destructive operations for cleanmate.
//!
//! [`CleanService`] is the facade the application shell talks to. It
//! exposes a read-only `analyze` and a mutually exclusive `clean`:
//!
//! - **analyze** - resolve targets, walk their roots, aggregate the result
//! - **clean** - take the [`CleanupLock`], re-scan, then delete deepest-first
//!
//! Per-item failures during a clean never abort the pass; they are
//! collected into the returned outcome.

mod engine;
mod lock;
mod progress;
mod service;

pub use engine::DeletionEngine;
pub use lock::{CleanupLock, CleanupPermit};
pub use progress::{CleanUpdate, start_clean};
pub use service::CleanService;

/// Default channel buffer size for cleanup progress updates.
pub const OPERATION_CHANNEL_SIZE: usize = 100;

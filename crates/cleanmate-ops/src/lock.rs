//! Process-wide guard that admits one destructive pass at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use cleanmate_core::CleanError;

static GLOBAL: LazyLock<Arc<CleanupLock>> = LazyLock::new(|| Arc::new(CleanupLock::new()));

/// A non-queuing mutex. A second caller is rejected instead of waiting.
#[derive(Debug, Default)]
pub struct CleanupLock {
    running: AtomicBool,
}

impl CleanupLock {
    /// Create an independent lock.
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// The lock shared by every service in this process.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Take the lock, failing with [`CleanError::AlreadyRunning`] if it is held.
    pub fn try_acquire(self: &Arc<Self>) -> Result<CleanupPermit, CleanError> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CleanError::AlreadyRunning)?;
        Ok(CleanupPermit {
            lock: Arc::clone(self),
        })
    }

    /// Whether a pass currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of exclusive access. Released on drop, including on early return.
#[derive(Debug)]
pub struct CleanupPermit {
    lock: Arc<CleanupLock>,
}

impl Drop for CleanupPermit {
    fn drop(&mut self) {
        self.lock.running.store(false, Ordering::Release);
    }
}

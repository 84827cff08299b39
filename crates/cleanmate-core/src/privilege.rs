//! Elevated-privilege detection.

use std::process::{Command, Stdio};

/// Answers whether the current process holds elevated rights.
///
/// Probing spawns a process, so callers query once per analyze or clean
/// invocation and reuse the answer.
pub trait PrivilegeProbe: Send + Sync {
    /// Returns `true` when the process runs with administrative rights.
    /// Probe failures count as "not elevated".
    fn is_elevated(&self) -> bool;
}

/// Probes the operating system by running a privileged-only no-op command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl PrivilegeProbe for SystemProbe {
    fn is_elevated(&self) -> bool {
        let elevated = probe_elevation();
        tracing::debug!(elevated, "privilege probe finished");
        elevated
    }
}

/// `net session` only succeeds for members of the Administrators group.
#[cfg(windows)]
fn probe_elevation() -> bool {
    Command::new("net")
        .arg("session")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn probe_elevation() -> bool {
    Command::new("id")
        .arg("-u")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim() == "0")
        .unwrap_or(false)
}

/// A probe with a predetermined answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedProbe(pub bool);

impl PrivilegeProbe for FixedProbe {
    fn is_elevated(&self) -> bool {
        self.0
    }
}

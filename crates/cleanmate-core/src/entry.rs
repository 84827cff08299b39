//! Scan entry types.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Kind of filesystem object discovered during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// One filesystem object discovered during a scan pass.
///
/// Entries live for one analyze or clean operation and are never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEntry {
    /// Absolute, OS-native path.
    pub path: PathBuf,

    /// Byte length; always 0 for directories.
    pub size_bytes: u64,

    /// File or directory.
    pub kind: EntryKind,

    /// Derived from permission bits. Directories are not evaluated and
    /// always report `true`.
    pub writable: bool,

    /// Whitelist target name this entry was discovered under.
    pub category: CompactString,
}

impl ScanEntry {
    /// Create a file entry.
    pub fn file(
        path: impl Into<PathBuf>,
        size_bytes: u64,
        writable: bool,
        category: impl Into<CompactString>,
    ) -> Self {
        Self {
            path: path.into(),
            size_bytes,
            kind: EntryKind::File,
            writable,
            category: category.into(),
        }
    }

    /// Create a directory entry.
    pub fn directory(path: impl Into<PathBuf>, category: impl Into<CompactString>) -> Self {
        Self {
            path: path.into(),
            size_bytes: 0,
            kind: EntryKind::Directory,
            writable: true,
            category: category.into(),
        }
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// A file whose owner/group/other write bits are all cleared.
    pub fn is_read_only(&self) -> bool {
        self.is_file() && !self.writable
    }

    /// Short label for progress display: the final path component.
    pub fn label(&self) -> String {
        label_for(&self.path)
    }
}

/// Human-readable fragment of a path, used as a progress label.
pub fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Whether permission bits mark a file as writable.
#[cfg(unix)]
pub fn is_writable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o222 != 0
}

#[cfg(not(unix))]
pub fn is_writable(metadata: &std::fs::Metadata) -> bool {
    !metadata.permissions().readonly()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_entry_has_no_size() {
        let entry = ScanEntry::directory("/tmp/cache/dir", "temp");
        assert_eq!(entry.size_bytes, 0);
        assert!(entry.is_dir());
        assert!(!entry.is_read_only());
    }

    #[test]
    fn test_read_only_only_applies_to_files() {
        let file = ScanEntry::file("/tmp/a.tmp", 10, false, "temp");
        assert!(file.is_read_only());
        assert_eq!(file.label(), "a.tmp");
    }
}

//! Guards filesystem operations against traversal and out-of-whitelist paths.

use std::path::{Component, Path, PathBuf};

use crate::error::CleanError;
use crate::whitelist::PathWhitelist;

/// Outcome of validating a candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The path resolves under an allowed root; carries the resolved path.
    Allowed(PathBuf),
    /// The path must not be touched.
    Denied(String),
}

impl Verdict {
    /// Check if the path was allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed(_))
    }
}

#[derive(Debug, Clone)]
struct AllowedRoot {
    resolved: PathBuf,
    key: PathBuf,
}

/// Validates paths against a fixed set of allowed roots.
///
/// Roots are resolved (symlinks included) once at construction; roots that
/// do not exist are dropped, since nothing beneath them can be touched.
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    roots: Vec<AllowedRoot>,
}

impl PathValidator {
    /// Create a validator for the given roots.
    pub fn new<P: AsRef<Path>>(roots: impl IntoIterator<Item = P>) -> Self {
        let mut allowed: Vec<AllowedRoot> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            match dunce::canonicalize(root) {
                Ok(resolved) => {
                    let key = fold_case(&resolved);
                    if !allowed.iter().any(|r| r.key == key) {
                        allowed.push(AllowedRoot { resolved, key });
                    }
                }
                Err(err) => {
                    tracing::debug!(root = %root.display(), error = %err, "allowed root does not resolve");
                }
            }
        }
        Self { roots: allowed }
    }

    /// Create a validator covering every root in the whitelist.
    pub fn from_whitelist(whitelist: &PathWhitelist) -> Self {
        Self::new(whitelist.all_roots())
    }

    /// Resolved allowed roots.
    pub fn roots(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|r| r.resolved.as_path())
    }

    /// Validate a path, resolving every component including the last.
    ///
    /// Use this for roots before a walk begins.
    pub fn check(&self, candidate: &Path) -> Verdict {
        if let Some(reason) = lexical_problem(candidate) {
            return Verdict::Denied(reason);
        }
        match dunce::canonicalize(candidate) {
            Ok(resolved) => self.contain(resolved),
            Err(err) => Verdict::Denied(format!("cannot resolve: {err}")),
        }
    }

    /// Validate a path that is about to be removed.
    ///
    /// The parent is fully resolved but the final component is kept as is,
    /// so a symlink is judged by where it lives rather than where it points.
    pub fn check_entry(&self, candidate: &Path) -> Verdict {
        if let Some(reason) = lexical_problem(candidate) {
            return Verdict::Denied(reason);
        }
        let (Some(parent), Some(name)) = (candidate.parent(), candidate.file_name()) else {
            return Verdict::Denied("path has no parent".to_string());
        };
        match dunce::canonicalize(parent) {
            Ok(resolved_parent) => self.contain(resolved_parent.join(name)),
            Err(err) => Verdict::Denied(format!("cannot resolve parent: {err}")),
        }
    }

    /// Like [`check`](Self::check), but as a `Result`.
    pub fn validate(&self, candidate: &Path) -> Result<PathBuf, CleanError> {
        match self.check(candidate) {
            Verdict::Allowed(resolved) => Ok(resolved),
            Verdict::Denied(reason) => Err(CleanError::denied(candidate, reason)),
        }
    }

    /// Check if a path is allowed.
    pub fn is_allowed(&self, candidate: &Path) -> bool {
        self.check(candidate).is_allowed()
    }

    /// Whether an already resolved path lies under an allowed root.
    pub fn allows_resolved(&self, resolved: &Path) -> bool {
        self.contain(resolved.to_path_buf()).is_allowed()
    }

    /// Whether an already resolved path is one of the allowed roots itself.
    pub fn is_root(&self, resolved: &Path) -> bool {
        let key = fold_case(resolved);
        self.roots.iter().any(|r| r.key == key)
    }

    fn contain(&self, resolved: PathBuf) -> Verdict {
        if resolved.components().any(|c| matches!(c, Component::ParentDir)) {
            return Verdict::Denied("traversal segment after resolution".to_string());
        }
        let key = fold_case(&resolved);
        if self.roots.iter().any(|r| key.starts_with(&r.key)) {
            Verdict::Allowed(resolved)
        } else {
            Verdict::Denied("outside allowed roots".to_string())
        }
    }
}

fn lexical_problem(candidate: &Path) -> Option<String> {
    if candidate.as_os_str().is_empty() {
        return Some("empty path".to_string());
    }
    if !candidate.is_absolute() {
        return Some("path is not absolute".to_string());
    }
    if candidate.components().any(|c| matches!(c, Component::ParentDir)) {
        return Some("path contains a parent-directory segment".to_string());
    }
    None
}

/// Lower-case paths on case-insensitive filesystems.
fn fold_case(path: &Path) -> PathBuf {
    if cfg!(any(windows, target_os = "macos")) {
        PathBuf::from(path.to_string_lossy().to_lowercase())
    } else {
        path.to_path_buf()
    }
}

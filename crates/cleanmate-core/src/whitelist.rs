//! Registry of deletable roots.

use std::path::PathBuf;

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CleanError;

/// Privilege needed before a target's roots are handed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Privilege {
    /// Available to any user.
    #[default]
    User,
    /// Only included when the process is elevated.
    Elevated,
}

/// A named group of whitelisted roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhitelistTarget {
    /// Symbolic name, e.g. `temp`.
    pub name: CompactString,
    /// Absolute root directories.
    pub roots: Vec<PathBuf>,
    /// Required privilege.
    pub privilege: Privilege,
}

/// Roots handed out for one target under one privilege state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// Target name.
    pub name: CompactString,
    /// Roots the caller may scan. Empty when privilege was insufficient.
    pub roots: Vec<PathBuf>,
    /// Whether roots were withheld because the process is not elevated.
    pub withheld: bool,
}

/// Static registry mapping target names to absolute roots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathWhitelist {
    targets: IndexMap<CompactString, WhitelistTarget>,
}

impl PathWhitelist {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a target. A later registration under the same name replaces it.
    pub fn register<P: Into<PathBuf>>(
        mut self,
        name: impl Into<CompactString>,
        roots: impl IntoIterator<Item = P>,
        privilege: Privilege,
    ) -> Self {
        let name = name.into();
        let mut unique: Vec<PathBuf> = Vec::new();
        for root in roots.into_iter().map(Into::into) {
            if !root.as_os_str().is_empty() && !unique.contains(&root) {
                unique.push(root);
            }
        }
        self.targets.insert(
            name.clone(),
            WhitelistTarget {
                name,
                roots: unique,
                privilege,
            },
        );
        self
    }

    /// Build the registry of temp, browser cache and system log locations
    /// for the current platform.
    pub fn system_default() -> Self {
        let mut temp = vec![std::env::temp_dir()];
        if cfg!(windows) {
            temp.extend(dirs::data_local_dir().map(|d| d.join("Temp")));
        }

        Self::new()
            .register("temp", temp, Privilege::User)
            .register("browser-cache-chrome", browser_cache("chrome"), Privilege::User)
            .register("browser-cache-edge", browser_cache("edge"), Privilege::User)
            .register("browser-cache-brave", browser_cache("brave"), Privilege::User)
            .register("browser-cache-firefox", browser_cache("firefox"), Privilege::User)
            .register("system-logs", system_log_roots(), Privilege::Elevated)
    }

    /// Check if a target name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    /// Registered target names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(|k| k.as_str())
    }

    /// All registered targets.
    pub fn targets(&self) -> impl Iterator<Item = &WhitelistTarget> {
        self.targets.values()
    }

    /// Look up a target definition.
    pub fn target(&self, name: &str) -> Option<&WhitelistTarget> {
        self.targets.get(name)
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Every root of every target, regardless of privilege.
    pub fn all_roots(&self) -> Vec<PathBuf> {
        self.targets
            .values()
            .flat_map(|t| t.roots.iter().cloned())
            .collect()
    }

    /// Resolve a target name to the roots the caller may use.
    ///
    /// Elevated-only roots are silently withheld for non-elevated callers;
    /// `ResolvedTarget::withheld` lets a higher layer surface a warning.
    pub fn resolve(&self, name: &str, elevated: bool) -> Result<ResolvedTarget, CleanError> {
        let target = self.targets.get(name).ok_or_else(|| CleanError::UnknownTarget {
            name: name.to_string(),
        })?;

        if target.privilege == Privilege::Elevated && !elevated {
            return Ok(ResolvedTarget {
                name: target.name.clone(),
                roots: Vec::new(),
                withheld: !target.roots.is_empty(),
            });
        }

        Ok(ResolvedTarget {
            name: target.name.clone(),
            roots: target.roots.clone(),
            withheld: false,
        })
    }
}

fn browser_cache(browser: &str) -> Vec<PathBuf> {
    browser_cache_root(browser).into_iter().collect()
}

#[cfg(windows)]
fn browser_cache_root(browser: &str) -> Option<PathBuf> {
    let local = dirs::data_local_dir()?;
    let path = match browser {
        "chrome" => local.join(r"Google\Chrome\User Data\Default\Cache"),
        "edge" => local.join(r"Microsoft\Edge\User Data\Default\Cache"),
        "brave" => local.join(r"BraveSoftware\Brave-Browser\User Data\Default\Cache"),
        "firefox" => local.join(r"Mozilla\Firefox\Profiles"),
        _ => return None,
    };
    Some(path)
}

#[cfg(target_os = "macos")]
fn browser_cache_root(browser: &str) -> Option<PathBuf> {
    let cache = dirs::cache_dir()?;
    let path = match browser {
        "chrome" => cache.join("Google/Chrome/Default/Cache"),
        "edge" => cache.join("Microsoft Edge/Default/Cache"),
        "brave" => cache.join("BraveSoftware/Brave-Browser/Default/Cache"),
        "firefox" => cache.join("Firefox/Profiles"),
        _ => return None,
    };
    Some(path)
}

#[cfg(not(any(windows, target_os = "macos")))]
fn browser_cache_root(browser: &str) -> Option<PathBuf> {
    let cache = dirs::cache_dir()?;
    let path = match browser {
        "chrome" => cache.join("google-chrome/Default/Cache"),
        "edge" => cache.join("microsoft-edge/Default/Cache"),
        "brave" => cache.join("BraveSoftware/Brave-Browser/Default/Cache"),
        "firefox" => cache.join("mozilla/firefox"),
        _ => return None,
    };
    Some(path)
}

#[cfg(windows)]
fn system_log_roots() -> Vec<PathBuf> {
    let system_root = std::env::var_os("SystemRoot")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    vec![system_root.join("Logs")]
}

#[cfg(not(windows))]
fn system_log_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/var/log")]
}

//! The `analyze` / `clean` facade over scanner, aggregator and engine.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use compact_str::CompactString;

use cleanmate_analyze::{AggregateConfig, Aggregator};
use cleanmate_core::{
    Analysis, CleanConfig, CleanError, Cleanup, PathValidator, PathWhitelist, PrivilegeProbe,
    ProgressEvent, ProgressPhase, ProgressTracker, ScanEntry, SystemProbe, label_for,
};
use cleanmate_scan::RecursiveScanner;

use crate::engine::DeletionEngine;
use crate::lock::CleanupLock;

/// Entries gathered for a set of targets.
struct Collected {
    entries: Vec<ScanEntry>,
    validator: PathValidator,
    warnings: Vec<String>,
}

/// Roots handed out for one call, after privilege filtering.
struct Plan {
    roots: Vec<(PathBuf, CompactString)>,
    warnings: Vec<String>,
}

/// Entry point used by the application shell.
///
/// The service keeps no results between calls; callers that need the last
/// analysis keep it themselves.
pub struct CleanService {
    whitelist: PathWhitelist,
    config: CleanConfig,
    probe: Arc<dyn PrivilegeProbe>,
    lock: Arc<CleanupLock>,
    scanner: RecursiveScanner,
}

impl CleanService {
    /// Create a service using the OS privilege probe and the process-wide lock.
    pub fn new(whitelist: PathWhitelist, config: CleanConfig) -> Self {
        let scanner = RecursiveScanner::with_config(&config);
        Self {
            whitelist,
            config,
            probe: Arc::new(SystemProbe),
            lock: CleanupLock::global(),
            scanner,
        }
    }

    /// Replace the privilege probe.
    pub fn with_probe(mut self, probe: impl PrivilegeProbe + 'static) -> Self {
        self.probe = Arc::new(probe);
        self
    }

    /// Replace the cleanup lock.
    pub fn with_lock(mut self, lock: Arc<CleanupLock>) -> Self {
        self.lock = lock;
        self
    }

    /// The registry this service works on.
    pub fn whitelist(&self) -> &PathWhitelist {
        &self.whitelist
    }

    /// The active configuration.
    pub fn config(&self) -> &CleanConfig {
        &self.config
    }

    /// The lock guarding destructive passes.
    pub fn lock(&self) -> &Arc<CleanupLock> {
        &self.lock
    }

    /// Targets named in the config, or every registered target.
    pub fn default_targets(&self) -> Vec<String> {
        if self.config.targets.is_empty() {
            self.whitelist.names().map(str::to_string).collect()
        } else {
            self.config.targets.clone()
        }
    }

    /// Scan the configured targets and summarize what could be recovered.
    pub async fn analyze(
        &self,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Analysis, CleanError> {
        let targets = self.default_targets();
        self.analyze_targets(&targets, progress).await
    }

    /// Scan the named targets. Read-only; never takes the cleanup lock.
    pub async fn analyze_targets(
        &self,
        targets: &[String],
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Analysis, CleanError> {
        tracing::info!(targets = ?targets, "analyze started");
        let collected = self.collect(targets, progress).await?;

        let aggregator = Aggregator::with_config(AggregateConfig::from(&self.config));
        let result = aggregator.aggregate(&collected.entries);

        tracing::info!(
            files = result.file_count,
            bytes = result.total_recoverable_bytes,
            "analyze finished"
        );
        Ok(Analysis {
            result,
            warnings: collected.warnings,
        })
    }

    /// Re-scan the configured targets and delete everything found.
    pub async fn clean(
        &self,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Cleanup, CleanError> {
        let targets = self.default_targets();
        self.clean_targets(&targets, progress).await
    }

    /// Re-scan the named targets and delete everything found.
    ///
    /// Fails fast with [`CleanError::AlreadyRunning`] when another pass
    /// holds the lock. The re-scan reports progress in the scanning phase,
    /// followed by the deleting phase; each phase ends at 100.
    pub async fn clean_targets(
        &self,
        targets: &[String],
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Cleanup, CleanError> {
        let permit = self.acquire()?;
        tracing::info!(targets = ?targets, "clean started");

        let collected = self.collect(targets, &mut *progress).await?;
        let scanned_bytes = file_bytes(&collected.entries);

        let engine = DeletionEngine::new(collected.validator);
        let outcome = engine.delete(&permit, collected.entries, progress).await;

        tracing::info!(summary = %outcome.summary(), "clean finished");
        Ok(Cleanup {
            outcome,
            scanned_bytes,
            warnings: collected.warnings,
        })
    }

    /// Delete a caller-supplied list of entries.
    ///
    /// Every entry is re-validated against the configured targets' roots;
    /// anything outside them is recorded as denied and left alone.
    pub async fn clean_entries(
        &self,
        entries: Vec<ScanEntry>,
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Cleanup, CleanError> {
        let permit = self.acquire()?;
        let plan = self.plan(&self.default_targets()).await?;
        let validator = validator_for(&plan).await;

        let entries = dedup(entries);
        let scanned_bytes = file_bytes(&entries);
        tracing::info!(items = entries.len(), "clean of supplied entries started");

        let outcome = DeletionEngine::new(validator)
            .delete(&permit, entries, progress)
            .await;

        Ok(Cleanup {
            outcome,
            scanned_bytes,
            warnings: plan.warnings,
        })
    }

    fn acquire(&self) -> Result<crate::CleanupPermit, CleanError> {
        self.lock.try_acquire().inspect_err(|_| {
            tracing::warn!("cleanup rejected, another pass is running");
        })
    }

    /// Resolve target names to roots. The privilege probe runs once here.
    async fn plan(&self, targets: &[String]) -> Result<Plan, CleanError> {
        let probe = Arc::clone(&self.probe);
        let elevated = tokio::task::spawn_blocking(move || probe.is_elevated())
            .await
            .unwrap_or(false);
        let mut roots = Vec::new();
        let mut warnings = Vec::new();

        for name in targets {
            let resolved = self.whitelist.resolve(name, elevated)?;
            if resolved.withheld {
                tracing::warn!(name = %resolved.name, "target needs elevated rights, skipped");
                warnings.push(format!(
                    "'{}' requires administrator rights and was skipped",
                    resolved.name
                ));
            }
            for root in resolved.roots {
                roots.push((root, resolved.name.clone()));
            }
        }

        Ok(Plan { roots, warnings })
    }

    async fn collect(
        &self,
        targets: &[String],
        progress: &mut (dyn FnMut(ProgressEvent) + Send),
    ) -> Result<Collected, CleanError> {
        let plan = self.plan(targets).await?;
        let validator = validator_for(&plan).await;
        let interval = self.config.progress_interval.max(1);

        let mut tracker = ProgressTracker::new(
            ProgressPhase::Scanning,
            plan.roots.len() as u64,
            progress,
        );
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (root, category) in &plan.roots {
            let root_label = label_for(root);
            tracker.report(root_label.clone());

            let mut walk = self.scanner.walk(root, category.clone(), &validator).await?;
            let mut count: u64 = 0;
            while let Some(entry) = walk.next_entry().await {
                count += 1;
                if count % interval == 0 {
                    tracker.report(entry.label());
                }
                // Overlapping roots: keep the first sighting, never a root itself.
                if validator.is_root(&entry.path) || !seen.insert(entry.path.clone()) {
                    continue;
                }
                entries.push(entry);
            }

            tracing::debug!(root = %root.display(), entries = count, "root scanned");
            tracker.advance(root_label);
        }

        if plan.roots.is_empty() {
            tracker.report("nothing to scan");
        }

        Ok(Collected {
            entries,
            validator,
            warnings: plan.warnings,
        })
    }
}

/// Build a validator for the plan's roots. Resolving roots touches the
/// filesystem, so it runs on the blocking pool.
async fn validator_for(plan: &Plan) -> PathValidator {
    let roots: Vec<PathBuf> = plan.roots.iter().map(|(root, _)| root.clone()).collect();
    tokio::task::spawn_blocking(move || PathValidator::new(roots))
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "validator task failed, denying every path");
            PathValidator::default()
        })
}

fn file_bytes(entries: &[ScanEntry]) -> u64 {
    entries.iter().filter(|e| e.is_file()).map(|e| e.size_bytes).sum()
}

fn dedup(entries: Vec<ScanEntry>) -> Vec<ScanEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.path.clone()))
        .collect()
}

//! Reduction of scan output into an [`AnalysisResult`].

use std::cmp::Ordering;

use derive_builder::Builder;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use cleanmate_core::{AnalysisResult, CategoryTotal, CleanConfig, ScanEntry};

/// Configuration for aggregation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AggregateConfig {
    /// Number of largest files to keep.
    #[builder(default = "10")]
    pub top_n: usize,
}

impl AggregateConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(0) = self.top_n {
            return Err("top_n must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl AggregateConfig {
    /// Create a new config builder.
    pub fn builder() -> AggregateConfigBuilder {
        AggregateConfigBuilder::default()
    }
}

impl From<&CleanConfig> for AggregateConfig {
    fn from(config: &CleanConfig) -> Self {
        Self {
            top_n: config.top_n.max(1),
        }
    }
}

/// Pure reducer over a collected scan.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregateConfig,
}

impl Aggregator {
    /// Create an aggregator with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an aggregator with custom config.
    pub fn with_config(config: AggregateConfig) -> Self {
        Self { config }
    }

    /// Reduce entries into totals, top files and read-only files.
    pub fn aggregate(&self, entries: &[ScanEntry]) -> AnalysisResult {
        let mut total_bytes: u64 = 0;
        let mut file_count: u64 = 0;
        let mut dir_count: u64 = 0;
        let mut category_totals: IndexMap<_, CategoryTotal> = IndexMap::new();
        let mut files: Vec<&ScanEntry> = Vec::new();

        for entry in entries {
            let totals = category_totals.entry(entry.category.clone()).or_default();
            if entry.is_dir() {
                dir_count += 1;
                continue;
            }
            total_bytes += entry.size_bytes;
            file_count += 1;
            totals.bytes += entry.size_bytes;
            totals.count += 1;
            files.push(entry);
        }

        let read_only_entries = files
            .iter()
            .filter(|e| e.is_read_only())
            .map(|e| (*e).clone())
            .collect();

        AnalysisResult {
            total_recoverable_bytes: total_bytes,
            file_count,
            dir_count,
            top_entries: top_by_size(files, self.config.top_n),
            read_only_entries,
            category_totals,
        }
    }
}

/// Size descending, ties broken by path ascending.
fn by_size_then_path(a: &&ScanEntry, b: &&ScanEntry) -> Ordering {
    b.size_bytes
        .cmp(&a.size_bytes)
        .then_with(|| a.path.cmp(&b.path))
}

fn top_by_size(mut files: Vec<&ScanEntry>, n: usize) -> Vec<ScanEntry> {
    if files.len() > n {
        files.select_nth_unstable_by(n, by_size_then_path);
        files.truncate(n);
    }
    files.sort_by(by_size_then_path);
    files.into_iter().cloned().collect()
}

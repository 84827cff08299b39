//! CPU, memory and disk sampling.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, System};

const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// Coarse health classification of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Load is comfortable.
    Good,
    /// Load is elevated.
    Warning,
    /// Load or disk usage needs attention.
    Critical,
    /// No sample could be taken.
    #[default]
    Unknown,
}

impl HealthStatus {
    /// Classify usage percentages.
    pub fn classify(cpu_load: u8, ram_used: u8, disk_used: u8) -> Self {
        if cpu_load > 80 || ram_used > 80 || disk_used > 90 {
            Self::Critical
        } else if cpu_load > 50 || ram_used > 60 || disk_used > 70 {
            Self::Warning
        } else {
            Self::Good
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One sample of system load, in whole percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SystemMetrics {
    /// Global CPU usage.
    pub cpu_load: u8,
    /// Used share of physical memory.
    pub ram_used: u8,
    /// Used share of the main disk.
    pub disk_used: u8,
    /// Free space on the main disk, in whole GB.
    pub disk_free_gb: u64,
    /// Classification of the figures above.
    pub status: HealthStatus,
}

impl SystemMetrics {
    /// Build metrics from usage figures and classify them.
    pub fn new(cpu_load: u8, ram_used: u8, disk_used: u8, disk_free_gb: u64) -> Self {
        Self {
            cpu_load,
            ram_used,
            disk_used,
            disk_free_gb,
            status: HealthStatus::classify(cpu_load, ram_used, disk_used),
        }
    }

    /// Placeholder used when sampling fails.
    pub fn unknown() -> Self {
        Self::default()
    }
}

/// Samples metrics with `sysinfo`.
pub struct SystemMonitor {
    system: System,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMonitor {
    /// Create a monitor. Nothing is sampled until [`sample`](Self::sample).
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Take a fresh sample.
    ///
    /// CPU usage needs two refreshes, so this waits for the minimum
    /// update interval between them.
    pub async fn sample(&mut self) -> SystemMetrics {
        self.system.refresh_cpu_usage();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let total_memory = self.system.total_memory();
        if total_memory == 0 {
            tracing::warn!("memory information unavailable");
            return SystemMetrics::unknown();
        }

        let cpu_load = to_percent(f64::from(self.system.global_cpu_usage()));
        let ram_used = to_percent(self.system.used_memory() as f64 / total_memory as f64 * 100.0);

        let disks = Disks::new_with_refreshed_list();
        let (disk_used, disk_free_gb) = disks
            .list()
            .iter()
            .find(|d| is_main_mount(d.mount_point()))
            .or_else(|| disks.list().first())
            .filter(|d| d.total_space() > 0)
            .map(|d| {
                let used = d.total_space().saturating_sub(d.available_space());
                (
                    to_percent(used as f64 / d.total_space() as f64 * 100.0),
                    d.available_space() / BYTES_PER_GB,
                )
            })
            .unwrap_or((0, 0));

        let metrics = SystemMetrics::new(cpu_load, ram_used, disk_used, disk_free_gb);
        tracing::debug!(
            cpu = metrics.cpu_load,
            ram = metrics.ram_used,
            disk = metrics.disk_used,
            status = %metrics.status,
            "system sampled"
        );
        metrics
    }
}

fn is_main_mount(mount: &Path) -> bool {
    if cfg!(windows) {
        mount.to_string_lossy().eq_ignore_ascii_case("C:\\")
    } else {
        mount == Path::new("/")
    }
}

fn to_percent(value: f64) -> u8 {
    if value.is_finite() {
        value.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}

//! Process and host memory snapshot.

use serde::Serialize;
use sysinfo::{get_current_pid, MemoryRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::sync::Mutex;

const MB: f64 = 1024.0 * 1024.0;

/// Memory usage in megabytes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySnapshot {
    /// Resident set size of this process
    pub process_mb: f64,
    pub system_used_mb: f64,
    pub system_total_mb: f64,
}

/// Memory sampler backed by `sysinfo`.
pub struct SystemMonitor {
    system: Mutex<System>,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMonitor {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new_with_specifics(
                RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
            )),
        }
    }

    /// Refresh and read current memory figures.
    pub async fn memory(&self) -> MemorySnapshot {
        let mut system = self.system.lock().await;
        system.refresh_memory();

        let process_bytes = match get_current_pid() {
            Ok(pid) => {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                system.process(pid).map(|p| p.memory()).unwrap_or(0)
            }
            Err(_) => 0,
        };

        MemorySnapshot {
            process_mb: round2(process_bytes as f64 / MB),
            system_used_mb: round2(system.used_memory() as f64 / MB),
            system_total_mb: round2(system.total_memory() as f64 / MB),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

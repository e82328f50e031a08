//! Local metric collection over persistent sysinfo handles.

use lightpost_proto::metrics::{now_rfc3339, render_payload};
use std::sync::Arc;
use sysinfo::{Disks, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::Mutex;

/// Shared sysinfo handles; kept alive across connections so refreshes stay
/// cheap. Cloning shares the same handles.
#[derive(Clone)]
pub struct Collector {
    sys: Arc<Mutex<System>>,
    disks: Arc<Mutex<Disks>>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing().with_memory(MemoryRefreshKind::everything());
        let sys = System::new_with_specifics(refresh);
        let mut disks = Disks::new();
        disks.refresh(true);
        Self {
            sys: Arc::new(Mutex::new(sys)),
            disks: Arc::new(Mutex::new(disks)),
        }
    }

    /// Render the current snapshot as framed payload text, stamped once for
    /// the whole batch.
    pub async fn payload(&self) -> String {
        let pairs = self.sample().await;
        render_payload(&pairs, &now_rfc3339())
    }

    async fn sample(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(3);

        pairs.push(("uptime".to_string(), System::uptime().to_string()));

        let memory_used = {
            let mut sys = self.sys.lock().await;
            sys.refresh_memory();
            let total = sys.total_memory().max(1);
            let used = total.saturating_sub(sys.available_memory());
            used as f64 / total as f64 * 100.0
        };
        pairs.push(("memory_used".to_string(), format!("{memory_used:.2}")));

        // Usage of the largest mount stands in for "the disk".
        let disk_used = {
            let mut disks = self.disks.lock().await;
            disks.refresh(true);
            disks
                .list()
                .iter()
                .filter(|d| d.total_space() > 0)
                .max_by_key(|d| d.total_space())
                .map(|d| {
                    let total = d.total_space() as f64;
                    (total - d.available_space() as f64) / total * 100.0
                })
        };
        if let Some(disk_used) = disk_used {
            pairs.push(("disk_used".to_string(), format!("{disk_used:.2}")));
        }

        pairs
    }
}

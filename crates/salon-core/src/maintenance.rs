use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Process-wide maintenance switch. Starts disabled; the last write wins.
#[derive(Debug, Default)]
pub struct MaintenanceFlag {
    enabled: AtomicBool,
}

impl MaintenanceFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Overwrite the flag and return the new value.
    pub fn set(&self, enabled: bool) -> bool {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "maintenance mode changed");
        }
        enabled
    }
}

use std::time::Duration;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::device::constants::{MIN_SCAN_DURATION, SCAN_DURATION};
use crate::device::types::DuplicatePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub scan_duration_ms: u64,
    pub duplicate_policy: DuplicatePolicy,
    // empty means every advertising device is accepted
    pub service_filter: Vec<Uuid>,
    pub allow_duplicates: bool,
}

impl Config {
    pub fn scan_duration(&self) -> Duration {
        Duration::from_millis(self.scan_duration_ms)
    }

    pub fn override_scan_duration(&mut self, duration: Duration) {
        self.scan_duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.normalize();
    }

    pub fn normalize(&mut self) {
        self.scan_duration_ms = self.scan_duration_ms.max(MIN_SCAN_DURATION);

        let unique: IndexSet<Uuid> = self.service_filter.drain(..).collect();
        self.service_filter = unique.into_iter().collect();
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scan_duration_ms: SCAN_DURATION,
            duplicate_policy: DuplicatePolicy::KeepFirst,
            service_filter: Vec::new(),
            allow_duplicates: false,
        }
    }
}

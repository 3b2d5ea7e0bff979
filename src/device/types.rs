use std::fmt;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::CapabilityError;

/// One advertising device as reported by the scanning capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// A device accumulated into the current scan session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

impl From<DeviceDescriptor> for DiscoveredDevice {
    fn from(descriptor: DeviceDescriptor) -> Self {
        DiscoveredDevice {
            id: descriptor.id,
            name: descriptor.name,
            rssi: descriptor.rssi,
        }
    }
}

/// Payload of a single discovery callback: either an error or one observed device.
pub type DiscoveryEvent = Result<DeviceDescriptor, CapabilityError>;

/// What to do with a discovery event for an id that is already in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum DuplicatePolicy {
    /// The first sighting wins, repeats are ignored.
    #[default]
    KeepFirst,
    /// Repeats overwrite name and rssi, the list position is kept.
    Refresh,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            DuplicatePolicy::KeepFirst => "keep first",
            DuplicatePolicy::Refresh => "refresh",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Scanning {
        generation: u64,
        started_at: Instant,
    },
}

impl ScanState {
    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }
}

/// Events delivered to the controller by the capability callback and the scan timer.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    Discovery {
        generation: u64,
        event: DiscoveryEvent,
    },
    Timeout {
        generation: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyScanning,
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanCommand {
    StartScan,
}

/// Read-only view of the controller handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanSnapshot {
    pub available: bool,
    pub scanning: bool,
    pub devices: Vec<DiscoveredDevice>,
}

use crate::device::constants::UNNAMED_DEVICE;
use crate::device::types::{DiscoveredDevice, ScanSnapshot};
use crate::error::CapabilityError;

pub const TITLE: &str = "BLE ESP32";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRow {
    pub name: String,
    pub id_line: String,
    pub rssi_line: String,
}

impl From<&DiscoveredDevice> for DeviceRow {
    fn from(device: &DiscoveredDevice) -> Self {
        let rssi = match device.rssi {
            Some(rssi) => rssi.to_string(),
            None => "unknown".to_string(),
        };

        DeviceRow {
            name: device.name.clone()
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| UNNAMED_DEVICE.to_string()),
            id_line: format!("ID: {}", device.id),
            rssi_line: format!("RSSI: {}", rssi),
        }
    }
}

/// Everything the window shows, derived from the latest scan state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Unavailable {
        heading: &'static str,
        explanation: &'static str,
        detail: String,
    },
    Scanner {
        button_label: &'static str,
        button_enabled: bool,
        rows: Vec<DeviceRow>,
    },
}

pub fn scan_button_label(scanning: bool) -> &'static str {
    match scanning {
        true => "Scanning...",
        false => "Start Scan",
    }
}

/// `ready` is false until the scanner has reported whether a capability is available.
pub fn screen(ready: bool, unavailable: Option<&CapabilityError>, snapshot: &ScanSnapshot) -> Screen {
    if let Some(reason) = unavailable {
        return Screen::Unavailable {
            heading: "BLE Manager not available",
            explanation: "This app requires native BLE support.",
            detail: format!("Check that a Bluetooth adapter is present and enabled ({}).", reason),
        };
    }

    Screen::Scanner {
        button_label: scan_button_label(snapshot.scanning),
        button_enabled: ready && snapshot.available && !snapshot.scanning,
        rows: snapshot.devices.iter().map(DeviceRow::from).collect(),
    }
}

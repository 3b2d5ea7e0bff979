use std::fmt;
use indexmap::IndexMap;

/// OS-level capabilities BLE scanning depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    AccessFineLocation,
    BluetoothScan,
    BluetoothConnect,
}

/// Everything requested before the first scan.
pub const SCAN_PERMISSIONS: [Permission; 3] = [
    Permission::AccessFineLocation,
    Permission::BluetoothScan,
    Permission::BluetoothConnect,
];

impl Permission {
    /// The platform name of the permission, as the Android permission system spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::AccessFineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Permission::BluetoothScan => "android.permission.BLUETOOTH_SCAN",
            Permission::BluetoothConnect => "android.permission.BLUETOOTH_CONNECT",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        };

        write!(f, "{}", result)
    }
}

pub type PermissionResults = IndexMap<Permission, PermissionStatus>;

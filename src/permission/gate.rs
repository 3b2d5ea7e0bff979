use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use futures::future::BoxFuture;
use log::{debug, info, warn};
use tokio::spawn;

use crate::error::PermissionError;
use crate::permission::types::{Permission, PermissionResults, PermissionStatus, SCAN_PERMISSIONS};

pub trait PermissionRequester: Send + Sync {
    fn request_multiple(&self, permissions: &[Permission]) -> BoxFuture<'static, Result<PermissionResults, PermissionError>>;
}

/// Asks the OS for the permissions scanning needs, once. Scanning never waits for the answer; if
/// access is refused the scan itself fails with a discovery error.
pub struct PermissionGate {
    requester: Arc<dyn PermissionRequester>,
    requested: AtomicBool,
}

fn log_results(results: Result<PermissionResults, PermissionError>) {
    match results {
        Ok(results) => {
            for (permission, status) in results {
                match status {
                    PermissionStatus::Granted => info!("Permission {} {}", permission, status),
                    PermissionStatus::Denied => warn!("Permission {} {}", permission, status),
                }
            }
        },
        Err(err) => warn!("Failed to request permissions: {}", err),
    }
}

impl PermissionGate {
    pub fn new(requester: Arc<dyn PermissionRequester>) -> Self {
        PermissionGate {
            requester,
            requested: AtomicBool::new(false),
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn request_permissions(&self) {
        if self.requested.swap(true, Ordering::SeqCst) {
            debug!("Permissions have already been requested");
            return;
        }

        info!("Requesting permissions: {:?}", SCAN_PERMISSIONS);
        let request = self.requester.request_multiple(&SCAN_PERMISSIONS);

        spawn(async move {
            log_results(request.await);
        });
    }
}

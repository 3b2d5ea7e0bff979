use btleplug::api::Manager as _;
use btleplug::platform::Manager;
use futures::future::BoxFuture;
use log::debug;

use crate::error::PermissionError;
use crate::permission::gate::PermissionRequester;
use crate::permission::types::{Permission, PermissionResults, PermissionStatus};

/// Desktop Bluetooth stacks prompt for access the first time an adapter is touched, so the
/// request is made by enumerating adapters. A denial covers every requested permission.
pub struct PlatformPermissions;

async fn count_adapters() -> Result<usize, btleplug::Error> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;
    Ok(adapters.len())
}

impl PermissionRequester for PlatformPermissions {
    fn request_multiple(&self, permissions: &[Permission]) -> BoxFuture<'static, Result<PermissionResults, PermissionError>> {
        let permissions = permissions.to_vec();

        Box::pin(async move {
            let status = match count_adapters().await {
                Ok(count) => {
                    debug!("Bluetooth access check found {} adapter(s)", count);
                    PermissionStatus::Granted
                },
                Err(btleplug::Error::PermissionDenied) => PermissionStatus::Denied,
                Err(err) => return Err(err.into()),
            };

            Ok(permissions.into_iter().map(|permission| (permission, status)).collect())
        })
    }
}

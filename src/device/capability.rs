use std::collections::HashSet;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use log::{debug, info, warn};
use tokio::spawn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::device::types::{DeviceDescriptor, DiscoveryEvent};
use crate::error::CapabilityError;

/// Invoked once per discovery event, in the order the radio reports them.
pub type DiscoveryCallback = Box<dyn FnMut(DiscoveryEvent) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanOptions {
    /// Report every advertisement instead of only the first one per device.
    pub allow_duplicates: bool,
}

/// The host's BLE scanning capability.
///
/// Implementations must tolerate `stop_device_scan` when no scan is running, and must not invoke
/// the callback of a scan after it has been stopped or the capability destroyed.
pub trait ScanCapability: Send {
    fn start_device_scan(
        &mut self,
        filter: Option<Vec<Uuid>>,
        options: Option<ScanOptions>,
        callback: DiscoveryCallback,
    );

    fn stop_device_scan(&mut self);

    fn destroy(&mut self);
}

/// Scanning capability backed by the first adapter btleplug reports.
pub struct BtleplugCapability {
    adapter: Adapter,
    scan_cancel: Option<CancellationToken>,
    // a stop still in flight; the next scan waits for it so it cannot stop the new session
    pending_stop: Option<JoinHandle<()>>,
    destroyed: bool,
}

impl BtleplugCapability {
    pub async fn create() -> Result<Self, CapabilityError> {
        let manager = Manager::new().await?;
        let adapter = manager.adapters().await?
            .into_iter()
            .next()
            .ok_or(CapabilityError::NoAdapter)?;

        info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));

        Ok(BtleplugCapability {
            adapter,
            scan_cancel: None,
            pending_stop: None,
            destroyed: false,
        })
    }
}

async fn describe_peripheral(peripheral: &Peripheral) -> Result<Option<DeviceDescriptor>, CapabilityError> {
    let properties = match peripheral.properties().await? {
        Some(properties) => properties,
        None => return Ok(None),
    };

    Ok(Some(DeviceDescriptor {
        id: peripheral.id().to_string(),
        name: properties.local_name,
        rssi: properties.rssi,
    }))
}

/// Reports a looked-up peripheral. A peripheral whose properties cannot be read (for example one
/// that went out of range) is skipped; it does not end the scan.
fn report_peripheral<I: Hash + Eq + Debug>(
    id: I,
    described: Result<Option<DeviceDescriptor>, CapabilityError>,
    reported: &mut HashSet<I>,
    callback: &mut DiscoveryCallback,
) {
    match described {
        Ok(Some(descriptor)) => {
            reported.insert(id);
            callback(Ok(descriptor));
        },
        Ok(None) => debug!("Peripheral {:?} has no properties", id),
        Err(err) => warn!("Could not query peripheral {:?} for properties: {}", id, err),
    }
}

/// Runs `next` once the previous stop, if any, has reached the adapter.
async fn after_pending_stop<F: Future>(pending_stop: Option<JoinHandle<()>>, next: F) -> F::Output {
    if let Some(stop) = pending_stop {
        if let Err(err) = stop.await {
            warn!("Stop scanning task failed: {:?}", err);
        }
    }
    next.await
}

async fn discovery_loop(
    adapter: &Adapter,
    services: Vec<Uuid>,
    allow_duplicates: bool,
    callback: &mut DiscoveryCallback,
) -> Result<(), CapabilityError> {
    let mut events = adapter.events().await?;
    adapter.start_scan(ScanFilter { services }).await?;

    // btleplug only raises DeviceDiscovered once per adapter lifetime, so devices that are
    // already cached show up as DeviceUpdated in later scans.
    let mut reported = HashSet::new();

    while let Some(event) = events.next().await {
        let id = match event {
            CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
            _ => continue,
        };

        if !allow_duplicates && reported.contains(&id) {
            continue;
        }

        let peripheral = match adapter.peripheral(&id).await {
            Ok(peripheral) => peripheral,
            Err(err) => {
                warn!("Could not look up peripheral {:?}: {}", id, err);
                continue;
            },
        };

        let described = describe_peripheral(&peripheral).await;
        report_peripheral(id, described, &mut reported, callback);
    }

    Err(CapabilityError::Btle { message: "adapter event stream ended".to_string() })
}

impl ScanCapability for BtleplugCapability {
    fn start_device_scan(
        &mut self,
        filter: Option<Vec<Uuid>>,
        options: Option<ScanOptions>,
        mut callback: DiscoveryCallback,
    ) {
        if self.destroyed {
            callback(Err(CapabilityError::Destroyed));
            return;
        }

        if let Some(previous) = self.scan_cancel.take() {
            previous.cancel();
        }

        let cancel = CancellationToken::new();
        self.scan_cancel = Some(cancel.clone());

        let adapter = self.adapter.clone();
        let services = filter.unwrap_or_default();
        let allow_duplicates = options.unwrap_or_default().allow_duplicates;
        let pending_stop = self.pending_stop.take();

        spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Ok(()),
                result = after_pending_stop(
                    pending_stop,
                    discovery_loop(&adapter, services, allow_duplicates, &mut callback),
                ) => result,
            };

            if let Err(err) = result {
                if !cancel.is_cancelled() {
                    callback(Err(err));
                }
            }
        });
    }

    fn stop_device_scan(&mut self) {
        let Some(cancel) = self.scan_cancel.take() else {
            debug!("Stop requested but no scan is running");
            return;
        };
        cancel.cancel();

        let adapter = self.adapter.clone();
        let previous_stop = self.pending_stop.take();
        self.pending_stop = Some(spawn(after_pending_stop(previous_stop, async move {
            if let Err(err) = adapter.stop_scan().await {
                warn!("Failed to stop scanning: {:?}", err);
            }
        })));
    }

    fn destroy(&mut self) {
        if let Some(cancel) = self.scan_cancel.take() {
            cancel.cancel();
        }
        self.destroyed = true;
        info!("Scanning capability destroyed");
    }
}

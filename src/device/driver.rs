use std::convert::Infallible;
use futures::channel::mpsc::{channel, Receiver, Sender, UnboundedReceiver};
use futures::{SinkExt, StreamExt};
use iced::subscription::{self, Subscription};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::device::capability::{BtleplugCapability, ScanCapability};
use crate::device::constants::COMMAND_BUFFER;
use crate::device::controller::{ScanController, ScanSettings};
use crate::device::types::{ControllerEvent, ScanCommand, ScanSnapshot};
use crate::error::CapabilityError;

#[derive(Debug, Clone)]
pub enum ScanUpdate {
    /// The controller is running; `unavailable` is set when no scanning capability could be acquired.
    Ready {
        commands: Sender<ScanCommand>,
        unavailable: Option<CapabilityError>,
    },
    Snapshot(ScanSnapshot),
}

/// Feeds commands and controller events into `controller` until `cancel` fires, publishing a
/// snapshot whenever the visible state changes. The controller is disposed on the way out.
pub async fn drive_controller(
    cancel: CancellationToken,
    mut controller: ScanController,
    mut events: UnboundedReceiver<ControllerEvent>,
    mut commands: Receiver<ScanCommand>,
    mut updates: Sender<ScanUpdate>,
) {
    let mut previous = controller.snapshot();

    if updates.send(ScanUpdate::Snapshot(previous.clone())).await.is_ok() {
        'mainloop: loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break 'mainloop;
                },
                Some(command) = commands.next() => {
                    match command {
                        ScanCommand::StartScan => {
                            controller.start_scan();
                        },
                    }
                },
                Some(event) = events.next() => {
                    controller.handle_event(event);
                },
                else => {
                    break 'mainloop;
                },
            }

            let snapshot = controller.snapshot();
            if snapshot != previous {
                if updates.send(ScanUpdate::Snapshot(snapshot.clone())).await.is_err() {
                    warn!("Nobody is listening for scan updates anymore");
                    break 'mainloop;
                }
                previous = snapshot;
            }
        }
    }

    controller.dispose();
}

async fn run_scanner(cancel: CancellationToken, settings: ScanSettings, mut output: Sender<ScanUpdate>) -> Infallible {
    let (capability, unavailable) = match BtleplugCapability::create().await {
        Ok(capability) => (Some(Box::new(capability) as Box<dyn ScanCapability>), None),
        Err(err) => {
            warn!("BLE Manager not available: {}", err);
            (None, Some(err))
        },
    };

    let (controller, events) = ScanController::new(capability, settings);
    let (command_sender, command_receiver) = channel::<ScanCommand>(COMMAND_BUFFER);

    match output.send(ScanUpdate::Ready { commands: command_sender, unavailable }).await {
        Ok(_) => drive_controller(cancel, controller, events, command_receiver, output).await,
        Err(_) => controller.dispose(),
    }

    info!("Scanner stopped");

    // note: subscription::channel expects the future to never resolve (Infallible)
    futures::future::pending().await
}

pub fn scan_subscription(cancel: CancellationToken, settings: ScanSettings) -> Subscription<ScanUpdate> {
    struct Scan;

    subscription::channel(
        std::any::TypeId::of::<Scan>(),
        64,
        move |subscription_sender| {
            run_scanner(cancel, settings, subscription_sender)
        },
    )
}

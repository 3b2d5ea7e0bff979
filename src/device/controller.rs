use std::time::Duration;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use indexmap::IndexMap;
use log::{debug, info, warn};
use tokio::spawn;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::types::Config;
use crate::device::capability::{ScanCapability, ScanOptions};
use crate::device::types::{
    ControllerEvent, DiscoveredDevice, DiscoveryEvent, DuplicatePolicy, ScanSnapshot, ScanState, StartOutcome,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub scan_duration: Duration,
    pub duplicate_policy: DuplicatePolicy,
    pub service_filter: Vec<Uuid>,
    pub allow_duplicates: bool,
}

impl From<&Config> for ScanSettings {
    fn from(config: &Config) -> Self {
        ScanSettings {
            scan_duration: config.scan_duration(),
            duplicate_policy: config.duplicate_policy,
            service_filter: config.service_filter.clone(),
            allow_duplicates: config.allow_duplicates,
        }
    }
}

impl Default for ScanSettings {
    fn default() -> Self {
        ScanSettings::from(&Config::default())
    }
}

/// Fires `ControllerEvent::Timeout` once, unless cancelled first.
struct ScanTimer {
    generation: u64,
    cancel: CancellationToken,
}

impl ScanTimer {
    fn arm(duration: Duration, generation: u64, events: UnboundedSender<ControllerEvent>) -> ScanTimer {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {},
                _ = sleep(duration) => {
                    // the receiver is gone once the controller has been disposed
                    let _ = events.unbounded_send(ControllerEvent::Timeout { generation });
                },
            }
        });

        ScanTimer { generation, cancel }
    }

    fn cancel(self) {
        self.cancel.cancel();
    }
}

/// Owns the scanning capability and turns its discovery events into a deduplicated device list.
///
/// The controller is a plain state machine: it never awaits. Discovery callbacks and the scan
/// timer feed `ControllerEvent`s into the receiver returned by [`ScanController::new`], and the
/// owner passes them back through [`ScanController::handle_event`] one at a time.
pub struct ScanController {
    capability: Option<Box<dyn ScanCapability>>,
    settings: ScanSettings,
    state: ScanState,
    devices: IndexMap<String, DiscoveredDevice>,
    generation: u64,
    timer: Option<ScanTimer>,
    events: UnboundedSender<ControllerEvent>,
}

impl ScanController {
    /// `capability` is `None` when this platform has no usable BLE stack.
    pub fn new(
        capability: Option<Box<dyn ScanCapability>>,
        settings: ScanSettings,
    ) -> (ScanController, UnboundedReceiver<ControllerEvent>) {
        let (events, receiver) = unbounded::<ControllerEvent>();

        let controller = ScanController {
            capability,
            settings,
            state: ScanState::Idle,
            devices: IndexMap::new(),
            generation: 0,
            timer: None,
            events,
        };

        (controller, receiver)
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_some()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn devices(&self) -> impl Iterator<Item = &DiscoveredDevice> {
        self.devices.values()
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            available: self.is_available(),
            scanning: self.state.is_scanning(),
            devices: self.devices().cloned().collect(),
        }
    }

    pub fn start_scan(&mut self) -> StartOutcome {
        let Some(capability) = self.capability.as_mut() else {
            warn!("BLE scanning capability not available, not starting a scan");
            return StartOutcome::Unavailable;
        };

        if self.state.is_scanning() {
            debug!("Scan already running, ignoring start request");
            return StartOutcome::AlreadyScanning;
        }

        // a session that ended early on an error still has its timer pending; stop on its behalf
        if let Some(timer) = self.timer.take() {
            debug!("Superseding the timer of session {}", timer.generation);
            timer.cancel();
            capability.stop_device_scan();
        }

        self.devices.clear();
        self.generation += 1;
        let generation = self.generation;
        self.state = ScanState::Scanning { generation, started_at: Instant::now() };

        info!(
            "Starting scan {} for {}",
            generation,
            humantime::format_duration(self.settings.scan_duration),
        );

        let events = self.events.clone();
        let filter = match self.settings.service_filter.is_empty() {
            true => None,
            false => Some(self.settings.service_filter.clone()),
        };
        let options = ScanOptions { allow_duplicates: self.settings.allow_duplicates };

        capability.start_device_scan(filter, Some(options), Box::new(move |event| {
            let _ = events.unbounded_send(ControllerEvent::Discovery { generation, event });
        }));

        self.timer = Some(ScanTimer::arm(self.settings.scan_duration, generation, self.events.clone()));

        StartOutcome::Started
    }

    pub fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::Discovery { generation, event } => self.handle_discovery(generation, event),
            ControllerEvent::Timeout { generation } => self.handle_timeout(generation),
        }
    }

    fn handle_discovery(&mut self, generation: u64, event: DiscoveryEvent) {
        match self.state {
            ScanState::Scanning { generation: current, .. } if current == generation => {},
            _ => {
                debug!("Dropping discovery event from scan {} that is no longer running", generation);
                return;
            },
        }

        match event {
            Err(err) => {
                warn!("Scan {} failed: {}", generation, err);
                self.finish_scan();
            },
            Ok(descriptor) => match self.devices.get_mut(&descriptor.id) {
                None => {
                    debug!("Discovered {} ({:?}, rssi {:?})", descriptor.id, descriptor.name, descriptor.rssi);
                    self.devices.insert(descriptor.id.clone(), DiscoveredDevice::from(descriptor));
                },
                Some(existing) => match self.settings.duplicate_policy {
                    DuplicatePolicy::KeepFirst => {},
                    DuplicatePolicy::Refresh => {
                        existing.name = descriptor.name;
                        existing.rssi = descriptor.rssi;
                    },
                },
            },
        }
    }

    fn handle_timeout(&mut self, generation: u64) {
        if generation != self.generation {
            debug!("Ignoring timer of superseded scan {}", generation);
            return;
        }

        if self.timer.as_ref().is_some_and(|timer| timer.generation == generation) {
            self.timer = None;
        }

        if let Some(capability) = self.capability.as_mut() {
            capability.stop_device_scan();
        }

        if let ScanState::Scanning { started_at, .. } = self.state {
            info!(
                "Scan {} finished after {}, {} device(s) found",
                generation,
                humantime::format_duration(started_at.elapsed()),
                self.devices.len(),
            );
            self.finish_scan();
        }
    }

    fn finish_scan(&mut self) {
        self.state = ScanState::Idle;
    }

    /// Cancels the pending timer and releases the capability. An in-flight scan is left to the
    /// capability's own teardown.
    pub fn dispose(mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }

        if let Some(mut capability) = self.capability.take() {
            capability.destroy();
        }

        self.state = ScanState::Idle;
        info!("Scan controller disposed");
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::device::capability::testing::{Call, RecordingCapability};
    use crate::device::types::DeviceDescriptor;
    use crate::error::CapabilityError;
    use crate::test_log;

    fn device(id: &str, name: Option<&str>, rssi: i16) -> DiscoveryEvent {
        Ok(DeviceDescriptor {
            id: id.to_string(),
            name: name.map(str::to_string),
            rssi: Some(rssi),
        })
    }

    fn controller_with(
        settings: ScanSettings,
    ) -> (ScanController, UnboundedReceiver<ControllerEvent>, RecordingCapability) {
        let capability = RecordingCapability::default();
        let (controller, events) = ScanController::new(Some(Box::new(capability.clone())), settings);
        (controller, events, capability)
    }

    async fn pump(controller: &mut ScanController, events: &mut UnboundedReceiver<ControllerEvent>, count: usize) {
        for _ in 0..count {
            let event = events.next().await.expect("event channel closed");
            controller.handle_event(event);
        }
    }

    fn ids(controller: &ScanController) -> Vec<String> {
        controller.devices().map(|device| device.id.clone()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_ids_are_listed_once() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        assert_eq!(controller.start_scan(), StartOutcome::Started);

        for id in ["a", "b", "a", "c"] {
            capability.emit(device(id, None, -60));
        }
        pump(&mut controller, &mut events, 4).await;

        assert_eq!(ids(&controller), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn starts_without_a_filter_by_default() {
        let (mut controller, _events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();

        assert_eq!(capability.calls(), vec![Call::Start {
            filter: None,
            options: Some(ScanOptions { allow_duplicates: false }),
        }]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_scan_clears_previous_session() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(device("old", Some("Old"), -70));
        pump(&mut controller, &mut events, 1).await;

        // timer ends the first session
        pump(&mut controller, &mut events, 1).await;
        assert_eq!(controller.state(), ScanState::Idle);
        assert_eq!(ids(&controller), vec!["old"]);

        assert_eq!(controller.start_scan(), StartOutcome::Started);
        assert_eq!(controller.devices().count(), 0);

        capability.emit(device("new", None, -50));
        pump(&mut controller, &mut events, 1).await;
        assert_eq!(ids(&controller), vec!["new"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_stops_scan_after_duration() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        let started = Instant::now();
        controller.start_scan();
        assert!(controller.state().is_scanning());

        pump(&mut controller, &mut events, 1).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(10));
        assert!(elapsed < Duration::from_millis(10_050));
        assert_eq!(controller.state(), ScanState::Idle);
        assert_eq!(capability.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn discovery_error_ends_scan_immediately() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        let started = Instant::now();
        controller.start_scan();
        capability.emit(device("a", None, -40));
        capability.emit(Err(CapabilityError::PermissionDenied));
        pump(&mut controller, &mut events, 2).await;

        assert_eq!(controller.state(), ScanState::Idle);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ids(&controller), vec!["a"]);
        // the error path does not stop the capability; the timer does
        assert_eq!(capability.stop_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_after_error_only_stops_the_capability() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(device("a", None, -40));
        capability.emit(Err(CapabilityError::NoAdapter));
        pump(&mut controller, &mut events, 2).await;
        let before = controller.snapshot();

        pump(&mut controller, &mut events, 1).await;

        assert_eq!(capability.stop_count(), 1);
        assert_eq!(controller.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn second_timer_fire_is_harmless() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(device("a", None, -40));
        pump(&mut controller, &mut events, 2).await;
        let before = controller.snapshot();

        controller.handle_event(ControllerEvent::Timeout { generation: 1 });

        assert_eq!(capability.stop_count(), 2);
        assert_eq!(controller.snapshot(), before);
        assert!(!controller.snapshot().scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn start_while_scanning_is_ignored() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(device("a", None, -40));
        pump(&mut controller, &mut events, 1).await;

        assert_eq!(controller.start_scan(), StartOutcome::AlreadyScanning);

        assert_eq!(ids(&controller), vec!["a"]);
        let starts = capability.calls().iter().filter(|call| matches!(call, Call::Start { .. })).count();
        assert_eq!(starts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_capability_stays_idle() {
        test_log::capture();
        let (mut controller, _events) = ScanController::new(None, ScanSettings::default());

        assert_eq!(controller.start_scan(), StartOutcome::Unavailable);
        assert_eq!(controller.state(), ScanState::Idle);
        assert_eq!(controller.snapshot(), ScanSnapshot { available: false, scanning: false, devices: vec![] });
        assert!(test_log::warnings().iter().any(|message| message.contains("not available")));
    }

    #[tokio::test(start_paused = true)]
    async fn keep_first_policy_ignores_repeat_sightings() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(device("X1", Some("ESP32"), -40));
        capability.emit(device("X1", Some("ESP32"), -55));
        pump(&mut controller, &mut events, 2).await;

        let devices: Vec<_> = controller.devices().collect();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].rssi, Some(-40));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_policy_updates_in_place() {
        let settings = ScanSettings { duplicate_policy: DuplicatePolicy::Refresh, ..ScanSettings::default() };
        let (mut controller, mut events, capability) = controller_with(settings);
        controller.start_scan();
        capability.emit(device("X1", Some("ESP32"), -40));
        capability.emit(device("Y2", None, -70));
        capability.emit(device("X1", Some("ESP32"), -55));
        pump(&mut controller, &mut events, 3).await;

        assert_eq!(ids(&controller), vec!["X1", "Y2"]);
        assert_eq!(controller.devices().next().unwrap().rssi, Some(-55));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_error_supersedes_old_timer() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();
        capability.emit(Err(CapabilityError::PermissionDenied));
        pump(&mut controller, &mut events, 1).await;

        tokio::time::advance(Duration::from_secs(3)).await;
        let restarted = Instant::now();
        assert_eq!(controller.start_scan(), StartOutcome::Started);
        // stop issued on behalf of the cancelled timer
        assert_eq!(capability.stop_count(), 1);

        // the next timeout belongs to the new session, a full duration after the restart
        pump(&mut controller, &mut events, 1).await;
        assert!(restarted.elapsed() >= Duration::from_secs(10));
        assert_eq!(controller.state(), ScanState::Idle);
        assert_eq!(capability.stop_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_events_are_dropped() {
        let (mut controller, _events, _capability) = controller_with(ScanSettings::default());
        controller.start_scan();

        controller.handle_event(ControllerEvent::Discovery { generation: 7, event: device("ghost", None, -1) });
        controller.handle_event(ControllerEvent::Timeout { generation: 7 });

        assert_eq!(controller.devices().count(), 0);
        assert!(controller.state().is_scanning());
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_cancels_timer_and_destroys_capability() {
        let (mut controller, mut events, capability) = controller_with(ScanSettings::default());
        controller.start_scan();

        controller.dispose();
        tokio::time::advance(Duration::from_secs(30)).await;

        // every sender is gone and the timer never fired
        assert!(events.next().await.is_none());
        assert_eq!(capability.calls().last(), Some(&Call::Destroy));
        assert_eq!(capability.stop_count(), 0);
    }
}

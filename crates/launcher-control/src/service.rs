use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    errors::{ControlError, RegistrationError, SubsystemFailure},
    provider::DataProvider,
    registry::{Consumer, Registry, Subscriber},
};

pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(60);

const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1);

/// Outcome of one synchronization pass.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub failed: Vec<SubsystemFailure>,
}

impl FetchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Registry and cache tags share one lock so registration and cycle
/// bookkeeping never interleave.
#[derive(Default)]
struct ControlState {
    registry: Registry,
    last_fetched: HashMap<String, String>,
}

/// Fetches control data on an interval, caching the last seen tag per
/// subsystem and notifying the registry of changes.
pub struct ControlService {
    data: Arc<dyn DataProvider>,
    request_interval: Duration,
    state: Mutex<ControlState>,
    cycle: tokio::sync::Mutex<()>,
    cancel_tx: watch::Sender<bool>,
}

impl ControlService {
    pub fn new(data: Arc<dyn DataProvider>) -> Self {
        let (cancel_tx, _) = watch::channel(false);
        Self {
            data,
            request_interval: DEFAULT_REQUEST_INTERVAL,
            state: Mutex::new(ControlState::default()),
            cycle: tokio::sync::Mutex::new(()),
            cancel_tx,
        }
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_REQUEST_INTERVAL {
            warn!(?interval, "request interval too small, clamping");
            self.request_interval = MIN_REQUEST_INTERVAL;
        } else {
            self.request_interval = interval;
        }
        self
    }

    pub fn request_interval(&self) -> Duration {
        self.request_interval
    }

    pub fn register_consumer(
        &self,
        subsystem: &str,
        consumer: Arc<dyn Consumer>,
    ) -> Result<(), RegistrationError> {
        self.lock_state()
            .registry
            .register_consumer(subsystem, consumer)
    }

    pub fn register_subscriber(&self, subsystem: &str, subscriber: Arc<dyn Subscriber>) {
        self.lock_state()
            .registry
            .register_subscriber(subsystem, subscriber);
    }

    /// Last tag stored for `subsystem`; `None` if it has never been fetched.
    pub fn cached_tag(&self, subsystem: &str) -> Option<String> {
        self.lock_state().last_fetched.get(subsystem).cloned()
    }

    /// Runs fetch cycles every `request_interval` until [`stop`](Self::stop).
    /// The first cycle runs one interval after start. A cycle already in
    /// progress when stop is requested runs to completion.
    pub async fn start(&self) {
        let mut cancel_rx = self.cancel_tx.subscribe();
        if *cancel_rx.borrow_and_update() {
            return;
        }

        let period = self.request_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?period, "control service started");

        loop {
            tokio::select! {
                biased;
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow_and_update() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.fetch().await {
                        Ok(report) if !report.is_clean() => {
                            warn!(failed = report.failed.len(), "control fetch completed with failures");
                        }
                        Ok(_) => {}
                        Err(err) => warn!("control fetch failed: {err}"),
                    }
                }
            }
        }
        info!("control service stopped");
    }

    /// Spawns [`start`](Self::start) onto the runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let svc = Arc::clone(self);
        tokio::spawn(async move { svc.start().await })
    }

    /// Requests the run loop to exit. Idempotent, and honoured even if called
    /// before the loop has started.
    pub fn stop(&self) {
        self.cancel_tx.send_replace(true);
    }

    /// Performs one retrieval of the latest control data and notifies
    /// registered consumers and subscribers of changed subsystems.
    ///
    /// Only a failure to get or decode the root subsystem map is an error;
    /// per-subsystem failures are collected in the report.
    pub async fn fetch(&self) -> Result<FetchReport, ControlError> {
        let _cycle = self.cycle.lock().await;

        let root = self
            .data
            .get("", None)
            .await
            .map_err(ControlError::RootFetch)?;
        let subsystems: BTreeMap<String, String> =
            serde_json::from_slice(&root.data).map_err(ControlError::DecodeRootMap)?;

        let mut report = FetchReport::default();
        for (subsystem, resource) in subsystems {
            let cached = self.cached_tag(&subsystem);
            let fetched = match self.data.get(&resource, cached.as_deref()).await {
                Ok(fetched) => fetched,
                Err(source) => {
                    warn!(subsystem = %subsystem, resource = %resource, "failed to get control data: {source}");
                    report.failed.push(SubsystemFailure { subsystem, source });
                    continue;
                }
            };

            if is_unchanged(cached.as_deref(), &fetched.etag) {
                report.unchanged.push(subsystem);
                continue;
            }

            let targets = self.lock_state().registry.targets(&subsystem);
            targets.dispatch(&subsystem, &fetched.data);

            self.lock_state()
                .last_fetched
                .insert(subsystem.clone(), fetched.etag);
            report.updated.push(subsystem);
        }

        debug!(
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "control data fetch complete"
        );
        Ok(report)
    }

    fn lock_state(&self) -> MutexGuard<'_, ControlState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An empty tag carries no version, so only a present, non-empty tag that
/// matches counts as unchanged.
fn is_unchanged(cached: Option<&str>, etag: &str) -> bool {
    matches!(cached, Some(cached) if !cached.is_empty() && cached == etag)
}

use super::{
    endpoint::{Endpoint, Liveness, ProbeRecord},
    errors::ClusterError,
    roster::Roster,
};
use arc_swap::ArcSwap;
use chrono::Utc;
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    sync::broadcast,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

/// Probe scheduling and classification settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    /// Time between full refresh cycles.
    pub interval: Duration,
    /// Upper bound on a single sync-status call.
    pub probe_timeout: Duration,
    /// Largest reported sync distance still considered active.
    pub max_sync_lag_slots: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(2),
            max_sync_lag_slots: 1,
        }
    }
}

/// Classifies configured endpoints and publishes the active roster.
///
/// Probes run without any lock held. Applying their results and swapping the
/// roster happen together under a short mutex, so a reader loading the roster
/// always sees a snapshot consistent with the probes completed so far.
///
/// Two triggers refresh liveness:
/// - [`refresh`](Self::refresh): every endpoint, concurrently, on a fixed interval
/// - [`hint_failure`](Self::hint_failure): one endpoint, right after a routed call
///   against it failed, so a dead endpoint leaves the roster before the next cycle
pub struct HealthTracker {
    endpoints: Vec<Arc<Endpoint>>,
    roster: ArcSwap<Roster>,
    /// Held while applying probe results and publishing; guards the generation counter.
    publish: Mutex<u64>,
    config: HealthConfig,
}

impl HealthTracker {
    /// Creates a tracker over `endpoints` (configuration order). The roster is empty
    /// until the first refresh.
    #[must_use]
    pub fn new(endpoints: Vec<Arc<Endpoint>>, config: HealthConfig) -> Self {
        Self {
            endpoints,
            roster: ArcSwap::from_pointee(Roster::default()),
            publish: Mutex::new(0),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    /// Every configured endpoint, active or not.
    #[must_use]
    pub fn endpoints(&self) -> &[Arc<Endpoint>] {
        &self.endpoints
    }

    /// Current roster snapshot. Lock-free.
    #[must_use]
    pub fn roster(&self) -> Arc<Roster> {
        self.roster.load_full()
    }

    /// Probes one endpoint without applying the result.
    ///
    /// Active iff the sync-status call answers within the probe timeout and the
    /// reported sync distance is within tolerance. Errors are folded into the record.
    pub async fn probe(&self, endpoint: &Endpoint) -> ProbeRecord {
        let node = endpoint.node();
        let started = Instant::now();
        let result = tokio::time::timeout(self.config.probe_timeout, node.node_syncing()).await;
        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = started.elapsed().as_millis() as u64;

        let (liveness, state, error) = match result {
            Ok(Ok(state)) if state.sync_distance <= self.config.max_sync_lag_slots => {
                (Liveness::Active, Some(state), None)
            }
            Ok(Ok(state)) => {
                let error = format!(
                    "sync distance {} exceeds tolerance {}",
                    state.sync_distance, self.config.max_sync_lag_slots
                );
                (Liveness::Inactive, Some(state), Some(error))
            }
            Ok(Err(e)) => (Liveness::Inactive, None, Some(e.to_string())),
            Err(_) => (Liveness::Inactive, None, Some("probe timed out".to_string())),
        };

        debug!(
            endpoint = %endpoint.name(),
            liveness = %liveness,
            latency_ms,
            error = error.as_deref().unwrap_or(""),
            "probe finished"
        );

        ProbeRecord {
            timestamp: Utc::now(),
            liveness,
            head_slot: state.as_ref().map(|s| s.head_slot),
            sync_distance: state.as_ref().map(|s| s.sync_distance),
            latency_ms,
            error,
        }
    }

    /// Probes every configured endpoint concurrently and publishes the new roster.
    ///
    /// Individual probe failures only mark that endpoint inactive.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::Configuration`] if no endpoints are configured.
    pub async fn refresh(&self) -> Result<Arc<Roster>, ClusterError> {
        if self.endpoints.is_empty() {
            return Err(ClusterError::Configuration("no endpoints configured".to_string()));
        }

        let probes = self.endpoints.iter().map(|endpoint| {
            let ticket = endpoint.issue_ticket();
            async move { (endpoint, ticket, self.probe(endpoint).await) }
        });
        let results = futures::future::join_all(probes).await;

        Ok(self.apply_and_publish(results))
    }

    /// Probes a single endpoint and republishes the roster.
    pub async fn reprobe(&self, endpoint: &Arc<Endpoint>) -> Liveness {
        let ticket = endpoint.issue_ticket();
        let record = self.probe(endpoint).await;
        let liveness = record.liveness;
        self.apply_and_publish(vec![(endpoint, ticket, record)]);
        liveness
    }

    /// Schedules an out-of-cycle re-probe after a failed call against `endpoint`.
    ///
    /// Returns immediately. At most one re-probe per endpoint runs at a time; hints
    /// for endpoints not currently active are ignored.
    pub fn hint_failure(self: &Arc<Self>, endpoint: &Arc<Endpoint>) {
        if !endpoint.is_active() || !endpoint.try_begin_reprobe() {
            return;
        }

        debug!(endpoint = %endpoint.name(), "scheduling fast-path re-probe");
        let tracker = Arc::clone(self);
        let endpoint = Arc::clone(endpoint);
        tokio::spawn(async move {
            let liveness = tracker.reprobe(&endpoint).await;
            endpoint.end_reprobe();
            if liveness != Liveness::Active {
                warn!(endpoint = %endpoint.name(), "endpoint demoted after failed call");
            }
        });
    }

    /// Starts the periodic refresh loop. The first refresh runs immediately.
    #[must_use]
    pub fn start_with_shutdown(
        self: &Arc<Self>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> tokio::task::JoinHandle<()> {
        let tracker = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = interval(tracker.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = tracker.refresh().await {
                            error!(error = %e, "health refresh failed");
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("health tracker shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn apply_and_publish(&self, results: Vec<(&Arc<Endpoint>, u64, ProbeRecord)>) -> Arc<Roster> {
        let mut generation = self.publish.lock();

        for (endpoint, ticket, record) in results {
            let liveness = record.liveness;
            let error = record.error.clone();
            match endpoint.apply_probe(ticket, record) {
                Some(previous) if previous != liveness => {
                    if liveness == Liveness::Active {
                        info!(endpoint = %endpoint.name(), from = %previous, "endpoint became active");
                    } else {
                        warn!(
                            endpoint = %endpoint.name(),
                            from = %previous,
                            error = error.as_deref().unwrap_or(""),
                            "endpoint became inactive"
                        );
                    }
                }
                Some(_) => {}
                None => {
                    debug!(endpoint = %endpoint.name(), ticket, "discarding stale probe result");
                }
            }
        }

        let active: Vec<Arc<Endpoint>> =
            self.endpoints.iter().filter(|e| e.is_active()).cloned().collect();

        let current = self.roster.load();
        let changed = current.len() != active.len() ||
            current.endpoints().iter().zip(&active).any(|(a, b)| !Arc::ptr_eq(a, b));

        *generation += 1;
        let roster = Arc::new(Roster::new(active, *generation));
        self.roster.store(Arc::clone(&roster));

        if changed {
            info!(
                active = roster.len(),
                total = self.endpoints.len(),
                generation = *generation,
                "active roster changed"
            );
        }

        roster
    }
}

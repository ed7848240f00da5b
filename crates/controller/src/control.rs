//! Control loop: one sense → decide → actuate → sync pass every cycle.
//!
//! The loop owns the profile and the relay. Each cycle publishes a complete
//! snapshot to the shared state for the status API. Remote calls and retry
//! backoff run inline, so a slow upload delays the next cycle.

use std::future::Future;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::actuation::{ActuationController, ActuationState, ActuatorPort};
use crate::clock::Clock;
use crate::decision::{evaluate, StatusReport};
use crate::health;
use crate::link::LinkMonitor;
use crate::profile::Profile;
use crate::remote::{LogEntry, RemoteClient, ONLINE};
use crate::sample::{SensorPort, SensorSample};
use crate::state::{SharedState, Snapshot};
use crate::sync::{FetchOutcome, PushOutcome, SyncScheduler};

/// Sampling cadence.
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(5);

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// `None` when the sensors failed this cycle.
    pub sample: Option<SensorSample>,
    pub status: Option<StatusReport>,
    pub relay: ActuationState,
    pub relay_changed: bool,
    pub upload: Option<PushOutcome>,
    pub refresh: Option<FetchOutcome>,
}

pub struct ControlLoop<S, A, R, L, C> {
    cycle_interval: Duration,
    sensors: S,
    actuation: ActuationController<A>,
    sync: SyncScheduler<R, L>,
    clock: C,
    profile: Profile,
    shared: SharedState,
}

impl<S, A, R, L, C> ControlLoop<S, A, R, L, C>
where
    S: SensorPort,
    A: ActuatorPort,
    R: RemoteClient,
    L: LinkMonitor,
    C: Clock,
{
    pub fn new(
        sensors: S,
        actuation: ActuationController<A>,
        sync: SyncScheduler<R, L>,
        clock: C,
        profile: Profile,
        shared: SharedState,
    ) -> Self {
        Self {
            cycle_interval: CYCLE_INTERVAL,
            sensors,
            actuation,
            sync,
            clock,
            profile,
            shared,
        }
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn relay(&self) -> ActuationState {
        self.actuation.state()
    }

    /// Initial profile fetch before the first cycle. Starts the refresh
    /// cadence.
    pub async fn bootstrap(&mut self) -> FetchOutcome {
        let outcome = self.refresh_profile(Instant::now()).await;
        info!(
            crop = %self.profile.crop_name,
            garden_id = self.sync.garden_id(),
            "controller ready"
        );
        outcome
    }

    /// Run one control cycle scheduled at `tick`. Never fails: faults
    /// degrade the cycle and are reported.
    ///
    /// Both remote cadences are checked and marked against `tick` rather
    /// than the time the cycle reaches them, so sensor and network latency
    /// never push a due upload into the next cycle.
    pub async fn run_cycle(&mut self, tick: Instant) -> CycleReport {
        let mut report = CycleReport {
            sample: None,
            status: None,
            relay: self.actuation.state(),
            relay_changed: false,
            upload: None,
            refresh: None,
        };

        match self.sensors.read() {
            Ok(sample) => {
                let now = self.clock.now_utc();
                let status = evaluate(&sample, &self.profile, now);
                let (relay, changed) = self.actuation.update(sample.moisture_percent, &self.profile);
                log_cycle(&sample, &status, relay);

                {
                    let mut st = self.shared.write().await;
                    if changed {
                        st.record_relay(relay);
                    }
                    st.publish(Snapshot::new(now, sample, &self.profile.crop_name, &status));
                }

                if self.sync.log_due(tick) {
                    let entry = self.log_entry(&sample, &status);
                    let outcome = self.sync.push_log(&entry, tick).await;
                    self.shared.write().await.record_upload(&outcome);
                    report.upload = Some(outcome);
                }

                report.sample = Some(sample);
                report.status = Some(status);
                report.relay = relay;
                report.relay_changed = changed;
            }
            Err(fault) => {
                error!("sensor fault, relay held at {}: {fault}", self.actuation.state());
                self.shared.write().await.record_error(fault.to_string());
            }
        }

        if self.sync.profile_refresh_due(tick) {
            report.refresh = Some(self.refresh_profile(tick).await);
        }

        report
    }

    /// Cycle every [`CYCLE_INTERVAL`] (unless overridden) until `shutdown`
    /// resolves, then release the relay. A cycle in progress always runs to completion.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                tick = ticker.tick() => {
                    self.run_cycle(tick).await;
                }
            }
        }

        self.actuation.force_off();
        let mut st = self.shared.write().await;
        st.record_relay(ActuationState::Off);
        st.record_system("controller stopped".to_string());
        info!("control loop stopped, relay released");
    }

    async fn refresh_profile(&mut self, now: Instant) -> FetchOutcome {
        let outcome = self.sync.fetch_profile(&mut self.profile, now).await;
        self.shared
            .write()
            .await
            .record_profile(&outcome, &self.profile.crop_name);
        outcome
    }

    fn log_entry(&self, sample: &SensorSample, status: &StatusReport) -> LogEntry {
        LogEntry {
            garden_id: self.sync.garden_id().to_string(),
            crop_name: self.profile.crop_name.clone(),
            current_temp: sample.temperature,
            current_hum: sample.humidity,
            current_moist: sample.moisture_percent,
            remaining_days: status.remaining_days,
            status_message: status.text(),
            internet_status: ONLINE,
        }
    }
}

fn log_cycle(sample: &SensorSample, status: &StatusReport, relay: ActuationState) {
    let fmt = |v: Option<f32>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.1}"));
    let moisture = format!("{:.1}", sample.moisture_percent);
    let health = health::assess(sample)
        .map_or_else(|| "sensor offline".to_string(), |h| format!("{:.0} ({})", h.score, h.label));

    if sample.temperature.is_none() || sample.humidity.is_none() {
        warn!("climate probe unavailable, temperature/humidity skipped");
    }
    info!(
        temperature = %fmt(sample.temperature),
        humidity = %fmt(sample.humidity),
        moisture = %moisture,
        relay = %relay,
        remaining_days = status.remaining_days,
        health = %health,
        "{status}"
    );
}

// ===========================================================================
// Tests
// ===========================================================================

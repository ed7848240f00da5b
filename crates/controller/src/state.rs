use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::actuation::ActuationState;
use crate::decision::{Clause, StatusReport};
use crate::health::{self, Health};
use crate::sample::SensorSample;
use crate::sync::{FetchOutcome, PushOutcome};

/// Maximum number of events retained in the ring buffer.
const MAX_EVENTS: usize = 200;

// ---------------------------------------------------------------------------
// Public type alias
// ---------------------------------------------------------------------------

pub type SharedState = Arc<RwLock<SystemState>>;

pub fn shared() -> SharedState {
    Arc::new(RwLock::new(SystemState::new()))
}

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Read-side view of the controller for the status API. The control loop
/// owns the real profile and relay state and publishes here once per cycle.
pub struct SystemState {
    pub started_at: Instant,
    pub link_up: bool,
    pub relay: ActuationState,
    pub latest: Option<Snapshot>,
    pub events: VecDeque<SystemEvent>,
}

/// Everything derived from one control cycle, swapped in as a whole.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
    pub sample: SensorSample,
    pub crop_name: String,
    pub remaining_days: u32,
    pub clauses: Vec<Clause>,
    pub status: String,
    pub health: Option<Health>,
}

impl Snapshot {
    pub fn new(
        taken_at: OffsetDateTime,
        sample: SensorSample,
        crop_name: &str,
        report: &StatusReport,
    ) -> Self {
        Self {
            taken_at,
            sample,
            crop_name: crop_name.to_string(),
            remaining_days: report.remaining_days,
            clauses: report.clauses.clone(),
            status: report.text(),
            health: health::assess(&sample),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemEvent {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub kind: EventKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Reading,
    Relay,
    Upload,
    Profile,
    Error,
    System,
}

// ---------------------------------------------------------------------------
// JSON responses (what the API returns)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub uptime_secs: u64,
    pub link_up: bool,
    pub relay: ActuationState,
    pub crop_name: Option<String>,
    pub remaining_days: Option<u32>,
    pub status: Option<String>,
    pub health: Option<Health>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_reading_at: Option<OffsetDateTime>,
    pub events: Vec<SystemEvent>,
}

/// Shape polled by the dashboard.
#[derive(Debug, Serialize, PartialEq)]
pub struct SensorResponse {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub moisture: f32,
}

// ---------------------------------------------------------------------------
// Construction & mutation
// ---------------------------------------------------------------------------

impl Default for SystemState {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemState {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            link_up: false,
            relay: ActuationState::Off,
            latest: None,
            events: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    /// Replace the latest snapshot.
    pub fn publish(&mut self, snapshot: Snapshot) {
        let s = &snapshot.sample;
        let detail = format!(
            "t={} h={} m={:.1} | {}",
            fmt_opt(s.temperature),
            fmt_opt(s.humidity),
            s.moisture_percent,
            snapshot.status
        );
        self.latest = Some(snapshot);
        self.push_event(EventKind::Reading, detail);
    }

    /// Record a relay state change.
    pub fn record_relay(&mut self, state: ActuationState) {
        self.relay = state;
        self.push_event(EventKind::Relay, format!("irrigation {state}"));
    }

    pub fn record_upload(&mut self, outcome: &PushOutcome) {
        let detail = match outcome {
            PushOutcome::Delivered { attempts } => format!("log uploaded (attempt {attempts})"),
            PushOutcome::Exhausted {
                attempts,
                last_error,
            } => format!("log dropped after {attempts} attempts: {last_error}"),
            PushOutcome::Offline => "offline, upload skipped".to_string(),
        };
        self.link_up = !matches!(outcome, PushOutcome::Offline);
        self.push_event(EventKind::Upload, detail);
    }

    pub fn record_profile(&mut self, outcome: &FetchOutcome, crop_name: &str) {
        let detail = match outcome {
            FetchOutcome::Adopted => format!("profile refreshed ({crop_name})"),
            FetchOutcome::Empty => "no profile record, keeping current".to_string(),
            FetchOutcome::Failed(e) => format!("profile refresh failed: {e}"),
            FetchOutcome::Offline => "offline, profile refresh skipped".to_string(),
        };
        self.link_up = !matches!(outcome, FetchOutcome::Offline);
        self.push_event(EventKind::Profile, detail);
    }

    /// Record an error event.
    pub fn record_error(&mut self, detail: String) {
        self.push_event(EventKind::Error, detail);
    }

    /// Record a generic system event.
    pub fn record_system(&mut self, detail: String) {
        self.push_event(EventKind::System, detail);
    }

    /// Build the JSON-serialisable status snapshot.
    pub fn to_status(&self) -> StatusResponse {
        let latest = self.latest.as_ref();
        StatusResponse {
            uptime_secs: self.started_at.elapsed().as_secs(),
            link_up: self.link_up,
            relay: self.relay,
            crop_name: latest.map(|s| s.crop_name.clone()),
            remaining_days: latest.map(|s| s.remaining_days),
            status: latest.map(|s| s.status.clone()),
            health: latest.and_then(|s| s.health),
            last_reading_at: latest.map(|s| s.taken_at),
            events: self.events.iter().rev().cloned().collect(),
        }
    }

    /// The latest reading, if a cycle has completed yet.
    pub fn to_sensor(&self) -> Option<SensorResponse> {
        self.latest.as_ref().map(|s| SensorResponse {
            temperature: s.sample.temperature,
            humidity: s.sample.humidity,
            moisture: s.sample.moisture_percent,
        })
    }

    fn push_event(&mut self, kind: EventKind, detail: String) {
        if self.events.len() >= MAX_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(SystemEvent {
            ts: OffsetDateTime::now_utc(),
            kind,
            detail,
        });
    }
}

fn fmt_opt(v: Option<f32>) -> String {
    match v {
        Some(v) => format!("{v:.1}"),
        None => "n/a".to_string(),
    }
}

//! Test doubles shared by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::actuation::ActuatorPort;
use crate::link::LinkMonitor;
use crate::profile::ProfileRecord;
use crate::remote::{LogEntry, RemoteClient, RemoteError};
use crate::sample::{SensorFault, SensorPort, SensorSample};

pub(crate) fn record() -> ProfileRecord {
    ProfileRecord {
        crop_name: "tomatoes".into(),
        optimum_temp: 24.0,
        optimum_hum: 70.0,
        optimum_moist: 55.0,
        total_days: 90,
        start_date: "2026-01-10T00:00:00Z".into(),
    }
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RemoteScript {
    pushes: VecDeque<Result<(), RemoteError>>,
    pushed: Vec<LogEntry>,
    fetch: Option<Result<Vec<ProfileRecord>, RemoteError>>,
    fetched_for: Vec<String>,
}

/// Remote store double. Unscripted uploads succeed; unscripted fetches
/// return an empty result set. A scripted fetch answer repeats and, like
/// the REST client, yields only its first row.
#[derive(Clone, Default)]
pub(crate) struct ScriptedRemote {
    inner: Rc<RefCell<RemoteScript>>,
}

impl ScriptedRemote {
    pub(crate) fn script_pushes(&self, results: Vec<Result<(), RemoteError>>) {
        self.inner.borrow_mut().pushes = results.into();
    }

    pub(crate) fn script_fetch(&self, result: Result<Vec<ProfileRecord>, RemoteError>) {
        self.inner.borrow_mut().fetch = Some(result);
    }

    pub(crate) fn push_calls(&self) -> usize {
        self.inner.borrow().pushed.len()
    }

    pub(crate) fn pushed(&self) -> Vec<LogEntry> {
        self.inner.borrow().pushed.clone()
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.inner.borrow().fetched_for.len()
    }

    pub(crate) fn fetched_for(&self) -> Vec<String> {
        self.inner.borrow().fetched_for.clone()
    }
}

impl RemoteClient for ScriptedRemote {
    async fn fetch_profile(&self, garden_id: &str) -> Result<Option<ProfileRecord>, RemoteError> {
        let mut s = self.inner.borrow_mut();
        s.fetched_for.push(garden_id.to_string());
        s.fetch
            .clone()
            .unwrap_or(Ok(Vec::new()))
            .map(|rows| rows.into_iter().next())
    }

    async fn push_log(&self, entry: &LogEntry) -> Result<(), RemoteError> {
        let mut s = self.inner.borrow_mut();
        s.pushed.push(entry.clone());
        s.pushes.pop_front().unwrap_or(Ok(()))
    }
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct FlagLink(Rc<Cell<bool>>);

impl FlagLink {
    pub(crate) fn up() -> Self {
        Self(Rc::new(Cell::new(true)))
    }

    pub(crate) fn down() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    pub(crate) fn set(&self, up: bool) {
        self.0.set(up);
    }
}

impl LinkMonitor for FlagLink {
    fn is_connected(&mut self) -> bool {
        self.0.get()
    }
}

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// Yields scripted samples in order, then repeats the last one.
pub(crate) struct ScriptedSensors {
    queue: VecDeque<Result<SensorSample, SensorFault>>,
    last: Result<SensorSample, SensorFault>,
}

impl ScriptedSensors {
    pub(crate) fn new(script: Vec<Result<SensorSample, SensorFault>>) -> Self {
        let last = script
            .last()
            .cloned()
            .unwrap_or(Err(SensorFault::Moisture("no script".into())));
        Self {
            queue: script.into(),
            last,
        }
    }
}

impl SensorPort for ScriptedSensors {
    fn read(&mut self) -> Result<SensorSample, SensorFault> {
        self.queue.pop_front().unwrap_or_else(|| self.last.clone())
    }
}

pub(crate) fn sample(temp: f32, hum: f32, moist: f32) -> SensorSample {
    SensorSample {
        temperature: Some(temp),
        humidity: Some(hum),
        moisture_percent: moist,
    }
}

// ---------------------------------------------------------------------------
// Actuator
// ---------------------------------------------------------------------------

/// Records every port write (`true` = set, `false` = clear).
#[derive(Clone, Default)]
pub(crate) struct RecordingPort(Rc<RefCell<Vec<bool>>>);

impl RecordingPort {
    pub(crate) fn writes(&self) -> Vec<bool> {
        self.0.borrow().clone()
    }
}

impl ActuatorPort for RecordingPort {
    fn set(&mut self) {
        self.0.borrow_mut().push(true);
    }

    fn clear(&mut self) {
        self.0.borrow_mut().push(false);
    }
}

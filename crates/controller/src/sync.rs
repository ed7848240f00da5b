//! Sync scheduler: the two remote cadences (telemetry upload and profile
//! refresh) and the bounded retry discipline around uploads.
//!
//! Both operations are skipped while the link is down. Uploads retry a
//! fixed number of times with a constant backoff and are then dropped;
//! profile refreshes are single attempts that never disturb the current
//! profile unless a complete record arrives.

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::link::LinkMonitor;
use crate::profile::Profile;
use crate::remote::{LogEntry, RemoteClient, RemoteError};

/// Telemetry cadence.
pub const LOG_INTERVAL: Duration = Duration::from_secs(5);
/// Profile refresh cadence.
pub const PROFILE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
/// Upload attempts before an entry is dropped.
pub const UPLOAD_ATTEMPTS: u32 = 3;
/// Constant wait between upload attempts.
pub const UPLOAD_BACKOFF: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Due-timer
// ---------------------------------------------------------------------------

/// Compares the time since the last attempt against a fixed interval.
/// A timer that has never been marked is due.
#[derive(Debug, Clone)]
pub struct DueTimer {
    interval: Duration,
    last: Option<Instant>,
}

impl DueTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    pub fn mark(&mut self, now: Instant) {
        self.last = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: UPLOAD_ATTEMPTS,
            backoff: UPLOAD_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    Delivered { attempts: u32 },
    /// Every attempt failed; the entry was dropped.
    Exhausted { attempts: u32, last_error: RemoteError },
    /// Link down; nothing was sent.
    Offline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// A complete record replaced the profile.
    Adopted,
    /// The store has no record for this garden; profile kept.
    Empty,
    /// Transport or payload failure; profile kept.
    Failed(String),
    /// Link down; nothing was requested.
    Offline,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct SyncScheduler<R, L> {
    remote: R,
    link: L,
    garden_id: String,
    retry: RetryPolicy,
    log_timer: DueTimer,
    refresh_timer: DueTimer,
}

impl<R: RemoteClient, L: LinkMonitor> SyncScheduler<R, L> {
    pub fn new(remote: R, link: L, garden_id: impl Into<String>) -> Self {
        Self {
            remote,
            link,
            garden_id: garden_id.into(),
            retry: RetryPolicy::default(),
            log_timer: DueTimer::new(LOG_INTERVAL),
            refresh_timer: DueTimer::new(PROFILE_REFRESH_INTERVAL),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn garden_id(&self) -> &str {
        &self.garden_id
    }

    pub fn log_due(&self, now: Instant) -> bool {
        self.log_timer.is_due(now)
    }

    pub fn profile_refresh_due(&self, now: Instant) -> bool {
        self.refresh_timer.is_due(now)
    }

    pub fn link_up(&mut self) -> bool {
        self.link.is_connected()
    }

    /// Upload `entry`, retrying on failure. Never fails the caller: an
    /// exhausted entry is logged and dropped. `now` is the instant the log
    /// cadence counts from, the same one passed to [`Self::log_due`].
    pub async fn push_log(&mut self, entry: &LogEntry, now: Instant) -> PushOutcome {
        self.log_timer.mark(now);

        if !self.link.is_connected() {
            warn!("link offline, skipping upload");
            return PushOutcome::Offline;
        }

        let max = self.retry.attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.remote.push_log(entry).await {
                Ok(()) => {
                    info!(attempt, "log uploaded");
                    return PushOutcome::Delivered { attempts: attempt };
                }
                Err(e) if attempt >= max => {
                    error!(attempts = attempt, "upload abandoned, entry dropped: {e}");
                    return PushOutcome::Exhausted {
                        attempts: attempt,
                        last_error: e,
                    };
                }
                Err(e) => {
                    warn!(
                        attempt,
                        retry_in_sec = self.retry.backoff.as_secs(),
                        "upload failed: {e}"
                    );
                    sleep(self.retry.backoff).await;
                }
            }
        }
    }

    /// Refresh `profile` from the remote store with a single attempt. The
    /// profile is replaced wholesale from the first record, or left as is.
    /// The refresh cadence counts from `now`.
    pub async fn fetch_profile(&mut self, profile: &mut Profile, now: Instant) -> FetchOutcome {
        self.refresh_timer.mark(now);

        if !self.link.is_connected() {
            warn!("link offline, skipping profile refresh");
            return FetchOutcome::Offline;
        }

        let record = match self.remote.fetch_profile(&self.garden_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(garden_id = %self.garden_id, "no profile record for garden, keeping current");
                return FetchOutcome::Empty;
            }
            Err(e) => {
                warn!(garden_id = %self.garden_id, "profile refresh failed, keeping current: {e}");
                return FetchOutcome::Failed(e.to_string());
            }
        };

        match Profile::try_from(record) {
            Ok(fresh) => {
                if fresh != *profile {
                    info!(
                        crop = %fresh.crop_name,
                        optimum_temp = fresh.optimum_temp,
                        optimum_humidity = fresh.optimum_humidity,
                        optimum_moisture = fresh.optimum_moisture,
                        total_days = fresh.total_days,
                        "profile updated"
                    );
                }
                *profile = fresh;
                FetchOutcome::Adopted
            }
            Err(e) => {
                warn!(garden_id = %self.garden_id, "malformed profile record, keeping current: {e}");
                FetchOutcome::Failed(e.to_string())
            }
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

//! Irrigation relay control with a fixed dead-band around the moisture
//! optimum.
//!
//! ```text
//!          moisture < opt - 3           moisture > opt + 3
//!   OFF ─────────────────────▶ ON ─────────────────────▶ OFF
//!        (inside the band: hold whatever state we are in)
//! ```

use serde::Serialize;
use std::fmt;
use tracing::info;

use crate::decision::{classify, Band};
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ActuationState {
    #[default]
    Off,
    On,
}

impl ActuationState {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl fmt::Display for ActuationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("OFF"),
            Self::On => f.write_str("ON"),
        }
    }
}

/// Output side of the relay: the domain only ever energises or releases it.
pub trait ActuatorPort {
    /// Energise the irrigation relay.
    fn set(&mut self);
    /// Release the irrigation relay.
    fn clear(&mut self);
}

impl<A: ActuatorPort + ?Sized> ActuatorPort for Box<A> {
    fn set(&mut self) {
        (**self).set()
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

/// Hysteresis policy: the next relay state for `moisture` given `current`.
pub fn next_state(moisture: f32, profile: &Profile, current: ActuationState) -> ActuationState {
    match classify(moisture, profile.optimum_moisture) {
        Band::Below => ActuationState::On,
        Band::Above => ActuationState::Off,
        Band::Inside => current,
    }
}

/// Owns the actuator port and the last state applied to it. The port is
/// only written when the state actually changes.
pub struct ActuationController<A> {
    port: A,
    applied: ActuationState,
}

impl<A: ActuatorPort> ActuationController<A> {
    /// Take ownership of `port` and force the relay off.
    pub fn new(mut port: A) -> Self {
        port.clear();
        info!("irrigation relay forced OFF at start");
        Self {
            port,
            applied: ActuationState::Off,
        }
    }

    pub fn state(&self) -> ActuationState {
        self.applied
    }

    /// Apply the hysteresis policy to a fresh moisture reading. Returns the
    /// resulting state and whether it changed.
    pub fn update(&mut self, moisture: f32, profile: &Profile) -> (ActuationState, bool) {
        let target = next_state(moisture, profile, self.applied);
        if target == self.applied {
            return (target, false);
        }

        match target {
            ActuationState::On => self.port.set(),
            ActuationState::Off => self.port.clear(),
        }
        info!(
            moisture = format!("{moisture:.1}"),
            optimum = format!("{:.1}", profile.optimum_moisture),
            "irrigation {target}"
        );
        self.applied = target;
        (target, true)
    }

    /// Release the relay regardless of the current state.
    pub fn force_off(&mut self) {
        self.port.clear();
        if self.applied.is_on() {
            info!("irrigation OFF (forced)");
        }
        self.applied = ActuationState::Off;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

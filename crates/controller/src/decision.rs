//! Decision engine: compares a sample against the profile's optimum values
//! and produces a status report. Pure; no I/O.

use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

use crate::profile::Profile;
use crate::sample::SensorSample;

/// Half-width of the tolerance band around every optimum value.
pub const TOLERANCE: f32 = 3.0;

/// Text reported when every dimension sits inside its band.
pub const WITHIN_RANGE: &str = "within range";

/// Where a value sits relative to its tolerance band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Below,
    Inside,
    Above,
}

/// Classify `value` against `optimum ± TOLERANCE`. Both band edges are
/// inside.
pub fn classify(value: f32, optimum: f32) -> Band {
    if value < optimum - TOLERANCE {
        Band::Below
    } else if value > optimum + TOLERANCE {
        Band::Above
    } else {
        Band::Inside
    }
}

/// One advisory clause, per dimension and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    TemperatureLow,
    TemperatureHigh,
    MoistureLow,
    MoistureHigh,
    HumidityLow,
    HumidityHigh,
}

impl Clause {
    /// The corrective action the clause prescribes.
    pub fn action(self) -> &'static str {
        match self {
            Self::TemperatureLow => "enhancing insulation",
            Self::TemperatureHigh => "fan ON",
            Self::MoistureLow => "irrigation ON",
            Self::MoistureHigh => "irrigation OFF",
            Self::HumidityLow => "reduce ventilation",
            Self::HumidityHigh => "increase ventilation",
        }
    }

    fn condition(self) -> &'static str {
        match self {
            Self::TemperatureLow => "temperature low",
            Self::TemperatureHigh => "temperature high",
            Self::MoistureLow => "moisture low",
            Self::MoistureHigh => "moisture high",
            Self::HumidityLow => "humidity low",
            Self::HumidityHigh => "humidity high",
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.condition(), self.action())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    /// Clauses in fixed order: temperature, moisture, humidity.
    pub clauses: Vec<Clause>,
    pub remaining_days: u32,
}

impl StatusReport {
    pub fn is_within_range(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Rendered status text: each clause terminated by `"; "`, or
    /// `"within range"` when there are none.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str(WITHIN_RANGE);
        }
        for clause in &self.clauses {
            write!(f, "{clause}; ")?;
        }
        Ok(())
    }
}

/// Evaluate one dimension. An unavailable reading yields no clause.
fn dimension(value: Option<f32>, optimum: f32, low: Clause, high: Clause) -> Option<Clause> {
    match classify(value?, optimum) {
        Band::Below => Some(low),
        Band::Above => Some(high),
        Band::Inside => None,
    }
}

/// Build the status report for `sample` under `profile` at wall-clock `now`.
pub fn evaluate(sample: &SensorSample, profile: &Profile, now: OffsetDateTime) -> StatusReport {
    let clauses = [
        dimension(
            sample.temperature,
            profile.optimum_temp,
            Clause::TemperatureLow,
            Clause::TemperatureHigh,
        ),
        dimension(
            Some(sample.moisture_percent),
            profile.optimum_moisture,
            Clause::MoistureLow,
            Clause::MoistureHigh,
        ),
        dimension(
            sample.humidity,
            profile.optimum_humidity,
            Clause::HumidityLow,
            Clause::HumidityHigh,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    StatusReport {
        clauses,
        remaining_days: profile.remaining_days(now),
    }
}

// ===========================================================================
// Tests
// ===========================================================================

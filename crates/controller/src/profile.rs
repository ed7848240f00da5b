//! Target-condition profile for the current crop cycle.
//!
//! The profile is sourced from the remote `optimum_conditions` table. A
//! fetched record is converted as a whole; if any field is unusable the
//! conversion fails and the caller keeps its previous profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::format_description::well_known::Rfc3339;
use time::macros::{datetime, format_description};
use time::{OffsetDateTime, PrimitiveDateTime};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub crop_name: String,
    pub optimum_temp: f32,
    pub optimum_humidity: f32,
    pub optimum_moisture: f32,
    pub total_days: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            crop_name: "onions".to_string(),
            optimum_temp: 25.0,
            optimum_humidity: 65.0,
            optimum_moisture: 40.0,
            total_days: 30,
            start_date: datetime!(2025-11-28 00:00:00 UTC),
        }
    }
}

/// One row of the remote `optimum_conditions` table, as returned by the
/// REST endpoint. Every field is required; a missing field fails decoding.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProfileRecord {
    pub crop_name: String,
    pub optimum_temp: f32,
    pub optimum_hum: f32,
    pub optimum_moist: f32,
    pub total_days: i64,
    pub start_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// `total_days` was negative or too large.
    InvalidDays(i64),
    /// An optimum value was NaN or infinite.
    NonFinite(&'static str),
    /// `start_date` did not parse as a timestamp.
    InvalidStartDate(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDays(d) => write!(f, "total_days {d} is not a valid day count"),
            Self::NonFinite(field) => write!(f, "{field} is not a finite number"),
            Self::InvalidStartDate(s) => write!(f, "start_date '{s}' is not a timestamp"),
        }
    }
}

impl std::error::Error for ProfileError {}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl TryFrom<ProfileRecord> for Profile {
    type Error = ProfileError;

    fn try_from(r: ProfileRecord) -> Result<Self, Self::Error> {
        let total_days = u32::try_from(r.total_days).map_err(|_| ProfileError::InvalidDays(r.total_days))?;

        for (field, v) in [
            ("optimum_temp", r.optimum_temp),
            ("optimum_hum", r.optimum_hum),
            ("optimum_moist", r.optimum_moist),
        ] {
            if !v.is_finite() {
                return Err(ProfileError::NonFinite(field));
            }
        }

        Ok(Self {
            start_date: parse_start_date(&r.start_date)?,
            crop_name: r.crop_name,
            optimum_temp: r.optimum_temp,
            optimum_humidity: r.optimum_hum,
            optimum_moisture: r.optimum_moist,
            total_days,
        })
    }
}

/// Parse a start date. RFC 3339 is expected (`2025-11-28T00:00:00Z`,
/// `2025-11-28T00:00:00+00:00`); an offset-less timestamp is taken as UTC.
pub fn parse_start_date(s: &str) -> Result<OffsetDateTime, ProfileError> {
    let s = s.trim();
    if let Ok(dt) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(dt);
    }

    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(s, naive)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| ProfileError::InvalidStartDate(s.to_string()))
}

// ---------------------------------------------------------------------------
// Remaining duration
// ---------------------------------------------------------------------------

/// Days left in the crop cycle at `now`.
///
/// Elapsed days are truncated toward zero and never negative, so a start
/// date in the future reports the full cycle and an overrun reports 0.
pub fn remaining_days(total_days: u32, start_date: OffsetDateTime, now: OffsetDateTime) -> u32 {
    let elapsed = (now - start_date).whole_days().max(0);
    let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
    total_days.saturating_sub(elapsed)
}

impl Profile {
    pub fn remaining_days(&self, now: OffsetDateTime) -> u32 {
        remaining_days(self.total_days, self.start_date, now)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

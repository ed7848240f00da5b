//! One instantaneous sensor sample and the probe adapter that produces it.

use garden_probe::{ClimateProbe, MoistureProbe};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorSample {
    /// Degrees Celsius; `None` when the climate probe failed this cycle.
    pub temperature: Option<f32>,
    /// Relative humidity %; `None` when the climate probe failed this cycle.
    pub humidity: Option<f32>,
    /// Soil moisture %, always within [0, 100].
    pub moisture_percent: f32,
}

/// Whole-sample acquisition failure. Partial climate failures are not
/// faults; they surface as `None` fields.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorFault {
    Moisture(String),
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Moisture(e) => write!(f, "moisture probe failed: {e}"),
        }
    }
}

impl std::error::Error for SensorFault {}

/// Source of sensor samples, read once per control cycle.
pub trait SensorPort {
    fn read(&mut self) -> Result<SensorSample, SensorFault>;
}

/// Convert a raw ADC reading to a 0–100 moisture percentage using the
/// probe's dry/wet calibration endpoints. `raw_dry` maps to 0 % and
/// `raw_wet` to 100 %; readings outside the calibration range are clamped.
pub fn moisture_percent(raw: i64, raw_dry: i64, raw_wet: i64) -> f32 {
    let range = raw_dry - raw_wet;
    if range == 0 {
        return 0.0; // degenerate calibration
    }
    let m = (raw_dry - raw) as f64 / range as f64 * 100.0;
    m.clamp(0.0, 100.0) as f32
}

// ---------------------------------------------------------------------------
// Probe adapter
// ---------------------------------------------------------------------------

/// Combines a moisture probe and a climate probe into a [`SensorPort`].
pub struct ProbeSensors<M, C> {
    moisture: M,
    climate: C,
    raw_dry: i64,
    raw_wet: i64,
}

impl<M: MoistureProbe, C: ClimateProbe> ProbeSensors<M, C> {
    pub fn new(moisture: M, climate: C, raw_dry: i64, raw_wet: i64) -> Self {
        Self {
            moisture,
            climate,
            raw_dry,
            raw_wet,
        }
    }
}

impl<M: MoistureProbe, C: ClimateProbe> SensorPort for ProbeSensors<M, C> {
    fn read(&mut self) -> Result<SensorSample, SensorFault> {
        let raw = self
            .moisture
            .read_raw()
            .map_err(|e| SensorFault::Moisture(format!("{e:#}")))?;
        let climate = self.climate.read();

        Ok(SensorSample {
            temperature: climate.temperature_c.filter(|v| v.is_finite()),
            humidity: climate.humidity_pct.filter(|v| v.is_finite()),
            moisture_percent: moisture_percent(raw, self.raw_dry, self.raw_wet),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================

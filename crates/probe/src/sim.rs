//! Stateful sensor simulator for running the controller without hardware.
//!
//! Soil moisture models a capacitive probe:
//! - temporal coherence via random walk with mean reversion
//! - gradual drying drift (evaporation)
//! - per-reading ADC noise and occasional spikes
//! - closed-loop watering response while the relay is on
//!
//! Climate models a DHT-style probe: slow sinusoidal drift around a
//! set-point, small noise, and dropped reads.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{ClimateProbe, ClimateReading, MoistureProbe};

// ---------------------------------------------------------------------------
// Gaussian approximation (no extra dependency)
// ---------------------------------------------------------------------------

/// Irwin-Hall: sum of 12 uniform [0,1) values minus 6 ≈ N(0,1).
fn approx_std_normal() -> f64 {
    let mut sum: f64 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f64();
    }
    sum - 6.0
}

fn gaussian(mean: f64, sigma: f64) -> f64 {
    mean + sigma * approx_std_normal()
}

// ---------------------------------------------------------------------------
// Scenario presets
// ---------------------------------------------------------------------------

/// Simulation profile selected by `[sim] scenario`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Starts mid-range and dries steadily. Moderate noise.
    Drying,
    /// Hovers near the centre with little noise.
    Stable,
    /// High noise and frequent spikes; climate reads drop often.
    Flaky,
    /// Starts near the wet end and dries very slowly.
    Wet,
}

impl Scenario {
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "stable" => Self::Stable,
            "flaky" => Self::Flaky,
            "wet" => Self::Wet,
            _ => Self::Drying,
        }
    }

    /// Probability that one climate value is dropped on a read.
    fn dropout_prob(self) -> f32 {
        match self {
            Self::Flaky => 0.15,
            _ => 0.02,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drying => write!(f, "drying"),
            Self::Stable => write!(f, "stable"),
            Self::Flaky => write!(f, "flaky"),
            Self::Wet => write!(f, "wet"),
        }
    }
}

/// Shared relay flag: the controller's actuator sets it, the simulator reads
/// it to model water reaching the probe.
#[derive(Debug, Clone, Default)]
pub struct WateringFlag(Arc<AtomicBool>);

impl WateringFlag {
    pub fn set(&self, on: bool) {
        self.0.store(on, Ordering::Relaxed);
    }

    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Soil moisture
// ---------------------------------------------------------------------------

/// Simulated soil-moisture probe producing raw ADC counts between the
/// configured dry and wet calibration points.
pub struct SoilMoistureSim {
    base: f64,
    raw_dry: f64,
    raw_wet: f64,
    center: f64,

    drift_per_sample: f64,
    walk_sigma: f64,
    mean_reversion: f64,
    noise_sigma: f64,

    spike_prob: f32,
    spike_sigma: f64,

    wet_rate: f64,
    watering: WateringFlag,
}

impl SoilMoistureSim {
    /// Parameters are expressed as fractions of the calibration range so the
    /// same scenario behaves alike on a 12-bit and a 16-bit ADC.
    pub fn new(scenario: Scenario, raw_dry: f64, raw_wet: f64, watering: WateringFlag) -> Self {
        // Signed: a probe may be wired so that wet reads higher.
        let range = raw_dry - raw_wet;
        let center = (raw_dry + raw_wet) / 2.0;

        // (drift, walk, mean_rev, noise, spike_prob, spike, start_frac)
        // start_frac: 0.0 = at raw_wet, 1.0 = at raw_dry
        let (drift, walk, mean_rev, noise, spike_prob, spike, start_frac) = match scenario {
            Scenario::Drying => (0.0011, 0.011, 0.02, 0.006, 0.03_f32, 0.14, 0.5),
            Scenario::Stable => (0.0001, 0.004, 0.05, 0.003, 0.005, 0.07, 0.5),
            Scenario::Flaky => (0.0007, 0.018, 0.02, 0.014, 0.10, 0.21, 0.5),
            Scenario::Wet => (0.0002, 0.006, 0.02, 0.004, 0.02, 0.11, 0.2),
        };

        let jitter = gaussian(0.0, range.abs() * 0.03);
        let (lo, hi) = ordered(raw_dry, raw_wet);

        Self {
            base: (raw_wet + start_frac * range + jitter).clamp(lo, hi),
            raw_dry,
            raw_wet,
            center,
            drift_per_sample: drift * range,
            walk_sigma: walk * range.abs(),
            mean_reversion: mean_rev,
            noise_sigma: noise * range.abs(),
            spike_prob,
            spike_sigma: spike * range.abs(),
            wet_rate: -0.02 * range,
            watering,
        }
    }

    /// Produce the next raw reading. The internal base evolves on every call.
    pub fn sample(&mut self) -> i64 {
        let pull = self.mean_reversion * (self.center - self.base);
        let walk = gaussian(0.0, self.walk_sigma);
        let wet = if self.watering.get() { self.wet_rate } else { 0.0 };

        let (lo, hi) = ordered(self.raw_dry, self.raw_wet);
        let margin = (hi - lo) * 0.04;
        self.base = (self.base + self.drift_per_sample + pull + walk + wet)
            .clamp(lo - margin, hi + margin);

        let noise = gaussian(0.0, self.noise_sigma);
        let spike = if fastrand::f32() < self.spike_prob {
            gaussian(0.0, self.spike_sigma)
        } else {
            0.0
        };

        // Physically possible ADC range.
        (self.base + noise + spike).round().clamp(0.0, 32767.0) as i64
    }
}

impl MoistureProbe for SoilMoistureSim {
    fn read_raw(&mut self) -> anyhow::Result<i64> {
        Ok(self.sample())
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

// ---------------------------------------------------------------------------
// Climate
// ---------------------------------------------------------------------------

/// Simulated DHT-style temperature/humidity probe.
pub struct ClimateSim {
    tick: u64,
    temp_mean: f64,
    hum_mean: f64,
    dropout_prob: f32,
}

impl ClimateSim {
    /// Samples per simulated day cycle.
    const PERIOD_TICKS: f64 = 720.0;

    pub fn new(scenario: Scenario) -> Self {
        Self {
            tick: 0,
            temp_mean: 25.0,
            hum_mean: 60.0,
            dropout_prob: scenario.dropout_prob(),
        }
    }

    fn value(&self, mean: f64, amplitude: f64, sigma: f64, phase_shift: f64) -> Option<f32> {
        if fastrand::f32() < self.dropout_prob {
            return None;
        }
        let phase = 2.0 * std::f64::consts::PI * self.tick as f64 / Self::PERIOD_TICKS;
        Some((mean + amplitude * (phase + phase_shift).sin() + gaussian(0.0, sigma)) as f32)
    }
}

impl ClimateProbe for ClimateSim {
    fn read(&mut self) -> ClimateReading {
        self.tick = self.tick.wrapping_add(1);
        ClimateReading {
            temperature_c: self.value(self.temp_mean, 4.0, 0.3, 0.0),
            // Humidity falls as the enclosure warms.
            humidity_pct: self
                .value(self.hum_mean, 8.0, 1.0, std::f64::consts::PI)
                .map(|h| h.clamp(0.0, 100.0)),
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sim(scenario: Scenario) -> SoilMoistureSim {
        SoilMoistureSim::new(scenario, 4095.0, 0.0, WateringFlag::default())
    }

    fn mean(sim: &mut SoilMoistureSim, n: usize) -> f64 {
        (0..n).map(|_| sim.sample() as f64).sum::<f64>() / n as f64
    }

    #[test]
    fn readings_within_adc_range() {
        let mut s = sim(Scenario::Flaky);
        for _ in 0..1000 {
            let v = s.sample();
            assert!((0..=32767).contains(&v), "ADC out of range: {v}");
        }
    }

    #[test]
    fn temporal_coherence() {
        let mut s = sim(Scenario::Stable);
        let samples: Vec<i64> = (0..100).map(|_| s.sample()).collect();
        let max_jump = samples.windows(2).map(|w| (w[1] - w[0]).abs()).max().unwrap();
        // Well under the 4095 range, with room for rare spikes.
        assert!(max_jump < 1500, "max consecutive jump too large: {max_jump}");
    }

    #[test]
    fn watering_decreases_readings() {
        let flag = WateringFlag::default();
        let mut s = SoilMoistureSim::new(Scenario::Drying, 4095.0, 0.0, flag.clone());
        for _ in 0..20 {
            s.sample();
        }
        let before = mean(&mut s, 20);

        flag.set(true);
        for _ in 0..50 {
            s.sample();
        }
        let after = mean(&mut s, 20);

        assert!(
            after < before,
            "watering should decrease readings: before={before:.0} after={after:.0}"
        );
    }

    #[test]
    fn wet_scenario_starts_low() {
        let mut s = sim(Scenario::Wet);
        let avg = mean(&mut s, 10);
        assert!(avg < 4095.0 / 2.0, "wet scenario should start below midpoint: {avg:.0}");
    }

    #[test]
    fn inverted_calibration_stays_in_range() {
        let mut s = SoilMoistureSim::new(Scenario::Drying, 12000.0, 26000.0, WateringFlag::default());
        for _ in 0..200 {
            let v = s.sample();
            assert!((0..=32767).contains(&v));
        }
    }

    #[test]
    fn climate_values_are_plausible() {
        let mut c = ClimateSim::new(Scenario::Stable);
        let mut seen_temp = 0;
        for _ in 0..500 {
            let r = c.read();
            if let Some(t) = r.temperature_c {
                seen_temp += 1;
                assert!((10.0..40.0).contains(&t), "temperature {t}");
            }
            if let Some(h) = r.humidity_pct {
                assert!((0.0..=100.0).contains(&h), "humidity {h}");
            }
        }
        assert!(seen_temp > 400, "too many dropped reads: {seen_temp}/500");
    }

    #[test]
    fn flaky_climate_drops_reads() {
        let mut c = ClimateSim::new(Scenario::Flaky);
        let dropped = (0..500).filter(|_| c.read().temperature_c.is_none()).count();
        assert!(dropped > 0, "flaky scenario should drop some reads");
    }

    #[test]
    fn scenario_from_str_lossy() {
        assert_eq!(Scenario::from_str_lossy("drying"), Scenario::Drying);
        assert_eq!(Scenario::from_str_lossy("STABLE"), Scenario::Stable);
        assert_eq!(Scenario::from_str_lossy("Flaky"), Scenario::Flaky);
        assert_eq!(Scenario::from_str_lossy("wet"), Scenario::Wet);
        assert_eq!(Scenario::from_str_lossy(""), Scenario::Drying);
    }

    #[test]
    fn scenario_display() {
        assert_eq!(Scenario::Drying.to_string(), "drying");
        assert_eq!(Scenario::Wet.to_string(), "wet");
    }

    #[test]
    fn approx_std_normal_has_zero_mean() {
        let n = 5000;
        let m = (0..n).map(|_| approx_std_normal()).sum::<f64>() / n as f64;
        assert!(m.abs() < 0.15, "approx_std_normal mean should be near zero: {m}");
    }
}

//! Climate probe backed by the Linux IIO DHT11/DHT22 driver.
//!
//! With the `dht11` device-tree overlay loaded the kernel exposes the sensor
//! under `/sys/bus/iio/devices/iio:deviceN/`:
//!
//! - `in_temp_input`: milli-degrees Celsius
//! - `in_humidityrelative_input`: milli-percent relative humidity
//!
//! The driver returns `EIO`/`ETIMEDOUT` on a failed handshake, which is
//! frequent for DHT sensors; such reads surface as `None`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{ClimateProbe, ClimateReading};

const TEMP_FILE: &str = "in_temp_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

pub struct IioClimate {
    dir: PathBuf,
}

impl IioClimate {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        tracing::info!(dir = %dir.display(), "iio climate probe configured");
        Self { dir }
    }

    fn read_milli(&self, file: &str) -> Option<f32> {
        read_milli_value(&self.dir.join(file))
    }
}

impl ClimateProbe for IioClimate {
    fn read(&mut self) -> ClimateReading {
        ClimateReading {
            temperature_c: self.read_milli(TEMP_FILE),
            humidity_pct: self.read_milli(HUMIDITY_FILE),
        }
    }
}

/// Parse a sysfs milli-unit value (e.g. `"23400\n"` → `23.4`).
fn read_milli_value(path: &Path) -> Option<f32> {
    let raw = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::debug!(path = %path.display(), "climate read failed: {e}");
            return None;
        }
    };
    match raw.trim().parse::<i64>() {
        Ok(milli) => Some(milli as f32 / 1000.0),
        Err(_) => {
            tracing::debug!(path = %path.display(), value = raw.trim(), "climate value not numeric");
            None
        }
    }
}

/// Climate probe for builds without any climate hardware: every read is
/// unavailable.
pub struct NoClimate;

impl ClimateProbe for NoClimate {
    fn read(&mut self) -> ClimateReading {
        ClimateReading::default()
    }
}

// ===========================================================================
// Tests
// ===========================================================================

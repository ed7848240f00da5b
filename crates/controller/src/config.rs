//! TOML config file loading, environment overrides, and validation.
//!
//! Every section is optional. Values from the file are overridden by the
//! environment (`SUPABASE_URL`, `SUPABASE_KEY`, `GARDEN_ID`,
//! `RELAY_ACTIVE_LOW`, `WEB_PORT`) before validation runs.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::profile::{parse_start_date, Profile};

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteSection,
    pub network: NetworkSection,
    pub relay: RelaySection,
    pub moisture: MoistureSection,
    pub climate: ClimateSection,
    pub sim: SimSection,
    pub profile: ProfileSection,
    pub web: WebSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteSection {
    pub base_url: String,
    pub api_key: String,
    pub garden_id: String,
    pub timeout_sec: u64,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            garden_id: String::new(),
            timeout_sec: 10,
        }
    }
}

impl RemoteSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_sec)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    /// Interface whose operstate gates remote calls. Unset: always up.
    pub interface: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelaySection {
    pub gpio_pin: i64,
    pub active_low: bool,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            gpio_pin: 26,
            active_low: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MoistureSection {
    /// Raw reading of a dry probe (0 %).
    pub raw_dry: i64,
    /// Raw reading of a saturated probe (100 %).
    pub raw_wet: i64,
    pub adc_addr: u16,
    pub adc_channel: u8,
}

impl Default for MoistureSection {
    fn default() -> Self {
        Self {
            raw_dry: 4095,
            raw_wet: 0,
            adc_addr: 0x48,
            adc_channel: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClimateSection {
    /// sysfs directory of the DHT11/DHT22 IIO device.
    pub iio_device: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimSection {
    pub scenario: String,
}

impl Default for SimSection {
    fn default() -> Self {
        Self {
            scenario: "drying".to_string(),
        }
    }
}

/// Start-up profile, used until the first successful fetch.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ProfileSection {
    pub crop_name: String,
    pub optimum_temp: f32,
    pub optimum_humidity: f32,
    pub optimum_moisture: f32,
    pub total_days: u32,
    pub start_date: String,
}

impl Default for ProfileSection {
    fn default() -> Self {
        let p = Profile::default();
        Self {
            crop_name: p.crop_name,
            optimum_temp: p.optimum_temp,
            optimum_humidity: p.optimum_humidity,
            optimum_moisture: p.optimum_moisture,
            total_days: p.total_days,
            start_date: "2025-11-28T00:00:00Z".to_string(),
        }
    }
}

impl ProfileSection {
    pub fn to_profile(&self) -> Result<Profile> {
        let start_date = parse_start_date(&self.start_date)
            .with_context(|| format!("profile start_date {:?}", self.start_date))?;
        Ok(Profile {
            crop_name: self.crop_name.clone(),
            optimum_temp: self.optimum_temp,
            optimum_humidity: self.optimum_humidity,
            optimum_moisture: self.optimum_moisture,
            total_days: self.total_days,
            start_date,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WebSection {
    pub enabled: bool,
    pub port: u16,
}

impl Default for WebSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM.
const VALID_GPIO_PINS: std::ops::RangeInclusive<i64> = 2..=27;

/// Maximum single-ended reading from the ADS1115 (15-bit unsigned).
const ADS1115_MAX: i64 = 32767;

const MAX_ADC_CHANNEL: u8 = 3;

// ---------------------------------------------------------------------------
// Environment overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Apply environment overrides. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SUPABASE_URL") {
            self.remote.base_url = v;
        }
        if let Some(v) = lookup("SUPABASE_KEY") {
            self.remote.api_key = v;
        }
        if let Some(v) = lookup("GARDEN_ID") {
            self.remote.garden_id = v;
        }
        if let Some(v) = lookup("RELAY_ACTIVE_LOW") {
            self.relay.active_low = parse_flag(&v)
                .with_context(|| format!("RELAY_ACTIVE_LOW: expected a boolean, got {v:?}"))?;
        }
        if let Some(v) = lookup("WEB_PORT") {
            self.web.port = v
                .trim()
                .parse()
                .with_context(|| format!("WEB_PORT: expected a port number, got {v:?}"))?;
        }
        Ok(())
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate the whole config. Returns `Ok(())` or an error describing
    /// every violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        self.validate_remote(&mut errors);
        self.validate_hardware(&mut errors);
        self.validate_profile(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    fn validate_remote(&self, errors: &mut Vec<String>) {
        let r = &self.remote;
        if r.base_url.trim().is_empty() {
            errors.push("remote.base_url is empty (set SUPABASE_URL)".into());
        } else if !r.base_url.starts_with("http://") && !r.base_url.starts_with("https://") {
            errors.push(format!("remote.base_url {:?} is not an http(s) URL", r.base_url));
        }
        if r.api_key.trim().is_empty() {
            errors.push("remote.api_key is empty (set SUPABASE_KEY)".into());
        }
        if r.garden_id.trim().is_empty() {
            errors.push("remote.garden_id is empty (set GARDEN_ID)".into());
        }
        if r.timeout_sec == 0 {
            errors.push("remote.timeout_sec must be positive".into());
        }
    }

    fn validate_hardware(&self, errors: &mut Vec<String>) {
        // ── GPIO pin whitelist ──────────────────────────────
        if !VALID_GPIO_PINS.contains(&self.relay.gpio_pin) {
            errors.push(format!(
                "relay.gpio_pin {} is not a valid BCM GPIO pin (allowed: 2-27)",
                self.relay.gpio_pin
            ));
        }

        // ── ADC calibration bounds ──────────────────────────
        let m = &self.moisture;
        for (name, raw) in [("raw_dry", m.raw_dry), ("raw_wet", m.raw_wet)] {
            if !(0..=ADS1115_MAX).contains(&raw) {
                errors.push(format!(
                    "moisture.{name} {raw} out of ADS1115 range [0, {ADS1115_MAX}]"
                ));
            }
        }
        if m.raw_dry == m.raw_wet {
            errors.push(format!(
                "moisture.raw_dry and raw_wet are both {}: calibration range is zero",
                m.raw_dry
            ));
        }
        if m.adc_channel > MAX_ADC_CHANNEL {
            errors.push(format!(
                "moisture.adc_channel {} out of range [0, {MAX_ADC_CHANNEL}]",
                m.adc_channel
            ));
        }
    }

    fn validate_profile(&self, errors: &mut Vec<String>) {
        let p = &self.profile;
        if p.crop_name.trim().is_empty() {
            errors.push("profile.crop_name is empty".into());
        }
        for (name, v) in [
            ("optimum_temp", p.optimum_temp),
            ("optimum_humidity", p.optimum_humidity),
            ("optimum_moisture", p.optimum_moisture),
        ] {
            if !v.is_finite() {
                errors.push(format!("profile.{name} must be finite, got {v}"));
            }
        }
        if parse_start_date(&p.start_date).is_err() {
            errors.push(format!(
                "profile.start_date {:?} is not an ISO-8601 timestamp",
                p.start_date
            ));
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read and parse a TOML config file, apply environment overrides, and
/// validate. A missing file yields the defaults.
pub fn load(path: &Path) -> Result<Config> {
    load_with(path, |key| std::env::var(key).ok())
}

fn load_with<F>(path: &Path, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config: Config = if path.exists() {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))?
    } else {
        info!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };

    config.apply_overrides(lookup)?;
    config
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================

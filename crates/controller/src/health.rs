//! Plant health score shown on the dashboard.
//!
//! Each of moisture, humidity and temperature contributes up to a quarter
//! of the score. Temperature is scored against an 18–26 °C window and its
//! term is not clamped, so the score is unbounded outside 0 to 75 when
//! temperature leaves that window.

use serde::Serialize;
use std::fmt;

use crate::sample::SensorSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLabel {
    Critical,
    Poor,
    Fair,
    Good,
}

impl HealthLabel {
    pub fn for_score(score: f32) -> Self {
        if score < 25.0 {
            Self::Critical
        } else if score < 50.0 {
            Self::Poor
        } else if score < 75.0 {
            Self::Fair
        } else {
            Self::Good
        }
    }
}

impl fmt::Display for HealthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::Poor => "poor",
            Self::Fair => "fair",
            Self::Good => "good",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Health {
    pub score: f32,
    pub label: HealthLabel,
}

pub fn score(moisture: f32, humidity: f32, temperature: f32) -> f32 {
    moisture / 100.0 * 25.0 + humidity / 100.0 * 25.0 + (temperature - 18.0) / 8.0 * 25.0
}

/// `None` when the climate probe produced no reading this cycle.
pub fn assess(sample: &SensorSample) -> Option<Health> {
    let (t, h) = (sample.temperature?, sample.humidity?);
    let score = score(sample.moisture_percent, h, t);
    Some(Health {
        score,
        label: HealthLabel::for_score(score),
    })
}

//! Closed-loop controller for a single growing enclosure.
//!
//! Every cycle the controller samples the probes, evaluates the sample
//! against the crop profile, drives the irrigation relay through a
//! hysteresis band, and syncs telemetry and profile with the remote store.

pub mod actuation;
pub mod clock;
pub mod config;
pub mod control;
pub mod decision;
pub mod health;
pub mod link;
pub mod profile;
pub mod remote;
pub mod sample;
pub mod state;
pub mod sync;
pub mod valve;
pub mod web;

#[cfg(test)]
mod testing;

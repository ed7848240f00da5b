//! Property tests for the control policy: hysteresis band, moisture
//! rescale, remaining-days arithmetic, and status rendering.

use garden_controller::actuation::{next_state, ActuationState};
use garden_controller::decision::{evaluate, WITHIN_RANGE};
use garden_controller::profile::{remaining_days, Profile};
use garden_controller::sample::{moisture_percent, SensorSample};
use proptest::prelude::*;
use time::macros::datetime;
use time::Duration;

fn profile_with_moisture(opt: f32) -> Profile {
    Profile {
        optimum_moisture: opt,
        ..Profile::default()
    }
}

fn any_state() -> impl Strategy<Value = ActuationState> {
    prop_oneof![Just(ActuationState::Off), Just(ActuationState::On)]
}

// ── Hysteresis ───────────────────────────────────────────────

proptest! {
    /// Inside the dead-band the relay never changes state.
    #[test]
    fn inside_band_holds_state(
        opt in 5.0f32..95.0,
        delta in -2.99f32..2.99,
        current in any_state(),
    ) {
        let p = profile_with_moisture(opt);
        prop_assert_eq!(next_state(opt + delta, &p, current), current);
    }

    #[test]
    fn below_band_is_on(opt in 5.0f32..95.0, delta in 3.01f32..100.0, current in any_state()) {
        let p = profile_with_moisture(opt);
        prop_assert_eq!(next_state(opt - delta, &p, current), ActuationState::On);
    }

    #[test]
    fn above_band_is_off(opt in 5.0f32..95.0, delta in 3.01f32..100.0, current in any_state()) {
        let p = profile_with_moisture(opt);
        prop_assert_eq!(next_state(opt + delta, &p, current), ActuationState::Off);
    }

    /// Replaying the same reading is idempotent.
    #[test]
    fn repeated_reading_is_stable(opt in 5.0f32..95.0, m in 0.0f32..100.0, current in any_state()) {
        let p = profile_with_moisture(opt);
        let once = next_state(m, &p, current);
        prop_assert_eq!(next_state(m, &p, once), once);
    }
}

// ── Moisture rescale ─────────────────────────────────────────

proptest! {
    #[test]
    fn moisture_always_within_bounds(
        raw in -100_000i64..100_000,
        dry in 0i64..32_768,
        wet in 0i64..32_768,
    ) {
        let m = moisture_percent(raw, dry, wet);
        prop_assert!((0.0..=100.0).contains(&m), "got {m}");
    }

    /// Wetter soil (lower raw count) never reads drier.
    #[test]
    fn moisture_inverted_and_monotone(
        a in 0i64..32_768,
        b in 0i64..32_768,
        wet in 0i64..1_000,
        span in 1i64..30_000,
    ) {
        let dry = wet + span;
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(moisture_percent(lo, dry, wet) >= moisture_percent(hi, dry, wet));
    }
}

// ── Remaining days ───────────────────────────────────────────

proptest! {
    #[test]
    fn remaining_days_bounded_and_non_increasing(
        total in 0u32..400,
        t1 in -1_000_000i64..50_000_000,
        step in 0i64..10_000_000,
    ) {
        let start = datetime!(2026-01-01 00:00 UTC);
        let now1 = start + Duration::seconds(t1);
        let now2 = now1 + Duration::seconds(step);

        let r1 = remaining_days(total, start, now1);
        let r2 = remaining_days(total, start, now2);
        prop_assert!(r1 <= total);
        prop_assert!(r2 <= r1);
    }
}

// ── Status text ──────────────────────────────────────────────

proptest! {
    #[test]
    fn all_in_band_is_within_range(
        dt in -3.0f32..=3.0,
        dh in -3.0f32..=3.0,
        dm in -3.0f32..=3.0,
    ) {
        let p = Profile::default();
        let sample = SensorSample {
            temperature: Some(p.optimum_temp + dt),
            humidity: Some(p.optimum_humidity + dh),
            moisture_percent: p.optimum_moisture + dm,
        };
        let report = evaluate(&sample, &p, datetime!(2025-12-01 00:00 UTC));
        prop_assert_eq!(report.text(), WITHIN_RANGE);
    }
}

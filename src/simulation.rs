//! Synthetic telemetry for exercising the detector end to end.

use chrono::{DateTime, FixedOffset, TimeDelta};
use parking::TelemetrySample;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Metres per degree of latitude on the haversine sphere.
const METERS_PER_DEGREE: f64 = 111_194.93;

/// `minutes + 1` fixes, one minute apart from `start`, each scattered up to
/// `jitter` metres north or east of `base`.
#[must_use]
pub fn dwell(
    vehicle_id: &str, route_id: Option<i64>, minutes: u32, base: (f64, f64),
    start: DateTime<FixedOffset>, jitter: f64, seed: u64,
) -> Vec<TelemetrySample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = jitter.abs();
    let (latitude, longitude) = base;
    let lng_scale = METERS_PER_DEGREE * latitude.to_radians().cos();

    (0..=minutes)
        .map(|minute| {
            let north = rng.gen_range(-jitter..=jitter);
            let east = rng.gen_range(-jitter..=jitter);
            TelemetrySample {
                vehicle_id: vehicle_id.to_string(),
                route_id,
                latitude: latitude + north / METERS_PER_DEGREE,
                longitude: longitude + east / lng_scale,
                timestamp: start + TimeDelta::minutes(i64::from(minute)),
                speed: None,
            }
        })
        .collect()
}

/// A fix `meters` north of `last`, one minute later.
#[must_use]
pub fn departure(last: &TelemetrySample, meters: f64) -> TelemetrySample {
    TelemetrySample {
        latitude: last.latitude + meters / METERS_PER_DEGREE,
        timestamp: last.timestamp + TimeDelta::minutes(1),
        ..last.clone()
    }
}

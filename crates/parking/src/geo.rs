//! Great-circle distance and speed helpers.

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Haversine distance in metres between two points given in decimal degrees.
#[must_use]
pub fn distance_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Average speed in km/h over `elapsed_millis`.
///
/// Returns 0 when no time has elapsed or the timestamps are out of order.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn speed_kmh(distance_meters: f64, elapsed_millis: i64) -> f64 {
    if elapsed_millis <= 0 {
        return 0.0;
    }
    distance_meters / 1000.0 / (elapsed_millis as f64 / MILLIS_PER_HOUR)
}

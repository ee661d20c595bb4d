//! Telemetry, configuration and parking event types.

use chrono::{DateTime, FixedOffset};
use realtime::{Error, Result, malformed};
use serde::{Deserialize, Serialize};

/// A location message as decoded from the transport.
///
/// Every field is optional so that a partially populated message can be
/// rejected with a useful reason instead of failing deserialization outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    #[serde(default)]
    pub vehicle_id: Option<String>,
    #[serde(default)]
    pub route_id: Option<i64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    /// Instantaneous speed reported by the device, km/h.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl TryFrom<&[u8]> for TelemetryMessage {
    type Error = Error;

    fn try_from(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload).map_err(Into::into)
    }
}

/// A validated GPS fix for one vehicle.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub vehicle_id: String,
    pub route_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<FixedOffset>,
    pub speed: Option<f64>,
}

impl TelemetrySample {
    /// Checks the vehicle id is present and every number is finite and in range.
    ///
    /// # Errors
    ///
    /// Returns `MalformedInput` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let vehicle_id = &self.vehicle_id;
        if vehicle_id.trim().is_empty() {
            return Err(malformed!("missing vehicleId"));
        }
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(malformed!("latitude {} out of range for {}", self.latitude, vehicle_id));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(malformed!("longitude {} out of range for {}", self.longitude, vehicle_id));
        }
        if let Some(speed) = self.speed
            && (!speed.is_finite() || speed < 0.0)
        {
            return Err(malformed!("invalid speed {} for {}", speed, vehicle_id));
        }
        Ok(())
    }
}

impl TryFrom<TelemetryMessage> for TelemetrySample {
    type Error = Error;

    fn try_from(message: TelemetryMessage) -> Result<Self> {
        let vehicle_id = message
            .vehicle_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| malformed!("missing vehicleId"))?;
        let Some(latitude) = message.latitude else {
            return Err(malformed!("missing latitude for {}", vehicle_id));
        };
        let Some(longitude) = message.longitude else {
            return Err(malformed!("missing longitude for {}", vehicle_id));
        };
        let Some(timestamp) = message.timestamp else {
            return Err(malformed!("missing timestamp for {}", vehicle_id));
        };

        let sample = Self {
            vehicle_id,
            route_id: message.route_id,
            latitude,
            longitude,
            timestamp,
            speed: message.speed,
        };
        sample.validate()?;
        Ok(sample)
    }
}

/// Dwell thresholds applicable to a company's vehicles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingConfig {
    pub company_id: u64,
    pub min_time_minutes: u32,
    pub max_distance_meters: f64,
    pub max_speed_kmh: f64,
    pub is_active: bool,
}

impl ParkingConfig {
    /// Checks the thresholds are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigUnavailable` when any threshold is zero, negative or not
    /// a number.
    pub fn validate(&self) -> Result<()> {
        if self.min_time_minutes == 0 {
            return Err(Error::ConfigUnavailable(format!(
                "company {}: minTimeMinutes must be at least 1",
                self.company_id
            )));
        }
        if !(self.max_distance_meters.is_finite() && self.max_distance_meters > 0.0) {
            return Err(Error::ConfigUnavailable(format!(
                "company {}: maxDistanceMeters must be positive",
                self.company_id
            )));
        }
        if !(self.max_speed_kmh.is_finite() && self.max_speed_kmh > 0.0) {
            return Err(Error::ConfigUnavailable(format!(
                "company {}: maxSpeedKmh must be positive",
                self.company_id
            )));
        }
        Ok(())
    }

    /// The stationary predicate: close to the previous fix and slow.
    #[must_use]
    pub fn is_parked(&self, distance_meters: f64, speed_kmh: f64) -> bool {
        distance_meters <= self.max_distance_meters && speed_kmh <= self.max_speed_kmh
    }

    /// The dwell threshold in seconds.
    #[must_use]
    pub fn min_time_secs(&self) -> i64 {
        i64::from(self.min_time_minutes) * 60
    }
}

/// Lifecycle of a parking event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParkingStatus {
    Active,
    Ended,
}

/// A period during which a vehicle stayed parked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingEvent {
    /// Assigned by the event store on first save.
    pub id: Option<u64>,
    pub vehicle_id: String,
    pub driver_id: Option<u64>,
    pub route_id: Option<i64>,
    pub started_at: DateTime<FixedOffset>,
    pub ended_at: Option<DateTime<FixedOffset>>,
    pub total_duration_minutes: Option<i64>,
    pub final_latitude: f64,
    pub final_longitude: f64,
    pub is_active: bool,
}

impl ParkingEvent {
    /// A new, unsaved, open event located at `sample`.
    #[must_use]
    pub fn open(sample: &TelemetrySample, started_at: DateTime<FixedOffset>) -> Self {
        Self {
            id: None,
            vehicle_id: sample.vehicle_id.clone(),
            driver_id: None,
            route_id: sample.route_id,
            started_at,
            ended_at: None,
            total_duration_minutes: None,
            final_latitude: sample.latitude,
            final_longitude: sample.longitude,
            is_active: true,
        }
    }

    /// Close the event at `sample`, the first fix showing movement.
    pub fn close(&mut self, sample: &TelemetrySample) {
        let ended_at = sample.timestamp;
        self.total_duration_minutes = Some((ended_at - self.started_at).num_minutes());
        self.ended_at = Some(ended_at);
        self.final_latitude = sample.latitude;
        self.final_longitude = sample.longitude;
        self.is_active = false;
    }

    #[must_use]
    pub const fn status(&self) -> ParkingStatus {
        if self.is_active { ParkingStatus::Active } else { ParkingStatus::Ended }
    }
}

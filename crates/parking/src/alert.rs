//! Live parking alerts.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::types::ParkingEvent;

/// The transition an alert announces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    /// The vehicle stayed still for longer than the configured dwell time.
    VehicleParked,

    /// A parked vehicle started moving again.
    VehicleResumed,
}

impl AlertKind {
    /// Human readable text sent alongside the alert.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::VehicleParked => "Vehicle parked for longer than the allowed time",
            Self::VehicleResumed => "Vehicle resumed its route",
        }
    }
}

/// Alert broadcast to live subscribers on every detected transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParkingAlert {
    pub id: Option<u64>,
    pub vehicle_id: String,
    pub driver_id: Option<u64>,
    pub route_id: Option<i64>,
    pub started_at: DateTime<FixedOffset>,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

impl ParkingAlert {
    #[must_use]
    pub fn new(kind: AlertKind, event: &ParkingEvent) -> Self {
        Self {
            id: event.id,
            vehicle_id: event.vehicle_id.clone(),
            driver_id: event.driver_id,
            route_id: event.route_id,
            started_at: event.started_at,
            kind,
            message: kind.message().to_string(),
        }
    }
}

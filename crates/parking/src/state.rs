//! Per-vehicle tracking state.
//!
//! State lives in a concurrent index of vehicle id to handle, each handle
//! guarded by its own mutex. The store hands out handles and never locks a
//! handle itself: callers hold the handle's lock for the whole
//! read-modify-write of one sample.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeDelta};
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::types::{ParkingEvent, TelemetrySample};

/// A handle to one vehicle's tracking state.
pub type StateHandle = Arc<Mutex<VehicleTrackingState>>;

/// The last known position of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<FixedOffset>,
}

impl From<&TelemetrySample> for Fix {
    fn from(sample: &TelemetrySample) -> Self {
        Self { latitude: sample.latitude, longitude: sample.longitude, timestamp: sample.timestamp }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleTrackingState {
    pub last_fix: Option<Fix>,
    pub accumulated_parked_secs: i64,
    /// When the current run of stationary fixes began.
    pub parked_since: Option<DateTime<FixedOffset>>,
    pub active_event_id: Option<u64>,
    /// The fix that ended the open event, held while closing it keeps failing.
    pub pending_close: Option<TelemetrySample>,
}

impl VehicleTrackingState {
    /// Add a stationary interval that began at `since`.
    pub fn dwell(&mut self, since: DateTime<FixedOffset>, elapsed: TimeDelta) {
        self.parked_since.get_or_insert(since);
        self.accumulated_parked_secs += elapsed.num_seconds().max(0);
    }

    /// Clear the dwell accumulator after movement.
    pub fn reset_dwell(&mut self) {
        self.accumulated_parked_secs = 0;
        self.parked_since = None;
    }

    /// Seed state from an event left open in the store.
    pub fn resume(&mut self, event: &ParkingEvent) {
        self.active_event_id = event.id;
        self.parked_since = Some(event.started_at);
        self.last_fix = Some(Fix {
            latitude: event.final_latitude,
            longitude: event.final_longitude,
            timestamp: event.started_at,
        });
    }
}

#[derive(Debug, Clone, Default)]
pub struct VehicleStateStore {
    inner: Arc<DashMap<String, StateHandle>>,
}

impl VehicleStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the vehicle's handle, creating zeroed state on first access.
    #[must_use]
    pub fn get_or_create(&self, vehicle_id: &str) -> StateHandle {
        if let Some(handle) = self.inner.get(vehicle_id) {
            return Arc::clone(handle.value());
        }
        let entry = self
            .inner
            .entry(vehicle_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VehicleTrackingState::default())));
        Arc::clone(entry.value())
    }

    #[must_use]
    pub fn get(&self, vehicle_id: &str) -> Option<StateHandle> {
        self.inner.get(vehicle_id).map(|handle| Arc::clone(handle.value()))
    }

    /// A copy of the vehicle's current state, if it has been observed.
    pub async fn snapshot(&self, vehicle_id: &str) -> Option<VehicleTrackingState> {
        let handle = self.get(vehicle_id)?;
        let state = handle.lock().await;
        Some(state.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

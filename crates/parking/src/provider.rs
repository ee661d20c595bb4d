//! # Provider
//!
//! Collaborators the detector calls out to. The host application implements
//! these against its own storage and broadcast infrastructure.

use anyhow::Result;
pub use realtime::{Message, Publisher};

use crate::types::{ParkingConfig, ParkingEvent};

/// Resolves the dwell thresholds that apply to a vehicle.
pub trait ConfigProvider: Send + Sync {
    /// Resolve the config for `vehicle_id`, if any.
    ///
    /// Called for every sample so that config changes take effect immediately.
    fn resolve(
        &self, vehicle_id: &str,
    ) -> impl Future<Output = Result<Option<ParkingConfig>>> + Send;
}

/// Persists parking events.
pub trait EventStore: Send + Sync {
    /// Insert or update an event, assigning an id on first save.
    fn save(&self, event: ParkingEvent) -> impl Future<Output = Result<ParkingEvent>> + Send;

    fn find_by_id(&self, id: u64) -> impl Future<Output = Result<Option<ParkingEvent>>> + Send;

    /// The vehicle's open event, if any.
    fn find_active(
        &self, vehicle_id: &str,
    ) -> impl Future<Output = Result<Option<ParkingEvent>>> + Send;

    /// Every open event, across all vehicles.
    fn active_events(&self) -> impl Future<Output = Result<Vec<ParkingEvent>>> + Send;
}

/// Provider entry point implemented by the host application.
pub trait Provider: ConfigProvider + EventStore + Publisher {}

impl<T> Provider for T where T: ConfigProvider + EventStore + Publisher {}

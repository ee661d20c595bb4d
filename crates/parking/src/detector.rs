//! Parking detection state machine.
//!
//! Each vehicle cycles independently between moving (no dwell, no open
//! event) and dwelling (accumulating stationary time, with an open event once
//! the configured threshold is reached). A vehicle's first fix only seeds its
//! state.

use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use realtime::{Error, Message, Publisher};
use tracing::{debug, error, info, warn};

use crate::alert::{AlertKind, ParkingAlert};
use crate::config::Config;
use crate::geo;
use crate::provider::{ConfigProvider, EventStore, Provider};
use crate::state::{Fix, VehicleStateStore, VehicleTrackingState};
use crate::types::{ParkingConfig, ParkingEvent, TelemetrySample};

/// What processing a single sample did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Dropped without touching state: malformed, or no active config.
    Skipped,
    /// The vehicle's first fix; nothing to compare against yet.
    FirstFix,
    /// The vehicle moved.
    Moving,
    /// The vehicle is stationary; `accumulated_secs` of dwell so far.
    Dwelling { accumulated_secs: i64 },
    /// A parking event was opened.
    Parked(ParkingEvent),
    /// The open parking event was closed.
    Resumed(ParkingEvent),
}

#[derive(Debug, Clone)]
pub struct ParkingDetector<P: Provider> {
    provider: P,
    state: VehicleStateStore,
    config: Arc<Config>,
}

impl<P: Provider> ParkingDetector<P> {
    #[must_use]
    pub fn new(provider: P, config: Config) -> Self {
        Self { provider, state: VehicleStateStore::new(), config: Arc::new(config) }
    }

    /// The detector's tracking state.
    #[must_use]
    pub const fn state(&self) -> &VehicleStateStore {
        &self.state
    }

    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Seed tracking state from events left open in the store, so a restart
    /// resumes in-flight parking periods instead of orphaning them.
    ///
    /// # Errors
    ///
    /// Returns an error when the open events cannot be loaded.
    pub async fn restore(&self) -> anyhow::Result<usize> {
        let events = EventStore::active_events(&self.provider)
            .await
            .context("loading open parking events")?;

        for event in &events {
            let handle = self.state.get_or_create(&event.vehicle_id);
            handle.lock().await.resume(event);
            debug!(vehicle_id = %event.vehicle_id, event_id = ?event.id, "resumed open parking event");
        }

        info!(count = events.len(), "restored open parking events");
        Ok(events.len())
    }

    /// Process one sample.
    ///
    /// Never fails: invalid samples are dropped without touching state, and
    /// collaborator failures are logged while tracking state still advances
    /// so later samples are judged against the latest fix.
    pub async fn process(&self, sample: &TelemetrySample) -> Outcome {
        if let Err(err) = sample.validate() {
            warn!(monotonic_counter.processing_errors = 1, code = err.code(), error = %err, "dropping telemetry");
            return Outcome::Skipped;
        }

        let Some(config) = self.resolve_config(&sample.vehicle_id).await else {
            return Outcome::Skipped;
        };

        let handle = self.state.get_or_create(&sample.vehicle_id);
        let mut state = handle.lock().await;
        let outcome = self.advance(&mut state, sample, &config).await;
        drop(state);

        debug!(
            monotonic_counter.samples_processed = 1,
            vehicle_id = %sample.vehicle_id,
            outcome = ?outcome,
            "processed telemetry"
        );
        outcome
    }

    async fn resolve_config(&self, vehicle_id: &str) -> Option<ParkingConfig> {
        let config = match ConfigProvider::resolve(&self.provider, vehicle_id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                debug!(vehicle_id, "no parking config for vehicle");
                return None;
            }
            Err(err) => {
                let err = Error::ConfigUnavailable(format!("{err:#}"));
                warn!(vehicle_id, code = err.code(), error = %err, "resolving parking config");
                return None;
            }
        };

        if !config.is_active {
            debug!(vehicle_id, company_id = config.company_id, "parking detection disabled");
            return None;
        }
        if let Err(err) = config.validate() {
            warn!(vehicle_id, code = err.code(), error = %err, "ignoring unusable parking config");
            return None;
        }
        Some(config)
    }

    async fn advance(
        &self, state: &mut VehicleTrackingState, sample: &TelemetrySample, config: &ParkingConfig,
    ) -> Outcome {
        let Some(prev) = state.last_fix.replace(Fix::from(sample)) else {
            debug!(vehicle_id = %sample.vehicle_id, "first fix for vehicle");
            return Outcome::FirstFix;
        };

        let distance =
            geo::distance_meters(prev.latitude, prev.longitude, sample.latitude, sample.longitude);
        let elapsed = sample.timestamp - prev.timestamp;
        let computed = geo::speed_kmh(distance, elapsed.num_milliseconds());
        let speed = sample.speed.map_or(computed, |reported| reported.max(computed));

        if !config.is_parked(distance, speed) {
            state.reset_dwell();
            if state.active_event_id.is_none() {
                return Outcome::Moving;
            }
            // a close that failed earlier ends the event where movement was first seen
            let departure = state.pending_close.take().unwrap_or_else(|| sample.clone());
            let closed = self.close_event(state, &departure).await;
            return closed.map_or(Outcome::Moving, Outcome::Resumed);
        }

        state.dwell(prev.timestamp, elapsed);
        let accumulated_secs = state.accumulated_parked_secs;

        if let Some(departure) = state.pending_close.take()
            && let Some(event) = self.close_event(state, &departure).await
        {
            return Outcome::Resumed(event);
        }

        if state.active_event_id.is_some() || accumulated_secs < config.min_time_secs() {
            return Outcome::Dwelling { accumulated_secs };
        }

        let started_at = state.parked_since.unwrap_or(prev.timestamp);
        match self.open_event(sample, started_at, config).await {
            Some(event) => {
                state.active_event_id = event.id;
                Outcome::Parked(event)
            }
            None => Outcome::Dwelling { accumulated_secs },
        }
    }

    async fn open_event(
        &self, sample: &TelemetrySample, started_at: DateTime<FixedOffset>, config: &ParkingConfig,
    ) -> Option<ParkingEvent> {
        let vehicle_id = &sample.vehicle_id;

        // an event may already be open in the store (e.g. opened before a restart)
        match EventStore::find_active(&self.provider, vehicle_id).await {
            Ok(Some(existing)) => {
                info!(vehicle_id = %vehicle_id, event_id = ?existing.id, "adopting open parking event");
                return Some(existing);
            }
            Ok(None) => {}
            Err(err) => {
                let err = Error::persistence(&err);
                error!(vehicle_id = %vehicle_id, code = err.code(), error = %err, "checking for open parking event");
                return None;
            }
        }

        let event = ParkingEvent::open(sample, started_at);
        let saved = match EventStore::save(&self.provider, event).await {
            Ok(saved) => saved,
            Err(err) => {
                let err = Error::persistence(&err);
                error!(
                    monotonic_counter.processing_errors = 1,
                    vehicle_id = %vehicle_id,
                    code = err.code(),
                    error = %err,
                    "saving parking event"
                );
                return None;
            }
        };

        info!(
            monotonic_counter.parking_events_opened = 1,
            vehicle_id = %vehicle_id,
            route_id = ?saved.route_id,
            event_id = ?saved.id,
            started_at = %saved.started_at,
            min_time_minutes = config.min_time_minutes,
            max_distance_meters = config.max_distance_meters,
            max_speed_kmh = config.max_speed_kmh,
            "vehicle parked"
        );
        self.publish(AlertKind::VehicleParked, &saved).await;

        Some(saved)
    }

    /// Close the vehicle's open event at `departure`.
    ///
    /// The open-event id is kept and `departure` recorded for a retry when the
    /// store cannot be read or written.
    async fn close_event(
        &self, state: &mut VehicleTrackingState, departure: &TelemetrySample,
    ) -> Option<ParkingEvent> {
        let vehicle_id = &departure.vehicle_id;
        let event_id = state.active_event_id?;

        let mut event = match EventStore::find_by_id(&self.provider, event_id).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                warn!(vehicle_id = %vehicle_id, event_id, "open parking event not found");
                state.active_event_id = None;
                return None;
            }
            Err(err) => {
                let err = Error::persistence(&err);
                error!(vehicle_id = %vehicle_id, event_id, code = err.code(), error = %err, "loading parking event");
                state.pending_close = Some(departure.clone());
                return None;
            }
        };

        event.close(departure);
        let saved = match EventStore::save(&self.provider, event).await {
            Ok(saved) => saved,
            Err(err) => {
                let err = Error::persistence(&err);
                error!(
                    monotonic_counter.processing_errors = 1,
                    vehicle_id = %vehicle_id,
                    event_id,
                    code = err.code(),
                    error = %err,
                    "closing parking event"
                );
                state.pending_close = Some(departure.clone());
                return None;
            }
        };
        state.active_event_id = None;

        info!(
            monotonic_counter.parking_events_closed = 1,
            vehicle_id = %vehicle_id,
            event_id,
            total_duration_minutes = ?saved.total_duration_minutes,
            "vehicle resumed"
        );
        self.publish(AlertKind::VehicleResumed, &saved).await;

        Some(saved)
    }

    async fn publish(&self, kind: AlertKind, event: &ParkingEvent) {
        let alert = ParkingAlert::new(kind, event);
        let payload = match serde_json::to_vec(&alert) {
            Ok(payload) => payload,
            Err(err) => {
                error!(vehicle_id = %alert.vehicle_id, error = %err, "serializing parking alert");
                return;
            }
        };
        let message = Message::new(&payload).with_header("key", alert.vehicle_id.as_str());

        if let Err(err) = Publisher::send(&self.provider, &self.config.alert_channel, &message).await
        {
            let err = Error::publish(&err);
            error!(
                monotonic_counter.processing_errors = 1,
                vehicle_id = %alert.vehicle_id,
                code = err.code(),
                error = %err,
                "publishing parking alert"
            );
            return;
        }

        info!(monotonic_counter.alerts_published = 1, vehicle_id = %alert.vehicle_id, kind = ?kind);
    }
}

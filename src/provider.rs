//! In-process implementations of the detector's collaborators.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use dashmap::DashMap;
use parking::{
    ConfigProvider, EventStore, Message, ParkingConfig, ParkingEvent, ParkingStats, Publisher,
};
use tokio::sync::broadcast;
use tracing::debug;

const BROADCAST_CAPACITY: usize = 1024;

/// The host's provider: static configs, in-memory events, broadcast alerts.
#[derive(Debug, Clone, Default)]
pub struct HostProvider {
    pub configs: StaticConfigs,
    pub events: MemoryEventStore,
    pub alerts: BroadcastPublisher,
}

impl HostProvider {
    #[must_use]
    pub fn new(configs: StaticConfigs) -> Self {
        Self { configs, ..Self::default() }
    }
}

impl ConfigProvider for HostProvider {
    async fn resolve(&self, vehicle_id: &str) -> Result<Option<ParkingConfig>> {
        self.configs.resolve(vehicle_id)
    }
}

impl EventStore for HostProvider {
    async fn save(&self, event: ParkingEvent) -> Result<ParkingEvent> {
        self.events.save(event)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<ParkingEvent>> {
        Ok(self.events.find_by_id(id))
    }

    async fn find_active(&self, vehicle_id: &str) -> Result<Option<ParkingEvent>> {
        Ok(self.events.find_active(vehicle_id))
    }

    async fn active_events(&self) -> Result<Vec<ParkingEvent>> {
        Ok(self.events.active())
    }
}

impl Publisher for HostProvider {
    async fn send(&self, topic: &str, message: &Message) -> Result<()> {
        self.alerts.send(topic, message)
    }
}

/// Per-company thresholds with an optional vehicle to company mapping.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigs {
    configs: Arc<DashMap<u64, ParkingConfig>>,
    fleet: Arc<DashMap<String, u64>>,
}

impl StaticConfigs {
    #[must_use]
    pub fn new(configs: impl IntoIterator<Item = ParkingConfig>) -> Self {
        let this = Self::default();
        for config in configs {
            this.upsert(config);
        }
        this
    }

    /// Add or replace a company's config. Takes effect on the next sample.
    pub fn upsert(&self, config: ParkingConfig) {
        self.configs.insert(config.company_id, config);
    }

    /// Assign a vehicle to a company.
    pub fn assign(&self, vehicle_id: impl Into<String>, company_id: u64) {
        self.fleet.insert(vehicle_id.into(), company_id);
    }

    /// The vehicle's company config, or else the first active usable config.
    ///
    /// # Errors
    ///
    /// Returns an error when the vehicle is assigned to an unknown company.
    pub fn resolve(&self, vehicle_id: &str) -> Result<Option<ParkingConfig>> {
        if let Some(company_id) = self.fleet.get(vehicle_id).map(|entry| *entry.value()) {
            let config = self
                .configs
                .get(&company_id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| anyhow!("no parking config for company {company_id}"))
                .with_context(|| format!("resolving config for vehicle {vehicle_id}"))?;
            return Ok(Some(config));
        }

        let mut candidates: Vec<ParkingConfig> = self
            .configs
            .iter()
            .filter(|entry| entry.is_active && entry.validate().is_ok())
            .map(|entry| entry.value().clone())
            .collect();
        candidates.sort_by_key(|config| config.company_id);
        Ok(candidates.into_iter().next())
    }
}

/// Parking events held in memory, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    events: Arc<DashMap<u64, ParkingEvent>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryEventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update an event, assigning the next id to a new event.
    ///
    /// # Errors
    ///
    /// Returns an error when updating an id the store has never issued.
    pub fn save(&self, mut event: ParkingEvent) -> Result<ParkingEvent> {
        let id = match event.id {
            Some(id) => {
                if !self.events.contains_key(&id) {
                    return Err(anyhow!("parking event {id} does not exist"));
                }
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        event.id = Some(id);
        self.events.insert(id, event.clone());
        debug!(event_id = id, vehicle_id = %event.vehicle_id, is_active = event.is_active, "saved parking event");
        Ok(event)
    }

    #[must_use]
    pub fn find_by_id(&self, id: u64) -> Option<ParkingEvent> {
        self.events.get(&id).map(|entry| entry.value().clone())
    }

    #[must_use]
    pub fn find_active(&self, vehicle_id: &str) -> Option<ParkingEvent> {
        self.select(|event| event.is_active && event.vehicle_id == vehicle_id).into_iter().next()
    }

    /// Every open event.
    #[must_use]
    pub fn active(&self) -> Vec<ParkingEvent> {
        self.select(|event| event.is_active)
    }

    /// Every event, oldest id first.
    #[must_use]
    pub fn all(&self) -> Vec<ParkingEvent> {
        self.select(|_| true)
    }

    #[must_use]
    pub fn by_vehicle(&self, vehicle_id: &str) -> Vec<ParkingEvent> {
        self.select(|event| event.vehicle_id == vehicle_id)
    }

    /// The vehicle's events that started within `[start, end]`.
    #[must_use]
    pub fn by_vehicle_between(
        &self, vehicle_id: &str, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>,
    ) -> Vec<ParkingEvent> {
        self.select(|event| {
            event.vehicle_id == vehicle_id && event.started_at >= start && event.started_at <= end
        })
    }

    #[must_use]
    pub fn by_driver(&self, driver_id: u64) -> Vec<ParkingEvent> {
        self.select(|event| event.driver_id == Some(driver_id))
    }

    /// Events that started at or after `since`, most recent first.
    #[must_use]
    pub fn recent(&self, since: DateTime<FixedOffset>) -> Vec<ParkingEvent> {
        let mut events = self.select(|event| event.started_at >= since);
        events.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        events
    }

    #[must_use]
    pub fn stats(&self, now: DateTime<Utc>, tz: Tz) -> ParkingStats {
        ParkingStats::from_events(&self.all(), now, tz)
    }

    fn select(&self, predicate: impl Fn(&ParkingEvent) -> bool) -> Vec<ParkingEvent> {
        let mut events: Vec<ParkingEvent> = self
            .events
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        events.sort_by_key(|event| event.id);
        events
    }
}

/// Fan-out of published messages to live subscribers, one channel per topic.
#[derive(Debug, Clone, Default)]
pub struct BroadcastPublisher {
    channels: Arc<DashMap<String, broadcast::Sender<Message>>>,
}

impl BroadcastPublisher {
    /// Receive every message published to `topic` from now on.
    #[must_use]
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Message> {
        self.channels
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .subscribe()
    }

    /// Deliver `message` to the topic's subscribers, if it has any.
    ///
    /// # Errors
    ///
    /// Returns an error when the message is empty.
    pub fn send(&self, topic: &str, message: &Message) -> Result<()> {
        if message.payload.is_empty() {
            return Err(anyhow!("refusing to publish an empty message to {topic}"));
        }
        let Some(sender) = self.channels.get(topic) else {
            debug!(topic, "no subscribers for topic");
            return Ok(());
        };
        match sender.send(message.clone()) {
            Ok(receivers) => debug!(topic, receivers, "published message"),
            Err(_) => debug!(topic, "no live subscribers for topic"),
        }
        Ok(())
    }
}

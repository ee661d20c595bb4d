#![allow(missing_docs)]
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, TimeDelta};
use parking::{
    ConfigProvider, EventStore, Message, ParkingAlert, ParkingConfig, ParkingEvent, Publisher,
    TelemetrySample,
};

pub const BASE_LAT: f64 = 4.712_388;
pub const BASE_LNG: f64 = -74.072_092;
const METERS_PER_DEGREE: f64 = 111_194.93;

#[must_use]
pub fn config() -> ParkingConfig {
    ParkingConfig {
        company_id: 1,
        min_time_minutes: 10,
        max_distance_meters: 10.0,
        max_speed_kmh: 2.0,
        is_active: true,
    }
}

#[must_use]
pub fn at(minute: i64) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2025-03-01T08:00:00-05:00").expect("should parse")
        + TimeDelta::minutes(minute)
}

/// A fix `north` metres north of the base point, `minute` minutes after 08:00.
#[must_use]
pub fn sample(vehicle_id: &str, minute: i64, north: f64) -> TelemetrySample {
    TelemetrySample {
        vehicle_id: vehicle_id.to_string(),
        route_id: Some(12),
        latitude: BASE_LAT + north / METERS_PER_DEGREE,
        longitude: BASE_LNG,
        timestamp: at(minute),
        speed: None,
    }
}

#[derive(Clone, Default)]
pub struct MockProvider {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    config: Mutex<Option<ParkingConfig>>,
    events: Mutex<BTreeMap<u64, ParkingEvent>>,
    saves: Mutex<Vec<ParkingEvent>>,
    published: Mutex<Vec<(String, Message)>>,
    next_id: AtomicU64,
    fail_config: AtomicBool,
    fail_saves: AtomicBool,
    fail_publish: AtomicBool,
}

impl MockProvider {
    #[must_use]
    pub fn new() -> Self {
        let provider = Self::default();
        provider.set_config(Some(config()));
        provider
    }

    pub fn set_config(&self, config: Option<ParkingConfig>) {
        *self.inner.config.lock().expect("should lock") = config;
    }

    pub fn fail_config(&self, fail: bool) {
        self.inner.fail_config.store(fail, Ordering::SeqCst);
    }

    pub fn fail_saves(&self, fail: bool) {
        self.inner.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn fail_publish(&self, fail: bool) {
        self.inner.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Store an event directly, bypassing the save log.
    pub fn seed(&self, mut event: ParkingEvent) -> ParkingEvent {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        event.id = Some(id);
        self.inner.events.lock().expect("should lock").insert(id, event.clone());
        event
    }

    /// Every successful save, in order.
    #[must_use]
    pub fn saves(&self) -> Vec<ParkingEvent> {
        self.inner.saves.lock().expect("should lock").clone()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ParkingEvent> {
        self.inner.events.lock().expect("should lock").values().cloned().collect()
    }

    #[must_use]
    pub fn alerts(&self) -> Vec<(String, ParkingAlert)> {
        self.inner
            .published
            .lock()
            .expect("should lock")
            .iter()
            .map(|(topic, message)| {
                let alert = serde_json::from_slice(&message.payload).expect("should deserialize alert");
                (topic.clone(), alert)
            })
            .collect()
    }
}

impl ConfigProvider for MockProvider {
    async fn resolve(&self, _vehicle_id: &str) -> Result<Option<ParkingConfig>> {
        if self.inner.fail_config.load(Ordering::SeqCst) {
            return Err(anyhow!("config service unavailable"));
        }
        Ok(self.inner.config.lock().map_err(|e| anyhow!("{e}"))?.clone())
    }
}

impl EventStore for MockProvider {
    async fn save(&self, mut event: ParkingEvent) -> Result<ParkingEvent> {
        if self.inner.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("database unavailable"));
        }
        let id = match event.id {
            Some(id) => id,
            None => self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        event.id = Some(id);
        self.inner.events.lock().map_err(|e| anyhow!("{e}"))?.insert(id, event.clone());
        self.inner.saves.lock().map_err(|e| anyhow!("{e}"))?.push(event.clone());
        Ok(event)
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<ParkingEvent>> {
        Ok(self.inner.events.lock().map_err(|e| anyhow!("{e}"))?.get(&id).cloned())
    }

    async fn find_active(&self, vehicle_id: &str) -> Result<Option<ParkingEvent>> {
        let events = self.inner.events.lock().map_err(|e| anyhow!("{e}"))?;
        Ok(events.values().find(|e| e.is_active && e.vehicle_id == vehicle_id).cloned())
    }

    async fn active_events(&self) -> Result<Vec<ParkingEvent>> {
        let events = self.inner.events.lock().map_err(|e| anyhow!("{e}"))?;
        Ok(events.values().filter(|e| e.is_active).cloned().collect())
    }
}

impl Publisher for MockProvider {
    async fn send(&self, topic: &str, message: &Message) -> Result<()> {
        if self.inner.fail_publish.load(Ordering::SeqCst) {
            return Err(anyhow!("no subscribers"));
        }
        self.inner
            .published
            .lock()
            .map_err(|e| anyhow!("{e}"))?
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}

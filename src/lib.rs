//! # Parking Monitor
//!
//! Hosts the parking detector: accepts telemetry from the message transport,
//! keeps events in memory and broadcasts parking alerts to subscribers.

pub mod config;
pub mod messaging;
pub mod provider;
pub mod simulation;

use anyhow::{Context, Result};
use parking::{Dispatcher, ParkingDetector};

pub use self::config::Config;
pub use self::messaging::{Delivery, Ingress};
pub use self::provider::{BroadcastPublisher, HostProvider, MemoryEventStore, StaticConfigs};

/// A running detector wired to the host's provider.
pub struct Service {
    pub provider: HostProvider,
    pub detector: ParkingDetector<HostProvider>,
    pub ingress: Ingress,
}

impl Service {
    /// Restore open events and start the worker pool.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when open events cannot be restored.
    pub async fn start(config: &Config, provider: HostProvider) -> Result<Self> {
        let detector = ParkingDetector::new(provider.clone(), config.detector.clone());
        detector.restore().await.context("restoring parking state")?;

        let dispatcher = Dispatcher::from_config(&detector, &config.detector);
        let ingress = Ingress::new(config.topics.clone(), dispatcher);
        Ok(Self { provider, detector, ingress })
    }
}

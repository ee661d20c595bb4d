//! # Parking Detection
//!
//! Turns a stream of noisy vehicle GPS fixes into discrete "parked" and
//! "resumed" parking events, publishing a live alert on every transition.

pub mod alert;
pub mod config;
pub mod detector;
pub mod dispatcher;
pub mod geo;
pub mod provider;
pub mod state;
pub mod stats;
pub mod types;

pub use realtime::{Error, Message, Publisher, Result};

pub use self::alert::{AlertKind, ParkingAlert};
pub use self::config::Config;
pub use self::detector::{Outcome, ParkingDetector};
pub use self::dispatcher::Dispatcher;
pub use self::provider::{ConfigProvider, EventStore, Provider};
pub use self::state::{Fix, VehicleStateStore, VehicleTrackingState};
pub use self::stats::ParkingStats;
pub use self::types::*;

//! # Realtime Core
//!
//! Core modules shared by the fleet realtime services.

mod error;
mod provider;

pub use crate::error::*;
pub use crate::provider::*;

//! # Provider
//!
//! Provider defines external data interfaces for the crate.

use std::collections::HashMap;

use anyhow::Result;

/// Message represents a message to be published.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub payload: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl Message {
    #[must_use]
    pub fn new(payload: &[u8]) -> Self {
        Self { payload: payload.to_vec(), headers: HashMap::new() }
    }

    /// Add a header, returning the updated message.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// The `Publisher` trait defines the message publishing behavior.
pub trait Publisher: Send + Sync {
    /// Broadcast a message to every live subscriber of `topic`.
    fn send(&self, topic: &str, message: &Message) -> impl Future<Output = Result<()>> + Send;
}

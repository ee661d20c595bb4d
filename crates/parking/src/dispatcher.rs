//! Sharded worker pool.
//!
//! Every vehicle id hashes to exactly one single-task shard with a bounded
//! mailbox, so one vehicle's samples are handled one at a time in arrival
//! order while different vehicles proceed in parallel.

use std::hash::{DefaultHasher, Hash, Hasher};

use anyhow::{Result, anyhow};
use futures::future::join_all;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::detector::ParkingDetector;
use crate::provider::Provider;
use crate::types::TelemetrySample;

pub struct Dispatcher {
    mailboxes: Vec<mpsc::Sender<TelemetrySample>>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start `workers` shards, each buffering up to `capacity` samples.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<P>(detector: &ParkingDetector<P>, workers: usize, capacity: usize) -> Self
    where
        P: Provider + Clone + 'static,
    {
        let count = workers.max(1);
        let mut mailboxes = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);

        for shard in 0..count {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            mailboxes.push(tx);
            handles.push(tokio::spawn(run(shard, detector.clone(), rx)));
        }

        info!(workers = count, capacity, "started parking detection workers");
        Self { mailboxes, workers: handles }
    }

    /// Start the pool sized from `config`.
    #[must_use]
    pub fn from_config<P>(detector: &ParkingDetector<P>, config: &Config) -> Self
    where
        P: Provider + Clone + 'static,
    {
        Self::spawn(detector, config.workers, config.mailbox_capacity)
    }

    /// The shard that owns `vehicle_id`.
    #[must_use]
    pub fn shard_for(&self, vehicle_id: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        vehicle_id.hash(&mut hasher);
        let shards = self.mailboxes.len() as u64;
        usize::try_from(hasher.finish() % shards).unwrap_or_default()
    }

    /// Queue a sample on its vehicle's shard, waiting while the mailbox is full.
    ///
    /// # Errors
    ///
    /// Returns an error when the shard's worker has stopped.
    pub async fn dispatch(&self, sample: TelemetrySample) -> Result<()> {
        let shard = self.shard_for(&sample.vehicle_id);
        self.mailboxes[shard]
            .send(sample)
            .await
            .map_err(|err| anyhow!("parking worker {shard} has stopped: {err}"))
    }

    /// Close every mailbox and wait for the workers to drain them.
    pub async fn shutdown(self) {
        drop(self.mailboxes);
        for result in join_all(self.workers).await {
            if let Err(err) = result {
                error!(error = %err, "parking worker failed");
            }
        }
        info!("parking detection workers stopped");
    }
}

async fn run<P>(
    shard: usize, detector: ParkingDetector<P>, mut mailbox: mpsc::Receiver<TelemetrySample>,
) where
    P: Provider + Clone + 'static,
{
    debug!(shard, "parking worker started");
    while let Some(sample) = mailbox.recv().await {
        detector.process(&sample).await;
    }
    debug!(shard, "parking worker finished");
}

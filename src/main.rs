use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use parking::ParkingAlert;
use parking_monitor::{Config, HostProvider, Service, StaticConfigs, simulation};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parking-monitor", version = env!("CARGO_PKG_VERSION"), about = "Detect parked vehicles from GPS telemetry")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay recorded telemetry, one `{"topic": .., "payload": ..}` JSON object per line
    Replay {
        /// Read from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Simulate a vehicle parking and then driving off
    Simulate {
        #[arg(long, default_value = "SIM-001")]
        vehicle: String,

        #[arg(long)]
        route: Option<i64>,

        /// Minutes the vehicle stays parked
        #[arg(long, default_value_t = 12)]
        minutes: u32,

        #[arg(long, default_value_t = 4.712_388, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, default_value_t = -74.072_092, allow_hyphen_values = true)]
        lng: f64,

        /// Maximum GPS scatter in metres
        #[arg(long, default_value_t = 2.0)]
        jitter: f64,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Deserialize)]
struct Recorded {
    topic: String,
    payload: serde_json::Value,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let provider = HostProvider::new(StaticConfigs::new([config.parking.clone()]));
    let mut alerts = provider.alerts.subscribe(&config.detector.alert_channel);

    let service = Service::start(&config, provider).await?;

    match cli.command {
        Command::Replay { file } => replay(&service, file).await?,
        Command::Simulate { vehicle, route, minutes, lat, lng, jitter, seed } => {
            let topic = config.topics.first().map_or("vehicles/", String::as_str);
            let start = Utc::now().fixed_offset();
            let mut samples =
                simulation::dwell(&vehicle, route, minutes, (lat, lng), start, jitter, seed);
            if let Some(departure) = samples.last().map(|last| simulation::departure(last, 200.0)) {
                samples.push(departure);
            }
            for sample in &samples {
                let payload = serde_json::to_vec(sample).context("serializing sample")?;
                service.ingress.handle(&format!("{topic}{vehicle}"), &payload).await;
            }
        }
    }

    let Service { provider, ingress, .. } = service;
    ingress.shutdown().await;
    print_alerts(&mut alerts);

    let stats = provider.events.stats(Utc::now(), config.timezone);
    println!("{}", serde_json::to_string_pretty(&stats).context("serializing stats")?);
    Ok(())
}

async fn replay(service: &Service, file: Option<PathBuf>) -> Result<()> {
    let input: Box<dyn tokio::io::AsyncRead + Unpin + Send> = match file {
        Some(path) => Box::new(
            tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut lines = BufReader::new(input).lines();
    let mut count = 0_usize;
    while let Some(line) = lines.next_line().await.context("reading telemetry")? {
        if line.trim().is_empty() {
            continue;
        }
        let recorded: Recorded = match serde_json::from_str(&line) {
            Ok(recorded) => recorded,
            Err(err) => {
                warn!(error = %err, "skipping unreadable line");
                continue;
            }
        };
        let payload = match recorded.payload {
            serde_json::Value::String(raw) => raw.into_bytes(),
            value => serde_json::to_vec(&value).context("re-encoding payload")?,
        };
        service.ingress.handle(&recorded.topic, &payload).await;
        count += 1;
    }

    info!(count, "replayed telemetry");
    Ok(())
}

// Workers have stopped, so every alert is already buffered.
fn print_alerts(alerts: &mut broadcast::Receiver<parking::Message>) {
    loop {
        match alerts.try_recv() {
            Ok(message) => match serde_json::from_slice::<ParkingAlert>(&message.payload) {
                Ok(alert) => println!(
                    "{:?} vehicle={} since={} {}",
                    alert.kind, alert.vehicle_id, alert.started_at, alert.message
                ),
                Err(err) => warn!(error = %err, "unreadable alert"),
            },
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "alerts dropped before printing");
            }
            Err(_) => return,
        }
    }
}

//! dump1090 to InfluxDB collector CLI
//!
//! Reads BaseStation data from dump1090, buffers it per aircraft and writes
//! snapshots to InfluxDB every interval.

use chrono::Utc;
use clap::{Parser, Subcommand};
use sbs2influx::{
    cache::AircraftCache,
    client::{ClientConfig, InfluxClient},
    collector::{Collector, CollectorConfig},
    feed::{FeedClient, FeedConfig},
    line_protocol, protocol, snapshot,
};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "sbs2influx")]
#[command(
    about = "Read dump1090 TCP BaseStation data, convert to InfluxDB line protocol, and send to InfluxDB",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect from dump1090 and write to InfluxDB continuously
    Collect {
        /// Host/IP for dump1090
        #[arg(long, env = "SBS_FEED_HOST", default_value = "127.0.0.1")]
        feed_host: String,

        /// Port for dump1090 TCP BaseStation data
        #[arg(long, env = "SBS_FEED_PORT", default_value = "30003")]
        feed_port: u16,

        /// InfluxDB URL
        #[arg(long, env = "INFLUX_URL", default_value = "http://127.0.0.1:8186")]
        influx_url: String,

        /// InfluxDB database name
        #[arg(long, env = "INFLUX_DATABASE", default_value = "adsb")]
        influx_database: String,

        /// InfluxDB username
        #[arg(long, env = "INFLUX_USERNAME")]
        influx_username: Option<String>,

        /// InfluxDB password
        #[arg(long, env = "INFLUX_PASSWORD")]
        influx_password: Option<String>,

        /// Measurement to write points to
        #[arg(long, env = "INFLUX_MEASUREMENT", default_value = "messages")]
        measurement: String,

        /// Received data is buffered and sent to InfluxDB every N seconds
        #[arg(short, long, env = "SEND_INTERVAL", default_value = "60")]
        interval: u64,

        /// Forget aircraft not seen for N seconds [default: 3 x interval]
        #[arg(long, env = "MAX_AGE")]
        max_age: Option<u64>,
    },

    /// Parse a file of BaseStation lines and print the resulting line protocol
    Parse {
        /// Path to a capture of the feed, one message per line
        file: PathBuf,

        /// Measurement name used in the output
        #[arg(long, default_value = "messages")]
        measurement: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Collect {
            feed_host,
            feed_port,
            influx_url,
            influx_database,
            influx_username,
            influx_password,
            measurement,
            interval,
            max_age,
        } => {
            let mut client_config = ClientConfig::new(influx_url, influx_database);
            if let (Some(u), Some(p)) = (influx_username, influx_password) {
                client_config = client_config.with_credentials(u, p);
            }

            let interval = Duration::from_secs(interval.max(1));
            let mut collector_config = CollectorConfig::new(interval);
            collector_config.measurement = measurement;
            if let Some(secs) = max_age {
                collector_config.max_age = Duration::from_secs(secs);
            }

            run_collector(FeedConfig::new(feed_host, feed_port), client_config, collector_config)
                .await?;
        }

        Commands::Parse { file, measurement } => {
            parse_file(&file, &measurement)?;
        }
    }

    Ok(())
}

async fn run_collector(
    feed_config: FeedConfig,
    client_config: ClientConfig,
    collector_config: CollectorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting BaseStation collector");
    tracing::info!("Feed: {}:{}", feed_config.host, feed_config.port);
    tracing::info!(
        "InfluxDB: {} database={}",
        client_config.url,
        client_config.database
    );
    tracing::info!(
        "Send interval: {:?}, max age: {:?}",
        collector_config.emission_interval,
        collector_config.max_age
    );

    let client = InfluxClient::new(client_config)?;
    let mut collector = Collector::new(FeedClient::new(feed_config), client, collector_config);
    let stats = collector.stats();

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    let result = collector.run(shutdown).await;

    let s = stats.snapshot();
    tracing::info!("Final statistics:");
    tracing::info!("  Lines received: {}", s.lines_received);
    tracing::info!("  Lines rejected: {}", s.lines_rejected);
    tracing::info!("  Cycles: {}", s.cycles);
    tracing::info!("  Points written: {}", s.points_written);
    tracing::info!("  Failed writes: {}", s.write_failures);
    tracing::info!("  Skipped records: {}", s.records_skipped);

    result?;
    Ok(())
}

/// Cancel `shutdown` on Ctrl+C or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Received shutdown signal, shutting down...");
    shutdown.cancel();
}

fn parse_file(path: &PathBuf, measurement: &str) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;

    tracing::info!("Parsing file: {} ({} bytes)", path.display(), data.len());

    let mut cache = AircraftCache::new();
    let mut rejected = 0usize;
    let mut total = 0usize;

    for line in data.lines().map(str::trim_end).filter(|l| !l.is_empty()) {
        total += 1;
        match protocol::parse_message(line) {
            Ok(fields) => cache.merge(fields),
            Err(e) => {
                rejected += 1;
                tracing::debug!("{}", e);
            }
        }
    }

    // Everything in the file counts as recent
    let snapshot = snapshot::build_points(&cache, Duration::MAX, Utc::now().timestamp());
    if !snapshot.points.is_empty() {
        println!("{}", line_protocol::encode_batch(measurement, &snapshot.points)?);
    }

    eprintln!();
    eprintln!("Lines: {} ({} rejected)", total, rejected);
    eprintln!("Aircraft: {}", cache.len());
    eprintln!("Points: {} ({} skipped)", snapshot.points.len(), snapshot.failed);

    Ok(())
}

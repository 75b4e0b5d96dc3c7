//! Collection loop: feed lines into the cache, emit snapshots on an interval.

use crate::cache::AircraftCache;
use crate::client::InfluxClient;
use crate::feed::{FeedClient, FeedError};
use crate::protocol;
use crate::snapshot;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),
}

/// Statistics for the collector.
#[derive(Debug, Default)]
pub struct CollectorStats {
    pub lines_received: AtomicU64,
    pub lines_rejected: AtomicU64,
    pub cycles: AtomicU64,
    pub points_written: AtomicU64,
    pub write_failures: AtomicU64,
    pub records_skipped: AtomicU64,
}

impl CollectorStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines_received: self.lines_received.load(Ordering::Relaxed),
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            records_skipped: self.records_skipped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub lines_received: u64,
    pub lines_rejected: u64,
    pub cycles: u64,
    pub points_written: u64,
    pub write_failures: u64,
    pub records_skipped: u64,
}

/// Configuration for the collector.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between snapshots; also the freshness window for a snapshot
    pub emission_interval: Duration,
    /// Aircraft not seen for longer than this are evicted
    pub max_age: Duration,
    /// Measurement name written to InfluxDB
    pub measurement: String,
}

impl CollectorConfig {
    pub fn new(emission_interval: Duration) -> Self {
        Self {
            emission_interval,
            max_age: emission_interval.checked_mul(3).unwrap_or(Duration::MAX),
            measurement: "messages".to_string(),
        }
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

/// Owns the feed, the database client and the aircraft cache.
pub struct Collector {
    feed: FeedClient,
    client: InfluxClient,
    cache: AircraftCache,
    config: CollectorConfig,
    stats: Arc<CollectorStats>,
}

impl Collector {
    pub fn new(feed: FeedClient, client: InfluxClient, config: CollectorConfig) -> Self {
        Self {
            feed,
            client,
            cache: AircraftCache::new(),
            config,
            stats: Arc::new(CollectorStats::new()),
        }
    }

    /// Get a reference to the collector stats.
    pub fn stats(&self) -> Arc<CollectorStats> {
        Arc::clone(&self.stats)
    }

    pub fn cache(&self) -> &AircraftCache {
        &self.cache
    }

    /// Run until `shutdown` is cancelled or the feed fails.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), CollectorError> {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(()),
            _ = self.feed.connect() => {}
        }

        let result = self.collect_loop(&shutdown).await;
        self.feed.disconnect().await;
        result
    }

    async fn collect_loop(&mut self, shutdown: &CancellationToken) -> Result<(), CollectorError> {
        let mut last_emit = Instant::now();

        while !shutdown.is_cancelled() {
            if last_emit.elapsed() >= self.config.emission_interval {
                last_emit = Instant::now();
                self.emit().await;
            }

            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.feed.receive() => received,
            };

            match received {
                Ok(Some(line)) => self.ingest(&line),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Feed error: {}", e);
                    return Err(e.into());
                }
            }
        }

        tracing::info!("Shutdown requested, stopping collector");
        Ok(())
    }

    /// Parse a line and merge it. Malformed lines are logged and dropped.
    pub fn ingest(&mut self, line: &str) {
        self.stats.lines_received.fetch_add(1, Ordering::Relaxed);

        match protocol::parse_message(line) {
            Ok(fields) => self.cache.merge(fields),
            Err(e) => {
                self.stats.lines_rejected.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("{}", e);
            }
        }
    }

    /// One emission cycle: snapshot, write, then age out the cache.
    pub async fn emit(&mut self) {
        self.stats.cycles.fetch_add(1, Ordering::Relaxed);

        let snapshot = snapshot::build_points(
            &self.cache,
            self.config.emission_interval,
            Utc::now().timestamp(),
        );
        self.stats
            .records_skipped
            .fetch_add(snapshot.failed as u64, Ordering::Relaxed);

        if snapshot.points.is_empty() {
            tracing::info!("No aircraft to be saved in DB");
        } else {
            match self.client.write(&self.config.measurement, &snapshot.points).await {
                Ok(written) => {
                    self.stats
                        .points_written
                        .fetch_add(written as u64, Ordering::Relaxed);
                    tracing::info!("Saved {} aircraft to InfluxDB", written);
                }
                Err(e) => {
                    self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
                    tracing::error!(
                        "Dropping batch of {} aircraft: {}",
                        snapshot.points.len(),
                        e
                    );
                }
            }
        }

        let evicted = self.cache.sweep(self.config.max_age);
        if evicted > 0 {
            tracing::debug!("Evicted {} aircraft, {} remaining", evicted, self.cache.len());
        }
        self.cache.reset_counts();
    }
}

//! dump1090 BaseStation to InfluxDB collector library.
//!
//! This library provides functionality to:
//! - Read SBS-1 `MSG` lines from a dump1090 TCP feed
//! - Parse and normalize them into typed fields
//! - Merge partial updates into a per-aircraft cache with aging
//! - Periodically write per-aircraft snapshots as InfluxDB line protocol
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌─────────────┐    ┌─────────────┐
//! │    Feed     │───▶│  Protocol   │───▶│    Cache    │
//! │   (TCP)     │    │  (Parser)   │    │   (Aging)   │
//! └─────────────┘    └─────────────┘    └─────────────┘
//!        │                                     │ every interval
//!        │                              ┌─────────────┐    ┌─────────────┐
//!        │                              │  Snapshot   │───▶│   Client    │
//!        │                              │(line proto) │    │ (InfluxDB)  │
//!        │                              └─────────────┘    └─────────────┘
//!        └─────────────┬───────────────────────┘
//!                      ▼
//!              ┌─────────────┐
//!              │  Collector  │
//!              │   (Loop)    │
//!              └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sbs2influx::{
//!     client::{ClientConfig, InfluxClient},
//!     collector::{Collector, CollectorConfig},
//!     feed::{FeedClient, FeedConfig},
//! };
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let feed = FeedClient::new(FeedConfig::new("127.0.0.1", 30003));
//!     let client = InfluxClient::new(ClientConfig::new("http://127.0.0.1:8186", "adsb"))?;
//!
//!     let mut collector = Collector::new(
//!         feed,
//!         client,
//!         CollectorConfig::new(Duration::from_secs(60)),
//!     );
//!
//!     collector.run(CancellationToken::new()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod collector;
pub mod feed;
pub mod line_protocol;
pub mod protocol;
pub mod snapshot;
pub mod types;

pub use cache::AircraftCache;
pub use client::{ClientConfig, InfluxClient};
pub use collector::{Collector, CollectorConfig};
pub use feed::{FeedClient, FeedConfig};
pub use protocol::parse_message;
pub use types::{AircraftRecord, Field, FieldValue, HexIdent, ParsedFields};

//! Turns the aircraft cache into points at emission time.

use crate::cache::AircraftCache;
use crate::line_protocol::Point;
use crate::types::{AircraftRecord, Field, FieldValue, HexIdent};
use chrono::NaiveDateTime;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Format of the generated date and time fields, joined by a space.
const GENERATED_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.f";

/// Fields written for every aircraft, after `generated` and before `count`.
const TELEMETRY: [Field; 10] = [
    Field::Altitude,
    Field::GroundSpeed,
    Field::Track,
    Field::Latitude,
    Field::Longitude,
    Field::VerticalRate,
    Field::Alert,
    Field::Emergency,
    Field::Spi,
    Field::OnGround,
];

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("Missing {field} for {hexident}")]
    MissingTimestamp { hexident: HexIdent, field: Field },
    #[error("Invalid generated timestamp '{value}' for {hexident}")]
    InvalidTimestamp { hexident: HexIdent, value: String },
}

/// Result of one snapshot.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub points: Vec<Point>,
    /// Records that qualified but could not be turned into a point.
    pub failed: usize,
}

/// Build one point per aircraft seen within `interval` that has both a
/// callsign and a squawk. `emitted_at` is the Unix-seconds timestamp of the
/// points.
pub fn build_points(cache: &AircraftCache, interval: Duration, emitted_at: i64) -> Snapshot {
    build_points_at(cache, interval, emitted_at, Instant::now())
}

pub(crate) fn build_points_at(
    cache: &AircraftCache,
    interval: Duration,
    emitted_at: i64,
    now: Instant,
) -> Snapshot {
    let mut snapshot = Snapshot::default();

    for (hexident, record) in cache.iter() {
        let (callsign, squawk) = match (record.callsign(), record.squawk()) {
            (Some(c), Some(s)) => (c, s),
            _ => {
                tracing::debug!("Missing callsign or squawk for {}", hexident);
                continue;
            }
        };

        if cache.age_at(hexident, now) > interval {
            tracing::debug!("Aircraft {} was not seen too long, not sending", hexident);
            continue;
        }

        let generated = match generated_timestamp(hexident, record) {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!("Skipping aircraft: {}", e);
                snapshot.failed += 1;
                continue;
            }
        };

        let mut point = Point::new(emitted_at)
            .tag(Field::HexIdent.name(), hexident.as_str())
            .tag(Field::Callsign.name(), callsign)
            .tag(Field::Squawk.name(), squawk)
            .field("generated", Some(FieldValue::Integer(generated)));

        for field in TELEMETRY {
            point = point.field(field.name(), record.get(field).cloned());
        }

        let count = i64::try_from(record.count).unwrap_or(i64::MAX);
        snapshot
            .points
            .push(point.field("count", Some(FieldValue::Integer(count))));
    }

    snapshot
}

/// Unix seconds of the record's generated date and time, read as UTC.
pub fn generated_timestamp(hexident: &HexIdent, record: &AircraftRecord) -> Result<i64, RecordError> {
    let text = |field: Field| {
        record
            .get(field)
            .and_then(FieldValue::as_str)
            .ok_or_else(|| RecordError::MissingTimestamp {
                hexident: hexident.clone(),
                field,
            })
    };

    let value = format!(
        "{} {}",
        text(Field::GeneratedDate)?,
        text(Field::GeneratedTime)?
    );

    NaiveDateTime::parse_from_str(&value, GENERATED_FORMAT)
        .map(|dt| dt.and_utc().timestamp())
        .map_err(|_| RecordError::InvalidTimestamp {
            hexident: hexident.clone(),
            value,
        })
}

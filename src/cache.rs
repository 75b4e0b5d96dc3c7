//! Per-aircraft state cache with aging.
//!
//! Records and last-seen instants are kept in two maps that every mutation
//! updates together. The age map is consulted on its own so that eviction
//! never depends on what a record happens to contain.

use crate::types::{AircraftRecord, HexIdent, ParsedFields};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct AircraftCache {
    records: HashMap<HexIdent, AircraftRecord>,
    ages: HashMap<HexIdent, Instant>,
}

impl AircraftCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a parsed message into the record for its hex identity.
    pub fn merge(&mut self, fields: ParsedFields) {
        self.merge_at(fields, Instant::now());
    }

    pub(crate) fn merge_at(&mut self, fields: ParsedFields, now: Instant) {
        let (hexident, values) = fields.into_parts();

        self.ages.insert(hexident.clone(), now);

        match self.records.get_mut(&hexident) {
            Some(record) => record.merge(values),
            None => {
                self.records
                    .insert(hexident, AircraftRecord::from_values(values));
            }
        }
    }

    /// Time since the last message for `hexident`, or `Duration::MAX` if it
    /// has never been seen.
    pub fn age(&self, hexident: &HexIdent) -> Duration {
        self.age_at(hexident, Instant::now())
    }

    pub(crate) fn age_at(&self, hexident: &HexIdent, now: Instant) -> Duration {
        self.ages
            .get(hexident)
            .map(|seen| now.saturating_duration_since(*seen))
            .unwrap_or(Duration::MAX)
    }

    /// Evict every aircraft not seen for longer than `max_age`.
    ///
    /// Returns the number of evicted records.
    pub fn sweep(&mut self, max_age: Duration) -> usize {
        self.sweep_at(max_age, Instant::now())
    }

    pub(crate) fn sweep_at(&mut self, max_age: Duration, now: Instant) -> usize {
        let records = &self.records;
        self.ages.retain(|hexident, _| records.contains_key(hexident));

        let stale: Vec<HexIdent> = self
            .records
            .keys()
            .filter(|hexident| self.age_at(hexident, now) > max_age)
            .cloned()
            .collect();

        for hexident in &stale {
            tracing::info!("Hexident {} too old, deleting", hexident);
            self.ages.remove(hexident);
            self.records.remove(hexident);
        }

        stale.len()
    }

    /// Start a new counting window. Field values and ages are kept.
    pub fn reset_counts(&mut self) {
        for record in self.records.values_mut() {
            record.count = 0;
        }
    }

    /// Current records, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&HexIdent, &AircraftRecord)> {
        self.records.iter()
    }

    pub fn get(&self, hexident: &HexIdent) -> Option<&AircraftRecord> {
        self.records.get(hexident)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Core data types for BaseStation aircraft tracking.

use std::collections::BTreeMap;
use std::fmt;

/// Mode S transponder address, as the uppercase hex string the feed sends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HexIdent(String);

impl HexIdent {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexIdent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HexIdent {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How a raw field is converted during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Base-10 integer.
    Integer,
    /// Floating point.
    Float,
    /// Free text, surrounding whitespace trimmed.
    Text,
    /// `-1` is true, anything else false.
    Flag,
    /// Kept verbatim as a string.
    Raw,
}

/// The positional fields of an SBS `MSG` record, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Transmission,
    Session,
    Aircraft,
    HexIdent,
    Flight,
    GeneratedDate,
    GeneratedTime,
    LoggedDate,
    LoggedTime,
    Callsign,
    Altitude,
    GroundSpeed,
    Track,
    Latitude,
    Longitude,
    VerticalRate,
    Squawk,
    Alert,
    Emergency,
    Spi,
    OnGround,
}

impl Field {
    /// All fields in the order they appear after the `MSG` marker.
    pub const ALL: [Field; 21] = [
        Field::Transmission,
        Field::Session,
        Field::Aircraft,
        Field::HexIdent,
        Field::Flight,
        Field::GeneratedDate,
        Field::GeneratedTime,
        Field::LoggedDate,
        Field::LoggedTime,
        Field::Callsign,
        Field::Altitude,
        Field::GroundSpeed,
        Field::Track,
        Field::Latitude,
        Field::Longitude,
        Field::VerticalRate,
        Field::Squawk,
        Field::Alert,
        Field::Emergency,
        Field::Spi,
        Field::OnGround,
    ];

    /// Key used for this field in tags, fields and log output.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Transmission => "transmission",
            Field::Session => "session",
            Field::Aircraft => "aircraft",
            Field::HexIdent => "hexident",
            Field::Flight => "flight",
            Field::GeneratedDate => "gen_date",
            Field::GeneratedTime => "gen_time",
            Field::LoggedDate => "log_date",
            Field::LoggedTime => "log_time",
            Field::Callsign => "callsign",
            Field::Altitude => "altitude",
            Field::GroundSpeed => "speed",
            Field::Track => "track",
            Field::Latitude => "latitude",
            Field::Longitude => "longitude",
            Field::VerticalRate => "verticalrate",
            Field::Squawk => "squawk",
            Field::Alert => "alert",
            Field::Emergency => "emergency",
            Field::Spi => "spi",
            Field::OnGround => "onground",
        }
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            Field::Transmission
            | Field::Session
            | Field::Aircraft
            | Field::Flight
            | Field::Altitude
            | Field::GroundSpeed
            | Field::Track
            | Field::VerticalRate => FieldKind::Integer,
            Field::Latitude | Field::Longitude => FieldKind::Float,
            Field::Callsign => FieldKind::Text,
            Field::Alert | Field::Emergency | Field::Spi | Field::OnGround => FieldKind::Flag,
            Field::HexIdent
            | Field::GeneratedDate
            | Field::GeneratedTime
            | Field::LoggedDate
            | Field::LoggedTime
            | Field::Squawk => FieldKind::Raw,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A normalized field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

/// The non-empty fields of one parsed message.
///
/// The hex identity is mandatory in the grammar, so it is held outside the
/// optional value map and can never be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFields {
    hexident: HexIdent,
    values: BTreeMap<Field, FieldValue>,
}

impl ParsedFields {
    pub fn new(hexident: HexIdent) -> Self {
        Self {
            hexident,
            values: BTreeMap::new(),
        }
    }

    /// Add a value. The hex identity is not a map entry and is ignored here.
    pub fn with(mut self, field: Field, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value.into());
        self
    }

    pub fn insert(&mut self, field: Field, value: FieldValue) {
        if field != Field::HexIdent {
            self.values.insert(field, value);
        }
    }

    pub fn hexident(&self) -> &HexIdent {
        &self.hexident
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub(crate) fn into_parts(self) -> (HexIdent, BTreeMap<Field, FieldValue>) {
        (self.hexident, self.values)
    }
}

/// Latest known state of one aircraft: every field received since it was
/// first seen, plus the number of messages merged in the current cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftRecord {
    values: BTreeMap<Field, FieldValue>,
    pub count: u64,
}

impl AircraftRecord {
    pub(crate) fn from_values(values: BTreeMap<Field, FieldValue>) -> Self {
        Self { values, count: 1 }
    }

    /// Overwrite same-named fields, keep the rest.
    pub(crate) fn merge(&mut self, values: BTreeMap<Field, FieldValue>) {
        self.values.extend(values);
        self.count += 1;
    }

    pub fn get(&self, field: Field) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn callsign(&self) -> Option<&str> {
        self.get(Field::Callsign).and_then(FieldValue::as_str)
    }

    pub fn squawk(&self) -> Option<&str> {
        self.get(Field::Squawk).and_then(FieldValue::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

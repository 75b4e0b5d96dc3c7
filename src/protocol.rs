//! Parser for the dump1090 BaseStation (SBS-1) text format.
//!
//! Each line is a `MSG` record followed by 21 comma separated fields:
//!
//! ```text
//! MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0
//!     │ │ │ │      │ │          │            │          │            │       │    │   │  │    │    │ │    └┴┴┴─ alert, emergency, spi, onground
//!     │ │ │ │      │ └──generated date/time──┴──logged date/time─────┘       │    │   │  lat  lon  │ squawk
//!     │ │ │ hexident flight                                         callsign alt  speed track     vertical rate
//!     transmission, session, aircraft
//! ```
//!
//! Flags are `-1` for true and `0` for false. Empty fields are left out of
//! the result entirely.

use crate::types::{Field, FieldKind, FieldValue, HexIdent, ParsedFields};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Malformed message: '{line}'")]
    MalformedMessage { line: String },
}

impl ParseError {
    fn malformed(line: &str) -> Self {
        ParseError::MalformedMessage {
            line: line.to_string(),
        }
    }
}

fn msg_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(concat!(
            r"^MSG,",
            r"(?P<transmission>\d),",
            r"(?P<session>\d+),",
            r"(?P<aircraft>\d+),",
            r"(?P<hexident>[0-9A-F]+),",
            r"(?P<flight>\d+),",
            r"(?P<gen_date>[0-9/]+),",
            r"(?P<gen_time>[0-9:\.]+),",
            r"(?P<log_date>[0-9/]+),",
            r"(?P<log_time>[0-9:\.]+),",
            r"(?P<callsign>[\w\s]*),",
            r"(?P<altitude>\d*),",
            r"(?P<speed>\d*),",
            r"(?P<track>[\d\-]*),",
            r"(?P<latitude>[\d\-\.]*),",
            r"(?P<longitude>[\d\-\.]*),",
            r"(?P<verticalrate>[\d\-]*),",
            r"(?P<squawk>\d*),",
            r"(?P<alert>[\d\-]*),",
            r"(?P<emergency>[\d\-]*),",
            r"(?P<spi>[\d\-]*),",
            r"(?P<onground>[\d\-]*)$",
        ))
        .expect("MSG pattern is valid")
    })
}

/// Parse one line into its non-empty, normalized fields.
///
/// The whole line must match; a field that matches its character class
/// but does not convert (`--` as a track, `1.2.3` as a latitude) rejects
/// the line as well.
pub fn parse_message(line: &str) -> Result<ParsedFields, ParseError> {
    let caps = msg_pattern()
        .captures(line)
        .ok_or_else(|| ParseError::malformed(line))?;

    let hexident = caps
        .name(Field::HexIdent.name())
        .map(|m| HexIdent::new(m.as_str()))
        .ok_or_else(|| ParseError::malformed(line))?;

    let mut fields = ParsedFields::new(hexident);

    for field in Field::ALL {
        if field == Field::HexIdent {
            continue;
        }
        let raw = match caps.name(field.name()) {
            Some(m) if !m.as_str().is_empty() => m.as_str(),
            _ => continue,
        };
        if let Some(value) = normalize(field, raw).ok_or_else(|| ParseError::malformed(line))? {
            fields.insert(field, value);
        }
    }

    Ok(fields)
}

/// Convert one raw value. `Some(None)` means the value normalized to
/// nothing (a blank callsign) and is dropped; `None` means it is invalid.
fn normalize(field: Field, raw: &str) -> Option<Option<FieldValue>> {
    let value = match field.kind() {
        FieldKind::Integer => FieldValue::Integer(raw.parse().ok()?),
        FieldKind::Float => {
            let v: f64 = raw.parse().ok()?;
            if !v.is_finite() {
                return None;
            }
            FieldValue::Float(v)
        }
        FieldKind::Text => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Some(None);
            }
            FieldValue::Text(trimmed.to_string())
        }
        FieldKind::Flag => FieldValue::Bool(raw == "-1"),
        FieldKind::Raw => FieldValue::Text(raw.to_string()),
    };
    Some(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0";

    #[test]
    fn test_parse_full_message() {
        let fields = parse_message(SAMPLE).unwrap();

        assert_eq!(fields.hexident().as_str(), "4CA2C5");
        assert_eq!(fields.get(Field::Transmission), Some(&FieldValue::Integer(3)));
        assert_eq!(fields.get(Field::Callsign), Some(&FieldValue::Text("TEST123".into())));
        assert_eq!(fields.get(Field::Altitude), Some(&FieldValue::Integer(5000)));
        assert_eq!(fields.get(Field::GroundSpeed), Some(&FieldValue::Integer(250)));
        assert_eq!(fields.get(Field::Latitude), Some(&FieldValue::Float(51.5)));
        assert_eq!(fields.get(Field::Longitude), Some(&FieldValue::Float(-0.1)));
        assert_eq!(fields.get(Field::Squawk), Some(&FieldValue::Text("1234".into())));
        assert_eq!(fields.get(Field::GeneratedDate), Some(&FieldValue::Text("2024/01/01".into())));
        assert_eq!(fields.get(Field::GeneratedTime), Some(&FieldValue::Text("10:00:00.000".into())));
        assert_eq!(fields.get(Field::Alert), Some(&FieldValue::Bool(false)));
        // hexident is carried separately
        assert_eq!(fields.len(), 20);
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse_message(SAMPLE).unwrap(), parse_message(SAMPLE).unwrap());
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        let line = "MSG,5,1,1,40621D,1,2024/01/01,10:00:01.000,2024/01/01,10:00:01.000,,36000,,,,,,,0,,0,0";
        let fields = parse_message(line).unwrap();

        assert_eq!(fields.get(Field::Altitude), Some(&FieldValue::Integer(36000)));
        assert!(fields.get(Field::Callsign).is_none());
        assert!(fields.get(Field::Latitude).is_none());
        assert!(fields.get(Field::Squawk).is_none());
        assert!(fields.get(Field::Emergency).is_none());
        assert_eq!(fields.get(Field::Alert), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_flags() {
        let line = "MSG,6,1,1,40621D,1,2024/01/01,10:00:01.000,2024/01/01,10:00:01.000,,,,,,,,7700,-1,-1,0,1";
        let fields = parse_message(line).unwrap();

        assert_eq!(fields.get(Field::Alert), Some(&FieldValue::Bool(true)));
        assert_eq!(fields.get(Field::Emergency), Some(&FieldValue::Bool(true)));
        assert_eq!(fields.get(Field::Spi), Some(&FieldValue::Bool(false)));
        // only -1 is true
        assert_eq!(fields.get(Field::OnGround), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_callsign_is_trimmed() {
        let line = "MSG,1,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,EZY12   ,,,,,,,,,,,";
        let fields = parse_message(line).unwrap();
        assert_eq!(fields.get(Field::Callsign), Some(&FieldValue::Text("EZY12".into())));

        let blank = "MSG,1,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,   ,,,,,,,,,,,";
        assert!(parse_message(blank).unwrap().get(Field::Callsign).is_none());
    }

    #[test]
    fn test_negative_values() {
        let line = "MSG,4,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,,,420,-12,,,-1088,,,,,";
        let fields = parse_message(line).unwrap();

        assert_eq!(fields.get(Field::Track), Some(&FieldValue::Integer(-12)));
        assert_eq!(fields.get(Field::VerticalRate), Some(&FieldValue::Integer(-1088)));
    }

    #[test]
    fn test_rejects_malformed_lines() {
        let bad = [
            "",
            "garbage",
            // other SBS message types
            "AIR,,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000",
            // missing a field
            "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0",
            // extra field
            "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0,0",
            // lowercase hex
            "MSG,3,1,1,4ca2c5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0",
            // letters in altitude
            "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5O00,250,90,51.5,-0.1,0,1234,0,0,0,0",
            // empty hexident
            "MSG,3,1,1,,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,TEST123,5000,250,90,51.5,-0.1,0,1234,0,0,0,0",
        ];

        for line in bad {
            assert_eq!(
                parse_message(line),
                Err(ParseError::MalformedMessage { line: line.to_string() }),
                "accepted {line:?}"
            );
        }
    }

    #[test]
    fn test_rejects_unconvertible_values() {
        let bad_track = "MSG,4,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,,,420,--,,,,,,,,";
        let bad_lat = "MSG,3,1,1,4CA2C5,1,2024/01/01,10:00:00.000,2024/01/01,10:00:00.000,,,,,1.2.3,-0.1,,,,,,";

        assert!(parse_message(bad_track).is_err());
        assert!(parse_message(bad_lat).is_err());
    }
}

//! InfluxDB line protocol encoding.
//!
//! ```text
//! measurement,tag=value,tag=value field=value,field=value timestamp
//! ```

use crate::types::FieldValue;
use std::fmt::Write;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error("Point for {measurement} has no fields")]
    NoFields { measurement: String },
}

/// One time series sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub tags: Vec<(&'static str, String)>,
    pub fields: Vec<(&'static str, FieldValue)>,
    /// Unix seconds
    pub timestamp: i64,
}

impl Point {
    pub fn new(timestamp: i64) -> Self {
        Self {
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.tags.push((key, value.into()));
        self
    }

    /// Add a field if a value is present.
    pub fn field(mut self, key: &'static str, value: Option<FieldValue>) -> Self {
        if let Some(value) = value {
            self.fields.push((key, value));
        }
        self
    }
}

/// Encode a single point as one line (without a trailing newline).
pub fn encode_point(measurement: &str, point: &Point) -> Result<String, EncodeError> {
    if point.fields.is_empty() {
        return Err(EncodeError::NoFields {
            measurement: measurement.to_string(),
        });
    }

    let mut line = String::with_capacity(128);
    escape_into(&mut line, measurement, &[',', ' ']);

    for (key, value) in &point.tags {
        line.push(',');
        escape_into(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        escape_into(&mut line, value, &[',', '=', ' ']);
    }

    for (i, (key, value)) in point.fields.iter().enumerate() {
        line.push(if i == 0 { ' ' } else { ',' });
        escape_into(&mut line, key, &[',', '=', ' ']);
        line.push('=');
        encode_value(&mut line, value);
    }

    // Writing to a String cannot fail
    let _ = write!(line, " {}", point.timestamp);
    Ok(line)
}

/// Encode a batch, one point per line. Points without fields are refused.
pub fn encode_batch(measurement: &str, points: &[Point]) -> Result<String, EncodeError> {
    let lines = points
        .iter()
        .map(|p| encode_point(measurement, p))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

fn encode_value(out: &mut String, value: &FieldValue) {
    match value {
        FieldValue::Bool(v) => out.push(if *v { 't' } else { 'f' }),
        FieldValue::Integer(v) => {
            let _ = write!(out, "{}i", v);
        }
        FieldValue::Float(v) => {
            let _ = write!(out, "{}", v);
        }
        FieldValue::Text(v) => {
            out.push('"');
            escape_into(out, v, &['"', '\\']);
            out.push('"');
        }
    }
}

fn escape_into(out: &mut String, s: &str, special: &[char]) {
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

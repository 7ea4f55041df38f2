//! Time handling for source archives and the cube's temporal axis.
//!
//! Source files declare their time axes CF-style: a numeric value array, a
//! units string of the form `"<unit> since <epoch>"`, and a calendar name.
//! Decoding always yields naive-UTC timestamps (`DateTime<Utc>` with no
//! local-time conversions anywhere).

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A half-open time interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: &DateTime<Utc>) -> bool {
        t >= &self.start && t < &self.end
    }
}

/// Calendar systems supported for time-axis decoding.
///
/// Only Gregorian-family calendars map onto chrono's proleptic-Gregorian
/// arithmetic; callers treat anything else as a best-effort fallback rather
/// than an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Calendar {
    Gregorian,
}

impl Calendar {
    /// Map a declared calendar name to a supported calendar, if any.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "standard" | "gregorian" | "proleptic_gregorian" => Some(Calendar::Gregorian),
            _ => None,
        }
    }
}

/// The `<unit>` part of a CF units string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }
}

/// Parsed CF time units: `"<unit> since <epoch>"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    unit: TimeUnit,
    epoch: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse a units string such as `"hours since 1900-01-01 00:00:0.0"`.
    pub fn parse(units: &str) -> Result<Self, TimeUnitsParseError> {
        let mut parts = units.splitn(2, " since ");
        let unit_str = parts
            .next()
            .ok_or_else(|| TimeUnitsParseError::InvalidFormat(units.to_string()))?;
        let epoch_str = parts
            .next()
            .ok_or_else(|| TimeUnitsParseError::InvalidFormat(units.to_string()))?;

        let unit = match unit_str.trim().to_lowercase().as_str() {
            "seconds" | "second" | "s" => TimeUnit::Seconds,
            "minutes" | "minute" | "min" => TimeUnit::Minutes,
            "hours" | "hour" | "h" | "hr" => TimeUnit::Hours,
            "days" | "day" | "d" => TimeUnit::Days,
            other => return Err(TimeUnitsParseError::UnsupportedUnit(other.to_string())),
        };

        let epoch = parse_epoch(epoch_str.trim())
            .ok_or_else(|| TimeUnitsParseError::InvalidEpoch(epoch_str.to_string()))?;

        Ok(Self { unit, epoch })
    }

    /// Decode one numeric time value to an absolute timestamp.
    ///
    /// Fractional values are honored to millisecond precision.
    pub fn decode(&self, value: f64) -> DateTime<Utc> {
        let millis = (value * self.unit.seconds() * 1000.0).round() as i64;
        self.epoch + Duration::milliseconds(millis)
    }
}

fn parse_epoch(s: &str) -> Option<DateTime<Utc>> {
    // Epoch spellings seen in the wild range from full datetimes down to a
    // bare date, including truncated seconds like "00:00:0.0".
    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
    ];

    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0)?));
    }

    None
}

/// Truncate a timestamp to midnight of its day.
pub fn truncate_to_day(t: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&t.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default())
}

#[derive(Debug, thiserror::Error)]
pub enum TimeUnitsParseError {
    #[error("invalid time units: {0}. Expected '<unit> since <epoch>'")]
    InvalidFormat(String),

    #[error("unsupported time unit: {0}")]
    UnsupportedUnit(String),

    #[error("invalid epoch in time units: {0}")]
    InvalidEpoch(String),
}

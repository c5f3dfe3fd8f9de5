//! Timestamps sent by the War Dragons API.
//!
//! The server uses two encodings for instants: [`Epoch`] in seconds since the
//! Unix epoch and [`PgTimestamp`] in milliseconds. Both implement [`ApiTime`]
//! and display as a humanized age (`"1h 2m 3s ago"`).

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::wd::lenient::LenientNumber;

/// Errors raised when building a timestamp from a raw number.
#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    /// The value is NaN or infinite.
    #[error("timestamp {0} is not a finite number")]
    NotFinite(f64),
    /// The value is too far from the epoch to be represented.
    #[error("timestamp {0} is out of range")]
    OutOfRange(f64),
}

/// Common view over the timestamp encodings of the api.
pub trait ApiTime {
    /// Whole seconds since the Unix epoch.
    fn unix_seconds(&self) -> i64;

    /// The instant, truncated to the second.
    fn time(&self) -> DateTime<Utc> {
        // values are range checked when built
        DateTime::from_timestamp(self.unix_seconds(), 0).unwrap_or_default()
    }

    /// Elapsed time between the instant and `now`, as `"<duration> ago"`.
    ///
    /// The duration is truncated to whole seconds. An instant after `now`
    /// gives `"0s ago"`.
    fn age_at(&self, now: DateTime<Utc>) -> String {
        let elapsed = now.timestamp() - self.unix_seconds();
        let elapsed = Duration::from_secs(u64::try_from(elapsed).unwrap_or(0));
        format!("{} ago", humantime::format_duration(elapsed))
    }

    /// Elapsed time between the instant and the current time.
    fn age(&self) -> String {
        self.age_at(Utc::now())
    }
}

fn checked_seconds(raw: f64, seconds: f64) -> Result<i64, TimeError> {
    if !raw.is_finite() {
        return Err(TimeError::NotFinite(raw));
    }
    let seconds = seconds.trunc();
    if seconds < i64::MIN as f64 || seconds >= i64::MAX as f64 {
        return Err(TimeError::OutOfRange(raw));
    }
    let seconds = seconds as i64;
    DateTime::from_timestamp(seconds, 0)
        .map(|_| seconds)
        .ok_or(TimeError::OutOfRange(raw))
}

/// Instant encoded in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    raw: f64,
    seconds: i64,
}

impl Epoch {
    /// Builds an [`Epoch`] from a number of seconds.
    pub fn new(seconds: f64) -> Result<Self, TimeError> {
        Ok(Epoch {
            raw: seconds,
            seconds: checked_seconds(seconds, seconds)?,
        })
    }

    /// The value as sent by the server.
    pub fn raw(&self) -> f64 {
        self.raw
    }
}

impl ApiTime for Epoch {
    fn unix_seconds(&self) -> i64 {
        self.seconds
    }
}

/// Instant encoded in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PgTimestamp {
    raw: f64,
    seconds: i64,
}

impl PgTimestamp {
    /// Builds a [`PgTimestamp`] from a number of milliseconds.
    pub fn new(millis: f64) -> Result<Self, TimeError> {
        Ok(PgTimestamp {
            raw: millis,
            seconds: checked_seconds(millis, millis / 1000.0)?,
        })
    }

    /// The value as sent by the server.
    pub fn raw(&self) -> f64 {
        self.raw
    }
}

impl ApiTime for PgTimestamp {
    fn unix_seconds(&self) -> i64 {
        self.seconds
    }
}

impl<'de> Deserialize<'de> for Epoch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let LenientNumber(raw) = LenientNumber::deserialize(deserializer)?;
        Epoch::new(raw).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for PgTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let LenientNumber(raw) = LenientNumber::deserialize(deserializer)?;
        PgTimestamp::new(raw).map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.age())
    }
}

impl fmt::Display for PgTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.age())
    }
}

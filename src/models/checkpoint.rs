//! The persisted "processed through" instant.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Timelike, Utc};
use crate::error::{AppError, Result};

/// Instant through which change events are known to be processed.
///
/// Held at microsecond precision, the precision of the on-disk format, so a
/// value always survives a save/load cycle unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(DateTime<Utc>);

impl Checkpoint {
    /// Wrap a timestamp, dropping anything below a microsecond.
    pub fn new(at: DateTime<Utc>) -> Self {
        let micros = at.nanosecond() / 1_000 * 1_000;
        Self(at.with_nanosecond(micros).unwrap_or(at))
    }

    /// The current instant.
    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Midnight UTC at the start of `date`.
    pub fn start_of_day(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN).and_utc())
    }

    /// Midnight UTC today; the window used when nothing was stored yet.
    pub fn start_of_today() -> Self {
        Self::start_of_day(Utc::now().date_naive())
    }

    /// Parse the stored representation (any RFC 3339 timestamp).
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        DateTime::parse_from_rfc3339(text)
            .map(|at| Self::new(at.with_timezone(&Utc)))
            .map_err(|e| AppError::checkpoint(format!("cannot parse '{text}': {e}")))
    }

    /// Stored representation, e.g. `2024-01-01T00:00:00.000000Z`.
    pub fn format(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Calendar date, the granularity of the provider's `updated_since` filter.
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Whether `at` lies strictly after this checkpoint.
    pub fn precedes(&self, at: &DateTime<Utc>) -> bool {
        self.0 < *at
    }
}

impl From<DateTime<Utc>> for Checkpoint {
    fn from(at: DateTime<Utc>) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

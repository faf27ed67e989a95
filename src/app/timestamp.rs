//! Archive timestamp validation and decomposition
//!
//! Archive requests are keyed by a `YYYYMMDD-HHMM` string. The shape check is a
//! pure predicate; [`Timestamp`] is the parsed form that the URL builders read
//! the date and hour from. The minute is carried along but never range checked
//! since no endpoint uses it.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

const DATE_LEN: usize = 8;
const TIME_LEN: usize = 4;
const TIMESTAMP_LEN: usize = DATE_LEN + 1 + TIME_LEN;

/// Returns true iff `input` is exactly eight digits, a hyphen and four digits
pub fn is_valid_timestamp(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() == TIMESTAMP_LEN
        && bytes[..DATE_LEN].iter().all(u8::is_ascii_digit)
        && bytes[DATE_LEN] == b'-'
        && bytes[DATE_LEN + 1..].iter().all(u8::is_ascii_digit)
}

/// A shape-checked archive timestamp
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    /// Parse and shape-check a user supplied timestamp
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        if is_valid_timestamp(input) {
            Ok(Self(input.to_string()))
        } else {
            Err(ValidationError::MalformedTimestamp {
                input: input.to_string(),
            })
        }
    }

    /// `YYYYMMDD`
    pub fn date_part(&self) -> &str {
        &self.0[..DATE_LEN]
    }

    /// `HH`
    pub fn hour_part(&self) -> &str {
        &self.0[DATE_LEN + 1..DATE_LEN + 3]
    }

    /// `MM`, unchecked
    pub fn minute_part(&self) -> &str {
        &self.0[DATE_LEN + 3..]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Calendar date and hour as a UTC instant (minute ignored)
    pub fn to_utc_hour(&self) -> Result<DateTime<Utc>, ValidationError> {
        let invalid = || ValidationError::InvalidCalendarDate {
            input: self.0.clone(),
        };
        let date = NaiveDate::parse_from_str(self.date_part(), "%Y%m%d").map_err(|_| invalid())?;
        let hour: u32 = self.hour_part().parse().map_err(|_| invalid())?;
        let time = NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(invalid)?;
        Ok(NaiveDateTime::new(date, time).and_utc())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Range of timestamps the archive can serve
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveWindow {
    /// First archived day, `YYYY-MM-DD`
    pub earliest: Option<NaiveDate>,
    /// Hours to wait after a timestamp before its files are in the archive
    pub delay_hours: Option<u32>,
}

impl ArchiveWindow {
    pub fn is_enabled(&self) -> bool {
        self.earliest.is_some() || self.delay_hours.is_some()
    }

    /// Reject timestamps the archive cannot have yet or never had
    pub fn check(&self, timestamp: &Timestamp, now: DateTime<Utc>) -> Result<(), ValidationError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let requested = timestamp.to_utc_hour()?;

        if let Some(earliest) = self.earliest {
            if requested.date_naive() < earliest {
                return Err(ValidationError::BeforeArchiveStart {
                    earliest: earliest.format("%Y-%m-%d").to_string(),
                });
            }
        }

        if let Some(delay_hours) = self.delay_hours {
            if requested > now - Duration::hours(i64::from(delay_hours)) {
                return Err(ValidationError::TooRecent { delay_hours });
            }
        }

        Ok(())
    }
}

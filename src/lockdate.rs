//! The date-time a container is associated with.
//!
//! Carried as metadata only: decoding never compares it against a clock.

use crate::error::{ErrorCategory, ErrorKind, Result, SnailcryptError};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::fmt;
use std::str::FromStr;

/// Canonical text form, e.g. `2022-11-19T17:00:00+0100`.
pub const LOCKDATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// A date-time with a UTC offset, at whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lockdate(DateTime<FixedOffset>);

impl Lockdate {
    /// Accepts `%Y-%m-%dT%H:%M:%S%z` (`+0100`) as well as RFC 3339
    /// (`+01:00`, `Z`, fractional seconds). Fractional seconds are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_str(text, LOCKDATE_FORMAT)
            .or_else(|_| DateTime::parse_from_rfc3339(text))
            .map_err(|e| {
                SnailcryptError::with_kind_and_source(
                    ErrorCategory::User,
                    ErrorKind::InvalidInput,
                    format!("invalid lockdate {:?}: expected e.g. 2022-11-19T17:00:00+0100", text),
                    e,
                )
            })?;
        Self::new(parsed)
    }

    /// Wraps a date-time, truncating it to whole seconds.
    ///
    /// Fails for years outside 0..=9999 and for offsets that are not whole
    /// minutes, neither of which survives the canonical text form.
    pub fn new(datetime: DateTime<FixedOffset>) -> Result<Self> {
        if !(0..=9999).contains(&datetime.year()) {
            return Err(SnailcryptError::invalid_input(format!(
                "lockdate year {} is outside 0..=9999",
                datetime.year()
            )));
        }
        if datetime.offset().local_minus_utc() % 60 != 0 {
            return Err(SnailcryptError::invalid_input(
                "lockdate offset must be a whole number of minutes",
            ));
        }
        Ok(Self(datetime.with_nanosecond(0).unwrap_or(datetime)))
    }

    /// Parses the canonical form stored inside a container.
    pub(crate) fn from_wire(text: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_str(text, LOCKDATE_FORMAT).map_err(|e| {
            SnailcryptError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::MalformedContainer,
                "container lockdate is not in canonical form",
                e,
            )
        })?;
        Ok(Self(parsed))
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    /// The canonical text form written into containers.
    pub fn to_wire_string(&self) -> String {
        self.0.format(LOCKDATE_FORMAT).to_string()
    }
}

impl fmt::Display for Lockdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LOCKDATE_FORMAT))
    }
}

impl FromStr for Lockdate {
    type Err = SnailcryptError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

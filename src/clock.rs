//! Sources of the current time.
//!
//! Quota counters reset at local midnight and monthly summaries are anchored
//! on the local calendar date, so everything that needs "now" goes through a
//! [Clock] rather than reading the system time directly.

use std::sync::Arc;

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Provides the current local time.
pub trait Clock {
    /// The current time in the local offset.
    fn now(&self) -> OffsetDateTime;

    /// The current local calendar date.
    fn today(&self) -> Date {
        self.now().date()
    }

    /// The local UTC offset at the current time.
    fn offset(&self) -> UtcOffset {
        self.now().offset()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> OffsetDateTime {
        (**self).now()
    }
}

/// A clock that reads the system time and converts it to a named timezone.
#[derive(Debug, Clone)]
pub struct SystemClock {
    timezone: String,
}

impl SystemClock {
    /// Create a clock for `canonical_timezone`, e.g. "Pacific/Auckland".
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the name is not a known timezone.
    pub fn new(canonical_timezone: &str) -> Result<Self, Error> {
        match get_local_offset(canonical_timezone) {
            Some(_) => Ok(Self {
                timezone: canonical_timezone.to_owned(),
            }),
            None => Err(Error::InvalidTimezone(canonical_timezone.to_owned())),
        }
    }

    /// The canonical name of the clock's timezone.
    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        // The name was validated in `new`, UTC is only reachable if the
        // timezone database changes underneath us.
        let offset = get_local_offset(&self.timezone).unwrap_or(UtcOffset::UTC);

        OffsetDateTime::now_utc().to_offset(offset)
    }
}

/// A clock that always reports the same instant.
///
/// Used to pin "today" when replaying a past day and in tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// A clock fixed at midnight on `date` in `offset`.
    pub fn at_midnight(date: Date, offset: UtcOffset) -> Self {
        Self(date.midnight().assume_offset(offset))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Get the current UTC offset of a canonical timezone name.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

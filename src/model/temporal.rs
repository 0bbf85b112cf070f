use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::{EngineError, EngineResult};

const DATE: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");
const DATE_TIME: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
const DATE_TIME_MINUTES: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]");
const CLOCK_TIME: &[time::format_description::FormatItem<'static>] =
    format_description!("[hour]:[minute]");

/// Source of "now" for time-window filters and timestamps written by actions.
pub trait Clock {
    fn now(&self) -> PrimitiveDateTime;
}

/// Local wall clock, falling back to UTC when the local offset is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub PrimitiveDateTime);

impl FixedClock {
    pub fn parse(raw: &str) -> EngineResult<Self> {
        parse_timestamp("now", raw).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}

/// Parses the date encodings found in record data.
///
/// Date-only values resolve to midnight. Values carrying an offset are
/// normalised to UTC; everything else is taken as local wall-clock time.
pub fn parse_timestamp(field: &'static str, raw: &str) -> EngineResult<PrimitiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(date) = Date::parse(trimmed, DATE) {
        return Ok(date.with_time(Time::MIDNIGHT));
    }
    if let Ok(stamp) = PrimitiveDateTime::parse(trimmed, DATE_TIME) {
        return Ok(stamp);
    }
    if let Ok(stamp) = PrimitiveDateTime::parse(trimmed, DATE_TIME_MINUTES) {
        return Ok(stamp);
    }
    if let Ok(stamp) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        let utc = stamp.to_offset(UtcOffset::UTC);
        return Ok(PrimitiveDateTime::new(utc.date(), utc.time()));
    }
    Err(EngineError::invalid_data(field, raw))
}

pub fn parse_date(field: &'static str, raw: &str) -> EngineResult<Date> {
    Date::parse(raw.trim(), DATE).map_err(|_| EngineError::invalid_data(field, raw))
}

pub fn parse_clock_time(field: &'static str, raw: &str) -> EngineResult<Time> {
    Time::parse(raw.trim(), CLOCK_TIME).map_err(|_| EngineError::invalid_data(field, raw))
}

pub fn format_timestamp(stamp: PrimitiveDateTime) -> String {
    stamp
        .format(DATE_TIME)
        .unwrap_or_else(|_| stamp.to_string())
}

pub fn format_date(date: Date) -> String {
    date.format(DATE).unwrap_or_else(|_| date.to_string())
}

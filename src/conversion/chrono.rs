//! Chrono crate type implementations (NaiveDate, NaiveTime, NaiveDateTime, DateTime).
//!
//! JSON result cells carry date/time values as numbers:
//! - `date`: days since 1970-01-01
//! - `time`: seconds since midnight with a fractional part
//! - `timestamp_ntz` / `timestamp_ltz`: epoch seconds with a fractional part
//! - `timestamp_tz`: epoch seconds, a space, then the offset in minutes plus 1440

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc,
};

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::protocol::types::column_type;

use super::{FromValue, Param, ToParam};

/// Nanoseconds per second
const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Offset bias applied to `timestamp_tz` offsets
pub(crate) const TZ_OFFSET_BIAS_MINUTES: i32 = 1440;

/// Parse `[-]seconds[.fraction]` into whole seconds and non-negative nanoseconds.
fn parse_epoch(text: &str) -> Result<(i64, u32)> {
    let invalid = || Error::decode(format!("invalid epoch value: {:?}", text));
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));
    if frac_part.len() > 9 || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let negative = int_part.starts_with('-');
    let secs: i64 = int_part.parse().map_err(|_| invalid())?;
    let mut frac: i128 = 0;
    for b in frac_part.bytes() {
        frac = frac * 10 + i128::from(b - b'0');
    }
    for _ in frac_part.len()..9 {
        frac *= 10;
    }
    let mut total = i128::from(secs) * NANOS_PER_SEC;
    if negative {
        total -= frac;
    } else {
        total += frac;
    }
    let secs = i64::try_from(total.div_euclid(NANOS_PER_SEC)).map_err(|_| invalid())?;
    let nanos = u32::try_from(total.rem_euclid(NANOS_PER_SEC)).map_err(|_| invalid())?;
    Ok((secs, nanos))
}

/// Split a `timestamp_tz` cell into epoch text and offset.
fn parse_tz(text: &str) -> Result<(&str, FixedOffset)> {
    let (epoch, bias) = text
        .split_once(' ')
        .ok_or_else(|| Error::decode(format!("invalid timestamp_tz value: {:?}", text)))?;
    let minutes: i32 = bias
        .trim()
        .parse()
        .map_err(|_| Error::decode(format!("invalid timestamp_tz offset: {:?}", bias)))?;
    let offset = FixedOffset::east_opt((minutes - TZ_OFFSET_BIAS_MINUTES) * 60)
        .ok_or_else(|| Error::decode(format!("timestamp_tz offset out of range: {}", minutes)))?;
    Ok((epoch, offset))
}

fn instant(text: &str) -> Result<DateTime<Utc>> {
    let (secs, nanos) = parse_epoch(text)?;
    DateTime::from_timestamp(secs, nanos).ok_or_else(|| Error::decode("timestamp overflow"))
}

fn is_timestamp(column: &ColumnType) -> bool {
    column.is_type(column_type::TIMESTAMP_NTZ)
        || column.is_type(column_type::TIMESTAMP_LTZ)
        || column.is_type(column_type::TIMESTAMP_TZ)
}

// === NaiveDate ===

impl FromValue for NaiveDate {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::DATE) {
            return Err(Error::decode(format!(
                "cannot decode {} as NaiveDate",
                column.type_
            )));
        }
        let days: i64 = text
            .parse()
            .map_err(|e| Error::decode(format!("invalid date: {}", e)))?;
        TimeDelta::try_days(days)
            .and_then(|d| DateTime::UNIX_EPOCH.date_naive().checked_add_signed(d))
            .ok_or_else(|| Error::decode("date overflow"))
    }
}

impl ToParam for NaiveDate {
    fn to_param(&self) -> Param {
        Param::DateTime(self.and_time(NaiveTime::MIN).and_utc().fixed_offset())
    }
}

// === NaiveTime ===

impl FromValue for NaiveTime {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::TIME) {
            return Err(Error::decode(format!(
                "cannot decode {} as NaiveTime",
                column.type_
            )));
        }
        let (secs, nanos) = parse_epoch(text)?;
        u32::try_from(secs)
            .ok()
            .and_then(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, nanos))
            .ok_or_else(|| Error::decode(format!("invalid time: {:?}", text)))
    }
}

/// Bound as the time of day on 1970-01-01 UTC.
impl ToParam for NaiveTime {
    fn to_param(&self) -> Param {
        Param::DateTime(
            DateTime::UNIX_EPOCH
                .date_naive()
                .and_time(*self)
                .and_utc()
                .fixed_offset(),
        )
    }
}

// === NaiveDateTime ===

impl FromValue for NaiveDateTime {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if column.is_type(column_type::TIMESTAMP_TZ) {
            let (epoch, offset) = parse_tz(text)?;
            return Ok(instant(epoch)?.with_timezone(&offset).naive_local());
        }
        if !is_timestamp(column) {
            return Err(Error::decode(format!(
                "cannot decode {} as NaiveDateTime",
                column.type_
            )));
        }
        Ok(instant(text)?.naive_utc())
    }
}

/// Bound as if it were UTC.
impl ToParam for NaiveDateTime {
    fn to_param(&self) -> Param {
        Param::DateTime(self.and_utc().fixed_offset())
    }
}

// === DateTime ===

impl FromValue for DateTime<Utc> {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if column.is_type(column_type::TIMESTAMP_TZ) {
            let (epoch, _) = parse_tz(text)?;
            return instant(epoch);
        }
        if !is_timestamp(column) {
            return Err(Error::decode(format!(
                "cannot decode {} as DateTime<Utc>",
                column.type_
            )));
        }
        instant(text)
    }
}

impl FromValue for DateTime<FixedOffset> {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if column.is_type(column_type::TIMESTAMP_TZ) {
            let (epoch, offset) = parse_tz(text)?;
            return Ok(instant(epoch)?.with_timezone(&offset));
        }
        DateTime::<Utc>::from_text(column, text).map(|dt| dt.fixed_offset())
    }
}

impl<Tz: TimeZone> ToParam for DateTime<Tz> {
    fn to_param(&self) -> Param {
        Param::DateTime(self.fixed_offset())
    }
}

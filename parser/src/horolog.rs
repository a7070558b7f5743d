//! Horolog (`$H`) timestamp decoding.
//!
//! A Horolog value is `"<days>,<seconds>"`: whole days since 1840-12-31 and
//! seconds since midnight of that day. Decoding works on naive calendar
//! dates only, so results never depend on the host time zone.

use chrono::{Days, NaiveDate};

use crate::ParseError;

/// Horolog day number of 1970-01-01.
pub const EPOCH_DAY_OFFSET: i64 = 47_117;

/// Horolog day number of 9999-12-31. Anything past it is a corrupted record.
pub const MAX_HOROLOG_DAY: i64 = 2_980_013;

const SECONDS_PER_DAY: i64 = 86_400;

/// Day zero of the Horolog calendar.
pub fn horolog_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1840, 12, 31).unwrap_or(NaiveDate::MIN)
}

/// Earliest date that decodes to a real timestamp.
fn threshold_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Calendar date of a Horolog day, `None` for negative or unrepresentable days.
pub fn horolog_date(days: i64) -> Option<NaiveDate> {
    let days = u64::try_from(days).ok()?;
    horolog_epoch().checked_add_days(Days::new(days))
}

/// Decode a Horolog value into Unix epoch seconds.
///
/// Bare day values, the `"0,0"` sentinel and dates before 1970-01-01 decode
/// to `0` without error; journals use those as "unset" placeholders.
pub fn horolog_to_unix(value: &str) -> Result<i64, ParseError> {
    let Some((days, seconds)) = value.split_once(',') else {
        return Ok(0);
    };
    if seconds.trim().is_empty() {
        return Ok(0);
    }

    let days = lenient_int(days);
    let seconds = lenient_int(seconds);
    if days == 0 && seconds == 0 {
        return Ok(0);
    }

    if days > MAX_HOROLOG_DAY {
        return Err(ParseError::TimestampOutOfRange { days });
    }

    match horolog_date(days) {
        Some(date) if date >= threshold_date() => ((days - EPOCH_DAY_OFFSET) * SECONDS_PER_DAY)
            .checked_add(seconds)
            .ok_or(ParseError::TimestampOutOfRange { days }),
        _ => Ok(0),
    }
}

/// Integer parse that reads malformed legacy fields as `0`.
pub fn lenient_int(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}

// Time utility functions

use crate::Error;

use crate::error::{self, HPCError};
use crate::Result;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use std::fmt::{Display, Formatter};
use std::ops::{Add, Deref, Sub};

/// IMF-fixdate, the RFC 1123 profile mandated for HTTP dates.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

enum Time {
    Second,
    Minute,
    Hour,
    Day,
}

impl Time {
    fn to_seconds(&self) -> u64 {
        match self {
            Time::Second => 1,
            Time::Minute => 60,
            Time::Hour => 3600,
            Time::Day => 86400,
        }
    }
}

impl TryFrom<char> for Time {
    type Error = Error;

    fn try_from(time: char) -> std::result::Result<Self, Self::Error> {
        match time {
            's' => Ok(Time::Second),
            'm' => Ok(Time::Minute),
            'h' => Ok(Time::Hour),
            'd' => Ok(Time::Day),
            _ => Err(error::gen(format!(
                "Unknown char time format: {time} - valid types are s, m, h, d"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd)]
pub struct Seconds(u64);

impl Seconds {
    pub const fn new(seconds: u64) -> Self {
        Seconds(seconds)
    }
}

impl Sub<Seconds> for Seconds {
    type Output = Seconds;

    fn sub(self, rhs: Seconds) -> Self::Output {
        Seconds(self.0.saturating_sub(rhs.0))
    }
}

impl Add<Seconds> for Seconds {
    type Output = Seconds;

    fn add(self, rhs: Seconds) -> Self::Output {
        Seconds(self.0 + rhs.0)
    }
}

impl Deref for Seconds {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Seconds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Seconds> for std::time::Duration {
    fn from(seconds: Seconds) -> Self {
        std::time::Duration::from_secs(seconds.0)
    }
}

/// Convert a string with time format to seconds.
/// A string with time format can be anything like:
/// 1s, 2s, 2 seconds, 2 second, 2seconds, 2second, 2 s
/// The same would apply for minutes, hours and days
/// Processing stops at the first non-digit character
fn string_to_seconds(str_fmt: &str) -> Result<Seconds> {
    let mut seconds: u64 = 0;
    let mut digits = 0;
    for c in str_fmt.chars() {
        if let Some(digit) = c.to_digit(10) {
            seconds = seconds
                .checked_mul(10)
                .and_then(|s| s.checked_add(digit as u64))
                .ok_or_else(|| error::gen(format!("{str_fmt:?} is out of range")))?;
            digits += 1;
        } else {
            if c.is_whitespace() {
                continue;
            }
            seconds = seconds
                .checked_mul(Time::try_from(c)?.to_seconds())
                .ok_or_else(|| error::gen(format!("{str_fmt:?} is out of range")))?;
            break;
        }
    }
    if digits == 0 {
        return Err(error::gen(format!("No digits found in {str_fmt:?}")));
    }
    Ok(Seconds(seconds))
}

impl TryFrom<&str> for Seconds {
    type Error = HPCError;

    fn try_from(str_fmt: &str) -> std::result::Result<Self, Self::Error> {
        match string_to_seconds(str_fmt) {
            Ok(seconds) => Ok(seconds),
            Err(err) => Err(HPCError::TimeConversionError(format!(
                "Could not convert {str_fmt} to time format: {err}"
            ))),
        }
    }
}

/// Source of the current time. The cache strategy never reads the system
/// clock directly, so freshness computations can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

impl<T: Clock + ?Sized> Clock for std::sync::Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

/// Parse an RFC 1123 HTTP date such as `Sun, 06 Nov 1994 08:49:37 GMT`.
/// Anything that does not match the format, including a weekday that does
/// not agree with the date, yields `None`.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format(HTTP_DATE_FORMAT).to_string()
}

/// Whole seconds from `now` until `until`, zero if already past.
pub fn seconds_until(now: &DateTime<Utc>, until: &DateTime<Utc>) -> Seconds {
    let remaining = until.signed_duration_since(*now);
    if remaining <= Duration::zero() {
        return Seconds(0);
    }
    Seconds(remaining.num_seconds() as u64)
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_string_to_seconds() {
        let test_table = vec![
            ("1s", Seconds(1)),
            ("2s", Seconds(2)),
            ("2 seconds", Seconds(2)),
            ("30", Seconds(30)),
            ("1m", Seconds(60)),
            ("2 minutes", Seconds(120)),
            ("1h", Seconds(3600)),
            ("1d", Seconds(86400)),
            ("18446744073709551615s", Seconds(u64::MAX)),
        ];
        for (input, expected) in test_table {
            assert_eq!(expected, Seconds::try_from(input).unwrap());
        }
    }

    #[test]
    fn test_string_to_seconds_unknown_unit_is_error() {
        let err = Seconds::try_from("5y").unwrap_err();
        match err {
            HPCError::TimeConversionError(msg) => assert!(msg.contains("5y")),
            _ => panic!("Expected TimeConversionError"),
        }
    }

    #[test]
    fn test_string_to_seconds_out_of_range_is_error() {
        let test_table = vec![
            "99999999999999999999s",
            "18446744073709551616",
            "999999999999999d",
            "18446744073709551615m",
        ];
        for input in test_table {
            match Seconds::try_from(input) {
                Err(HPCError::TimeConversionError(msg)) => {
                    assert!(msg.contains("out of range"), "{msg}")
                }
                other => panic!("Expected TimeConversionError for {input}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_string_to_seconds_without_digits_is_error() {
        assert!(Seconds::try_from("s").is_err());
        assert!(Seconds::try_from("").is_err());
    }

    #[test]
    fn test_seconds_sub_saturates() {
        assert_eq!(Seconds(0), Seconds(5) - Seconds(10));
        assert_eq!(Seconds(5), Seconds(10) - Seconds(5));
    }

    #[test]
    fn test_parse_http_date() {
        let date = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap(), date);
    }

    #[test]
    fn test_parse_http_date_invalid_values() {
        let test_table = vec![
            "",
            "0",
            "-1",
            "tomorrow",
            "Sunday, 06-Nov-94 08:49:37 GMT",
            "Sun Nov  6 08:49:37 1994",
            // weekday does not match the date
            "Mon, 06 Nov 1994 08:49:37 GMT",
            "Sun, 32 Nov 1994 08:49:37 GMT",
        ];
        for value in test_table {
            assert!(parse_http_date(value).is_none(), "parsed {value:?}");
        }
    }

    #[test]
    fn test_format_http_date_round_trips() {
        let date = Utc.with_ymd_and_hms(2024, 1, 13, 19, 50, 23).unwrap();
        let formatted = format_http_date(&date);
        assert_eq!("Sat, 13 Jan 2024 19:50:23 GMT", formatted);
        assert_eq!(Some(date), parse_http_date(&formatted));
    }

    #[test]
    fn test_seconds_until() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Seconds(60), seconds_until(&now, &(now + Duration::seconds(60))));
        assert_eq!(Seconds(0), seconds_until(&now, &(now - Duration::seconds(1))));
        assert_eq!(Seconds(0), seconds_until(&now, &now));
    }
}

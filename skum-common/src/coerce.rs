//! Null-tolerant value coercion
//!
//! Every function here is total: it accepts any store value, including an
//! absent one (`None`) or the store null-marker (`Some(&Scalar::Null)`), and
//! always returns a value of the target type. No-value and unparsable input
//! both resolve to a fallback, which is either supplied by the caller (the
//! `_or` variants) or fixed per type.
//!
//! Callers never null-check or error-check a coerced value. A malformed
//! cell must not be able to fail a run.

use crate::Scalar;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, Offset, TimeZone};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::str::FromStr;
use uuid::Uuid;

/// Naive date-time formats accepted after RFC 3339 fails
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Textual form of a value, `None` when there is no value
fn text_of(value: Option<&Scalar>) -> Option<Cow<'_, str>> {
    value.and_then(Scalar::as_text)
}

// ============================================================================
// String conversion
// ============================================================================

/// Stringify any value; no value becomes the empty string
pub fn to_safe_string(value: Option<&Scalar>) -> String {
    text_of(value).map(Cow::into_owned).unwrap_or_default()
}

/// Stringify any value; no value stays `None`
///
/// Only a missing value or the null-marker produce `None`. Empty text is
/// still a value and comes back as `Some("")`.
pub fn to_safe_string_or_null(value: Option<&Scalar>) -> Option<String> {
    text_of(value).map(Cow::into_owned)
}

/// Pass a string through, folding the empty string into `None`
pub fn to_string_or_null(value: Option<&str>) -> Option<String> {
    match value {
        None | Some("") => None,
        Some(s) => Some(s.to_string()),
    }
}

// ============================================================================
// Numeric conversion
// ============================================================================

/// Parse the trimmed textual form of `value` as `T`, falling back to `default`
///
/// The building block for every numeric conversion below.
pub fn parse_or<T: FromStr>(value: Option<&Scalar>, default: T) -> T {
    text_of(value)
        .and_then(|text| text.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub fn to_safe_i32(value: Option<&Scalar>) -> i32 {
    to_safe_i32_or(value, 0)
}

pub fn to_safe_i32_or(value: Option<&Scalar>, default: i32) -> i32 {
    parse_or(value, default)
}

pub fn to_safe_u32(value: Option<&Scalar>) -> u32 {
    to_safe_u32_or(value, 0)
}

pub fn to_safe_u32_or(value: Option<&Scalar>, default: u32) -> u32 {
    parse_or(value, default)
}

pub fn to_safe_i64(value: Option<&Scalar>) -> i64 {
    parse_or(value, 0)
}

pub fn to_safe_i16(value: Option<&Scalar>) -> i16 {
    parse_or(value, 0)
}

pub fn to_safe_f32(value: Option<&Scalar>) -> f32 {
    to_safe_f32_or(value, 0.0)
}

pub fn to_safe_f32_or(value: Option<&Scalar>, default: f32) -> f32 {
    parse_or(value, default)
}

pub fn to_safe_decimal(value: Option<&Scalar>) -> Decimal {
    to_safe_decimal_or(value, Decimal::ZERO)
}

/// Fixed-point conversion of plain decimal text (`12.50`); exponents are rejected
pub fn to_safe_decimal_or(value: Option<&Scalar>, default: Decimal) -> Decimal {
    parse_or(value, default)
}

// ============================================================================
// Boolean conversion
// ============================================================================

/// Convert to `bool`
///
/// The literals `"0"` and `"1"` are checked before anything else. Otherwise
/// `true`/`false` are accepted in any case; everything else is `false`.
pub fn to_safe_bool(value: Option<&Scalar>) -> bool {
    let Some(text) = text_of(value) else {
        return false;
    };

    match text.as_ref() {
        "0" => false,
        "1" => true,
        other => {
            let other = other.trim();
            other.eq_ignore_ascii_case("true")
        }
    }
}

// ============================================================================
// Date/time conversion
// ============================================================================

/// The minimum representable instant, 0001-01-01T00:00:00
///
/// Fallback for [`to_safe_datetime`].
pub fn min_datetime() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// A parsed date/time, with or without an explicit offset
#[derive(Debug, Clone, Copy)]
enum ParsedDateTime {
    Zoned(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl ParsedDateTime {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();

        if let Ok(zoned) = DateTime::parse_from_rfc3339(text) {
            return Some(Self::Zoned(zoned));
        }
        if let Ok(zoned) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
            return Some(Self::Zoned(zoned));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
                return Some(Self::Naive(naive));
            }
        }

        DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(Self::Naive)
    }

    /// Wall-clock time in the local zone; text without an offset is UTC
    fn to_local(self) -> Option<NaiveDateTime> {
        let utc = match self {
            Self::Zoned(zoned) => zoned.naive_utc(),
            Self::Naive(naive) => naive,
        };
        shift_to_offset(utc, Local.offset_from_utc_datetime(&utc).fix())
    }

    /// Wall-clock time exactly as written
    fn as_written(self) -> NaiveDateTime {
        match self {
            Self::Zoned(zoned) => zoned.naive_local(),
            Self::Naive(naive) => naive,
        }
    }
}

/// Shift a UTC wall-clock time into `offset`, never below [`min_datetime`]
///
/// `None` if the shifted value leaves chrono's range.
fn shift_to_offset(utc: NaiveDateTime, offset: FixedOffset) -> Option<NaiveDateTime> {
    utc.checked_add_signed(chrono::Duration::seconds(i64::from(
        offset.local_minus_utc(),
    )))
    .map(|shifted| shifted.max(min_datetime()))
}

/// Convert to a local wall-clock date/time
///
/// Parse failure, no value, or a conversion that leaves the representable
/// range all produce [`min_datetime`].
pub fn to_safe_datetime(value: Option<&Scalar>) -> NaiveDateTime {
    text_of(value)
        .and_then(|text| ParsedDateTime::parse(&text))
        .and_then(ParsedDateTime::to_local)
        .unwrap_or_else(min_datetime)
}

/// Convert to a date/time as written, with no zone conversion
///
/// Every failure path yields `None`.
pub fn to_safe_nullable_datetime(value: Option<&Scalar>) -> Option<NaiveDateTime> {
    text_of(value)
        .and_then(|text| ParsedDateTime::parse(&text))
        .map(ParsedDateTime::as_written)
}

// ============================================================================
// Identifier conversion
// ============================================================================

/// Convert to a UUID; no value or bad text gives the nil UUID
pub fn to_safe_uuid(value: Option<&Scalar>) -> Uuid {
    text_of(value)
        .and_then(|text| Uuid::parse_str(text.trim()).ok())
        .unwrap_or_else(Uuid::nil)
}

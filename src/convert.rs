//! Value and record converters.
//!
//! A [`ValueConverter`] turns one typed value into the UTF-8 text of a field and back.
//! Formatting writes into a caller-provided byte slice and reports failure when the slice
//! is too small, so writers can retry with a larger buffer without allocating per value.
//!
//! A [`RecordHandler`] maps a whole [`Record`] to a typed row and back.
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::{DisplayConverter, ValueConverter};
//!
//! let mut buffer = [0u8; 8];
//! let written = DisplayConverter.try_format(&1234u32, &mut buffer).unwrap();
//! assert_eq!(&buffer[..written], b"1234");
//!
//! let mut small = [0u8; 2];
//! assert_eq!(DisplayConverter.try_format(&1234u32, &mut small), None);
//!
//! let parsed: Option<u32> = DisplayConverter.try_parse("1234");
//! assert_eq!(parsed, Some(1234));
//! ```

use crate::{Error, Headers, Record, Result, MAX_FIELD_LENGTH};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, Utc};
use num_bigint::BigInt;
use std::fmt::{self, Display, Write};
use std::str::FromStr;

/// Initial formatting buffer length when a converter gives no hint.
const DEFAULT_FORMAT_LENGTH: usize = 64;

/// Formats and parses values of type `T` as field text.
pub trait ValueConverter<T> {
    /// Writes the UTF-8 text of `value` to the start of `destination`.
    ///
    /// Returns the number of bytes written, or `None` if `destination` is too small.
    fn try_format(&self, value: &T, destination: &mut [u8]) -> Option<usize>;

    /// Parses field text; `None` when the text is not a valid `T`.
    fn try_parse(&self, source: &str) -> Option<T>;

    /// Expected formatted length of `value` in bytes, if known in advance.
    fn format_length_hint(&self, _value: &T) -> Option<usize> {
        None
    }
}

/// Maps records to values of type `T` and back.
///
/// # Examples
///
/// ```rust
/// use tabular_stream::{
///     DisplayConverter, Headers, Record, RecordHandler, Result,
/// };
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// struct PointHandler;
///
/// impl RecordHandler<Point> for PointHandler {
///     fn read(&self, record: &Record, _headers: Option<&Headers>) -> Result<Point> {
///         Ok(Point {
///             x: record.parse(0, &DisplayConverter)?,
///             y: record.parse(1, &DisplayConverter)?,
///         })
///     }
///
///     fn write(&self, value: &Point, fields: &mut Vec<String>) -> Result<()> {
///         fields.push(value.x.to_string());
///         fields.push(value.y.to_string());
///         Ok(())
///     }
/// }
///
/// let record: Record = ["3", "-4"].into_iter().collect();
/// let point = PointHandler.read(&record, None).unwrap();
/// assert_eq!((point.x, point.y), (3, -4));
/// ```
pub trait RecordHandler<T> {
    /// Builds a value from a value record.
    fn read(&self, record: &Record, headers: Option<&Headers>) -> Result<T>;

    /// Appends the fields of `value` to `fields`.
    fn write(&self, value: &T, fields: &mut Vec<String>) -> Result<()>;
}

/// Converter for any type implementing [`Display`] and [`FromStr`].
///
/// Covers integers, floats, `bool`, `char`, `String` and `num_bigint::BigInt`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisplayConverter;

impl<T> ValueConverter<T> for DisplayConverter
where
    T: Display + FromStr,
{
    fn try_format(&self, value: &T, destination: &mut [u8]) -> Option<usize> {
        write_display(value, destination)
    }

    fn try_parse(&self, source: &str) -> Option<T> {
        source.parse().ok()
    }
}

/// `fmt::Write` over a fixed byte slice; overflowing it is a formatting error.
struct SliceWriter<'a> {
    destination: &'a mut [u8],
    written: usize,
}

impl Write for SliceWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.written + s.len();
        let target = self.destination.get_mut(self.written..end).ok_or(fmt::Error)?;
        target.copy_from_slice(s.as_bytes());
        self.written = end;
        Ok(())
    }
}

fn write_display<T: Display + ?Sized>(value: &T, destination: &mut [u8]) -> Option<usize> {
    let mut writer = SliceWriter {
        destination,
        written: 0,
    };
    write!(writer, "{}", value).ok()?;
    Some(writer.written)
}

/// Rejects formats `chrono` cannot parse or cannot render for `sample`.
fn check_format<D: Display>(format: &str, sample: D) -> Result<()> {
    let mut rendered = String::new();
    if StrftimeItems::new(format).any(|item| item == Item::Error)
        || write!(rendered, "{}", sample).is_err()
    {
        return Err(Error::invalid_argument(&format!(
            "invalid date/time format '{}'",
            format
        )));
    }
    Ok(())
}

/// Converter for UTC timestamps using a `chrono` format string.
///
/// Parsing accepts any offset and converts to UTC, so the format should carry one
/// (`%z` or `%:z`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateTimeConverter {
    format: String,
}

impl DateTimeConverter {
    /// RFC 3339 with fractional seconds when present, e.g. `2024-05-01T10:30:00+00:00`.
    pub const RFC3339: &'static str = "%Y-%m-%dT%H:%M:%S%.f%:z";

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `format` is not a valid `chrono` format.
    pub fn new(format: &str) -> Result<Self> {
        check_format(format, DateTime::<Utc>::default().format(format))?;
        Ok(DateTimeConverter {
            format: format.to_string(),
        })
    }

    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for DateTimeConverter {
    fn default() -> Self {
        DateTimeConverter {
            format: Self::RFC3339.to_string(),
        }
    }
}

impl ValueConverter<DateTime<Utc>> for DateTimeConverter {
    fn try_format(&self, value: &DateTime<Utc>, destination: &mut [u8]) -> Option<usize> {
        write_display(&value.format(&self.format), destination)
    }

    fn try_parse(&self, source: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_str(source, &self.format)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }

    fn format_length_hint(&self, _value: &DateTime<Utc>) -> Option<usize> {
        Some(40)
    }
}

/// Converter for calendar dates, `%Y-%m-%d` by default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NaiveDateConverter {
    format: String,
}

impl NaiveDateConverter {
    pub const ISO8601: &'static str = "%Y-%m-%d";

    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `format` is not a valid `chrono` format.
    pub fn new(format: &str) -> Result<Self> {
        check_format(format, NaiveDate::default().format(format))?;
        Ok(NaiveDateConverter {
            format: format.to_string(),
        })
    }

    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }
}

impl Default for NaiveDateConverter {
    fn default() -> Self {
        NaiveDateConverter {
            format: Self::ISO8601.to_string(),
        }
    }
}

impl ValueConverter<NaiveDate> for NaiveDateConverter {
    fn try_format(&self, value: &NaiveDate, destination: &mut [u8]) -> Option<usize> {
        write_display(&value.format(&self.format), destination)
    }

    fn try_parse(&self, source: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(source, &self.format).ok()
    }
}

/// Converter for arbitrary precision integers in base 10.
///
/// Unlike [`DisplayConverter`], it sizes the formatting buffer from the bit length, so
/// large values are formatted on the first attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BigIntConverter;

impl ValueConverter<BigInt> for BigIntConverter {
    fn try_format(&self, value: &BigInt, destination: &mut [u8]) -> Option<usize> {
        write_display(value, destination)
    }

    fn try_parse(&self, source: &str) -> Option<BigInt> {
        BigInt::parse_bytes(source.as_bytes(), 10)
    }

    fn format_length_hint(&self, value: &BigInt) -> Option<usize> {
        // log10(2) < 0.302; one more for the sign and one for rounding
        let digits = value.bits().saturating_mul(302) / 1000;
        usize::try_from(digits).ok().map(|digits| digits + 2)
    }
}

/// Formats `value` into `scratch`, growing it until the converter succeeds.
///
/// Starts from the converter's hint (or a small default) and doubles the length up to
/// [`MAX_FIELD_LENGTH`].
pub(crate) fn format_with<'s, T, C>(
    converter: &C,
    value: &T,
    scratch: &'s mut Vec<u8>,
) -> Result<&'s str>
where
    C: ValueConverter<T> + ?Sized,
{
    let mut length = converter
        .format_length_hint(value)
        .unwrap_or(DEFAULT_FORMAT_LENGTH)
        .max(1);
    if length > MAX_FIELD_LENGTH {
        return Err(Error::unsupported_field_length());
    }
    let written = loop {
        if scratch.len() < length {
            scratch.resize(length, 0);
        }
        if let Some(written) = converter.try_format(value, &mut scratch[..length]) {
            break written;
        }
        if length == MAX_FIELD_LENGTH {
            return Err(Error::conversion(format!(
                "value could not be formatted within {} bytes",
                MAX_FIELD_LENGTH
            )));
        }
        length = length.saturating_mul(2).min(MAX_FIELD_LENGTH);
    };
    std::str::from_utf8(&scratch[..written]).map_err(Error::conversion)
}

//! # tabular_stream
//!
//! Streaming reader and writer for delimiter-separated text (CSV, TSV and their
//! relatives) with a configurable dialect.
//!
//! ## Key Features
//!
//! - **Any dialect**: terminator of one or two characters, delimiter, quote, a distinct
//!   escape character and an optional annotation (comment) prefix
//! - **Streaming**: fixed-size buffers, fields are recognized across chunk boundaries
//! - **Zero-copy fields**: unescaped fields are slices of the decoded buffer
//! - **Encodings**: UTF-8, UTF-16 and the legacy encodings of `encoding_rs`, with byte
//!   order mark detection and emission
//! - **Blocking and async**: every I/O method has an `_async` twin over `tokio` streams
//! - **No Unsafe Code**: written entirely in safe Rust
//!
//! ## Quick Start
//!
//! ```rust
//! use tabular_stream::{from_str, to_string, Dialect};
//!
//! let dialect = Dialect::default();
//! let records = from_str("name,quote\r\nAda,\"said \"\"hi\"\"\"\r\n", &dialect).unwrap();
//! assert_eq!(records[1].get(1), Some("said \"hi\""));
//!
//! let text = to_string(&records, &dialect).unwrap();
//! assert_eq!(text, "name,quote\r\nAda,\"said \"\"hi\"\"\"\r\n");
//! ```
//!
//! ### Field by Field
//!
//! [`TabularFieldReader`] and [`TabularFieldWriter`] work one field at a time and never
//! allocate per field:
//!
//! ```rust
//! use tabular_stream::{Dialect, PositionType, TabularFieldReader, TabularOptions};
//!
//! let dialect = Dialect::new("\n", ';', '\'').unwrap();
//! let input: &[u8] = b"1;'a;b'\n2;c\n";
//! let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
//!
//! let mut sum = 0;
//! while reader.pick_record().unwrap() {
//!     reader.read_field().unwrap();
//!     sum += reader.value().parse::<i32>().unwrap();
//!     while reader.skip_field().unwrap() {}
//! }
//! assert_eq!(sum, 3);
//! assert_eq!(reader.position_type(), PositionType::EndOfStream);
//! ```
//!
//! ### Async Streams
//!
//! With the default `tokio` feature, the same types accept `AsyncRead`/`AsyncWrite`
//! streams through methods such as
//! [`pick_record_async`](TabularFieldReader::pick_record_async) and
//! [`finish_async`](TabularFieldWriter::finish_async). Dropping a pending future cancels
//! the operation; the only suspension points are stream reads and writes.
//!
//! ## Error Handling
//!
//! Malformed input yields [`Error::Format`] with the character offset of the offending
//! character. A reader that reported a format error keeps reporting it. Stream errors
//! pass through as [`Error::Io`].
//!
//! ## Logging
//!
//! The crate logs through the [`log`](https://docs.rs/log) facade: lifecycle events at
//! `debug` level and buffer refills and flushes at `trace` level. No logger is installed.
//!
//! ## Format
//!
//! See the [`grammar`] module for the accepted syntax.

pub mod codec;
pub mod convert;
pub mod dialect;
pub mod error;
pub mod field;
pub mod field_reader;
pub mod field_writer;
pub mod formatter;
pub mod grammar;
pub mod lexer;
pub mod options;
pub mod reader;
pub mod record;
pub mod writer;

pub use convert::{
    BigIntConverter, DateTimeConverter, DisplayConverter, NaiveDateConverter, RecordHandler,
    ValueConverter,
};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use field::{BufferKind, Field, FieldType, PositionType};
pub use field_reader::TabularFieldReader;
pub use field_writer::TabularFieldWriter;
pub use lexer::ParserState;
pub use options::{TabularOptions, DEFAULT_BUFFER_SIZE};
pub use reader::{Records, TabularReader};
pub use record::{Headers, Record, RecordKind};
pub use writer::TabularWriter;

use std::io;

/// Longest field, in characters, that readers and writers accept.
pub const MAX_FIELD_LENGTH: usize = 0x7FFF_FFC7;

/// Reads every record of `text`, annotations included.
///
/// # Examples
///
/// ```rust
/// use tabular_stream::{from_str, Dialect};
///
/// let records = from_str("a,b\r\nc", &Dialect::default()).unwrap();
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[1].to_vec(), vec!["c"]);
/// ```
///
/// # Errors
///
/// Returns [`Error::Format`] if the text is malformed for the dialect.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str(text: &str, dialect: &Dialect) -> Result<Vec<Record>> {
    from_reader(text.as_bytes(), dialect, &TabularOptions::new())
}

/// Reads every record from a stream.
///
/// With `options.has_header`, the header row is consumed and not returned.
///
/// # Errors
///
/// Returns an error if the stream fails or its content is malformed.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(reader: R, dialect: &Dialect, options: &TabularOptions) -> Result<Vec<Record>>
where
    R: io::Read,
{
    let mut reader = TabularReader::new(reader, dialect, options)?;
    let records: Result<Vec<Record>> = reader.records().collect();
    records
}

/// Writes `records` to a string, each record terminated.
///
/// # Examples
///
/// ```rust
/// use tabular_stream::{to_string, Dialect, Record};
///
/// let records = vec![
///     Record::annotation("totals"),
///     ["x", "1,5"].into_iter().collect::<Record>(),
/// ];
/// let dialect = Dialect::new("\n", ',', '"')
///     .and_then(|d| d.with_annotation_prefix('#'))
///     .unwrap();
/// assert_eq!(to_string(&records, &dialect).unwrap(), "#totals\nx,\"1,5\"\n");
/// ```
///
/// # Errors
///
/// Returns an error if an annotation record cannot be written in the dialect.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string(records: &[Record], dialect: &Dialect) -> Result<String> {
    let bytes = to_writer(Vec::new(), records, dialect, &TabularOptions::new())?;
    String::from_utf8(bytes).map_err(Error::conversion)
}

/// Writes `records` to a stream and returns it once everything is flushed.
///
/// # Errors
///
/// Returns an error if writing to the stream fails or a record cannot be written.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(writer: W, records: &[Record], dialect: &Dialect, options: &TabularOptions) -> Result<W>
where
    W: io::Write,
{
    let mut writer = TabularWriter::new(writer, dialect, options)?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()
}

//! Field-by-field reading.
//!
//! [`TabularFieldReader`] walks a stream one field at a time through the
//! [`PositionType`] state machine:
//!
//! ```text
//! StartOfStream -> StartOfRecord -> (Delimiter ->)* EndOfRecord -> StartOfRecord ...
//!                                                              \-> EndOfStream
//! ```
//!
//! Every blocking method has an `_async` twin for `tokio::io::AsyncRead` streams. Both
//! drive the same pure step functions and only differ in how the codec is refilled.
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::{Dialect, FieldType, TabularFieldReader, TabularOptions};
//!
//! let dialect = Dialect::new("\n", ',', '"')
//!     .and_then(|d| d.with_annotation_prefix('#'))
//!     .unwrap();
//! let input: &[u8] = b"#note\nx,y\n";
//! let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
//!
//! assert!(reader.pick_record().unwrap());
//! assert!(reader.read_field().unwrap());
//! assert_eq!(reader.field_type(), FieldType::Annotation);
//! assert_eq!(reader.value(), "note");
//!
//! assert!(reader.pick_record().unwrap());
//! let mut fields = Vec::new();
//! while reader.read_field().unwrap() {
//!     fields.push(reader.value().to_string());
//! }
//! assert_eq!(fields, vec!["x", "y"]);
//! assert!(!reader.pick_record().unwrap());
//! ```

use crate::codec::TextReadBuffer;
use crate::convert::ValueConverter;
use crate::field::{BufferKind, Field, FieldType, PositionType};
use crate::lexer::{FieldInfo, Lexer, ParserState, Separator, Token};
use crate::{Dialect, Error, Result, TabularOptions};
use log::debug;
use std::io::{Read, Seek};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldSlot {
    None,
    Shared { start: usize, end: usize },
    Private,
}

/// Pull-based reader over the fields of a tabular stream.
pub struct TabularFieldReader<R> {
    inner: R,
    lexer: Lexer,
    buffer: TextReadBuffer,
    cursor: ParserState,
    position_type: PositionType,
    field_type: FieldType,
    slot: FieldSlot,
    private: String,
    trim_whitespace: bool,
    position: u64,
    fields_read: u64,
    records_read: u64,
    failure: Option<Error>,
}

impl<R> TabularFieldReader<R> {
    /// Creates a reader for a stream positioned at its start.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] if the options are invalid.
    pub fn new(inner: R, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Self::build(inner, dialect, options, true)
    }

    pub(crate) fn build(
        inner: R,
        dialect: &Dialect,
        options: &TabularOptions,
        at_start: bool,
    ) -> Result<Self> {
        options.validate()?;
        debug!(
            "field reader: encoding {}, buffer {} bytes, at start: {}",
            options.encoding.name(),
            options.buffer_size,
            at_start
        );
        Ok(TabularFieldReader {
            inner,
            lexer: Lexer::new(dialect),
            buffer: TextReadBuffer::new(options.encoding, options.buffer_size, at_start),
            cursor: ParserState::default(),
            position_type: PositionType::StartOfStream,
            field_type: FieldType::None,
            slot: FieldSlot::None,
            private: String::new(),
            trim_whitespace: options.trim_whitespace,
            position: 0,
            fields_read: 0,
            records_read: 0,
            failure: None,
        })
    }

    #[must_use]
    pub fn position_type(&self) -> PositionType {
        self.position_type
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Characters consumed from the decoded stream so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    #[must_use]
    pub fn bytes_consumed(&self) -> u64 {
        self.buffer.bytes_consumed()
    }

    #[must_use]
    pub fn fields_read(&self) -> u64 {
        self.fields_read
    }

    #[must_use]
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// The lexer cursor for the field currently being recognized.
    #[must_use]
    pub fn parser_state(&self) -> ParserState {
        self.cursor
    }

    #[must_use]
    pub fn buffer_kind(&self) -> BufferKind {
        match self.slot {
            FieldSlot::None => BufferKind::None,
            FieldSlot::Shared { .. } => BufferKind::Shared,
            FieldSlot::Private => BufferKind::Private,
        }
    }

    /// The last field read, or `None` if it was skipped or nothing was read yet.
    #[must_use]
    pub fn field(&self) -> Option<Field<'_>> {
        match self.slot {
            FieldSlot::None => None,
            FieldSlot::Shared { start, end } => Some(Field::Shared(&self.buffer.text()[start..end])),
            FieldSlot::Private => Some(Field::Private(&self.private)),
        }
    }

    /// The last field read as a string slice; empty when there is none.
    #[must_use]
    pub fn value(&self) -> &str {
        self.field().map_or("", |field| field.as_str())
    }

    /// Parses the last field read with `converter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the converter rejects the value.
    pub fn parse_value<T, C>(&self, converter: &C) -> Result<T>
    where
        C: ValueConverter<T> + ?Sized,
    {
        let value = self.value();
        converter.try_parse(value).ok_or_else(|| {
            Error::conversion(format!(
                "cannot parse '{}' (field ending at position {})",
                value, self.position
            ))
        })
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn check_failed(&self) -> Result<()> {
        match &self.failure {
            Some(err) => Err(err.replay()),
            None => Ok(()),
        }
    }

    fn fail(&mut self, err: Error) -> Error {
        self.failure = Some(err.replay());
        err
    }

    fn release_field(&mut self) {
        self.slot = FieldSlot::None;
    }

    /// `Some(found)` once decided, `None` when the buffer must be refilled.
    fn try_pick_record(&mut self) -> Result<Option<bool>> {
        match self.position_type {
            PositionType::StartOfStream | PositionType::EndOfRecord => {}
            PositionType::EndOfStream => return Ok(Some(false)),
            PositionType::StartOfRecord | PositionType::Delimiter => {
                return Err(Error::invalid_operation(
                    "the current record has unread fields",
                ))
            }
        }
        self.release_field();
        if !self.buffer.unconsumed().is_empty() {
            self.position_type = PositionType::StartOfRecord;
            self.field_type = FieldType::None;
            return Ok(Some(true));
        }
        if self.buffer.is_finished() {
            self.position_type = PositionType::EndOfStream;
            debug!(
                "reached end of stream after {} records",
                self.records_read
            );
            return Ok(Some(false));
        }
        Ok(None)
    }

    fn try_next_field(&mut self, materialize: bool) -> Result<Option<bool>> {
        match self.position_type {
            PositionType::StartOfRecord | PositionType::Delimiter => {}
            PositionType::EndOfRecord | PositionType::EndOfStream => return Ok(Some(false)),
            PositionType::StartOfStream => {
                return Err(Error::invalid_operation(
                    "pick_record must be called before reading fields",
                ))
            }
        }
        self.release_field();
        let start_of_record = self.position_type == PositionType::StartOfRecord;
        let (token, cursor) = self.lexer.parse(
            self.buffer.unconsumed(),
            self.buffer.is_finished(),
            start_of_record,
            self.cursor,
        );
        self.cursor = cursor;
        match token {
            Token::Field(info) => {
                self.accept_field(&info, materialize);
                Ok(Some(true))
            }
            Token::NeedMoreData if self.buffer.is_full() => {
                Err(self.fail(Error::unsupported_field_length()))
            }
            Token::NeedMoreData => Ok(None),
            Token::InvalidData { offset, reason } => {
                let skipped = self.buffer.unconsumed()[..offset].chars().count() as u64;
                let err = Error::format(self.position + skipped, reason);
                Err(self.fail(err))
            }
        }
    }

    fn accept_field(&mut self, info: &FieldInfo, materialize: bool) {
        let offset = self.buffer.consumed_offset();
        let raw = &self.buffer.unconsumed()[..info.chars_used];
        self.position += raw.chars().count() as u64;
        self.field_type = if info.is_annotation {
            FieldType::Annotation
        } else {
            FieldType::Value
        };

        if materialize {
            let (from, to) = self.lexer.content_range(info);
            if info.chars_escaped > 0 {
                self.private.clear();
                let removed = self.lexer.unescape_into(&raw[from..to], &mut self.private);
                debug_assert_eq!(removed, info.chars_escaped, "escape count mismatch");
                self.slot = FieldSlot::Private;
            } else {
                let (mut from, mut to) = (from, to);
                if self.trim_whitespace && !info.has_quoting && !info.is_annotation {
                    let content = &raw[from..to];
                    from += content.len() - content.trim_start().len();
                    to = from + content.trim().len();
                }
                self.slot = FieldSlot::Shared {
                    start: offset + from,
                    end: offset + to,
                };
            }
        }

        self.buffer.consume(info.chars_used);
        self.fields_read += 1;
        self.position_type = match info.separator {
            Separator::Delimiter => PositionType::Delimiter,
            Separator::Terminator => {
                self.records_read += 1;
                PositionType::EndOfRecord
            }
            Separator::None => {
                self.records_read += 1;
                PositionType::EndOfStream
            }
        };
    }
}

impl<R: Read + Seek> TabularFieldReader<R> {
    /// Creates a reader that strips a byte order mark only when the stream is at offset 0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the stream position cannot be queried.
    pub fn from_seekable(mut inner: R, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        let at_start = inner.stream_position()? == 0;
        Self::build(inner, dialect, options, at_start)
    }
}

impl<R: Read> TabularFieldReader<R> {
    fn fill(&mut self) -> Result<()> {
        self.buffer.fill(&mut self.inner)?;
        Ok(())
    }

    /// Moves to the next record. Returns `false` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] when fields of the current record are unread,
    /// or [`Error::Io`] when the stream fails.
    pub fn pick_record(&mut self) -> Result<bool> {
        self.check_failed()?;
        loop {
            if let Some(found) = self.try_pick_record()? {
                return Ok(found);
            }
            self.fill()?;
        }
    }

    /// Reads the next field of the current record. Returns `false` once the record is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] on malformed input; the reader stays failed afterwards.
    pub fn read_field(&mut self) -> Result<bool> {
        self.next_field(true)
    }

    /// Like [`read_field`](Self::read_field) without materializing the value.
    pub fn skip_field(&mut self) -> Result<bool> {
        self.next_field(false)
    }

    fn next_field(&mut self, materialize: bool) -> Result<bool> {
        self.check_failed()?;
        loop {
            if let Some(found) = self.try_next_field(materialize)? {
                return Ok(found);
            }
            self.fill()?;
        }
    }
}

#[cfg(feature = "tokio")]
impl<R: tokio::io::AsyncRead + Unpin> TabularFieldReader<R> {
    async fn fill_async(&mut self) -> Result<()> {
        self.buffer.fill_async(&mut self.inner).await?;
        Ok(())
    }

    pub async fn pick_record_async(&mut self) -> Result<bool> {
        self.check_failed()?;
        loop {
            if let Some(found) = self.try_pick_record()? {
                return Ok(found);
            }
            self.fill_async().await?;
        }
    }

    pub async fn read_field_async(&mut self) -> Result<bool> {
        self.next_field_async(true).await
    }

    pub async fn skip_field_async(&mut self) -> Result<bool> {
        self.next_field_async(false).await
    }

    async fn next_field_async(&mut self, materialize: bool) -> Result<bool> {
        self.check_failed()?;
        loop {
            if let Some(found) = self.try_next_field(materialize)? {
                return Ok(found);
            }
            self.fill_async().await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::DisplayConverter;
    use std::io::{self, Cursor};

    fn reader<'a>(dialect: &Dialect, input: &'a str, buffer_size: usize) -> TabularFieldReader<&'a [u8]> {
        let options = TabularOptions::new().with_buffer_size(buffer_size);
        TabularFieldReader::new(input.as_bytes(), dialect, &options).unwrap()
    }

    fn read_all<R: Read>(reader: &mut TabularFieldReader<R>) -> Result<Vec<Vec<String>>> {
        let mut records = Vec::new();
        while reader.pick_record()? {
            let mut fields = Vec::new();
            while reader.read_field()? {
                fields.push(reader.value().to_string());
            }
            records.push(fields);
        }
        Ok(records)
    }

    #[test]
    fn test_records_and_positions() {
        let dialect = Dialect::new("\n", ',', '"').unwrap();
        let mut reader = reader(&dialect, "a,\"b,c\",d\n", 4);
        assert_eq!(reader.position_type(), PositionType::StartOfStream);
        assert!(reader.pick_record().unwrap());
        assert_eq!(reader.position_type(), PositionType::StartOfRecord);
        assert!(reader.read_field().unwrap());
        assert_eq!(reader.position_type(), PositionType::Delimiter);
        assert!(reader.read_field().unwrap());
        assert_eq!(reader.value(), "b,c");
        assert!(reader.read_field().unwrap());
        assert_eq!(reader.value(), "d");
        assert_eq!(reader.position_type(), PositionType::EndOfRecord);
        assert!(!reader.read_field().unwrap());
        assert!(!reader.pick_record().unwrap());
        assert_eq!(reader.position_type(), PositionType::EndOfStream);
        assert_eq!(reader.fields_read(), 3);
        assert_eq!(reader.records_read(), 1);
        assert_eq!(reader.position(), 10);
        assert_eq!(reader.bytes_consumed(), 10);
    }

    #[test]
    fn test_read_before_pick_is_invalid() {
        let dialect = Dialect::default();
        let mut reader = reader(&dialect, "a", 16);
        assert!(matches!(reader.read_field(), Err(Error::InvalidOperation(_))));
        assert!(reader.pick_record().unwrap());
        assert!(matches!(reader.pick_record(), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_small_buffers_match_large() {
        let dialect = Dialect::default()
            .with_annotation_prefix('#')
            .unwrap();
        let input = "#c1\r\nname,\"quoted \"\"x\"\"\",é😀\r\n,,\r\nlast\rline";
        let expected = read_all(&mut reader(&dialect, input, 4096)).unwrap();
        assert_eq!(expected.len(), 4);
        assert_eq!(expected[3], vec!["last\rline"]);
        for size in 1..9 {
            assert_eq!(read_all(&mut reader(&dialect, input, size)).unwrap(), expected);
        }
    }

    #[test]
    fn test_zero_copy_and_private_fields_agree() {
        let dialect = Dialect::new("\n", ',', '"').unwrap();
        let mut reader = reader(&dialect, "abc,\"abc\",\"ab\"\"c\"\n", 64);
        assert!(reader.pick_record().unwrap());
        reader.read_field().unwrap();
        assert_eq!(reader.buffer_kind(), BufferKind::Shared);
        assert_eq!(reader.field(), Some(Field::Shared("abc")));
        reader.read_field().unwrap();
        assert_eq!(reader.field(), Some(Field::Shared("abc")));
        reader.read_field().unwrap();
        assert_eq!(reader.field(), Some(Field::Private("ab\"c")));
    }

    #[test]
    fn test_skip_field_does_not_materialize() {
        let dialect = Dialect::default();
        let mut reader = reader(&dialect, "\"a\"\"b\",c", 64);
        assert!(reader.pick_record().unwrap());
        assert!(reader.skip_field().unwrap());
        assert_eq!(reader.buffer_kind(), BufferKind::None);
        assert_eq!(reader.value(), "");
        assert!(reader.read_field().unwrap());
        assert_eq!(reader.value(), "c");
        assert_eq!(reader.position_type(), PositionType::EndOfStream);
    }

    #[test]
    fn test_unterminated_quote_reports_offset_and_stays_failed() {
        let dialect = Dialect::new("\n", ',', '"').unwrap();
        let mut reader = reader(&dialect, "a,\"bc", 2);
        assert!(reader.pick_record().unwrap());
        assert!(reader.read_field().unwrap());
        let err = reader.read_field().unwrap_err();
        assert_eq!(err.position(), Some(5));
        assert_eq!(reader.read_field().unwrap_err().position(), Some(5));
        assert!(reader.pick_record().is_err());
    }

    #[test]
    fn test_trim_whitespace() {
        let dialect = Dialect::default();
        let options = TabularOptions::new().with_trim_whitespace(true);
        let input: &[u8] = b"  a  , \"  b  \"";
        let mut reader = TabularFieldReader::new(input, &dialect, &options).unwrap();
        assert!(reader.pick_record().unwrap());
        reader.read_field().unwrap();
        assert_eq!(reader.value(), "a");
        // whitespace around quotes is not allowed by the lexer
        assert!(reader.read_field().is_err());
    }

    #[test]
    fn test_parse_value() {
        let dialect = Dialect::default();
        let mut reader = reader(&dialect, "42,x", 64);
        assert!(reader.pick_record().unwrap());
        reader.read_field().unwrap();
        let n: i32 = reader.parse_value(&DisplayConverter).unwrap();
        assert_eq!(n, 42);
        reader.read_field().unwrap();
        let err = reader.parse_value::<i32, _>(&DisplayConverter).unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[test]
    fn test_from_seekable_skips_bom_detection_mid_stream() {
        let dialect = Dialect::default();
        let options = TabularOptions::new();
        let mut cursor = Cursor::new(b"x\xEF\xBB\xBFy".to_vec());
        cursor.set_position(1);
        let mut reader = TabularFieldReader::from_seekable(cursor, &dialect, &options).unwrap();
        assert!(reader.pick_record().unwrap());
        reader.read_field().unwrap();
        assert_eq!(reader.value(), "\u{FEFF}y");
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn test_io_error_passes_through() {
        let dialect = Dialect::default();
        let mut reader = TabularFieldReader::new(FailingReader, &dialect, &TabularOptions::new()).unwrap();
        match reader.pick_record() {
            Err(Error::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("Expected IO error, got {other:?}"),
        }
    }
}

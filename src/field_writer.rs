//! Field-by-field writing.
//!
//! [`TabularFieldWriter`] appends formatted fields to an encoder buffer and hands encoded
//! bytes to the stream whenever the buffer passes its flush threshold. Record structure
//! is explicit: [`begin_record`](TabularFieldWriter::begin_record) separates a record
//! from the previous one and [`end_record`](TabularFieldWriter::end_record) terminates it.
//!
//! Nothing reaches the stream before a flush, so [`finish`](TabularFieldWriter::finish)
//! (or its async twin) must be called once writing is done.
//!
//! ```rust
//! use tabular_stream::{Dialect, TabularFieldWriter, TabularOptions};
//!
//! let dialect = Dialect::new("\n", ',', '"').unwrap();
//! let mut writer = TabularFieldWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
//! writer.begin_record();
//! writer.write_value("a").unwrap();
//! writer.write_value("b,c").unwrap();
//! writer.begin_record();
//! writer.write_value("d").unwrap();
//! let bytes = writer.finish().unwrap();
//! assert_eq!(bytes, b"a,\"b,c\"\nd");
//! ```

use crate::codec::TextWriteBuffer;
use crate::convert::{format_with, ValueConverter};
use crate::field::{FieldType, PositionType};
use crate::formatter::Formatter;
use crate::{Dialect, Error, Result, TabularOptions, MAX_FIELD_LENGTH};
use log::{debug, trace};
use std::io::{Seek, Write};

/// Push-based writer of tabular fields.
pub struct TabularFieldWriter<W> {
    inner: W,
    formatter: Formatter,
    terminator: String,
    delimiter: char,
    annotation_prefix: Option<char>,
    buffer: TextWriteBuffer,
    scratch: Vec<u8>,
    position_type: PositionType,
    field_type: FieldType,
    position: u64,
    fields_written: u64,
    records_written: u64,
}

impl<W> TabularFieldWriter<W> {
    /// Creates a writer at the start of a stream. The byte order mark is emitted when
    /// `options.byte_order_mark` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] if the options are invalid.
    pub fn new(inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Self::build(inner, dialect, options, options.byte_order_mark)
    }

    /// Creates a writer continuing an existing stream; no byte order mark is emitted.
    pub fn appending(inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Self::build(inner, dialect, options, false)
    }

    pub(crate) fn build(
        inner: W,
        dialect: &Dialect,
        options: &TabularOptions,
        emit_preamble: bool,
    ) -> Result<Self> {
        options.validate()?;
        debug!(
            "field writer: encoding {}, buffer {} bytes, preamble: {}",
            options.encoding.name(),
            options.buffer_size,
            emit_preamble
        );
        Ok(TabularFieldWriter {
            inner,
            formatter: Formatter::new(dialect),
            terminator: dialect.terminator().to_string(),
            delimiter: dialect.delimiter(),
            annotation_prefix: dialect.annotation_prefix(),
            buffer: TextWriteBuffer::new(options.encoding, options.buffer_size, emit_preamble),
            scratch: Vec::new(),
            position_type: PositionType::StartOfStream,
            field_type: FieldType::None,
            position: 0,
            fields_written: 0,
            records_written: 0,
        })
    }

    #[must_use]
    pub fn position_type(&self) -> PositionType {
        self.position_type
    }

    /// Kind of the last field written in the current record.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    /// Characters written so far, including separators.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes handed to the stream so far.
    #[must_use]
    pub fn bytes_committed(&self) -> u64 {
        self.buffer.bytes_committed()
    }

    #[must_use]
    pub fn fields_written(&self) -> u64 {
        self.fields_written
    }

    #[must_use]
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    fn push_terminator(&mut self) {
        self.buffer.text_mut().push_str(&self.terminator);
        self.position += self.terminator.chars().count() as u64;
    }

    /// Starts a new record, terminating the previous one if it is still open.
    pub fn begin_record(&mut self) {
        match self.position_type {
            PositionType::StartOfStream | PositionType::EndOfRecord => {}
            PositionType::StartOfRecord | PositionType::Delimiter | PositionType::EndOfStream => {
                self.push_terminator();
            }
        }
        self.position_type = PositionType::StartOfRecord;
        self.field_type = FieldType::None;
        self.records_written += 1;
    }

    /// Terminates the current record. Does nothing if no record is open.
    pub fn end_record(&mut self) {
        if matches!(
            self.position_type,
            PositionType::StartOfRecord | PositionType::Delimiter
        ) {
            self.push_terminator();
            self.position_type = PositionType::EndOfRecord;
        }
    }

    fn ensure_record(&mut self) {
        if matches!(
            self.position_type,
            PositionType::StartOfStream | PositionType::EndOfRecord
        ) {
            self.begin_record();
        }
    }

    /// Appends a value to the current record without touching the stream.
    fn push_value(&mut self, value: &str) -> Result<()> {
        self.ensure_record();
        if self.field_type == FieldType::Annotation {
            return Err(Error::invalid_operation(
                "a record holding an annotation cannot take values",
            ));
        }
        let first = self.field_type == FieldType::None;
        let force_quoting = first
            && self
                .annotation_prefix
                .map_or(false, |prefix| value.starts_with(prefix));
        let info = self.formatter.text_info(value, force_quoting);
        if info.len > MAX_FIELD_LENGTH {
            return Err(Error::unsupported_field_length());
        }
        let text = self.buffer.text_mut();
        if !first {
            text.push(self.delimiter);
            self.position += 1;
        }
        self.formatter.format_into(value, &info, text);
        self.position += info.chars as u64;
        self.position_type = PositionType::Delimiter;
        self.field_type = FieldType::Value;
        self.fields_written += 1;
        Ok(())
    }

    fn push_annotation(&mut self, content: &str) -> Result<()> {
        let Some(prefix) = self.annotation_prefix else {
            return Err(Error::invalid_operation("the dialect has no annotation prefix"));
        };
        if content.contains(self.terminator.as_str()) {
            return Err(Error::invalid_argument(
                "an annotation cannot contain the line terminator",
            ));
        }
        if content.len() + prefix.len_utf8() > MAX_FIELD_LENGTH {
            return Err(Error::unsupported_field_length());
        }
        self.ensure_record();
        if self.field_type != FieldType::None {
            return Err(Error::invalid_operation(
                "an annotation must be the only content of its record",
            ));
        }
        self.formatter
            .format_annotation_into(prefix, content, self.buffer.text_mut());
        self.position += 1 + content.chars().count() as u64;
        self.position_type = PositionType::Delimiter;
        self.field_type = FieldType::Annotation;
        self.fields_written += 1;
        Ok(())
    }

    fn push_typed<T, C>(&mut self, value: &T, converter: &C) -> Result<()>
    where
        C: ValueConverter<T> + ?Sized,
    {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = format_with(converter, value, &mut scratch).and_then(|text| self.push_value(text));
        self.scratch = scratch;
        result
    }
}

impl<W: Write + Seek> TabularFieldWriter<W> {
    /// Creates a writer that emits the byte order mark (if enabled) only when the stream
    /// is at offset 0.
    pub fn from_seekable(mut inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        let at_start = inner.stream_position()? == 0;
        Self::build(inner, dialect, options, options.byte_order_mark && at_start)
    }
}

impl<W: Write> TabularFieldWriter<W> {
    fn flush_if_needed(&mut self) -> Result<()> {
        if self.buffer.needs_flush() {
            trace!("flush threshold reached");
            self.buffer.flush_to(&mut self.inner, false)?;
        }
        Ok(())
    }

    /// Writes a value as the next field, starting a record if none is open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the record holds an annotation.
    pub fn write_value(&mut self, value: &str) -> Result<()> {
        self.push_value(value)?;
        self.flush_if_needed()
    }

    /// Writes an annotation as the sole content of a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] if the dialect has no annotation prefix or the
    /// record already has content, and [`Error::InvalidArgument`] if `content` contains
    /// the terminator.
    pub fn write_annotation(&mut self, content: &str) -> Result<()> {
        self.push_annotation(content)?;
        self.flush_if_needed()
    }

    /// Formats `value` with `converter` and writes it as the next field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conversion`] if the converter fails at every buffer size, and
    /// [`Error::UnsupportedFieldLength`] if its length hint exceeds the maximum.
    pub fn write<T, C>(&mut self, value: &T, converter: &C) -> Result<()>
    where
        C: ValueConverter<T> + ?Sized,
    {
        self.push_typed(value, converter)?;
        self.flush_if_needed()
    }

    /// Encodes all buffered text and flushes the stream.
    pub fn flush(&mut self) -> Result<()> {
        self.buffer.flush_to(&mut self.inner, false)?;
        Ok(())
    }

    /// Flushes everything, finalizes the encoder and returns the stream.
    pub fn finish(mut self) -> Result<W> {
        self.buffer.flush_to(&mut self.inner, true)?;
        debug!(
            "field writer finished: {} records, {} bytes",
            self.records_written,
            self.buffer.bytes_committed()
        );
        Ok(self.inner)
    }
}

#[cfg(feature = "tokio")]
impl<W: tokio::io::AsyncWrite + Unpin> TabularFieldWriter<W> {
    async fn flush_if_needed_async(&mut self) -> Result<()> {
        if self.buffer.needs_flush() {
            trace!("flush threshold reached");
            self.buffer.flush_to_async(&mut self.inner, false).await?;
        }
        Ok(())
    }

    pub async fn write_value_async(&mut self, value: &str) -> Result<()> {
        self.push_value(value)?;
        self.flush_if_needed_async().await
    }

    pub async fn write_annotation_async(&mut self, content: &str) -> Result<()> {
        self.push_annotation(content)?;
        self.flush_if_needed_async().await
    }

    pub async fn write_async<T, C>(&mut self, value: &T, converter: &C) -> Result<()>
    where
        C: ValueConverter<T> + ?Sized,
    {
        self.push_typed(value, converter)?;
        self.flush_if_needed_async().await
    }

    pub async fn flush_async(&mut self) -> Result<()> {
        self.buffer.flush_to_async(&mut self.inner, false).await?;
        Ok(())
    }

    pub async fn finish_async(mut self) -> Result<W> {
        self.buffer.flush_to_async(&mut self.inner, true).await?;
        debug!(
            "field writer finished: {} records, {} bytes",
            self.records_written,
            self.buffer.bytes_committed()
        );
        Ok(self.inner)
    }
}

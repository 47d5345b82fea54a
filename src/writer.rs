//! Record-level writing on top of [`TabularFieldWriter`].
//!
//! Every record written here is terminated, so the output ends with the terminator
//! whenever at least one record was written. A record needs at least one field: an
//! empty record would read back as a single empty field, so it is rejected.

use crate::convert::RecordHandler;
use crate::{
    Dialect, Error, Headers, Record, Result, TabularFieldWriter, TabularOptions,
};
use std::io::{Seek, Write};
use std::iter::Peekable;

/// Writes whole records.
///
/// # Examples
///
/// ```rust
/// use tabular_stream::{Dialect, TabularOptions, TabularWriter};
///
/// let dialect = Dialect::new("\n", '\t', '"').unwrap();
/// let mut writer = TabularWriter::new(Vec::new(), &dialect, &TabularOptions::new()).unwrap();
/// writer.write_header(["id", "note"]).unwrap();
/// writer.write_record(["1", "tab\tinside"]).unwrap();
/// let bytes = writer.finish().unwrap();
/// assert_eq!(bytes, b"id\tnote\n1\t\"tab\tinside\"\n");
/// ```
pub struct TabularWriter<W> {
    fields: TabularFieldWriter<W>,
    values_written: bool,
    scratch: Vec<String>,
}

impl<W> TabularWriter<W> {
    pub fn new(inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Ok(Self::from_field_writer(TabularFieldWriter::new(
            inner, dialect, options,
        )?))
    }

    /// Continues an existing stream without a byte order mark.
    pub fn appending(inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Ok(Self::from_field_writer(TabularFieldWriter::appending(
            inner, dialect, options,
        )?))
    }

    pub fn from_field_writer(fields: TabularFieldWriter<W>) -> Self {
        TabularWriter {
            fields,
            values_written: false,
            scratch: Vec::new(),
        }
    }

    /// The underlying field writer, for positions and counters.
    pub fn field_writer(&self) -> &TabularFieldWriter<W> {
        &self.fields
    }

    fn non_empty<I: IntoIterator>(values: I) -> Result<Peekable<I::IntoIter>> {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return Err(Error::invalid_argument("a record needs at least one field"));
        }
        Ok(values)
    }

    fn annotation_content(record: &Record) -> Result<&str> {
        if record.len() > 1 {
            return Err(Error::invalid_argument(
                "an annotation record holds a single field",
            ));
        }
        Ok(record.get(0).unwrap_or(""))
    }

    fn check_header(&self) -> Result<()> {
        if self.values_written {
            return Err(Error::invalid_operation(
                "the header must precede all value records",
            ));
        }
        Ok(())
    }
}

impl<W: Write + Seek> TabularWriter<W> {
    pub fn from_seekable(inner: W, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        Ok(Self::from_field_writer(TabularFieldWriter::from_seekable(
            inner, dialect, options,
        )?))
    }
}

impl<W: Write> TabularWriter<W> {
    /// Writes one terminated value record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `values` is empty.
    pub fn write_record<I, S>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = Self::non_empty(values)?;
        self.fields.begin_record();
        for value in values {
            self.fields.write_value(value.as_ref())?;
        }
        self.fields.end_record();
        self.values_written = true;
        Ok(())
    }

    /// Writes the header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOperation`] once a value record has been written.
    pub fn write_header<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_header()?;
        self.write_record(names)
    }

    pub fn write_headers(&mut self, headers: &Headers) -> Result<()> {
        self.write_header(headers.names())
    }

    /// Writes one terminated annotation record.
    ///
    /// A rejected annotation leaves the output unchanged.
    pub fn write_annotation(&mut self, content: &str) -> Result<()> {
        self.fields.write_annotation(content)?;
        self.fields.end_record();
        Ok(())
    }

    /// Writes a record of either kind.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an annotation record with more than one
    /// field or a value record with none.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        if record.is_annotation() {
            self.write_annotation(Self::annotation_content(record)?)
        } else {
            self.write_record(record)
        }
    }

    /// Writes `value` as a record through `handler`.
    pub fn write_as<T, H>(&mut self, value: &T, handler: &H) -> Result<()>
    where
        H: RecordHandler<T> + ?Sized,
    {
        let mut fields = std::mem::take(&mut self.scratch);
        fields.clear();
        let result = handler
            .write(value, &mut fields)
            .and_then(|()| self.write_record(&fields));
        self.scratch = fields;
        result
    }

    pub fn flush(&mut self) -> Result<()> {
        self.fields.flush()
    }

    pub fn finish(self) -> Result<W> {
        self.fields.finish()
    }
}

#[cfg(feature = "tokio")]
impl<W: tokio::io::AsyncWrite + Unpin> TabularWriter<W> {
    pub async fn write_record_async<I, S>(&mut self, values: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values = Self::non_empty(values)?;
        self.fields.begin_record();
        for value in values {
            self.fields.write_value_async(value.as_ref()).await?;
        }
        self.fields.end_record();
        self.values_written = true;
        Ok(())
    }

    pub async fn write_header_async<I, S>(&mut self, names: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.check_header()?;
        self.write_record_async(names).await
    }

    pub async fn write_annotation_async(&mut self, content: &str) -> Result<()> {
        self.fields.write_annotation_async(content).await?;
        self.fields.end_record();
        Ok(())
    }

    pub async fn write_async(&mut self, record: &Record) -> Result<()> {
        if record.is_annotation() {
            self.write_annotation_async(Self::annotation_content(record)?)
                .await
        } else {
            self.write_record_async(record).await
        }
    }

    pub async fn write_as_async<T, H>(&mut self, value: &T, handler: &H) -> Result<()>
    where
        H: RecordHandler<T> + ?Sized,
    {
        let mut fields = std::mem::take(&mut self.scratch);
        fields.clear();
        let result = match handler.write(value, &mut fields) {
            Ok(()) => self.write_record_async(&fields).await,
            Err(err) => Err(err),
        };
        self.scratch = fields;
        result
    }

    pub async fn flush_async(&mut self) -> Result<()> {
        self.fields.flush_async().await
    }

    pub async fn finish_async(self) -> Result<W> {
        self.fields.finish_async().await
    }
}

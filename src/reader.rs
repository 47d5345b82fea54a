//! Record-level reading on top of [`TabularFieldReader`].
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::{Dialect, TabularOptions, TabularReader};
//!
//! let dialect = Dialect::new("\n", ',', '"')
//!     .and_then(|d| d.with_annotation_prefix('#'))
//!     .unwrap();
//! let options = TabularOptions::new().with_header(true);
//! let input: &[u8] = b"#exported today\nid,name\n1,Ada\n2,Grace\n";
//! let mut reader = TabularReader::new(input, &dialect, &options).unwrap();
//!
//! let headers = reader.headers().unwrap().cloned().unwrap();
//! assert_eq!(headers.index_of("name"), Some(1));
//!
//! let names: Vec<String> = reader
//!     .records()
//!     .map(|record| record.unwrap().get(1).unwrap().to_string())
//!     .collect();
//! assert_eq!(names, vec!["Ada", "Grace"]);
//! ```

use crate::convert::RecordHandler;
use crate::field::FieldType;
use crate::record::RecordKind;
use crate::{Dialect, Headers, Record, Result, TabularFieldReader, TabularOptions};
use log::debug;
use std::io::{Read, Seek};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HeaderState {
    Disabled,
    Pending,
    Done,
}

/// Reads whole records, with optional header handling.
pub struct TabularReader<R> {
    fields: TabularFieldReader<R>,
    header: HeaderState,
    headers: Option<Headers>,
    scratch: Record,
}

impl<R> TabularReader<R> {
    /// # Errors
    ///
    /// Returns [`Error::Options`](crate::Error::Options) if the options are invalid.
    pub fn new(inner: R, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        let fields = TabularFieldReader::new(inner, dialect, options)?;
        Ok(Self::from_field_reader(fields, options.has_header))
    }

    /// Wraps a field reader that has not read anything yet.
    pub fn from_field_reader(fields: TabularFieldReader<R>, has_header: bool) -> Self {
        TabularReader {
            fields,
            header: if has_header {
                HeaderState::Pending
            } else {
                HeaderState::Disabled
            },
            headers: None,
            scratch: Record::new(),
        }
    }

    /// The underlying field reader, for positions and counters.
    pub fn field_reader(&self) -> &TabularFieldReader<R> {
        &self.fields
    }

    pub fn into_inner(self) -> R {
        self.fields.into_inner()
    }

    fn take_header(&mut self, found: bool) {
        if found {
            let headers = Headers::from_record(&self.scratch);
            debug!("read header with {} columns", headers.len());
            self.headers = Some(headers);
        }
        self.header = HeaderState::Done;
    }
}

impl<R: Read + Seek> TabularReader<R> {
    pub fn from_seekable(inner: R, dialect: &Dialect, options: &TabularOptions) -> Result<Self> {
        let fields = TabularFieldReader::from_seekable(inner, dialect, options)?;
        Ok(Self::from_field_reader(fields, options.has_header))
    }
}

impl<R: Read> TabularReader<R> {
    fn read_raw(fields: &mut TabularFieldReader<R>, record: &mut Record) -> Result<bool> {
        record.clear();
        if !fields.pick_record()? {
            return Ok(false);
        }
        while fields.read_field()? {
            if fields.field_type() == FieldType::Annotation {
                record.set_kind(RecordKind::Annotation);
            }
            record.push_field(fields.value());
        }
        Ok(true)
    }

    fn read_values(fields: &mut TabularFieldReader<R>, record: &mut Record) -> Result<bool> {
        loop {
            if !Self::read_raw(fields, record)? {
                return Ok(false);
            }
            if !record.is_annotation() {
                return Ok(true);
            }
        }
    }

    fn ensure_header(&mut self) -> Result<()> {
        if self.header == HeaderState::Pending {
            let found = Self::read_values(&mut self.fields, &mut self.scratch)?;
            self.take_header(found);
        }
        Ok(())
    }

    /// The header row, read on first use when `has_header` is set.
    ///
    /// Returns `None` when headers are disabled or the stream has no value records.
    pub fn headers(&mut self) -> Result<Option<&Headers>> {
        self.ensure_header()?;
        Ok(self.headers.as_ref())
    }

    /// Reads the next record, annotations included, into `record`.
    ///
    /// Returns `false` at the end of the stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`](crate::Error::Format) on malformed input; the reader
    /// stays failed afterwards.
    pub fn read_record(&mut self, record: &mut Record) -> Result<bool> {
        self.ensure_header()?;
        Self::read_raw(&mut self.fields, record)
    }

    /// Skips the next record without materializing its fields.
    pub fn skip_record(&mut self) -> Result<bool> {
        self.ensure_header()?;
        if !self.fields.pick_record()? {
            return Ok(false);
        }
        while self.fields.skip_field()? {}
        Ok(true)
    }

    /// Iterator over the remaining records. Stops after the first error.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            reader: self,
            done: false,
        }
    }

    /// Reads the next value record through `handler`, skipping annotations.
    pub fn read_as<T, H>(&mut self, handler: &H) -> Result<Option<T>>
    where
        H: RecordHandler<T> + ?Sized,
    {
        self.ensure_header()?;
        if !Self::read_values(&mut self.fields, &mut self.scratch)? {
            return Ok(None);
        }
        handler
            .read(&self.scratch, self.headers.as_ref())
            .map(Some)
    }
}

/// Iterator returned by [`TabularReader::records`].
pub struct Records<'r, R> {
    reader: &'r mut TabularReader<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut record = Record::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => Some(Ok(record)),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(feature = "tokio")]
impl<R: tokio::io::AsyncRead + Unpin> TabularReader<R> {
    async fn read_raw_async(fields: &mut TabularFieldReader<R>, record: &mut Record) -> Result<bool> {
        record.clear();
        if !fields.pick_record_async().await? {
            return Ok(false);
        }
        while fields.read_field_async().await? {
            if fields.field_type() == FieldType::Annotation {
                record.set_kind(RecordKind::Annotation);
            }
            record.push_field(fields.value());
        }
        Ok(true)
    }

    async fn read_values_async(
        fields: &mut TabularFieldReader<R>,
        record: &mut Record,
    ) -> Result<bool> {
        loop {
            if !Self::read_raw_async(fields, record).await? {
                return Ok(false);
            }
            if !record.is_annotation() {
                return Ok(true);
            }
        }
    }

    async fn ensure_header_async(&mut self) -> Result<()> {
        if self.header == HeaderState::Pending {
            let found = Self::read_values_async(&mut self.fields, &mut self.scratch).await?;
            self.take_header(found);
        }
        Ok(())
    }

    pub async fn headers_async(&mut self) -> Result<Option<&Headers>> {
        self.ensure_header_async().await?;
        Ok(self.headers.as_ref())
    }

    pub async fn read_record_async(&mut self, record: &mut Record) -> Result<bool> {
        self.ensure_header_async().await?;
        Self::read_raw_async(&mut self.fields, record).await
    }

    pub async fn skip_record_async(&mut self) -> Result<bool> {
        self.ensure_header_async().await?;
        if !self.fields.pick_record_async().await? {
            return Ok(false);
        }
        while self.fields.skip_field_async().await? {}
        Ok(true)
    }

    pub async fn read_as_async<T, H>(&mut self, handler: &H) -> Result<Option<T>>
    where
        H: RecordHandler<T> + ?Sized,
    {
        self.ensure_header_async().await?;
        if !Self::read_values_async(&mut self.fields, &mut self.scratch).await? {
            return Ok(None);
        }
        handler
            .read(&self.scratch, self.headers.as_ref())
            .map(Some)
    }
}

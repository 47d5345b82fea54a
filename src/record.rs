//! Owned records and header maps.
//!
//! A [`Record`] stores all of its fields in one string with an offset table, so reading
//! a record allocates at most twice no matter how many fields it has, and a reused record
//! allocates nothing once it has grown.
//!
//! [`Headers`] maps column names to indexes in the order they appear, backed by
//! [`IndexMap`].
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::{Headers, Record};
//!
//! let header: Record = ["id", "name"].into_iter().collect();
//! let headers = Headers::from_record(&header);
//!
//! let row: Record = ["7", "Ada"].into_iter().collect();
//! assert_eq!(row.get_by_name(&headers, "name"), Some("Ada"));
//! assert_eq!(headers.index_of("id"), Some(0));
//! ```

use crate::convert::ValueConverter;
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeSeq, Serializer};

/// Whether a record holds values or a single annotation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordKind {
    #[default]
    Values,
    Annotation,
}

/// One record of a tabular stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    text: String,
    ends: Vec<usize>,
    kind: RecordKind,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an annotation record.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tabular_stream::{Record, RecordKind};
    ///
    /// let record = Record::annotation("generated nightly");
    /// assert_eq!(record.kind(), RecordKind::Annotation);
    /// assert_eq!(record.get(0), Some("generated nightly"));
    /// ```
    #[must_use]
    pub fn annotation(content: &str) -> Self {
        let mut record = Record::new();
        record.kind = RecordKind::Annotation;
        record.push_field(content);
        record
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.kind == RecordKind::Annotation
    }

    pub(crate) fn set_kind(&mut self, kind: RecordKind) {
        self.kind = kind;
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        let end = *self.ends.get(index)?;
        let start = match index {
            0 => 0,
            _ => self.ends[index - 1],
        };
        Some(&self.text[start..end])
    }

    /// Looks up a field by column name.
    #[must_use]
    pub fn get_by_name(&self, headers: &Headers, name: &str) -> Option<&str> {
        headers.index_of(name).and_then(|index| self.get(index))
    }

    pub fn iter(&self) -> Fields<'_> {
        Fields {
            record: self,
            index: 0,
        }
    }

    pub fn push_field(&mut self, value: &str) {
        self.text.push_str(value);
        self.ends.push(self.text.len());
    }

    /// Removes all fields and resets the kind, keeping the allocations.
    pub fn clear(&mut self) {
        self.text.clear();
        self.ends.clear();
        self.kind = RecordKind::Values;
    }

    /// Parses field `index` with `converter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if there is no such field and
    /// [`Error::Conversion`] if the converter rejects it.
    pub fn parse<T, C>(&self, index: usize, converter: &C) -> Result<T>
    where
        C: ValueConverter<T> + ?Sized,
    {
        let value = self.get(index).ok_or_else(|| {
            Error::invalid_argument(&format!(
                "field {} out of range for a record of {} fields",
                index,
                self.len()
            ))
        })?;
        converter
            .try_parse(value)
            .ok_or_else(|| Error::conversion(format!("cannot parse field {}: '{}'", index, value)))
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Record {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut record = Record::new();
        for value in iter {
            record.push_field(value.as_ref());
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a str;
    type IntoIter = Fields<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Serializes as a sequence of strings.
impl Serialize for Record {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for field in self {
            seq.serialize_element(field)?;
        }
        seq.end()
    }
}

/// Iterator over the fields of a [`Record`].
#[derive(Clone, Debug)]
pub struct Fields<'a> {
    record: &'a Record,
    index: usize,
}

impl<'a> Iterator for Fields<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let field = self.record.get(self.index)?;
        self.index += 1;
        Some(field)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.record.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Fields<'_> {}

/// Column names mapped to their index, in column order.
///
/// When a name repeats, the first column with that name wins the lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers {
    columns: Vec<String>,
    index: IndexMap<String, usize>,
}

impl Headers {
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        record.iter().collect()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Name of the column at `index`.
    #[must_use]
    pub fn name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    /// Number of columns, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Distinct names with the index they resolve to, in first-appearance order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, usize> {
        self.index.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_record(&self) -> Record {
        self.names().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for Headers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut headers = Headers::default();
        for name in iter {
            let name = name.as_ref();
            let position = headers.columns.len();
            headers.index.entry(name.to_string()).or_insert(position);
            headers.columns.push(name.to_string());
        }
        headers
    }
}

//! Position and field descriptors shared by readers and writers.

use std::fmt;
use std::ops::Deref;

/// Where a reader or writer stands in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionType {
    StartOfStream,
    StartOfRecord,
    /// Just after a field that was followed by a delimiter.
    Delimiter,
    EndOfRecord,
    EndOfStream,
}

/// Kind of the last field read or written in the current record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FieldType {
    #[default]
    None,
    Value,
    Annotation,
}

/// Where the memory of the last field lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferKind {
    None,
    /// A view into the reader's decoded text.
    Shared,
    /// An unescaped copy owned by the reader.
    Private,
}

/// The content of the last field read, borrowed from the reader.
///
/// A `Shared` field is a zero-copy slice of the decoded input; a `Private` field had
/// escape sequences removed into a buffer owned by the reader. Either way the borrow ends
/// before the reader can move to the next field.
///
/// ```rust
/// use tabular_stream::{BufferKind, Dialect, TabularFieldReader, TabularOptions};
///
/// let dialect = Dialect::new("\n", ',', '"').unwrap();
/// let input: &[u8] = b"plain,\"dou\"\"bled\"\n";
/// let mut reader = TabularFieldReader::new(input, &dialect, &TabularOptions::new()).unwrap();
/// assert!(reader.pick_record().unwrap());
///
/// reader.read_field().unwrap();
/// assert_eq!(reader.field().unwrap().kind(), BufferKind::Shared);
/// reader.read_field().unwrap();
/// let field = reader.field().unwrap();
/// assert_eq!(field.kind(), BufferKind::Private);
/// assert_eq!(&*field, "dou\"bled");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field<'a> {
    Shared(&'a str),
    Private(&'a str),
}

impl<'a> Field<'a> {
    #[must_use]
    pub fn as_str(&self) -> &'a str {
        match self {
            Field::Shared(value) | Field::Private(value) => value,
        }
    }

    #[must_use]
    pub fn kind(&self) -> BufferKind {
        match self {
            Field::Shared(_) => BufferKind::Shared,
            Field::Private(_) => BufferKind::Private,
        }
    }
}

impl Deref for Field<'_> {
    type Target = str;

    fn deref(&self) -> &str {
        self.as_str()
    }
}

impl AsRef<str> for Field<'_> {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Dialect tokens shared by the lexer and the formatter.
//!
//! A [`Dialect`] is validated once, when it is built, and never changes afterwards.
//! Readers and writers take their own clone, so the same dialect can back any number
//! of them.
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::Dialect;
//!
//! // RFC 4180 style: CRLF records, comma delimiter, doubled quotes
//! let csv = Dialect::default();
//! assert_eq!(csv.terminator(), "\r\n");
//!
//! // Tab separated with backslash escapes and '#' comment lines
//! let tsv = Dialect::new("\n", '\t', '"')
//!     .and_then(|d| d.with_escape('\\'))
//!     .and_then(|d| d.with_annotation_prefix('#'))
//!     .unwrap();
//! assert_eq!(tsv.escape(), '\\');
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// An immutable, validated set of tabular tokens.
///
/// Construction fails with [`Error::Dialect`] when:
///
/// - the terminator is not one or two characters, or repeats a character
/// - the delimiter, quote, escape or annotation prefix is a line break
/// - the delimiter, quote, escape or annotation prefix appears in the terminator
/// - the delimiter equals the quote or the escape
/// - the annotation prefix equals the delimiter, the quote or the escape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DialectRepr", into = "DialectRepr")]
pub struct Dialect {
    terminator: String,
    delimiter: char,
    quote: char,
    escape: char,
    annotation_prefix: Option<char>,
}

impl Dialect {
    /// Creates a dialect whose escape character is the quote character.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tabular_stream::Dialect;
    ///
    /// let dialect = Dialect::new("\n", ';', '\'').unwrap();
    /// assert_eq!(dialect.escape(), '\'');
    /// assert!(Dialect::new("\n\n", ';', '\'').is_err());
    /// ```
    pub fn new(terminator: &str, delimiter: char, quote: char) -> Result<Self> {
        Self::build(terminator, delimiter, quote, quote, None)
    }

    /// Returns a copy of this dialect with a distinct escape character.
    pub fn with_escape(self, escape: char) -> Result<Self> {
        Self::build(
            &self.terminator,
            self.delimiter,
            self.quote,
            escape,
            self.annotation_prefix,
        )
    }

    /// Returns a copy of this dialect that recognizes annotation (comment) records.
    pub fn with_annotation_prefix(self, prefix: char) -> Result<Self> {
        Self::build(
            &self.terminator,
            self.delimiter,
            self.quote,
            self.escape,
            Some(prefix),
        )
    }

    fn build(
        terminator: &str,
        delimiter: char,
        quote: char,
        escape: char,
        annotation_prefix: Option<char>,
    ) -> Result<Self> {
        let mut chars = terminator.chars();
        let first = chars
            .next()
            .ok_or_else(|| Error::dialect("terminator must not be empty"))?;
        let second = chars.next();
        if chars.next().is_some() {
            return Err(Error::dialect("terminator must be one or two characters"));
        }
        if second == Some(first) {
            return Err(Error::dialect("terminator characters must be distinct"));
        }

        let mut tokens = vec![("delimiter", delimiter), ("quote", quote), ("escape", escape)];
        if let Some(prefix) = annotation_prefix {
            tokens.push(("annotation prefix", prefix));
        }
        for (name, token) in &tokens {
            if is_line_break(*token) {
                return Err(Error::Dialect(format!("{name} must not be a line break")));
            }
            if terminator.contains(*token) {
                return Err(Error::Dialect(format!(
                    "{name} must not be part of the terminator"
                )));
            }
        }

        if delimiter == quote {
            return Err(Error::dialect("delimiter must differ from quote"));
        }
        if delimiter == escape {
            return Err(Error::dialect("delimiter must differ from escape"));
        }
        if let Some(prefix) = annotation_prefix {
            if prefix == delimiter || prefix == quote || prefix == escape {
                return Err(Error::dialect(
                    "annotation prefix must differ from delimiter, quote and escape",
                ));
            }
        }

        Ok(Dialect {
            terminator: terminator.to_string(),
            delimiter,
            quote,
            escape,
            annotation_prefix,
        })
    }

    #[must_use]
    pub fn terminator(&self) -> &str {
        &self.terminator
    }

    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    #[must_use]
    pub fn quote(&self) -> char {
        self.quote
    }

    #[must_use]
    pub fn escape(&self) -> char {
        self.escape
    }

    #[must_use]
    pub fn annotation_prefix(&self) -> Option<char> {
        self.annotation_prefix
    }

    /// Splits the terminator into its first character and optional second character.
    pub(crate) fn terminator_chars(&self) -> (char, Option<char>) {
        let mut chars = self.terminator.chars();
        match chars.next() {
            Some(first) => (first, chars.next()),
            None => unreachable!("dialect terminator is validated to be non-empty"),
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect {
            terminator: "\r\n".to_string(),
            delimiter: ',',
            quote: '"',
            escape: '"',
            annotation_prefix: None,
        }
    }
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

#[derive(Serialize, Deserialize)]
struct DialectRepr {
    terminator: String,
    delimiter: char,
    quote: char,
    #[serde(default)]
    escape: Option<char>,
    #[serde(default)]
    annotation_prefix: Option<char>,
}

impl TryFrom<DialectRepr> for Dialect {
    type Error = Error;

    fn try_from(repr: DialectRepr) -> Result<Self> {
        Dialect::build(
            &repr.terminator,
            repr.delimiter,
            repr.quote,
            repr.escape.unwrap_or(repr.quote),
            repr.annotation_prefix,
        )
    }
}

impl From<Dialect> for DialectRepr {
    fn from(dialect: Dialect) -> Self {
        DialectRepr {
            escape: Some(dialect.escape),
            terminator: dialect.terminator,
            delimiter: dialect.delimiter,
            quote: dialect.quote,
            annotation_prefix: dialect.annotation_prefix,
        }
    }
}

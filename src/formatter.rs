//! Escaping of values on the write side.
//!
//! A value is written verbatim unless it contains the delimiter, the quote, or the whole
//! terminator sequence. A lone first terminator character does not force quoting, because
//! the lexer reads it back as content.
//!
//! ```rust
//! use tabular_stream::formatter::Formatter;
//! use tabular_stream::Dialect;
//!
//! let formatter = Formatter::new(&Dialect::default());
//! let mut out = String::new();
//! let info = formatter.text_info("he said \"hi\",there", false);
//! formatter.format_into("he said \"hi\",there", &info, &mut out);
//! assert_eq!(out, "\"he said \"\"hi\"\",there\"");
//! assert_eq!(out.len(), info.len);
//! ```

use crate::Dialect;

/// Size of a value once formatted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextInfo {
    /// Formatted length in UTF-8 units.
    pub len: usize,
    /// Formatted length in characters.
    pub chars: usize,
    /// Number of escape characters that will be inserted.
    pub escapes: usize,
    pub needs_escaping: bool,
}

#[derive(Clone, Debug)]
pub struct Formatter {
    delimiter: char,
    quote: char,
    escape: char,
    terminator: String,
}

impl Formatter {
    #[must_use]
    pub fn new(dialect: &Dialect) -> Self {
        Formatter {
            delimiter: dialect.delimiter(),
            quote: dialect.quote(),
            escape: dialect.escape(),
            terminator: dialect.terminator().to_string(),
        }
    }

    #[must_use]
    pub fn needs_escaping(&self, value: &str) -> bool {
        value.contains(self.delimiter)
            || value.contains(self.quote)
            || value.contains(self.terminator.as_str())
    }

    fn is_escaped(&self, c: char) -> bool {
        c == self.quote || c == self.escape
    }

    /// Measures `value` as it will be written. `force_quoting` quotes values that need
    /// no escaping on their own.
    #[must_use]
    pub fn text_info(&self, value: &str, force_quoting: bool) -> TextInfo {
        let chars = value.chars().count();
        if !force_quoting && !self.needs_escaping(value) {
            return TextInfo {
                len: value.len(),
                chars,
                escapes: 0,
                needs_escaping: false,
            };
        }
        let escapes = value.chars().filter(|&c| self.is_escaped(c)).count();
        TextInfo {
            len: value.len() + escapes * self.escape.len_utf8() + 2 * self.quote.len_utf8(),
            chars: chars + escapes + 2,
            escapes,
            needs_escaping: true,
        }
    }

    /// Appends `value` to `out` in the form described by `info`.
    pub fn format_into(&self, value: &str, info: &TextInfo, out: &mut String) {
        if !info.needs_escaping {
            out.push_str(value);
            return;
        }
        out.reserve(info.len);
        out.push(self.quote);
        let mut inserted = 0;
        let mut rest = value;
        while let Some((index, c)) = rest.char_indices().find(|&(_, c)| self.is_escaped(c)) {
            out.push_str(&rest[..index]);
            out.push(self.escape);
            out.push(c);
            inserted += 1;
            rest = &rest[index + c.len_utf8()..];
        }
        out.push_str(rest);
        out.push(self.quote);
        debug_assert_eq!(inserted, info.escapes, "escape count mismatch");
    }

    /// Appends an annotation line body. The caller guarantees that `content` does not
    /// contain the terminator.
    pub fn format_annotation_into(&self, prefix: char, content: &str, out: &mut String) {
        debug_assert!(!content.contains(self.terminator.as_str()));
        out.push(prefix);
        out.push_str(content);
    }
}

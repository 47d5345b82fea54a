//! Dialect-driven tokenizer for tabular text.
//!
//! The [`Lexer`] is a pure function over a text buffer: given the unconsumed text, a flag
//! telling whether the stream has ended, and the [`ParserState`] cursor from the previous
//! call, it recognizes the next field boundary. It never performs I/O, so the same code
//! backs the blocking and the async readers.
//!
//! When the buffer runs out in the middle of a field, [`Token::NeedMoreData`] is returned
//! together with a cursor that remembers how far the field was examined. Calling again
//! with a longer buffer (the same text plus more) resumes exactly where scanning stopped,
//! so the recognized fields do not depend on how the input was split into chunks.
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::lexer::{Lexer, ParserState, Separator, Token};
//! use tabular_stream::Dialect;
//!
//! let lexer = Lexer::new(&Dialect::new("\n", ',', '"').unwrap());
//! let (token, _) = lexer.parse("\"b,c\",d\n", false, true, ParserState::default());
//! match token {
//!     Token::Field(info) => {
//!         assert_eq!(info.separator, Separator::Delimiter);
//!         assert_eq!(lexer.content(&"\"b,c\",d\n"[..info.chars_used], &info), "b,c");
//!     }
//!     other => panic!("unexpected token {other:?}"),
//! }
//! ```

use crate::Dialect;
use serde::{Deserialize, Serialize};

/// The part of a field the lexer is currently inside.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParsingArea {
    /// No character of the field has been examined yet.
    #[default]
    None,
    Value,
    QuotedValue,
    /// A quote was seen inside a quoted value; it closes the value unless doubled.
    QuotedValueTail,
    /// An escape character was seen; the next character is taken literally.
    EscapedSymbol,
    /// The first terminator character was seen; the second one is expected.
    LineTerminatorTail,
    Annotation,
}

/// Resumable cursor over the field being recognized.
///
/// `chars_parsed` counts UTF-8 units of the buffer already examined for the current
/// field, starting at the beginning of the unconsumed text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserState {
    pub area: ParsingArea,
    pub chars_parsed: usize,
    pub chars_escaped: usize,
    pub found_quoting: bool,
    pub found_annotation: bool,
}

/// What ended a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    /// The stream ended.
    None,
    Delimiter,
    Terminator,
}

/// Describes how to slice and unescape a recognized field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// UTF-8 units of the field including quotes and its separator.
    pub chars_used: usize,
    pub chars_escaped: usize,
    pub separator: Separator,
    pub has_quoting: bool,
    pub is_annotation: bool,
}

/// Outcome of a single [`Lexer::parse`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token {
    Field(FieldInfo),
    NeedMoreData,
    /// The text does not follow the dialect; `offset` is relative to the buffer start.
    InvalidData {
        offset: usize,
        reason: &'static str,
    },
}

/// Tokenizer for one dialect.
#[derive(Clone, Debug)]
pub struct Lexer {
    delimiter: char,
    quote: char,
    escape: char,
    terminator_first: char,
    terminator_second: Option<char>,
    terminator_len: usize,
    annotation_prefix: Option<char>,
}

impl Lexer {
    #[must_use]
    pub fn new(dialect: &Dialect) -> Self {
        let (terminator_first, terminator_second) = dialect.terminator_chars();
        Lexer {
            delimiter: dialect.delimiter(),
            quote: dialect.quote(),
            escape: dialect.escape(),
            terminator_first,
            terminator_second,
            terminator_len: dialect.terminator().len(),
            annotation_prefix: dialect.annotation_prefix(),
        }
    }

    /// Recognizes the next field at the start of `buffer`.
    ///
    /// `at_end` tells whether `buffer` holds everything left in the stream. The returned
    /// cursor must be passed to the next call; it is reset whenever a field is emitted.
    #[must_use]
    pub fn parse(
        &self,
        buffer: &str,
        at_end: bool,
        start_of_record: bool,
        mut state: ParserState,
    ) -> (Token, ParserState) {
        loop {
            let rest = &buffer[state.chars_parsed..];
            match state.area {
                ParsingArea::None => {
                    let Some(c) = rest.chars().next() else {
                        return self.exhausted(at_end, state);
                    };
                    state.chars_parsed += c.len_utf8();
                    if c == self.delimiter {
                        return emit(state, Separator::Delimiter);
                    } else if c == self.terminator_first {
                        if self.terminator_second.is_none() {
                            return emit(state, Separator::Terminator);
                        }
                        state.area = ParsingArea::LineTerminatorTail;
                    } else if c == self.quote {
                        state.found_quoting = true;
                        state.area = ParsingArea::QuotedValue;
                    } else if start_of_record && self.annotation_prefix == Some(c) {
                        state.found_annotation = true;
                        state.area = ParsingArea::Annotation;
                    } else {
                        state.area = ParsingArea::Value;
                    }
                }
                ParsingArea::Value => {
                    let found = rest.char_indices().find(|&(_, c)| {
                        c == self.delimiter || c == self.terminator_first || c == self.quote
                    });
                    let Some((index, c)) = found else {
                        state.chars_parsed = buffer.len();
                        return self.exhausted(at_end, state);
                    };
                    if c == self.quote {
                        return (
                            Token::InvalidData {
                                offset: state.chars_parsed + index,
                                reason: "quote character inside an unquoted value",
                            },
                            state,
                        );
                    }
                    state.chars_parsed += index + c.len_utf8();
                    if c == self.delimiter {
                        return emit(state, Separator::Delimiter);
                    }
                    if self.terminator_second.is_none() {
                        return emit(state, Separator::Terminator);
                    }
                    state.area = ParsingArea::LineTerminatorTail;
                }
                ParsingArea::QuotedValue => {
                    let found = rest
                        .char_indices()
                        .find(|&(_, c)| c == self.quote || c == self.escape);
                    let Some((index, c)) = found else {
                        state.chars_parsed = buffer.len();
                        return self.exhausted(at_end, state);
                    };
                    state.chars_parsed += index + c.len_utf8();
                    state.area = if c == self.escape && self.escape != self.quote {
                        ParsingArea::EscapedSymbol
                    } else {
                        ParsingArea::QuotedValueTail
                    };
                }
                ParsingArea::EscapedSymbol => {
                    let Some(c) = rest.chars().next() else {
                        return self.exhausted(at_end, state);
                    };
                    if c != self.quote && c != self.escape {
                        return (
                            Token::InvalidData {
                                offset: state.chars_parsed,
                                reason: "escape character must be followed by a quote or an escape",
                            },
                            state,
                        );
                    }
                    state.chars_parsed += c.len_utf8();
                    state.chars_escaped += 1;
                    state.area = ParsingArea::QuotedValue;
                }
                ParsingArea::QuotedValueTail => {
                    let Some(c) = rest.chars().next() else {
                        return self.exhausted(at_end, state);
                    };
                    if c == self.quote && self.escape == self.quote {
                        state.chars_parsed += c.len_utf8();
                        state.chars_escaped += 1;
                        state.area = ParsingArea::QuotedValue;
                    } else if c == self.delimiter {
                        state.chars_parsed += c.len_utf8();
                        return emit(state, Separator::Delimiter);
                    } else if c == self.terminator_first {
                        state.chars_parsed += c.len_utf8();
                        if self.terminator_second.is_none() {
                            return emit(state, Separator::Terminator);
                        }
                        state.area = ParsingArea::LineTerminatorTail;
                    } else {
                        return (
                            Token::InvalidData {
                                offset: state.chars_parsed,
                                reason: "unexpected character after a closing quote",
                            },
                            state,
                        );
                    }
                }
                ParsingArea::LineTerminatorTail => {
                    let Some(c) = rest.chars().next() else {
                        return self.exhausted(at_end, state);
                    };
                    if Some(c) == self.terminator_second {
                        state.chars_parsed += c.len_utf8();
                        return emit(state, Separator::Terminator);
                    }
                    if state.found_quoting {
                        return (
                            Token::InvalidData {
                                offset: state.chars_parsed,
                                reason: "incomplete terminator after a closing quote",
                            },
                            state,
                        );
                    }
                    // The lone first terminator character is content; re-examine the lookahead.
                    state.area = if state.found_annotation {
                        ParsingArea::Annotation
                    } else {
                        ParsingArea::Value
                    };
                }
                ParsingArea::Annotation => {
                    let found = rest
                        .char_indices()
                        .find(|&(_, c)| c == self.terminator_first);
                    let Some((index, c)) = found else {
                        state.chars_parsed = buffer.len();
                        return self.exhausted(at_end, state);
                    };
                    state.chars_parsed += index + c.len_utf8();
                    if self.terminator_second.is_none() {
                        return emit(state, Separator::Terminator);
                    }
                    state.area = ParsingArea::LineTerminatorTail;
                }
            }
        }
    }

    fn exhausted(&self, at_end: bool, state: ParserState) -> (Token, ParserState) {
        if !at_end {
            return (Token::NeedMoreData, state);
        }
        match state.area {
            ParsingArea::QuotedValue | ParsingArea::EscapedSymbol => (
                Token::InvalidData {
                    offset: state.chars_parsed,
                    reason: "unexpected end of stream inside a quoted value",
                },
                state,
            ),
            ParsingArea::LineTerminatorTail if state.found_quoting => (
                Token::InvalidData {
                    offset: state.chars_parsed,
                    reason: "incomplete terminator after a closing quote",
                },
                state,
            ),
            _ => emit(state, Separator::None),
        }
    }

    /// Byte range of the field content within its raw text, excluding quotes, the
    /// annotation prefix and the separator. Escape sequences are still present.
    #[must_use]
    pub fn content_range(&self, info: &FieldInfo) -> (usize, usize) {
        let separator_len = match info.separator {
            Separator::None => 0,
            Separator::Delimiter => self.delimiter.len_utf8(),
            Separator::Terminator => self.terminator_len,
        };
        let end = info.chars_used - separator_len;
        if info.is_annotation {
            let prefix_len = self.annotation_prefix.map_or(0, char::len_utf8);
            (prefix_len, end)
        } else if info.has_quoting {
            let quote_len = self.quote.len_utf8();
            debug_assert!(end >= 2 * quote_len, "quoted field without closing quote");
            (quote_len, end - quote_len)
        } else {
            (0, end)
        }
    }

    /// Returns the escaped content of a field given its raw text.
    #[must_use]
    pub fn content<'a>(&self, raw: &'a str, info: &FieldInfo) -> &'a str {
        let (start, end) = self.content_range(info);
        &raw[start..end]
    }

    /// Copies `content` into `out`, dropping every escape character and keeping the
    /// character it protects. Returns the number of escape characters removed.
    pub fn unescape_into(&self, content: &str, out: &mut String) -> usize {
        let mut removed = 0;
        let mut rest = content;
        out.reserve(content.len());
        while let Some(index) = rest.find(self.escape) {
            out.push_str(&rest[..index]);
            let mut protected = rest[index + self.escape.len_utf8()..].chars();
            removed += 1;
            match protected.next() {
                Some(c) => {
                    out.push(c);
                    rest = protected.as_str();
                }
                None => {
                    rest = "";
                    break;
                }
            }
        }
        out.push_str(rest);
        removed
    }
}

fn emit(state: ParserState, separator: Separator) -> (Token, ParserState) {
    let info = FieldInfo {
        chars_used: state.chars_parsed,
        chars_escaped: state.chars_escaped,
        separator,
        has_quoting: state.found_quoting,
        is_annotation: state.found_annotation,
    };
    (Token::Field(info), ParserState::default())
}

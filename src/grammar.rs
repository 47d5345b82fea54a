//! Accepted syntax
//!
//! This module documents the delimiter-separated format as read and written by this
//! library. The exact tokens come from the [`Dialect`](crate::Dialect); the examples below
//! use the default dialect (`\r\n`, `,`, `"`) unless noted.
//!
//! # Overview
//!
//! A stream is a sequence of records separated by the terminator. A record is either a
//! sequence of fields separated by the delimiter, or a single annotation.
//!
//! ```text
//! stream      = [record *(terminator record)] [terminator]
//! record      = annotation / field *(delimiter field)
//! field       = quoted / unquoted
//! unquoted    = *(any char except delimiter, quote, first terminator char)
//!               ; a first terminator char not followed by the second one is content
//! quoted      = quote *(any char except quote and escape / escape (quote / escape)) quote
//! annotation  = prefix *(any char) ; up to the terminator, only as a record's first field
//! ```
//!
//! # Fields
//!
//! | Raw text | Value |
//! |----------|-------|
//! | `plain` | `plain` |
//! | `""` | empty |
//! | `"a,b"` | `a,b` |
//! | `"say ""hi"""` | `say "hi"` |
//! | `"two`&#9166;`lines"` | value with an embedded terminator |
//!
//! Empty fields are allowed anywhere: `,,` is a record of three empty fields. An empty
//! line is a record with one empty field. A terminator at the very end of the stream does
//! not start another record.
//!
//! ## Quoting
//!
//! A quote is only meaningful as the first character of a field. After the closing quote
//! the next character must be the delimiter, the terminator, or the end of the stream;
//! anything else is a format error, as is a quote inside an unquoted field.
//!
//! When the escape character differs from the quote (for example `\`), quotes and escape
//! characters inside a quoted field are written as `\"` and `\\`:
//!
//! ```text
//! "C:\\temp","say \"hi\""
//! ```
//!
//! ## Terminators
//!
//! Terminators are one or two characters. With a two-character terminator such as
//! `\r\n`, a lone `\r` inside an unquoted field is ordinary content. Directly after a
//! closing quote, however, a lone first character is a format error.
//!
//! # Annotations
//!
//! With an annotation prefix configured (say `#`), a record whose first character is the
//! prefix is an annotation running to the end of the line:
//!
//! ```text
//! #generated 2024-05-01
//! id,name
//! 1,"#1 fan"
//! ```
//!
//! A value that starts with the prefix is quoted by writers when it is the first field
//! of a record, so it reads back as a value.
//!
//! # Writing
//!
//! Writers quote a value only if it contains the delimiter, the quote, or the full
//! terminator. Escaping inserts the escape character before every quote and escape
//! character of the value.
//!
//! ```rust
//! use tabular_stream::{to_string, Dialect, Record};
//!
//! let dialect = Dialect::new("\n", ',', '"')
//!     .and_then(|d| d.with_escape('\\'))
//!     .unwrap();
//! let record: Record = ["C:\\temp", "say \"hi\"", "plain\\"].into_iter().collect();
//! let text = to_string(&[record], &dialect).unwrap();
//! assert_eq!(text, "C:\\temp,\"say \\\"hi\\\"\",plain\\\n");
//! ```
//!
//! # Limits
//!
//! - **Field length**: at most [`MAX_FIELD_LENGTH`](crate::MAX_FIELD_LENGTH) characters
//! - **Encodings**: anything `encoding_rs` decodes; malformed byte sequences decode to
//!   U+FFFD
//! - **Byte order marks**: stripped only at the start of a stream

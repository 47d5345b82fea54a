//! Error types for tabular reading and writing.
//!
//! ## Error Categories
//!
//! - **Dialect errors**: colliding or invalid tokens, raised when the dialect is built
//! - **Format errors**: malformed quoting or escaping, carrying the character offset
//! - **Unsupported field length**: a field would exceed [`MAX_FIELD_LENGTH`](crate::MAX_FIELD_LENGTH)
//! - **Conversion errors**: a value converter could not parse or format a value
//! - **I/O errors**: failures of the underlying stream, passed through unchanged
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::{Dialect, Error};
//!
//! let result = Dialect::new("\n", ',', ',');
//! assert!(matches!(result, Err(Error::Dialect(_))));
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

/// Represents all errors that can occur while reading or writing tabular data.
#[derive(Debug, Error)]
pub enum Error {
    /// The dialect tokens are invalid or collide with each other.
    #[error("Invalid dialect: {0}")]
    Dialect(String),

    /// The reader or writer options are out of range.
    #[error("Invalid options: {0}")]
    Options(String),

    /// The input is not valid for the dialect.
    #[error("Invalid tabular data at position {position}: {msg}")]
    Format { position: u64, msg: String },

    /// A field is longer than the maximum supported length.
    #[error("Field length exceeds the maximum supported length of {max} characters")]
    UnsupportedFieldLength { max: usize },

    /// A value converter failed to parse or format a value.
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The call is not valid for the current reader or writer position.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// An argument cannot be represented in the dialect.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Creates a dialect configuration error.
    pub fn dialect(msg: &str) -> Self {
        Error::Dialect(msg.to_string())
    }

    /// Creates a format error at the given absolute character offset.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tabular_stream::Error;
    ///
    /// let err = Error::format(12, "unterminated quoted value");
    /// assert!(err.to_string().contains("position 12"));
    /// ```
    pub fn format(position: u64, msg: &str) -> Self {
        Error::Format {
            position,
            msg: msg.to_string(),
        }
    }

    /// Creates an unsupported field length error.
    pub fn unsupported_field_length() -> Self {
        Error::UnsupportedFieldLength {
            max: crate::MAX_FIELD_LENGTH,
        }
    }

    /// Creates a conversion error with a display message.
    pub fn conversion<T: fmt::Display>(msg: T) -> Self {
        Error::Conversion(msg.to_string())
    }

    pub fn invalid_operation(msg: &str) -> Self {
        Error::InvalidOperation(msg.to_string())
    }

    pub fn invalid_argument(msg: &str) -> Self {
        Error::InvalidArgument(msg.to_string())
    }

    /// Returns the character offset of a format error.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        match self {
            Error::Format { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Rebuilds an equivalent error so a failed reader can report it again.
    pub(crate) fn replay(&self) -> Self {
        match self {
            Error::Dialect(msg) => Error::Dialect(msg.clone()),
            Error::Options(msg) => Error::Options(msg.clone()),
            Error::Format { position, msg } => Error::Format {
                position: *position,
                msg: msg.clone(),
            },
            Error::UnsupportedFieldLength { max } => Error::UnsupportedFieldLength { max: *max },
            Error::Conversion(msg) => Error::Conversion(msg.clone()),
            Error::InvalidOperation(msg) => Error::InvalidOperation(msg.clone()),
            Error::InvalidArgument(msg) => Error::InvalidArgument(msg.clone()),
            Error::Io(err) => Error::Io(io::Error::new(err.kind(), err.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

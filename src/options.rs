//! Configuration options for tabular readers and writers.
//!
//! ## Examples
//!
//! ```rust
//! use tabular_stream::TabularOptions;
//!
//! let options = TabularOptions::new()
//!     .with_encoding(encoding_rs::UTF_16LE)
//!     .with_byte_order_mark(true)
//!     .with_buffer_size(4096)
//!     .with_header(true);
//! assert!(options.validate().is_ok());
//! ```

use crate::{Error, Result, MAX_FIELD_LENGTH};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

/// Default size, in bytes, of the stream chunks read and written by the codec.
pub const DEFAULT_BUFFER_SIZE: usize = 16 * 1024;

/// Options shared by readers and writers.
///
/// - `encoding`: text encoding of the stream (UTF-8 by default)
/// - `byte_order_mark`: whether writers emit the encoding preamble at the start of a stream
/// - `buffer_size`: size of each stream read and of the write flush threshold
/// - `trim_whitespace`: whether readers trim unquoted values
/// - `has_header`: whether record readers treat the first value record as a header
///
/// The encoding is serialized by its WHATWG name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabularOptions {
    #[serde(with = "encoding_label")]
    pub encoding: &'static Encoding,
    pub byte_order_mark: bool,
    pub buffer_size: usize,
    pub trim_whitespace: bool,
    pub has_header: bool,
}

impl Default for TabularOptions {
    fn default() -> Self {
        TabularOptions {
            encoding: encoding_rs::UTF_8,
            byte_order_mark: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
            trim_whitespace: false,
            has_header: false,
        }
    }
}

impl TabularOptions {
    /// Creates default options (UTF-8 without preamble, 16 KiB buffers).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tabular_stream::TabularOptions;
    ///
    /// let options = TabularOptions::new();
    /// assert_eq!(options.encoding, encoding_rs::UTF_8);
    /// assert!(!options.byte_order_mark);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_byte_order_mark(mut self, byte_order_mark: bool) -> Self {
        self.byte_order_mark = byte_order_mark;
        self
    }

    /// Sets the chunk size used for stream reads and the write flush threshold.
    #[must_use]
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    #[must_use]
    pub fn with_trim_whitespace(mut self, trim_whitespace: bool) -> Self {
        self.trim_whitespace = trim_whitespace;
        self
    }

    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Checks that the buffer size is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Options`] when `buffer_size` is zero or larger than
    /// [`MAX_FIELD_LENGTH`].
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(Error::Options("buffer size must be positive".to_string()));
        }
        if self.buffer_size > MAX_FIELD_LENGTH {
            return Err(Error::Options(format!(
                "buffer size must not exceed {MAX_FIELD_LENGTH}"
            )));
        }
        Ok(())
    }
}

mod encoding_label {
    use encoding_rs::Encoding;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(encoding: &&'static Encoding, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(encoding.name())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<&'static Encoding, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = String::deserialize(deserializer)?;
        Encoding::for_label(label.as_bytes())
            .ok_or_else(|| D::Error::custom(format!("unknown encoding label '{label}'")))
    }
}

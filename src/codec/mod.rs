//! Incremental text codec between raw streams and the lexer/formatter.
//!
//! - [`TextReadBuffer`] decodes stream chunks into a growing text buffer
//! - [`TextWriteBuffer`] collects formatted text and encodes it into stream writes
//!
//! Both keep all codec state (partial multi-byte sequences, pending preambles) between
//! calls, and both expose a blocking and an async driver over the same pure steps.

mod read;
mod write;

pub use read::TextReadBuffer;
pub use write::TextWriteBuffer;

use encoding_rs::Encoding;

/// Byte order mark of encodings that have one.
pub(crate) fn preamble(encoding: &'static Encoding) -> &'static [u8] {
    if encoding == encoding_rs::UTF_8 {
        b"\xEF\xBB\xBF"
    } else if encoding == encoding_rs::UTF_16LE {
        b"\xFF\xFE"
    } else if encoding == encoding_rs::UTF_16BE {
        b"\xFE\xFF"
    } else {
        b""
    }
}

/// Smallest byte buffer the codec works with, so preambles and encoder output always fit.
pub(crate) const MIN_BYTE_BUFFER: usize = 16;

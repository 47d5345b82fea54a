use super::{preamble, MIN_BYTE_BUFFER};
use encoding_rs::{CoderResult, Encoder, Encoding};
use log::{debug, trace};
use std::io::{self, Write};

enum TextEncoder {
    Standard(Encoder),
    /// encoding_rs only decodes UTF-16, so it is encoded here.
    Utf16 { big_endian: bool },
}

/// Collects formatted text and encodes it into bounded stream writes.
pub struct TextWriteBuffer {
    text: String,
    encoded: usize,
    encoder: TextEncoder,
    bytes: Vec<u8>,
    preamble: &'static [u8],
    threshold: usize,
    bytes_committed: u64,
    finished: bool,
}

impl TextWriteBuffer {
    /// `emit_preamble` writes the encoding's byte order mark before the first bytes.
    pub fn new(encoding: &'static Encoding, buffer_size: usize, emit_preamble: bool) -> Self {
        let encoder = if encoding == encoding_rs::UTF_16LE {
            TextEncoder::Utf16 { big_endian: false }
        } else if encoding == encoding_rs::UTF_16BE {
            TextEncoder::Utf16 { big_endian: true }
        } else {
            TextEncoder::Standard(encoding.new_encoder())
        };
        TextWriteBuffer {
            text: String::with_capacity(buffer_size),
            encoded: 0,
            encoder,
            bytes: vec![0; buffer_size.max(MIN_BYTE_BUFFER)],
            preamble: if emit_preamble { preamble(encoding) } else { b"" },
            threshold: buffer_size,
            bytes_committed: 0,
            finished: false,
        }
    }

    /// Text not yet handed to the stream.
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn needs_flush(&self) -> bool {
        self.text.len() >= self.threshold
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn bytes_committed(&self) -> u64 {
        self.bytes_committed
    }

    /// Takes the preamble if it is due now.
    fn take_preamble(&mut self, last: bool) -> &'static [u8] {
        if self.text.is_empty() && !last {
            return b"";
        }
        std::mem::take(&mut self.preamble)
    }

    /// Encodes the next slice of pending text into `bytes`. Returns the number of bytes
    /// produced and whether all pending text has been encoded.
    fn encode_step(&mut self, last: bool) -> (usize, bool) {
        let source = &self.text[self.encoded..];
        match &mut self.encoder {
            TextEncoder::Standard(encoder) => {
                let (result, read, written, _) =
                    encoder.encode_from_utf8(source, &mut self.bytes, last);
                self.encoded += read;
                (written, result == CoderResult::InputEmpty)
            }
            TextEncoder::Utf16 { big_endian } => {
                let mut written = 0;
                let mut read = 0;
                let mut units = [0u16; 2];
                for c in source.chars() {
                    if written + 2 * c.len_utf16() > self.bytes.len() {
                        break;
                    }
                    for unit in c.encode_utf16(&mut units) {
                        let pair = if *big_endian {
                            unit.to_be_bytes()
                        } else {
                            unit.to_le_bytes()
                        };
                        self.bytes[written..written + 2].copy_from_slice(&pair);
                        written += 2;
                    }
                    read += c.len_utf8();
                }
                self.encoded += read;
                (written, self.encoded == self.text.len())
            }
        }
    }

    fn complete(&mut self, last: bool) {
        self.text.clear();
        self.encoded = 0;
        if last {
            self.finished = true;
            debug!("encoder finalized after {} bytes", self.bytes_committed);
        }
    }

    /// Encodes and writes all pending text. `last` finalizes the encoder.
    pub fn flush_to<W: Write>(&mut self, writer: &mut W, last: bool) -> io::Result<()> {
        if self.finished {
            return Ok(());
        }
        let preamble = self.take_preamble(last);
        if !preamble.is_empty() {
            writer.write_all(preamble)?;
            self.bytes_committed += preamble.len() as u64;
        }
        loop {
            let (written, done) = self.encode_step(last);
            if written > 0 {
                writer.write_all(&self.bytes[..written])?;
                self.bytes_committed += written as u64;
                trace!("wrote {} bytes", written);
            }
            if done {
                break;
            }
        }
        self.complete(last);
        writer.flush()
    }

    /// Async counterpart of [`flush_to`](Self::flush_to).
    #[cfg(feature = "tokio")]
    pub async fn flush_to_async<W>(&mut self, writer: &mut W, last: bool) -> io::Result<()>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        use tokio::io::AsyncWriteExt;

        if self.finished {
            return Ok(());
        }
        let preamble = self.take_preamble(last);
        if !preamble.is_empty() {
            writer.write_all(preamble).await?;
            self.bytes_committed += preamble.len() as u64;
        }
        loop {
            let (written, done) = self.encode_step(last);
            if written > 0 {
                writer.write_all(&self.bytes[..written]).await?;
                self.bytes_committed += written as u64;
                trace!("wrote {} bytes", written);
            }
            if done {
                break;
            }
        }
        self.complete(last);
        writer.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(encoding: &'static Encoding, text: &str, bom: bool, buffer_size: usize) -> Vec<u8> {
        let mut buffer = TextWriteBuffer::new(encoding, buffer_size, bom);
        let mut out = Vec::new();
        buffer.text_mut().push_str(text);
        buffer.flush_to(&mut out, true).unwrap();
        assert_eq!(buffer.bytes_committed(), out.len() as u64);
        out
    }

    #[test]
    fn test_utf8_without_bom() {
        assert_eq!(encode(encoding_rs::UTF_8, "a,b", false, 1), b"a,b");
    }

    #[test]
    fn test_utf8_bom_written_once() {
        let mut buffer = TextWriteBuffer::new(encoding_rs::UTF_8, 8, true);
        let mut out = Vec::new();
        buffer.flush_to(&mut out, false).unwrap();
        assert!(out.is_empty());
        buffer.text_mut().push_str("x");
        buffer.flush_to(&mut out, false).unwrap();
        buffer.text_mut().push_str("y");
        buffer.flush_to(&mut out, true).unwrap();
        assert_eq!(out, b"\xEF\xBB\xBFxy");
        assert!(buffer.is_finished());
    }

    #[test]
    fn test_empty_document_still_gets_bom() {
        assert_eq!(encode(encoding_rs::UTF_8, "", true, 8), b"\xEF\xBB\xBF");
    }

    #[test]
    fn test_utf16be_in_small_slices() {
        let bytes = encode(encoding_rs::UTF_16BE, "a😀", true, 1);
        assert_eq!(bytes, vec![0xFE, 0xFF, 0x00, 0x61, 0xD8, 0x3D, 0xDE, 0x00]);
    }

    #[test]
    fn test_legacy_encoding_long_text() {
        let text = "é".repeat(100);
        let bytes = encode(encoding_rs::WINDOWS_1252, &text, true, 4);
        assert_eq!(bytes, vec![0xE9; 100]);
    }

    #[test]
    fn test_threshold() {
        let mut buffer = TextWriteBuffer::new(encoding_rs::UTF_8, 4, false);
        buffer.text_mut().push_str("abc");
        assert!(!buffer.needs_flush());
        buffer.text_mut().push('d');
        assert!(buffer.needs_flush());
    }
}

use super::{preamble, MIN_BYTE_BUFFER};
use crate::MAX_FIELD_LENGTH;
use encoding_rs::{CoderResult, Decoder, Encoding};
use log::{debug, trace};
use std::io::{self, Read};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PreambleState {
    Detect,
    Done,
}

/// Decodes a byte stream chunk by chunk into a contiguous text buffer.
///
/// The text before `consumed` has been handed out to the reader; it is only dropped at
/// the next refill, so views of the last field stay valid until then.
pub struct TextReadBuffer {
    encoding: &'static Encoding,
    decoder: Decoder,
    bytes: Vec<u8>,
    pending: usize,
    text: String,
    consumed: usize,
    preamble: PreambleState,
    end_of_stream: bool,
    bytes_consumed: u64,
}

impl TextReadBuffer {
    /// `at_start` enables stripping of the encoding's byte order mark.
    pub fn new(encoding: &'static Encoding, buffer_size: usize, at_start: bool) -> Self {
        TextReadBuffer {
            encoding,
            decoder: encoding.new_decoder_without_bom_handling(),
            bytes: vec![0; buffer_size.max(MIN_BYTE_BUFFER)],
            pending: 0,
            text: String::with_capacity(buffer_size),
            consumed: 0,
            preamble: if at_start {
                PreambleState::Detect
            } else {
                PreambleState::Done
            },
            end_of_stream: false,
            bytes_consumed: 0,
        }
    }

    /// All text decoded since the last refill, consumed part included.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Offset of the first unconsumed character within [`text`](Self::text).
    pub fn consumed_offset(&self) -> usize {
        self.consumed
    }

    pub fn unconsumed(&self) -> &str {
        &self.text[self.consumed..]
    }

    pub fn consume(&mut self, len: usize) {
        debug_assert!(self.consumed + len <= self.text.len());
        self.consumed += len;
    }

    /// Whether the stream has been read to the end and fully decoded.
    pub fn is_finished(&self) -> bool {
        self.end_of_stream
    }

    /// Whether the unconsumed text cannot grow any further.
    pub fn is_full(&self) -> bool {
        self.text.len() - self.consumed >= MAX_FIELD_LENGTH
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed
    }

    /// Drops consumed text; returns whether a stream read should follow.
    fn prepare(&mut self) -> bool {
        if self.end_of_stream || self.is_full() {
            return false;
        }
        if self.consumed > 0 {
            self.text.drain(..self.consumed);
            self.consumed = 0;
        }
        true
    }

    /// Decodes `read` bytes freshly placed after the pending ones.
    fn commit(&mut self, read: usize) {
        self.bytes_consumed += read as u64;
        if read == 0 {
            self.end_of_stream = true;
            debug!("end of stream after {} bytes", self.bytes_consumed);
        }
        let available = self.pending + read;
        let mut start = 0;
        if self.preamble == PreambleState::Detect {
            let bom = preamble(self.encoding);
            let received = &self.bytes[..available];
            if received.len() < bom.len() && !self.end_of_stream && bom.starts_with(received) {
                self.pending = available;
                return;
            }
            if received.starts_with(bom) && !bom.is_empty() {
                debug!("skipping {} byte order mark", self.encoding.name());
                start = bom.len();
            }
            self.preamble = PreambleState::Done;
        }
        self.pending = 0;

        let source = &self.bytes[start..available];
        if let Some(needed) = self.decoder.max_utf8_buffer_length(source.len()) {
            self.text.reserve(needed);
        }
        let (result, decoded, _) =
            self.decoder
                .decode_to_string(source, &mut self.text, self.end_of_stream);
        debug_assert_eq!(result, CoderResult::InputEmpty);
        debug_assert_eq!(decoded, source.len());
        trace!(
            "decoded {} bytes, {} characters buffered",
            decoded,
            self.text.len() - self.consumed
        );
    }

    /// Reads and decodes one chunk from `reader`.
    pub fn fill<R: Read>(&mut self, reader: &mut R) -> io::Result<()> {
        if !self.prepare() {
            return Ok(());
        }
        let read = loop {
            match reader.read(&mut self.bytes[self.pending..]) {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.commit(read);
        Ok(())
    }

    /// Async counterpart of [`fill`](Self::fill).
    #[cfg(feature = "tokio")]
    pub async fn fill_async<R>(&mut self, reader: &mut R) -> io::Result<()>
    where
        R: tokio::io::AsyncRead + Unpin,
    {
        use tokio::io::AsyncReadExt;

        if !self.prepare() {
            return Ok(());
        }
        let read = loop {
            match reader.read(&mut self.bytes[self.pending..]).await {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        self.commit(read);
        Ok(())
    }
}

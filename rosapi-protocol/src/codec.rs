//! Encoder and decoder for API words and sentences.

use crate::error::ProtocolError;
use crate::{length, word};
use bytes::{BufMut, Bytes, BytesMut};

/// Encodes words and sentences into wire frames.
pub struct Encoder;

impl Encoder {
    /// Encodes a single framed word.
    pub fn encode_word(w: &[u8]) -> Result<BytesMut, ProtocolError> {
        let mut buf = BytesMut::with_capacity(w.len() + length::MAX_PREFIX_LEN);
        word::encode(w, &mut buf)?;
        Ok(buf)
    }

    /// Encodes a full sentence: every word in order, then the empty
    /// terminator word (a single zero byte).
    pub fn encode_sentence<I, W>(words: I) -> Result<BytesMut, ProtocolError>
    where
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
    {
        let mut buf = BytesMut::new();
        for w in words {
            word::encode(w.as_ref(), &mut buf)?;
        }
        buf.put_u8(0);
        Ok(buf)
    }
}

/// Streaming decoder that assembles words and sentences from raw bytes.
///
/// Feed bytes with [`extend`](Decoder::extend) as they arrive from the
/// transport; [`decode_sentence`](Decoder::decode_sentence) returns
/// `Ok(None)` until a complete sentence (terminated by the empty word) is
/// buffered.
#[derive(Debug)]
pub struct Decoder {
    buffer: BytesMut,
    /// Words of the sentence currently being assembled.
    partial: Vec<Bytes>,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(8192),
            partial: Vec::new(),
        }
    }

    /// Appends transport bytes to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Returns the number of raw bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns whether a frame or sentence is partially decoded.
    pub fn mid_frame(&self) -> bool {
        !self.buffer.is_empty() || !self.partial.is_empty()
    }

    /// Drops all buffered bytes and any partially assembled sentence.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.partial.clear();
    }

    /// Attempts to decode the next word from the buffer.
    pub fn decode_word(&mut self) -> Result<Option<Bytes>, ProtocolError> {
        word::decode(&mut self.buffer)
    }

    /// Attempts to decode the next complete sentence.
    ///
    /// The terminating empty word is consumed but not returned, so an
    /// empty `Vec` means an empty sentence arrived on the wire.
    pub fn decode_sentence(&mut self) -> Result<Option<Vec<Bytes>>, ProtocolError> {
        while let Some(w) = self.decode_word()? {
            if w.is_empty() {
                return Ok(Some(std::mem::take(&mut self.partial)));
            }
            self.partial.push(w);
        }
        Ok(None)
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

//! Word framing: length prefix followed by the raw payload.
//!
//! The word is the protocol's atomic unit. A zero-length word terminates a
//! sentence and is encoded as the single byte `0x00`.

use crate::error::ProtocolError;
use crate::length;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Appends one framed word (prefix plus payload) to `buf`.
pub fn encode(word: &[u8], buf: &mut BytesMut) -> Result<(), ProtocolError> {
    length::encode(word.len() as u64, buf)?;
    buf.put_slice(word);
    Ok(())
}

/// Decodes one word from the front of `buf`.
///
/// Returns `Ok(None)` when the buffer does not yet hold the complete word;
/// nothing is consumed in that case. The empty word decodes to an empty
/// `Bytes`.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Bytes>, ProtocolError> {
    let Some((len, prefix)) = length::decode(buf)? else {
        return Ok(None);
    };
    let len = len as usize;
    if buf.len() < prefix + len {
        return Ok(None);
    }

    buf.advance(prefix);
    Ok(Some(buf.split_to(len).freeze()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(word: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode(word, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_word_round_trip() {
        let mut buf = encoded(b"/interface/print");
        let word = decode(&mut buf).unwrap().unwrap();
        assert_eq!(word.as_ref(), b"/interface/print");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_empty_word_is_single_zero_byte() {
        let buf = encoded(b"");
        assert_eq!(buf.as_ref(), &[0x00]);

        let mut buf = buf;
        let word = decode(&mut buf).unwrap().unwrap();
        assert!(word.is_empty());
    }

    #[test]
    fn test_length_200_framing() {
        let payload = vec![0xABu8; 200];
        let buf = encoded(&payload);
        assert_eq!(buf.len(), 2 + 200);
        assert_eq!(&buf[..2], &[0x80, 0xC8]);
        assert_eq!(&buf[2..], payload.as_slice());
    }

    #[test]
    fn test_partial_word_not_consumed() {
        let full = encoded(b"=name=ether1");

        let mut buf = BytesMut::from(&full[..4]);
        assert!(decode(&mut buf).unwrap().is_none());
        // The partial frame stays buffered until the rest arrives.
        assert_eq!(buf.len(), 4);

        buf.extend_from_slice(&full[4..]);
        let word = decode(&mut buf).unwrap().unwrap();
        assert_eq!(word.as_ref(), b"=name=ether1");
    }

    #[test]
    fn test_arbitrary_bytes_in_payload() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let mut buf = encoded(&payload);
        let word = decode(&mut buf).unwrap().unwrap();
        assert_eq!(word.as_ref(), payload.as_slice());
    }

    #[test]
    fn test_invalid_prefix_surfaces() {
        let mut buf = BytesMut::from(&[0xF7u8, 0x00][..]);
        assert!(matches!(
            decode(&mut buf),
            Err(ProtocolError::InvalidLengthPrefix(0xF7))
        ));
    }
}

//! Canonical Binary Codec
//!
//! Every message on the wire and every state hash goes through these two
//! functions. The options are fixed (varint integers, little endian, 1 MiB
//! limit) so that both ends of a connection produce identical bytes.

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

/// Largest message accepted by [`decode`].
pub const MAX_MESSAGE_BYTES: u64 = 1 << 20;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Value could not be encoded.
    #[error("Encode failed: {0}")]
    Encode(bincode::Error),

    /// Bytes did not decode to the expected type.
    #[error("Decode failed: {0}")]
    Decode(bincode::Error),

    /// Bytes left over after a complete value.
    #[error("Trailing bytes after message: {0}")]
    TrailingBytes(usize),
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_varint_encoding()
        .with_little_endian()
        .with_limit(MAX_MESSAGE_BYTES)
}

/// Encode a value to its canonical bytes.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    options().serialize(value).map_err(CodecError::Encode)
}

/// Decode a value, rejecting trailing bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = bytes;
    let value = options()
        .deserialize_from(&mut reader)
        .map_err(CodecError::Decode)?;
    if !reader.is_empty() {
        return Err(CodecError::TrailingBytes(reader.len()));
    }
    Ok(value)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Sample {
        Empty,
        Named { name: String, score: u32 },
    }

    #[test]
    fn test_encode_decode() {
        let value = Sample::Named { name: "adam".into(), score: 7 };
        let bytes = encode(&value).unwrap();
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_varint_is_compact() {
        // Variant tag + one-byte length + 4 chars + one-byte score
        let bytes = encode(&Sample::Named { name: "adam".into(), score: 7 }).unwrap();
        assert_eq!(bytes.len(), 7);
    }

    #[test]
    fn test_rejects_garbage() {
        let result: Result<Sample, _> = decode(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_rejects_trailing_bytes() {
        let mut bytes = encode(&Sample::Empty).unwrap();
        bytes.push(0);
        let result: Result<Sample, _> = decode(&bytes);
        assert!(matches!(result, Err(CodecError::TrailingBytes(1))));
    }

    #[test]
    fn test_rejects_oversized_length_prefix() {
        // Variant 1, then a string length far above the limit
        let mut bytes = vec![1u8, 0xfd];
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        let result: Result<Sample, _> = decode(&bytes);
        assert!(result.is_err());
    }

    mod golden {
        use super::super::*;
        use crate::game::events::{ClientEvent, ServerEvent, ServerEvents};

        fn assert_golden<T>(value: &T, expected: &[u8])
        where
            T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
        {
            assert_eq!(encode(value).unwrap(), expected);
            assert_eq!(&decode::<T>(expected).unwrap(), value);
        }

        #[test]
        fn test_player_join_batch() {
            let batch = ServerEvents(vec![ServerEvent::PlayerJoin { id: 0, name: "adam".into() }]);
            // len 1, tag 1, id 0, "adam"
            assert_golden(&batch, &[0x01, 0x01, 0x00, 0x04, b'a', b'd', b'a', b'm']);
        }

        #[test]
        fn test_guess_word_batch() {
            let batch = ServerEvents(vec![ServerEvent::PlayerGuessWord {
                guesser: 1,
                guess: "incorrect".into(),
                after_draw_ops: 0,
            }]);
            let mut expected = vec![0x01, 0x0b, 0x01, 0x09];
            expected.extend_from_slice(b"incorrect");
            expected.push(0x00);
            assert_golden(&batch, &expected);
        }

        #[test]
        fn test_new_round_batch() {
            let batch = ServerEvents(vec![ServerEvent::NewRound {
                round_id: 5,
                drawer: 0,
                easy_word: "cat".into(),
                hard_word: "platypus".into(),
            }]);
            let mut expected = vec![0x01, 0x0d, 0x05, 0x00, 0x03];
            expected.extend_from_slice(b"cat");
            expected.push(0x08);
            expected.extend_from_slice(b"platypus");
            assert_golden(&batch, &expected);
        }

        #[test]
        fn test_client_events() {
            assert_golden(&ClientEvent::Leave, &[0x06]);

            // 300 needs the 0xfb marker plus a little-endian u16
            let guess = ClientEvent::GuessWord { guess: "cat".into(), after_draw_ops: 300 };
            assert_golden(&guess, &[0x04, 0x03, b'c', b'a', b't', 0xfb, 0x2c, 0x01]);
        }
    }
}

//! Strict RLP decoding helpers.

use rlp::{Decodable, Rlp};

use crate::error::CodecError;

/// Decode a value from `bytes`, requiring the RLP item to span the whole input.
///
/// Hashes are computed over encoded bytes, so trailing garbage after a valid item
/// must not be silently accepted.
pub fn decode_exact<T: Decodable>(bytes: &[u8]) -> Result<T, CodecError> {
    let rlp = Rlp::new(bytes);
    let info = rlp.payload_info()?;
    if info.total() != bytes.len() {
        return Err(CodecError::TrailingBytes {
            expected: info.total(),
            actual: bytes.len(),
        });
    }
    Ok(rlp.as_val()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_exact_rejects_trailing_bytes() {
        let mut encoded = rlp::encode(&42u64).to_vec();
        assert_eq!(decode_exact::<u64>(&encoded).unwrap(), 42);

        encoded.push(0x00);
        assert!(matches!(
            decode_exact::<u64>(&encoded),
            Err(CodecError::TrailingBytes {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_decode_exact_rejects_empty_input() {
        assert!(matches!(decode_exact::<u64>(&[]), Err(CodecError::Rlp(_))));
    }
}

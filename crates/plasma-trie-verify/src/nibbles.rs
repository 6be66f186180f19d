//! Nibble paths and hex-prefix (compact) encoding.

use plasma_primitives::codec::decode_exact;

const LEAF_FLAG: u8 = 0x2;
const ODD_FLAG: u8 = 0x1;

/// Expand bytes into their high/low nibbles
pub fn bytes_to_nibbles(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect()
}

/// Decode a hex-prefix encoded path into `(nibbles, is_leaf)`.
///
/// Returns `None` for an empty input, an unknown flag, or a non-zero padding nibble.
pub fn decode_hex_prefix(encoded: &[u8]) -> Option<(Vec<u8>, bool)> {
    let (first, rest) = encoded.split_first()?;
    let flag = first >> 4;
    if flag > (LEAF_FLAG | ODD_FLAG) {
        return None;
    }
    let is_leaf = flag & LEAF_FLAG != 0;

    let mut nibbles = Vec::with_capacity(rest.len() * 2 + 1);
    if flag & ODD_FLAG != 0 {
        nibbles.push(first & 0x0f);
    } else if first & 0x0f != 0 {
        return None;
    }
    nibbles.extend(bytes_to_nibbles(rest));
    Some((nibbles, is_leaf))
}

/// Hex-prefix encode a nibble path
pub fn encode_hex_prefix(nibbles: &[u8], is_leaf: bool) -> Vec<u8> {
    let mut flag = if is_leaf { LEAF_FLAG } else { 0 };
    let odd = nibbles.len() % 2 == 1;
    if odd {
        flag |= ODD_FLAG;
    }

    let mut encoded = Vec::with_capacity(nibbles.len() / 2 + 1);
    let rest = if odd {
        encoded.push((flag << 4) | nibbles[0]);
        &nibbles[1..]
    } else {
        encoded.push(flag << 4);
        nibbles
    };
    encoded.extend(rest.chunks(2).map(|pair| (pair[0] << 4) | pair[1]));
    encoded
}

/// Branch path of the `tx_index`-th transaction or receipt of a block: `0x00 ‖ rlp(tx_index)`
pub fn key_path(tx_index: u64) -> Vec<u8> {
    encode_hex_prefix(&bytes_to_nibbles(&rlp::encode(&tx_index)), false)
}

/// Transaction index a branch path points at, if it is a canonical `key_path`
pub fn tx_index_from_branch_path(branch_path: &[u8]) -> Option<u64> {
    match branch_path.split_first() {
        Some((0x00, key)) => decode_exact::<u64>(key).ok(),
        _ => None,
    }
}

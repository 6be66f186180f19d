//! Keccak-256 helpers used for trie nodes, header leaves, event topics and selectors.

use primitive_types::{H160, H256, U256};
use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    H256(Keccak256::digest(data.as_ref()).into())
}

/// Topic 0 of a log emitted by the event with the given canonical signature,
/// e.g. `Transfer(address,address,uint256)`
pub fn event_signature(signature: &str) -> H256 {
    keccak256(signature.as_bytes())
}

/// First four bytes of the digest of a canonical function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest.as_bytes()[..4]);
    selector
}

/// Big-endian 32-byte word holding `value`
pub fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

/// Address stored in the low 20 bytes of a 32-byte word (indexed log topics)
pub fn word_to_address(word: &H256) -> H160 {
    H160::from_slice(&word.as_bytes()[12..])
}

/// Left-pad an address into a 32-byte word
pub fn address_to_word(address: &H160) -> H256 {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    H256(word)
}

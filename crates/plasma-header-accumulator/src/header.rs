//! Per-block accumulator leaf.

use plasma_primitives::hash::u256_word;
use plasma_primitives::{keccak256, H256, U256};
use serde::{Deserialize, Serialize};

/// The header fields a checkpoint commits to for one child block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderLeaf {
    pub block_number: u64,
    pub timestamp: u64,
    /// Root of the block's transaction trie
    pub tx_root: H256,
    /// Root of the block's receipt trie
    pub receipt_root: H256,
}

impl BlockHeaderLeaf {
    /// `keccak256(u256(block_number) ‖ u256(timestamp) ‖ tx_root ‖ receipt_root)`
    pub fn digest(&self) -> H256 {
        let mut preimage = Vec::with_capacity(128);
        preimage.extend_from_slice(&u256_word(U256::from(self.block_number)));
        preimage.extend_from_slice(&u256_word(U256::from(self.timestamp)));
        preimage.extend_from_slice(self.tx_root.as_bytes());
        preimage.extend_from_slice(self.receipt_root.as_bytes());
        keccak256(preimage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_binds_every_field() {
        let leaf = BlockHeaderLeaf {
            block_number: 7,
            timestamp: 1_600_000_000,
            tx_root: H256::repeat_byte(1),
            receipt_root: H256::repeat_byte(2),
        };
        let variants = [
            BlockHeaderLeaf { block_number: 8, ..leaf },
            BlockHeaderLeaf { timestamp: 1_600_000_001, ..leaf },
            BlockHeaderLeaf { tx_root: H256::repeat_byte(2), receipt_root: H256::repeat_byte(1), ..leaf },
        ];
        for variant in variants {
            assert_ne!(variant.digest(), leaf.digest());
        }
    }
}

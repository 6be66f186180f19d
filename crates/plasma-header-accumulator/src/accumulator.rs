//! Merkle tree over header leaves, padded with zero leaves to a power of two.

use plasma_primitives::{keccak256, H256};
use tracing::debug;

use crate::error::AccumulatorError;
use crate::header::BlockHeaderLeaf;

/// Header accumulator for the contiguous block range `[start, end]`.
///
/// Leaf `i` is the digest of block `start + i`; parents are
/// `keccak256(left ‖ right)`.
#[derive(Debug, Clone)]
pub struct HeaderAccumulator {
    start: u64,
    leaf_count: u64,
    /// Tree layers from the padded leaves (`layers[0]`) up to the root
    layers: Vec<Vec<H256>>,
}

impl HeaderAccumulator {
    /// Build the accumulator over headers given in block-number order
    pub fn from_headers(headers: &[BlockHeaderLeaf]) -> Result<Self, AccumulatorError> {
        let first = headers.first().ok_or(AccumulatorError::Empty)?;
        for (offset, header) in headers.iter().enumerate() {
            let expected = first.block_number + offset as u64;
            if header.block_number != expected {
                return Err(AccumulatorError::NonContiguous {
                    expected,
                    found: header.block_number,
                });
            }
        }

        let mut leaves: Vec<H256> = headers.iter().map(BlockHeaderLeaf::digest).collect();
        leaves.resize(headers.len().next_power_of_two(), H256::zero());

        let mut layers = vec![leaves];
        while let Some(layer) = layers.last().filter(|layer| layer.len() > 1) {
            let parents = layer
                .chunks(2)
                .map(|pair| hash_pair(&pair[0], &pair[1]))
                .collect();
            layers.push(parents);
        }

        debug!(
            "Built header accumulator over blocks {}..={} ({} layers)",
            first.block_number,
            first.block_number + headers.len() as u64 - 1,
            layers.len()
        );
        Ok(Self {
            start: first.block_number,
            leaf_count: headers.len() as u64,
            layers,
        })
    }

    pub fn root(&self) -> H256 {
        self.layers
            .last()
            .and_then(|layer| layer.first())
            .copied()
            .unwrap_or_default()
    }

    /// First block number covered
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last block number covered
    pub fn end(&self) -> u64 {
        self.start + self.leaf_count - 1
    }

    /// Number of real (unpadded) leaves
    pub fn leaf_count(&self) -> u64 {
        self.leaf_count
    }

    /// Sibling hashes from the leaf level up for leaf `index`
    pub fn proof(&self, index: u64) -> Result<Vec<H256>, AccumulatorError> {
        if index >= self.leaf_count {
            return Err(AccumulatorError::IndexOutOfRange {
                index,
                leaves: self.leaf_count,
            });
        }
        let mut position = index as usize;
        let mut siblings = Vec::with_capacity(self.layers.len() - 1);
        for layer in &self.layers[..self.layers.len() - 1] {
            siblings.push(layer[position ^ 1]);
            position /= 2;
        }
        Ok(siblings)
    }

    /// Leaf index and proof for the header of `block_number`
    pub fn proof_for_block(&self, block_number: u64) -> Result<(u64, Vec<H256>), AccumulatorError> {
        if block_number < self.start || block_number > self.end() {
            return Err(AccumulatorError::BlockOutOfRange {
                block: block_number,
                start: self.start,
                end: self.end(),
            });
        }
        let index = block_number - self.start;
        Ok((index, self.proof(index)?))
    }
}

fn hash_pair(left: &H256, right: &H256) -> H256 {
    let mut preimage = [0u8; 64];
    preimage[..32].copy_from_slice(left.as_bytes());
    preimage[32..].copy_from_slice(right.as_bytes());
    keccak256(preimage)
}

/// Check that `leaf` sits at `index` under `root`.
///
/// Bit `i` of `index` tells whether the running hash is the right child at level `i`;
/// `index` must fit in `proof.len()` bits, and a `u64` index never needs more than 64
/// siblings.
pub fn verify(leaf: &H256, index: u64, root: &H256, proof: &[H256]) -> bool {
    if proof.len() > 64 || (proof.len() < 64 && index >> proof.len() != 0) {
        return false;
    }
    let computed = proof.iter().enumerate().fold(*leaf, |node, (level, sibling)| {
        if (index >> level) & 1 == 1 {
            hash_pair(sibling, &node)
        } else {
            hash_pair(&node, sibling)
        }
    });
    computed == *root
}

/// Concatenate proof siblings into the wire format
pub fn proof_to_bytes(proof: &[H256]) -> Vec<u8> {
    proof.iter().flat_map(|hash| hash.to_fixed_bytes()).collect()
}

/// Split the wire format into 32-byte siblings
pub fn proof_from_bytes(bytes: &[u8]) -> Result<Vec<H256>, AccumulatorError> {
    if bytes.len() % 32 != 0 {
        return Err(AccumulatorError::MalformedProof(bytes.len()));
    }
    Ok(bytes.chunks(32).map(H256::from_slice).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn headers(start: u64, count: u64) -> Vec<BlockHeaderLeaf> {
        (start..start + count)
            .map(|block_number| BlockHeaderLeaf {
                block_number,
                timestamp: 1_000 + block_number * 2,
                tx_root: H256::from_low_u64_be(block_number),
                receipt_root: H256::from_low_u64_be(block_number + 1_000_000),
            })
            .collect()
    }

    #[test]
    fn test_single_header() {
        let leaves = headers(5, 1);
        let acc = HeaderAccumulator::from_headers(&leaves).unwrap();
        assert_eq!(acc.root(), leaves[0].digest());
        assert_eq!(acc.proof(0).unwrap(), vec![]);
        assert!(verify(&leaves[0].digest(), 0, &acc.root(), &[]));
        assert!(!verify(&leaves[0].digest(), 1, &acc.root(), &[]));
    }

    #[test]
    fn test_padding_with_zero_leaves() {
        let leaves = headers(0, 3);
        let acc = HeaderAccumulator::from_headers(&leaves).unwrap();
        let left = hash_pair(&leaves[0].digest(), &leaves[1].digest());
        let right = hash_pair(&leaves[2].digest(), &H256::zero());
        assert_eq!(acc.root(), hash_pair(&left, &right));
        assert_eq!((acc.start(), acc.end(), acc.leaf_count()), (0, 2, 3));
    }

    #[test]
    fn test_rejects_bad_inputs() {
        assert_eq!(
            HeaderAccumulator::from_headers(&[]).unwrap_err(),
            AccumulatorError::Empty
        );

        let mut leaves = headers(10, 4);
        leaves.swap(1, 2);
        assert_eq!(
            HeaderAccumulator::from_headers(&leaves).unwrap_err(),
            AccumulatorError::NonContiguous {
                expected: 11,
                found: 12
            }
        );

        let acc = HeaderAccumulator::from_headers(&headers(10, 4)).unwrap();
        assert!(matches!(
            acc.proof(4),
            Err(AccumulatorError::IndexOutOfRange { index: 4, leaves: 4 })
        ));
        assert!(matches!(
            acc.proof_for_block(9),
            Err(AccumulatorError::BlockOutOfRange { block: 9, .. })
        ));
    }

    #[test]
    fn test_index_must_fit_proof_depth() {
        let leaves = headers(0, 4);
        let acc = HeaderAccumulator::from_headers(&leaves).unwrap();
        let proof = acc.proof(1).unwrap();
        assert!(verify(&leaves[1].digest(), 1, &acc.root(), &proof));
        // 5 = 0b101 aliases index 1 on a two-level path
        assert!(!verify(&leaves[1].digest(), 5, &acc.root(), &proof));
    }

    #[test]
    fn test_oversized_proof_is_rejected() {
        let leaf = headers(0, 1)[0].digest();
        let deep = vec![H256::zero(); 64];
        assert!(!verify(&leaf, u64::MAX, &H256::zero(), &deep));
        let oversized = vec![H256::zero(); 65];
        assert!(!verify(&leaf, 0, &H256::zero(), &oversized));
        assert!(!verify(&leaf, u64::MAX, &H256::zero(), &oversized));
    }

    #[test]
    fn test_proof_wire_format() {
        let acc = HeaderAccumulator::from_headers(&headers(0, 8)).unwrap();
        let (index, proof) = acc.proof_for_block(6).unwrap();
        assert_eq!(index, 6);
        let bytes = proof_to_bytes(&proof);
        assert_eq!(bytes.len(), 96);
        assert_eq!(proof_from_bytes(&bytes).unwrap(), proof);
        assert_eq!(
            proof_from_bytes(&bytes[..95]).unwrap_err(),
            AccumulatorError::MalformedProof(95)
        );
    }

    proptest! {
        #[test]
        fn prop_every_leaf_verifies_and_substitution_fails(
            start in 0u64..1_000_000,
            count in 1u64..70,
            pick in any::<prop::sample::Index>(),
            other in any::<prop::sample::Index>(),
        ) {
            let leaves = headers(start, count);
            let acc = HeaderAccumulator::from_headers(&leaves).unwrap();
            let root = acc.root();

            for (index, leaf) in leaves.iter().enumerate() {
                let proof = acc.proof(index as u64).unwrap();
                prop_assert!(verify(&leaf.digest(), index as u64, &root, &proof));
            }

            let index = pick.index(leaves.len());
            let substitute = other.index(leaves.len());
            if substitute != index {
                let proof = acc.proof(index as u64).unwrap();
                prop_assert!(!verify(&leaves[substitute].digest(), index as u64, &root, &proof));
            }
        }
    }
}

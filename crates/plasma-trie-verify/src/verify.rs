//! Trie proof verification.

use plasma_primitives::{keccak256, H256};
use rlp::Rlp;
use thiserror::Error;
use tracing::debug;

use crate::nibbles::decode_hex_prefix;

const BRANCH_ARITY: usize = 17;
const SHORT_NODE_ARITY: usize = 2;

/// Reason a trie proof was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofFailure {
    #[error("Path is not a valid hex-prefix encoding")]
    InvalidPath,
    #[error("Proof ended before reaching a leaf (node {index} missing)")]
    MissingNode { index: usize },
    #[error("Hash of proof node {index} does not match its reference")]
    HashMismatch { index: usize },
    #[error("Proof node {index} is not a branch or short node")]
    MalformedNode { index: usize },
    #[error("Path diverges from the trie at node {index}")]
    PathMismatch { index: usize },
    #[error("Path is exhausted before a leaf at node {index}")]
    PathOverrun { index: usize },
    #[error("No child under the path at node {index}")]
    MissingChild { index: usize },
    #[error("Stored value differs from the expected value")]
    ValueMismatch,
    #[error("{unused} proof node(s) left unused")]
    TrailingNodes { unused: usize },
}

/// How a parent node refers to its child
enum NodeRef<'a> {
    /// Child stored as a separate proof node with this hash
    Hash(H256),
    /// Child shorter than 32 bytes, embedded in the parent
    Inline(&'a [u8]),
}

/// Verify that `value` is stored under the hex-prefix encoded `path` in the trie
/// with the given `root`, logging the reason of any rejection.
pub fn verify(value: &[u8], path: &[u8], proof_nodes: &[Vec<u8>], root: &H256) -> bool {
    match verify_proof(value, path, proof_nodes, root) {
        Ok(()) => true,
        Err(reason) => {
            debug!("Trie proof rejected: {}", reason);
            false
        }
    }
}

/// Verify a trie proof, reporting why it fails.
///
/// `proof_nodes` must hold exactly the hashed nodes on the way from `root` to the
/// leaf, in order. Children shorter than 32 bytes are read from their parent.
pub fn verify_proof(
    value: &[u8],
    path: &[u8],
    proof_nodes: &[Vec<u8>],
    root: &H256,
) -> Result<(), ProofFailure> {
    let (key, _) = decode_hex_prefix(path).ok_or(ProofFailure::InvalidPath)?;

    let mut next = NodeRef::Hash(*root);
    let mut consumed = 0;
    let mut offset = 0;
    // Last hashed node reached; inline nodes report their enclosing node
    let mut index = 0;

    let stored = loop {
        let node: &[u8] = match next {
            NodeRef::Hash(hash) => {
                let node = proof_nodes
                    .get(consumed)
                    .ok_or(ProofFailure::MissingNode { index: consumed })?;
                if keccak256(node) != hash {
                    return Err(ProofFailure::HashMismatch { index: consumed });
                }
                index = consumed;
                consumed += 1;
                node
            }
            NodeRef::Inline(node) => node,
        };

        let rlp = Rlp::new(node);
        let malformed = || ProofFailure::MalformedNode { index };
        match rlp.item_count().map_err(|_| malformed())? {
            BRANCH_ARITY => {
                if offset == key.len() {
                    break rlp.at(16).and_then(|v| v.data()).map_err(|_| malformed())?;
                }
                let child = rlp.at(key[offset] as usize).map_err(|_| malformed())?;
                offset += 1;
                next = child_ref(&child, index)?;
            }
            SHORT_NODE_ARITY => {
                let encoded_partial = rlp.at(0).and_then(|p| p.data()).map_err(|_| malformed())?;
                let (partial, is_leaf) = decode_hex_prefix(encoded_partial).ok_or_else(malformed)?;
                let remaining = &key[offset..];
                if !remaining.starts_with(&partial) {
                    return Err(if remaining.len() < partial.len() {
                        ProofFailure::PathOverrun { index }
                    } else {
                        ProofFailure::PathMismatch { index }
                    });
                }
                offset += partial.len();

                if is_leaf {
                    if offset != key.len() {
                        return Err(ProofFailure::PathMismatch { index });
                    }
                    break rlp.at(1).and_then(|v| v.data()).map_err(|_| malformed())?;
                }
                let child = rlp.at(1).map_err(|_| malformed())?;
                next = child_ref(&child, index)?;
            }
            _ => return Err(malformed()),
        }
    };

    if stored != value {
        return Err(ProofFailure::ValueMismatch);
    }
    if consumed != proof_nodes.len() {
        return Err(ProofFailure::TrailingNodes {
            unused: proof_nodes.len() - consumed,
        });
    }
    Ok(())
}

fn child_ref<'a>(child: &Rlp<'a>, index: usize) -> Result<NodeRef<'a>, ProofFailure> {
    if child.is_list() {
        return Ok(NodeRef::Inline(child.as_raw()));
    }
    let data = child
        .data()
        .map_err(|_| ProofFailure::MalformedNode { index })?;
    match data.len() {
        0 => Err(ProofFailure::MissingChild { index }),
        32 => Ok(NodeRef::Hash(H256::from_slice(data))),
        _ => Err(ProofFailure::MalformedNode { index }),
    }
}

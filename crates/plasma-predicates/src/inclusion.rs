//! Reference proof inclusion checks against committed header blocks.

use plasma_header_accumulator::{proof_from_bytes, verify as verify_header, BlockHeaderLeaf};
use plasma_primitives::{Age, CheckpointRegistry, HeaderBlock, ReferenceProof};
use plasma_trie_verify::{tx_index_from_branch_path, verify_proof};
use tracing::debug;

use crate::error::InclusionError;
use crate::receipt::{ChildLog, Receipt};

/// Facts established by a verified reference proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedReference {
    /// Priority of the referenced log
    pub age: Age,
    pub header_block_id: u64,
    pub header_block: HeaderBlock,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
    /// The referenced log
    pub log: ChildLog,
    /// Signed transaction bytes, when the proof carried a transaction proof
    pub transaction: Option<Vec<u8>>,
}

/// Verify a reference proof end to end.
///
/// Checks that the header block exists and covers the block, that the block header
/// is included in the header block root, that the receipt (and transaction, when
/// present) is in the block's tries, and that the receipt is successful and holds
/// the referenced log.
pub fn verify_reference(
    checkpoints: &dyn CheckpointRegistry,
    proof: &ReferenceProof,
) -> Result<VerifiedReference, InclusionError> {
    let header_block = checkpoints
        .get_header_block(proof.header_block_id)
        .ok_or(InclusionError::HeaderNotCheckpointed(proof.header_block_id))?;
    if !header_block.covers(proof.block_number) {
        return Err(InclusionError::RangeMismatch {
            block_number: proof.block_number,
            start: header_block.start,
            end: header_block.end,
        });
    }

    let leaf = BlockHeaderLeaf {
        block_number: proof.block_number,
        timestamp: proof.block_timestamp,
        tx_root: proof.tx_root,
        receipt_root: proof.receipt_root,
    };
    let siblings = proof_from_bytes(&proof.header_merkle_proof)?;
    let leaf_index = proof.block_number - header_block.start;
    if !verify_header(&leaf.digest(), leaf_index, &header_block.root, &siblings) {
        debug!(
            "Header proof for block {} rejected against header block {}",
            proof.block_number, proof.header_block_id
        );
        return Err(InclusionError::HeaderProof(proof.block_number));
    }

    verify_proof(
        &proof.receipt_bytes,
        &proof.branch_path,
        &proof.receipt_proof_nodes,
        &proof.receipt_root,
    )
    .map_err(InclusionError::ReceiptProof)?;

    if let Some(transaction) = &proof.transaction {
        verify_proof(
            &transaction.tx_bytes,
            &proof.branch_path,
            &transaction.tx_proof_nodes,
            &proof.tx_root,
        )
        .map_err(InclusionError::TransactionProof)?;
    }

    let tx_index =
        tx_index_from_branch_path(&proof.branch_path).ok_or(InclusionError::InvalidBranchPath)?;
    let receipt = Receipt::decode(&proof.receipt_bytes)?;
    if !receipt.is_success() {
        return Err(InclusionError::FailedTransaction {
            block_number: proof.block_number,
            tx_index,
        });
    }
    let log = usize::try_from(proof.log_index)
        .ok()
        .and_then(|index| receipt.logs.get(index))
        .cloned()
        .ok_or(InclusionError::LogIndexOutOfRange {
            log_index: proof.log_index,
            logs: receipt.logs.len(),
        })?;

    let age = Age::pack(
        proof.header_block_id,
        proof.block_number,
        tx_index,
        proof.log_index,
    )?;

    Ok(VerifiedReference {
        age,
        header_block_id: proof.header_block_id,
        header_block,
        block_number: proof.block_number,
        tx_index,
        log_index: proof.log_index,
        log,
        transaction: proof.transaction.as_ref().map(|t| t.tx_bytes.clone()),
    })
}

//! Reference proof: a self-contained claim that a log exists in a checkpointed block.

use primitive_types::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

use crate::codec::decode_exact;
use crate::error::CodecError;
use crate::serde_hex;

const BASE_FIELDS: usize = 10;
const WITH_TRANSACTION_FIELDS: usize = 12;

/// Inclusion proof of a child-chain log, anchored at a checkpointed header block.
///
/// Canonical encoding is a single RLP list in field order; when `transaction` is
/// present its two fields are appended, giving twelve items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceProof {
    /// Id of the header block whose root commits to `block_number`
    pub header_block_id: u64,
    /// Header accumulator siblings, concatenated 32-byte hashes from leaf to root
    #[serde(with = "serde_hex::bytes")]
    pub header_merkle_proof: Vec<u8>,
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_root: H256,
    pub receipt_root: H256,
    /// Hex-prefix encoded trie key: `0x00 ‖ rlp(tx_index)`
    #[serde(with = "serde_hex::bytes")]
    pub branch_path: Vec<u8>,
    /// Encoded receipt stored under `branch_path` in the receipt trie
    #[serde(with = "serde_hex::bytes")]
    pub receipt_bytes: Vec<u8>,
    /// Receipt trie nodes from root to leaf
    #[serde(with = "serde_hex::bytes_list")]
    pub receipt_proof_nodes: Vec<Vec<u8>>,
    /// Position of the referenced log inside the receipt
    pub log_index: u64,
    /// Transaction that produced the receipt; required when used as a challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionProof>,
}

/// Transaction trie membership of the transaction behind a receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionProof {
    /// Signed transaction stored under the same `branch_path` in the transaction trie
    #[serde(with = "serde_hex::bytes")]
    pub tx_bytes: Vec<u8>,
    #[serde(with = "serde_hex::bytes_list")]
    pub tx_proof_nodes: Vec<Vec<u8>>,
}

impl ReferenceProof {
    /// Canonical RLP encoding
    pub fn encode(&self) -> Vec<u8> {
        rlp::encode(self).to_vec()
    }

    /// Decode the canonical encoding, rejecting trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        decode_exact(bytes)
    }
}

impl Encodable for ReferenceProof {
    fn rlp_append(&self, s: &mut RlpStream) {
        let fields = match self.transaction {
            Some(_) => WITH_TRANSACTION_FIELDS,
            None => BASE_FIELDS,
        };
        s.begin_list(fields);
        s.append(&self.header_block_id);
        s.append(&self.header_merkle_proof);
        s.append(&self.block_number);
        s.append(&self.block_timestamp);
        s.append(&self.tx_root);
        s.append(&self.receipt_root);
        s.append(&self.branch_path);
        s.append(&self.receipt_bytes);
        s.append_list::<Vec<u8>, Vec<u8>>(&self.receipt_proof_nodes);
        s.append(&self.log_index);
        if let Some(transaction) = &self.transaction {
            s.append(&transaction.tx_bytes);
            s.append_list::<Vec<u8>, Vec<u8>>(&transaction.tx_proof_nodes);
        }
    }
}

impl Decodable for ReferenceProof {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        let transaction = match rlp.item_count()? {
            BASE_FIELDS => None,
            WITH_TRANSACTION_FIELDS => Some(TransactionProof {
                tx_bytes: rlp.val_at(10)?,
                tx_proof_nodes: rlp.list_at(11)?,
            }),
            _ => return Err(DecoderError::RlpIncorrectListLen),
        };

        Ok(Self {
            header_block_id: rlp.val_at(0)?,
            header_merkle_proof: rlp.val_at(1)?,
            block_number: rlp.val_at(2)?,
            block_timestamp: rlp.val_at(3)?,
            tx_root: rlp.val_at(4)?,
            receipt_root: rlp.val_at(5)?,
            branch_path: rlp.val_at(6)?,
            receipt_bytes: rlp.val_at(7)?,
            receipt_proof_nodes: rlp.list_at(8)?,
            log_index: rlp.val_at(9)?,
            transaction,
        })
    }
}

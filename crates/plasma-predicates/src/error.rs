use plasma_header_accumulator::AccumulatorError;
use plasma_primitives::{Address, CodecError, H256, U256};
use plasma_trie_verify::ProofFailure;
use thiserror::Error;

/// Errors raised while checking a reference proof against the checkpoints
#[derive(Error, Debug)]
pub enum InclusionError {
    /// No header block with this id has been committed
    #[error("Header block {0} is not checkpointed")]
    HeaderNotCheckpointed(u64),
    /// The header block does not cover the referenced block
    #[error("Block {block_number} outside header block range [{start}, {end}]")]
    RangeMismatch { block_number: u64, start: u64, end: u64 },
    /// Header accumulator proof is malformed
    #[error("Malformed header proof: {0}")]
    HeaderProofEncoding(#[from] AccumulatorError),
    /// Header accumulator proof does not lead to the header block root
    #[error("Header of block {0} is not included in the header block root")]
    HeaderProof(u64),
    /// Receipt trie proof rejected
    #[error("Receipt proof rejected: {0}")]
    ReceiptProof(ProofFailure),
    /// Transaction trie proof rejected
    #[error("Transaction proof rejected: {0}")]
    TransactionProof(ProofFailure),
    /// Branch path is not `0x00 ‖ rlp(tx_index)`
    #[error("Branch path does not encode a transaction index")]
    InvalidBranchPath,
    /// Referenced transaction reverted, so its receipt proves no state change
    #[error("Transaction {tx_index} of block {block_number} reverted")]
    FailedTransaction { block_number: u64, tx_index: u64 },
    /// Receipt has fewer logs than the referenced index
    #[error("Log index {log_index} out of range ({logs} logs)")]
    LogIndexOutOfRange { log_index: u64, logs: usize },
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Errors raised while recovering a signer
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    /// `v` is neither 27/28, 0/1 nor an EIP-155 value
    #[error("Invalid recovery value v = {0}")]
    InvalidRecoveryValue(u64),
    /// Signature bytes have the wrong length
    #[error("Signature must be 65 bytes, got {0}")]
    InvalidLength(usize),
    /// `r`/`s` out of range or no key recovers
    #[error("Signature recovery failed: {0}")]
    Recovery(#[from] secp256k1::Error),
    /// EIP-155 chain id differs from the configured child chain
    #[error("Transaction signed for chain {found:?}, expected {expected}")]
    ChainIdMismatch { expected: u64, found: Option<u64> },
}

/// Errors raised while decoding an exit or a spend
#[derive(Error, Debug)]
pub enum PredicateError {
    #[error(transparent)]
    Inclusion(#[from] InclusionError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Invalid signature: {0}")]
    Signature(#[from] SignatureError),
    /// Exit transaction creates a contract instead of calling one
    #[error("Exit transaction has no target contract")]
    ContractCreation,
    /// Child token has no root counterpart
    #[error("Child token {0:?} is not mapped to a root token")]
    UnmappedToken(Address),
    /// Function selector not handled by the predicate
    #[error("Unsupported function selector 0x{}", hex_selector(.0))]
    UnknownSelector([u8; 4]),
    /// Reference log topic 0 is not an event the predicate understands
    #[error("Unexpected event signature {0:?}")]
    UnexpectedEvent(H256),
    /// Reference log is malformed for its event signature
    #[error("Malformed {0} log")]
    MalformedLog(&'static str),
    /// Reference log was emitted by another token than the exit transaction moves
    #[error("Token mismatch: expected {expected:?}, found {found:?}")]
    TokenMismatch { expected: Address, found: Address },
    /// Reference fact is about another participant than required
    #[error("Participant mismatch: expected {expected:?}, found {found:?}")]
    ParticipantMismatch { expected: Address, found: Address },
    /// Claimant is not a party of the exit transaction
    #[error("{0:?} is not a party of the exit transaction")]
    UnauthorizedClaimant(Address),
    /// Proven balance does not cover the transferred amount
    #[error("Closing balance {closing} is lower than amount {amount}")]
    InsufficientBalance { closing: U256, amount: U256 },
    /// Proven token id differs from the one moved by the exit transaction
    #[error("Token id mismatch: expected {expected}, found {found}")]
    TokenIdMismatch { expected: U256, found: U256 },
    /// Number of reference inputs not accepted by the predicate
    #[error("Expected {expected} reference input(s), got {found}")]
    InputCount { expected: &'static str, found: usize },
    /// Two inputs reference the same log
    #[error("Reference inputs must be distinct")]
    DuplicateInput,
    /// Marketplace order expired before a referenced block
    #[error("Order expiration {expiration} does not exceed input block {block_number}")]
    OrderExpired { expiration: U256, block_number: u64 },
}

fn hex_selector(selector: &[u8; 4]) -> String {
    selector.iter().map(|b| format!("{:02x}", b)).collect()
}

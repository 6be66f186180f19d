//! Merkle-Patricia-Trie inclusion proofs for child-chain transaction and receipt tries
//!
//! The verifier is a pure function: it walks an ordered list of trie nodes from a
//! trusted root down to the leaf stored under a key and reports whether the leaf holds
//! exactly the expected bytes. [`MemoryTrie`] is the client-side counterpart used to
//! build roots and proofs for a block's ordered transactions or receipts.

pub mod builder;
pub mod nibbles;
pub mod verify;

pub use builder::{MemoryTrie, EMPTY_TRIE_ROOT};
pub use nibbles::{key_path, tx_index_from_branch_path};
pub use verify::{verify, verify_proof, ProofFailure};

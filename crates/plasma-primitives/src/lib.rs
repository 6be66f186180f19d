//! Shared primitives for the plasma exit game
//!
//! This crate holds the pieces every other crate speaks: Keccak-256 helpers, the
//! canonical RLP and ABI codecs, the packed exit [`Age`], checkpointed [`HeaderBlock`]s
//! and the [`ReferenceProof`] payload, together with the read-only collaborator
//! interfaces (checkpoint registry, token mapping) the exit game consumes.

pub mod abi;
pub mod age;
pub mod codec;
pub mod error;
pub mod hash;
pub mod header;
pub mod reference;
pub mod serde_hex;
pub mod tokens;

pub use primitive_types::{H160, H256, U256};

/// Account or contract address on either chain
pub type Address = H160;

pub use age::{Age, AgeComponents};
pub use error::CodecError;
pub use hash::{event_signature, function_selector, keccak256};
pub use header::{CheckpointError, CheckpointRegistry, HeaderBlock, MemoryCheckpoints};
pub use reference::{ReferenceProof, TransactionProof};
pub use tokens::{MemoryTokenMapping, TokenMapping, TokenMappingError};

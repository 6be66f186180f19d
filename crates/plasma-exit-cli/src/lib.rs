//! Plasma exit operator tooling
//!
//! Offline helpers around the exit game: building header block checkpoints from
//! child block headers, producing header proofs for reference payloads, verifying
//! reference proofs against a checkpoint fixture and inspecting signed exit
//! transactions before they are submitted.

pub mod checkpoint;
pub mod exit_tx;
pub mod fixtures;
pub mod header_proof;
pub mod reference;

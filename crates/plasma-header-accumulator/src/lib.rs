//! Binary Merkle accumulator over a contiguous range of child block headers
//!
//! The root of a [`HeaderAccumulator`] together with its `[start, end]` range is what
//! validators checkpoint on the root chain. Exits prove their block against it with
//! a sibling path checked by [`verify`].

pub mod accumulator;
pub mod error;
pub mod header;

pub use accumulator::{proof_from_bytes, proof_to_bytes, verify, HeaderAccumulator};
pub use error::AccumulatorError;
pub use header::BlockHeaderLeaf;

use thiserror::Error;

/// Errors raised while building or querying a header accumulator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccumulatorError {
    /// No headers to accumulate
    #[error("Cannot build an accumulator over no headers")]
    Empty,
    /// Headers are not consecutive block numbers
    #[error("Header for block {expected} expected, found block {found}")]
    NonContiguous { expected: u64, found: u64 },
    /// Leaf index past the number of headers
    #[error("Leaf index {index} out of range ({leaves} leaves)")]
    IndexOutOfRange { index: u64, leaves: u64 },
    /// Block number outside the accumulated range
    #[error("Block {block} outside accumulated range [{start}, {end}]")]
    BlockOutOfRange { block: u64, start: u64, end: u64 },
    /// Encoded proof is not a sequence of 32-byte hashes
    #[error("Encoded proof length {0} is not a multiple of 32")]
    MalformedProof(usize),
}

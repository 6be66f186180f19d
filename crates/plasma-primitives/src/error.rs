use thiserror::Error;

/// Errors raised while decoding canonical byte encodings
#[derive(Error, Debug)]
pub enum CodecError {
    /// Malformed RLP item
    #[error("RLP decoding failed: {0}")]
    Rlp(#[from] rlp::DecoderError),
    /// The RLP item does not span the whole input
    #[error("Trailing bytes after RLP item: item spans {expected} bytes, input has {actual}")]
    TrailingBytes { expected: usize, actual: usize },
    /// Calldata is shorter than a function selector
    #[error("Calldata shorter than a function selector")]
    MissingSelector,
    /// ABI word index points past the end of the data
    #[error("ABI data too short to read word {index}")]
    AbiOutOfBounds { index: usize },
    /// ABI word does not hold a value of the requested type
    #[error("ABI word {index} does not fit the requested type")]
    AbiInvalidWord { index: usize },
    /// A component of an exit age is outside its slot
    #[error("Age component {component} = {value} exceeds maximum {max}")]
    AgeOverflow {
        component: &'static str,
        value: u64,
        max: u64,
    },
    /// Invalid hex string
    #[error("Invalid hex string: {0}")]
    Hex(#[from] hex::FromHexError),
}

//! Minimal Solidity ABI codec for child-chain calldata.
//!
//! Only the word layouts the predicates need are supported: static words
//! (`address`, `uint256`, `bytes32`) and dynamic `bytes`.

use primitive_types::{H160, H256, U256};

use crate::error::CodecError;
use crate::hash::{address_to_word, u256_word};

const WORD: usize = 32;

/// Split calldata into its 4-byte selector and argument words
pub fn split_selector(calldata: &[u8]) -> Result<([u8; 4], &[u8]), CodecError> {
    if calldata.len() < 4 {
        return Err(CodecError::MissingSelector);
    }
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&calldata[..4]);
    Ok((selector, &calldata[4..]))
}

/// Reader over ABI-encoded arguments
#[derive(Debug, Clone, Copy)]
pub struct AbiReader<'a> {
    data: &'a [u8],
}

impl<'a> AbiReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Raw word at position `index`
    pub fn word(&self, index: usize) -> Result<&'a [u8], CodecError> {
        let start = index
            .checked_mul(WORD)
            .ok_or(CodecError::AbiOutOfBounds { index })?;
        self.data
            .get(start..start + WORD)
            .ok_or(CodecError::AbiOutOfBounds { index })
    }

    pub fn uint(&self, index: usize) -> Result<U256, CodecError> {
        Ok(U256::from_big_endian(self.word(index)?))
    }

    pub fn bytes32(&self, index: usize) -> Result<H256, CodecError> {
        Ok(H256::from_slice(self.word(index)?))
    }

    /// Address word; the 12 high bytes must be zero
    pub fn address(&self, index: usize) -> Result<H160, CodecError> {
        let word = self.word(index)?;
        if word[..12].iter().any(|b| *b != 0) {
            return Err(CodecError::AbiInvalidWord { index });
        }
        Ok(H160::from_slice(&word[12..]))
    }

    /// Dynamic `bytes` whose offset is stored in word `index`
    pub fn bytes(&self, index: usize) -> Result<&'a [u8], CodecError> {
        let offset = self.offset(index)?;
        let tail = AbiReader::new(self.data.get(offset..).unwrap_or_default());
        let length = tail.uint(0).map_err(|_| CodecError::AbiOutOfBounds { index })?;
        if length > U256::from(self.data.len()) {
            return Err(CodecError::AbiInvalidWord { index });
        }
        let length = length.low_u64() as usize;
        let start = offset + WORD;
        self.data
            .get(start..start + length)
            .ok_or(CodecError::AbiOutOfBounds { index })
    }

    fn offset(&self, index: usize) -> Result<usize, CodecError> {
        let offset = self.uint(index)?;
        if offset > U256::from(self.data.len()) {
            return Err(CodecError::AbiInvalidWord { index });
        }
        Ok(offset.low_u64() as usize)
    }
}

/// A value to ABI-encode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiToken {
    Address(H160),
    Uint(U256),
    Bytes32(H256),
    Bytes(Vec<u8>),
}

/// ABI-encode a tuple of tokens (head/tail layout)
pub fn encode(tokens: &[AbiToken]) -> Vec<u8> {
    let head_len = tokens.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        match token {
            AbiToken::Address(address) => head.extend_from_slice(address_to_word(address).as_bytes()),
            AbiToken::Uint(value) => head.extend_from_slice(&u256_word(*value)),
            AbiToken::Bytes32(value) => head.extend_from_slice(value.as_bytes()),
            AbiToken::Bytes(bytes) => {
                head.extend_from_slice(&u256_word(U256::from(head_len + tail.len())));
                tail.extend_from_slice(&u256_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        }
    }

    head.extend(tail);
    head
}

/// Calldata for a call to the function with the given selector
pub fn encode_call(selector: [u8; 4], tokens: &[AbiToken]) -> Vec<u8> {
    let mut calldata = selector.to_vec();
    calldata.extend(encode(tokens));
    calldata
}

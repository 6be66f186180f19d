//! Exit age: a single integer ordering proven child-chain events chronologically.
//!
//! The age packs `(header_block_id, block_number, tx_index, log_index)` with decreasing
//! decimal weights, so comparing two ages numerically compares the events they point at
//! in the order they happened on the child chain.

use std::fmt;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Power of ten weighting the header block id
pub const HEADER_BLOCK_WEIGHT_EXP: usize = 30;
/// Power of ten weighting the child block number
pub const BLOCK_NUMBER_WEIGHT_EXP: usize = 12;
/// Power of ten weighting the transaction index
pub const TX_INDEX_WEIGHT_EXP: usize = 5;

/// Largest block number that still fits below the header block weight
pub const MAX_BLOCK_NUMBER: u64 = 999_999_999_999_999_999;
/// Largest transaction index that still fits below the block number weight
pub const MAX_TX_INDEX: u64 = 9_999_999;
/// Largest log index that still fits below the transaction index weight
pub const MAX_LOG_INDEX: u64 = 99_999;

/// Packed, totally ordered priority of a proven child-chain event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Age(pub U256);

/// Unpacked view of an [`Age`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeComponents {
    pub header_block_id: u64,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
}

impl Age {
    /// Pack the age of the log `log_index` of transaction `tx_index` in child block
    /// `block_number`, checkpointed by header block `header_block_id`.
    pub fn pack(
        header_block_id: u64,
        block_number: u64,
        tx_index: u64,
        log_index: u64,
    ) -> Result<Self, CodecError> {
        check_slot("block_number", block_number, MAX_BLOCK_NUMBER)?;
        check_slot("tx_index", tx_index, MAX_TX_INDEX)?;
        check_slot("log_index", log_index, MAX_LOG_INDEX)?;

        let age = U256::from(header_block_id) * U256::exp10(HEADER_BLOCK_WEIGHT_EXP)
            + U256::from(block_number) * U256::exp10(BLOCK_NUMBER_WEIGHT_EXP)
            + U256::from(tx_index) * U256::exp10(TX_INDEX_WEIGHT_EXP)
            + U256::from(log_index);
        Ok(Self(age))
    }

    pub fn components(&self) -> AgeComponents {
        let header_weight = U256::exp10(HEADER_BLOCK_WEIGHT_EXP);
        let block_weight = U256::exp10(BLOCK_NUMBER_WEIGHT_EXP);
        let tx_weight = U256::exp10(TX_INDEX_WEIGHT_EXP);

        let below_header = self.0 % header_weight;
        let below_block = below_header % block_weight;
        AgeComponents {
            header_block_id: (self.0 / header_weight).low_u64(),
            block_number: (below_header / block_weight).low_u64(),
            tx_index: (below_block / tx_weight).low_u64(),
            log_index: (below_block % tx_weight).low_u64(),
        }
    }
}

impl fmt::Display for Age {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn check_slot(component: &'static str, value: u64, max: u64) -> Result<(), CodecError> {
    if value > max {
        return Err(CodecError::AgeOverflow {
            component,
            value,
            max,
        });
    }
    Ok(())
}

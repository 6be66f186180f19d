//! Checkpointed header blocks and the checkpoint registry interface.

use std::collections::BTreeMap;
use std::sync::RwLock;

use primitive_types::H256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Address;

/// Header block ids advance by this step, leaving room for deposit blocks in between
pub const HEADER_BLOCK_ID_STEP: u64 = 10_000;

/// Validator-signed commitment to a contiguous range of child blocks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderBlock {
    /// Root of the header accumulator built over the range
    pub root: H256,
    /// First child block number covered (inclusive)
    pub start: u64,
    /// Last child block number covered (inclusive)
    pub end: u64,
    /// Root chain timestamp at which the checkpoint was committed
    pub created_at: u64,
    /// Validator that proposed the checkpoint
    pub proposer: Address,
}

impl HeaderBlock {
    /// Whether `block_number` falls inside `[start, end]`
    pub fn covers(&self, block_number: u64) -> bool {
        self.start <= block_number && block_number <= self.end
    }
}

/// Read side of the checkpoint registry.
///
/// Returned header blocks are trusted unconditionally: signature and stake checks
/// happen inside the registry itself.
pub trait CheckpointRegistry: Send + Sync {
    /// Committed header block with the given id, if any
    fn get_header_block(&self, id: u64) -> Option<HeaderBlock>;
    /// Id of the most recently committed header block (0 when none)
    fn current_header_block_id(&self) -> u64;
}

/// Errors raised when submitting a header block
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CheckpointError {
    #[error("Header block range is empty: start {start} > end {end}")]
    EmptyRange { start: u64, end: u64 },
    #[error("Header block range must start at {expected}, got {found}")]
    NonContiguous { expected: u64, found: u64 },
}

/// In-memory checkpoint registry enforcing contiguous, non-overlapping ranges
#[derive(Debug)]
pub struct MemoryCheckpoints {
    blocks: RwLock<BTreeMap<u64, HeaderBlock>>,
    step: u64,
}

impl Default for MemoryCheckpoints {
    fn default() -> Self {
        Self::with_step(HEADER_BLOCK_ID_STEP)
    }
}

impl MemoryCheckpoints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry whose ids advance by `step` (must be non-zero)
    pub fn with_step(step: u64) -> Self {
        Self {
            blocks: RwLock::new(BTreeMap::new()),
            step: step.max(1),
        }
    }

    /// Commit a header block and return its id
    pub fn submit(&self, header_block: HeaderBlock) -> Result<u64, CheckpointError> {
        if header_block.start > header_block.end {
            return Err(CheckpointError::EmptyRange {
                start: header_block.start,
                end: header_block.end,
            });
        }

        let mut blocks = self.blocks.write().unwrap_or_else(|e| e.into_inner());
        let (id, expected_start) = match blocks.last_key_value() {
            Some((last_id, last)) => (last_id + self.step, Some(last.end + 1)),
            None => (self.step, None),
        };
        if let Some(expected) = expected_start {
            if header_block.start != expected {
                return Err(CheckpointError::NonContiguous {
                    expected,
                    found: header_block.start,
                });
            }
        }

        blocks.insert(id, header_block);
        Ok(id)
    }
}

impl CheckpointRegistry for MemoryCheckpoints {
    fn get_header_block(&self, id: u64) -> Option<HeaderBlock> {
        let blocks = self.blocks.read().unwrap_or_else(|e| e.into_inner());
        blocks.get(&id).cloned()
    }

    fn current_header_block_id(&self) -> u64 {
        let blocks = self.blocks.read().unwrap_or_else(|e| e.into_inner());
        blocks.keys().next_back().copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_block(start: u64, end: u64) -> HeaderBlock {
        HeaderBlock {
            root: H256::repeat_byte(0x01),
            start,
            end,
            created_at: 1_000,
            proposer: Address::repeat_byte(0x02),
        }
    }

    #[test]
    fn test_submit_assigns_stepped_ids() {
        let registry = MemoryCheckpoints::new();
        assert_eq!(registry.current_header_block_id(), 0);

        assert_eq!(registry.submit(header_block(0, 255)).unwrap(), 10_000);
        assert_eq!(registry.submit(header_block(256, 511)).unwrap(), 20_000);
        assert_eq!(registry.current_header_block_id(), 20_000);
        assert!(registry.get_header_block(20_000).unwrap().covers(300));
        assert!(registry.get_header_block(15_000).is_none());
    }

    #[test]
    fn test_submit_rejects_gaps_and_overlaps() {
        let registry = MemoryCheckpoints::new();
        registry.submit(header_block(0, 9)).unwrap();
        assert_eq!(
            registry.submit(header_block(12, 20)),
            Err(CheckpointError::NonContiguous {
                expected: 10,
                found: 12
            })
        );
        assert_eq!(
            registry.submit(header_block(5, 20)),
            Err(CheckpointError::NonContiguous {
                expected: 10,
                found: 5
            })
        );
        assert_eq!(
            registry.submit(header_block(30, 20)),
            Err(CheckpointError::EmptyRange { start: 30, end: 20 })
        );
    }
}

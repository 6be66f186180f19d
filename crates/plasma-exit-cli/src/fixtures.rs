//! JSON fixture loading shared by the subcommands.

use std::path::Path;

use anyhow::Context;
use plasma_exit_game::ExitGameConfig;
use plasma_header_accumulator::BlockHeaderLeaf;
use plasma_primitives::{Address, HeaderBlock, MemoryCheckpoints, MemoryTokenMapping};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Read and deserialize a JSON file
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, anyhow::Error> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Pretty-print `value` as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<(), anyhow::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Child block headers, ordered by block number
pub async fn load_headers(path: &Path) -> Result<Vec<BlockHeaderLeaf>, anyhow::Error> {
    let headers: Vec<BlockHeaderLeaf> = read_json(path).await?;
    debug!("Loaded {} header(s) from {}", headers.len(), path.display());
    Ok(headers)
}

/// Registry holding the header blocks of `path`, submitted in file order
pub async fn load_checkpoints(path: &Path, step: u64) -> Result<MemoryCheckpoints, anyhow::Error> {
    let header_blocks: Vec<HeaderBlock> = read_json(path).await?;
    let checkpoints = MemoryCheckpoints::with_step(step);
    for header_block in header_blocks {
        let id = checkpoints.submit(header_block)?;
        debug!("Registered header block {}", id);
    }
    Ok(checkpoints)
}

/// Root/child token pair as registered on the root chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub root_token: Address,
    pub child_token: Address,
    #[serde(default)]
    pub is_nft: bool,
}

/// Token mapping holding the pairs of `path`
pub async fn load_token_mapping(path: &Path) -> Result<MemoryTokenMapping, anyhow::Error> {
    let pairs: Vec<TokenPair> = read_json(path).await?;
    let mapping = MemoryTokenMapping::new();
    for pair in pairs {
        mapping.map_token(pair.root_token, pair.child_token, pair.is_nft)?;
    }
    Ok(mapping)
}

/// Exit game config from `path`, or the defaults when no path is given
pub async fn load_config(path: Option<&Path>) -> Result<ExitGameConfig, anyhow::Error> {
    match path {
        Some(path) => Ok(ExitGameConfig::load(path)?),
        None => Ok(ExitGameConfig::default()),
    }
}

/// Parse a `0x`-prefixed (or bare) hex byte string
pub fn parse_hex(value: &str) -> Result<Vec<u8>, anyhow::Error> {
    hex::decode(value.trim().trim_start_matches("0x")).context("Invalid hex string")
}

/// Parse a 20-byte hex address
pub fn parse_address(value: &str) -> Result<Address, anyhow::Error> {
    let bytes = parse_hex(value)?;
    if bytes.len() != 20 {
        anyhow::bail!("Address must be 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}

/// Consecutive headers with distinct roots, starting at block `start`
#[cfg(test)]
pub(crate) fn sample_headers(start: u64, count: u64) -> Vec<BlockHeaderLeaf> {
    use plasma_primitives::H256;
    (start..start + count)
        .map(|block_number| BlockHeaderLeaf {
            block_number,
            timestamp: 1_600_000_000 + block_number,
            tx_root: H256::from_low_u64_be(block_number + 1),
            receipt_root: H256::from_low_u64_be(block_number + 100),
        })
        .collect()
}

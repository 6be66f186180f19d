//! CLI wrapper producing the header accumulator proof of a single block

use std::path::PathBuf;

use clap::Args;
use plasma_header_accumulator::{proof_to_bytes, BlockHeaderLeaf, HeaderAccumulator};
use plasma_primitives::{serde_hex, H256};
use serde::Serialize;
use tracing::info;

use crate::fixtures::{load_headers, print_json};

/// CLI arguments for the `header-proof` subcommand
#[derive(Clone, Debug, Args)]
pub struct HeaderProofArgs {
    /// Path to the JSON array of headers the checkpoint was built from
    #[arg(long)]
    headers_path: PathBuf,
    /// Child block to prove
    #[arg(long)]
    block_number: u64,
}

/// Header fields and proof to paste into a reference payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderProof {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub tx_root: H256,
    pub receipt_root: H256,
    /// Leaf position inside the header block
    pub leaf_index: u64,
    pub root: H256,
    /// Concatenated siblings, as carried by `header_merkle_proof`
    #[serde(with = "serde_hex::bytes")]
    pub header_merkle_proof: Vec<u8>,
}

pub fn build_header_proof(
    headers: &[BlockHeaderLeaf],
    block_number: u64,
) -> Result<HeaderProof, anyhow::Error> {
    let accumulator = HeaderAccumulator::from_headers(headers)?;
    let (leaf_index, siblings) = accumulator.proof_for_block(block_number)?;
    let header = headers[leaf_index as usize];
    Ok(HeaderProof {
        block_number,
        block_timestamp: header.timestamp,
        tx_root: header.tx_root,
        receipt_root: header.receipt_root,
        leaf_index,
        root: accumulator.root(),
        header_merkle_proof: proof_to_bytes(&siblings),
    })
}

/// Run the `header-proof` subcommand
pub async fn run(args: HeaderProofArgs) -> Result<(), anyhow::Error> {
    let headers = load_headers(&args.headers_path).await?;
    let proof = build_header_proof(&headers, args.block_number)?;
    info!(
        "Block {} is leaf {} under root {:?}",
        proof.block_number, proof.leaf_index, proof.root
    );
    print_json(&proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_headers;
    use plasma_header_accumulator::{proof_from_bytes, verify};
    use std::io::Write;

    #[test]
    fn test_header_proof_verifies() {
        let headers = sample_headers(10, 6);
        for header in &headers {
            let proof = build_header_proof(&headers, header.block_number).unwrap();
            let siblings = proof_from_bytes(&proof.header_merkle_proof).unwrap();
            assert!(verify(&header.digest(), proof.leaf_index, &proof.root, &siblings));
            assert_eq!(proof.leaf_index, header.block_number - 10);
        }
    }

    #[test]
    fn test_header_proof_outside_range() {
        let headers = sample_headers(10, 6);
        assert!(build_header_proof(&headers, 9).is_err());
        assert!(build_header_proof(&headers, 16).is_err());
    }

    #[tokio::test]
    async fn test_run_reads_headers_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&sample_headers(0, 3)).unwrap()).unwrap();
        let args = HeaderProofArgs {
            headers_path: file.path().to_path_buf(),
            block_number: 2,
        };
        run(args).await.unwrap();
    }
}

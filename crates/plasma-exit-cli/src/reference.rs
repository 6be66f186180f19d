//! CLI wrapper verifying a reference proof against checkpointed header blocks

use std::path::PathBuf;

use clap::Args;
use plasma_predicates::verify_reference;
use plasma_primitives::header::HEADER_BLOCK_ID_STEP;
use plasma_primitives::{Address, CheckpointRegistry, ReferenceProof, H256};
use serde::Serialize;
use tracing::info;

use crate::fixtures::{load_checkpoints, print_json, read_json};

/// CLI arguments for the `verify-reference` subcommand
#[derive(Clone, Debug, Args)]
pub struct VerifyReferenceArgs {
    /// Path to a JSON array of committed header blocks, in commit order
    #[arg(long)]
    checkpoints_path: PathBuf,
    /// Path to the JSON reference proof
    #[arg(long)]
    proof_path: PathBuf,
    /// Distance between consecutive header block ids
    #[arg(long, default_value_t = HEADER_BLOCK_ID_STEP)]
    header_block_step: u64,
}

/// What a verified reference proof establishes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceReport {
    /// Packed age, in decimal
    pub age: String,
    pub header_block_id: u64,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
    pub log_address: Address,
    pub log_topics: Vec<H256>,
    pub checkpointed_at: u64,
    pub has_transaction: bool,
}

pub fn check_reference(
    checkpoints: &dyn CheckpointRegistry,
    proof: &ReferenceProof,
) -> Result<ReferenceReport, anyhow::Error> {
    let verified = verify_reference(checkpoints, proof)?;
    Ok(ReferenceReport {
        age: verified.age.to_string(),
        header_block_id: verified.header_block_id,
        block_number: verified.block_number,
        tx_index: verified.tx_index,
        log_index: verified.log_index,
        log_address: verified.log.address,
        log_topics: verified.log.topics,
        checkpointed_at: verified.header_block.created_at,
        has_transaction: verified.transaction.is_some(),
    })
}

/// Run the `verify-reference` subcommand
pub async fn run(args: VerifyReferenceArgs) -> Result<(), anyhow::Error> {
    let checkpoints = load_checkpoints(&args.checkpoints_path, args.header_block_step).await?;
    let proof: ReferenceProof = read_json(&args.proof_path).await?;
    let report = check_reference(&checkpoints, &proof)?;
    info!(
        "Reference proof verified: log {} of tx {} in block {} (age {})",
        report.log_index, report.tx_index, report.block_number, report.age
    );
    print_json(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasma_predicates::testing::{ChainBuilder, TestAccount, TestTokens};
    use plasma_primitives::{Age, HeaderBlock, MemoryCheckpoints};
    use std::io::Write;

    fn write_json<T: Serialize>(value: &T) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(value).unwrap()).unwrap();
        file
    }

    fn committed(checkpoints: &MemoryCheckpoints) -> Vec<HeaderBlock> {
        let last = checkpoints.current_header_block_id();
        (1..=last / HEADER_BLOCK_ID_STEP)
            .filter_map(|n| checkpoints.get_header_block(n * HEADER_BLOCK_ID_STEP))
            .collect()
    }

    #[tokio::test]
    async fn test_verify_reference_from_files() {
        let tokens = TestTokens::new();
        let alice = TestAccount::new(1);
        let bob = TestAccount::new(2);
        let mut chain = ChainBuilder::new();
        chain.push_block(vec![tokens.erc20_deposit(&alice, 100, 0)]);
        chain.push_block(vec![tokens.erc20_transfer(&alice, &bob, 40, 100, 0)]);
        chain.checkpoint(&tokens.checkpoints, 1_000).unwrap();
        let proof = chain.reference(1, 0, 0, true);

        let checkpoints_file = write_json(&committed(&tokens.checkpoints));
        let proof_file = write_json(&proof);
        let checkpoints = load_checkpoints(checkpoints_file.path(), HEADER_BLOCK_ID_STEP)
            .await
            .unwrap();
        let proof: ReferenceProof = read_json(proof_file.path()).await.unwrap();
        let report = check_reference(&checkpoints, &proof).unwrap();

        assert_eq!(report.block_number, 1);
        assert_eq!(report.header_block_id, HEADER_BLOCK_ID_STEP);
        assert_eq!(report.log_address, tokens.erc20_child);
        assert_eq!(report.checkpointed_at, 1_000);
        assert!(report.has_transaction);
        assert_eq!(
            report.age,
            Age::pack(HEADER_BLOCK_ID_STEP, 1, 0, 0).unwrap().to_string()
        );

        run(VerifyReferenceArgs {
            checkpoints_path: checkpoints_file.path().to_path_buf(),
            proof_path: proof_file.path().to_path_buf(),
            header_block_step: HEADER_BLOCK_ID_STEP,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_header_block_is_rejected() {
        let tokens = TestTokens::new();
        let alice = TestAccount::new(1);
        let mut chain = ChainBuilder::new();
        chain.push_block(vec![tokens.erc20_deposit(&alice, 100, 0)]);
        chain.checkpoint(&tokens.checkpoints, 1_000).unwrap();
        let proof = chain.reference(0, 0, 0, false);

        let empty = MemoryCheckpoints::new();
        assert!(check_reference(&empty, &proof).is_err());
    }
}

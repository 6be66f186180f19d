//! CLI wrapper building a header block checkpoint from child block headers

use std::path::PathBuf;

use clap::Args;
use plasma_header_accumulator::{BlockHeaderLeaf, HeaderAccumulator};
use plasma_primitives::{Address, HeaderBlock};
use tracing::info;

use crate::fixtures::{load_headers, parse_address, print_json};

/// CLI arguments for the `checkpoint` subcommand
#[derive(Clone, Debug, Args)]
pub struct CheckpointArgs {
    /// Path to a JSON array of child block headers
    #[arg(long)]
    headers_path: PathBuf,
    /// Root chain timestamp recorded as the checkpoint creation time
    #[arg(long)]
    created_at: u64,
    /// Validator address proposing the checkpoint
    #[arg(long, env = "PLASMA_PROPOSER", default_value = "0x0000000000000000000000000000000000000000")]
    proposer: String,
}

/// Header block committing to `headers`
pub fn build_header_block(
    headers: &[BlockHeaderLeaf],
    created_at: u64,
    proposer: Address,
) -> Result<HeaderBlock, anyhow::Error> {
    let accumulator = HeaderAccumulator::from_headers(headers)?;
    Ok(HeaderBlock {
        root: accumulator.root(),
        start: accumulator.start(),
        end: accumulator.end(),
        created_at,
        proposer,
    })
}

/// Run the `checkpoint` subcommand: print the header block for a header range
pub async fn run(args: CheckpointArgs) -> Result<(), anyhow::Error> {
    let headers = load_headers(&args.headers_path).await?;
    let proposer = parse_address(&args.proposer)?;
    let header_block = build_header_block(&headers, args.created_at, proposer)?;
    info!(
        "Header block over blocks {}..={} has root {:?}",
        header_block.start, header_block.end, header_block.root
    );
    print_json(&header_block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_headers;

    #[test]
    fn test_build_header_block() {
        let headers = sample_headers(4, 5);
        let proposer = Address::repeat_byte(0x7a);
        let header_block = build_header_block(&headers, 1_000, proposer).unwrap();

        assert_eq!(header_block.start, 4);
        assert_eq!(header_block.end, 8);
        assert_eq!(header_block.created_at, 1_000);
        assert_eq!(header_block.proposer, proposer);
        assert_eq!(
            header_block.root,
            HeaderAccumulator::from_headers(&headers).unwrap().root()
        );
    }

    #[test]
    fn test_build_header_block_rejects_empty_range() {
        assert!(build_header_block(&[], 1_000, Address::zero()).is_err());
    }
}

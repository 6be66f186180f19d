//! CLI wrapper decoding a signed exit transaction

use std::path::PathBuf;

use clap::Args;
use plasma_predicates::{DecodeContext, PredicateKind, SignedExitTx};
use plasma_primitives::{Address, MemoryCheckpoints, TokenMapping, H256, U256};
use serde::Serialize;
use tracing::info;

use crate::fixtures::{load_config, load_token_mapping, parse_hex, print_json};

/// CLI arguments for the `decode-exit-tx` subcommand
#[derive(Clone, Debug, Args)]
pub struct DecodeExitTxArgs {
    /// Signed transaction bytes, hex encoded
    #[arg(long)]
    tx: String,
    /// Exit game config (chain id and marketplace); defaults apply when omitted
    #[arg(long, env = "PLASMA_EXIT_CONFIG")]
    config_path: Option<PathBuf>,
    /// JSON array of token pairs, used to tell which predicate handles the exit
    #[arg(long)]
    tokens_path: Option<PathBuf>,
}

/// Decoded view of an exit transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitTxReport {
    pub hash: H256,
    pub signer: Address,
    pub chain_id: Option<u64>,
    pub nonce: U256,
    pub to: Option<Address>,
    /// First four calldata bytes, hex encoded
    pub selector: Option<String>,
    pub calldata_len: usize,
    /// Predicate the exit game would dispatch to, when the token mapping is known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicate: Option<PredicateKind>,
}

pub fn decode_exit_tx(
    bytes: &[u8],
    chain_id: Option<u64>,
    marketplace: Address,
    tokens: Option<&dyn TokenMapping>,
) -> Result<ExitTxReport, anyhow::Error> {
    let tx = SignedExitTx::parse(bytes, chain_id)?;
    let predicate = match tokens {
        Some(tokens) => {
            let checkpoints = MemoryCheckpoints::new();
            let ctx = DecodeContext {
                checkpoints: &checkpoints,
                tokens,
                marketplace,
                chain_id,
            };
            Some(PredicateKind::select(&ctx, &tx)?)
        }
        None => None,
    };
    let data = tx.data();
    Ok(ExitTxReport {
        hash: tx.hash,
        signer: tx.signer,
        chain_id: tx.transaction.chain_id(),
        nonce: tx.transaction.transaction.nonce,
        to: tx.to(),
        selector: data.get(..4).map(|selector| format!("0x{}", hex::encode(selector))),
        calldata_len: data.len(),
        predicate,
    })
}

/// Run the `decode-exit-tx` subcommand
pub async fn run(args: DecodeExitTxArgs) -> Result<(), anyhow::Error> {
    let config = load_config(args.config_path.as_deref()).await?;
    let tokens = match &args.tokens_path {
        Some(path) => Some(load_token_mapping(path).await?),
        None => None,
    };
    let bytes = parse_hex(&args.tx)?;
    let report = decode_exit_tx(
        &bytes,
        config.child_chain_id,
        config.marketplace,
        tokens.as_ref().map(|tokens| tokens as &dyn TokenMapping),
    )?;
    info!("Exit transaction {:?} signed by {:?}", report.hash, report.signer);
    print_json(&report)
}

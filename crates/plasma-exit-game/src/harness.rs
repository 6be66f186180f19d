//! Test harness: a child chain with mapped tokens wired into an exit game.

use std::sync::Arc;

use plasma_predicates::testing::{ChainBuilder, TestAccount, TestTokens, TEST_CHAIN_ID};
use plasma_primitives::{ReferenceProof, U256};

use crate::claim::ExitId;
use crate::config::ExitGameConfig;
use crate::custody::{AssetCustody, MemoryCustody};
use crate::error::ExitGameError;
use crate::game::ExitGame;
use crate::start::StartExit;
use crate::state::ExitGameState;

pub const HALF_EXIT_PERIOD: u64 = 100;
pub const BOND: u64 = 10;
/// Creation time of the first checkpoint
pub const CHECKPOINT_AT: u64 = 1_000;

pub struct Harness {
    pub tokens: TestTokens,
    pub chain: ChainBuilder,
    pub custody: Arc<MemoryCustody>,
    pub game: ExitGame,
    pub state: ExitGameState,
}

impl Harness {
    pub fn new() -> Self {
        let custody = Arc::new(MemoryCustody::new());
        let mut harness = Self::with_custody(custody.clone());
        harness.custody = custody;
        harness
    }

    /// Harness whose game settles through `custody`; `self.custody` is then unused
    pub fn with_custody(custody: Arc<dyn AssetCustody>) -> Self {
        let tokens = TestTokens::new();
        let config = ExitGameConfig {
            half_exit_period_secs: HALF_EXIT_PERIOD,
            exit_bond: U256::from(BOND),
            marketplace: tokens.marketplace,
            child_chain_id: Some(TEST_CHAIN_ID),
        };
        let game = ExitGame::new(
            config,
            tokens.checkpoints.clone(),
            tokens.mapping.clone(),
            custody,
        );
        Self {
            tokens,
            chain: ChainBuilder::new(),
            custody: Arc::new(MemoryCustody::new()),
            game,
            state: ExitGameState::new(),
        }
    }

    pub fn checkpoint(&mut self, created_at: u64) -> u64 {
        self.chain
            .checkpoint(&self.tokens.checkpoints, created_at)
            .unwrap()
    }

    pub fn start(
        &mut self,
        claimant: &TestAccount,
        inputs: Vec<ReferenceProof>,
        exit_tx: &[u8],
        now: u64,
    ) -> Result<Vec<ExitId>, ExitGameError> {
        let request = StartExit {
            claimant: claimant.address,
            inputs,
            exit_tx: exit_tx.to_vec(),
        };
        self.game.start_exit(&mut self.state, &request, now)
    }
}

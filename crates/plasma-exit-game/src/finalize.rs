//! Settling matured exits in priority order.

use plasma_primitives::Address;
use tracing::{info, warn};

use crate::claim::{ExitId, ExitStatus};
use crate::error::ExitGameError;
use crate::events::ExitEvent;
use crate::game::{pending_exit, ExitGame};
use crate::state::ExitGameState;

impl ExitGame {
    /// Settle a pending exit once its challenge window elapsed and nothing older is
    /// queued for its token
    pub fn finalize(
        &self,
        state: &mut ExitGameState,
        exit_id: &ExitId,
        now: u64,
    ) -> Result<(), ExitGameError> {
        self.settle(state, exit_id, now)
            .inspect_err(|err| warn!("Rejected finalization of exit {}: {}", exit_id, err))
    }

    fn settle(
        &self,
        state: &mut ExitGameState,
        exit_id: &ExitId,
        now: u64,
    ) -> Result<(), ExitGameError> {
        state.check_clock(now)?;
        let claim = pending_exit(state, exit_id)?;
        if now < claim.exitable_at {
            return Err(ExitGameError::ChallengeWindowNotElapsed {
                exitable_at: claim.exitable_at,
                now,
            });
        }
        if let Some(blocking) = state
            .queue(&claim.token)
            .and_then(|queue| queue.ahead_of(claim.age, claim.exit_id))
        {
            return Err(ExitGameError::PriorityViolation {
                exit_id: *exit_id,
                blocking,
            });
        }

        self.custody()
            .release(&claim.token, &claim.owner, claim.amount_or_token_id)?;

        let event = ExitEvent::ExitFinalized {
            exit_id: *exit_id,
            owner: claim.owner,
            token: claim.token,
            amount_or_token_id: claim.amount_or_token_id,
            bond_refund: claim.bond,
        };
        info!(
            "Exit {} finalized: released {} of {:?} to {:?}",
            exit_id, claim.amount_or_token_id, claim.token, claim.owner
        );
        state.advance_clock(now);
        state.resolve(exit_id, ExitStatus::Finalized);
        state.emit(event);
        Ok(())
    }

    /// Finalize matured exits of `token` from the head of its queue.
    ///
    /// Stops at the first exit still inside its challenge window. A failure on the
    /// first exit is returned; a later failure stops processing and keeps the exits
    /// already finalized.
    pub fn process_exits(
        &self,
        state: &mut ExitGameState,
        token: &Address,
        now: u64,
    ) -> Result<Vec<ExitId>, ExitGameError> {
        state.check_clock(now)?;
        let mut finalized = Vec::new();
        while let Some(exit_id) = state.head(token) {
            let matured = state
                .get_exit(&exit_id)
                .is_some_and(|claim| claim.exitable_at <= now);
            if !matured {
                break;
            }
            match self.finalize(state, &exit_id, now) {
                Ok(()) => finalized.push(exit_id),
                Err(err) if finalized.is_empty() => return Err(err),
                Err(_) => break,
            }
        }
        if !finalized.is_empty() {
            info!("Processed {} exit(s) of {:?}", finalized.len(), token);
        }
        Ok(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::{CustodyError, MockAssetCustody, Payout};
    use crate::harness::{Harness, BOND, CHECKPOINT_AT};
    use plasma_predicates::testing::TestAccount;
    use plasma_primitives::U256;
    use std::sync::Arc;

    #[test]
    fn test_deposit_transfer_burn_finalize() {
        let mut h = Harness::new();
        let alice = TestAccount::new(1);
        let bob = TestAccount::new(2);
        h.custody.lock(h.tokens.erc20_root, U256::from(100));

        h.chain.push_block(vec![h.tokens.erc20_deposit(&alice, 100, 0)]);
        h.chain
            .push_block(vec![h.tokens.erc20_transfer(&alice, &bob, 100, 100, 0)]);
        h.checkpoint(CHECKPOINT_AT);

        let burn = bob.sign(h.tokens.erc20_burn_tx(100));
        let reference = h.chain.reference(1, 0, 0, false);
        let ids = h.start(&bob, vec![reference], &burn, 1_000).unwrap();
        let exit_id = ids[0];
        {
            let claim = h.state.get_exit(&exit_id).unwrap();
            assert!(claim.is_burn);
            assert!(exit_id.is_burn());
            assert_eq!(claim.amount_or_token_id, U256::from(100));
            assert_eq!(claim.age.components().block_number, 1);
        }

        assert!(matches!(
            h.game.finalize(&mut h.state, &exit_id, 1_199),
            Err(ExitGameError::ChallengeWindowNotElapsed { exitable_at: 1_200, now: 1_199 })
        ));
        h.game.finalize(&mut h.state, &exit_id, 1_200).unwrap();

        assert_eq!(
            h.custody.payouts(),
            vec![Payout::Release {
                token: h.tokens.erc20_root,
                owner: bob.address,
                amount_or_id: U256::from(100),
            }]
        );
        assert_eq!(h.custody.balance(&h.tokens.erc20_root), U256::zero());
        assert_eq!(
            h.state.get_exit(&exit_id).unwrap().status,
            ExitStatus::Finalized
        );
        assert!(h.state.queue(&h.tokens.erc20_root).is_none());
        let events = h.state.drain_events();
        assert!(matches!(
            events.last(),
            Some(ExitEvent::ExitFinalized { bond_refund, .. }) if *bond_refund == U256::from(BOND)
        ));

        // Settled exits are never settled or restarted again
        assert!(matches!(
            h.game.finalize(&mut h.state, &exit_id, 1_300),
            Err(ExitGameError::ExitNotPending { status: ExitStatus::Finalized, .. })
        ));
        assert!(matches!(
            h.start(&bob, vec![h.chain.reference(1, 0, 0, false)], &burn, 1_300),
            Err(ExitGameError::DuplicateOrConflictingExit(id)) if id == exit_id
        ));
    }

    /// Bob's exit (block 1) starts before Alice's older one (block 0)
    fn two_exits(h: &mut Harness) -> (ExitId, ExitId) {
        let alice = TestAccount::new(1);
        let bob = TestAccount::new(2);
        h.chain.push_block(vec![h.tokens.erc20_deposit(&alice, 100, 0)]);
        h.chain.push_block(vec![h.tokens.erc20_deposit(&bob, 5, 0)]);
        h.checkpoint(CHECKPOINT_AT);

        let bob_burn = bob.sign(h.tokens.erc20_burn_tx(5));
        let bob_exit = h
            .start(&bob, vec![h.chain.reference(1, 0, 0, false)], &bob_burn, 1_000)
            .unwrap()[0];
        let alice_burn = alice.sign(h.tokens.erc20_burn_tx(100));
        let alice_exit = h
            .start(&alice, vec![h.chain.reference(0, 0, 0, false)], &alice_burn, 1_150)
            .unwrap()[0];
        (alice_exit, bob_exit)
    }

    #[test]
    fn test_older_exit_settles_first() {
        let mut h = Harness::new();
        h.custody.lock(h.tokens.erc20_root, U256::from(105));
        let (alice_exit, bob_exit) = two_exits(&mut h);
        assert_eq!(h.state.get_exit(&alice_exit).unwrap().exitable_at, 1_250);

        assert!(matches!(
            h.game.finalize(&mut h.state, &bob_exit, 1_200),
            Err(ExitGameError::PriorityViolation { blocking, .. }) if blocking == alice_exit
        ));
        let pending: Vec<_> = h
            .state
            .pending_exits(&h.tokens.erc20_root)
            .iter()
            .map(|claim| claim.exit_id)
            .collect();
        assert_eq!(pending, vec![alice_exit, bob_exit]);

        h.game.finalize(&mut h.state, &alice_exit, 1_250).unwrap();
        h.game.finalize(&mut h.state, &bob_exit, 1_250).unwrap();
        assert_eq!(h.custody.balance(&h.tokens.erc20_root), U256::zero());
    }

    #[test]
    fn test_process_exits_stops_at_immature_head() {
        let mut h = Harness::new();
        h.custody.lock(h.tokens.erc20_root, U256::from(105));
        let (alice_exit, bob_exit) = two_exits(&mut h);
        let token = h.tokens.erc20_root;

        assert!(h.game.process_exits(&mut h.state, &token, 1_200).unwrap().is_empty());
        assert_eq!(
            h.game.process_exits(&mut h.state, &token, 1_250).unwrap(),
            vec![alice_exit, bob_exit]
        );
        assert!(h.state.queue(&token).is_none());
        assert!(matches!(
            h.game.process_exits(&mut h.state, &token, 1_000),
            Err(ExitGameError::ClockRewound { last: 1_250, now: 1_000 })
        ));
    }

    #[test]
    fn test_failed_release_keeps_exit_queued() {
        let mut h = Harness::new();
        h.custody.lock(h.tokens.erc20_root, U256::from(100));
        let (alice_exit, bob_exit) = two_exits(&mut h);
        let token = h.tokens.erc20_root;

        // Alice drains custody, leaving nothing for Bob
        assert_eq!(
            h.game.process_exits(&mut h.state, &token, 1_250).unwrap(),
            vec![alice_exit]
        );
        assert!(matches!(
            h.game.finalize(&mut h.state, &bob_exit, 1_260),
            Err(ExitGameError::Custody(CustodyError::InsufficientBalance { .. }))
        ));
        assert!(h.state.get_exit(&bob_exit).unwrap().is_pending());
        assert_eq!(h.state.queue(&token).unwrap().head().map(|(_, id)| id), Some(bob_exit));
        assert_eq!(h.state.last_timestamp(), 1_250);
    }

    #[test]
    fn test_release_is_called_once_per_exit() {
        let mut custody = MockAssetCustody::new();
        custody
            .expect_release()
            .times(1)
            .returning(|_, _, _| Ok(()));
        let mut h = Harness::with_custody(Arc::new(custody));
        let alice = TestAccount::new(1);
        h.chain.push_block(vec![h.tokens.erc721_deposit(&alice, 9)]);
        h.checkpoint(CHECKPOINT_AT);

        let burn = alice.sign(h.tokens.erc721_burn_tx(9));
        let exit_id = h
            .start(&alice, vec![h.chain.reference(0, 0, 0, false)], &burn, 1_000)
            .unwrap()[0];
        assert!(h.state.get_exit(&exit_id).unwrap().is_nft);
        h.game.finalize(&mut h.state, &exit_id, 1_200).unwrap();
        assert!(h.game.finalize(&mut h.state, &exit_id, 1_200).is_err());
    }
}

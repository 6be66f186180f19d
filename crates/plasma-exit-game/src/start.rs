//! Starting exits: verify, decode, fold and register claims.

use std::collections::{BTreeSet, HashSet};

use plasma_predicates::{decode_exit, ClaimInput, ExitClaimDraft, PredicateError, PredicateKind};
use plasma_primitives::{serde_hex, Address, ReferenceProof, H256};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::claim::{ExitClaim, ExitId, ExitStatus};
use crate::error::ExitGameError;
use crate::events::ExitEvent;
use crate::game::ExitGame;
use crate::state::ExitGameState;

/// Exit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartExit {
    /// Participant the exit pays out to; must be authorized by the exit transaction
    pub claimant: Address,
    pub inputs: Vec<ReferenceProof>,
    /// Signed child-chain transaction the exit is built on
    #[serde(with = "serde_hex::bytes")]
    pub exit_tx: Vec<u8>,
}

enum Registration {
    Create(ExitClaim),
    Merge {
        exit_id: ExitId,
        inputs: Vec<ClaimInput>,
    },
}

impl ExitGame {
    /// Start (or extend) the exits justified by `request`, returning their ids.
    ///
    /// A request whose folded claim derives the id of a pending exit built on the same
    /// exit transaction, for the same owner and token, appends its unseen inputs to
    /// that exit. Anything else colliding with a registered exit is rejected.
    pub fn start_exit(
        &self,
        state: &mut ExitGameState,
        request: &StartExit,
        now: u64,
    ) -> Result<Vec<ExitId>, ExitGameError> {
        self.plan_start(state, request, now)
            .map(|plan| self.register(state, plan, now))
            .inspect_err(|err| warn!("Rejected exit of {:?}: {}", request.claimant, err))
    }

    fn plan_start(
        &self,
        state: &ExitGameState,
        request: &StartExit,
        now: u64,
    ) -> Result<Vec<Registration>, ExitGameError> {
        state.check_clock(now)?;
        let decoded = decode_exit(
            &self.context(),
            request.claimant,
            &request.inputs,
            &request.exit_tx,
        )?;

        let mut plan = Vec::with_capacity(decoded.claims.len());
        let mut seen_ids = HashSet::new();
        let mut seen_keys = HashSet::new();
        for draft in decoded.claims {
            if !draft.is_nft && draft.amount_or_token_id.is_zero() {
                return Err(ExitGameError::ZeroAmountExit);
            }
            let age = draft.age().ok_or(PredicateError::InputCount {
                expected: "at least 1",
                found: 0,
            })?;
            let exit_id = ExitId::derive(age, draft.output, draft.is_burn);
            if !seen_ids.insert(exit_id) {
                return Err(ExitGameError::DuplicateOrConflictingExit(exit_id));
            }

            if let Some(existing) = state.get_exit(&exit_id) {
                let inputs: Vec<_> = draft
                    .inputs
                    .into_iter()
                    .filter(|input| !existing.has_input(&input.age))
                    .collect();
                let extends = existing.is_pending()
                    && existing.exit_tx_hash == decoded.exit_tx.hash
                    && existing.owner == draft.owner
                    && existing.token == draft.root_token
                    && !inputs.is_empty();
                if !extends {
                    return Err(ExitGameError::DuplicateOrConflictingExit(exit_id));
                }
                plan.push(Registration::Merge { exit_id, inputs });
                continue;
            }

            let claim = self.new_claim(exit_id, draft, decoded.kind, decoded.exit_tx.hash, now);
            let key = claim.key();
            if state.open_exit(&key).is_some() || !seen_keys.insert(key) {
                return Err(ExitGameError::DuplicateOrConflictingExit(exit_id));
            }
            plan.push(Registration::Create(claim));
        }
        Ok(plan)
    }

    fn new_claim(
        &self,
        exit_id: ExitId,
        draft: ExitClaimDraft,
        predicate: PredicateKind,
        exit_tx_hash: H256,
        now: u64,
    ) -> ExitClaim {
        let oldest_checkpoint = draft
            .inputs
            .iter()
            .min_by_key(|input| input.age)
            .map(|input| input.checkpointed_at)
            .unwrap_or(now);
        let exitable_at = oldest_checkpoint
            .saturating_add(self.config().exit_period_secs())
            .max(now.saturating_add(self.config().half_exit_period_secs));

        let mut claim = ExitClaim {
            exit_id,
            owner: draft.owner,
            token: draft.root_token,
            child_token: draft.child_token,
            amount_or_token_id: draft.amount_or_token_id,
            is_burn: draft.is_burn,
            is_nft: draft.is_nft,
            predicate,
            status: ExitStatus::Pending,
            age: exit_id.age(),
            created_at: now,
            exitable_at,
            bond: self.config().exit_bond,
            exit_tx_hash,
            inputs: draft.inputs,
            deprecated: Vec::new(),
            signers: BTreeSet::new(),
        };
        claim.refold();
        claim
    }

    fn register(&self, state: &mut ExitGameState, plan: Vec<Registration>, now: u64) -> Vec<ExitId> {
        state.advance_clock(now);
        let mut exit_ids = Vec::with_capacity(plan.len());
        for registration in plan {
            match registration {
                Registration::Create(claim) => {
                    info!(
                        "Exit {} started by {:?}: {} of {:?} with {} input(s), exitable at {}",
                        claim.exit_id,
                        claim.owner,
                        claim.amount_or_token_id,
                        claim.token,
                        claim.inputs.len(),
                        claim.exitable_at
                    );
                    state.emit(ExitEvent::ExitStarted {
                        exit_id: claim.exit_id,
                        owner: claim.owner,
                        token: claim.token,
                        amount_or_token_id: claim.amount_or_token_id,
                        is_burn: claim.is_burn,
                        exitable_at: claim.exitable_at,
                    });
                    for input in claim.inputs.iter().skip(1) {
                        state.emit(ExitEvent::ExitUpdated {
                            exit_id: claim.exit_id,
                            age: input.age,
                            signer: input.signer,
                        });
                    }
                    exit_ids.push(claim.exit_id);
                    state.insert(claim);
                }
                Registration::Merge { exit_id, inputs } => {
                    info!("Exit {} extended with {} input(s)", exit_id, inputs.len());
                    for input in &inputs {
                        state.emit(ExitEvent::ExitUpdated {
                            exit_id,
                            age: input.age,
                            signer: input.signer,
                        });
                    }
                    state.update(&exit_id, |claim| {
                        claim.inputs.extend(inputs);
                        claim.refold();
                    });
                    exit_ids.push(exit_id);
                }
            }
        }
        exit_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Harness, BOND, CHECKPOINT_AT};
    use plasma_predicates::testing::TestAccount;
    use plasma_predicates::ExitOutput;
    use plasma_primitives::U256;

    /// Alice deposits 100 (block 0), Bob deposits 5 (block 1)
    fn funded() -> (Harness, TestAccount, TestAccount) {
        let mut h = Harness::new();
        let alice = TestAccount::new(1);
        let bob = TestAccount::new(2);
        h.chain.push_block(vec![h.tokens.erc20_deposit(&alice, 100, 0)]);
        h.chain.push_block(vec![h.tokens.erc20_deposit(&bob, 5, 0)]);
        h.checkpoint(CHECKPOINT_AT);
        (h, alice, bob)
    }

    #[test]
    fn test_start_registers_claim() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        let input = h.chain.reference(0, 0, 0, false);
        let ids = h.start(&alice, vec![input], &exit_tx, 1_000).unwrap();

        let claim = h.state.get_exit(&ids[0]).unwrap();
        assert_eq!(claim.owner, alice.address);
        assert_eq!(claim.token, h.tokens.erc20_root);
        assert_eq!(claim.amount_or_token_id, U256::from(70));
        assert_eq!(claim.predicate, PredicateKind::Fungible);
        assert_eq!(claim.bond, U256::from(BOND));
        assert_eq!(claim.exitable_at, 1_200);
        assert_eq!(claim.signers, BTreeSet::from([alice.address]));
        assert_eq!(ids[0], ExitId::derive(claim.age, ExitOutput::Change, false));
        assert_eq!(h.state.queue(&h.tokens.erc20_root).unwrap().len(), 1);

        let events = h.state.drain_events();
        assert!(matches!(events.as_slice(), [ExitEvent::ExitStarted { exitable_at: 1_200, .. }]));
        assert!(h.state.drain_events().is_empty());
    }

    #[test]
    fn test_late_start_waits_half_period() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        let ids = h
            .start(&alice, vec![h.chain.reference(0, 0, 0, false)], &exit_tx, 5_000)
            .unwrap();
        assert_eq!(h.state.get_exit(&ids[0]).unwrap().exitable_at, 5_100);
    }

    #[test]
    fn test_resubmission_is_rejected() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        let input = h.chain.reference(0, 0, 0, false);
        let ids = h.start(&alice, vec![input.clone()], &exit_tx, 1_000).unwrap();
        h.state.drain_events();

        assert!(matches!(
            h.start(&alice, vec![input], &exit_tx, 1_001),
            Err(ExitGameError::DuplicateOrConflictingExit(id)) if id == ids[0]
        ));
        assert_eq!(
            h.state.get_exit(&ids[0]).unwrap().amount_or_token_id,
            U256::from(70)
        );
        assert!(h.state.drain_events().is_empty());
        assert_eq!(h.state.last_timestamp(), 1_000);
    }

    #[test]
    fn test_recipient_appends_own_input() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        let alice_input = h.chain.reference(0, 0, 0, false);
        let bob_input = h.chain.reference(1, 0, 0, false);

        let first = h.start(&bob, vec![alice_input.clone()], &exit_tx, 1_000).unwrap();
        let second = h
            .start(&bob, vec![alice_input, bob_input], &exit_tx, 1_010)
            .unwrap();
        assert_eq!(first, second);

        let claim = h.state.get_exit(&first[0]).unwrap();
        assert_eq!(claim.amount_or_token_id, U256::from(35));
        assert_eq!(claim.inputs.len(), 2);
        assert_eq!(claim.signers, BTreeSet::from([alice.address, bob.address]));
        assert_eq!(claim.exitable_at, 1_200);

        let events = h.state.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            ExitEvent::ExitUpdated { signer, .. } if signer == bob.address
        ));
    }

    #[test]
    fn test_both_parties_of_a_transfer_exit() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        let input = h.chain.reference(0, 0, 0, false);

        let change = h.start(&alice, vec![input.clone()], &exit_tx, 1_000).unwrap();
        let received = h.start(&bob, vec![input.clone()], &exit_tx, 1_000).unwrap();
        assert_ne!(change, received);
        assert_eq!(change[0].age(), received[0].age());
        assert_eq!(change[0].output(), ExitOutput::Change);
        assert_eq!(received[0].output(), ExitOutput::Transferred);

        let amounts: Vec<_> = h
            .state
            .pending_exits(&h.tokens.erc20_root)
            .iter()
            .map(|claim| (claim.owner, claim.amount_or_token_id))
            .collect();
        assert_eq!(
            amounts,
            vec![(alice.address, U256::from(70)), (bob.address, U256::from(30))]
        );

        // Each side still collides with its own resubmission
        assert!(matches!(
            h.start(&alice, vec![input.clone()], &exit_tx, 1_000),
            Err(ExitGameError::DuplicateOrConflictingExit(id)) if id == change[0]
        ));
        assert!(matches!(
            h.start(&bob, vec![input], &exit_tx, 1_000),
            Err(ExitGameError::DuplicateOrConflictingExit(id)) if id == received[0]
        ));
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let (mut h, alice, bob) = funded();
        let carol = TestAccount::new(3);
        let input = h.chain.reference(0, 0, 0, false);

        let everything = alice.sign(h.tokens.erc20_transfer_tx(&bob, 100));
        assert!(matches!(
            h.start(&alice, vec![input.clone()], &everything, 1_000),
            Err(ExitGameError::ZeroAmountExit)
        ));

        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        assert!(matches!(
            h.start(&carol, vec![input.clone()], &exit_tx, 1_000),
            Err(ExitGameError::UnauthorizedSigner(signer)) if signer == carol.address
        ));

        let mut unknown_header = input.clone();
        unknown_header.header_block_id = 20_000;
        assert!(matches!(
            h.start(&alice, vec![unknown_header], &exit_tx, 1_000),
            Err(ExitGameError::HeaderNotCheckpointed(20_000))
        ));

        let mut tampered = input;
        tampered.receipt_bytes[3] ^= 1;
        assert!(matches!(
            h.start(&alice, vec![tampered], &exit_tx, 1_000),
            Err(ExitGameError::ProofInvalid(_))
        ));

        assert!(h.state.queue(&h.tokens.erc20_root).is_none());
        assert!(h.state.drain_events().is_empty());
        assert_eq!(h.state.last_timestamp(), 0);
    }

    #[test]
    fn test_one_open_exit_per_token_and_owner() {
        let (mut h, alice, bob) = funded();
        let burn = bob.sign(h.tokens.erc20_burn_tx(5));
        h.start(&bob, vec![h.chain.reference(1, 0, 0, false)], &burn, 1_000)
            .unwrap();

        let transfer = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        assert!(matches!(
            h.start(&bob, vec![h.chain.reference(0, 0, 0, false)], &transfer, 1_000),
            Err(ExitGameError::DuplicateOrConflictingExit(_))
        ));
        // Alice's own change exit occupies a different key
        assert!(h
            .start(&alice, vec![h.chain.reference(0, 0, 0, false)], &transfer, 1_000)
            .is_ok());
    }

    #[test]
    fn test_clock_cannot_rewind() {
        let (mut h, alice, bob) = funded();
        let exit_tx = alice.sign(h.tokens.erc20_transfer_tx(&bob, 30));
        h.start(&alice, vec![h.chain.reference(0, 0, 0, false)], &exit_tx, 1_000)
            .unwrap();
        let burn = bob.sign(h.tokens.erc20_burn_tx(5));
        assert!(matches!(
            h.start(&bob, vec![h.chain.reference(1, 0, 0, false)], &burn, 999),
            Err(ExitGameError::ClockRewound { last: 1_000, now: 999 })
        ));
    }

    #[test]
    fn test_marketplace_starts_two_exits() {
        let mut h = Harness::new();
        let maker = TestAccount::new(1);
        let taker = TestAccount::new(2);
        h.chain.push_block(vec![h.tokens.erc20_deposit(&maker, 50, 0)]);
        h.chain.push_block(vec![h.tokens.erc20b_deposit(&taker, 80, 0)]);
        h.checkpoint(CHECKPOINT_AT);

        let swap = taker.sign(h.tokens.swap_tx(&maker, 20, &taker, 30, 100));
        let inputs = vec![
            h.chain.reference(0, 0, 0, false),
            h.chain.reference(1, 0, 0, false),
        ];
        let ids = h.start(&taker, inputs.clone(), &swap, 1_000).unwrap();
        assert_eq!(ids.len(), 2);

        let received = h.state.get_exit(&ids[0]).unwrap();
        assert_eq!(received.token, h.tokens.erc20_root);
        assert_eq!(received.amount_or_token_id, U256::from(20));
        assert_eq!(received.predicate, PredicateKind::Marketplace);
        let change = h.state.get_exit(&ids[1]).unwrap();
        assert_eq!(change.token, h.tokens.erc20b_root);
        assert_eq!(change.amount_or_token_id, U256::from(50));
        assert_eq!(change.exit_tx_hash, received.exit_tx_hash);

        // The maker exits the other side of the same swap
        let maker_ids = h.start(&maker, inputs.clone(), &swap, 1_000).unwrap();
        assert_eq!(maker_ids.len(), 2);
        assert!(maker_ids.iter().all(|id| !ids.contains(id)));
        let maker_received = h.state.get_exit(&maker_ids[0]).unwrap();
        assert_eq!(maker_received.token, h.tokens.erc20b_root);
        assert_eq!(maker_received.amount_or_token_id, U256::from(30));
        let maker_change = h.state.get_exit(&maker_ids[1]).unwrap();
        assert_eq!(maker_change.token, h.tokens.erc20_root);
        assert_eq!(maker_change.amount_or_token_id, U256::from(30));

        assert!(matches!(
            h.start(&maker, inputs, &swap, 1_000),
            Err(ExitGameError::DuplicateOrConflictingExit(id)) if id == maker_ids[0]
        ));
    }
}

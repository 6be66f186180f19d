//! Challenges: deprecate an exit input with a newer, checkpointed spend.

use plasma_predicates::{decode_spends, verify_reference, ClaimInput, Spend};
use plasma_primitives::{keccak256, Address, ReferenceProof, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::claim::{ExitId, ExitStatus};
use crate::error::ExitGameError;
use crate::events::ExitEvent;
use crate::game::{pending_exit, ExitGame};
use crate::state::ExitGameState;

/// Challenge request against one input of a pending exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub exit_id: ExitId,
    pub input_index: usize,
    /// Recipient of the exit bond
    pub challenger: Address,
    /// Newer reference carrying the spending transaction
    pub proof: ReferenceProof,
}

/// What a successful challenge does to the exit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    Cancelled,
    /// The exit stays pending with the remaining inputs
    Reduced { amount: U256 },
}

fn spends_input(spend: &Spend, input: &ClaimInput) -> bool {
    spend.signer == input.signer
        && spend.child_token == input.child_token
        && spend.token_id.map_or(true, |id| id == input.contribution)
}

impl ExitGame {
    /// Deprecate input `input_index` of a pending exit.
    ///
    /// The proof must be newer than the input, carry its transaction, not be the
    /// exit's own transaction, and that transaction must spend the input. The exit
    /// is cancelled unless other inputs remain to back a non-zero fungible amount.
    /// A cancelling challenger collects the remaining bond; a reducing one collects
    /// the input's share of it.
    pub fn challenge(
        &self,
        state: &mut ExitGameState,
        challenge: &Challenge,
        now: u64,
    ) -> Result<ChallengeOutcome, ExitGameError> {
        self.apply_challenge(state, challenge, now).inspect_err(|err| {
            warn!(
                "Rejected challenge of exit {} input {}: {}",
                challenge.exit_id, challenge.input_index, err
            )
        })
    }

    fn apply_challenge(
        &self,
        state: &mut ExitGameState,
        challenge: &Challenge,
        now: u64,
    ) -> Result<ChallengeOutcome, ExitGameError> {
        state.check_clock(now)?;
        let exit_id = challenge.exit_id;
        let claim = pending_exit(state, &exit_id)?;
        let input = claim
            .inputs
            .get(challenge.input_index)
            .ok_or(ExitGameError::InvalidInputIndex {
                exit_id,
                index: challenge.input_index,
                inputs: claim.inputs.len(),
            })?;

        let reference = verify_reference(self.checkpoints(), &challenge.proof)?;
        if reference.age <= input.age {
            return Err(ExitGameError::ChallengeTooOld {
                challenge_age: reference.age,
                input_age: input.age,
            });
        }
        let tx_bytes = reference
            .transaction
            .as_deref()
            .ok_or(ExitGameError::InvalidChallenge("missing transaction proof"))?;
        if keccak256(tx_bytes) == claim.exit_tx_hash {
            return Err(ExitGameError::InvalidChallenge("exit transaction replay"));
        }
        let (spending_tx, spends) = decode_spends(&self.context(), tx_bytes)?;
        if !spends.iter().any(|spend| spends_input(spend, input)) {
            debug!(
                "Transaction {:?} by {:?} does not spend input {} of exit {}",
                spending_tx.hash, spending_tx.signer, challenge.input_index, exit_id
            );
            return Err(ExitGameError::InvalidChallenge(
                "transaction does not spend the input",
            ));
        }

        let input_age = input.age;
        let remaining: U256 = claim
            .inputs
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != challenge.input_index)
            .fold(U256::zero(), |sum, (_, other)| sum.saturating_add(other.contribution));
        let cancels = claim.is_nft || claim.inputs.len() == 1 || remaining.is_zero();
        // Each deprecated input earns its share; the last challenger takes the rest
        let bond = if cancels {
            claim.bond
        } else {
            claim.bond / U256::from(claim.inputs.len())
        };

        if !bond.is_zero() {
            self.custody().pay_bond(&challenge.challenger, bond)?;
        }

        state.advance_clock(now);
        state.emit(ExitEvent::ExitChallenged {
            exit_id,
            input_age,
            challenge_age: reference.age,
            challenger: challenge.challenger,
            bond,
        });
        if cancels {
            state.resolve(&exit_id, ExitStatus::Cancelled);
            state.update(&exit_id, |claim| {
                claim.bond = U256::zero();
                claim.deprecated.push(input_age);
            });
            state.emit(ExitEvent::ExitCancelled { exit_id });
            info!("Exit {} cancelled by {:?}", exit_id, challenge.challenger);
            return Ok(ChallengeOutcome::Cancelled);
        }

        let mut age = input_age;
        state.update(&exit_id, |claim| {
            claim.bond -= bond;
            claim.inputs.remove(challenge.input_index);
            claim.deprecated.push(input_age);
            claim.refold();
            age = claim.age;
        });
        state.emit(ExitEvent::ExitReduced {
            exit_id,
            amount: remaining,
            age,
        });
        info!(
            "Exit {} reduced to {} by {:?}",
            exit_id, remaining, challenge.challenger
        );
        Ok(ChallengeOutcome::Reduced { amount: remaining })
    }
}

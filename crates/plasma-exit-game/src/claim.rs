//! Exit claims and their identifiers.

use std::collections::BTreeSet;
use std::fmt;

use plasma_predicates::{ClaimInput, ExitOutput, PredicateKind};
use plasma_primitives::{Address, Age, H256, U256};
use serde::{Deserialize, Serialize};

/// Identifier of an exit: `(age << 2) | (output << 1) | burn_bit`.
///
/// Equal underlying state transitions always derive the same id, which is what makes
/// resubmissions collide instead of double-counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExitId(pub U256);

impl ExitId {
    pub fn derive(age: Age, output: ExitOutput, is_burn: bool) -> Self {
        let id = (age.0 << 2) | U256::from(output.index() << 1) | U256::from(is_burn as u8);
        Self(id)
    }

    pub fn is_burn(&self) -> bool {
        self.0.bit(0)
    }

    pub fn output(&self) -> ExitOutput {
        ExitOutput::from_index(self.0.bit(1) as u8)
    }

    /// Age the id was derived from
    pub fn age(&self) -> Age {
        Age(self.0 >> 2)
    }
}

impl fmt::Display for ExitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    Pending,
    Finalized,
    Cancelled,
}

/// Slot an unresolved claim occupies: one per token and owner, NFTs per token id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ExitKey {
    pub token: Address,
    pub owner: Address,
    pub token_id: Option<U256>,
}

/// A registered exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitClaim {
    pub exit_id: ExitId,
    pub owner: Address,
    /// Root token released on finalization
    pub token: Address,
    pub child_token: Address,
    pub amount_or_token_id: U256,
    pub is_burn: bool,
    pub is_nft: bool,
    pub predicate: PredicateKind,
    pub status: ExitStatus,
    /// Oldest undeprecated input age; the queue priority
    pub age: Age,
    pub created_at: u64,
    pub exitable_at: u64,
    /// Bond still attached to the exit
    pub bond: U256,
    pub exit_tx_hash: H256,
    pub inputs: Vec<ClaimInput>,
    /// Ages of inputs removed by a challenge, never accepted again
    pub deprecated: Vec<Age>,
    pub signers: BTreeSet<Address>,
}

impl ExitClaim {
    pub fn is_pending(&self) -> bool {
        self.status == ExitStatus::Pending
    }

    pub(crate) fn key(&self) -> ExitKey {
        ExitKey {
            token: self.token,
            owner: self.owner,
            token_id: self.is_nft.then_some(self.amount_or_token_id),
        }
    }

    pub(crate) fn has_input(&self, age: &Age) -> bool {
        self.inputs.iter().any(|input| input.age == *age) || self.deprecated.contains(age)
    }

    /// Recompute amount, age and signers from the remaining inputs
    pub(crate) fn refold(&mut self) {
        if !self.is_nft {
            self.amount_or_token_id = self
                .inputs
                .iter()
                .fold(U256::zero(), |sum, input| sum.saturating_add(input.contribution));
        }
        if let Some(age) = self.inputs.iter().map(|input| input.age).min() {
            self.age = age;
        }
        self.signers = self.inputs.iter().map(|input| input.signer).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_id_packs_output_and_burn_bit() {
        let age = Age::pack(10_000, 3, 1, 0).unwrap();
        let change = ExitId::derive(age, ExitOutput::Change, false);
        let transferred = ExitId::derive(age, ExitOutput::Transferred, false);
        let burn = ExitId::derive(age, ExitOutput::Transferred, true);
        assert!(change < transferred && transferred < burn);
        assert!(burn.is_burn() && !transferred.is_burn());
        assert_eq!(change.output(), ExitOutput::Change);
        assert_eq!(burn.output(), ExitOutput::Transferred);
        for id in [change, transferred, burn] {
            assert_eq!(id.age(), age);
        }
        assert_eq!(change, ExitId::derive(age, ExitOutput::Change, false));
    }

    #[test]
    fn test_exit_id_follows_age_order() {
        let older_age = Age::pack(10_000, 9, 9, 9).unwrap();
        let newer_age = Age::pack(20_000, 0, 0, 0).unwrap();
        let older = ExitId::derive(older_age, ExitOutput::Transferred, true);
        let newer = ExitId::derive(newer_age, ExitOutput::Change, false);
        assert!(older < newer);
    }
}

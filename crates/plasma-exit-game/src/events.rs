//! Events emitted by exit game transitions.

use plasma_primitives::{Address, Age, U256};
use serde::{Deserialize, Serialize};

use crate::claim::ExitId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExitEvent {
    ExitStarted {
        exit_id: ExitId,
        owner: Address,
        token: Address,
        amount_or_token_id: U256,
        is_burn: bool,
        exitable_at: u64,
    },
    /// An input beyond the first was attached to an exit
    ExitUpdated {
        exit_id: ExitId,
        age: Age,
        signer: Address,
    },
    ExitChallenged {
        exit_id: ExitId,
        input_age: Age,
        challenge_age: Age,
        challenger: Address,
        bond: U256,
    },
    /// A partial challenge left the exit pending with fewer inputs
    ExitReduced {
        exit_id: ExitId,
        amount: U256,
        age: Age,
    },
    ExitCancelled {
        exit_id: ExitId,
    },
    ExitFinalized {
        exit_id: ExitId,
        owner: Address,
        token: Address,
        amount_or_token_id: U256,
        /// Bond owed back to the exit owner
        bond_refund: U256,
    },
}

impl ExitEvent {
    pub fn exit_id(&self) -> ExitId {
        match self {
            Self::ExitStarted { exit_id, .. }
            | Self::ExitUpdated { exit_id, .. }
            | Self::ExitChallenged { exit_id, .. }
            | Self::ExitReduced { exit_id, .. }
            | Self::ExitCancelled { exit_id }
            | Self::ExitFinalized { exit_id, .. } => *exit_id,
        }
    }
}

use plasma_predicates::{InclusionError, PredicateError};
use plasma_primitives::{Address, Age};
use thiserror::Error;

use crate::claim::{ExitId, ExitStatus};
use crate::custody::CustodyError;

/// Rejections of exit game operations; a rejected operation leaves the state untouched
#[derive(Error, Debug)]
pub enum ExitGameError {
    #[error("Proof rejected: {0}")]
    ProofInvalid(InclusionError),
    #[error("Header block {0} is not checkpointed")]
    HeaderNotCheckpointed(u64),
    #[error("Block {block_number} outside header block range [{start}, {end}]")]
    RangeMismatch { block_number: u64, start: u64, end: u64 },
    #[error("Exit {0} conflicts with a registered exit")]
    DuplicateOrConflictingExit(ExitId),
    #[error("Exit amount is zero")]
    ZeroAmountExit,
    #[error("Signer {0:?} is not a participant of the exit")]
    UnauthorizedSigner(Address),
    #[error("Challenge age {challenge_age} does not exceed input age {input_age}")]
    ChallengeTooOld { challenge_age: Age, input_age: Age },
    #[error("Challenge window open until {exitable_at}, now {now}")]
    ChallengeWindowNotElapsed { exitable_at: u64, now: u64 },
    #[error("Exit {exit_id} is queued behind {blocking}")]
    PriorityViolation { exit_id: ExitId, blocking: ExitId },
    #[error("Unknown exit {0}")]
    UnknownExit(ExitId),
    #[error("Exit {exit_id} is {status:?}")]
    ExitNotPending { exit_id: ExitId, status: ExitStatus },
    #[error("Exit {exit_id} has {inputs} input(s), no input {index}")]
    InvalidInputIndex {
        exit_id: ExitId,
        index: usize,
        inputs: usize,
    },
    #[error("Invalid challenge: {0}")]
    InvalidChallenge(&'static str),
    #[error("Predicate error: {0}")]
    Predicate(PredicateError),
    #[error("Custody error: {0}")]
    Custody(#[from] CustodyError),
    #[error("Clock rewound from {last} to {now}")]
    ClockRewound { last: u64, now: u64 },
}

impl From<InclusionError> for ExitGameError {
    fn from(err: InclusionError) -> Self {
        match err {
            InclusionError::HeaderNotCheckpointed(id) => Self::HeaderNotCheckpointed(id),
            InclusionError::RangeMismatch {
                block_number,
                start,
                end,
            } => Self::RangeMismatch {
                block_number,
                start,
                end,
            },
            other => Self::ProofInvalid(other),
        }
    }
}

impl From<PredicateError> for ExitGameError {
    fn from(err: PredicateError) -> Self {
        match err {
            PredicateError::Inclusion(inclusion) => inclusion.into(),
            PredicateError::UnauthorizedClaimant(signer) => Self::UnauthorizedSigner(signer),
            PredicateError::ParticipantMismatch { found, .. } => Self::UnauthorizedSigner(found),
            other => Self::Predicate(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inclusion_mapping() {
        assert!(matches!(
            ExitGameError::from(PredicateError::Inclusion(InclusionError::HeaderNotCheckpointed(7))),
            ExitGameError::HeaderNotCheckpointed(7)
        ));
        assert!(matches!(
            ExitGameError::from(InclusionError::HeaderProof(3)),
            ExitGameError::ProofInvalid(InclusionError::HeaderProof(3))
        ));
        assert!(matches!(
            ExitGameError::from(PredicateError::DuplicateInput),
            ExitGameError::Predicate(PredicateError::DuplicateInput)
        ));
    }
}
